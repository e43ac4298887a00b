//! Shared application state for the Axum API server.

use std::sync::Arc;

use hub_engine::{DispatchState, ReadView};

/// Application state shared across all route handlers via Axum `State`.
pub struct AppState<S, C> {
    /// Auto-send switch, shared with the dispatch engine.
    pub dispatch: DispatchState,
    pub read_view: Arc<ReadView<S, C>>,
}

impl<S, C> AppState<S, C> {
    pub fn new(dispatch: DispatchState, read_view: Arc<ReadView<S, C>>) -> Self {
        Self {
            dispatch,
            read_view,
        }
    }
}

impl<S, C> Clone for AppState<S, C> {
    fn clone(&self) -> Self {
        Self {
            dispatch: self.dispatch.clone(),
            read_view: Arc::clone(&self.read_view),
        }
    }
}
