//! Process-wide dispatch switch shared by the engine and the HTTP API.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Cloneable handle to the auto-send flag.
///
/// The flag lives only in memory and is `true` after every restart.
#[derive(Debug, Clone)]
pub struct DispatchState {
    auto_send: Arc<AtomicBool>,
}

impl DispatchState {
    pub fn new(auto_send: bool) -> Self {
        Self {
            auto_send: Arc::new(AtomicBool::new(auto_send)),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.auto_send.load(Ordering::Acquire)
    }

    /// Flip the flag and return the new value.
    pub fn toggle(&self) -> bool {
        !self.auto_send.fetch_xor(true, Ordering::AcqRel)
    }
}

impl Default for DispatchState {
    fn default() -> Self {
        Self::new(true)
    }
}
