//! HTTP front door: health check, auto-send switch and the sent-message view.

pub mod routes;
pub mod state;
