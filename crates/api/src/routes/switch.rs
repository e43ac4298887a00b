//! Auto-send switch.

use axum::extract::State;
use axum::routing::post;
use axum::Router;
use serde::Serialize;

use hub_common::envelope::Envelope;

use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SwitchAutoSendData {
    pub auto_send_on: bool,
}

pub fn router<S, C>() -> Router<AppState<S, C>>
where
    S: Send + Sync + 'static,
    C: Send + Sync + 'static,
{
    Router::new().route("/switch-auto-send", post(switch_auto_send::<S, C>))
}

/// POST /switch-auto-send: flip the switch and report the new value.
///
/// A tick already in flight finishes its batch; the next tick sees the new
/// value.
async fn switch_auto_send<S, C>(State(state): State<AppState<S, C>>) -> Envelope<SwitchAutoSendData> {
    let auto_send_on = state.dispatch.toggle();
    tracing::info!(action = "SwitchAutoSend", auto_send_on, "Auto-send switched");
    Envelope::ok(SwitchAutoSendData { auto_send_on })
}
