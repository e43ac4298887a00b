//! Sent-message view.

use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::routing::get;
use axum::Router;
use serde::{Deserialize, Serialize};

use hub_common::envelope::Envelope;
use hub_common::error::AppError;
use hub_common::types::SentMessageView;
use hub_engine::read_view::DEFAULT_VIEW_LIMIT;
use hub_engine::{MessageStore, ResultCache};

use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct SentMessagesQuery {
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchSentMessagesData {
    pub sent_messages: Vec<SentMessageView>,
}

pub fn router<S, C>() -> Router<AppState<S, C>>
where
    S: MessageStore + 'static,
    C: ResultCache + 'static,
{
    Router::new().route("/fetch-sent-messages", get(fetch_sent_messages::<S, C>))
}

/// GET /fetch-sent-messages: sent messages with their delivery receipts.
async fn fetch_sent_messages<S, C>(
    State(state): State<AppState<S, C>>,
    query: Result<Query<SentMessagesQuery>, QueryRejection>,
) -> Result<Envelope<FetchSentMessagesData>, AppError>
where
    S: MessageStore + 'static,
    C: ResultCache + 'static,
{
    let Query(query) = query.map_err(|e| AppError::Validation(e.body_text()))?;
    let limit = query.limit.unwrap_or(DEFAULT_VIEW_LIMIT);
    if !(1..=DEFAULT_VIEW_LIMIT).contains(&limit) {
        return Err(AppError::Validation(format!(
            "limit must be between 1 and {DEFAULT_VIEW_LIMIT}"
        )));
    }

    let sent_messages = state.read_view.fetch_sent_view(limit).await?;
    Ok(Envelope::ok(FetchSentMessagesData { sent_messages }))
}
