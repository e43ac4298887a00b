use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::envelope::Envelope;

/// Failure of a single gateway call.
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("sending message failed while doing HTTP request: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("sending message failed, statusCode: {status}, message: {body}")]
    Status { status: u16, body: String },

    #[error("failed to decode gateway response: {0}")]
    Decode(#[source] reqwest::Error),
}

/// Step that failed after every chunk of a message was already delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordingStage {
    CacheWrite,
    StatusUpdate,
}

impl std::fmt::Display for RecordingStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecordingStage::CacheWrite => write!(f, "cache write"),
            RecordingStage::StatusUpdate => write!(f, "status update"),
        }
    }
}

/// Errors raised by the dispatch pipeline and its collaborators.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("Database error: {0}")]
    Store(#[from] sqlx::Error),

    #[error("Redis error: {0}")]
    Cache(#[from] redis::RedisError),

    #[error("Codec error: {0}")]
    Codec(#[from] serde_json::Error),

    #[error("Delivery error: {0}")]
    Delivery(#[from] DeliveryError),

    /// Some chunks reached the gateway before one failed. The message stays
    /// unsent and a retry starts again from the first chunk.
    #[error("delivered {delivered} of {total} chunks: {source}")]
    PartialDelivery {
        delivered: usize,
        total: usize,
        #[source]
        source: DeliveryError,
    },

    /// The message was delivered but its receipts or status were not saved.
    #[error("{stage} failed after delivery: {source}")]
    Recording {
        stage: RecordingStage,
        #[source]
        source: Box<DispatchError>,
    },
}

/// Errors surfaced at the HTTP boundary.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error(transparent)]
    Dispatch(#[from] DispatchError),
}

impl AppError {
    /// HTTP status of the response carrying this error.
    ///
    /// Dependency failures keep the envelope's usual 202 and report the
    /// failure in `result`, so clients only branch on the body.
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Dispatch(_) => StatusCode::ACCEPTED,
        }
    }

    /// Code reported in the envelope's `result.code`.
    pub fn code(&self) -> u16 {
        StatusCode::BAD_REQUEST.as_u16()
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = Envelope::<()>::error(self.to_string(), self.code());
        (status, axum::Json(body)).into_response()
    }
}
