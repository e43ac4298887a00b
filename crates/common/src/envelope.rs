//! Uniform `{data, result}` response body.
//!
//! Successful responses carry `data` and a null `result`; failures carry a
//! null `data` and `result = {message, code}`.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ApiResult {
    pub message: String,
    pub code: u16,
}

#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    pub data: Option<T>,
    pub result: Option<ApiResult>,
}

impl<T> Envelope<T> {
    pub fn ok(data: T) -> Self {
        Self {
            data: Some(data),
            result: None,
        }
    }

    pub fn error(message: String, code: u16) -> Self {
        Self {
            data: None,
            result: Some(ApiResult { message, code }),
        }
    }
}

impl<T: Serialize> IntoResponse for Envelope<T> {
    fn into_response(self) -> Response {
        (StatusCode::ACCEPTED, Json(self)).into_response()
    }
}
