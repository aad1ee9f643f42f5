use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::service::SrvError;

/// Service error as seen by one route.
///
/// Client mistakes answer with `{error}`; engine and I/O failures answer 500
/// with the route's label in `error` and the cause in `details`.
#[derive(Debug)]
pub struct ApiError {
    label: &'static str,
    err: SrvError,
}

impl ApiError {
    pub fn new(label: &'static str, err: SrvError) -> Self {
        Self { label, err }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match &self.err {
            SrvError::NoUpload | SrvError::BadRequest(_) => {
                tracing::warn!(error = %self.err, "bad request");
                (StatusCode::BAD_REQUEST, json!({ "error": self.err.to_string() }))
            }
            SrvError::PayloadTooLarge(msg) => {
                tracing::warn!(error = %msg, "upload too large");
                (StatusCode::PAYLOAD_TOO_LARGE, json!({ "error": msg }))
            }
            SrvError::Engine(e) => {
                tracing::error!(error = %e, "engine error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": self.label, "details": e.to_string() }),
                )
            }
            SrvError::Other(e) => {
                tracing::error!(error = ?e, "processing error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": self.label, "details": format!("{e:#}") }),
                )
            }
        };
        (status, Json(body)).into_response()
    }
}
