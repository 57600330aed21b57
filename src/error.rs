//! # error
//!
//! Centralised error types.
//!
//! * [`AppError`] — every HTTP handler returns `Result<_, AppError>`. Axum's
//!   `IntoResponse` impl converts it into a `{ "ok": false, "error": ... }`
//!   JSON body so the dashboard always gets a machine-readable response.
//! * [`FetchError`] — a whole refresh cycle failed before any symbol could be
//!   looked at. The scheduler keeps the previous data and reports the message.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

// ─── HTTP Errors ──────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum AppError {
    /// Query parameters were present but unusable.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// The requested symbol is not tracked.
    #[error("Not found: {0}")]
    NotFound(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
        };

        let body = Json(json!({
            "ok":    false,
            "error": message,
        }));

        (status, body).into_response()
    }
}

// ─── Fetch Errors ─────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum FetchError {
    /// Network failure, DNS, TLS or timeout.
    #[error("Quote provider unreachable: {0}")]
    Transport(#[from] reqwest::Error),

    /// Non-2xx HTTP status.
    #[error("Quote provider returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// The provider answered 200 with a request-level error object
    /// (bad API key, exhausted credits, ...).
    #[error("Quote provider error {code}: {message}")]
    Provider { code: i64, message: String },

    /// The body was not the JSON object we expect.
    #[error("Malformed provider payload: {0}")]
    Malformed(String),
}

// ─── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn make_body(err: AppError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_app_error_responses() {
        let (status, body) = make_body(AppError::NotFound("symbol 'MSFT' is not tracked".into())).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["ok"], false);
        assert_eq!(body["error"], "symbol 'MSFT' is not tracked");

        let (status, body) = make_body(AppError::BadRequest("page_size must be at least 1".into())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "page_size must be at least 1");
    }

    #[test]
    fn test_fetch_error_messages() {
        let err = FetchError::Status { status: 503, body: "busy".into() };
        assert_eq!(err.to_string(), "Quote provider returned HTTP 503: busy");

        let err = FetchError::Provider { code: 401, message: "invalid api key".into() };
        assert_eq!(err.to_string(), "Quote provider error 401: invalid api key");
    }
}
