//! # routes::health

use axum::{extract::State, response::IntoResponse, Json};
use serde_json::json;

use crate::state::SharedState;

/// GET /api/health — liveness plus the refresh loop's status.
pub async fn health_check(State(state): State<SharedState>) -> impl IntoResponse {
    let status = state.scheduler.status().await;
    let has_data = !state.store.snapshot().await.is_empty();

    Json(json!({
        "ok":       true,
        "service":  "quoteboard",
        "symbols":  state.symbols,
        "has_data": has_data,
        "refresh":  status,
    }))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;

    use crate::routes::test_support::{get_json, make_state};

    #[tokio::test]
    async fn test_health_before_first_cycle() {
        let (status, body) = get_json(make_state(), "/api/health").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ok"], true);
        assert_eq!(body["symbols"][1], "EUR/USD");
        assert_eq!(body["refresh"]["phase"], "idle");
        assert_eq!(body["refresh"]["cycles"], 0);
        assert_eq!(body["has_data"], false);
        assert!(body["refresh"]["last_error"].is_null());
    }
}
