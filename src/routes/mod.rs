//! HTTP surface of the dashboard.
//!
//! | Method   | Path                 | Handler                    |
//! |----------|----------------------|----------------------------|
//! | GET      | `/api/health`        | [`health::health_check`]   |
//! | GET      | `/api/quotes`        | [`quotes::get_quotes`]     |
//! | GET      | `/api/quotes/window` | [`quotes::get_window`]     |
//! | GET      | `/api/quotes/series` | [`quotes::get_series`]     |
//! | GET (WS) | `/ws/quotes`         | [`stream::ws_quotes`]      |

pub mod health;
pub mod quotes;
pub mod stream;

use axum::{routing::get, Router};

use crate::state::SharedState;

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/api/health",        get(health::health_check))
        .route("/api/quotes",        get(quotes::get_quotes))
        .route("/api/quotes/window", get(quotes::get_window))
        .route("/api/quotes/series", get(quotes::get_series))
        .route("/ws/quotes",         get(stream::ws_quotes))
        .with_state(state)
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;
    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::error::FetchError;
    use crate::provider::{ProviderPayload, QuoteSource};
    use crate::state::{build_state, SharedState};

    /// Never called: route tests fill the store directly.
    struct Unused;

    #[async_trait]
    impl QuoteSource for Unused {
        fn id(&self) -> &'static str {
            "UNUSED"
        }

        async fn fetch(&self, _symbols: &[String]) -> Result<ProviderPayload, FetchError> {
            Ok(ProviderPayload::default())
        }
    }

    pub fn make_state() -> SharedState {
        let symbols = ["AAPL", "EUR/USD", "ETH/BTC"].map(String::from).to_vec();
        build_state(Arc::new(Unused), symbols, Duration::from_secs(30))
    }

    fn candle(datetime: &str, open: &str, close: &str) -> Value {
        json!({ "datetime": datetime, "open": open, "high": close, "low": open, "close": close, "volume": "100" })
    }

    /// AAPL loaded at 10:05, ETH/BTC loaded at 10:06, EUR/USD failed.
    pub fn make_payload() -> ProviderPayload {
        ProviderPayload::from_entries([
            (
                "AAPL".to_string(),
                json!({
                    "status": "ok",
                    "meta": { "symbol": "AAPL", "currency": "USD", "type": "Common Stock",
                              "exchange": "NASDAQ", "exchange_timezone": "America/New_York" },
                    "values": [
                        candle("2024-01-01 10:05:00", "10", "11"),
                        candle("2024-01-01 10:04:00", "10", "9"),
                        candle("2024-01-01 10:03:00", "9", "10"),
                    ]
                }),
            ),
            (
                "EUR/USD".to_string(),
                json!({ "status": "error", "message": "symbol not available" }),
            ),
            (
                "ETH/BTC".to_string(),
                json!({
                    "status": "ok",
                    "meta": { "symbol": "ETH/BTC", "currency_base": "Ethereum",
                              "currency_quote": "Bitcoin", "type": "Digital Currency" },
                    "values": [ candle("2024-01-01 10:06:00", "0.05", "0.051") ]
                }),
            ),
        ])
    }

    pub async fn make_loaded_state() -> SharedState {
        let state = make_state();
        state.store.replace(&state.symbols, &make_payload()).await;
        state
    }

    pub async fn get_json(state: SharedState, uri: &str) -> (StatusCode, Value) {
        let response = super::router(state)
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();

        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }
}
