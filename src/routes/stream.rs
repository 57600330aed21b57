//! # routes::stream
//!
//! **Live updates** for the dashboard over a WebSocket.
//!
//! The first frame is a `SNAPSHOT` of the current table, then every
//! [`RefreshEvent`](crate::scheduler::RefreshEvent) is forwarded as a JSON
//! text frame. Clients re-query `/api/quotes` on `UPDATED`.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use futures_util::{SinkExt, StreamExt};
use serde_json::json;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info};

use crate::{state::SharedState, window::merge_latest};

/// GET /ws/quotes — upgrade and stream refresh events.
pub async fn ws_quotes(
    ws: WebSocketUpgrade,
    State(state): State<SharedState>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

async fn snapshot_frame(state: &SharedState) -> String {
    let snapshot = state.store.snapshot().await;
    let refresh = state.scheduler.status().await;

    json!({
        "event":         "SNAPSHOT",
        "rows":          merge_latest(&snapshot, &state.symbols),
        "symbol_errors": snapshot.symbol_errors(&state.symbols),
        "last_error":    refresh.last_error,
        "refresh":       refresh,
    })
    .to_string()
}

async fn handle_socket(socket: WebSocket, state: SharedState) {
    // Subscribe before the snapshot so no event falls in between.
    let mut rx = state.scheduler.subscribe();
    let (mut sender, mut receiver) = socket.split();

    info!("🔌 Quote stream client connected");

    if sender
        .send(Message::Text(snapshot_frame(&state).await))
        .await
        .is_err()
    {
        return;
    }

    loop {
        tokio::select! {
            result = rx.recv() => {
                match result {
                    Ok(event) => {
                        if sender.send(Message::Text(event.to_json())).await.is_err() {
                            break;
                        }
                    }
                    Err(RecvError::Lagged(n)) => {
                        debug!("Quote stream client lagged, skipped {n} events");
                    }
                    Err(RecvError::Closed) => break,
                }
            }

            result = receiver.next() => {
                match result {
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(Message::Ping(data))) => {
                        let _ = sender.send(Message::Pong(data)).await;
                    }
                    _ => {}
                }
            }
        }
    }

    info!("🔌 Quote stream client disconnected");
}
