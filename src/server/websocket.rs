//! `/ws/trash-count`: pushes the running total at a fixed interval.

use std::time::Duration;

use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::Response;
use futures_util::{SinkExt, StreamExt};
use serde_json::json;
use tracing::{debug, info};

use super::AppState;

pub async fn trash_count_ws(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| push_count(socket, state))
}

/// Push `{"count": n}` immediately and then every push interval until the
/// client goes away or the server shuts down.
async fn push_count(socket: WebSocket, state: AppState) {
    let (mut sender, mut receiver) = socket.split();
    let mut shutdown = state.shutdown.clone();
    // `interval` panics on a zero period.
    let mut ticker = tokio::time::interval(state.push_interval.max(Duration::from_millis(1)));
    info!("WebSocket client connected");

    loop {
        if *shutdown.borrow_and_update() {
            break;
        }
        tokio::select! {
            _ = ticker.tick() => {
                let payload = json!({ "count": state.total.get() }).to_string();
                if sender.send(Message::Text(payload)).await.is_err() {
                    break;
                }
            }
            incoming = receiver.next() => match incoming {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
            changed = shutdown.changed() => {
                if changed.is_err() {
                    break;
                }
            }
        }
    }

    // The peer may already be gone.
    let _ = sender.send(Message::Close(None)).await;
    debug!("WebSocket client disconnected");
}
