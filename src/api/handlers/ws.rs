use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use tokio::sync::broadcast::error::RecvError;

use crate::AppState;

/// GET /ws — live ledger change feed for the dashboard
pub async fn handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

async fn handle_socket(mut socket: WebSocket, state: AppState) {
    tracing::info!("Ledger WebSocket client connected");

    let mut rx = state.ledger.subscribe();

    loop {
        tokio::select! {
            // Forward ledger events to the client
            event = rx.recv() => {
                match event {
                    Ok(event) => match serde_json::to_string(&event) {
                        Ok(json) => {
                            if socket.send(Message::Text(json)).await.is_err() {
                                break;
                            }
                        }
                        Err(e) => {
                            tracing::error!(error = %e, "Failed to serialize LedgerEvent");
                        }
                    },
                    Err(RecvError::Lagged(n)) => {
                        // Client refetches on its next poll
                        tracing::warn!(skipped = n, "Ledger WS client lagged");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
            client_msg = socket.recv() => {
                match client_msg {
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(Message::Ping(data))) => {
                        if socket.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(_)) => {}
                    Some(Err(_)) => break,
                }
            }
        }
    }

    tracing::info!("Ledger WebSocket client disconnected");
}
