pub mod handlers;
pub mod organizer;
pub mod participant;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    response::IntoResponse,
};
use futures::{sink::SinkExt, stream::StreamExt};
use serde::Deserialize;
use tokio::sync::broadcast::error::RecvError;

use crate::protocol::{ClientMessage, ServerMessage};
use crate::state::AppState;
use crate::types::Role;

#[derive(Debug, Deserialize)]
pub struct WsQuery {
    pub role: Option<String>,
}

/// WebSocket upgrade handler
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(params): Query<WsQuery>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    tracing::info!("WebSocket connection request: role={:?}", params.role);
    ws.on_upgrade(move |socket| handle_socket(socket, params, state))
}

/// Handle one WebSocket connection.
///
/// A connection subscribes to at most one quiz topic at a time; the
/// subscribe/unsubscribe control messages are independent of the
/// request/response operations. A client that is disconnected (or lagging)
/// when an event fires simply misses it and re-derives state by query.
async fn handle_socket(socket: WebSocket, params: WsQuery, state: AppState) {
    let (mut sender, mut receiver) = socket.split();

    let role = match params.role.as_deref() {
        Some("organizer") => Role::Organizer,
        _ => Role::Participant,
    };

    tracing::info!("WebSocket connected with role: {:?}", role);

    let welcome = ServerMessage::Welcome {
        protocol: "1.0".to_string(),
        role: role.clone(),
        server_now: chrono::Utc::now().to_rfc3339(),
    };
    if let Ok(msg) = serde_json::to_string(&welcome) {
        if sender.send(Message::Text(msg.into())).await.is_err() {
            tracing::error!("Failed to send welcome message");
            return;
        }
    }

    // Current quiz-topic subscription, if any.
    let mut topic_rx: Option<tokio::sync::broadcast::Receiver<ServerMessage>> = None;

    loop {
        tokio::select! {
            // Forward quiz-topic broadcasts (FIFO per subscriber)
            topic_msg = async {
                match &mut topic_rx {
                    Some(rx) => Some(rx.recv().await),
                    None => {
                        // Not subscribed: wait forever
                        std::future::pending::<Option<_>>().await
                    }
                }
            } => {
                match topic_msg {
                    Some(Ok(msg)) => {
                        if let Ok(json) = serde_json::to_string(&msg) {
                            if sender.send(Message::Text(json.into())).await.is_err() {
                                break;
                            }
                        }
                    }
                    Some(Err(RecvError::Lagged(missed))) => {
                        // Missed events are not replayed; the client must
                        // re-query authoritative state.
                        tracing::warn!("Subscriber lagged, skipped {} events", missed);
                    }
                    Some(Err(RecvError::Closed)) => {
                        topic_rx = None;
                    }
                    None => {}
                }
            }

            // Handle client messages
            ws_msg = receiver.next() => {
                match ws_msg {
                    Some(Ok(Message::Text(text))) => {
                        tracing::debug!("Received message: {}", text);

                        match serde_json::from_str::<ClientMessage>(&text) {
                            Ok(ClientMessage::SubscribeQuiz { quiz_id }) => {
                                let reply = match state.get_quiz(&quiz_id).await {
                                    Ok(_) => {
                                        topic_rx = Some(state.topics.subscribe(&quiz_id).await);
                                        ServerMessage::Subscribed { quiz_id }
                                    }
                                    Err(e) => ServerMessage::Error {
                                        code: e.code().to_string(),
                                        msg: e.to_string(),
                                    },
                                };
                                if let Ok(json) = serde_json::to_string(&reply) {
                                    if sender.send(Message::Text(json.into())).await.is_err() {
                                        break;
                                    }
                                }
                            }
                            Ok(ClientMessage::UnsubscribeQuiz) => {
                                topic_rx = None;
                                if let Ok(json) = serde_json::to_string(&ServerMessage::Unsubscribed) {
                                    if sender.send(Message::Text(json.into())).await.is_err() {
                                        break;
                                    }
                                }
                            }
                            Ok(client_msg) => {
                                if let Some(response) =
                                    handlers::handle_message(client_msg, &role, &state).await
                                {
                                    if let Ok(json) = serde_json::to_string(&response) {
                                        if sender.send(Message::Text(json.into())).await.is_err() {
                                            tracing::error!("Failed to send response");
                                            break;
                                        }
                                    }
                                }
                            }
                            Err(e) => {
                                tracing::error!("Failed to parse client message: {}", e);
                                let error = ServerMessage::Error {
                                    code: "PARSE_ERROR".to_string(),
                                    msg: format!("Invalid message format: {}", e),
                                };
                                if let Ok(json) = serde_json::to_string(&error) {
                                    let _ = sender.send(Message::Text(json.into())).await;
                                }
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) => {
                        tracing::info!("WebSocket closed");
                        break;
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if sender.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        tracing::error!("WebSocket error: {}", e);
                        break;
                    }
                    None => break,
                }
            }
        }
    }

    tracing::info!("WebSocket connection closed for role: {:?}", role);
}
