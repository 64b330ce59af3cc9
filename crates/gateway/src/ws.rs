//! WebSocket transports.
//!
//! `/ws/chat` and `/ws/{word}` speak plain text: each reply is one or more
//! text frames followed by an `[END]` frame. One connection is one session,
//! and quit keywords close it. `/ws` speaks JSON, one frame per turn, keyed
//! by the client's `user_id`, with no quit handling.

use async_trait::async_trait;
use axum::extract::ws::{Message as WsMessage, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::response::IntoResponse;
use tracing::{debug, info, warn};
use wordtutor_agent::{Outcome, QuitPolicy, TurnError, TurnInput};
use wordtutor_core::channel::ReplySink;
use wordtutor_core::error::ChannelError;
use wordtutor_core::SessionId;

use crate::SharedState;
use crate::http::{ChatRequest, ErrorResponse, INVALID_JSON, answer};

/// Frame that closes every reply.
pub const END_MARKER: &str = "[END]";

/// Last frame before a quit-initiated close.
pub const FAREWELL: &str = "再见！对话已结束。";

/// Sent when the greeting cannot be produced.
pub const GREETING_FAILED: &str = "抱歉，初始化聊天时发生错误。请重试。";

/// Relays reply chunks as text frames; `[END]` on finish.
struct WsSink<'a> {
    socket: &'a mut WebSocket,
}

#[async_trait]
impl ReplySink for WsSink<'_> {
    async fn chunk(&mut self, text: &str) -> Result<(), ChannelError> {
        send_text(self.socket, text).await
    }

    async fn finish(&mut self) -> Result<(), ChannelError> {
        send_text(self.socket, END_MARKER).await
    }
}

async fn send_text(socket: &mut WebSocket, text: &str) -> Result<(), ChannelError> {
    socket
        .send(WsMessage::Text(text.into()))
        .await
        .map_err(|e| ChannelError::ConnectionLost(e.to_string()))
}

/// Next text frame, or `None` once the client has gone.
async fn next_text(socket: &mut WebSocket) -> Option<String> {
    while let Some(msg) = socket.recv().await {
        match msg {
            Ok(WsMessage::Text(text)) => return Some(text.as_str().to_owned()),
            Ok(WsMessage::Close(_)) | Err(_) => return None,
            Ok(_) => continue, // ignore binary, ping, pong
        }
    }
    None
}

/// `GET /ws/chat`: the first text frame selects the word.
pub async fn chat_ws_handler(ws: WebSocketUpgrade, State(state): State<SharedState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| text_session(socket, state, None))
}

/// `GET /ws/{word}`: the word comes from the path.
pub async fn word_ws_handler(
    ws: WebSocketUpgrade,
    Path(word): Path<String>,
    State(state): State<SharedState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| text_session(socket, state, Some(word)))
}

async fn text_session(mut socket: WebSocket, state: SharedState, path_word: Option<String>) {
    let id = SessionId::new();

    let word = match path_word {
        Some(w) => Some(w),
        None => next_text(&mut socket).await,
    };
    // A client that left before choosing a word gets no session.
    if let Some(word) = word {
        info!(session = %id, word = %word.trim(), "WebSocket session opened");
        converse(&mut socket, &state, &id, &word).await;
        state.cycle.store().remove(&id).await;
    }

    let _ = socket.send(WsMessage::Close(None)).await;
    info!(session = %id, "WebSocket session closed");
}

async fn converse(socket: &mut WebSocket, state: &SharedState, id: &SessionId, word: &str) {
    let cycle = &state.cycle;
    let handle = cycle.open(id, Some(word)).await;

    let greeting = cycle
        .run(&handle, TurnInput::Start, QuitPolicy::Honour, &mut WsSink { socket: &mut *socket })
        .await;
    if let Err(e) = greeting {
        warn!(session = %id, error = %e, "Greeting failed");
        let _ = send_text(socket, GREETING_FAILED).await;
        return;
    }

    while let Some(input) = next_text(socket).await {
        let outcome = cycle
            .run(&handle, TurnInput::User(&input), QuitPolicy::Honour, &mut WsSink { socket: &mut *socket })
            .await;

        match outcome {
            Ok(Outcome::Replied(_)) => {}
            Ok(Outcome::Terminated) => {
                let _ = send_text(socket, FAREWELL).await;
                return;
            }
            Err(TurnError::Disconnected(e)) => {
                debug!(session = %id, error = %e, "Client left mid-reply");
                return;
            }
            Err(e) => {
                let notice = format!("抱歉，服务器发生错误: {e}");
                if send_text(socket, &notice).await.is_err() || send_text(socket, END_MARKER).await.is_err() {
                    return;
                }
            }
        }
    }
}

/// `GET /ws`: JSON frames `{input, user_id, word?}` answered with
/// `{output, result}` or `{error}`.
pub async fn json_ws_handler(ws: WebSocketUpgrade, State(state): State<SharedState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| json_session(socket, state))
}

async fn json_session(mut socket: WebSocket, state: SharedState) {
    info!("JSON WebSocket connection established");

    while let Some(text) = next_text(&mut socket).await {
        let reply = match serde_json::from_str::<ChatRequest>(&text) {
            Ok(request) => match answer(&state, &request).await {
                Ok(response) => serde_json::to_string(&response),
                Err(e) => {
                    warn!(user = %request.user_id, error = %e, "JSON WebSocket turn failed");
                    serde_json::to_string(&ErrorResponse { error: e.to_string() })
                }
            },
            Err(_) => serde_json::to_string(&ErrorResponse { error: INVALID_JSON.into() }),
        };

        let reply = match reply {
            Ok(json) => json,
            Err(e) => {
                warn!(error = %e, "Reply serialization failed");
                continue;
            }
        };
        if socket.send(WsMessage::Text(reply.into())).await.is_err() {
            break; // client disconnected
        }
    }

    let _ = socket.send(WsMessage::Close(None)).await;
    info!("JSON WebSocket connection closed");
}
