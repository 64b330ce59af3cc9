//! `POST /chat` and `GET /health`.

use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::{Deserialize, Serialize};
use tracing::{error, info};
use wordtutor_agent::{Outcome, QuitPolicy, TurnError, TurnInput};
use wordtutor_core::SessionId;
use wordtutor_core::channel::BufferSink;

use crate::SharedState;

/// Reply to malformed client JSON.
pub const INVALID_JSON: &str = "无效的JSON格式";

fn default_user_id() -> String {
    "default_user".into()
}

/// One turn from a client that names its own session.
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub input: String,

    #[serde(default = "default_user_id")]
    pub user_id: String,

    /// Active word, honoured only before the session's first turn
    #[serde(default)]
    pub word: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct ChatResponse {
    pub output: String,

    /// Tool outputs produced during the turn, newline separated
    pub result: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Run one turn with quit keywords treated as ordinary text.
pub async fn answer(state: &SharedState, request: &ChatRequest) -> Result<ChatResponse, TurnError> {
    let id = SessionId::from(request.user_id.as_str());
    let handle = state.cycle.open(&id, request.word.as_deref()).await;

    let mut sink = BufferSink::default();
    let outcome = state
        .cycle
        .run(&handle, TurnInput::User(&request.input), QuitPolicy::Ignore, &mut sink)
        .await?;

    Ok(match outcome {
        Outcome::Replied(exchange) => ChatResponse {
            output: exchange.text,
            result: exchange.tool_outputs.join("\n"),
        },
        Outcome::Terminated => ChatResponse {
            output: sink.text,
            result: String::new(),
        },
    })
}

pub async fn chat_handler(
    State(state): State<SharedState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match payload {
        Ok(p) => p,
        Err(rejection) => {
            info!(error = %rejection, "Rejected chat request");
            return (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse { error: INVALID_JSON.into() }),
            )
                .into_response();
        }
    };

    info!(user = %request.user_id, input_len = request.input.len(), "Chat request");
    match answer(&state, &request).await {
        Ok(response) => Json(response).into_response(),
        Err(e) => {
            error!(user = %request.user_id, error = %e, "Chat turn failed");
            (StatusCode::BAD_GATEWAY, Json(ErrorResponse { error: e.to_string() })).into_response()
        }
    }
}

#[derive(Serialize)]
pub struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::cycle;
    use crate::{GatewayState, build_router};
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    async fn post(app: axum::Router, body: &str) -> (StatusCode, serde_json::Value) {
        let req = Request::builder()
            .method("POST")
            .uri("/chat")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        let response = app.oneshot(req).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn chat_returns_output_and_result() {
        let (cycle, _) = cycle(Some("这个单词的意思是‘苹果’，你理解这个意思了吗？"));
        let app = build_router(GatewayState::new(cycle), &[]);

        let (status, json) = post(app, r#"{"input":"apple","user_id":"u1"}"#).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["output"], "这个单词的意思是‘苹果’，你理解这个意思了吗？");
        assert_eq!(json["result"], "");
    }

    #[tokio::test]
    async fn exit_is_an_ordinary_turn_over_http() {
        let (cycle, provider) = cycle(Some("咱们还是专注于“apple”这个单词吧"));
        let app = build_router(GatewayState::new(cycle), &[]);

        let (status, json) = post(app, r#"{"input":"exit","user_id":"u1"}"#).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["output"], "咱们还是专注于“apple”这个单词吧");
        assert_eq!(provider.seen.lock().unwrap().as_slice(), ["exit"]);
    }

    #[tokio::test]
    async fn user_id_defaults_and_keeps_history() {
        let (cycle, _) = cycle(Some("ok"));
        let state = GatewayState::new(cycle.clone());
        let app = build_router(state, &[]);

        post(app.clone(), r#"{"input":"apple"}"#).await;
        post(app, r#"{"input":"例句"}"#).await;

        let handle = cycle.store().get(&SessionId::from("default_user")).await.unwrap();
        assert_eq!(handle.lock().await.history.len(), 4);
    }

    #[tokio::test]
    async fn word_field_selects_word_for_new_session() {
        let (cycle, _) = cycle(Some("ok"));
        let app = build_router(GatewayState::new(cycle.clone()), &[]);

        post(app, r#"{"input":"boy","user_id":"u2","word":"boy"}"#).await;
        let handle = cycle.store().get(&SessionId::from("u2")).await.unwrap();
        assert_eq!(handle.lock().await.word(), "boy");
    }

    #[tokio::test]
    async fn malformed_json_is_rejected() {
        let (cycle, provider) = cycle(Some("ok"));
        let app = build_router(GatewayState::new(cycle), &[]);

        let (status, json) = post(app, "not json").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], INVALID_JSON);
        assert!(provider.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn gateway_failure_maps_to_error_body() {
        let (cycle, _) = cycle(None);
        let app = build_router(GatewayState::new(cycle.clone()), &[]);

        let (status, json) = post(app, r#"{"input":"apple","user_id":"u3"}"#).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert!(json["error"].as_str().unwrap().contains("upstream unavailable"));

        // The user turn stays for the next attempt
        let handle = cycle.store().get(&SessionId::from("u3")).await.unwrap();
        assert_eq!(handle.lock().await.history.len(), 1);
    }

    #[tokio::test]
    async fn empty_model_reply_is_a_gateway_error() {
        let (cycle, _) = cycle(Some(""));
        let app = build_router(GatewayState::new(cycle.clone()), &[]);

        let (status, json) = post(app, r#"{"input":"apple","user_id":"u4"}"#).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert!(json["error"].as_str().unwrap().contains("empty reply"));

        let handle = cycle.store().get(&SessionId::from("u4")).await.unwrap();
        assert_eq!(handle.lock().await.history.len(), 1);
    }

    #[tokio::test]
    async fn health_reports_version() {
        let (cycle, _) = cycle(Some("ok"));
        let app = build_router(GatewayState::new(cycle), &[]);
        let req = Request::builder().uri("/health").body(Body::empty()).unwrap();
        let response = app.oneshot(req).await.unwrap();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["status"], "ok");
        assert_eq!(json["version"], env!("CARGO_PKG_VERSION"));
    }
}
