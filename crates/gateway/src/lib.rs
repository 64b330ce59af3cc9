//! HTTP and WebSocket transports for wordtutor.
//!
//! Routes:
//! - `POST /chat`       one JSON request is one turn
//! - `GET  /ws`         JSON frames, one per turn, session keyed by `user_id`
//! - `GET  /ws/chat`    first frame picks the word, then streamed text frames
//! - `GET  /ws/{word}`  word taken from the path, then streamed text frames
//! - `GET  /health`     liveness
//! - `GET  /`           embedded dev page
//!
//! Built on Axum.

pub mod frontend;
pub mod http;
pub mod ws;

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::http::{HeaderValue, Method, header};
use axum::{
    Router,
    routing::{get, post},
};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::{info, warn};
use wordtutor_agent::TurnCycle;
use wordtutor_config::GatewayConfig;

/// Shared state for every route.
pub struct GatewayState {
    pub cycle: Arc<TurnCycle>,
}

pub type SharedState = Arc<GatewayState>;

impl GatewayState {
    pub fn new(cycle: Arc<TurnCycle>) -> SharedState {
        Arc::new(Self { cycle })
    }
}

/// Build the full router.
pub fn build_router(state: SharedState, allowed_origins: &[String]) -> Router {
    Router::new()
        .route("/health", get(http::health_handler))
        .route("/chat", post(http::chat_handler))
        .route("/ws", get(ws::json_ws_handler))
        .route("/ws/chat", get(ws::chat_ws_handler))
        .route("/ws/{word}", get(ws::word_ws_handler))
        .with_state(state)
        .merge(frontend::frontend_router())
        .layer(DefaultBodyLimit::max(64 * 1024))
        .layer(cors_layer(allowed_origins))
        .layer(tower_http::trace::TraceLayer::new_for_http())
}

/// Any origin when the list is empty, otherwise exactly the listed ones.
fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins = if allowed_origins.is_empty() {
        AllowOrigin::any()
    } else {
        let parsed: Vec<HeaderValue> = allowed_origins
            .iter()
            .filter_map(|o| match o.parse() {
                Ok(v) => Some(v),
                Err(_) => {
                    warn!(origin = %o, "Ignoring invalid CORS origin");
                    None
                }
            })
            .collect();
        AllowOrigin::list(parsed)
    };

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE])
        .max_age(std::time::Duration::from_secs(3600))
}

/// Serve on an already bound listener until the server stops.
pub async fn serve(listener: tokio::net::TcpListener, app: Router) -> std::io::Result<()> {
    axum::serve(listener, app).await
}

/// Bind `host:port` from config and serve.
pub async fn start(config: &GatewayConfig, cycle: Arc<TurnCycle>) -> std::io::Result<()> {
    let addr = format!("{}:{}", config.host, config.port);
    let app = build_router(GatewayState::new(cycle), &config.allowed_origins);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(addr = %addr, "Gateway listening");
    serve(listener, app).await
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use wordtutor_agent::{TurnCycle, Tutor};
    use wordtutor_core::error::ProviderError;
    use wordtutor_core::provider::{Provider, ProviderRequest, ProviderResponse};
    use wordtutor_core::Message;
    use wordtutor_memory::InMemorySessionStore;

    /// Answers every request with a fixed reply, or fails when `reply` is
    /// `None`. Records the last user text it saw.
    pub struct CannedProvider {
        pub reply: Option<&'static str>,
        pub seen: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Provider for CannedProvider {
        fn name(&self) -> &str {
            "canned"
        }

        async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
            if let Some(last) = request.messages.last() {
                self.seen.lock().unwrap().push(last.content.clone());
            }
            match self.reply {
                Some(text) => Ok(ProviderResponse {
                    message: Message::assistant(text),
                    usage: None,
                    model: request.model,
                }),
                None => Err(ProviderError::ApiError {
                    status_code: 503,
                    message: "upstream unavailable".into(),
                }),
            }
        }
    }

    pub fn cycle(reply: Option<&'static str>) -> (Arc<TurnCycle>, Arc<CannedProvider>) {
        let provider = Arc::new(CannedProvider { reply, seen: Mutex::new(Vec::new()) });
        let tutor = Tutor::new(provider.clone(), "test-model");
        let store = Arc::new(InMemorySessionStore::new("apple", 0));
        (Arc::new(TurnCycle::new(store, Arc::new(tutor))), provider)
    }
}
