//! Embedded dev page for trying the WebSocket transport by hand.
//!
//! Compiled in with `include_str!` so the binary serves it without any
//! files on disk.

use axum::{Router, response::Html, routing::get};

const INDEX_HTML: &str = include_str!("../../../frontend/index.html");

pub fn frontend_router() -> Router {
    Router::new().route("/", get(index_handler))
}

async fn index_handler() -> Html<&'static str> {
    Html(INDEX_HTML)
}
