//! `wordtutor serve`: start the HTTP/WebSocket server.

use std::path::Path;
use std::sync::Arc;

use tracing::info;
use wordtutor_agent::build_cycle;

use super::load_config;

pub async fn run(
    config_path: Option<&Path>,
    port: Option<u16>,
    host: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = load_config(config_path)?;
    if let Some(p) = port {
        config.gateway.port = p;
    }
    if let Some(h) = host {
        config.gateway.host = h;
    }

    // Refuse to serve without a usable model endpoint
    let cycle = build_cycle(&config).await?;
    info!(
        word = %config.tutor.default_word,
        max_sessions = config.sessions.max_sessions,
        "Starting wordtutor server"
    );
    println!("wordtutor listening on http://{}:{}", config.gateway.host, config.gateway.port);

    wordtutor_gateway::start(&config.gateway, Arc::new(cycle)).await?;
    Ok(())
}
