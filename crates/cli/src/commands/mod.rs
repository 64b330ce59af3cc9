pub mod chat;
pub mod config_cmd;
pub mod doctor;
pub mod serve;

use std::path::Path;

use wordtutor_config::AppConfig;

/// Load config from `path`, or from the default location.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig, Box<dyn std::error::Error>> {
    let config = match path {
        Some(p) => AppConfig::load_with(p),
        None => AppConfig::load(),
    };
    config.map_err(|e| format!("Failed to load config: {e}").into())
}
