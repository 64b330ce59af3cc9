//! `wordtutor doctor`: diagnose configuration and model reachability.

use std::path::Path;

use wordtutor_config::AppConfig;
use wordtutor_core::Provider;
use wordtutor_providers::{build_embedder, build_from_config};

pub async fn run(config_path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    println!("wordtutor doctor");
    println!("================\n");

    let mut issues = 0;

    let default_path = AppConfig::config_dir().join("config.toml");
    let path = config_path.unwrap_or(&default_path);
    if path.exists() {
        println!("  [ok]   Config file: {}", path.display());
    } else {
        println!("  [info] No config file at {} (defaults + environment)", path.display());
    }

    let config = match AppConfig::load_with(path) {
        Ok(config) => {
            println!("  [ok]   Config valid");
            config
        }
        Err(e) => {
            println!("  [fail] Config invalid: {e}");
            println!("\n  1 issue found.");
            return Ok(());
        }
    };

    println!("  [info] Default word: {}", config.tutor.default_word);
    println!("  [info] Greeting: {:?}", config.tutor.greeting);

    match build_from_config(&config) {
        Ok(chat) => {
            println!("  [ok]   Model configured: {}", chat.model);
            match chat.provider.health_check().await {
                Ok(true) => println!("  [ok]   Model endpoint reachable"),
                Ok(false) => {
                    println!("  [fail] Model endpoint responded but is not healthy");
                    issues += 1;
                }
                Err(e) => {
                    println!("  [fail] Model endpoint unreachable: {e}");
                    issues += 1;
                }
            }
        }
        Err(e) => {
            println!("  [fail] {e}");
            issues += 1;
        }
    }

    if config.retrieval.enabled {
        let dir = Path::new(&config.retrieval.documents_dir);
        if dir.is_dir() {
            println!("  [ok]   Documents directory: {}", dir.display());
        } else {
            println!("  [warn] Documents directory missing: {}", dir.display());
            issues += 1;
        }
        if let Err(e) = build_embedder(&config) {
            println!("  [fail] Embeddings: {e}");
            issues += 1;
        }
    } else {
        println!("  [info] Local retrieval disabled");
    }

    println!();
    if issues == 0 {
        println!("  All checks passed.");
    } else {
        println!("  {issues} issue(s) found. See above for details.");
    }

    Ok(())
}
