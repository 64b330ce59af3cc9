//! `wordtutor chat`: interactive or single-message tutoring in the terminal.

use std::path::Path;

use wordtutor_agent::{QuitPolicy, TurnInput, build_cycle};
use wordtutor_channels::terminal::{ASSISTANT_PREFIX, SESSION_ENDED};
use wordtutor_channels::{CliChannel, StdoutSink, run_terminal};
use wordtutor_core::SessionId;
use wordtutor_core::channel::Channel;

use super::load_config;

pub async fn run(
    config_path: Option<&Path>,
    word: Option<String>,
    message: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(config_path)?;
    let cycle = build_cycle(&config).await.map_err(|e| {
        eprintln!();
        eprintln!("  ERROR: {e}");
        eprintln!();
        eprintln!("  Set BASE_URL, MODEL_API_KEY and MODEL_NAME in the environment or a .env file,");
        eprintln!("  or add a [model] section to your config file.");
        eprintln!();
        e
    })?;

    let word = word.unwrap_or_else(|| config.tutor.default_word.clone());
    let id = SessionId::new();
    let mut out = StdoutSink::stdout().with_prefix(ASSISTANT_PREFIX);

    if let Some(msg) = message {
        // Single message mode: no greeting, quit keywords are plain text
        let handle = cycle.open(&id, Some(&word)).await;
        cycle.run(&handle, TurnInput::User(&msg), QuitPolicy::Ignore, &mut out).await?;
        return Ok(());
    }

    let channel = CliChannel::new();
    let input = channel.start().await?;

    tokio::select! {
        ended = run_terminal(&cycle, &id, &word, input, &mut out) => {
            ended?;
        }
        _ = tokio::signal::ctrl_c() => {
            println!();
            println!("{SESSION_ENDED}");
        }
    }

    Ok(())
}
