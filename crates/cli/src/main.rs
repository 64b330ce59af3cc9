//! wordtutor CLI, the main entry point.
//!
//! Commands:
//! - `chat`    interactive tutoring session, or one message with `-m`
//! - `serve`   start the HTTP/WebSocket server
//! - `doctor`  check configuration and model reachability
//! - `config`  print a default config file

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "wordtutor",
    about = "wordtutor: learn one English word at a time",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file (default: ~/.wordtutor/config.toml)
    #[arg(short, long, global = true, env = "WORDTUTOR_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Tutor a word in the terminal
    Chat {
        /// Word to study (default: tutor.default_word)
        #[arg(short, long)]
        word: Option<String>,

        /// Send a single message instead of entering interactive mode
        #[arg(short, long)]
        message: Option<String>,
    },

    /// Start the HTTP/WebSocket server
    Serve {
        /// Override the port
        #[arg(short, long)]
        port: Option<u16>,

        /// Override the bind address
        #[arg(long)]
        host: Option<String>,
    },

    /// Diagnose configuration and model reachability
    Doctor,

    /// Print a default config.toml
    Config,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Logs go to stderr so replies on stdout stay clean
    let interactive = matches!(cli.command, Commands::Chat { .. });
    let filter = match (cli.verbose, interactive) {
        (true, _) => "debug",
        (false, true) => "warn",
        (false, false) => "info",
    };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter));
    if cli.json_logs {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .init();
    }

    let config_path = cli.config.as_deref();
    match cli.command {
        Commands::Chat { word, message } => commands::chat::run(config_path, word, message).await?,
        Commands::Serve { port, host } => commands::serve::run(config_path, port, host).await?,
        Commands::Doctor => commands::doctor::run(config_path).await?,
        Commands::Config => commands::config_cmd::run(),
    }

    Ok(())
}
