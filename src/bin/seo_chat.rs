//! seo-chat - terminal front end for the SEO blog pipeline.
//!
//! # Usage
//!
//! ```bash
//! # Interactive session, credentials from the environment or .env
//! seo-chat
//!
//! # One-shot run with a TOML config
//! seo-chat --config relay.toml --message "Mastela electric baby swing"
//! ```
//!
//! Ctrl-C while a run is in flight cancels that run; at the prompt it exits.

use agent_relay::{config, ChatService, RelayConfig, Result};
use clap::Parser;
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "seo-chat")]
#[command(about = "Research a product and write an SEO blog post about it", long_about = None)]
#[command(version)]
struct Cli {
    /// TOML configuration file; the environment is used when absent
    #[arg(short, long, env = "AGENTS_CONFIG")]
    config: Option<PathBuf>,

    /// Send a single message, print the reply and exit
    #[arg(short, long)]
    message: Option<String>,

    /// Override the model identifier
    #[arg(long)]
    model: Option<String>,

    /// Log full message dumps at info level
    #[arg(short, long)]
    verbose: bool,
}

fn load_config(cli: &Cli) -> Result<RelayConfig> {
    let mut config = match &cli.config {
        Some(path) => config::from_file(path)?,
        None => config::from_env(),
    };
    if let Some(model) = &cli.model {
        config.model = model.clone();
    }
    if cli.verbose {
        config.verbose_logging = true;
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    if let Err(err) = dotenvy::dotenv() {
        if !err.not_found() {
            eprintln!("warning: could not read .env: {}", err);
        }
    }

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "agent_relay=info,runner::messages=info,seo_chat=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli)?;
    let service = ChatService::from_config(&config)?;
    let (session, welcome) = service.on_session_start();

    if let Some(message) = cli.message.as_deref() {
        tokio::select! {
            reply = service.on_message(&session, message) => println!("{}", reply),
            _ = tokio::signal::ctrl_c() => warn!("Run cancelled"),
        }
        return Ok(());
    }

    println!("{}", welcome);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    loop {
        stdout.write_all(b"> ").await?;
        stdout.flush().await?;

        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => None,
        };
        let Some(line) = line else { break };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line == "/quit" || line == "/exit" {
            break;
        }

        tokio::select! {
            reply = service.on_message(&session, line) => println!("\n{}\n", reply),
            _ = tokio::signal::ctrl_c() => warn!(session = %session, "Run cancelled"),
        }
    }

    info!(session = %session, "Goodbye");
    Ok(())
}
