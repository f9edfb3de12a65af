//! Gemini Live terminal client.
//!
//! ## Usage
//!
//! ```bash
//! # Text conversation with the default model
//! GEMINI_API_KEY=... gemini-live --modality text
//!
//! # Use a config file and a different voice
//! gemini-live --config live.toml --voice Puck
//! ```

use anyhow::Result;
use clap::Parser;
use gemini_live_cli::app::{QUIT_COMMAND, attach_printers, build_session, run};
use gemini_live_cli::cli::Cli;
use gemini_live_cli::config::{AppConfig, access_token};
use gemini_live_cli::telemetry::init_telemetry;
use std::sync::Arc;
use tokio::io::BufReader;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env is fine; the key can come from the real environment.
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    init_telemetry("gemini-live", "info");

    let config = AppConfig::load(cli.config.as_deref())?.with_overrides(&cli);
    let token = access_token()?;
    tracing::info!(model = %config.session.model, "Starting live session");

    let session = Arc::new(build_session(&config, token)?);
    attach_printers(&session);

    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        }
    });

    eprintln!("Type a prompt and press enter. {} exits.", QUIT_COMMAND);
    run(session, BufReader::new(tokio::io::stdin()), cancel).await
}
