//! PropertyLoop server and terminal client.
//!
//! - `propertyloop site` (default): landing page with the chat widget
//! - `propertyloop assistant`: the `/chat` assistant endpoint
//! - `propertyloop chat`: chat with the assistant from the terminal

use anyhow::Context;
use clap::Parser;
use mimalloc::MiMalloc;
use tokio::io::BufReader;
use tracing::info;

use propertyloop::config::{AppConfig, Cli, Command, load_llm_settings};
use propertyloop::widget::HttpTransport;
use propertyloop::{assistant, repl, site, telemetry};

/// Global allocator for improved performance (M-MIMALLOC-APPS).
#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env (if present) before clap reads env-backed flags.
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    telemetry::init();

    let config = AppConfig::from_cli(&cli).context("Failed to load configuration")?;

    match cli.command() {
        Command::Site => site::serve(config.server, config.widget).await,
        Command::Assistant => {
            let settings = load_llm_settings().map_err(|msg| anyhow::anyhow!(msg))?;
            assistant::serve(config.assistant, settings).await
        }
        Command::Chat { endpoint } => {
            let endpoint = endpoint.unwrap_or(config.widget.endpoint);
            let transport = HttpTransport::new(&endpoint)
                .with_context(|| format!("Invalid chat endpoint '{endpoint}'"))?;
            info!(name: "chat.started", endpoint = %transport.endpoint(), "Terminal chat started");

            let input = BufReader::new(tokio::io::stdin());
            let mut output = std::io::stdout();
            repl::run(&transport, input, &mut output).await?;
            Ok(())
        }
    }
}
