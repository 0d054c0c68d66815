use crate::assistant::llm::{LlmSettings, Provider};
use clap::{Parser, Subcommand};
use config::{Config, Environment, File};
use serde::Deserialize;

/// Default Azure API version when `AZURE_API_VERSION` is unset.
const DEFAULT_AZURE_API_VERSION: &str = "2024-08-01-preview";

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Config file path
    #[arg(short, long, env = "CONFIG_FILE", global = true)]
    pub config: Option<String>,

    /// Port to listen on
    #[arg(long, env = "PORT", global = true)]
    pub port: Option<u16>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Serve the landing page and chat widget (default)
    Site,
    /// Serve the `/chat` assistant endpoint
    Assistant,
    /// Chat with the assistant from the terminal
    Chat {
        /// Chat endpoint URL (defaults to `widget.endpoint`)
        #[arg(long)]
        endpoint: Option<String>,
    },
}

impl Cli {
    /// Selected subcommand, defaulting to [`Command::Site`].
    #[must_use]
    pub fn command(&self) -> Command {
        self.command.clone().unwrap_or(Command::Site)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub widget: WidgetConfig,
    pub assistant: AssistantConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
}

/// Settings for the embedded chat widget.
#[derive(Debug, Deserialize, Clone)]
pub struct WidgetConfig {
    /// Chat endpoint the widget posts to.
    pub endpoint: String,
    /// Header title.
    pub title: String,
    /// Placeholder shown while the conversation is empty.
    pub greeting: String,
    /// Seconds of inactivity before a visitor's widget is dropped.
    pub visitor_timeout_secs: u64,
}

impl Default for WidgetConfig {
    fn default() -> Self {
        Self {
            endpoint: crate::widget::DEFAULT_ENDPOINT.to_string(),
            title: "Property Assistant".to_string(),
            greeting: "How can I help you today?".to_string(),
            visitor_timeout_secs: 30 * 60,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct AssistantConfig {
    pub port: u16,
    pub host: String,
    /// Directory of `.txt`/`.md` documents for retrieval.
    pub knowledge_path: Option<String>,
    pub top_k: usize,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub session_timeout_secs: u64,
}

impl AppConfig {
    pub fn load_from_args<I, T>(args: I) -> Result<Self, config::ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let cli =
            Cli::try_parse_from(args).map_err(|e| config::ConfigError::Message(e.to_string()))?;
        Self::from_cli(&cli)
    }

    /// Build the layered configuration for an already parsed command line.
    pub fn from_cli(cli: &Cli) -> Result<Self, config::ConfigError> {
        let widget = WidgetConfig::default();
        let mut builder = Config::builder()
            .set_default("server.port", 3000)?
            .set_default("server.host", "0.0.0.0")?
            .set_default("widget.endpoint", widget.endpoint)?
            .set_default("widget.title", widget.title)?
            .set_default("widget.greeting", widget.greeting)?
            .set_default("widget.visitor_timeout_secs", widget.visitor_timeout_secs)?
            .set_default("assistant.port", 5000)?
            .set_default("assistant.host", "0.0.0.0")?
            .set_default("assistant.top_k", 3)?
            .set_default("assistant.chunk_size", 500)?
            .set_default("assistant.chunk_overlap", 50)?
            .set_default("assistant.session_timeout_secs", 60 * 60)?;

        builder = match &cli.config {
            Some(path) => builder.add_source(File::with_name(path)),
            None => builder.add_source(File::with_name("config").required(false)),
        };

        // E.g. PROPERTYLOOP_SERVER__PORT=8000
        builder = builder.add_source(
            Environment::with_prefix("PROPERTYLOOP")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        // `--port` (or PORT) targets whichever server the subcommand starts.
        if let Some(port) = cli.port {
            let key = match cli.command() {
                Command::Assistant => "assistant.port",
                Command::Site | Command::Chat { .. } => "server.port",
            };
            builder = builder.set_override(key, port)?;
        }

        builder.build()?.try_deserialize()
    }
}

pub fn load_llm_settings() -> Result<LlmSettings, String> {
    let base_url = std::env::var("LLM_BASE_URL")
        .map_err(|_| "Missing required env var: LLM_BASE_URL".to_string())?;
    if base_url.trim().is_empty() {
        return Err("LLM_BASE_URL cannot be empty".to_string());
    }

    let model = std::env::var("LLM_MODEL")
        .map_err(|_| "Missing required env var: LLM_MODEL".to_string())?;
    if model.trim().is_empty() {
        return Err("LLM_MODEL cannot be empty".to_string());
    }

    let api_key = non_empty_var("LLM_API_KEY");
    let vision_model = non_empty_var("LLM_VISION_MODEL");

    let mut provider = Provider::detect_from_url(&base_url);
    if let Provider::AzureOpenAI { .. } = &provider {
        let deployment_name = non_empty_var("AZURE_DEPLOYMENT_NAME").unwrap_or_else(|| model.clone());
        let api_version = non_empty_var("AZURE_API_VERSION")
            .unwrap_or_else(|| DEFAULT_AZURE_API_VERSION.to_string());
        provider = Provider::AzureOpenAI {
            deployment_name,
            api_version,
        };
    }

    Ok(LlmSettings {
        base_url,
        api_key,
        model,
        vision_model,
        provider,
    })
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|s| !s.trim().is_empty())
}
