use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use mc_inference::{Config, Provider, DEFAULT_TEMPERATURE, DEFAULT_TOP_P};
use mc_pipeline::{handle_command, init_logging, Commands};
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(author, version, about = "Classify news articles by ministry with a chat model", long_about = None)]
pub struct Cli {
    /// Chat backend answering the prompts
    #[arg(long, global = true, env = "CLASIF_PROVIDER", value_enum, default_value_t = Provider::OpenRouter)]
    provider: Provider,
    /// Chat completions endpoint for openrouter
    #[arg(long, global = true, env = "OPENROUTER_API_URL")]
    openrouter_url: Option<String>,
    /// Base URL of the Ollama server
    #[arg(long, global = true, env = "OLLAMA_HOST")]
    ollama_host: Option<String>,
    #[arg(long, global = true, env = "OPENROUTER_MODEL")]
    openrouter_model: Option<String>,
    #[arg(long, global = true, env = "OLLAMA_MODEL")]
    ollama_model: Option<String>,
    #[arg(long, global = true, env = "OPENROUTER_API_KEY", hide_env_values = true)]
    api_key: Option<String>,
    /// Per-request timeout in seconds (provider default when unset)
    #[arg(long, global = true, env = "CLASIF_TIMEOUT")]
    timeout: Option<u64>,
    #[arg(long, global = true, env = "CLASIF_TEMPERATURE", default_value_t = DEFAULT_TEMPERATURE)]
    temperature: f32,
    #[arg(long, global = true, env = "CLASIF_TOP_P", default_value_t = DEFAULT_TOP_P)]
    top_p: f32,
    /// Debug-level logging
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    /// Resolve the endpoint and model for the selected provider.
    fn chat_config(&self) -> Config {
        let (endpoint, model_name) = match self.provider {
            Provider::OpenRouter => (self.openrouter_url.clone(), self.openrouter_model.clone()),
            Provider::Ollama => (self.ollama_host.clone(), self.ollama_model.clone()),
        };
        Config {
            provider: self.provider,
            endpoint,
            model_name,
            api_key: self.api_key.clone(),
            timeout: self.timeout.map(Duration::from_secs),
            temperature: self.temperature,
            top_p: self.top_p,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = cli.chat_config();
    info!("🧠 Provider: {} ({})", config.provider, config.model());

    match handle_command(cli.command, &config).await {
        Ok(()) => Ok(ExitCode::SUCCESS),
        Err(e) => {
            error!("❌ {}", e);
            Ok(ExitCode::FAILURE)
        }
    }
}
