use std::fmt;
use std::time::Duration;

use mc_core::{Error, Result};
use url::Url;

pub mod classifier;
pub mod extract;
pub mod models;
pub mod normalize;
pub mod prompts;
pub mod summarize;

pub const DEFAULT_TEMPERATURE: f32 = 0.2;
pub const DEFAULT_TOP_P: f32 = 0.9;

/// Which chat backend answers the prompts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Provider {
    /// Hosted, authenticated OpenRouter chat completions
    #[value(name = "openrouter")]
    OpenRouter,
    /// Local Ollama server, no credentials
    Ollama,
}

impl Provider {
    pub fn default_endpoint(&self) -> &'static str {
        match self {
            Provider::OpenRouter => "https://openrouter.ai/api/v1/chat/completions",
            Provider::Ollama => "http://localhost:11434",
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            Provider::OpenRouter => "minimax/minimax-m2:free",
            Provider::Ollama => "gpt-oss:20b",
        }
    }

    pub fn default_timeout(&self) -> Duration {
        match self {
            Provider::OpenRouter => Duration::from_secs(120),
            Provider::Ollama => Duration::from_secs(600),
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Provider::OpenRouter => f.write_str("openrouter"),
            Provider::Ollama => f.write_str("ollama"),
        }
    }
}

/// Everything a chat transport needs, fixed for the whole run.
#[derive(Clone)]
pub struct Config {
    pub provider: Provider,
    pub endpoint: Option<String>,
    pub model_name: Option<String>,
    pub api_key: Option<String>,
    pub timeout: Option<Duration>,
    pub temperature: f32,
    pub top_p: f32,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("provider", &self.provider)
            .field("endpoint", &self.endpoint)
            .field("model_name", &self.model_name)
            .field("api_key", &self.api_key.as_deref().map(|_| "<redacted>"))
            .field("timeout", &self.timeout)
            .field("temperature", &self.temperature)
            .field("top_p", &self.top_p)
            .finish()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            provider: Provider::OpenRouter,
            endpoint: None,
            model_name: None,
            api_key: None,
            timeout: None,
            temperature: DEFAULT_TEMPERATURE,
            top_p: DEFAULT_TOP_P,
        }
    }
}

impl Config {
    pub fn endpoint_url(&self) -> Result<Url> {
        let raw = self
            .endpoint
            .as_deref()
            .unwrap_or_else(|| self.provider.default_endpoint());
        Url::parse(raw)
            .map_err(|e| Error::Configuration(format!("invalid endpoint URL '{}': {}", raw, e)))
    }

    pub fn model(&self) -> &str {
        self.model_name
            .as_deref()
            .unwrap_or_else(|| self.provider.default_model())
    }

    pub fn timeout(&self) -> Duration {
        self.timeout.unwrap_or_else(|| self.provider.default_timeout())
    }

    /// Reject settings no request could succeed with, before any I/O happens.
    pub fn validate(&self) -> Result<()> {
        self.endpoint_url()?;
        if self.provider == Provider::OpenRouter
            && self.api_key.as_deref().map_or(true, |k| k.trim().is_empty())
        {
            return Err(Error::Configuration(
                "OPENROUTER_API_KEY is required for the openrouter provider".to_string(),
            ));
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(Error::Configuration(format!(
                "temperature must be within 0.0..=2.0, got {}",
                self.temperature
            )));
        }
        if !(self.top_p > 0.0 && self.top_p <= 1.0) {
            return Err(Error::Configuration(format!(
                "top_p must be within (0.0, 1.0], got {}",
                self.top_p
            )));
        }
        if self.timeout() == Duration::ZERO {
            return Err(Error::Configuration("timeout must be greater than zero".to_string()));
        }
        Ok(())
    }
}

pub mod prelude {
    pub use super::classifier::BatchClassifier;
    pub use super::models::create_model;
    pub use super::summarize::MinistrySummarizer;
    pub use super::{Config, Provider};
    pub use mc_core::{Article, ChatModel, ClassificationRecord, Error, Ministry, Result};
}

pub use models::create_model;
