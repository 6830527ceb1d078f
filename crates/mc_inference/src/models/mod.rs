use std::sync::Arc;
use std::time::Duration;

use mc_core::{ChatModel, Error, Result};
use serde_json::Value;

use crate::classifier::truncate_chars;
use crate::{Config, Provider};

pub mod ollama;
pub mod openrouter;

pub use ollama::OllamaModel;
pub use openrouter::OpenRouterModel;

pub async fn create_model(config: Option<Config>) -> Result<Arc<dyn ChatModel>> {
    let config = config.unwrap_or_default();
    config.validate()?;
    let model: Arc<dyn ChatModel> = match config.provider {
        Provider::OpenRouter => Arc::new(OpenRouterModel::new(&config)?),
        Provider::Ollama => Arc::new(OllamaModel::new(&config)?),
    };
    Ok(model)
}

fn build_client(timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| Error::Configuration(format!("failed to build HTTP client: {}", e)))
}

fn transport_error(provider: &str, err: reqwest::Error) -> Error {
    if err.is_timeout() {
        Error::Transport(format!("{} request timed out: {}", provider, err))
    } else {
        Error::Transport(format!("{} request failed: {}", provider, err))
    }
}


/// Turn a raw HTTP exchange into the assistant text found at `pointer`.
fn read_content(provider: &str, status: reqwest::StatusCode, body: &str, pointer: &str) -> Result<String> {
    if !status.is_success() {
        return Err(Error::Transport(format!(
            "{} {}: {}",
            provider,
            status.as_u16(),
            truncate_chars(body, 500)
        )));
    }
    let value: Value = serde_json::from_str(body).map_err(|e| {
        Error::Transport(format!("{} returned a malformed JSON body: {}", provider, e))
    })?;
    value
        .pointer(pointer)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| {
            Error::ResponseShape(format!(
                "{} response has no {}: {}",
                provider,
                pointer,
                truncate_chars(body, 800)
            ))
        })
}
