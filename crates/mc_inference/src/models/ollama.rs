use std::fmt;
use std::time::Instant;

use async_trait::async_trait;
use mc_core::{ChatMessage, ChatModel, Error, Result};
use reqwest::Client;
use serde::Serialize;
use tracing::{debug, info};
use url::Url;

use super::{build_client, read_content, transport_error};
use crate::Config;

#[derive(Serialize)]
struct GenerationOptions {
    temperature: f32,
    top_p: f32,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    stream: bool,
    options: GenerationOptions,
}

pub struct OllamaModel {
    client: Client,
    url: Url,
    model: String,
    temperature: f32,
    top_p: f32,
}

impl fmt::Debug for OllamaModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OllamaModel")
            .field("client", &"<reqwest::Client>")
            .field("url", &self.url.as_str())
            .field("model", &self.model)
            .finish()
    }
}

impl OllamaModel {
    /// The configured endpoint is the Ollama host; requests go to its `/api/chat`.
    pub fn new(config: &Config) -> Result<Self> {
        let mut url = config.endpoint_url()?;
        let host = url.to_string();
        url.path_segments_mut()
            .map_err(|_| Error::Configuration(format!("invalid Ollama host '{}': not a base URL", host)))?
            .pop_if_empty()
            .extend(["api", "chat"]);
        Ok(Self {
            client: build_client(config.timeout())?,
            url,
            model: config.model().to_string(),
            temperature: config.temperature,
            top_p: config.top_p,
        })
    }
}

#[async_trait]
impl ChatModel for OllamaModel {
    fn name(&self) -> &str {
        "Ollama"
    }

    async fn send(&self, system: &str, user: &str) -> Result<String> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage::system(system), ChatMessage::user(user)],
            stream: false,
            options: GenerationOptions {
                temperature: self.temperature,
                top_p: self.top_p,
            },
        };
        debug!("Sending {} bytes to {}", user.len(), self.url);

        let started = Instant::now();
        let response = self
            .client
            .post(self.url.clone())
            .json(&request)
            .send()
            .await
            .map_err(|e| transport_error(self.name(), e))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| transport_error(self.name(), e))?;
        info!("      ↳ HTTP {} in {:.2?}", status.as_u16(), started.elapsed());

        read_content(self.name(), status, &body, "/message/content")
    }
}
