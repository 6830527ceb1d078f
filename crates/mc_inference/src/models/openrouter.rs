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
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    temperature: f32,
    top_p: f32,
    response_format: ResponseFormat,
}

pub struct OpenRouterModel {
    client: Client,
    api_key: String,
    url: Url,
    model: String,
    temperature: f32,
    top_p: f32,
}

impl fmt::Debug for OpenRouterModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenRouterModel")
            .field("client", &"<reqwest::Client>")
            .field("api_key", &"<redacted>")
            .field("url", &self.url.as_str())
            .field("model", &self.model)
            .finish()
    }
}

impl OpenRouterModel {
    pub fn new(config: &Config) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| Error::Configuration("OpenRouter API key is required".to_string()))?;
        Ok(Self {
            client: build_client(config.timeout())?,
            api_key,
            url: config.endpoint_url()?,
            model: config.model().to_string(),
            temperature: config.temperature,
            top_p: config.top_p,
        })
    }
}

#[async_trait]
impl ChatModel for OpenRouterModel {
    fn name(&self) -> &str {
        "OpenRouter"
    }

    async fn send(&self, system: &str, user: &str) -> Result<String> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage::system(system), ChatMessage::user(user)],
            temperature: self.temperature,
            top_p: self.top_p,
            response_format: ResponseFormat { kind: "text" },
        };
        debug!("Sending {} bytes to {}", user.len(), self.url);

        let started = Instant::now();
        let response = self
            .client
            .post(self.url.clone())
            .bearer_auth(&self.api_key)
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

        read_content(self.name(), status, &body, "/choices/0/message/content")
    }
}
