use std::fmt;
use std::sync::Arc;

use mc_core::{Article, ChatModel, ClassificationRecord, Error, Result};
use serde::Serialize;
use tracing::debug;

use crate::extract::extract_json_array;
use crate::normalize::normalize;
use crate::prompts::{classify_instructions, CLASSIFY_SYSTEM_PROMPT};

pub const TITLE_LIMIT: usize = 300;
pub const DESCRIPTION_LIMIT: usize = 800;
pub const BODY_LIMIT: usize = 2000;

#[derive(Debug, Serialize)]
struct CompactItem<'a> {
    idx: usize,
    titulo: &'a str,
    description: &'a str,
    body: &'a str,
}

#[derive(Debug, Serialize)]
struct UserPayload<'a> {
    instrucciones: &'a str,
    items: Vec<CompactItem<'a>>,
}

/// Hard cut after `limit` characters, no ellipsis.
pub fn truncate_chars(text: &str, limit: usize) -> &str {
    match text.char_indices().nth(limit) {
        Some((end, _)) => &text[..end],
        None => text,
    }
}

/// Classifies one window of articles with a single model call.
pub struct BatchClassifier {
    model: Arc<dyn ChatModel>,
    instructions: String,
}

impl fmt::Debug for BatchClassifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BatchClassifier")
            .field("model", &self.model.name())
            .finish()
    }
}

impl BatchClassifier {
    pub fn new(model: Arc<dyn ChatModel>) -> Self {
        Self {
            model,
            instructions: classify_instructions(),
        }
    }

    pub fn model_name(&self) -> &str {
        self.model.name()
    }

    /// The user message for a window whose first article sits at `start_index`.
    pub fn build_payload(&self, articles: &[Article], start_index: usize) -> Result<String> {
        let items = articles
            .iter()
            .enumerate()
            .map(|(i, article)| CompactItem {
                idx: start_index + i,
                titulo: truncate_chars(&article.title, TITLE_LIMIT),
                description: truncate_chars(&article.description, DESCRIPTION_LIMIT),
                body: truncate_chars(&article.body, BODY_LIMIT),
            })
            .collect();
        let payload = UserPayload {
            instrucciones: &self.instructions,
            items,
        };
        Ok(serde_json::to_string(&payload)?)
    }

    /// The returned `idx` values are the model's own; they are not re-derived
    /// from position so the caller can see drift and collisions.
    pub async fn classify(&self, articles: &[Article], start_index: usize) -> Result<Vec<ClassificationRecord>> {
        let payload = self.build_payload(articles, start_index)?;
        let content = self.model.send(CLASSIFY_SYSTEM_PROMPT, &payload).await?;
        debug!("Model answered with {} characters", content.len());

        let raw = extract_json_array(&content)?;
        normalize(raw).map_err(|e| Error::Validation(Box::new(e)))
    }
}
