use std::fmt;
use std::sync::Arc;

use chrono::Utc;
use mc_core::{ChatModel, ClassifiedArticle, Error, Ministry, MinistrySummary, Result};
use tracing::debug;

use crate::classifier::{truncate_chars, BODY_LIMIT};
use crate::prompts::{summary_request, SUMMARY_SYSTEM_PROMPT};

/// Articles tagged with `ministry`, in dataset order.
pub fn select(ministry: Ministry, articles: &[ClassifiedArticle]) -> Vec<&ClassifiedArticle> {
    articles.iter().filter(|a| a.has(ministry)).collect()
}

/// Writes one narrative summary per ministry from the articles tagged with it.
pub struct MinistrySummarizer {
    model: Arc<dyn ChatModel>,
}

impl fmt::Debug for MinistrySummarizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MinistrySummarizer")
            .field("model", &self.model.name())
            .finish()
    }
}

impl MinistrySummarizer {
    pub fn new(model: Arc<dyn ChatModel>) -> Self {
        Self { model }
    }

    /// Digests numbered by position in `selected`. The stated count is always
    /// `selected.len()`, matching `MinistrySummary::total`; an article with no text
    /// keeps its number but contributes no digest.
    pub fn build_prompt(ministry: Ministry, selected: &[&ClassifiedArticle]) -> String {
        let news: Vec<String> = selected
            .iter()
            .enumerate()
            .filter_map(|(i, a)| {
                let mut article = a.article.clone();
                article.body = truncate_chars(&article.body, BODY_LIMIT).to_string();
                article.digest().map(|digest| format!("{}. {}", i + 1, digest))
            })
            .collect();
        summary_request(ministry, selected.len(), &news.join("\n\n"))
    }

    /// `None` when no article carries the ministry; nothing is sent in that case.
    pub async fn summarize(&self, ministry: Ministry, articles: &[ClassifiedArticle]) -> Result<Option<MinistrySummary>> {
        let selected = select(ministry, articles);
        if selected.is_empty() {
            return Ok(None);
        }

        let prompt = Self::build_prompt(ministry, &selected);
        debug!("Summary prompt for {} is {} characters", ministry, prompt.chars().count());
        let summary = self.model.send(SUMMARY_SYSTEM_PROMPT, &prompt).await?;
        let summary = summary.trim();
        if summary.is_empty() {
            return Err(Error::Extraction(format!("empty summary for {}", ministry)));
        }

        Ok(Some(MinistrySummary {
            ministry,
            total: selected.len(),
            summary: summary.to_string(),
            generated_at: Utc::now(),
        }))
    }
}
