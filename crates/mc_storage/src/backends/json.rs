use std::path::PathBuf;
use std::time::Instant;

use async_trait::async_trait;
use mc_core::{Article, ArticleStorage, ClassifiedArticle, MinistrySummary, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{info, warn};

/// Flat JSON files: one array read from `input`, one array written to `output`.
#[derive(Debug, Clone)]
pub struct JsonFileStorage {
    input: PathBuf,
    output: PathBuf,
}

impl JsonFileStorage {
    pub fn new(input: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            output: output.into(),
        }
    }

    async fn read_array<T: DeserializeOwned>(&self) -> Result<Vec<T>> {
        let started = Instant::now();
        let raw = tokio::fs::read_to_string(&self.input).await?;
        let items: Vec<T> = serde_json::from_str(&raw)?;
        info!(
            "📂 Read {} items from {} in {:?}",
            items.len(),
            self.input.display(),
            started.elapsed()
        );
        Ok(items)
    }

    /// Pretty-printed UTF-8, written next to the target and renamed into place
    /// so a reader never sees a half-written file.
    async fn write_array<T: Serialize>(&self, items: &[T]) -> Result<()> {
        let started = Instant::now();
        let body = serde_json::to_string_pretty(items)?;

        if let Some(parent) = self.output.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut tmp_name = self.output.as_os_str().to_owned();
        tmp_name.push(".tmp");
        let tmp = PathBuf::from(tmp_name);

        let written = match tokio::fs::write(&tmp, body.as_bytes()).await {
            Ok(()) => tokio::fs::rename(&tmp, &self.output).await,
            Err(e) => Err(e),
        };
        if let Err(e) = written {
            if let Err(cleanup) = tokio::fs::remove_file(&tmp).await {
                warn!("Could not remove {}: {}", tmp.display(), cleanup);
            }
            return Err(e.into());
        }

        info!(
            "💾 Wrote {} items to {} ({:.1} KiB) in {:?}",
            items.len(),
            self.output.display(),
            body.len() as f64 / 1024.0,
            started.elapsed()
        );
        Ok(())
    }
}

#[async_trait]
impl ArticleStorage for JsonFileStorage {
    async fn load_articles(&self) -> Result<Vec<Article>> {
        self.read_array().await
    }

    async fn store_classified(&self, articles: &[ClassifiedArticle]) -> Result<()> {
        self.write_array(articles).await
    }

    async fn load_classified(&self) -> Result<Vec<ClassifiedArticle>> {
        self.read_array().await
    }

    async fn store_summaries(&self, summaries: &[MinistrySummary]) -> Result<()> {
        self.write_array(summaries).await
    }
}
