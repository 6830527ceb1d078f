use async_trait::async_trait;
use mc_core::{Article, ArticleStorage, ClassifiedArticle, MinistrySummary, Result};
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Debug, Default)]
pub struct MemoryStore {
    articles: Vec<Article>,
    classified: Option<Vec<ClassifiedArticle>>,
    summaries: Option<Vec<MinistrySummary>>,
}

/// Keeps everything in process. Nothing is written until a store call succeeds,
/// which lets callers check whether a run produced output at all.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    store: Arc<RwLock<MemoryStore>>,
}

impl MemoryStorage {
    pub fn with_articles(articles: Vec<Article>) -> Self {
        Self {
            store: Arc::new(RwLock::new(MemoryStore {
                articles,
                ..Default::default()
            })),
        }
    }

    pub fn with_classified(classified: Vec<ClassifiedArticle>) -> Self {
        Self {
            store: Arc::new(RwLock::new(MemoryStore {
                classified: Some(classified),
                ..Default::default()
            })),
        }
    }

    pub async fn classified(&self) -> Option<Vec<ClassifiedArticle>> {
        self.store.read().await.classified.clone()
    }

    pub async fn summaries(&self) -> Option<Vec<MinistrySummary>> {
        self.store.read().await.summaries.clone()
    }
}

#[async_trait]
impl ArticleStorage for MemoryStorage {
    async fn load_articles(&self) -> Result<Vec<Article>> {
        Ok(self.store.read().await.articles.clone())
    }

    async fn store_classified(&self, articles: &[ClassifiedArticle]) -> Result<()> {
        self.store.write().await.classified = Some(articles.to_vec());
        Ok(())
    }

    async fn load_classified(&self) -> Result<Vec<ClassifiedArticle>> {
        Ok(self.store.read().await.classified.clone().unwrap_or_default())
    }

    async fn store_summaries(&self, summaries: &[MinistrySummary]) -> Result<()> {
        self.store.write().await.summaries = Some(summaries.to_vec());
        Ok(())
    }
}
