use async_trait::async_trait;
use crate::types::{Article, ClassifiedArticle, MinistrySummary};
use crate::Result;

#[async_trait]
pub trait ArticleStorage: Send + Sync {
    /// Load the scraped articles in input order
    async fn load_articles(&self) -> Result<Vec<Article>>;

    /// Persist the full classified dataset
    async fn store_classified(&self, articles: &[ClassifiedArticle]) -> Result<()>;

    /// Load a previously classified dataset
    async fn load_classified(&self) -> Result<Vec<ClassifiedArticle>>;

    /// Persist the per-ministry summaries
    async fn store_summaries(&self, summaries: &[MinistrySummary]) -> Result<()>;
}
