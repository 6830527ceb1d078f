pub mod error;
pub mod models;
pub mod storage;
pub mod types;

pub use error::Error;
pub use models::{ChatMessage, ChatModel, Role};
pub use storage::ArticleStorage;
pub use types::{Article, ClassificationRecord, ClassifiedArticle, Ministry, MinistrySummary};

pub type Result<T> = std::result::Result<T, Error>;
