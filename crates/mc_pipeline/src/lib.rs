pub mod batch;
pub mod cli;
pub mod logging;
pub mod pipeline;
pub mod retry;
pub mod summary;

pub use cli::{handle_command, ClassifyArgs, Commands, SummarizeArgs};
pub use logging::{init_logging, Logger};
pub use pipeline::{ClassificationPipeline, PipelineConfig, RunSummary, Stage};
pub use retry::{RetryConfig, Sleeper, TokioSleeper};
pub use summary::SummaryPipeline;

pub mod prelude {
    pub use super::pipeline::{ClassificationPipeline, PipelineConfig};
    pub use super::summary::SummaryPipeline;
    pub use mc_core::{Article, ClassifiedArticle, Error, Ministry, Result};
}
