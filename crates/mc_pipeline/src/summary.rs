use std::sync::Arc;
use std::time::Instant;

use mc_core::{ArticleStorage, Ministry, MinistrySummary, Result};
use mc_inference::summarize::{select, MinistrySummarizer};
use tracing::info;

use crate::logging::Logger;
use crate::retry::{with_retry, RetryConfig, Sleeper, TokioSleeper};

/// Reads a classified dataset and writes one summary per ministry that has articles.
pub struct SummaryPipeline {
    summarizer: MinistrySummarizer,
    storage: Arc<dyn ArticleStorage>,
    retry: RetryConfig,
    sleeper: Arc<dyn Sleeper>,
    only: Option<Ministry>,
}

impl SummaryPipeline {
    pub fn new(summarizer: MinistrySummarizer, storage: Arc<dyn ArticleStorage>, retry: RetryConfig) -> Self {
        Self {
            summarizer,
            storage,
            retry,
            sleeper: Arc::new(TokioSleeper),
            only: None,
        }
    }

    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    /// Restrict the run to a single ministry.
    pub fn only(mut self, ministry: Option<Ministry>) -> Self {
        self.only = ministry;
        self
    }

    pub async fn run(&self) -> Result<Vec<MinistrySummary>> {
        let started = Instant::now();
        self.retry.validate()?;
        let articles = self.storage.load_classified().await?;
        let targets: Vec<Ministry> = match self.only {
            Some(ministry) => vec![ministry],
            None => Ministry::ALL.to_vec(),
        };

        let mut summaries = Vec::with_capacity(targets.len());
        for ministry in targets {
            let logger = Logger::new().with_prefix(format!("[{}]", ministry));
            let count = select(ministry, &articles).len();
            if count == 0 {
                logger.info("no articles, skipped");
                continue;
            }
            logger.info(&format!("📌 summarizing {} article(s)", count));

            let summarizer = &self.summarizer;
            let articles = &articles;
            let (summary, _attempts) = with_retry(&self.retry, self.sleeper.as_ref(), &logger, |_| {
                summarizer.summarize(ministry, articles)
            })
            .await?;
            summaries.extend(summary);
        }

        self.storage.store_summaries(&summaries).await?;
        info!(
            "✅ {} summaries written in {}",
            summaries.len(),
            humantime::format_duration(std::time::Duration::from_secs(started.elapsed().as_secs()))
        );
        Ok(summaries)
    }
}
