use std::collections::HashMap;
use std::fmt;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use mc_core::{Article, ArticleStorage, ClassificationRecord, ClassifiedArticle, Ministry, Result};
use mc_inference::classifier::BatchClassifier;
use tracing::{debug, info, warn};

use crate::batch::{partition, Batch};
use crate::logging::Logger;
use crate::retry::{with_retry, RetryConfig, Sleeper, TokioSleeper};

pub const DEFAULT_BATCH_SIZE: NonZeroUsize = match NonZeroUsize::new(20) {
    Some(size) => size,
    None => unreachable!(),
};

#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    /// Articles per model call, fixed for the whole run
    pub batch_size: NonZeroUsize,
    pub retry: RetryConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            retry: RetryConfig::default(),
        }
    }
}

/// Where a run currently is. Batch numbers are 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Idle,
    Reading,
    Batching(usize),
    AwaitingBatchResult(usize),
    Retrying { batch: usize, attempt: u32 },
    Aggregating,
    Writing,
    Done,
    Failed,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub articles: usize,
    pub batches: usize,
    pub retries: u32,
    pub records: usize,
    /// Records whose idx had already been seen; the later one won
    pub duplicates: usize,
    /// Records discarded because their idx was outside the batch that produced them
    pub out_of_range: usize,
    pub unclassified: usize,
}

/// Fold records into idx → labels. Later records overwrite earlier ones.
///
/// Also returns how many records collided with an idx already present.
pub fn aggregate(records: &[ClassificationRecord]) -> (HashMap<i64, Vec<Ministry>>, usize) {
    let mut by_idx = HashMap::with_capacity(records.len());
    for record in records {
        by_idx.insert(record.idx, record.ministries.clone());
    }
    let duplicates = records.len() - by_idx.len();
    (by_idx, duplicates)
}

/// One output entry per input article, in input order. Articles without a
/// verdict get an empty label list. Returns the entries and how many are empty.
pub fn reassemble(articles: &[Article], by_idx: &HashMap<i64, Vec<Ministry>>) -> (Vec<ClassifiedArticle>, usize) {
    let output: Vec<ClassifiedArticle> = articles
        .iter()
        .enumerate()
        .map(|(idx, article)| ClassifiedArticle {
            article: article.clone(),
            ministries: i64::try_from(idx)
                .ok()
                .and_then(|idx| by_idx.get(&idx))
                .cloned()
                .unwrap_or_default(),
        })
        .collect();
    let unclassified = output.iter().filter(|a| a.ministries.is_empty()).count();
    (output, unclassified)
}

fn hms(duration: Duration) -> humantime::FormattedDuration {
    humantime::format_duration(Duration::from_secs(duration.as_secs()))
}

/// Reads the articles, classifies them window by window and writes the
/// labelled dataset. A window that keeps failing aborts the run before
/// anything is written.
pub struct ClassificationPipeline {
    classifier: BatchClassifier,
    storage: Arc<dyn ArticleStorage>,
    config: PipelineConfig,
    sleeper: Arc<dyn Sleeper>,
    stage: Mutex<Stage>,
}

impl fmt::Debug for ClassificationPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassificationPipeline")
            .field("classifier", &self.classifier)
            .field("config", &self.config)
            .field("stage", &self.stage())
            .finish()
    }
}

impl ClassificationPipeline {
    pub fn new(classifier: BatchClassifier, storage: Arc<dyn ArticleStorage>, config: PipelineConfig) -> Self {
        Self {
            classifier,
            storage,
            config,
            sleeper: Arc::new(TokioSleeper),
            stage: Mutex::new(Stage::Idle),
        }
    }

    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn stage(&self) -> Stage {
        *self.stage.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn enter(&self, next: Stage) {
        let mut stage = self.stage.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        debug!("Stage {:?} -> {:?}", *stage, next);
        *stage = next;
    }

    pub async fn run(&self) -> Result<RunSummary> {
        let started = Instant::now();
        info!("🚀 Classifying with {} (batch size {})", self.classifier.model_name(), self.config.batch_size);
        match self.execute().await {
            Ok(summary) => {
                self.enter(Stage::Done);
                info!("✅ Run complete in {}", hms(started.elapsed()));
                Ok(summary)
            }
            Err(e) => {
                self.enter(Stage::Failed);
                Err(e)
            }
        }
    }

    async fn execute(&self) -> Result<RunSummary> {
        let mut summary = RunSummary::default();
        self.config.retry.validate()?;

        self.enter(Stage::Reading);
        let articles = self.storage.load_articles().await?;
        summary.articles = articles.len();
        if articles.is_empty() {
            info!("No articles to process, nothing written");
            return Ok(summary);
        }

        let records = self.classify_all(&articles, &mut summary).await?;
        summary.records = records.len();

        self.enter(Stage::Aggregating);
        let (by_idx, duplicates) = aggregate(&records);
        summary.duplicates = duplicates;
        if duplicates > 0 {
            warn!(
                "⚠ Model repeated indices: {} of {} records collapsed into {} entries",
                duplicates,
                records.len(),
                by_idx.len()
            );
        }

        self.enter(Stage::Writing);
        let (output, unclassified) = reassemble(&articles, &by_idx);
        summary.unclassified = unclassified;
        info!("Articles without classification: {}/{}", unclassified, articles.len());
        self.storage.store_classified(&output).await?;

        Ok(summary)
    }

    /// Every window in order, each retried on its own. Returns all kept records.
    pub async fn classify_all(&self, articles: &[Article], summary: &mut RunSummary) -> Result<Vec<ClassificationRecord>> {
        let batches = partition(articles.len(), self.config.batch_size);
        summary.batches = batches.len();
        info!("Processing {} articles in {} batch(es)", articles.len(), batches.len());

        let started = Instant::now();
        let mut records = Vec::with_capacity(articles.len());
        for batch in &batches {
            self.enter(Stage::Batching(batch.number));
            let logger = Logger::new().with_prefix(format!("[batch {}/{}]", batch.number, batch.total));
            logger.info(&format!("indices {}..{} (n={})", batch.start, batch.end() - 1, batch.len));

            let batch_started = Instant::now();
            let returned = self.classify_batch(batch, &articles[batch.range()], &logger, summary).await?;
            logger.info(&format!("• {} records returned", returned.len()));
            records.extend(self.keep_in_range(batch, returned, &logger, summary));

            let done = batch.end();
            let per_item = started.elapsed().div_f64(done as f64);
            let eta = per_item.mul_f64((articles.len() - done) as f64);
            logger.info(&format!(
                "✓ ok in {} | progress {}/{} ({:.1}%) | ETA ~ {}",
                hms(batch_started.elapsed()),
                done,
                articles.len(),
                done as f64 * 100.0 / articles.len() as f64,
                hms(eta)
            ));
        }
        Ok(records)
    }

    async fn classify_batch(
        &self,
        batch: &Batch,
        window: &[Article],
        logger: &Logger,
        summary: &mut RunSummary,
    ) -> Result<Vec<ClassificationRecord>> {
        let classifier = &self.classifier;
        let (records, attempts) = with_retry(&self.config.retry, self.sleeper.as_ref(), logger, move |attempt| {
            if attempt > 1 {
                self.enter(Stage::Retrying { batch: batch.number, attempt });
            }
            self.enter(Stage::AwaitingBatchResult(batch.number));
            logger.info("• sending to model");
            classifier.classify(window, batch.start)
        })
        .await?;
        summary.retries += attempts - 1;
        Ok(records)
    }

    /// A record pointing outside the window it came from cannot be attributed safely.
    fn keep_in_range(
        &self,
        batch: &Batch,
        records: Vec<ClassificationRecord>,
        logger: &Logger,
        summary: &mut RunSummary,
    ) -> Vec<ClassificationRecord> {
        let (kept, dropped): (Vec<_>, Vec<_>) = records.into_iter().partition(|r| batch.contains(r.idx));
        if !dropped.is_empty() {
            let indices: Vec<String> = dropped.iter().map(|r| r.idx.to_string()).collect();
            logger.warn(&format!(
                "⚠ discarded {} record(s) with idx outside {}..{}: {}",
                dropped.len(),
                batch.start,
                batch.end() - 1,
                indices.join(", ")
            ));
            summary.out_of_range += dropped.len();
        }
        kept
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retry::tests::RecordingSleeper;
    use async_trait::async_trait;
    use mc_core::{ChatModel, Error};
    use mc_storage::MemoryStorage;
    use std::collections::VecDeque;

    /// Answers each call with the next scripted reply.
    struct ScriptedModel {
        replies: Mutex<VecDeque<Result<String>>>,
        calls: Mutex<usize>,
    }

    impl ScriptedModel {
        fn new(replies: Vec<Result<String>>) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.into()),
                calls: Mutex::new(0),
            })
        }

        fn calls(&self) -> usize {
            *self.calls.lock().unwrap()
        }
    }

    #[async_trait]
    impl ChatModel for ScriptedModel {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn send(&self, _system: &str, _user: &str) -> Result<String> {
            *self.calls.lock().unwrap() += 1;
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(Error::Transport("script exhausted".to_string())))
        }
    }

    fn articles(n: usize) -> Vec<Article> {
        (0..n)
            .map(|i| Article {
                title: format!("Noticia {i}"),
                link: format!("https://example.com/{i}"),
                ..Default::default()
            })
            .collect()
    }

    /// A reply labelling every idx in `indices` with `label`.
    fn reply(indices: impl IntoIterator<Item = usize>, label: &str) -> Result<String> {
        let items: Vec<String> = indices
            .into_iter()
            .map(|i| format!("{{\"idx\": {i}, \"ministerio\": [\"{label}\"]}}"))
            .collect();
        Ok(format!("[{}]", items.join(", ")))
    }

    fn garbage() -> Result<String> {
        Ok("Lo siento, no puedo ayudar con eso.".to_string())
    }

    fn pipeline(
        model: Arc<ScriptedModel>,
        storage: &MemoryStorage,
        batch_size: usize,
        sleeper: &Arc<RecordingSleeper>,
    ) -> ClassificationPipeline {
        let config = PipelineConfig {
            batch_size: NonZeroUsize::new(batch_size).unwrap(),
            ..PipelineConfig::default()
        };
        ClassificationPipeline::new(BatchClassifier::new(model), Arc::new(storage.clone()), config)
            .with_sleeper(sleeper.clone())
    }

    #[tokio::test]
    async fn test_two_batches_with_one_retry() {
        let model = ScriptedModel::new(vec![
            reply(0..20, "Salud"),
            garbage(),
            reply(20..25, "Trabajo"),
        ]);
        let storage = MemoryStorage::with_articles(articles(25));
        let sleeper = Arc::new(RecordingSleeper::default());
        let pipeline = pipeline(model.clone(), &storage, 20, &sleeper);

        let summary = pipeline.run().await.unwrap();
        assert_eq!(summary.articles, 25);
        assert_eq!(summary.batches, 2);
        assert_eq!(summary.retries, 1);
        assert_eq!(summary.unclassified, 0);
        assert_eq!(model.calls(), 3);
        assert_eq!(sleeper.waits(), vec![Duration::from_secs(1)]);
        assert_eq!(pipeline.stage(), Stage::Done);

        let output = storage.classified().await.unwrap();
        assert_eq!(output.len(), 25);
        for (i, entry) in output.iter().enumerate() {
            assert_eq!(entry.article.title, format!("Noticia {i}"));
            let expected = if i < 20 { Ministry::Health } else { Ministry::Labor };
            assert_eq!(entry.ministries, vec![expected]);
        }
    }

    #[tokio::test]
    async fn test_success_on_third_attempt_after_two_backoffs() {
        let model = ScriptedModel::new(vec![
            Err(Error::Transport("connection reset".to_string())),
            garbage(),
            reply(0..3, "Seguridad"),
        ]);
        let storage = MemoryStorage::with_articles(articles(3));
        let sleeper = Arc::new(RecordingSleeper::default());

        let summary = pipeline(model, &storage, 20, &sleeper).run().await.unwrap();
        assert_eq!(summary.retries, 2);
        assert_eq!(sleeper.waits(), vec![Duration::from_secs(1), Duration::from_secs(2)]);
        let output = storage.classified().await.unwrap();
        assert!(output.iter().all(|a| a.ministries == vec![Ministry::Security]));
    }

    #[tokio::test]
    async fn test_three_failures_abort_without_output() {
        let model = ScriptedModel::new(vec![
            reply(0..2, "Salud"),
            garbage(),
            Ok(r#"{"idx": 2}"#.to_string()),
            Err(Error::Transport("HTTP 502".to_string())),
        ]);
        let storage = MemoryStorage::with_articles(articles(4));
        let sleeper = Arc::new(RecordingSleeper::default());
        let pipeline = pipeline(model.clone(), &storage, 2, &sleeper);

        match pipeline.run().await {
            Err(Error::Transport(msg)) => assert_eq!(msg, "HTTP 502"),
            other => panic!("unexpected result: {other:?}"),
        }
        assert_eq!(model.calls(), 4);
        assert_eq!(sleeper.waits(), vec![Duration::from_secs(1), Duration::from_secs(2)]);
        assert_eq!(pipeline.stage(), Stage::Failed);
        assert!(storage.classified().await.is_none());
    }

    #[tokio::test]
    async fn test_configuration_error_is_not_retried() {
        let model = ScriptedModel::new(vec![Err(Error::Configuration("bad key".to_string()))]);
        let storage = MemoryStorage::with_articles(articles(1));
        let sleeper = Arc::new(RecordingSleeper::default());

        let result = pipeline(model.clone(), &storage, 20, &sleeper).run().await;
        assert!(matches!(result, Err(Error::Configuration(_))));
        assert_eq!(model.calls(), 1);
        assert!(sleeper.waits().is_empty());
    }

    #[tokio::test]
    async fn test_empty_input_finishes_without_writing() {
        let model = ScriptedModel::new(vec![]);
        let storage = MemoryStorage::with_articles(Vec::new());
        let sleeper = Arc::new(RecordingSleeper::default());
        let pipeline = pipeline(model.clone(), &storage, 20, &sleeper);

        let summary = pipeline.run().await.unwrap();
        assert_eq!(summary, RunSummary::default());
        assert_eq!(model.calls(), 0);
        assert_eq!(pipeline.stage(), Stage::Done);
        assert!(storage.classified().await.is_none());
    }

    #[tokio::test]
    async fn test_omitted_duplicate_and_stray_indices() {
        // idx 1 omitted, idx 2 answered twice, idx 7 belongs to no article of this batch
        let model = ScriptedModel::new(vec![Ok(r#"[
            {"idx": 0, "ministerio": ["Educación", "Educación"]},
            {"idx": 2, "ministerio": ["Salud"]},
            {"idx": 2, "ministerio": ["Economía", "Turismo"]},
            {"idx": 7, "ministerio": ["Seguridad"]}
        ]"#
        .to_string())]);
        let storage = MemoryStorage::with_articles(articles(3));
        let sleeper = Arc::new(RecordingSleeper::default());

        let summary = pipeline(model, &storage, 20, &sleeper).run().await.unwrap();
        assert_eq!(summary.records, 3);
        assert_eq!(summary.duplicates, 1);
        assert_eq!(summary.out_of_range, 1);
        assert_eq!(summary.unclassified, 1);

        let output = storage.classified().await.unwrap();
        let labels: Vec<Vec<Ministry>> = output.into_iter().map(|a| a.ministries).collect();
        assert_eq!(
            labels,
            vec![vec![Ministry::Education], vec![], vec![Ministry::Economy]]
        );
    }

    #[tokio::test]
    async fn test_negative_idx_is_discarded_not_fatal() {
        let model = ScriptedModel::new(vec![Ok(r#"[
            {"idx": 0, "ministerio": ["Salud"]},
            {"idx": -1, "ministerio": ["Seguridad"]},
            {"idx": "1", "ministerio": ["Trabajo"]}
        ]"#
        .to_string())]);
        let storage = MemoryStorage::with_articles(articles(2));
        let sleeper = Arc::new(RecordingSleeper::default());

        let summary = pipeline(model.clone(), &storage, 20, &sleeper).run().await.unwrap();
        assert_eq!(model.calls(), 1);
        assert_eq!(summary.retries, 0);
        assert_eq!(summary.out_of_range, 1);
        assert_eq!(summary.unclassified, 0);

        let labels: Vec<Vec<Ministry>> = storage
            .classified()
            .await
            .unwrap()
            .into_iter()
            .map(|a| a.ministries)
            .collect();
        assert_eq!(labels, vec![vec![Ministry::Health], vec![Ministry::Labor]]);
    }

    #[tokio::test]
    async fn test_invalid_retry_policy_fails_before_any_call() {
        let model = ScriptedModel::new(vec![reply(0..1, "Salud")]);
        let storage = MemoryStorage::with_articles(articles(1));
        let config = PipelineConfig {
            retry: RetryConfig { max_attempts: 0, ..RetryConfig::default() },
            ..PipelineConfig::default()
        };
        let pipeline = ClassificationPipeline::new(BatchClassifier::new(model.clone()), Arc::new(storage.clone()), config);

        assert!(matches!(pipeline.run().await, Err(Error::Configuration(_))));
        assert_eq!(model.calls(), 0);
        assert_eq!(pipeline.stage(), Stage::Failed);
        assert!(storage.classified().await.is_none());
    }

    #[test]
    fn test_aggregate_last_writer_wins() {
        let records = vec![
            ClassificationRecord { idx: 4, ministries: vec![Ministry::Health] },
            ClassificationRecord { idx: 5, ministries: vec![] },
            ClassificationRecord { idx: 4, ministries: vec![Ministry::Labor] },
        ];
        let (by_idx, duplicates) = aggregate(&records);
        assert_eq!(duplicates, 1);
        assert_eq!(by_idx[&4], vec![Ministry::Labor]);
        assert_eq!(by_idx[&5], Vec::<Ministry>::new());
    }

    #[test]
    fn test_reassemble_is_complete_and_ordered() {
        let input = articles(5);
        let mut by_idx = HashMap::new();
        by_idx.insert(1, vec![Ministry::Economy]);
        by_idx.insert(3, vec![Ministry::Health, Ministry::Security]);

        let (output, unclassified) = reassemble(&input, &by_idx);
        assert_eq!(output.len(), 5);
        assert_eq!(unclassified, 3);
        for (i, entry) in output.iter().enumerate() {
            assert_eq!(entry.article, input[i]);
        }
        assert_eq!(output[3].ministries, vec![Ministry::Health, Ministry::Security]);
        assert!(output[4].ministries.is_empty());
    }

    #[tokio::test]
    async fn test_json_files_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("noticias.json");
        let output = dir.path().join("out/noticias_etiquetadas.json");
        std::fs::write(
            &input,
            r#"[
                {"Titulo": "Paro docente", "Descripcion": null, "Link": "https://example.com/a"},
                {"Titulo": "Suba del dólar", "Cuerpo": "El BCRA intervino."}
            ]"#,
        )
        .unwrap();

        let model = ScriptedModel::new(vec![Ok(format!(
            "Listo:\n```json\n{}\n```",
            r#"[{"idx": 0, "ministerio": ["Educación", "Trabajo"]}, {"idx": 1, "ministerio": ["Economía"]}]"#
        ))]);
        let storage = mc_storage::JsonFileStorage::new(input.clone(), output.clone());
        let pipeline = ClassificationPipeline::new(BatchClassifier::new(model), Arc::new(storage), PipelineConfig::default())
            .with_sleeper(Arc::new(RecordingSleeper::default()));
        pipeline.run().await.unwrap();

        let written: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&output).unwrap()).unwrap();
        assert_eq!(written[0]["Titulo"], "Paro docente");
        assert_eq!(written[0]["Descripcion"], "");
        assert_eq!(written[0]["ministerio"], serde_json::json!(["Educación", "Trabajo"]));
        assert_eq!(written[1]["Cuerpo"], "El BCRA intervino.");
        assert_eq!(written[1]["ministerio"], serde_json::json!(["Economía"]));
    }
}
