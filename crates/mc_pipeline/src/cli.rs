use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Args, Subcommand};
use mc_core::{Ministry, Result};
use mc_inference::classifier::BatchClassifier;
use mc_inference::summarize::MinistrySummarizer;
use mc_inference::{create_model, Config};
use mc_storage::JsonFileStorage;
use tracing::info;

use crate::pipeline::{ClassificationPipeline, PipelineConfig};
use crate::retry::RetryConfig;
use crate::summary::SummaryPipeline;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Label every article of the input dataset with the ministries it concerns
    Classify(ClassifyArgs),
    /// Write one narrative summary per ministry from a classified dataset
    Summarize(SummarizeArgs),
    /// Print the accepted ministry labels
    Labels,
}

#[derive(Args, Debug, Clone)]
pub struct ClassifyArgs {
    /// JSON list of scraped articles
    #[arg(long, env = "INPUT_FILE", default_value = "./data/noticias.json")]
    pub input: PathBuf,
    /// Where the classified list is written
    #[arg(long, env = "OUTPUT_FILE", default_value = "./data/noticias_etiquetadas.json")]
    pub output: PathBuf,
    /// Articles sent per model call
    #[arg(long, env = "CLASIF_LOTE", default_value = "20")]
    pub batch_size: NonZeroUsize,
}

#[derive(Args, Debug, Clone)]
pub struct SummarizeArgs {
    /// Classified dataset produced by `classify`
    #[arg(long, env = "OUTPUT_FILE", default_value = "./data/noticias_etiquetadas.json")]
    pub input: PathBuf,
    /// Where the summaries are written
    #[arg(long, env = "SUMMARY_OUTPUT_FILE", default_value = "./data/resumenes.json")]
    pub output: PathBuf,
    /// Only summarize this ministry (e.g. Salud)
    #[arg(long)]
    pub ministry: Option<Ministry>,
}

/// Renders the `labels` listing, one label per line.
pub fn label_listing() -> String {
    Ministry::ALL
        .iter()
        .map(|m| format!("  {}", m.label()))
        .collect::<Vec<_>>()
        .join("\n")
}

pub async fn handle_command(command: Commands, config: &Config) -> Result<()> {
    match command {
        Commands::Classify(args) => {
            let model = create_model(Some(config.clone())).await?;
            let storage = Arc::new(JsonFileStorage::new(args.input.clone(), args.output.clone()));
            let pipeline = ClassificationPipeline::new(
                BatchClassifier::new(model),
                storage,
                PipelineConfig {
                    batch_size: args.batch_size,
                    retry: RetryConfig::default(),
                },
            );
            let summary = pipeline.run().await?;
            info!(
                "📊 {} articles, {} batch(es), {} retries, {} unclassified",
                summary.articles, summary.batches, summary.retries, summary.unclassified
            );
            if summary.articles > 0 {
                info!("💾 Output: {}", args.output.display());
            }
        }
        Commands::Summarize(args) => {
            let model = create_model(Some(config.clone())).await?;
            let storage = Arc::new(JsonFileStorage::new(args.input.clone(), args.output.clone()));
            let pipeline = SummaryPipeline::new(MinistrySummarizer::new(model), storage, RetryConfig::default())
                .only(args.ministry);
            let summaries = pipeline.run().await?;
            info!("💾 {} summaries in {}", summaries.len(), args.output.display());
        }
        Commands::Labels => {
            println!("Available ministries:");
            println!("{}", label_listing());
        }
    }
    Ok(())
}
