mod pipeline;
mod summary;

use std::num::NonZeroUsize;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use thesify_ai::llm::{DEFAULT_BASE_URL, DEFAULT_MODEL};
use thesify_ai::{OpenAiClient, Strategy};
use thesify_core::DEFAULT_CHUNK_SIZE;
use thesify_store::{DatasetColumns, OutputFormat};

use pipeline::{RunConfig, run_pipeline};

#[derive(Parser, Debug)]
#[command(name = "thesify", version, about = "Tag investment theses against a category catalog")]
struct Cli {
    /// Thesis dataset (CSV or Parquet).
    #[arg(long, env = "THESIFY_DATASET", default_value = "thesis_records_train.csv")]
    dataset: PathBuf,

    /// Category catalog with `Label` and `Description` columns.
    #[arg(long, env = "THESIFY_CATALOG", default_value = "category_book.csv")]
    catalog: PathBuf,

    #[arg(long, env = "THESIFY_MODEL", default_value = DEFAULT_MODEL)]
    model: String,

    /// Classify only the first N theses.
    #[arg(long)]
    limit: Option<usize>,

    /// `accuracy` (one call per category batch) or `cost` (one call per thesis).
    #[arg(long, env = "THESIFY_STRATEGY", default_value = "accuracy")]
    strategy: Strategy,

    /// Categories per call in accuracy mode.
    #[arg(long, default_value_t = DEFAULT_CHUNK_SIZE)]
    chunk_size: NonZeroUsize,

    #[arg(long, default_value = "Link")]
    id_column: String,

    #[arg(long, default_value = "Text")]
    text_column: String,

    #[arg(long, default_value = ".")]
    output_dir: PathBuf,

    /// `csv`, `json` or `both`.
    #[arg(long, default_value = "both")]
    format: OutputFormat,

    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    #[arg(long, env = "OPENAI_BASE_URL", default_value = DEFAULT_BASE_URL)]
    base_url: String,
}

impl Cli {
    fn run_config(&self) -> RunConfig {
        RunConfig {
            dataset: self.dataset.clone(),
            catalog: self.catalog.clone(),
            columns: DatasetColumns {
                identifier: self.id_column.clone(),
                text: self.text_column.clone(),
            },
            limit: self.limit,
            strategy: self.strategy,
            chunk_size: self.chunk_size,
            output_dir: self.output_dir.clone(),
            format: self.format,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    tracing::info!("thesify v{}", env!("CARGO_PKG_VERSION"));

    let client = OpenAiClient::new(
        &cli.base_url,
        cli.api_key.clone().unwrap_or_default(),
        cli.model.clone(),
    )
    .context("set OPENAI_API_KEY or pass --api-key")?;

    let config = cli.run_config();
    eprintln!(
        "Model: {}  Dataset: {}  Catalog: {}",
        client.model(),
        config.dataset.display(),
        config.catalog.display()
    );

    let outcome = run_pipeline(&config, client).await?;

    summary::print_summary(&outcome.records)?;
    for path in &outcome.written {
        println!("Wrote {}", path.display());
    }
    if outcome.failed_calls > 0 {
        eprintln!("  {} model call(s) failed; affected categories were recorded as 0", outcome.failed_calls);
    }
    println!(
        "Classified {} theses in {:.1}s",
        outcome.records.len(),
        outcome.elapsed_secs
    );
    Ok(())
}
