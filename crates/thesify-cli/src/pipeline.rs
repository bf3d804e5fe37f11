//! Classification pipeline: catalog + dataset → model calls → result files.

use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, bail};
use thesify_ai::{Strategy, ThesisClassifier, ToolCaller};
use thesify_core::{ClassifiedRecord, aggregate};
use thesify_store::{DatasetColumns, OutputFormat, ResultSink, column_collisions};

/// Everything a run needs, fixed at startup.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub dataset: PathBuf,
    pub catalog: PathBuf,
    pub columns: DatasetColumns,
    pub limit: Option<usize>,
    pub strategy: Strategy,
    pub chunk_size: NonZeroUsize,
    pub output_dir: PathBuf,
    pub format: OutputFormat,
}

pub struct RunOutcome {
    pub records: Vec<ClassifiedRecord>,
    pub written: Vec<PathBuf>,
    pub failed_calls: usize,
    pub elapsed_secs: f64,
}

/// Run the full pipeline: load catalog and theses, classify each thesis in
/// turn, then write the flattened records.
///
/// Catalog, dataset and output errors abort the run. Model call failures do
/// not: they are logged and the affected categories come out as 0.
pub async fn run_pipeline<C: ToolCaller>(
    config: &RunConfig,
    caller: C,
) -> anyhow::Result<RunOutcome> {
    let start = Instant::now();

    // 1. Catalog and dataset.
    let catalog = thesify_store::load_catalog(&config.catalog)
        .with_context(|| format!("loading category catalog {}", config.catalog.display()))?;
    let documents = thesify_store::load_documents(&config.dataset, &config.columns, config.limit)
        .with_context(|| format!("loading thesis dataset {}", config.dataset.display()))?;

    if let Some(first) = documents.first() {
        let clashes = column_collisions(&catalog, first.passthrough.iter().map(|(n, _)| n.as_str()));
        if !clashes.is_empty() {
            bail!("category labels collide with dataset columns: {}", clashes.join(", "));
        }
    }

    // 2. Classify sequentially.
    let classifier =
        ThesisClassifier::new(caller, &catalog, config.strategy).with_chunk_size(config.chunk_size);
    eprintln!(
        "  Classifying {} theses against {} categories ({} strategy, {} calls per thesis)",
        documents.len(),
        catalog.len(),
        config.strategy,
        classifier.calls_per_document()
    );

    let mut records = Vec::with_capacity(documents.len());
    let mut failed_calls = 0usize;
    for (i, document) in documents.iter().enumerate() {
        let result = classifier.classify(document).await;
        failed_calls += result.failed_calls();
        records.push(aggregate(&catalog, document, &result));
        eprintln!("  [{}/{}] {}", i + 1, documents.len(), document.identifier);
    }

    // 3. Persist.
    let sink = ResultSink::new(&config.output_dir, config.format);
    let written = sink
        .write(&catalog, &records)
        .with_context(|| format!("writing results to {}", config.output_dir.display()))?;

    Ok(RunOutcome {
        records,
        written,
        failed_calls,
        elapsed_secs: start.elapsed().as_secs_f64(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;
    use thesify_ai::{LlmError, ToolRequest};
    use thesify_core::SchemaNode;

    const BROKEN: &str = "Broken";

    /// Stand-in model: a category is present when its label appears in the
    /// thesis text. Any batch containing `Broken` gets an unparseable reply.
    #[derive(Default)]
    struct KeywordCaller {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ToolCaller for KeywordCaller {
        async fn call_tool(&self, request: &ToolRequest) -> Result<String, LlmError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let node = request.function.categories_node().expect("categories field");
            match node {
                SchemaNode::Object { .. } => {
                    let labels = node.property_names();
                    if labels.contains(&BROKEN) {
                        return Ok("{\"categories\": oops".to_string());
                    }
                    let verdicts: serde_json::Map<String, serde_json::Value> = labels
                        .iter()
                        .map(|l| {
                            let verdict = serde_json::json!({
                                "value": request.user.contains(l),
                                "justification": "keyword match",
                            });
                            (l.to_string(), verdict)
                        })
                        .collect();
                    Ok(serde_json::json!({ "categories": verdicts }).to_string())
                }
                _ => {
                    let present: Vec<&str> = ["Value", "Momentum", BROKEN, "Macro"]
                        .into_iter()
                        .filter(|l| request.user.contains(l))
                        .collect();
                    Ok(serde_json::json!({ "categories": present }).to_string())
                }
            }
        }
    }

    struct Fixture {
        dir: TempDir,
        config: RunConfig,
    }

    fn fixture(catalog: &str, dataset: &str, strategy: Strategy) -> Fixture {
        let dir = TempDir::new().unwrap();
        let catalog_path = dir.path().join("category_book.csv");
        let dataset_path = dir.path().join("thesis_records_train.csv");
        let out = dir.path().join("out");
        std::fs::write(&catalog_path, catalog).unwrap();
        std::fs::write(&dataset_path, dataset).unwrap();
        std::fs::create_dir(&out).unwrap();

        let config = RunConfig {
            dataset: dataset_path,
            catalog: catalog_path,
            columns: DatasetColumns::default(),
            limit: None,
            strategy,
            chunk_size: NonZeroUsize::new(1).unwrap(),
            output_dir: out,
            format: OutputFormat::Both,
        };
        Fixture { dir, config }
    }

    const CATALOG: &str = "Label,Description\n\
        Value,Buying below intrinsic value\n\
        Broken,A category whose batch always fails\n\
        Momentum,Following price trends\n";

    const DATASET: &str = "Link,Text,Author\n\
        http://t/1,A Value play on regional banks,alice\n\
        http://t/2,Momentum and Broken things,bob\n";

    fn csv_lines(path: &std::path::Path) -> Vec<String> {
        std::fs::read_to_string(path)
            .unwrap()
            .lines()
            .map(String::from)
            .collect()
    }

    #[tokio::test]
    async fn accuracy_run_writes_full_column_set() {
        let fx = fixture(CATALOG, DATASET, Strategy::Accuracy);
        let caller = KeywordCaller::default();

        let outcome = run_pipeline(&fx.config, caller).await.unwrap();

        // Two documents, three single-category batches each, Broken fails every time.
        assert_eq!(outcome.records.len(), 2);
        assert_eq!(outcome.failed_calls, 2);
        assert_eq!(outcome.written.len(), 2);

        let csv = outcome.written.iter().find(|p| p.extension().unwrap() == "csv").unwrap();
        assert_eq!(
            csv_lines(csv),
            vec![
                "Link,Author,Value,Broken,Momentum",
                "http://t/1,alice,1,0,0",
                "http://t/2,bob,0,0,1",
            ]
        );
        assert!(fx.dir.path().join("out").read_dir().unwrap().count() == 2);
    }

    #[tokio::test]
    async fn cost_run_one_call_per_thesis() {
        let fx = fixture(CATALOG, DATASET, Strategy::Cost);
        let outcome = run_pipeline(&fx.config, KeywordCaller::default()).await.unwrap();

        assert_eq!(outcome.failed_calls, 0);
        let second = &outcome.records[1];
        assert_eq!(second.flag("Momentum"), Some(1));
        assert_eq!(second.flag("Broken"), Some(1));
        assert_eq!(second.flag("Value"), Some(0));

        let json = outcome.written.iter().find(|p| p.extension().unwrap() == "json").unwrap();
        let rows: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(json).unwrap()).unwrap();
        assert_eq!(rows[0]["Link"], "http://t/1");
        assert_eq!(rows[0]["Value"], 1);
        assert!(rows[0].get("Text").is_none());
    }

    #[tokio::test]
    async fn limit_restricts_subset() {
        let mut fx = fixture(CATALOG, DATASET, Strategy::Cost);
        fx.config.limit = Some(1);
        let outcome = run_pipeline(&fx.config, KeywordCaller::default()).await.unwrap();
        assert_eq!(outcome.records.len(), 1);
    }

    #[tokio::test]
    async fn empty_dataset_writes_nothing() {
        let fx = fixture(CATALOG, "Link,Text\n", Strategy::Accuracy);
        let outcome = run_pipeline(&fx.config, KeywordCaller::default()).await.unwrap();

        assert!(outcome.records.is_empty());
        assert!(outcome.written.is_empty());
        assert_eq!(fx.config.output_dir.read_dir().unwrap().count(), 0);
    }

    #[tokio::test]
    async fn bad_catalog_aborts_before_any_call() {
        let fx = fixture("Name,Description\nValue,x\n", DATASET, Strategy::Accuracy);
        let caller = KeywordCaller::default();
        let err = run_pipeline(&fx.config, &caller).await.err().unwrap();

        assert!(format!("{err:#}").contains("Label"));
        assert_eq!(caller.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn header_only_dataset_with_wrong_columns_aborts() {
        let fx = fixture(CATALOG, "Foo,Bar\n", Strategy::Accuracy);
        let caller = KeywordCaller::default();
        let err = run_pipeline(&fx.config, &caller).await.err().unwrap();

        assert!(format!("{err:#}").contains("Link"));
        assert_eq!(caller.calls.load(Ordering::SeqCst), 0);
        assert_eq!(fx.config.output_dir.read_dir().unwrap().count(), 0);
    }

    #[tokio::test]
    async fn label_colliding_with_column_rejected() {
        let fx = fixture("Label,Description\nAuthor,x\n", DATASET, Strategy::Accuracy);
        let caller = KeywordCaller::default();
        let err = run_pipeline(&fx.config, &caller).await.err().unwrap();

        assert!(err.to_string().contains("Author"));
        assert_eq!(caller.calls.load(Ordering::SeqCst), 0);
    }
}
