//! Thesis classification against the category catalog.
//!
//! Two strategies share one calling convention (system framing, the thesis
//! as the user message, a forced function call):
//!
//! - **accuracy**: the catalog is split into batches and each batch gets its
//!   own call returning `{value, justification}` per category. Calls per
//!   document = `ceil(catalog / chunk_size)`.
//! - **cost**: one call per document with the whole catalog embedded in the
//!   system prompt, returning only the labels present. Long catalogs make it
//!   more likely the model skips categories buried mid-list.
//!
//! A failed call never aborts the document: it becomes an `Err` outcome and
//! its categories resolve to 0 during aggregation.

use std::collections::HashMap;
use std::num::NonZeroUsize;

use serde::Deserialize;
use thesify_core::schema::catalog_json;
use thesify_core::{
    BatchClassificationError, BatchOutcome, Catalog, CategoryBatch, ClassificationResult,
    DEFAULT_CHUNK_SIZE, Document, LabelSet, Verdict, VerdictMap, accuracy_schema,
    label_set_schema,
};
use tracing::{debug, info};

use crate::llm::{ToolCaller, ToolRequest};
use crate::strategy::Strategy;

// ── Prompt templates ──

const SYSTEM_PROMPT: &str = "You are a helpful investment thesis categorisation assistant.";

fn cost_system_prompt(catalog_json: &str) -> String {
    format!(
        "{SYSTEM_PROMPT} You return an array of categories present in the thesis from the \
         following categories, given as a JSON list of label and description: {catalog_json}"
    )
}

fn user_prompt(document: &Document) -> String {
    format!(
        "Provide categories for the following investment thesis: {}",
        document.text
    )
}

// ── Reply shapes ──

#[derive(Deserialize)]
struct VerdictReply {
    categories: HashMap<String, Verdict>,
}

#[derive(Deserialize)]
struct LabelReply {
    categories: Vec<String>,
}

// ── Classifier ──

/// Classifies documents one at a time against a borrowed catalog.
pub struct ThesisClassifier<'a, C> {
    caller: C,
    catalog: &'a Catalog,
    strategy: Strategy,
    chunk_size: NonZeroUsize,
}

impl<'a, C: ToolCaller> ThesisClassifier<'a, C> {
    pub fn new(caller: C, catalog: &'a Catalog, strategy: Strategy) -> Self {
        Self {
            caller,
            catalog,
            strategy,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    /// Categories per accuracy-mode call.
    pub fn with_chunk_size(mut self, chunk_size: NonZeroUsize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    pub fn caller(&self) -> &C {
        &self.caller
    }

    /// Model calls issued per document under the current strategy.
    pub fn calls_per_document(&self) -> usize {
        match self.strategy {
            Strategy::Accuracy => self.catalog.batch_count(self.chunk_size),
            Strategy::Cost => usize::from(!self.catalog.is_empty()),
        }
    }

    /// Classify one document. Never fails: call failures are folded into the
    /// result and surface as absent categories.
    pub async fn classify(&self, document: &Document) -> ClassificationResult {
        info!(document = %document.identifier, strategy = %self.strategy, "classifying thesis");
        match self.strategy {
            Strategy::Accuracy => ClassificationResult::Accuracy(self.classify_batched(document).await),
            Strategy::Cost => ClassificationResult::Cost(self.classify_single(document).await),
        }
    }

    async fn classify_batched(&self, document: &Document) -> VerdictMap {
        let user = user_prompt(document);
        let mut outcomes = Vec::with_capacity(self.catalog.batch_count(self.chunk_size));

        for (index, batch) in self.catalog.batches(self.chunk_size).enumerate() {
            debug!(
                document = %document.identifier,
                batch = index,
                labels = ?batch.iter().map(|c| c.label.as_str()).collect::<Vec<_>>(),
                "classifying batch"
            );
            let result = self.call_batch(batch, &user).await;
            outcomes.push(BatchOutcome::new(batch, result));
        }

        VerdictMap::merge(&document.identifier, outcomes)
    }

    async fn call_batch(
        &self,
        batch: CategoryBatch<'_>,
        user: &str,
    ) -> Result<HashMap<String, Verdict>, BatchClassificationError> {
        let request = ToolRequest {
            system: SYSTEM_PROMPT.to_string(),
            user: user.to_string(),
            function: accuracy_schema(batch),
        };
        let arguments = self
            .caller
            .call_tool(&request)
            .await
            .map_err(BatchClassificationError::new)?;
        let reply: VerdictReply = serde_json::from_str(&arguments)
            .map_err(|e| BatchClassificationError::new(format!("unparseable reply: {e}")))?;
        Ok(reply.categories)
    }

    async fn classify_single(&self, document: &Document) -> LabelSet {
        if self.catalog.is_empty() {
            return LabelSet::default();
        }
        let reply = self.call_single(document).await;
        LabelSet::from_reply(&document.identifier, self.catalog, reply)
    }

    async fn call_single(&self, document: &Document) -> Result<Vec<String>, BatchClassificationError> {
        let categories = catalog_json(self.catalog).map_err(BatchClassificationError::new)?;
        let request = ToolRequest {
            system: cost_system_prompt(&categories),
            user: user_prompt(document),
            function: label_set_schema(),
        };
        let arguments = self
            .caller
            .call_tool(&request)
            .await
            .map_err(BatchClassificationError::new)?;
        let reply: LabelReply = serde_json::from_str(&arguments)
            .map_err(|e| BatchClassificationError::new(format!("unparseable reply: {e}")))?;
        Ok(reply.categories)
    }
}
