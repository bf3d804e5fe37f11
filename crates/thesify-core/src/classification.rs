//! Classification outcomes for one document, in either strategy's shape.
//!
//! Per-batch replies arrive as [`BatchOutcome`]s. Merging them is the only
//! place where failed batches and out-of-scope labels are resolved: failures
//! contribute nothing, unknown labels are dropped.

use std::collections::{BTreeSet, HashMap};

use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::catalog::{Catalog, Category};

/// The model's judgement for one category.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Verdict {
    pub value: bool,
    pub justification: String,
}

/// A single classification call that produced no usable categories.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("classification call failed: {reason}")]
pub struct BatchClassificationError {
    pub reason: String,
}

impl BatchClassificationError {
    pub fn new(reason: impl ToString) -> Self {
        Self {
            reason: reason.to_string(),
        }
    }
}

/// Result of one accuracy-mode call covering `labels`.
#[derive(Debug, Clone)]
pub struct BatchOutcome {
    pub labels: Vec<String>,
    pub result: Result<HashMap<String, Verdict>, BatchClassificationError>,
}

impl BatchOutcome {
    pub fn new(
        batch: &[Category],
        result: Result<HashMap<String, Verdict>, BatchClassificationError>,
    ) -> Self {
        Self {
            labels: batch.iter().map(|c| c.label.clone()).collect(),
            result,
        }
    }
}

/// Accuracy mode: verdicts unioned across all batches of one document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VerdictMap {
    pub verdicts: HashMap<String, Verdict>,
    pub failed_batches: usize,
}

impl VerdictMap {
    /// Merge batch outcomes for the document `document`.
    ///
    /// Keys a batch returns outside its own label set are dropped.
    pub fn merge(document: &str, outcomes: impl IntoIterator<Item = BatchOutcome>) -> Self {
        let mut merged = Self::default();
        for (batch, outcome) in outcomes.into_iter().enumerate() {
            match outcome.result {
                Ok(verdicts) => {
                    for (label, verdict) in verdicts {
                        if outcome.labels.iter().any(|l| *l == label) {
                            merged.verdicts.insert(label, verdict);
                        } else {
                            debug!(document, batch, label = %label, "dropping label outside batch");
                        }
                    }
                }
                Err(e) => {
                    warn!(
                        document,
                        batch,
                        labels = ?outcome.labels,
                        error = %e,
                        "batch contributed no categories"
                    );
                    merged.failed_batches += 1;
                }
            }
        }
        merged
    }

    pub fn is_present(&self, label: &str) -> bool {
        self.verdicts.get(label).is_some_and(|v| v.value)
    }
}

/// Cost mode: the set of labels judged present by a single call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelSet {
    pub labels: BTreeSet<String>,
    pub failed: bool,
}

impl LabelSet {
    /// Keep only labels the catalog knows about.
    pub fn from_reply(
        document: &str,
        catalog: &Catalog,
        reply: Result<Vec<String>, BatchClassificationError>,
    ) -> Self {
        match reply {
            Ok(labels) => {
                let labels = labels
                    .into_iter()
                    .filter(|label| {
                        let known = catalog.contains(label);
                        if !known {
                            debug!(document, label = %label, "dropping unknown label");
                        }
                        known
                    })
                    .collect();
                Self {
                    labels,
                    failed: false,
                }
            }
            Err(e) => {
                warn!(document, error = %e, "classification call contributed no categories");
                Self {
                    labels: BTreeSet::new(),
                    failed: true,
                }
            }
        }
    }

    pub fn is_present(&self, label: &str) -> bool {
        self.labels.contains(label)
    }
}

/// Classification of one document by either strategy.
#[derive(Debug, Clone, PartialEq)]
pub enum ClassificationResult {
    Accuracy(VerdictMap),
    Cost(LabelSet),
}

impl ClassificationResult {
    pub fn is_present(&self, label: &str) -> bool {
        match self {
            Self::Accuracy(map) => map.is_present(label),
            Self::Cost(set) => set.is_present(label),
        }
    }

    /// Number of calls for this document that produced nothing.
    pub fn failed_calls(&self) -> usize {
        match self {
            Self::Accuracy(map) => map.failed_batches,
            Self::Cost(set) => usize::from(set.failed),
        }
    }
}
