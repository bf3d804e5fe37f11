//! Input documents and the flat, per-category output records built from them.

use crate::catalog::Catalog;
use crate::classification::ClassificationResult;

/// An investment thesis read from the dataset.
///
/// `passthrough` holds every source column except the text column, in
/// source order, so the identifier column appears there as well.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub identifier: String,
    pub text: String,
    pub passthrough: Vec<(String, String)>,
}

/// A document with one 0/1 flag per catalog category, text stripped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedRecord {
    pub identifier: String,
    pub passthrough: Vec<(String, String)>,
    /// `(label, flag)` in catalog order; always one entry per category.
    pub flags: Vec<(String, u8)>,
}

impl ClassifiedRecord {
    pub fn flag(&self, label: &str) -> Option<u8> {
        self.flags.iter().find(|(l, _)| l == label).map(|&(_, f)| f)
    }

    /// Passthrough column names, in order.
    pub fn passthrough_names(&self) -> impl Iterator<Item = &str> {
        self.passthrough.iter().map(|(name, _)| name.as_str())
    }

    /// Count of categories flagged present.
    pub fn present_count(&self) -> usize {
        self.flags.iter().filter(|(_, f)| *f == 1).count()
    }
}

/// Flatten a classification into one 0/1 column per catalog category.
///
/// Total over the catalog: categories the result never mentions (failed
/// batches, omitted labels) come out as 0.
pub fn aggregate(
    catalog: &Catalog,
    document: &Document,
    result: &ClassificationResult,
) -> ClassifiedRecord {
    let flags = catalog
        .labels()
        .map(|label| (label.to_string(), u8::from(result.is_present(label))))
        .collect();

    ClassifiedRecord {
        identifier: document.identifier.clone(),
        passthrough: document.passthrough.clone(),
        flags,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Category;
    use crate::classification::{
        BatchClassificationError, BatchOutcome, LabelSet, Verdict, VerdictMap,
    };
    use std::collections::HashMap;
    use std::num::NonZeroUsize;

    fn doc() -> Document {
        Document {
            identifier: "https://example.com/thesis/1".into(),
            text: "We like cheap cash-generative compounders.".into(),
            passthrough: vec![
                ("Link".into(), "https://example.com/thesis/1".into()),
                ("Author".into(), "jdoe".into()),
            ],
        }
    }

    fn catalog(labels: &[&str]) -> Catalog {
        Catalog::new(
            labels
                .iter()
                .map(|l| Category::new(*l, format!("desc {l}")))
                .collect(),
        )
        .unwrap()
    }

    fn verdict(value: bool) -> Verdict {
        Verdict {
            value,
            justification: String::new(),
        }
    }

    #[test]
    fn accuracy_two_single_category_batches() {
        let cat = catalog(&["A", "B"]);
        let batches: Vec<_> = cat.batches(NonZeroUsize::new(1).unwrap()).collect();
        assert_eq!(batches.len(), 2);
        assert!(batches.iter().all(|b| b.len() == 1));

        let outcomes = vec![
            BatchOutcome::new(batches[0], Ok(HashMap::from([("A".into(), verdict(true))]))),
            BatchOutcome::new(batches[1], Ok(HashMap::from([("B".into(), verdict(false))]))),
        ];
        let result = ClassificationResult::Accuracy(VerdictMap::merge("doc", outcomes));
        let record = aggregate(&cat, &doc(), &result);

        assert_eq!(record.flags, vec![("A".to_string(), 1u8), ("B".to_string(), 0u8)]);
    }

    #[test]
    fn cost_mode_label_set() {
        let cat = catalog(&["A", "B", "C"]);
        let set = LabelSet::from_reply("doc", &cat, Ok(vec!["A".into(), "C".into()]));
        let record = aggregate(&cat, &doc(), &ClassificationResult::Cost(set));

        assert_eq!(record.flag("A"), Some(1));
        assert_eq!(record.flag("B"), Some(0));
        assert_eq!(record.flag("C"), Some(1));
        assert_eq!(record.present_count(), 2);
    }

    #[test]
    fn total_failure_still_has_every_column() {
        let cat = catalog(&["A", "B", "C", "D"]);
        let outcomes = cat
            .batches(NonZeroUsize::new(2).unwrap())
            .map(|b| BatchOutcome::new(b, Err(BatchClassificationError::new("bad json"))))
            .collect::<Vec<_>>();
        let result = ClassificationResult::Accuracy(VerdictMap::merge("doc", outcomes));
        let record = aggregate(&cat, &doc(), &result);

        assert_eq!(record.flags.len(), 4);
        assert!(record.flags.iter().all(|(_, f)| *f == 0));
        assert_eq!(result.failed_calls(), 2);
    }

    #[test]
    fn unknown_labels_never_become_columns() {
        let cat = catalog(&["A", "B"]);
        let set = LabelSet::from_reply("doc", &cat, Ok(vec!["A".into(), "Ghost".into()]));
        let record = aggregate(&cat, &doc(), &ClassificationResult::Cost(set));

        assert_eq!(record.flag("Ghost"), None);
        let labels: Vec<_> = record.flags.iter().map(|(l, _)| l.as_str()).collect();
        assert_eq!(labels, vec!["A", "B"]);
    }

    #[test]
    fn aggregation_is_idempotent() {
        let cat = catalog(&["A", "B"]);
        let set = LabelSet::from_reply("doc", &cat, Ok(vec!["B".into()]));
        let result = ClassificationResult::Cost(set);
        let document = doc();

        assert_eq!(
            aggregate(&cat, &document, &result),
            aggregate(&cat, &document, &result)
        );
    }

    #[test]
    fn passthrough_kept_text_dropped() {
        let cat = catalog(&["A"]);
        let record = aggregate(&cat, &doc(), &ClassificationResult::Cost(LabelSet::default()));
        assert_eq!(record.passthrough_names().collect::<Vec<_>>(), vec!["Link", "Author"]);
        assert_eq!(record.identifier, "https://example.com/thesis/1");
    }
}
