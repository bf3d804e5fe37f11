//! Category catalog: the ordered taxonomy of investment approaches.
//!
//! Categories are kept in an explicit `Vec` so that iteration order is the
//! order they were loaded in. Lookup by label goes through a separate
//! label → position index built once at construction.

use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::slice::Chunks;

use serde::Serialize;
use thiserror::Error;

/// Default number of categories sent to the model in one accuracy-mode call.
pub const DEFAULT_CHUNK_SIZE: NonZeroUsize = NonZeroUsize::new(30).unwrap();

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CatalogError {
    #[error("duplicate category label: {0}")]
    DuplicateLabel(String),

    #[error("empty category label at position {0}")]
    EmptyLabel(usize),
}

/// A single investment-approach category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Category {
    pub label: String,
    pub description: String,
}

impl Category {
    pub fn new(label: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            description: description.into(),
        }
    }
}

/// Ordered, label-unique collection of categories.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    categories: Vec<Category>,
    index: HashMap<String, usize>,
}

impl Catalog {
    /// Build a catalog, rejecting empty or duplicate labels.
    ///
    /// Labels are trimmed before validation. An empty input is a valid
    /// (degenerate) catalog.
    pub fn new(categories: Vec<Category>) -> Result<Self, CatalogError> {
        let mut index = HashMap::with_capacity(categories.len());
        let mut ordered = Vec::with_capacity(categories.len());

        for (pos, mut category) in categories.into_iter().enumerate() {
            let trimmed = category.label.trim();
            if trimmed.is_empty() {
                return Err(CatalogError::EmptyLabel(pos));
            }
            if trimmed.len() != category.label.len() {
                category.label = trimmed.to_string();
            }
            if index.insert(category.label.clone(), pos).is_some() {
                return Err(CatalogError::DuplicateLabel(category.label));
            }
            ordered.push(category);
        }

        Ok(Self {
            categories: ordered,
            index,
        })
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    /// Categories in catalog order.
    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    pub fn iter(&self) -> impl Iterator<Item = &Category> {
        self.categories.iter()
    }

    /// Labels in catalog order.
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.categories.iter().map(|c| c.label.as_str())
    }

    pub fn get(&self, label: &str) -> Option<&Category> {
        self.index.get(label).map(|&pos| &self.categories[pos])
    }

    pub fn contains(&self, label: &str) -> bool {
        self.index.contains_key(label)
    }

    /// Partition the catalog into batches of at most `chunk_size` categories.
    ///
    /// The returned iterator is lazy and `Clone`, so the same partition can be
    /// walked again. An empty catalog yields no batches at all.
    pub fn batches(&self, chunk_size: NonZeroUsize) -> CategoryBatches<'_> {
        CategoryBatches {
            inner: self.categories.chunks(chunk_size.get()),
        }
    }

    /// Number of batches [`batches`](Self::batches) will yield: `ceil(len / k)`.
    pub fn batch_count(&self, chunk_size: NonZeroUsize) -> usize {
        self.categories.len().div_ceil(chunk_size.get())
    }
}

/// A contiguous, ordered slice of the catalog sent in one classification call.
pub type CategoryBatch<'a> = &'a [Category];

/// Iterator over catalog batches, see [`Catalog::batches`].
#[derive(Debug, Clone)]
pub struct CategoryBatches<'a> {
    inner: Chunks<'a, Category>,
}

impl<'a> Iterator for CategoryBatches<'a> {
    type Item = CategoryBatch<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl ExactSizeIterator for CategoryBatches<'_> {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn catalog_of(n: usize) -> Catalog {
        let categories = (0..n)
            .map(|i| Category::new(format!("cat_{i}"), format!("description {i}")))
            .collect();
        Catalog::new(categories).unwrap()
    }

    fn k(n: usize) -> NonZeroUsize {
        NonZeroUsize::new(n).unwrap()
    }

    #[test]
    fn batches_cover_catalog_exactly_once() {
        for n in [0, 1, 2, 7, 30, 31, 65, 100] {
            for size in [1, 2, 3, 30, 33, 200] {
                let catalog = catalog_of(n);
                let mut seen = HashSet::new();
                let mut flattened = Vec::new();
                for batch in catalog.batches(k(size)) {
                    assert!(!batch.is_empty(), "no empty batches");
                    assert!(batch.len() <= size, "batch larger than chunk size");
                    for c in batch {
                        assert!(seen.insert(c.label.clone()), "duplicate {}", c.label);
                        flattened.push(c.label.clone());
                    }
                }
                let expected: Vec<String> = catalog.labels().map(String::from).collect();
                assert_eq!(flattened, expected, "n={n} k={size}");
            }
        }
    }

    #[test]
    fn batch_count_is_ceiling() {
        for n in [0, 1, 29, 30, 31, 60, 61] {
            let catalog = catalog_of(n);
            let expected = n.div_ceil(30);
            assert_eq!(catalog.batches(k(30)).count(), expected);
            assert_eq!(catalog.batch_count(k(30)), expected);
        }
    }

    #[test]
    fn empty_catalog_yields_no_batches() {
        let catalog = Catalog::new(Vec::new()).unwrap();
        assert!(catalog.is_empty());
        assert_eq!(catalog.batches(k(5)).next(), None);
    }

    #[test]
    fn chunk_larger_than_catalog_yields_one_batch() {
        let catalog = catalog_of(4);
        let batches: Vec<_> = catalog.batches(k(10)).collect();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].len(), 4);
    }

    #[test]
    fn batches_are_restartable() {
        let catalog = catalog_of(5);
        let batches = catalog.batches(k(2));
        let first: Vec<_> = batches.clone().collect();
        let second: Vec<_> = batches.collect();
        assert_eq!(first, second);
        assert_eq!(catalog.batches(k(2)).len(), 3);
    }

    #[test]
    fn duplicate_label_rejected() {
        let err = Catalog::new(vec![
            Category::new("Value", "a"),
            Category::new("Growth", "b"),
            Category::new("Value", "c"),
        ])
        .unwrap_err();
        assert_eq!(err, CatalogError::DuplicateLabel("Value".into()));
    }

    #[test]
    fn blank_label_rejected() {
        let err = Catalog::new(vec![Category::new("Value", "a"), Category::new("  ", "b")])
            .unwrap_err();
        assert_eq!(err, CatalogError::EmptyLabel(1));
    }

    #[test]
    fn labels_trimmed_and_indexed() {
        let catalog = Catalog::new(vec![
            Category::new(" Momentum ", "trend following"),
            Category::new("Value", "cheap vs. intrinsic"),
        ])
        .unwrap();
        assert!(catalog.contains("Momentum"));
        assert!(!catalog.contains(" Momentum "));
        assert_eq!(catalog.get("Value").unwrap().description, "cheap vs. intrinsic");
        assert_eq!(catalog.labels().collect::<Vec<_>>(), vec!["Momentum", "Value"]);
    }
}
