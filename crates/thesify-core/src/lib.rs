pub mod catalog;
pub mod classification;
pub mod record;
pub mod schema;

pub use catalog::{Catalog, CatalogError, Category, CategoryBatch, DEFAULT_CHUNK_SIZE};
pub use classification::{
    BatchClassificationError, BatchOutcome, ClassificationResult, LabelSet, Verdict, VerdictMap,
};
pub use record::{ClassifiedRecord, Document, aggregate};
pub use schema::{FunctionSchema, SchemaNode, accuracy_schema, label_set_schema};
