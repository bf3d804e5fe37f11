//! Tabular I/O: category catalog and thesis dataset loading (CSV/Parquet),
//! timestamped CSV/JSON result sinks.

mod error;
pub use error::StoreError;

pub mod catalog;
pub mod dataset;
pub mod sink;
pub mod tabular;

pub use catalog::load_catalog;
pub use dataset::{DatasetColumns, load_documents};
pub use sink::{InvalidOutputFormat, OutputFormat, ResultSink, column_collisions};
