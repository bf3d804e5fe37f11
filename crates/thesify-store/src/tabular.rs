//! Tabular file reading: CSV or Parquet into string-typed Arrow batches.
//!
//! Every column is normalised to nullable `Utf8` so values pass through to
//! the output exactly as they were written (no numeric re-formatting, no
//! lost leading zeros).

use std::fs::File;
use std::io::Seek;
use std::path::Path;
use std::sync::Arc;

use arrow::array::{Array, StringArray};
use arrow::compute::cast;
use arrow::csv::ReaderBuilder;
use arrow::csv::reader::Format;
use arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use arrow::record_batch::RecordBatch;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use tracing::debug;

use crate::StoreError;

/// Supported input formats, chosen by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TableFormat {
    Csv,
    Parquet,
}

impl TableFormat {
    fn from_path(path: &Path) -> Result<Self, StoreError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());
        match ext.as_deref() {
            Some("csv") => Ok(Self::Csv),
            Some("parquet") => Ok(Self::Parquet),
            _ => Err(StoreError::UnsupportedFormat(path.to_path_buf())),
        }
    }
}

/// A file's header schema plus its rows. The schema is known even when
/// there are no rows.
#[derive(Debug, Clone)]
pub struct Table {
    pub schema: SchemaRef,
    pub batches: Vec<RecordBatch>,
}

impl Table {
    /// Column names in file order.
    pub fn column_names(&self) -> Vec<String> {
        self.schema.fields().iter().map(|f| f.name().clone()).collect()
    }

    /// Fail with `MissingColumn` unless the header declares `column`.
    pub fn require_column(&self, path: &Path, column: &str) -> Result<(), StoreError> {
        if self.schema.column_with_name(column).is_some() {
            Ok(())
        } else {
            Err(StoreError::MissingColumn {
                path: path.to_path_buf(),
                column: column.to_string(),
            })
        }
    }

    pub fn num_rows(&self) -> usize {
        self.batches.iter().map(|b| b.num_rows()).sum()
    }
}

/// Read a CSV or Parquet file into batches whose columns are all `Utf8`.
///
/// A zero-byte file, or one whose header declares no columns, is an error.
pub fn read_table(path: &Path) -> Result<Table, StoreError> {
    if !path.exists() {
        return Err(StoreError::NotFound(path.to_path_buf()));
    }
    let format = TableFormat::from_path(path)?;
    if std::fs::metadata(path)?.len() == 0 {
        return Err(StoreError::EmptyTable(path.to_path_buf()));
    }
    let table = match format {
        TableFormat::Csv => read_csv(path)?,
        TableFormat::Parquet => read_parquet(path)?,
    };
    if table.schema.fields().is_empty() {
        return Err(StoreError::EmptyTable(path.to_path_buf()));
    }
    debug!(path = %path.display(), rows = table.num_rows(), "read table");
    Ok(table)
}

fn read_csv(path: &Path) -> Result<Table, StoreError> {
    let mut file = File::open(path)?;
    let (inferred, _) = Format::default()
        .with_header(true)
        .infer_schema(&mut file, Some(1))?;
    file.rewind()?;

    let schema = Arc::new(utf8_schema(&inferred));
    let reader = ReaderBuilder::new(schema.clone()).with_header(true).build(file)?;
    let batches = reader.collect::<Result<Vec<_>, _>>()?;
    Ok(Table { schema, batches })
}

fn read_parquet(path: &Path) -> Result<Table, StoreError> {
    let file = File::open(path)?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)?;
    let schema = Arc::new(utf8_schema(builder.schema()));
    let batches = builder
        .build()?
        .map(|batch| stringify(batch?))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Table { schema, batches })
}

/// Cast every column of `batch` to `Utf8`.
fn stringify(batch: RecordBatch) -> Result<RecordBatch, StoreError> {
    let schema = Arc::new(utf8_schema(&batch.schema()));
    let columns = batch
        .columns()
        .iter()
        .map(|col| cast(col, &DataType::Utf8))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(RecordBatch::try_new(schema, columns)?)
}

fn utf8_schema(schema: &Schema) -> Schema {
    let fields: Vec<Field> = schema
        .fields()
        .iter()
        .map(|f| Field::new(f.name(), DataType::Utf8, true))
        .collect();
    Schema::new(fields)
}

/// Look up a `Utf8` column by name.
pub fn string_column<'a>(batch: &'a RecordBatch, name: &str) -> Option<&'a StringArray> {
    batch
        .column_by_name(name)
        .and_then(|col| col.as_any().downcast_ref::<StringArray>())
}

/// Read one cell, mapping null to `None`.
pub fn get_string(col: &StringArray, row: usize) -> Option<&str> {
    if col.is_null(row) {
        None
    } else {
        Some(col.value(row))
    }
}
