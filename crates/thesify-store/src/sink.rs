//! Persistence of classified records as CSV and/or JSON.
//!
//! Records are first assembled into a single Arrow `RecordBatch` (passthrough
//! columns as `Utf8`, one `UInt8` column per category) so both formats are
//! written from exactly the same data.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use arrow::array::{ArrayRef, StringArray, UInt8Array};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use chrono::Local;
use thiserror::Error;
use thesify_core::{Catalog, ClassifiedRecord};
use tracing::info;

use crate::StoreError;

pub const FILE_STEM: &str = "classification_results";
const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Which artefacts a run produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    Csv,
    Json,
    #[default]
    Both,
}

impl OutputFormat {
    fn extensions(self) -> &'static [&'static str] {
        match self {
            Self::Csv => &["csv"],
            Self::Json => &["json"],
            Self::Both => &["csv", "json"],
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown output format '{0}': choose 'csv', 'json' or 'both'")]
pub struct InvalidOutputFormat(pub String);

impl FromStr for OutputFormat {
    type Err = InvalidOutputFormat;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "json" => Ok(Self::Json),
            "both" => Ok(Self::Both),
            _ => Err(InvalidOutputFormat(s.to_string())),
        }
    }
}

/// Writes timestamped result files into a directory.
#[derive(Debug, Clone)]
pub struct ResultSink {
    dir: PathBuf,
    format: OutputFormat,
}

impl ResultSink {
    pub fn new(dir: impl Into<PathBuf>, format: OutputFormat) -> Self {
        Self {
            dir: dir.into(),
            format,
        }
    }

    /// Write `records`, returning the paths created.
    ///
    /// Does nothing (and returns no paths) when `records` is empty.
    pub fn write(
        &self,
        catalog: &Catalog,
        records: &[ClassifiedRecord],
    ) -> Result<Vec<PathBuf>, StoreError> {
        let stamp = Local::now().format(TIMESTAMP_FORMAT).to_string();
        self.write_stamped(catalog, records, &stamp)
    }

    fn write_stamped(
        &self,
        catalog: &Catalog,
        records: &[ClassifiedRecord],
        stamp: &str,
    ) -> Result<Vec<PathBuf>, StoreError> {
        if records.is_empty() {
            info!("no classified records; nothing written");
            return Ok(Vec::new());
        }

        let batch = records_to_batch(catalog, records)?;
        let mut written = Vec::new();

        for ext in self.format.extensions() {
            let (path, file) = create_unique(&self.dir, stamp, ext)?;
            let mut out = BufWriter::new(file);
            match *ext {
                "csv" => write_csv(&mut out, &batch)?,
                _ => write_json(&mut out, &batch)?,
            }
            out.flush()?;
            info!(path = %path.display(), rows = batch.num_rows(), "wrote results");
            written.push(path);
        }

        Ok(written)
    }
}

/// Catalog labels that also appear as passthrough column names.
pub fn column_collisions<'a>(
    catalog: &Catalog,
    passthrough: impl IntoIterator<Item = &'a str>,
) -> Vec<String> {
    passthrough
        .into_iter()
        .filter(|name| catalog.contains(name))
        .map(String::from)
        .collect()
}

/// Assemble records into one batch: passthrough columns, then one `UInt8`
/// column per category in catalog order.
pub fn records_to_batch(
    catalog: &Catalog,
    records: &[ClassifiedRecord],
) -> Result<RecordBatch, StoreError> {
    let Some(first) = records.first() else {
        return Ok(RecordBatch::new_empty(Arc::new(Schema::empty())));
    };
    let passthrough: Vec<&str> = first.passthrough_names().collect();
    if let Some(name) = column_collisions(catalog, passthrough.iter().copied()).into_iter().next() {
        return Err(StoreError::ColumnCollision(name));
    }

    for (i, record) in records.iter().enumerate() {
        let same_passthrough = record.passthrough_names().eq(passthrough.iter().copied());
        let same_flags = record.flags.iter().map(|(l, _)| l.as_str()).eq(catalog.labels());
        if !same_passthrough || !same_flags {
            return Err(StoreError::InconsistentColumns(i));
        }
    }

    let mut fields = Vec::with_capacity(passthrough.len() + catalog.len());
    let mut columns: Vec<ArrayRef> = Vec::with_capacity(fields.capacity());

    for (idx, name) in passthrough.iter().enumerate() {
        fields.push(Field::new(*name, DataType::Utf8, false));
        let values: Vec<&str> = records
            .iter()
            .map(|r| r.passthrough[idx].1.as_str())
            .collect();
        columns.push(Arc::new(StringArray::from(values)));
    }

    for (idx, label) in catalog.labels().enumerate() {
        fields.push(Field::new(label, DataType::UInt8, false));
        let values: Vec<u8> = records.iter().map(|r| r.flags[idx].1).collect();
        columns.push(Arc::new(UInt8Array::from(values)));
    }

    Ok(RecordBatch::try_new(Arc::new(Schema::new(fields)), columns)?)
}

fn write_csv<W: Write>(out: W, batch: &RecordBatch) -> Result<(), StoreError> {
    let mut writer = arrow::csv::WriterBuilder::new().with_header(true).build(out);
    writer.write(batch)?;
    Ok(())
}

fn write_json<W: Write>(out: W, batch: &RecordBatch) -> Result<(), StoreError> {
    let mut writer = arrow::json::ArrayWriter::new(out);
    writer.write(batch)?;
    writer.finish()?;
    Ok(())
}

/// Create `<stem>_<stamp>.<ext>`, appending `_1`, `_2`, … if the name is taken.
fn create_unique(dir: &Path, stamp: &str, ext: &str) -> Result<(PathBuf, File), StoreError> {
    let mut attempt = 0u32;
    loop {
        let name = if attempt == 0 {
            format!("{FILE_STEM}_{stamp}.{ext}")
        } else {
            format!("{FILE_STEM}_{stamp}_{attempt}.{ext}")
        };
        let path = dir.join(name);
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => return Ok((path, file)),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => attempt += 1,
            Err(e) => return Err(e.into()),
        }
    }
}
