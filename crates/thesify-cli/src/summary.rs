//! End-of-run summary: how many theses were flagged for each category.

use std::sync::Arc;

use arrow::array::{Float64Array, StringArray, UInt64Array};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use arrow::util::pretty::pretty_format_batches;
use thesify_core::ClassifiedRecord;

/// Per-category hit counts as a batch: `category`, `theses`, `share`.
///
/// Categories keep catalog order. Empty input yields an empty batch.
pub fn category_counts(records: &[ClassifiedRecord]) -> anyhow::Result<RecordBatch> {
    let labels: Vec<&str> = records
        .first()
        .map(|r| r.flags.iter().map(|(l, _)| l.as_str()).collect())
        .unwrap_or_default();

    let mut counts = vec![0u64; labels.len()];
    for record in records {
        for (count, (_, flag)) in counts.iter_mut().zip(&record.flags) {
            *count += u64::from(*flag);
        }
    }
    let total = records.len().max(1) as f64;
    let shares: Vec<f64> = counts.iter().map(|&c| c as f64 / total).collect();

    let schema = Schema::new(vec![
        Field::new("category", DataType::Utf8, false),
        Field::new("theses", DataType::UInt64, false),
        Field::new("share", DataType::Float64, false),
    ]);
    Ok(RecordBatch::try_new(
        Arc::new(schema),
        vec![
            Arc::new(StringArray::from(labels)),
            Arc::new(UInt64Array::from(counts)),
            Arc::new(Float64Array::from(shares)),
        ],
    )?)
}

/// Print the per-category table to stdout.
pub fn print_summary(records: &[ClassifiedRecord]) -> anyhow::Result<()> {
    if records.is_empty() {
        println!("No theses classified.");
        return Ok(());
    }
    let batch = category_counts(records)?;
    println!("{}", pretty_format_batches(&[batch])?);
    Ok(())
}
