//! Category catalog loading.
//!
//! The catalog file needs a `Label` and a `Description` column; anything
//! else in the file is ignored.

use std::path::Path;

use thesify_core::{Catalog, Category};
use tracing::info;

use crate::StoreError;
use crate::tabular::{get_string, read_table, string_column};

pub const LABEL_COLUMN: &str = "Label";
pub const DESCRIPTION_COLUMN: &str = "Description";

/// Load the category catalog, preserving file order.
///
/// Fails on a missing or empty file, a missing column (even with no rows), a null label, or an
/// empty/duplicate label. A null description is read as empty text.
pub fn load_catalog(path: &Path) -> Result<Catalog, StoreError> {
    let table = read_table(path)?;
    table.require_column(path, LABEL_COLUMN)?;
    table.require_column(path, DESCRIPTION_COLUMN)?;

    let mut categories = Vec::new();
    let mut offset = 0;

    for batch in &table.batches {
        let labels = string_column(batch, LABEL_COLUMN).ok_or_else(|| StoreError::MissingColumn {
            path: path.to_path_buf(),
            column: LABEL_COLUMN.to_string(),
        })?;
        let descriptions =
            string_column(batch, DESCRIPTION_COLUMN).ok_or_else(|| StoreError::MissingColumn {
                path: path.to_path_buf(),
                column: DESCRIPTION_COLUMN.to_string(),
            })?;

        for row in 0..batch.num_rows() {
            let label = get_string(labels, row).ok_or_else(|| StoreError::NullValue {
                path: path.to_path_buf(),
                column: LABEL_COLUMN.to_string(),
                row: offset + row,
            })?;
            let description = get_string(descriptions, row).unwrap_or_default();
            categories.push(Category::new(label, description));
        }
        offset += batch.num_rows();
    }

    let catalog = Catalog::new(categories)?;
    info!(path = %path.display(), categories = catalog.len(), "loaded category catalog");
    Ok(catalog)
}
