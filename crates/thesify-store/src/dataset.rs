//! Thesis dataset loading.

use std::path::Path;

use thesify_core::Document;
use tracing::{info, warn};

use crate::StoreError;
use crate::tabular::{get_string, read_table, string_column};

/// Which dataset columns carry the identifier and the thesis text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetColumns {
    pub identifier: String,
    pub text: String,
}

impl Default for DatasetColumns {
    fn default() -> Self {
        Self {
            identifier: "Link".to_string(),
            text: "Text".to_string(),
        }
    }
}

/// Load up to `limit` documents (all when `None`), in file order.
///
/// Every column except the text column is carried as passthrough. Null
/// cells are read as empty strings.
pub fn load_documents(
    path: &Path,
    columns: &DatasetColumns,
    limit: Option<usize>,
) -> Result<Vec<Document>, StoreError> {
    let table = read_table(path)?;
    table.require_column(path, &columns.identifier)?;
    table.require_column(path, &columns.text)?;
    let names = table.column_names();

    let limit = limit.unwrap_or(usize::MAX);
    let mut documents = Vec::new();

    'batches: for batch in &table.batches {
        let cols: Vec<_> = names
            .iter()
            .map(|name| {
                string_column(batch, name).ok_or_else(|| StoreError::MissingColumn {
                    path: path.to_path_buf(),
                    column: name.clone(),
                })
            })
            .collect::<Result<Vec<_>, StoreError>>()?;

        for row in 0..batch.num_rows() {
            if documents.len() >= limit {
                break 'batches;
            }

            let mut identifier = String::new();
            let mut text = String::new();
            let mut passthrough = Vec::with_capacity(names.len());

            for (name, col) in names.iter().zip(&cols) {
                let value = get_string(col, row).unwrap_or_default().to_string();
                if *name == columns.identifier {
                    identifier.clone_from(&value);
                }
                if *name == columns.text {
                    text = value;
                } else {
                    passthrough.push((name.clone(), value));
                }
            }

            if text.is_empty() {
                warn!(document = %identifier, "document has no text");
            }
            documents.push(Document {
                identifier,
                text,
                passthrough,
            });
        }
    }

    info!(path = %path.display(), documents = documents.len(), "loaded documents");
    Ok(documents)
}
