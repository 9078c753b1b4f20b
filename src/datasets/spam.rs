use std::path::Path;

use derive_new::new;
use serde::{Deserialize, Serialize};

use super::DatasetError;

/// Default location of the labelled messages
pub static DEFAULT_FILE: &str = "spamdata_v2.csv";

/// Class label of a legitimate message
pub const HAM: u8 = 0;

/// Class label of an unsolicited message
pub const SPAM: u8 = 1;

/// Class names, indexed by class id
pub static LABELS: [&str; 2] = ["ham", "spam"];

/// A labeled text message
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, new)]
pub struct Item {
    /// The raw message text
    pub text: String,

    /// 0 for ham, 1 for spam
    pub label: u8,
}

/// Row layout of the delimited file; extra columns are ignored
#[derive(Debug, Deserialize)]
struct Row {
    text: String,
    label: i64,
}

/// Load every record of a delimited file with at least `text` and `label` columns
pub fn load(path: impl AsRef<Path>) -> Result<Vec<Item>, DatasetError> {
    let path = path.as_ref();

    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::Headers)
        .from_path(path)
        .map_err(|source| DatasetError::Open {
            path: path.to_path_buf(),
            source,
        })?;

    let headers = reader
        .headers()
        .map_err(|source| DatasetError::Open {
            path: path.to_path_buf(),
            source,
        })?
        .clone();

    for column in ["text", "label"] {
        if !headers.iter().any(|header| header == column) {
            return Err(DatasetError::MissingColumn {
                path: path.to_path_buf(),
                column,
            });
        }
    }

    let mut items = Vec::new();

    for (index, row) in reader.deserialize::<Row>().enumerate() {
        let row_number = index + 1;
        let row = row.map_err(|source| DatasetError::Row {
            row: row_number,
            source,
        })?;

        let label = match row.label {
            0 => HAM,
            1 => SPAM,
            label => {
                return Err(DatasetError::InvalidLabel {
                    row: row_number,
                    label,
                })
            }
        };

        items.push(Item::new(row.text, label));
    }

    if items.is_empty() {
        return Err(DatasetError::Empty(path.to_path_buf()));
    }

    Ok(items)
}

/// Count the records of each class, indexed by class id
pub fn label_counts(items: &[Item]) -> [usize; 2] {
    items.iter().fold([0, 0], |mut counts, item| {
        counts[item.label as usize] += 1;
        counts
    })
}
