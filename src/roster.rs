use crate::error::{Error, Result};
use crate::recipient::{RecipientName, RecipientRow};
use std::path::Path;
use tracing::debug;

const REQUIRED_COLUMNS: [&str; 3] = ["FirstName", "LastName", "Email"];

/// Loads the participant roster from CSV. The three required columns must be
/// present; extra columns are ignored. Values are trimmed, and a UTF-8 BOM
/// on the first header cell is tolerated.
pub fn load_roster(path: &Path) -> Result<Vec<RecipientRow>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)?;

    let headers = reader.headers()?.clone();
    let mut indices = [0usize; 3];
    for (slot, column) in indices.iter_mut().zip(REQUIRED_COLUMNS) {
        *slot = headers
            .iter()
            .position(|header| header.trim_start_matches('\u{feff}') == column)
            .ok_or_else(|| {
                Error::Config(format!(
                    "participants file {} is missing the {column} column",
                    path.display()
                ))
            })?;
    }

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let field = |index: usize| record.get(index).unwrap_or("").trim().to_string();
        rows.push(RecipientRow {
            name: RecipientName::new(field(indices[0]), field(indices[1])),
            email: field(indices[2]),
        });
    }
    debug!(count = rows.len(), path = %path.display(), "loaded participant roster");
    Ok(rows)
}
