//! Poet biographies from the introduction spreadsheet.
//!
//! The sheet has a header row with an `author` column and a `produce` column
//! (the biography text). It is read once at startup; keys are normalized with
//! [`clean_author_name`] and the first row for an author wins.

use calamine::{open_workbook_auto, Data, Reader};
use std::collections::HashMap;
use std::path::Path;
use tracing::{info, warn};

use crate::error::{Result, ServiceError};
use crate::utils::sanitize::clean_author_name;

const AUTHOR_COLUMN: &str = "author";
const BIO_COLUMN: &str = "produce";

/// In-memory biography lookup.
#[derive(Debug, Default, Clone)]
pub struct BioStore {
    entries: HashMap<String, String>,
}

impl BioStore {
    /// Build from `(author, biography)` pairs.
    pub fn from_entries<I, A, B>(entries: I) -> Self
    where
        I: IntoIterator<Item = (A, B)>,
        A: AsRef<str>,
        B: Into<String>,
    {
        let mut map = HashMap::new();
        for (author, bio) in entries {
            let key = clean_author_name(author.as_ref());
            let bio = bio.into();
            if key.is_empty() || bio.trim().is_empty() {
                continue;
            }
            map.entry(key).or_insert(bio);
        }
        Self { entries: map }
    }

    /// Read the first worksheet of an xlsx/xls/ods file.
    pub fn from_spreadsheet(path: &Path) -> Result<Self> {
        let mut workbook = open_workbook_auto(path)
            .map_err(|e| ServiceError::Config(format!("cannot open {}: {e}", path.display())))?;
        let range = workbook
            .worksheet_range_at(0)
            .ok_or_else(|| ServiceError::Config(format!("{} has no sheets", path.display())))?
            .map_err(|e| ServiceError::Config(format!("cannot read {}: {e}", path.display())))?;

        let mut rows = range.rows();
        let header = rows
            .next()
            .ok_or_else(|| ServiceError::Config(format!("{} is empty", path.display())))?;
        let author_idx = column_index(header, AUTHOR_COLUMN, path)?;
        let bio_idx = column_index(header, BIO_COLUMN, path)?;

        Ok(Self::from_entries(rows.filter_map(|row| {
            let author = row.get(author_idx)?.to_string();
            let bio = row.get(bio_idx)?.to_string();
            Some((author, bio))
        })))
    }

    /// Load the spreadsheet, or log and return an empty store.
    pub fn load_or_empty(path: &Path) -> Self {
        match Self::from_spreadsheet(path) {
            Ok(store) => {
                info!(entries = store.len(), path = %path.display(), "Loaded biographies");
                store
            }
            Err(e) => {
                warn!("Biographies unavailable, serving none: {e}");
                Self::default()
            }
        }
    }

    /// Biography for `name` in any accepted spelling.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .get(&clean_author_name(name))
            .map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn column_index(header: &[Data], name: &str, path: &Path) -> Result<usize> {
    header
        .iter()
        .position(|cell| cell.to_string().trim() == name)
        .ok_or_else(|| {
            ServiceError::Config(format!("{} has no '{name}' column", path.display()))
        })
}
