//! Backup export and import
//!
//! JSON backups hold the whole library plus an export timestamp and a
//! format version. CSV export is a flat, one-row-per-shelved-record view
//! meant for spreadsheets; there is no CSV import.
//!
//! Imports are validated up front: a document that is not an object with
//! `bookshelves` and `favorites` is rejected before anything changes.
//! Individual books inside an otherwise valid document that lack an id or a
//! title are skipped and counted.

use std::collections::BTreeMap;
use std::io;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::models::{BookRecord, LibraryState, ShelfName, Shelves};

/// Format version written into every backup
pub const BACKUP_VERSION: &str = "1.0";

/// CSV column names
pub const CSV_HEADER: [&str; 7] = [
    "title", "author", "category", "shelf", "pageCount", "year", "rating",
];

/// A JSON backup document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Backup {
    pub bookshelves: Shelves,
    pub favorites: Vec<BookRecord>,
    pub search_history: Vec<String>,
    pub export_date: DateTime<Utc>,
    pub version: String,
}

impl Backup {
    pub fn from_state(state: &LibraryState, export_date: DateTime<Utc>) -> Self {
        Self {
            bookshelves: state.shelves.clone(),
            favorites: state.favorites.clone(),
            search_history: state.search_history.clone(),
            export_date,
            version: BACKUP_VERSION.to_string(),
        }
    }
}

/// Errors producing an export
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Failed to encode backup: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to write CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("Failed to flush CSV: {0}")]
    Io(#[from] io::Error),

    #[error("CSV output is not valid UTF-8")]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// Errors rejecting an import document
#[derive(Error, Debug)]
pub enum ImportError {
    #[error("Invalid JSON: {0}")]
    InvalidJson(#[source] serde_json::Error),

    #[error("Invalid backup format: expected a JSON object")]
    NotAnObject,

    #[error("Invalid backup format: missing '{0}'")]
    MissingField(&'static str),

    #[error("Invalid backup format: '{field}' must be {expected}")]
    InvalidField {
        field: &'static str,
        expected: &'static str,
    },
}

/// Validated contents of an import document
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImportPlan {
    /// Books to add, in shelf order then document order
    pub shelved: Vec<(ShelfName, BookRecord)>,
    pub favorites: Vec<BookRecord>,
    /// Entries dropped during validation
    pub skipped: usize,
}

impl ImportPlan {
    pub fn is_empty(&self) -> bool {
        self.shelved.is_empty() && self.favorites.is_empty()
    }
}

/// Outcome of merging an import into a library
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportReport {
    /// Shelf placements that were new
    pub added: usize,
    /// Shelf placements the library already had
    pub already_present: usize,
    pub favorites_added: usize,
    pub skipped: usize,
}

/// Render the library as a pretty-printed JSON backup
pub fn export_json(state: &LibraryState, export_date: DateTime<Utc>) -> Result<String, ExportError> {
    let backup = Backup::from_state(state, export_date);
    Ok(serde_json::to_string_pretty(&backup)?)
}

/// Render shelved books as CSV, one row per shelf placement
pub fn export_csv(state: &LibraryState) -> Result<String, ExportError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(CSV_HEADER)?;

    for (shelf, books) in state.shelves.iter() {
        for book in books {
            let category = book.categories.first().map(String::as_str).unwrap_or("");
            let year = book
                .published_year()
                .map(|year| year.to_string())
                .unwrap_or_default();
            let rating = if book.average_rating > 0.0 {
                book.average_rating.to_string()
            } else {
                String::new()
            };

            writer.write_record([
                book.title.as_str(),
                book.authors.join(", ").as_str(),
                category,
                shelf.as_str(),
                book.page_count.to_string().as_str(),
                year.as_str(),
                rating.as_str(),
            ])?;
        }
    }

    let bytes = writer.into_inner().map_err(|e| e.into_error())?;
    Ok(String::from_utf8(bytes)?)
}

/// Validate an import document
pub fn parse_import(raw: &str) -> Result<ImportPlan, ImportError> {
    let doc: Value = serde_json::from_str(raw).map_err(ImportError::InvalidJson)?;
    let doc = doc.as_object().ok_or(ImportError::NotAnObject)?;

    let shelves = doc
        .get("bookshelves")
        .ok_or(ImportError::MissingField("bookshelves"))?
        .as_object()
        .ok_or(ImportError::InvalidField {
            field: "bookshelves",
            expected: "an object",
        })?;
    let favorites = doc
        .get("favorites")
        .ok_or(ImportError::MissingField("favorites"))?
        .as_array()
        .ok_or(ImportError::InvalidField {
            field: "favorites",
            expected: "an array",
        })?;

    let mut plan = ImportPlan::default();
    let mut by_shelf: BTreeMap<ShelfName, Vec<&Value>> = BTreeMap::new();

    for (name, books) in shelves {
        let books = books.as_array().ok_or(ImportError::InvalidField {
            field: "bookshelves",
            expected: "an object of book arrays",
        })?;

        match name.parse::<ShelfName>() {
            Ok(shelf) => by_shelf.entry(shelf).or_default().extend(books),
            Err(_) => {
                debug!(shelf = %name, count = books.len(), "Skipping unknown shelf");
                plan.skipped += books.len();
            }
        }
    }

    for (shelf, books) in by_shelf {
        for value in books {
            match valid_book(value) {
                Some(book) => plan.shelved.push((shelf, book)),
                None => plan.skipped += 1,
            }
        }
    }

    for value in favorites {
        match valid_book(value) {
            Some(book) => plan.favorites.push(book),
            None => plan.skipped += 1,
        }
    }

    Ok(plan)
}

/// A book with a non-empty string id and title, normalized to a record
fn valid_book(value: &Value) -> Option<BookRecord> {
    let has_text = |field: &str| {
        value
            .get(field)
            .and_then(Value::as_str)
            .is_some_and(|s| !s.trim().is_empty())
    };
    if !has_text("id") || !has_text("title") {
        return None;
    }

    serde_json::from_value(value.clone()).ok()
}
