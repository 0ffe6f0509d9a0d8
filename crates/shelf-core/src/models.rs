//! Data models for SHELF
//!
//! Defines the core data structures: BookRecord, ShelfName, Shelves and
//! LibraryState. These are the shapes persisted to storage, written to
//! backups and produced by catalog normalization.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};

/// Placeholder author used when the catalog lists none
pub const UNKNOWN_AUTHOR: &str = "Unknown Author";
/// Placeholder title used when the catalog lists none
pub const UNKNOWN_TITLE: &str = "Unknown Title";
/// Placeholder description
pub const NO_DESCRIPTION: &str = "No description available";
/// Placeholder publication date
pub const UNKNOWN_DATE: &str = "Unknown";
/// Placeholder language code
pub const UNKNOWN_LANGUAGE: &str = "unknown";
/// Placeholder publisher
pub const UNKNOWN_PUBLISHER: &str = "Unknown Publisher";

/// Maximum number of remembered search terms
pub const SEARCH_HISTORY_LIMIT: usize = 10;

/// Normalized book metadata
///
/// `id` is the identity of a record: two records with the same `id` are the
/// same book even if the rest of their fields differ.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BookRecord {
    /// Stable catalog identifier
    pub id: String,
    #[serde(default = "default_title")]
    pub title: String,
    /// Never empty
    #[serde(default = "default_authors", deserialize_with = "deserialize_authors")]
    pub authors: Vec<String>,
    #[serde(default = "default_description")]
    pub description: String,
    #[serde(default, alias = "thumbnail")]
    pub thumbnail_url: Option<String>,
    /// Partial ISO date ("1965", "1965-08", "1965-08-01") or "Unknown"
    #[serde(default = "default_date")]
    pub published_date: String,
    /// 0 when unknown
    #[serde(default)]
    pub page_count: u32,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default = "default_publisher")]
    pub publisher: String,
    #[serde(default)]
    pub isbn: Option<String>,
    /// 0.0 to 5.0, 0.0 meaning no rating
    #[serde(default)]
    pub average_rating: f64,
    #[serde(default)]
    pub ratings_count: u32,
    #[serde(default, alias = "previewLink")]
    pub preview_url: Option<String>,
    #[serde(default, alias = "infoLink")]
    pub info_url: Option<String>,
}

fn default_title() -> String {
    UNKNOWN_TITLE.to_string()
}

fn default_authors() -> Vec<String> {
    vec![UNKNOWN_AUTHOR.to_string()]
}

fn default_description() -> String {
    NO_DESCRIPTION.to_string()
}

fn default_date() -> String {
    UNKNOWN_DATE.to_string()
}

fn default_language() -> String {
    UNKNOWN_LANGUAGE.to_string()
}

fn default_publisher() -> String {
    UNKNOWN_PUBLISHER.to_string()
}

/// Accepts a missing, null or empty author list and falls back to the sentinel
fn deserialize_authors<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let authors: Option<Vec<String>> = Option::deserialize(deserializer)?;
    Ok(match authors {
        Some(authors) if !authors.is_empty() => authors,
        _ => default_authors(),
    })
}

impl BookRecord {
    /// Create a record with the given identity and title; everything else
    /// takes its placeholder value
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            authors: default_authors(),
            description: default_description(),
            thumbnail_url: None,
            published_date: default_date(),
            page_count: 0,
            categories: Vec::new(),
            language: default_language(),
            publisher: default_publisher(),
            isbn: None,
            average_rating: 0.0,
            ratings_count: 0,
            preview_url: None,
            info_url: None,
        }
    }

    /// Set the authors (an empty list keeps the placeholder)
    pub fn with_authors<I, S>(mut self, authors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let authors: Vec<String> = authors.into_iter().map(Into::into).collect();
        if !authors.is_empty() {
            self.authors = authors;
        }
        self
    }

    pub fn with_categories<I, S>(mut self, categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.categories = categories.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_page_count(mut self, page_count: u32) -> Self {
        self.page_count = page_count;
        self
    }

    pub fn with_published_date(mut self, date: impl Into<String>) -> Self {
        self.published_date = date.into();
        self
    }

    pub fn with_rating(mut self, average: f64, count: u32) -> Self {
        self.average_rating = average;
        self.ratings_count = count;
        self
    }

    /// First listed author
    pub fn first_author(&self) -> &str {
        self.authors
            .first()
            .map(String::as_str)
            .unwrap_or(UNKNOWN_AUTHOR)
    }

    /// Publication year, if the date starts with a number
    pub fn published_year(&self) -> Option<i32> {
        self.published_date
            .split('-')
            .next()
            .map(str::trim)
            .filter(|year| !year.is_empty())
            .and_then(|year| year.parse().ok())
    }

    /// Whether the record carries the minimum a shelf needs
    pub fn is_valid(&self) -> bool {
        !self.id.trim().is_empty() && !self.title.trim().is_empty()
    }
}

/// A named shelf
///
/// Favorites are not a shelf: a book is favorited independently of where
/// it is shelved.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "camelCase")]
pub enum ShelfName {
    ToRead,
    Reading,
    Read,
}

impl ShelfName {
    /// All shelves in iteration order
    pub const ALL: [ShelfName; 3] = [ShelfName::ToRead, ShelfName::Reading, ShelfName::Read];

    /// Persisted name
    pub fn as_str(&self) -> &'static str {
        match self {
            ShelfName::ToRead => "toRead",
            ShelfName::Reading => "reading",
            ShelfName::Read => "read",
        }
    }

    /// Human-readable label
    pub fn label(&self) -> &'static str {
        match self {
            ShelfName::ToRead => "To read",
            ShelfName::Reading => "Reading",
            ShelfName::Read => "Read",
        }
    }
}

impl fmt::Display for ShelfName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown shelf name
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown shelf '{0}'. Valid shelves: toRead, reading, read")]
pub struct UnknownShelf(pub String);

impl FromStr for ShelfName {
    type Err = UnknownShelf;

    /// Accepts `toRead`, `to-read`, `to_read` and friends, case-insensitively
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .chars()
            .filter(|c| *c != '-' && *c != '_' && *c != ' ')
            .collect::<String>()
            .to_lowercase();

        match normalized.as_str() {
            "toread" => Ok(ShelfName::ToRead),
            "reading" => Ok(ShelfName::Reading),
            "read" => Ok(ShelfName::Read),
            _ => Err(UnknownShelf(s.to_string())),
        }
    }
}

/// The three shelves, each in insertion order
///
/// A book may sit on several shelves at once, but never twice on the same
/// shelf. Unknown keys (such as a legacy `favorites` shelf) are ignored when
/// deserializing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Shelves {
    #[serde(default)]
    pub to_read: Vec<BookRecord>,
    #[serde(default)]
    pub reading: Vec<BookRecord>,
    #[serde(default)]
    pub read: Vec<BookRecord>,
}

impl Shelves {
    /// Books on a shelf
    pub fn get(&self, shelf: ShelfName) -> &[BookRecord] {
        match shelf {
            ShelfName::ToRead => &self.to_read,
            ShelfName::Reading => &self.reading,
            ShelfName::Read => &self.read,
        }
    }

    fn get_mut(&mut self, shelf: ShelfName) -> &mut Vec<BookRecord> {
        match shelf {
            ShelfName::ToRead => &mut self.to_read,
            ShelfName::Reading => &mut self.reading,
            ShelfName::Read => &mut self.read,
        }
    }

    /// Whether a shelf holds a book with this id
    pub fn contains(&self, shelf: ShelfName, book_id: &str) -> bool {
        self.get(shelf).iter().any(|book| book.id == book_id)
    }

    /// Append a book unless the shelf already holds its id
    ///
    /// Returns true if the shelf changed.
    pub fn insert(&mut self, shelf: ShelfName, book: BookRecord) -> bool {
        if self.contains(shelf, &book.id) {
            return false;
        }
        self.get_mut(shelf).push(book);
        true
    }

    /// Remove every record with this id from a shelf
    ///
    /// Returns true if the shelf changed.
    pub fn remove(&mut self, shelf: ShelfName, book_id: &str) -> bool {
        let books = self.get_mut(shelf);
        let before = books.len();
        books.retain(|book| book.id != book_id);
        books.len() != before
    }

    /// Iterate shelves in `ShelfName::ALL` order
    pub fn iter(&self) -> impl Iterator<Item = (ShelfName, &[BookRecord])> {
        ShelfName::ALL.into_iter().map(move |shelf| (shelf, self.get(shelf)))
    }

    /// Number of shelved records, counting a book once per shelf
    pub fn len(&self) -> usize {
        self.to_read.len() + self.reading.len() + self.read.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Everything the library remembers
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LibraryState {
    #[serde(rename = "bookshelves", default)]
    pub shelves: Shelves,
    /// Unique by id
    #[serde(default)]
    pub favorites: Vec<BookRecord>,
    /// Most recent first, unique, at most `SEARCH_HISTORY_LIMIT` entries
    #[serde(default)]
    pub search_history: Vec<String>,
}

impl LibraryState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.shelves.is_empty() && self.favorites.is_empty() && self.search_history.is_empty()
    }
}
