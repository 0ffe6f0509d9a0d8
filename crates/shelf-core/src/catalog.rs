//! Catalog contract
//!
//! The library never talks to the catalog service itself. This module
//! defines what it expects from one: search options, a result page of
//! normalized `BookRecord`s, and the query strings used for advanced,
//! category and author searches. `normalize_volume` maps the Google Books
//! volume shape onto `BookRecord`.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use serde_json::Value;

use crate::models::{
    BookRecord, NO_DESCRIPTION, UNKNOWN_AUTHOR, UNKNOWN_DATE, UNKNOWN_LANGUAGE,
    UNKNOWN_PUBLISHER, UNKNOWN_TITLE,
};

/// Google Books API base URL
pub const DEFAULT_CATALOG_URL: &str = "https://www.googleapis.com/books/v1";

/// Default page size
pub const DEFAULT_MAX_RESULTS: u32 = 20;

/// Largest page size the catalog accepts
pub const MAX_PAGE_SIZE: u32 = 40;

static NULL: Value = Value::Null;

/// Generic queries used to surface popular books
pub const POPULAR_QUERIES: [&str; 4] = [
    "bestseller",
    "popular fiction",
    "award winning",
    "new york times",
];

/// Result ordering
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OrderBy {
    #[default]
    Relevance,
    Newest,
}

impl OrderBy {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderBy::Relevance => "relevance",
            OrderBy::Newest => "newest",
        }
    }
}

impl fmt::Display for OrderBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderBy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "relevance" => Ok(OrderBy::Relevance),
            "newest" => Ok(OrderBy::Newest),
            _ => Err(format!(
                "Invalid order '{}'. Valid options: relevance, newest",
                s
            )),
        }
    }
}

/// Paging and filtering for a search
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchOptions {
    pub start_index: u32,
    pub max_results: u32,
    pub order_by: OrderBy,
    /// Catalog filter such as `ebooks` or `free-ebooks`
    pub filter: Option<String>,
    /// Two-letter language code
    pub lang_restrict: Option<String>,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            start_index: 0,
            max_results: DEFAULT_MAX_RESULTS,
            order_by: OrderBy::Relevance,
            filter: None,
            lang_restrict: None,
        }
    }
}

impl SearchOptions {
    /// Results per page the catalog will actually return
    pub fn page_size(&self) -> u32 {
        page_size(self.max_results)
    }

    /// Query parameters for a volumes request, without `q`
    pub fn query_params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("startIndex", self.start_index.to_string()),
            ("maxResults", self.page_size().to_string()),
            ("orderBy", self.order_by.to_string()),
        ];
        if let Some(filter) = &self.filter {
            params.push(("filter", filter.clone()));
        }
        if let Some(lang) = &self.lang_restrict {
            params.push(("langRestrict", lang.clone()));
        }
        params
    }
}

/// One page of search results
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResults {
    pub books: Vec<BookRecord>,
    /// Total matches reported by the catalog
    pub total_items: u32,
}

impl SearchResults {
    /// Build from a volumes response body
    ///
    /// Volumes that cannot be normalized (no id) are dropped.
    pub fn from_response(body: &Value) -> Self {
        let books = body
            .get("items")
            .and_then(Value::as_array)
            .map(|items| items.iter().filter_map(normalize_volume).collect())
            .unwrap_or_default();
        let total_items = body
            .get("totalItems")
            .and_then(Value::as_u64)
            .map(|n| n.min(u64::from(u32::MAX)) as u32)
            .unwrap_or(0);

        Self { books, total_items }
    }

    /// Whether more results follow the page requested with `options`
    pub fn has_more(&self, options: &SearchOptions) -> bool {
        u64::from(options.start_index) + (self.books.len() as u64) < u64::from(self.total_items)
    }
}

/// Map a catalog volume onto a `BookRecord`
///
/// Missing fields take their placeholder values. Returns `None` only when
/// the volume has no id.
pub fn normalize_volume(volume: &Value) -> Option<BookRecord> {
    let id = volume.get("id").and_then(Value::as_str)?.trim();
    if id.is_empty() {
        return None;
    }

    let info = volume.get("volumeInfo").unwrap_or(&NULL);
    let text = |field: &str| {
        info.get(field)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };
    let strings = |field: &str| -> Vec<String> {
        info.get(field)
            .and_then(Value::as_array)
            .map(|values| {
                values
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    };

    let mut authors = strings("authors");
    if authors.is_empty() {
        authors.push(UNKNOWN_AUTHOR.to_string());
    }

    let image = |kind: &str| {
        info.get("imageLinks")
            .and_then(|links| links.get(kind))
            .and_then(Value::as_str)
            .map(str::to_string)
    };

    Some(BookRecord {
        id: id.to_string(),
        title: text("title").unwrap_or_else(|| UNKNOWN_TITLE.to_string()),
        authors,
        description: text("description").unwrap_or_else(|| NO_DESCRIPTION.to_string()),
        thumbnail_url: image("thumbnail").or_else(|| image("smallThumbnail")),
        published_date: text("publishedDate").unwrap_or_else(|| UNKNOWN_DATE.to_string()),
        page_count: info
            .get("pageCount")
            .and_then(Value::as_u64)
            .and_then(|n| u32::try_from(n).ok())
            .unwrap_or(0),
        categories: strings("categories"),
        language: text("language").unwrap_or_else(|| UNKNOWN_LANGUAGE.to_string()),
        publisher: text("publisher").unwrap_or_else(|| UNKNOWN_PUBLISHER.to_string()),
        isbn: isbn(info),
        average_rating: info
            .get("averageRating")
            .and_then(Value::as_f64)
            .unwrap_or(0.0),
        ratings_count: info
            .get("ratingsCount")
            .and_then(Value::as_u64)
            .and_then(|n| u32::try_from(n).ok())
            .unwrap_or(0),
        preview_url: text("previewLink"),
        info_url: text("infoLink"),
    })
}

/// ISBN-13 when listed, else ISBN-10
fn isbn(info: &Value) -> Option<String> {
    let identifiers = info.get("industryIdentifiers")?.as_array()?;
    let find = |kind: &str| {
        identifiers
            .iter()
            .find(|id| id.get("type").and_then(Value::as_str) == Some(kind))
            .and_then(|id| id.get("identifier"))
            .and_then(Value::as_str)
            .map(str::to_string)
    };
    find("ISBN_13").or_else(|| find("ISBN_10"))
}

/// Clamp a requested page size to `1..=MAX_PAGE_SIZE`
pub fn page_size(requested: u32) -> u32 {
    requested.clamp(1, MAX_PAGE_SIZE)
}

/// Field-scoped search
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdvancedQuery {
    pub title: Option<String>,
    pub author: Option<String>,
    pub subject: Option<String>,
    pub isbn: Option<String>,
    pub publisher: Option<String>,
}

impl AdvancedQuery {
    /// Catalog query string; `books` when no field is set
    pub fn to_query(&self) -> String {
        let present = |value: &Option<String>| {
            value
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };

        let mut parts = Vec::new();
        if let Some(title) = present(&self.title) {
            parts.push(format!("intitle:\"{}\"", title));
        }
        if let Some(author) = present(&self.author) {
            parts.push(format!("inauthor:\"{}\"", author));
        }
        if let Some(subject) = present(&self.subject) {
            parts.push(format!("subject:\"{}\"", subject));
        }
        if let Some(isbn) = present(&self.isbn) {
            parts.push(format!("isbn:{}", isbn));
        }
        if let Some(publisher) = present(&self.publisher) {
            parts.push(format!("inpublisher:\"{}\"", publisher));
        }

        if parts.is_empty() {
            "books".to_string()
        } else {
            parts.join("+")
        }
    }
}

/// Query for books in a subject
pub fn category_query(subject: &str) -> String {
    format!("subject:{}", subject.trim())
}

/// Query for books by an author
pub fn author_query(author: &str) -> String {
    format!("inauthor:\"{}\"", author.trim())
}

/// Query for books published in a year, meant for `OrderBy::Newest`
pub fn recent_query(year: i32) -> String {
    format!("publishedDate:{}", year)
}

/// One of the popular queries, chosen by `seed`
pub fn popular_query(seed: usize) -> &'static str {
    POPULAR_QUERIES[seed % POPULAR_QUERIES.len()]
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_normalize_full_volume() {
        let volume = json!({
            "id": "zyTCAlFPjgYC",
            "volumeInfo": {
                "title": "Dune",
                "authors": ["Frank Herbert"],
                "publishedDate": "1965",
                "pageCount": 412,
                "categories": ["Fiction"],
                "language": "en",
                "publisher": "Chilton",
                "averageRating": 4.5,
                "ratingsCount": 120,
                "imageLinks": {
                    "smallThumbnail": "http://small",
                    "thumbnail": "http://thumb"
                },
                "industryIdentifiers": [
                    {"type": "ISBN_10", "identifier": "0441013597"},
                    {"type": "ISBN_13", "identifier": "9780441013593"}
                ],
                "previewLink": "http://preview",
                "infoLink": "http://info"
            }
        });

        let book = normalize_volume(&volume).unwrap();
        assert_eq!(book.id, "zyTCAlFPjgYC");
        assert_eq!(book.title, "Dune");
        assert_eq!(book.first_author(), "Frank Herbert");
        assert_eq!(book.page_count, 412);
        assert_eq!(book.isbn.as_deref(), Some("9780441013593"));
        assert_eq!(book.thumbnail_url.as_deref(), Some("http://thumb"));
        assert_eq!(book.average_rating, 4.5);
        assert_eq!(book.ratings_count, 120);
        assert_eq!(book.preview_url.as_deref(), Some("http://preview"));
    }

    #[test]
    fn test_normalize_sparse_volume() {
        let book = normalize_volume(&json!({"id": "X1"})).unwrap();

        assert_eq!(book.title, UNKNOWN_TITLE);
        assert_eq!(book.authors, vec![UNKNOWN_AUTHOR]);
        assert_eq!(book.description, NO_DESCRIPTION);
        assert_eq!(book.published_date, UNKNOWN_DATE);
        assert_eq!(book.language, UNKNOWN_LANGUAGE);
        assert_eq!(book.publisher, UNKNOWN_PUBLISHER);
        assert_eq!(book.page_count, 0);
        assert!(book.isbn.is_none());
        assert!(book.thumbnail_url.is_none());
    }

    #[test]
    fn test_normalize_fallbacks() {
        let volume = json!({
            "id": "X2",
            "volumeInfo": {
                "authors": [],
                "imageLinks": {"smallThumbnail": "http://small"},
                "industryIdentifiers": [{"type": "ISBN_10", "identifier": "0441013597"}]
            }
        });

        let book = normalize_volume(&volume).unwrap();
        assert_eq!(book.authors, vec![UNKNOWN_AUTHOR]);
        assert_eq!(book.thumbnail_url.as_deref(), Some("http://small"));
        assert_eq!(book.isbn.as_deref(), Some("0441013597"));
    }

    #[test]
    fn test_normalize_requires_id() {
        assert!(normalize_volume(&json!({"volumeInfo": {"title": "Dune"}})).is_none());
        assert!(normalize_volume(&json!({"id": ""})).is_none());
    }

    #[test]
    fn test_search_results_from_response() {
        let body = json!({
            "totalItems": 57,
            "items": [{"id": "A"}, {"volumeInfo": {}}, {"id": "B"}]
        });

        let results = SearchResults::from_response(&body);
        assert_eq!(results.total_items, 57);
        assert_eq!(results.books.len(), 2);
        assert!(results.has_more(&SearchOptions::default()));
        assert!(!results.has_more(&SearchOptions {
            start_index: 55,
            ..SearchOptions::default()
        }));
    }

    #[test]
    fn test_search_results_empty_response() {
        let results = SearchResults::from_response(&json!({"kind": "books#volumes"}));
        assert!(results.books.is_empty());
        assert_eq!(results.total_items, 0);
    }

    #[test]
    fn test_query_params() {
        let options = SearchOptions {
            max_results: 100,
            filter: Some("ebooks".to_string()),
            lang_restrict: Some("en".to_string()),
            ..SearchOptions::default()
        };

        let params = options.query_params();
        assert!(params.contains(&("startIndex", "0".to_string())));
        assert!(params.contains(&("maxResults", "40".to_string())));
        assert!(params.contains(&("orderBy", "relevance".to_string())));
        assert!(params.contains(&("filter", "ebooks".to_string())));
        assert!(params.contains(&("langRestrict", "en".to_string())));
    }

    #[test]
    fn test_page_size_is_clamped() {
        assert_eq!(page_size(0), 1);
        assert_eq!(page_size(20), 20);
        assert_eq!(page_size(100), MAX_PAGE_SIZE);

        let options = SearchOptions {
            max_results: 0,
            ..SearchOptions::default()
        };
        assert!(options.query_params().contains(&("maxResults", "1".to_string())));
    }

    #[test]
    fn test_advanced_query() {
        let query = AdvancedQuery {
            title: Some("Dune".to_string()),
            author: Some("Frank Herbert".to_string()),
            isbn: Some("9780441013593".to_string()),
            publisher: Some("  ".to_string()),
            ..AdvancedQuery::default()
        };
        assert_eq!(
            query.to_query(),
            "intitle:\"Dune\"+inauthor:\"Frank Herbert\"+isbn:9780441013593"
        );
        assert_eq!(AdvancedQuery::default().to_query(), "books");
    }

    #[test]
    fn test_simple_queries() {
        assert_eq!(category_query("Fiction"), "subject:Fiction");
        assert_eq!(author_query("Jane Austen"), "inauthor:\"Jane Austen\"");
        assert_eq!(recent_query(2024), "publishedDate:2024");
        assert_eq!(popular_query(5), "popular fiction");
    }

    #[test]
    fn test_order_by_parse() {
        assert_eq!("Newest".parse::<OrderBy>().unwrap(), OrderBy::Newest);
        assert!("oldest".parse::<OrderBy>().is_err());
    }
}
