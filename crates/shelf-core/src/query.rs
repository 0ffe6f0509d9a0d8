//! Derived queries over a library snapshot
//!
//! Everything here is a pure function of a `LibraryState`.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::models::{BookRecord, LibraryState, ShelfName};

/// Default number of entries in top category/author lists
pub const DEFAULT_TOP_N: usize = 5;

/// Whether a shelf holds a book
pub fn is_in_shelf(state: &LibraryState, book_id: &str, shelf: ShelfName) -> bool {
    state.shelves.contains(shelf, book_id)
}

pub fn is_favorite(state: &LibraryState, book_id: &str) -> bool {
    state.favorites.iter().any(|book| book.id == book_id)
}

/// Every shelf holding a book; empty when it is not shelved
pub fn shelf_of(state: &LibraryState, book_id: &str) -> BTreeSet<ShelfName> {
    ShelfName::ALL
        .into_iter()
        .filter(|shelf| state.shelves.contains(*shelf, book_id))
        .collect()
}

/// First record with this id, looking at shelves before favorites
pub fn find_book<'a>(state: &'a LibraryState, book_id: &str) -> Option<&'a BookRecord> {
    state
        .shelves
        .iter()
        .flat_map(|(_, books)| books.iter())
        .chain(state.favorites.iter())
        .find(|book| book.id == book_id)
}

/// Every shelved record with its shelf, in shelf iteration order
pub fn all_books(state: &LibraryState) -> Vec<(ShelfName, &BookRecord)> {
    state
        .shelves
        .iter()
        .flat_map(|(shelf, books)| books.iter().map(move |book| (shelf, book)))
        .collect()
}

/// Shelved records that have no category
pub fn books_without_category(state: &LibraryState) -> Vec<&BookRecord> {
    all_books(state)
        .into_iter()
        .map(|(_, book)| book)
        .filter(|book| book.categories.is_empty())
        .collect()
}

/// Records flagged as probable duplicates
///
/// A record is flagged when an earlier record (in shelf iteration order)
/// has the same title and first author. This matches on content, not id, so
/// the same book shelved twice under one id is flagged as well as the same
/// book under two catalog ids.
pub fn find_duplicates(state: &LibraryState) -> Vec<&BookRecord> {
    let mut seen: HashSet<(&str, &str)> = HashSet::new();

    all_books(state)
        .into_iter()
        .map(|(_, book)| book)
        .filter(|&book| !seen.insert((book.title.as_str(), book.first_author())))
        .collect()
}

/// A name with how often it occurs
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FrequencyEntry {
    pub name: String,
    pub count: usize,
}

/// Per-shelf record counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShelfCounts {
    pub to_read: usize,
    pub reading: usize,
    pub read: usize,
}

/// Aggregate library statistics
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LibraryStats {
    /// Shelved records, counting a book once per shelf
    pub total_books: usize,
    /// Distinct ids across all shelves
    pub unique_books: usize,
    /// `total_books - unique_books`
    pub duplicates: usize,
    pub total_pages: u64,
    /// Rounded; 0 for an empty library
    pub average_pages: u64,
    pub shelves: ShelfCounts,
    pub favorites: usize,
    pub top_categories: Vec<FrequencyEntry>,
    pub top_authors: Vec<FrequencyEntry>,
    pub oldest_year: Option<i32>,
    pub newest_year: Option<i32>,
    /// Mean rating over rated records, 0.0 when none are rated
    pub average_rating: f64,
    /// Share of shelved records on the read shelf, as a rounded percentage
    pub reading_progress: u32,
}

/// Compute statistics over the shelves
pub fn aggregate_stats(state: &LibraryState, top_n: usize) -> LibraryStats {
    let books: Vec<&BookRecord> = all_books(state).into_iter().map(|(_, book)| book).collect();

    let total_books = books.len();
    let unique_books = books
        .iter()
        .copied()
        .map(|book| book.id.as_str())
        .collect::<HashSet<_>>()
        .len();
    let total_pages: u64 = books.iter().map(|book| u64::from(book.page_count)).sum();
    let average_pages = if total_books == 0 {
        0
    } else {
        (total_pages as f64 / total_books as f64).round() as u64
    };

    let years: Vec<i32> = books.iter().filter_map(|book| book.published_year()).collect();

    let rated: Vec<f64> = books
        .iter()
        .map(|book| book.average_rating)
        .filter(|rating| *rating > 0.0)
        .collect();
    let average_rating = if rated.is_empty() {
        0.0
    } else {
        rated.iter().sum::<f64>() / rated.len() as f64
    };

    let shelves = ShelfCounts {
        to_read: state.shelves.to_read.len(),
        reading: state.shelves.reading.len(),
        read: state.shelves.read.len(),
    };
    let reading_progress = if total_books == 0 {
        0
    } else {
        (shelves.read as f64 / total_books as f64 * 100.0).round() as u32
    };

    LibraryStats {
        total_books,
        unique_books,
        duplicates: total_books - unique_books,
        total_pages,
        average_pages,
        shelves,
        favorites: state.favorites.len(),
        top_categories: top_frequencies(
            books.iter().copied().flat_map(|book| book.categories.iter()),
            top_n,
        ),
        top_authors: top_frequencies(
            books.iter().copied().flat_map(|book| book.authors.iter()),
            top_n,
        ),
        oldest_year: years.iter().copied().min(),
        newest_year: years.iter().copied().max(),
        average_rating,
        reading_progress,
    }
}

/// Most frequent names, count descending, ties in first-seen order
fn top_frequencies<'a>(names: impl Iterator<Item = &'a String>, top_n: usize) -> Vec<FrequencyEntry> {
    let mut order: Vec<&str> = Vec::new();
    let mut counts: HashMap<&str, usize> = HashMap::new();

    for name in names {
        let count = counts.entry(name.as_str()).or_insert(0);
        if *count == 0 {
            order.push(name.as_str());
        }
        *count += 1;
    }

    let mut entries: Vec<FrequencyEntry> = order
        .into_iter()
        .map(|name| FrequencyEntry {
            name: name.to_string(),
            count: counts[name],
        })
        .collect();

    // Stable sort keeps first-seen order among equal counts
    entries.sort_by(|a, b| b.count.cmp(&a.count));
    entries.truncate(top_n);
    entries
}

/// Ordering for book listings
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    /// Most recently added first
    #[default]
    DateAdded,
    Title,
    Author,
    /// Highest rated first
    Rating,
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SortOrder::DateAdded => "date-added",
            SortOrder::Title => "title",
            SortOrder::Author => "author",
            SortOrder::Rating => "rating",
        };
        f.write_str(name)
    }
}

impl FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "date-added" | "dateadded" | "date" | "added" => Ok(SortOrder::DateAdded),
            "title" => Ok(SortOrder::Title),
            "author" => Ok(SortOrder::Author),
            "rating" => Ok(SortOrder::Rating),
            _ => Err(format!(
                "Invalid sort order '{}'. Valid options: date-added, title, author, rating",
                s
            )),
        }
    }
}

/// Sort a listing given in insertion order
pub fn sort_books(mut books: Vec<&BookRecord>, order: SortOrder) -> Vec<&BookRecord> {
    match order {
        SortOrder::DateAdded => books.reverse(),
        SortOrder::Title => books.sort_by_key(|book| book.title.to_lowercase()),
        SortOrder::Author => books.sort_by_key(|book| book.first_author().to_lowercase()),
        SortOrder::Rating => books.sort_by(|a, b| b.average_rating.total_cmp(&a.average_rating)),
    }
    books
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::{reduce, Action};

    fn dune() -> BookRecord {
        BookRecord::new("B1", "Dune")
            .with_authors(["Frank Herbert"])
            .with_categories(["Fiction"])
            .with_page_count(412)
            .with_published_date("1965-08-01")
            .with_rating(4.5, 10)
    }

    fn shelve(state: &LibraryState, book: BookRecord, shelf: ShelfName) -> LibraryState {
        reduce(state, Action::AddToShelf { book, shelf })
    }

    #[test]
    fn test_empty_stats() {
        let stats = aggregate_stats(&LibraryState::new(), DEFAULT_TOP_N);

        assert_eq!(stats.total_books, 0);
        assert_eq!(stats.unique_books, 0);
        assert_eq!(stats.average_pages, 0);
        assert_eq!(stats.average_rating, 0.0);
        assert_eq!(stats.reading_progress, 0);
        assert!(stats.top_categories.is_empty());
        assert_eq!(stats.oldest_year, None);
        assert_eq!(stats.newest_year, None);
    }

    #[test]
    fn test_single_book_scenario() {
        let state = shelve(&LibraryState::new(), dune(), ShelfName::ToRead);

        assert!(is_in_shelf(&state, "B1", ShelfName::ToRead));
        assert!(!is_in_shelf(&state, "B1", ShelfName::Read));
        assert_eq!(
            shelf_of(&state, "B1").into_iter().collect::<Vec<_>>(),
            vec![ShelfName::ToRead]
        );
        assert_eq!(aggregate_stats(&state, DEFAULT_TOP_N).total_books, 1);
    }

    #[test]
    fn test_multi_shelf_scenario() {
        let state = shelve(&LibraryState::new(), dune(), ShelfName::ToRead);
        let state = shelve(&state, dune(), ShelfName::Reading);

        assert_eq!(
            shelf_of(&state, "B1").into_iter().collect::<Vec<_>>(),
            vec![ShelfName::ToRead, ShelfName::Reading]
        );

        let stats = aggregate_stats(&state, DEFAULT_TOP_N);
        assert_eq!(stats.total_books, 2);
        assert_eq!(stats.unique_books, 1);
        assert_eq!(stats.duplicates, 1);
        assert_eq!(stats.total_pages, 824);
        assert_eq!(stats.average_pages, 412);
    }

    #[test]
    fn test_shelf_of_unknown_book() {
        assert!(shelf_of(&LibraryState::new(), "nope").is_empty());
    }

    #[test]
    fn test_is_favorite() {
        let state = reduce(&LibraryState::new(), Action::ToggleFavorite(dune()));
        assert!(is_favorite(&state, "B1"));
        assert!(!is_favorite(&state, "B2"));
    }

    #[test]
    fn test_stats_frequencies_and_years() {
        let mut state = shelve(&LibraryState::new(), dune(), ShelfName::Read);
        state = shelve(
            &state,
            BookRecord::new("B2", "Emma")
                .with_authors(["Jane Austen"])
                .with_categories(["Romance", "Fiction"])
                .with_page_count(300)
                .with_published_date("1815"),
            ShelfName::Read,
        );
        state = shelve(
            &state,
            BookRecord::new("B3", "Persuasion")
                .with_authors(["Jane Austen"])
                .with_categories(["Romance"])
                .with_published_date("Unknown")
                .with_rating(3.5, 2),
            ShelfName::ToRead,
        );

        let stats = aggregate_stats(&state, 5);

        assert_eq!(stats.top_categories[0].count, 2);
        assert_eq!(stats.top_categories[1].count, 2);
        // Tie: Persuasion sits on toRead, so Romance is seen first
        assert_eq!(stats.top_categories[0].name, "Romance");
        assert_eq!(stats.top_categories[1].name, "Fiction");
        assert_eq!(stats.top_authors[0].name, "Jane Austen");
        assert_eq!(stats.top_authors[0].count, 2);
        assert_eq!(stats.oldest_year, Some(1815));
        assert_eq!(stats.newest_year, Some(1965));
        assert_eq!(stats.average_pages, 237);
        assert_eq!(stats.average_rating, 4.0);
        assert_eq!(stats.reading_progress, 67);
        assert_eq!(stats.shelves.to_read, 1);
        assert_eq!(stats.shelves.read, 2);
    }

    #[test]
    fn test_top_n_truncates() {
        let mut state = LibraryState::new();
        for i in 0..8 {
            state = shelve(
                &state,
                BookRecord::new(format!("B{}", i), format!("Book {}", i))
                    .with_authors([format!("Author {}", i)]),
                ShelfName::Read,
            );
        }

        let stats = aggregate_stats(&state, 3);
        assert_eq!(stats.top_authors.len(), 3);
        assert_eq!(stats.top_authors[0].name, "Author 0");
    }

    #[test]
    fn test_find_duplicates() {
        let mut state = shelve(&LibraryState::new(), dune(), ShelfName::ToRead);
        // Same book, different catalog id
        state = shelve(
            &state,
            BookRecord::new("B1-alt", "Dune").with_authors(["Frank Herbert"]),
            ShelfName::Read,
        );
        // Same title, different author
        state = shelve(
            &state,
            BookRecord::new("B9", "Dune").with_authors(["Someone Else"]),
            ShelfName::Read,
        );

        let duplicates = find_duplicates(&state);
        assert_eq!(duplicates.len(), 1);
        assert_eq!(duplicates[0].id, "B1-alt");
    }

    #[test]
    fn test_find_duplicates_same_id_on_two_shelves() {
        let state = shelve(&LibraryState::new(), dune(), ShelfName::ToRead);
        let state = shelve(&state, dune(), ShelfName::Read);
        assert_eq!(find_duplicates(&state).len(), 1);
    }

    #[test]
    fn test_find_book_prefers_shelves() {
        let state = reduce(
            &LibraryState::new(),
            Action::ToggleFavorite(BookRecord::new("B1", "Dune (favorite copy)")),
        );
        assert_eq!(find_book(&state, "B1").unwrap().title, "Dune (favorite copy)");

        let state = shelve(&state, dune(), ShelfName::Reading);
        assert_eq!(find_book(&state, "B1").unwrap().title, "Dune");
        assert!(find_book(&state, "B2").is_none());
    }

    #[test]
    fn test_books_without_category() {
        let state = shelve(&LibraryState::new(), dune(), ShelfName::ToRead);
        let state = shelve(&state, BookRecord::new("B2", "Emma"), ShelfName::ToRead);

        let uncategorized = books_without_category(&state);
        assert_eq!(uncategorized.len(), 1);
        assert_eq!(uncategorized[0].id, "B2");
    }

    #[test]
    fn test_sort_books() {
        let a = BookRecord::new("1", "beta").with_authors(["Zed"]).with_rating(3.0, 1);
        let b = BookRecord::new("2", "Alpha").with_authors(["amy"]).with_rating(5.0, 1);
        let c = BookRecord::new("3", "gamma").with_authors(["Bob"]);
        let books = vec![&a, &b, &c];

        let ids = |sorted: Vec<&BookRecord>| sorted.iter().map(|b| b.id.clone()).collect::<Vec<_>>();

        assert_eq!(ids(sort_books(books.clone(), SortOrder::DateAdded)), ["3", "2", "1"]);
        assert_eq!(ids(sort_books(books.clone(), SortOrder::Title)), ["2", "1", "3"]);
        assert_eq!(ids(sort_books(books.clone(), SortOrder::Author)), ["2", "3", "1"]);
        assert_eq!(ids(sort_books(books, SortOrder::Rating)), ["2", "1", "3"]);
    }

    #[test]
    fn test_sort_order_parse() {
        assert_eq!("title".parse::<SortOrder>().unwrap(), SortOrder::Title);
        assert_eq!("Date-Added".parse::<SortOrder>().unwrap(), SortOrder::DateAdded);
        assert!("pages".parse::<SortOrder>().is_err());
        assert_eq!(SortOrder::Rating.to_string(), "rating");
    }
}
