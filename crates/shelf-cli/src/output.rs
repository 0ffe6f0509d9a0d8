//! Output formatting for CLI
//!
//! Provides consistent output formatting across all commands:
//! - Human-readable default output
//! - JSON output (--json flag)
//! - Quiet mode for scripting (--quiet flag)

use std::collections::BTreeSet;

use serde::Serialize;

use shelf_core::query::FrequencyEntry;
use shelf_core::{BookRecord, ImportReport, LibraryStats, SearchResults, ShelfName};

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable output (default)
    Human,
    /// JSON output
    Json,
    /// Quiet mode - minimal output
    Quiet,
}

impl OutputFormat {
    /// Create format from CLI flags
    pub fn from_flags(json: bool, quiet: bool) -> Self {
        if quiet {
            OutputFormat::Quiet
        } else if json {
            OutputFormat::Json
        } else {
            OutputFormat::Human
        }
    }
}

/// A book with where it lives in the library
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct BookView<'a> {
    #[serde(flatten)]
    book: &'a BookRecord,
    shelves: &'a BTreeSet<ShelfName>,
    favorite: bool,
}

/// Output helper for consistent formatting
pub struct Output {
    /// The output format
    pub format: OutputFormat,
}

impl Output {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Check if output is in quiet mode
    pub fn is_quiet(&self) -> bool {
        matches!(self.format, OutputFormat::Quiet)
    }

    pub fn is_json(&self) -> bool {
        matches!(self.format, OutputFormat::Json)
    }

    /// Print a single book with its shelves and favorite flag
    pub fn print_book(&self, book: &BookRecord, shelves: &BTreeSet<ShelfName>, favorite: bool) {
        match self.format {
            OutputFormat::Human => {
                println!("ID:          {}", book.id);
                println!("Title:       {}", book.title);
                println!("Authors:     {}", book.authors.join(", "));
                println!("Published:   {}", book.published_date);
                println!("Publisher:   {}", book.publisher);
                if book.page_count > 0 {
                    println!("Pages:       {}", book.page_count);
                }
                if !book.categories.is_empty() {
                    println!("Categories:  {}", book.categories.join(", "));
                }
                if let Some(ref isbn) = book.isbn {
                    println!("ISBN:        {}", isbn);
                }
                if book.average_rating > 0.0 {
                    println!(
                        "Rating:      {:.1} ({} ratings)",
                        book.average_rating, book.ratings_count
                    );
                }
                println!("Shelves:     {}", shelf_labels(shelves));
                println!("Favorite:    {}", if favorite { "yes" } else { "no" });
                if let Some(ref url) = book.info_url {
                    println!("Info:        {}", url);
                }
                println!();
                println!("{}", truncate(&book.description, 500));
            }
            OutputFormat::Json => print_json(&BookView {
                book,
                shelves,
                favorite,
            }),
            OutputFormat::Quiet => println!("{}", book.id),
        }
    }

    /// Print a list of books
    pub fn print_books(&self, books: &[&BookRecord], empty_message: &str) {
        match self.format {
            OutputFormat::Human => {
                if books.is_empty() {
                    println!("{}", empty_message);
                    return;
                }
                for book in books {
                    println!(
                        "{} | {} | {}",
                        truncate(&book.id, 14),
                        truncate(&book.title, 40),
                        truncate(book.first_author(), 25)
                    );
                }
                println!("\n{} book(s)", books.len());
            }
            OutputFormat::Json => print_json(&books),
            OutputFormat::Quiet => {
                for book in books {
                    println!("{}", book.id);
                }
            }
        }
    }

    /// Print a page of search results, marking books already shelved
    pub fn print_search_results(
        &self,
        results: &SearchResults,
        start_index: u32,
        shelved: impl Fn(&str) -> bool,
    ) {
        match self.format {
            OutputFormat::Human => {
                if results.books.is_empty() {
                    println!("No books found.");
                    return;
                }
                for book in &results.books {
                    let marker = if shelved(&book.id) { "*" } else { " " };
                    println!(
                        "{} {} | {} | {} | {}",
                        marker,
                        truncate(&book.id, 14),
                        truncate(&book.title, 40),
                        truncate(book.first_author(), 25),
                        book.published_year()
                            .map(|year| year.to_string())
                            .unwrap_or_default()
                    );
                }
                let first = start_index.saturating_add(1);
                let last = start_index.saturating_add(results.books.len() as u32);
                println!(
                    "\nShowing {}-{} of {} (* = in your library)",
                    first, last, results.total_items
                );
            }
            OutputFormat::Json => print_json(results),
            OutputFormat::Quiet => {
                for book in &results.books {
                    println!("{}", book.id);
                }
            }
        }
    }

    /// Print the search history, most recent first
    pub fn print_history(&self, history: &[String]) {
        match self.format {
            OutputFormat::Human => {
                if history.is_empty() {
                    println!("No searches yet.");
                    return;
                }
                for (i, term) in history.iter().enumerate() {
                    println!("{:>2}. {}", i + 1, term);
                }
            }
            OutputFormat::Json => print_json(&history),
            OutputFormat::Quiet => {
                for term in history {
                    println!("{}", term);
                }
            }
        }
    }

    /// Print library statistics
    pub fn print_stats(&self, stats: &LibraryStats) {
        match self.format {
            OutputFormat::Human => {
                println!("Books:        {} ({} unique)", stats.total_books, stats.unique_books);
                println!("  To read:    {}", stats.shelves.to_read);
                println!("  Reading:    {}", stats.shelves.reading);
                println!("  Read:       {}", stats.shelves.read);
                println!("Favorites:    {}", stats.favorites);
                println!("Duplicates:   {}", stats.duplicates);
                println!("Pages:        {} (avg {})", stats.total_pages, stats.average_pages);
                println!("Progress:     {}% read", stats.reading_progress);
                if stats.average_rating > 0.0 {
                    println!("Avg rating:   {:.1}", stats.average_rating);
                }
                if let (Some(oldest), Some(newest)) = (stats.oldest_year, stats.newest_year) {
                    println!("Years:        {} - {}", oldest, newest);
                }
                print_frequencies("Top categories", &stats.top_categories);
                print_frequencies("Top authors", &stats.top_authors);
            }
            OutputFormat::Json => print_json(stats),
            OutputFormat::Quiet => println!("{}", stats.total_books),
        }
    }

    /// Print the outcome of an import
    pub fn print_import_report(&self, report: &ImportReport) {
        match self.format {
            OutputFormat::Human => {
                println!("✓ Import complete");
                println!("  Added:           {}", report.added);
                println!("  Already present: {}", report.already_present);
                println!("  Favorites added: {}", report.favorites_added);
                if report.skipped > 0 {
                    println!("  Skipped:         {} (missing id or title)", report.skipped);
                }
            }
            OutputFormat::Json => print_json(report),
            OutputFormat::Quiet => {}
        }
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        match self.format {
            OutputFormat::Human => println!("✓ {}", message),
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::json!({"status": "success", "message": message})
                );
            }
            OutputFormat::Quiet => {}
        }
    }

    /// Report a change that was applied but could not be saved
    pub fn warn_unsaved(&self, error: &shelf_core::StorageError) {
        if self.is_quiet() {
            return;
        }
        eprintln!("⚠ Change applied but not saved: {}", error);
        if let Some(hint) = error.recovery_suggestion() {
            eprintln!("  {}", hint);
        }
    }

    /// Check if we should prompt for confirmation
    pub fn should_prompt(&self) -> bool {
        self.format == OutputFormat::Human
    }

    /// Print an informational message
    pub fn message(&self, msg: &str) {
        match self.format {
            OutputFormat::Human => println!("{}", msg),
            OutputFormat::Json => {
                println!("{}", serde_json::json!({"message": msg}));
            }
            OutputFormat::Quiet => {}
        }
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Failed to encode output: {}", e),
    }
}

fn print_frequencies(title: &str, entries: &[FrequencyEntry]) {
    if entries.is_empty() {
        return;
    }
    println!();
    println!("{}:", title);
    for entry in entries {
        println!("  {} ({})", entry.name, entry.count);
    }
}

/// Comma-separated shelf labels, or "none"
fn shelf_labels(shelves: &BTreeSet<ShelfName>) -> String {
    if shelves.is_empty() {
        return "none".to_string();
    }
    shelves
        .iter()
        .map(|shelf| shelf.label())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Truncate a string to max characters, adding "..." if truncated
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
