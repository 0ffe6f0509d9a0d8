//! Library listing and statistics handlers

use anyhow::Result;

use shelf_core::query::{
    aggregate_stats, all_books, books_without_category, find_duplicates, sort_books,
};
use shelf_core::{BookRecord, FileMedium, LibraryState, LibraryStore, ShelfName, SortOrder};

use crate::output::Output;

type Store = LibraryStore<FileMedium>;

/// List shelved books
pub fn list(
    store: &Store,
    shelf: Option<ShelfName>,
    sort: SortOrder,
    uncategorized: bool,
    output: &Output,
) -> Result<()> {
    let books = listing(store.state(), shelf, uncategorized);
    let empty_message = match shelf {
        Some(shelf) => format!("No books on {}.", shelf.label()),
        None => "Your library is empty.".to_string(),
    };

    output.print_books(&sort_books(books, sort), &empty_message);
    Ok(())
}

/// List favorite books
pub fn favorites(store: &Store, sort: SortOrder, output: &Output) -> Result<()> {
    let books: Vec<&BookRecord> = store.state().favorites.iter().collect();
    output.print_books(&sort_books(books, sort), "No favorites yet.");
    Ok(())
}

/// Show recent searches
pub fn history(store: &Store, output: &Output) -> Result<()> {
    output.print_history(&store.state().search_history);
    Ok(())
}

/// Show aggregate statistics
pub fn stats(store: &Store, top_n: usize, output: &Output) -> Result<()> {
    output.print_stats(&aggregate_stats(store.state(), top_n));
    Ok(())
}

/// List books that look like copies of an earlier one
pub fn duplicates(store: &Store, output: &Output) -> Result<()> {
    output.print_books(&find_duplicates(store.state()), "No duplicates found.");
    Ok(())
}

fn listing(
    state: &LibraryState,
    shelf: Option<ShelfName>,
    uncategorized: bool,
) -> Vec<&BookRecord> {
    let mut books: Vec<&BookRecord> = match shelf {
        Some(shelf) => state.shelves.get(shelf).iter().collect(),
        None if uncategorized => books_without_category(state),
        None => all_books(state).into_iter().map(|(_, book)| book).collect(),
    };

    if uncategorized && shelf.is_some() {
        books.retain(|book| book.categories.is_empty());
    }
    books
}
