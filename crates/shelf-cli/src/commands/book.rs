//! Book command handlers

use anyhow::{bail, Context, Result};
use chrono::{Datelike, Utc};
use tracing::debug;

use shelf_core::catalog::{author_query, category_query, page_size, popular_query, recent_query};
use shelf_core::query::{find_book, is_favorite, is_in_shelf, shelf_of};
use shelf_core::{
    AdvancedQuery, BookRecord, Config, FileMedium, LibraryStore, OrderBy, SearchOptions,
    ShelfName,
};

use super::warn_if_unsaved;
use crate::catalog::CatalogClient;
use crate::output::Output;

type Store = LibraryStore<FileMedium>;

/// Everything `shelf search` was asked for
#[derive(Debug, Default)]
pub struct SearchRequest {
    pub query: Option<String>,
    pub advanced: AdvancedQuery,
    /// Browse a subject
    pub category: Option<String>,
    /// Browse an author's books
    pub by_author: Option<String>,
    pub popular: bool,
    pub recent: bool,
    /// 1-based
    pub page: u32,
    pub order: Option<OrderBy>,
    pub filter: Option<String>,
    pub lang: Option<String>,
}

impl SearchRequest {
    /// Catalog query string, and whether it belongs in the search history
    fn catalog_query(&self) -> Option<(String, bool)> {
        if self.popular {
            let seed = Utc::now().timestamp().unsigned_abs() as usize;
            return Some((popular_query(seed).to_string(), false));
        }
        if self.recent {
            return Some((recent_query(Utc::now().year()), false));
        }
        let present = |value: &Option<String>| {
            value
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };
        if let Some(subject) = present(&self.category) {
            return Some((category_query(&subject), false));
        }
        if let Some(author) = present(&self.by_author) {
            return Some((author_query(&author), false));
        }

        let typed = self
            .query
            .as_deref()
            .map(str::trim)
            .filter(|q| !q.is_empty());
        let advanced = (self.advanced != AdvancedQuery::default()).then(|| self.advanced.to_query());

        match (typed, advanced) {
            (Some(typed), Some(advanced)) => Some((format!("{}+{}", typed, advanced), true)),
            (Some(typed), None) => Some((typed.to_string(), true)),
            (None, Some(advanced)) => Some((advanced, true)),
            (None, None) => None,
        }
    }

    /// Catalog options for the requested page
    ///
    /// The offset uses the clamped page size, the same one sent as
    /// `maxResults`.
    fn options(&self, requested_size: u32) -> Result<SearchOptions> {
        let page_size = page_size(requested_size);
        let Some(start_index) = self.page.saturating_sub(1).checked_mul(page_size) else {
            bail!("Page {} is out of range", self.page);
        };

        let order_by = match (self.order, self.recent) {
            (Some(order), _) => order,
            (None, true) => OrderBy::Newest,
            (None, false) => OrderBy::Relevance,
        };

        Ok(SearchOptions {
            start_index,
            max_results: page_size,
            order_by,
            filter: self.filter.clone(),
            lang_restrict: self.lang.clone(),
        })
    }
}

/// Search the catalog and remember what was typed
pub async fn search(
    store: &mut Store,
    config: &Config,
    request: SearchRequest,
    output: &Output,
) -> Result<()> {
    let Some((query, remember)) = request.catalog_query() else {
        bail!("Nothing to search for. Give a query, a field such as --title, --category, --popular or --recent");
    };
    let options = request.options(config.max_results)?;

    if remember {
        warn_if_unsaved(store.record_search_term(&query), output);
    }

    let client = CatalogClient::from_config(config)?;
    let results = client
        .search(&query, &options)
        .await
        .with_context(|| format!("Search failed for '{}'", query))?;

    let state = store.state();
    output.print_search_results(&results, options.start_index, |id| {
        !shelf_of(state, id).is_empty()
    });

    if results.has_more(&options) && !output.is_quiet() && !output.is_json() {
        println!("More results: --page {}", request.page.max(1).saturating_add(1));
    }

    Ok(())
}

/// Show a book from the library, or from the catalog when it isn't shelved
pub async fn show(store: &Store, config: &Config, id: &str, output: &Output) -> Result<()> {
    let book = resolve_book(store, config, id).await?;
    let state = store.state();

    output.print_book(&book, &shelf_of(state, id), is_favorite(state, id));
    Ok(())
}

/// Add a book to a shelf
pub async fn add(
    store: &mut Store,
    config: &Config,
    id: &str,
    shelf: ShelfName,
    output: &Output,
) -> Result<()> {
    if is_in_shelf(store.state(), id, shelf) {
        output.message(&format!("Already on {}: {}", shelf.label(), id));
        return Ok(());
    }

    let book = resolve_book(store, config, id).await?;
    let title = book.title.clone();

    warn_if_unsaved(store.add_to_shelf(book, shelf), output);
    output.success(&format!("Added to {}: {}", shelf.label(), title));

    Ok(())
}

/// Remove a book from one shelf, or from every shelf holding it
pub fn remove(
    store: &mut Store,
    id: &str,
    shelf: Option<ShelfName>,
    output: &Output,
) -> Result<()> {
    let shelves: Vec<ShelfName> = match shelf {
        Some(shelf) => {
            if !is_in_shelf(store.state(), id, shelf) {
                bail!("Book {} is not on {}", id, shelf.label());
            }
            vec![shelf]
        }
        None => shelf_of(store.state(), id).into_iter().collect(),
    };

    if shelves.is_empty() {
        bail!("Book not in library: {}", id);
    }

    for shelf in shelves {
        warn_if_unsaved(store.remove_from_shelf(id, shelf), output);
        output.success(&format!("Removed from {}: {}", shelf.label(), id));
    }

    Ok(())
}

/// Move a book between shelves
pub fn move_book(
    store: &mut Store,
    id: &str,
    from: Option<ShelfName>,
    to: ShelfName,
    output: &Output,
) -> Result<()> {
    let state = store.state();
    let Some(book) = find_book(state, id).cloned() else {
        bail!("Book not in library: {}", id);
    };

    let from = match from {
        Some(from) if is_in_shelf(state, id, from) => from,
        Some(from) => bail!("Book {} is not on {}", id, from.label()),
        None => {
            let current = shelf_of(state, id);
            if current.contains(&to) {
                output.message(&format!("Already on {}: {}", to.label(), book.title));
                return Ok(());
            }
            match current.len() {
                0 => bail!("Book {} is not on any shelf. Use `shelf add`", id),
                1 => current.into_iter().next().unwrap_or(to),
                _ => bail!(
                    "Book {} is on several shelves. Pick one with --from",
                    id
                ),
            }
        }
    };

    if from == to {
        output.message(&format!("Already on {}: {}", to.label(), book.title));
        return Ok(());
    }

    let title = book.title.clone();
    warn_if_unsaved(store.move_book(book, from, to), output);
    output.success(&format!("Moved to {}: {}", to.label(), title));

    Ok(())
}

/// Toggle a book's favorite status
pub async fn favorite(store: &mut Store, config: &Config, id: &str, output: &Output) -> Result<()> {
    let book = resolve_book(store, config, id).await?;
    let title = book.title.clone();

    warn_if_unsaved(store.toggle_favorite(book), output);

    if is_favorite(store.state(), id) {
        output.success(&format!("Added to favorites: {}", title));
    } else {
        output.success(&format!("Removed from favorites: {}", title));
    }

    Ok(())
}

/// Look a book up locally first, then in the catalog
async fn resolve_book(store: &Store, config: &Config, id: &str) -> Result<BookRecord> {
    if let Some(book) = find_book(store.state(), id) {
        return Ok(book.clone());
    }

    debug!(id = %id, "Book not in library, asking the catalog");
    let client = CatalogClient::from_config(config)?;
    client
        .volume(id)
        .await
        .with_context(|| format!("Could not fetch book {}", id))
}
