//! Library actions and the reducer that applies them
//!
//! Every mutation of a `LibraryState` goes through an `Action`. Applying an
//! action returns a `ChangeSet` naming the persisted entries it touched, so
//! the store writes only what actually changed.

use crate::backup::{ImportPlan, ImportReport};
use crate::models::{BookRecord, LibraryState, ShelfName, Shelves, SEARCH_HISTORY_LIMIT};
use crate::storage::EntryKey;

/// A state transition
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Append a book to a shelf unless the shelf already holds its id
    AddToShelf { book: BookRecord, shelf: ShelfName },
    /// Remove a book from a shelf
    RemoveFromShelf { book_id: String, shelf: ShelfName },
    /// Remove from one shelf and add to another in a single transition
    MoveBook {
        book: BookRecord,
        from: ShelfName,
        to: ShelfName,
    },
    /// Unfavorite if favorited, favorite otherwise
    ToggleFavorite(BookRecord),
    /// Remember a search term at the front of the history
    RecordSearchTerm(String),
    /// Replace the whole state with persisted data
    Hydrate(LibraryState),
    /// Replace one collection with persisted data
    HydrateEntry(EntryValue),
    /// Merge the contents of a validated backup
    Import(ImportPlan),
    /// Back to an empty library
    Reset,
}

/// What the store should do with storage after an action
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Persistence {
    /// Write changed entries
    Write,
    /// State came from storage; writing it back would echo
    Skip,
    /// Remove every entry
    Clear,
}

impl Action {
    /// Short name for logs
    pub fn name(&self) -> &'static str {
        match self {
            Action::AddToShelf { .. } => "add_to_shelf",
            Action::RemoveFromShelf { .. } => "remove_from_shelf",
            Action::MoveBook { .. } => "move_book",
            Action::ToggleFavorite(_) => "toggle_favorite",
            Action::RecordSearchTerm(_) => "record_search_term",
            Action::Hydrate(_) => "hydrate",
            Action::HydrateEntry(_) => "hydrate_entry",
            Action::Import(_) => "import",
            Action::Reset => "reset",
        }
    }

    pub fn persistence(&self) -> Persistence {
        match self {
            Action::Hydrate(_) | Action::HydrateEntry(_) => Persistence::Skip,
            Action::Reset => Persistence::Clear,
            _ => Persistence::Write,
        }
    }
}

/// One persisted collection with its new contents
#[derive(Debug, Clone, PartialEq)]
pub enum EntryValue {
    Shelves(Shelves),
    Favorites(Vec<BookRecord>),
    SearchHistory(Vec<String>),
}

impl EntryValue {
    pub fn key(&self) -> EntryKey {
        match self {
            EntryValue::Shelves(_) => EntryKey::Shelves,
            EntryValue::Favorites(_) => EntryKey::Favorites,
            EntryValue::SearchHistory(_) => EntryKey::SearchHistory,
        }
    }

    /// Empty value for a key
    pub fn empty(key: EntryKey) -> Self {
        match key {
            EntryKey::Shelves => EntryValue::Shelves(Shelves::default()),
            EntryKey::Favorites => EntryValue::Favorites(Vec::new()),
            EntryKey::SearchHistory => EntryValue::SearchHistory(Vec::new()),
        }
    }
}

/// Persisted entries touched by an action
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChangeSet {
    shelves: bool,
    favorites: bool,
    search_history: bool,
}

impl ChangeSet {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn all() -> Self {
        Self {
            shelves: true,
            favorites: true,
            search_history: true,
        }
    }

    pub fn only(key: EntryKey) -> Self {
        let mut changes = Self::none();
        changes.mark(key);
        changes
    }

    pub fn mark(&mut self, key: EntryKey) {
        match key {
            EntryKey::Shelves => self.shelves = true,
            EntryKey::Favorites => self.favorites = true,
            EntryKey::SearchHistory => self.search_history = true,
        }
    }

    pub fn contains(&self, key: EntryKey) -> bool {
        match key {
            EntryKey::Shelves => self.shelves,
            EntryKey::Favorites => self.favorites,
            EntryKey::SearchHistory => self.search_history,
        }
    }

    /// Changed keys in `EntryKey::ALL` order
    pub fn keys(&self) -> impl Iterator<Item = EntryKey> + '_ {
        EntryKey::ALL.into_iter().filter(|key| self.contains(*key))
    }

    pub fn is_empty(&self) -> bool {
        !(self.shelves || self.favorites || self.search_history)
    }
}

/// What applying one action did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Transition {
    pub changes: ChangeSet,
    /// Merge counts, set only by `Action::Import`
    pub import_report: Option<ImportReport>,
}

impl From<ChangeSet> for Transition {
    fn from(changes: ChangeSet) -> Self {
        Self {
            changes,
            import_report: None,
        }
    }
}

impl LibraryState {
    /// Apply an action in place
    pub fn apply(&mut self, action: Action) -> ChangeSet {
        self.transition(action).changes
    }

    /// Apply an action in place, keeping everything it reports
    pub fn transition(&mut self, action: Action) -> Transition {
        if let Action::Import(plan) = action {
            let (changes, report) = self.merge_import(plan);
            return Transition {
                changes,
                import_report: Some(report),
            };
        }
        self.apply_change(action).into()
    }

    fn apply_change(&mut self, action: Action) -> ChangeSet {
        match action {
            Action::AddToShelf { book, shelf } => {
                changed_if(self.shelves.insert(shelf, book), EntryKey::Shelves)
            }
            Action::RemoveFromShelf { book_id, shelf } => {
                changed_if(self.shelves.remove(shelf, &book_id), EntryKey::Shelves)
            }
            Action::MoveBook { book, from, to } => {
                if from == to {
                    return ChangeSet::none();
                }
                let removed = self.shelves.remove(from, &book.id);
                let added = self.shelves.insert(to, book);
                changed_if(removed || added, EntryKey::Shelves)
            }
            Action::ToggleFavorite(book) => {
                if let Some(pos) = self.favorites.iter().position(|f| f.id == book.id) {
                    self.favorites.remove(pos);
                } else {
                    self.favorites.push(book);
                }
                ChangeSet::only(EntryKey::Favorites)
            }
            Action::RecordSearchTerm(term) => self.record_search_term(&term),
            Action::Hydrate(state) => {
                let changes = self.diff(&state);
                *self = state;
                changes
            }
            Action::HydrateEntry(value) => self.replace_entry(value),
            Action::Import(plan) => self.merge_import(plan).0,
            Action::Reset => {
                let changes = self.diff(&LibraryState::default());
                *self = LibraryState::default();
                changes
            }
        }
    }

    fn record_search_term(&mut self, term: &str) -> ChangeSet {
        let term = term.trim();
        if term.is_empty() {
            return ChangeSet::none();
        }

        let before = self.search_history.clone();
        self.search_history.retain(|existing| existing != term);
        self.search_history.insert(0, term.to_string());
        self.search_history.truncate(SEARCH_HISTORY_LIMIT);

        changed_if(self.search_history != before, EntryKey::SearchHistory)
    }

    fn replace_entry(&mut self, value: EntryValue) -> ChangeSet {
        let key = value.key();
        let changed = match value {
            EntryValue::Shelves(shelves) => replace(&mut self.shelves, shelves),
            EntryValue::Favorites(favorites) => replace(&mut self.favorites, favorites),
            EntryValue::SearchHistory(history) => replace(&mut self.search_history, history),
        };
        changed_if(changed, key)
    }

    /// Merge a backup: shelved books with add semantics, favorites added when
    /// absent
    fn merge_import(&mut self, plan: ImportPlan) -> (ChangeSet, ImportReport) {
        let mut changes = ChangeSet::none();
        let mut report = ImportReport {
            skipped: plan.skipped,
            ..ImportReport::default()
        };

        for (shelf, book) in plan.shelved {
            if self.shelves.insert(shelf, book) {
                report.added += 1;
                changes.mark(EntryKey::Shelves);
            } else {
                report.already_present += 1;
            }
        }

        for book in plan.favorites {
            if self.favorites.iter().any(|f| f.id == book.id) {
                continue;
            }
            self.favorites.push(book);
            report.favorites_added += 1;
            changes.mark(EntryKey::Favorites);
        }

        (changes, report)
    }

    /// Entries that differ between two states
    fn diff(&self, other: &LibraryState) -> ChangeSet {
        let mut changes = ChangeSet::none();
        if self.shelves != other.shelves {
            changes.mark(EntryKey::Shelves);
        }
        if self.favorites != other.favorites {
            changes.mark(EntryKey::Favorites);
        }
        if self.search_history != other.search_history {
            changes.mark(EntryKey::SearchHistory);
        }
        changes
    }
}

/// Pure form of `LibraryState::apply`
pub fn reduce(state: &LibraryState, action: Action) -> LibraryState {
    let mut next = state.clone();
    next.apply(action);
    next
}

fn changed_if(changed: bool, key: EntryKey) -> ChangeSet {
    if changed {
        ChangeSet::only(key)
    } else {
        ChangeSet::none()
    }
}

fn replace<T: PartialEq>(slot: &mut T, value: T) -> bool {
    if *slot == value {
        return false;
    }
    *slot = value;
    true
}
