//! Library state store
//!
//! The `LibraryStore` owns one execution context's `LibraryState` and keeps
//! it mirrored in storage:
//!
//! - actions apply to memory first, then each changed entry is written
//! - a failed write is reported but never rolls back memory
//! - changes made by other contexts arrive through `sync_external` and are
//!   hydrated without being written back
//!
//! ## Usage
//!
//! ```ignore
//! let mut store = LibraryStore::open(PersistentStore::standalone(medium));
//!
//! store.add_to_shelf(book, ShelfName::ToRead)?;
//! assert!(query::is_in_shelf(store.state(), "B1", ShelfName::ToRead));
//! ```

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::action::{Action, ChangeSet, EntryValue, Persistence, Transition};
use crate::backup::{self, ExportError, ImportPlan, ImportReport};
use crate::models::{BookRecord, LibraryState, ShelfName, Shelves};
use crate::storage::persistent::decode;
use crate::storage::{EntryKey, PersistentStore, StorageMedium, StorageResult};
use crate::sync::{ChangeSubscription, ContextId, StorageEvent, SyncSignal};

/// Lifecycle of a store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreStatus {
    /// Created, nothing read from storage yet
    Uninitialized,
    /// State reflects storage
    Hydrated,
}

/// One execution context's library
pub struct LibraryStore<M: StorageMedium> {
    state: LibraryState,
    status: StoreStatus,
    persistent: PersistentStore<M>,
    changes: ChangeSubscription,
}

impl<M: StorageMedium> LibraryStore<M> {
    /// Create an empty, uninitialized store
    ///
    /// Subscribes to the bus right away so no change published after this
    /// point is missed.
    pub fn new(persistent: PersistentStore<M>) -> Self {
        let changes = persistent.subscribe();
        Self {
            state: LibraryState::default(),
            status: StoreStatus::Uninitialized,
            persistent,
            changes,
        }
    }

    /// Create a store and hydrate it from storage
    pub fn open(persistent: PersistentStore<M>) -> Self {
        let mut store = Self::new(persistent);
        store.load();
        store
    }

    /// Hydrate from the three persisted entries
    ///
    /// Absent or corrupt entries hydrate as empty. Safe to call again.
    pub fn load(&mut self) {
        let state = LibraryState {
            shelves: self
                .persistent
                .load::<Shelves>(EntryKey::Shelves)
                .unwrap_or_default(),
            favorites: self
                .persistent
                .load::<Vec<BookRecord>>(EntryKey::Favorites)
                .unwrap_or_default(),
            search_history: self
                .persistent
                .load::<Vec<String>>(EntryKey::SearchHistory)
                .unwrap_or_default(),
        };

        debug!(
            context = %self.persistent.context(),
            shelved = state.shelves.len(),
            favorites = state.favorites.len(),
            "Hydrated library"
        );

        self.state.apply(Action::Hydrate(state));
        self.status = StoreStatus::Hydrated;
    }

    /// Current state snapshot
    pub fn state(&self) -> &LibraryState {
        &self.state
    }

    pub fn status(&self) -> StoreStatus {
        self.status
    }

    pub fn is_hydrated(&self) -> bool {
        self.status == StoreStatus::Hydrated
    }

    pub fn context(&self) -> ContextId {
        self.persistent.context()
    }

    pub fn persistent(&self) -> &PersistentStore<M> {
        &self.persistent
    }

    /// Apply an action, then persist what it changed
    ///
    /// The in-memory update always happens. A write failure is logged and
    /// returned; the first failure wins when several entries fail.
    pub fn dispatch(&mut self, action: Action) -> StorageResult<()> {
        self.run(action).1
    }

    fn run(&mut self, action: Action) -> (Transition, StorageResult<()>) {
        let name = action.name();
        let persistence = action.persistence();
        let transition = self.state.transition(action);

        debug!(action = name, changed = ?transition.changes, "Dispatched action");

        let saved = match persistence {
            Persistence::Write => self.persist(transition.changes),
            Persistence::Skip => Ok(()),
            Persistence::Clear => self.clear(),
        };
        (transition, saved)
    }

    fn persist(&self, changes: ChangeSet) -> StorageResult<()> {
        let mut first_error = None;

        for key in changes.keys() {
            let result = match key {
                EntryKey::Shelves => self.persistent.save(key, &self.state.shelves),
                EntryKey::Favorites => self.persistent.save(key, &self.state.favorites),
                EntryKey::SearchHistory => self.persistent.save(key, &self.state.search_history),
            };

            if let Err(e) = result {
                warn!(key = %key, error = %e, "Failed to persist entry, keeping in-memory state");
                first_error.get_or_insert(e);
            }
        }

        first_error.map_or(Ok(()), Err)
    }

    fn clear(&self) -> StorageResult<()> {
        let mut first_error = None;

        for key in EntryKey::ALL {
            if let Err(e) = self.persistent.remove(key) {
                warn!(key = %key, error = %e, "Failed to clear entry");
                first_error.get_or_insert(e);
            }
        }

        first_error.map_or(Ok(()), Err)
    }

    // ==================== Actions ====================

    pub fn add_to_shelf(&mut self, book: BookRecord, shelf: ShelfName) -> StorageResult<()> {
        self.dispatch(Action::AddToShelf { book, shelf })
    }

    pub fn remove_from_shelf(&mut self, book_id: &str, shelf: ShelfName) -> StorageResult<()> {
        self.dispatch(Action::RemoveFromShelf {
            book_id: book_id.to_string(),
            shelf,
        })
    }

    pub fn move_book(
        &mut self,
        book: BookRecord,
        from: ShelfName,
        to: ShelfName,
    ) -> StorageResult<()> {
        self.dispatch(Action::MoveBook { book, from, to })
    }

    pub fn toggle_favorite(&mut self, book: BookRecord) -> StorageResult<()> {
        self.dispatch(Action::ToggleFavorite(book))
    }

    pub fn record_search_term(&mut self, term: &str) -> StorageResult<()> {
        self.dispatch(Action::RecordSearchTerm(term.to_string()))
    }

    /// Replace the state wholesale without writing it
    pub fn hydrate(&mut self, state: LibraryState) {
        self.state.apply(Action::Hydrate(state));
        self.status = StoreStatus::Hydrated;
    }

    /// Empty the library and remove every persisted entry
    pub fn reset(&mut self) -> StorageResult<()> {
        info!(context = %self.context(), "Resetting library");
        self.dispatch(Action::Reset)
    }

    /// Merge a validated backup
    ///
    /// The merge is dispatched like any other action; a write failure keeps
    /// the merged state and is returned instead of the report.
    pub fn import_backup(&mut self, plan: ImportPlan) -> StorageResult<ImportReport> {
        let (transition, saved) = self.run(Action::Import(plan));
        let report = transition.import_report.unwrap_or_default();
        info!(
            added = report.added,
            already_present = report.already_present,
            favorites_added = report.favorites_added,
            skipped = report.skipped,
            "Imported backup"
        );

        saved.map(|()| report)
    }

    // ==================== Export ====================

    pub fn export_json(&self, export_date: DateTime<Utc>) -> Result<String, ExportError> {
        backup::export_json(&self.state, export_date)
    }

    pub fn export_csv(&self) -> Result<String, ExportError> {
        backup::export_csv(&self.state)
    }

    // ==================== Sync ====================

    /// Apply changes made by other contexts
    ///
    /// Asks the medium for writes made outside the bus first, then drains
    /// pending events. Nothing hydrated here is written back. Returns the
    /// number of entries (or full reloads) applied.
    pub fn sync_external(&mut self) -> usize {
        if let Err(e) = self.persistent.poll_external() {
            warn!(error = %e, "Failed to poll storage for external changes");
        }

        let mut applied = 0;
        while let Some(signal) = self.changes.try_next() {
            match signal {
                SyncSignal::Changed(event) => {
                    if self.apply_event(event) {
                        applied += 1;
                    }
                }
                SyncSignal::Resync => {
                    self.load();
                    applied += 1;
                }
            }
        }

        applied
    }

    fn apply_event(&mut self, event: StorageEvent) -> bool {
        let value = match event.value {
            None => EntryValue::empty(event.key),
            Some(raw) => match decode_entry(event.key, &raw) {
                Some(value) => value,
                None => return false,
            },
        };

        debug!(key = %event.key, origin = %event.origin, "Hydrating external change");
        self.state.apply(Action::HydrateEntry(value));
        true
    }
}

fn decode_entry(key: EntryKey, raw: &str) -> Option<EntryValue> {
    match key {
        EntryKey::Shelves => decode(key, raw).map(EntryValue::Shelves),
        EntryKey::Favorites => decode(key, raw).map(EntryValue::Favorites),
        EntryKey::SearchHistory => decode(key, raw).map(EntryValue::SearchHistory),
    }
}
