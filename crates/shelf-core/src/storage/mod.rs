//! Storage layer
//!
//! Mirrors the three collections of a `LibraryState` as three independent
//! JSON entries on a storage medium.
//!
//! ## Architecture
//!
//! - **Medium**: raw string key/value storage (`MemoryMedium`, `FileMedium`)
//! - **PersistentStore**: JSON encoding on top of a medium, plus change
//!   notifications on the `ChangeBus`
//!
//! Corrupt entries read back as absent; write failures are reported to the
//! caller and never undo in-memory state.

pub mod error;
pub mod medium;
pub mod persistent;

use std::fmt;

pub use error::{StorageError, StorageResult};
pub use medium::{ExternalChange, FileMedium, MemoryMedium, StorageMedium};
pub use persistent::PersistentStore;

/// A persisted entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EntryKey {
    Shelves,
    Favorites,
    SearchHistory,
}

impl EntryKey {
    pub const ALL: [EntryKey; 3] = [EntryKey::Shelves, EntryKey::Favorites, EntryKey::SearchHistory];

    /// Key under which the entry is stored
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryKey::Shelves => "bookshelves",
            EntryKey::Favorites => "favorites",
            EntryKey::SearchHistory => "searchHistory",
        }
    }

    /// Reverse of `as_str`
    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|entry| entry.as_str() == key)
    }
}

impl fmt::Display for EntryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
