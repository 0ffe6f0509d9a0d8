//! SHELF Core Library
//!
//! This crate provides the core functionality for SHELF, a personal book
//! library: three reading shelves, a favorites collection and a short
//! search history, kept in sync across every execution context that opens
//! the same storage.
//!
//! # Architecture
//!
//! - **Store**: applies actions to an in-memory `LibraryState` and writes
//!   the changed entries
//! - **Storage**: JSON entries on a medium (in-memory or one file per key)
//! - **Sync**: a change bus that carries writes to other contexts, minus
//!   their own echoes
//!
//! # Quick Start
//!
//! ```text
//! let medium = FileMedium::open(config.storage_dir())?;
//! let mut store = LibraryStore::open(PersistentStore::standalone(medium));
//!
//! // Shelve a book
//! store.add_to_shelf(BookRecord::new("B1", "Dune"), ShelfName::ToRead)?;
//!
//! // Query
//! let stats = query::aggregate_stats(store.state(), config.top_n);
//! ```
//!
//! # Modules
//!
//! - `store`: Library state store (main entry point)
//! - `action`: Actions and the reducer
//! - `models`: Book records, shelves and library state
//! - `query`: Derived queries and statistics
//! - `storage`: Storage media and JSON persistence
//! - `sync`: Cross-context change notification
//! - `backup`: JSON/CSV export and JSON import
//! - `catalog`: Catalog search contract and volume normalization
//! - `config`: Application configuration

pub mod action;
pub mod backup;
pub mod catalog;
pub mod config;
pub mod models;
pub mod query;
pub mod storage;
pub mod store;
pub mod sync;

pub use action::{reduce, Action, ChangeSet, EntryValue, Transition};
pub use backup::{ExportError, ImportError, ImportPlan, ImportReport};
pub use catalog::{AdvancedQuery, OrderBy, SearchOptions, SearchResults};
pub use config::Config;
pub use models::{BookRecord, LibraryState, ShelfName, Shelves, UnknownShelf};
pub use query::{LibraryStats, SortOrder};
pub use storage::{
    EntryKey, FileMedium, MemoryMedium, PersistentStore, StorageError, StorageMedium,
    StorageResult,
};
pub use store::{LibraryStore, StoreStatus};
pub use sync::{ChangeBus, ContextId};
