//! JSON entries on a storage medium
//!
//! `PersistentStore` is one execution context's handle on a shared medium.
//! It encodes values as JSON, publishes every successful write on the
//! `ChangeBus`, and turns changes the medium detects on its own (another
//! process writing the same directory) into bus events.

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use super::error::{StorageError, StorageResult};
use super::medium::StorageMedium;
use super::EntryKey;
use crate::sync::{ChangeBus, ChangeSubscription, ContextId, StorageEvent};

/// Persistence handle for one execution context
pub struct PersistentStore<M: StorageMedium> {
    medium: M,
    bus: ChangeBus,
    context: ContextId,
}

impl<M: StorageMedium> PersistentStore<M> {
    /// Create a handle with a fresh context id on a shared medium and bus
    pub fn new(medium: M, bus: ChangeBus) -> Self {
        Self {
            medium,
            bus,
            context: ContextId::new(),
        }
    }

    /// Create a handle with a private bus
    pub fn standalone(medium: M) -> Self {
        Self::new(medium, ChangeBus::new())
    }

    pub fn context(&self) -> ContextId {
        self.context
    }

    pub fn medium(&self) -> &M {
        &self.medium
    }

    pub fn bus(&self) -> &ChangeBus {
        &self.bus
    }

    /// Read and decode an entry
    ///
    /// Returns `None` when the entry is absent, unreadable or not valid JSON
    /// for `T`. Corrupt data is logged and otherwise treated as absent.
    pub fn load<T: DeserializeOwned>(&self, key: EntryKey) -> Option<T> {
        let raw = match self.medium.read(key.as_str()) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                warn!(key = %key, error = %e, "Failed to read entry, using default");
                return None;
            }
        };

        decode(key, &raw)
    }

    /// Encode and write an entry, then notify other contexts
    pub fn save<T: Serialize + ?Sized>(&self, key: EntryKey, value: &T) -> StorageResult<()> {
        let raw = serde_json::to_string(value).map_err(|source| StorageError::Serialize {
            key: key.to_string(),
            source,
        })?;

        self.medium.write(key.as_str(), &raw)?;
        debug!(key = %key, bytes = raw.len(), "Saved entry");

        self.bus.publish(StorageEvent {
            key,
            value: Some(raw),
            origin: self.context,
        });
        Ok(())
    }

    /// Remove an entry, then notify other contexts
    pub fn remove(&self, key: EntryKey) -> StorageResult<()> {
        self.medium.remove(key.as_str())?;
        debug!(key = %key, "Removed entry");

        self.bus.publish(StorageEvent {
            key,
            value: None,
            origin: self.context,
        });
        Ok(())
    }

    /// Subscribe to changes made by other contexts
    pub fn subscribe(&self) -> ChangeSubscription {
        self.bus.subscribe(self.context)
    }

    /// Ask the medium for changes made behind the bus's back and publish them
    ///
    /// Returns the number of events published. Keys that are not library
    /// entries are ignored.
    pub fn poll_external(&self) -> StorageResult<usize> {
        let mut published = 0;

        for change in self.medium.poll_external()? {
            let Some(key) = EntryKey::from_key(&change.key) else {
                continue;
            };

            debug!(key = %key, "Detected external change");
            self.bus.publish(StorageEvent {
                key,
                value: change.value,
                origin: ContextId::EXTERNAL,
            });
            published += 1;
        }

        Ok(published)
    }
}

/// Decode raw entry JSON, logging and discarding corrupt data
pub(crate) fn decode<T: DeserializeOwned>(key: EntryKey, raw: &str) -> Option<T> {
    match serde_json::from_str(raw) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(key = %key, error = %e, "Ignoring corrupt entry");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BookRecord, Shelves};
    use crate::storage::medium::{FileMedium, MemoryMedium};
    use crate::sync::SyncSignal;
    use tempfile::TempDir;

    #[test]
    fn test_save_and_load() {
        let store = PersistentStore::standalone(MemoryMedium::new());

        let favorites = vec![BookRecord::new("B2", "Emma")];
        store.save(EntryKey::Favorites, &favorites).unwrap();

        let loaded: Vec<BookRecord> = store.load(EntryKey::Favorites).unwrap();
        assert_eq!(loaded, favorites);
    }

    #[test]
    fn test_load_absent_is_none() {
        let store = PersistentStore::standalone(MemoryMedium::new());
        let loaded: Option<Shelves> = store.load(EntryKey::Shelves);
        assert!(loaded.is_none());
    }

    #[test]
    fn test_load_corrupt_is_none() {
        let medium = MemoryMedium::new();
        medium.write("favorites", "{not json").unwrap();
        medium.write("searchHistory", "{\"wrong\":\"shape\"}").unwrap();

        let store = PersistentStore::standalone(medium);
        let favorites: Option<Vec<BookRecord>> = store.load(EntryKey::Favorites);
        let history: Option<Vec<String>> = store.load(EntryKey::SearchHistory);
        assert!(favorites.is_none());
        assert!(history.is_none());
    }

    #[test]
    fn test_save_failure_is_reported() {
        let store = PersistentStore::standalone(MemoryMedium::with_quota(10));
        let history = vec!["a very long search term".to_string()];

        let err = store.save(EntryKey::SearchHistory, &history).unwrap_err();
        assert!(matches!(err, StorageError::QuotaExceeded { .. }));
    }

    #[test]
    fn test_save_notifies_other_contexts_only() {
        let medium = MemoryMedium::new();
        let bus = ChangeBus::new();
        let writer = PersistentStore::new(medium.clone(), bus.clone());
        let reader = PersistentStore::new(medium, bus);

        let mut writer_changes = writer.subscribe();
        let mut reader_changes = reader.subscribe();

        writer.save(EntryKey::SearchHistory, &["dune"]).unwrap();

        assert!(writer_changes.try_next().is_none());
        match reader_changes.try_next() {
            Some(SyncSignal::Changed(event)) => {
                assert_eq!(event.key, EntryKey::SearchHistory);
                assert_eq!(event.value.as_deref(), Some("[\"dune\"]"));
                assert_eq!(event.origin, writer.context());
            }
            other => panic!("unexpected signal: {:?}", other),
        }
    }

    #[test]
    fn test_failed_save_does_not_notify() {
        let medium = MemoryMedium::with_quota(5);
        let bus = ChangeBus::new();
        let writer = PersistentStore::new(medium.clone(), bus.clone());
        let reader = PersistentStore::new(medium, bus);
        let mut reader_changes = reader.subscribe();

        assert!(writer.save(EntryKey::SearchHistory, &["dune"]).is_err());
        assert!(reader_changes.try_next().is_none());
    }

    #[test]
    fn test_remove_notifies_with_none() {
        let medium = MemoryMedium::new();
        let bus = ChangeBus::new();
        let writer = PersistentStore::new(medium.clone(), bus.clone());
        let reader = PersistentStore::new(medium, bus);
        let mut reader_changes = reader.subscribe();

        writer.remove(EntryKey::Favorites).unwrap();

        match reader_changes.try_next() {
            Some(SyncSignal::Changed(event)) => assert!(event.value.is_none()),
            other => panic!("unexpected signal: {:?}", other),
        }
    }

    #[test]
    fn test_poll_external_publishes_file_changes() {
        let temp_dir = TempDir::new().unwrap();
        let ours = PersistentStore::standalone(FileMedium::open(temp_dir.path()).unwrap());
        let theirs = PersistentStore::standalone(FileMedium::open(temp_dir.path()).unwrap());
        let mut changes = ours.subscribe();

        let _: Option<Vec<String>> = ours.load(EntryKey::SearchHistory);
        theirs.save(EntryKey::SearchHistory, &["emma"]).unwrap();

        assert_eq!(ours.poll_external().unwrap(), 1);
        match changes.try_next() {
            Some(SyncSignal::Changed(event)) => {
                assert_eq!(event.origin, ContextId::EXTERNAL);
                assert_eq!(event.key, EntryKey::SearchHistory);
            }
            other => panic!("unexpected signal: {:?}", other),
        }
    }

    #[test]
    fn test_poll_external_ignores_own_file_writes() {
        let temp_dir = TempDir::new().unwrap();
        let store = PersistentStore::standalone(FileMedium::open(temp_dir.path()).unwrap());

        store.save(EntryKey::Favorites, &Vec::<BookRecord>::new()).unwrap();
        assert_eq!(store.poll_external().unwrap(), 0);
    }
}
