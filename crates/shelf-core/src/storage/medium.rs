//! Storage media
//!
//! A medium is a flat string key/value store shared by every execution
//! context that opens it.
//!
//! - `MemoryMedium`: in-process, clones share contents. An optional byte
//!   quota makes writes fail the way a full browser storage area does.
//! - `FileMedium`: one `<key>.json` file per entry in a directory, written
//!   atomically. Other processes may write the same directory; those writes
//!   are picked up by `poll_external`.

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tracing::warn;

use super::error::{StorageError, StorageResult};

/// A change made to the medium by someone other than this handle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalChange {
    pub key: String,
    /// `None` when the entry was removed
    pub value: Option<String>,
}

/// Raw key/value storage
pub trait StorageMedium {
    /// Read an entry; `Ok(None)` when absent
    fn read(&self, key: &str) -> StorageResult<Option<String>>;

    /// Write an entry, replacing any previous value
    fn write(&self, key: &str, value: &str) -> StorageResult<()>;

    /// Remove an entry; removing an absent entry is not an error
    fn remove(&self, key: &str) -> StorageResult<()>;

    /// Entries changed by other writers since this handle last saw them
    ///
    /// Media whose writers all share one `ChangeBus` have nothing to report.
    fn poll_external(&self) -> StorageResult<Vec<ExternalChange>> {
        Ok(Vec::new())
    }
}

// ==================== Memory ====================

#[derive(Debug, Default)]
struct MemoryInner {
    entries: HashMap<String, String>,
    quota: Option<usize>,
    writes: usize,
}

impl MemoryInner {
    fn used_bytes_without(&self, key: &str) -> usize {
        self.entries
            .iter()
            .filter(|(k, _)| k.as_str() != key)
            .map(|(k, v)| k.len() + v.len())
            .sum()
    }
}

/// In-memory medium
#[derive(Debug, Clone, Default)]
pub struct MemoryMedium {
    inner: Arc<Mutex<MemoryInner>>,
}

impl MemoryMedium {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a medium that rejects writes once keys plus values exceed
    /// `limit` bytes
    pub fn with_quota(limit: usize) -> Self {
        let medium = Self::default();
        if let Ok(mut inner) = medium.inner.lock() {
            inner.quota = Some(limit);
        }
        medium
    }

    /// Change or lift the byte quota
    pub fn set_quota(&self, limit: Option<usize>) -> StorageResult<()> {
        let mut inner = self.inner.lock().map_err(|_| StorageError::Poisoned)?;
        inner.quota = limit;
        Ok(())
    }

    /// Number of successful writes so far
    pub fn write_count(&self) -> usize {
        self.inner.lock().map(|inner| inner.writes).unwrap_or(0)
    }

    /// Bytes currently stored (keys plus values)
    pub fn used_bytes(&self) -> usize {
        self.inner
            .lock()
            .map(|inner| inner.used_bytes_without(""))
            .unwrap_or(0)
    }
}

impl StorageMedium for MemoryMedium {
    fn read(&self, key: &str) -> StorageResult<Option<String>> {
        let inner = self.inner.lock().map_err(|_| StorageError::Poisoned)?;
        Ok(inner.entries.get(key).cloned())
    }

    fn write(&self, key: &str, value: &str) -> StorageResult<()> {
        let mut inner = self.inner.lock().map_err(|_| StorageError::Poisoned)?;

        if let Some(limit) = inner.quota {
            let needed = inner.used_bytes_without(key) + key.len() + value.len();
            if needed > limit {
                return Err(StorageError::QuotaExceeded {
                    key: key.to_string(),
                    needed,
                    limit,
                });
            }
        }

        inner.entries.insert(key.to_string(), value.to_string());
        inner.writes += 1;
        Ok(())
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        let mut inner = self.inner.lock().map_err(|_| StorageError::Poisoned)?;
        inner.entries.remove(key);
        Ok(())
    }
}

// ==================== Files ====================

/// Directory-backed medium
///
/// Keeps the last content it read or wrote for every key so that
/// `poll_external` only reports changes made by other processes.
#[derive(Debug)]
pub struct FileMedium {
    dir: PathBuf,
    known: Mutex<HashMap<String, Option<String>>>,
}

impl FileMedium {
    /// Open (and create if needed) a storage directory
    pub fn open(dir: impl Into<PathBuf>) -> StorageResult<Self> {
        let dir = dir.into();
        if !dir.exists() {
            fs::create_dir_all(&dir).map_err(|source| StorageError::CreateDirectory {
                path: dir.clone(),
                source,
            })?;
        }

        Ok(Self {
            dir,
            known: Mutex::new(HashMap::new()),
        })
    }

    /// Directory holding the entries
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the file backing a key
    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }

    fn read_file(&self, key: &str) -> StorageResult<Option<String>> {
        let path = self.path_for(key);
        match fs::read_to_string(&path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StorageError::ReadError {
                location: path.display().to_string(),
                source,
            }),
        }
    }

    fn remember(&self, key: &str, value: Option<String>) -> StorageResult<()> {
        let mut known = self.known.lock().map_err(|_| StorageError::Poisoned)?;
        known.insert(key.to_string(), value);
        Ok(())
    }
}

impl StorageMedium for FileMedium {
    fn read(&self, key: &str) -> StorageResult<Option<String>> {
        let value = self.read_file(key)?;
        self.remember(key, value.clone())?;
        Ok(value)
    }

    fn write(&self, key: &str, value: &str) -> StorageResult<()> {
        atomic_write(&self.path_for(key), value.as_bytes())?;
        self.remember(key, Some(value.to_string()))
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        let path = self.path_for(key);
        match fs::remove_file(&path) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(StorageError::from_io(e, path.display().to_string())),
        }
        self.remember(key, None)
    }

    /// Compare every key this handle has touched with what is on disk now
    ///
    /// A key that cannot be read is skipped and keeps its last seen value,
    /// so it is compared again on the next poll.
    fn poll_external(&self) -> StorageResult<Vec<ExternalChange>> {
        let mut known = self.known.lock().map_err(|_| StorageError::Poisoned)?;
        let mut changes = Vec::new();

        for (key, last_seen) in known.iter_mut() {
            let current = match self.read_file(key) {
                Ok(current) => current,
                Err(e) => {
                    warn!(key = %key, error = %e, "Skipping unreadable entry while polling");
                    continue;
                }
            };
            if current != *last_seen {
                *last_seen = current.clone();
                changes.push(ExternalChange {
                    key: key.clone(),
                    value: current,
                });
            }
        }

        changes.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(changes)
    }
}

/// Write data to a file atomically
///
/// 1. Write to a temporary file in the same directory
/// 2. Sync the file to disk
/// 3. Rename the temp file to the target path
///
/// The target file is never left in a partially-written state.
fn atomic_write(path: &Path, data: &[u8]) -> StorageResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|source| StorageError::CreateDirectory {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    // Per-process temp name so two writers never share a temp file
    let temp_path = path.with_extension(format!("{}.tmp", std::process::id()));

    let mut file = File::create(&temp_path)
        .map_err(|e| StorageError::from_io(e, temp_path.display().to_string()))?;

    file.write_all(data)
        .map_err(|e| StorageError::from_io(e, temp_path.display().to_string()))?;

    file.sync_all()
        .map_err(|e| StorageError::from_io(e, temp_path.display().to_string()))?;

    fs::rename(&temp_path, path).map_err(|source| StorageError::AtomicWriteFailed {
        from: temp_path.clone(),
        to: path.to_path_buf(),
        source,
    })?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_memory_read_write_remove() {
        let medium = MemoryMedium::new();
        assert!(medium.read("favorites").unwrap().is_none());

        medium.write("favorites", "[]").unwrap();
        assert_eq!(medium.read("favorites").unwrap().as_deref(), Some("[]"));
        assert_eq!(medium.write_count(), 1);

        medium.remove("favorites").unwrap();
        assert!(medium.read("favorites").unwrap().is_none());

        // Removing again is fine
        medium.remove("favorites").unwrap();
    }

    #[test]
    fn test_memory_clones_share_contents() {
        let a = MemoryMedium::new();
        let b = a.clone();

        a.write("searchHistory", "[\"dune\"]").unwrap();
        assert_eq!(
            b.read("searchHistory").unwrap().as_deref(),
            Some("[\"dune\"]")
        );
    }

    #[test]
    fn test_memory_quota_rejects_oversized_write() {
        let medium = MemoryMedium::with_quota(20);
        medium.write("k", "small").unwrap();

        let err = medium.write("big", &"x".repeat(50)).unwrap_err();
        assert!(matches!(err, StorageError::QuotaExceeded { .. }));

        // Previous value untouched
        assert_eq!(medium.read("k").unwrap().as_deref(), Some("small"));
        assert!(medium.read("big").unwrap().is_none());
    }

    #[test]
    fn test_memory_quota_counts_replacement_not_sum() {
        let medium = MemoryMedium::with_quota(12);
        medium.write("k", "1234567890").unwrap();
        // Replacing the same key does not double count it
        medium.write("k", "0987654321").unwrap();
        assert_eq!(medium.used_bytes(), 11);
    }

    #[test]
    fn test_file_write_and_read() {
        let temp_dir = TempDir::new().unwrap();
        let medium = FileMedium::open(temp_dir.path().join("library")).unwrap();

        assert!(medium.read("favorites").unwrap().is_none());
        medium.write("favorites", "[]").unwrap();

        assert!(medium.path_for("favorites").exists());
        assert_eq!(medium.read("favorites").unwrap().as_deref(), Some("[]"));
    }

    #[test]
    fn test_file_remove() {
        let temp_dir = TempDir::new().unwrap();
        let medium = FileMedium::open(temp_dir.path()).unwrap();

        medium.write("bookshelves", "{}").unwrap();
        medium.remove("bookshelves").unwrap();
        assert!(!medium.path_for("bookshelves").exists());
        medium.remove("bookshelves").unwrap();
    }

    #[test]
    fn test_file_poll_ignores_own_writes() {
        let temp_dir = TempDir::new().unwrap();
        let medium = FileMedium::open(temp_dir.path()).unwrap();

        medium.write("favorites", "[]").unwrap();
        medium.write("searchHistory", "[\"dune\"]").unwrap();

        assert!(medium.poll_external().unwrap().is_empty());
    }

    #[test]
    fn test_file_poll_reports_other_writers() {
        let temp_dir = TempDir::new().unwrap();
        let ours = FileMedium::open(temp_dir.path()).unwrap();
        let theirs = FileMedium::open(temp_dir.path()).unwrap();

        ours.read("favorites").unwrap();
        theirs.write("favorites", "[{\"id\":\"B2\"}]").unwrap();

        let changes = ours.poll_external().unwrap();
        assert_eq!(
            changes,
            vec![ExternalChange {
                key: "favorites".to_string(),
                value: Some("[{\"id\":\"B2\"}]".to_string()),
            }]
        );

        // Reported once
        assert!(ours.poll_external().unwrap().is_empty());
    }

    #[test]
    fn test_file_poll_reports_removal() {
        let temp_dir = TempDir::new().unwrap();
        let ours = FileMedium::open(temp_dir.path()).unwrap();
        let theirs = FileMedium::open(temp_dir.path()).unwrap();

        ours.write("favorites", "[]").unwrap();
        theirs.remove("favorites").unwrap();

        let changes = ours.poll_external().unwrap();
        assert_eq!(changes.len(), 1);
        assert!(changes[0].value.is_none());
    }

    #[test]
    fn test_file_poll_keeps_going_past_unreadable_entry() {
        let temp_dir = TempDir::new().unwrap();
        let ours = FileMedium::open(temp_dir.path()).unwrap();
        let theirs = FileMedium::open(temp_dir.path()).unwrap();

        ours.write("bookshelves", "{}").unwrap();
        ours.write("favorites", "[]").unwrap();
        theirs.write("favorites", "[{\"id\":\"B2\"}]").unwrap();

        // A directory in place of the file makes the read fail
        let shelves_path = ours.path_for("bookshelves");
        fs::remove_file(&shelves_path).unwrap();
        fs::create_dir(&shelves_path).unwrap();

        let changes = ours.poll_external().unwrap();
        assert_eq!(
            changes,
            vec![ExternalChange {
                key: "favorites".to_string(),
                value: Some("[{\"id\":\"B2\"}]".to_string()),
            }]
        );

        // Once readable again the skipped entry is compared as before
        fs::remove_dir(&shelves_path).unwrap();
        let changes = ours.poll_external().unwrap();
        assert_eq!(
            changes,
            vec![ExternalChange {
                key: "bookshelves".to_string(),
                value: None,
            }]
        );
    }

    #[test]
    fn test_file_remove_tolerates_concurrent_delete() {
        let temp_dir = TempDir::new().unwrap();
        let ours = FileMedium::open(temp_dir.path()).unwrap();
        let theirs = FileMedium::open(temp_dir.path()).unwrap();

        ours.write("favorites", "[]").unwrap();
        // Deleted behind our back
        theirs.remove("favorites").unwrap();

        ours.remove("favorites").unwrap();
        assert!(ours.read("favorites").unwrap().is_none());
        assert!(ours.poll_external().unwrap().is_empty());
    }

    #[test]
    fn test_atomic_write_creates_parent_dirs() {
        let temp_dir = TempDir::new().unwrap();
        let nested_path = temp_dir
            .path()
            .join("a")
            .join("b")
            .join("c")
            .join("file.json");

        atomic_write(&nested_path, b"test data").unwrap();

        assert!(nested_path.exists());
        let content = fs::read_to_string(&nested_path).unwrap();
        assert_eq!(content, "test data");
    }
}
