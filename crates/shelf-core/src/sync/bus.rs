//! Publish/subscribe channel for storage events

use std::fmt;

use tokio::sync::broadcast;
use tokio::sync::broadcast::error::TryRecvError;
use tracing::warn;
use uuid::Uuid;

use crate::storage::EntryKey;

/// Default number of buffered events per subscriber
const BUS_CAPACITY: usize = 64;

/// Identity of an execution context
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContextId(Uuid);

impl ContextId {
    /// Origin of changes detected on the medium itself (another process)
    pub const EXTERNAL: ContextId = ContextId(Uuid::nil());

    /// Generate a fresh context id
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn is_external(&self) -> bool {
        *self == Self::EXTERNAL
    }
}

impl Default for ContextId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_external() {
            f.write_str("external")
        } else {
            write!(f, "{}", &self.0.to_string()[..8])
        }
    }
}

/// A persisted entry changed
#[derive(Debug, Clone, PartialEq)]
pub struct StorageEvent {
    pub key: EntryKey,
    /// Raw JSON now stored, `None` when the entry was removed
    pub value: Option<String>,
    pub origin: ContextId,
}

/// What a subscriber should do next
#[derive(Debug, Clone, PartialEq)]
pub enum SyncSignal {
    /// Another context changed one entry
    Changed(StorageEvent),
    /// Events were dropped; reload everything from the medium
    Resync,
}

/// Broadcast channel shared by all contexts on one medium
///
/// Cloning yields another handle to the same channel.
#[derive(Debug, Clone)]
pub struct ChangeBus {
    tx: broadcast::Sender<StorageEvent>,
}

impl ChangeBus {
    pub fn new() -> Self {
        Self::with_capacity(BUS_CAPACITY)
    }

    /// Create a bus buffering up to `capacity` events per subscriber
    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Publish an event; returns the number of subscribers it reached
    ///
    /// Never blocks. Publishing with no subscribers is not an error.
    pub fn publish(&self, event: StorageEvent) -> usize {
        self.tx.send(event).unwrap_or(0)
    }

    /// Subscribe on behalf of a context; events from `own` are filtered out
    pub fn subscribe(&self, own: ContextId) -> ChangeSubscription {
        ChangeSubscription {
            rx: self.tx.subscribe(),
            own,
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for ChangeBus {
    fn default() -> Self {
        Self::new()
    }
}

/// A context's view of the bus
#[derive(Debug)]
pub struct ChangeSubscription {
    rx: broadcast::Receiver<StorageEvent>,
    own: ContextId,
}

impl ChangeSubscription {
    /// Context this subscription belongs to
    pub fn context(&self) -> ContextId {
        self.own
    }

    /// Next pending signal without waiting
    pub fn try_next(&mut self) -> Option<SyncSignal> {
        loop {
            match self.rx.try_recv() {
                Ok(event) if event.origin == self.own => continue,
                Ok(event) => return Some(SyncSignal::Changed(event)),
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => return None,
                Err(TryRecvError::Lagged(missed)) => {
                    warn!(context = %self.own, missed, "Change subscription lagged");
                    return Some(SyncSignal::Resync);
                }
            }
        }
    }
}
