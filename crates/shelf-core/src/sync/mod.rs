//! Change notifications between execution contexts
//!
//! Every `LibraryStore` runs in its own execution context. Contexts that
//! share a storage medium also share a `ChangeBus`: each successful write is
//! published as a `StorageEvent` tagged with the writer's `ContextId`, and
//! each subscriber drops the events it published itself. That filter is
//! what keeps a write from bouncing back as a reload and a second write.
//!
//! ## Usage
//!
//! ```ignore
//! let bus = ChangeBus::new();
//! let mut changes = bus.subscribe(me);
//!
//! bus.publish(StorageEvent { key, value, origin: other });
//! while let Some(signal) = changes.try_next() {
//!     // hydrate from signal
//! }
//! ```

mod bus;

pub use bus::{ChangeBus, ChangeSubscription, ContextId, StorageEvent, SyncSignal};
