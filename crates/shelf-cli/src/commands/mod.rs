//! Command handlers

pub mod backup;
pub mod book;
pub mod config;
pub mod library;
pub mod watch;

use shelf_core::StorageResult;

use crate::output::Output;

/// A failed write leaves the change applied in memory only; say so and go on.
pub(crate) fn warn_if_unsaved(result: StorageResult<()>, output: &Output) {
    if let Err(e) = result {
        output.warn_unsaved(&e);
    }
}
