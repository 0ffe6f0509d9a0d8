//! Watch command handler

use std::time::Duration;

use anyhow::{bail, Result};
use tracing::{debug, info};

use shelf_core::{FileMedium, LibraryState, LibraryStore};

use crate::output::Output;

type Store = LibraryStore<FileMedium>;

/// Follow changes written by other shelf processes until Ctrl-C
pub async fn watch(store: &mut Store, interval_secs: u64, output: &Output) -> Result<()> {
    if interval_secs == 0 {
        bail!("Interval must be at least 1 second");
    }

    output.message(&format!(
        "Watching {} (Ctrl-C to stop)",
        store.persistent().medium().dir().display()
    ));
    output.message(&summary(store.state()));

    let mut ticker = tokio::time::interval(Duration::from_secs(interval_secs));
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let applied = store.sync_external();
                if applied > 0 {
                    info!(applied, "Applied external changes");
                    output.message(&summary(store.state()));
                } else {
                    debug!("No external changes");
                }
            }
            _ = tokio::signal::ctrl_c() => {
                output.message("Stopped watching.");
                return Ok(());
            }
        }
    }
}

fn summary(state: &LibraryState) -> String {
    let shelves = &state.shelves;
    format!(
        "{} to read, {} reading, {} read, {} favorite(s), {} recent search(es)",
        shelves.to_read.len(),
        shelves.reading.len(),
        shelves.read.len(),
        state.favorites.len(),
        state.search_history.len()
    )
}
