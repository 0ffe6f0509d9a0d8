//! Export, import and reset handlers

use std::io::Read;
use std::path::Path;

use anyhow::{bail, Context, Result};
use chrono::Utc;

use shelf_core::backup::parse_import;
use shelf_core::{FileMedium, LibraryStore};

use super::warn_if_unsaved;
use crate::editor::confirm;
use crate::output::Output;
use crate::ExportFormat;

type Store = LibraryStore<FileMedium>;

/// Write the library as JSON or CSV to a file or stdout
pub fn export(
    store: &Store,
    format: ExportFormat,
    path: Option<&Path>,
    output: &Output,
) -> Result<()> {
    let content = match format {
        ExportFormat::Json => store.export_json(Utc::now()),
        ExportFormat::Csv => store.export_csv(),
    }
    .context("Failed to export library")?;

    match path {
        Some(path) => {
            std::fs::write(path, &content)
                .with_context(|| format!("Failed to write {:?}", path))?;
            output.success(&format!("Exported library to {}", path.display()));
        }
        None => print!("{}", content),
    }

    Ok(())
}

/// Merge a JSON backup into the library
///
/// `-` reads the backup from stdin. Nothing changes when the backup is
/// rejected.
pub fn import(store: &mut Store, source: &str, output: &Output) -> Result<()> {
    let raw = if source == "-" {
        let mut raw = String::new();
        std::io::stdin()
            .read_to_string(&mut raw)
            .context("Failed to read backup from stdin")?;
        raw
    } else {
        std::fs::read_to_string(source).with_context(|| format!("Failed to read {}", source))?
    };

    let plan = parse_import(&raw).context("Invalid backup")?;
    if plan.is_empty() {
        output.message("Backup contains no books.");
        return Ok(());
    }

    // The merge stays applied in memory when the write fails
    let report = match store.import_backup(plan) {
        Ok(report) => report,
        Err(e) => {
            warn_if_unsaved(Err(e), output);
            return Ok(());
        }
    };

    output.print_import_report(&report);
    Ok(())
}

/// Empty the library after confirmation
pub fn reset(store: &mut Store, yes: bool, output: &Output) -> Result<()> {
    if !yes {
        if !output.should_prompt() {
            bail!("Refusing to reset without confirmation. Pass --yes");
        }
        let state = store.state();
        let prompt = format!(
            "Remove {} shelved book(s), {} favorite(s) and {} search(es)?",
            state.shelves.len(),
            state.favorites.len(),
            state.search_history.len()
        );
        if !confirm(&prompt)? {
            output.message("Cancelled.");
            return Ok(());
        }
    }

    warn_if_unsaved(store.reset(), output);
    output.success("Library reset");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::OutputFormat;
    use shelf_core::{BookRecord, PersistentStore, ShelfName};
    use tempfile::TempDir;

    fn open(dir: &TempDir) -> Store {
        let medium = FileMedium::open(dir.path()).unwrap();
        LibraryStore::open(PersistentStore::standalone(medium))
    }

    #[test]
    fn test_export_then_import_into_empty_library() {
        let source_dir = TempDir::new().unwrap();
        let target_dir = TempDir::new().unwrap();
        let output = Output::new(OutputFormat::Quiet);

        let mut source = open(&source_dir);
        source
            .add_to_shelf(BookRecord::new("B1", "Dune"), ShelfName::Reading)
            .unwrap();
        source
            .toggle_favorite(BookRecord::new("B2", "Emma"))
            .unwrap();

        let backup = source_dir.path().join("backup.json");
        export(&source, ExportFormat::Json, Some(&backup), &output).unwrap();

        let mut target = open(&target_dir);
        import(&mut target, backup.to_str().unwrap(), &output).unwrap();

        assert!(target.state().shelves.contains(ShelfName::Reading, "B1"));
        assert_eq!(target.state().favorites[0].id, "B2");

        // Persisted, not just applied
        let reopened = open(&target_dir);
        assert_eq!(reopened.state(), target.state());
    }

    #[test]
    fn test_import_rejects_invalid_backup() {
        let dir = TempDir::new().unwrap();
        let output = Output::new(OutputFormat::Quiet);
        let mut store = open(&dir);

        let path = dir.path().join("bad.json");
        std::fs::write(&path, r#"{"favorites": []}"#).unwrap();

        assert!(import(&mut store, path.to_str().unwrap(), &output).is_err());
        assert!(store.state().is_empty());
    }

    #[test]
    fn test_reset_requires_confirmation_when_not_interactive() {
        let dir = TempDir::new().unwrap();
        let output = Output::new(OutputFormat::Json);
        let mut store = open(&dir);
        store
            .add_to_shelf(BookRecord::new("B1", "Dune"), ShelfName::Read)
            .unwrap();

        assert!(reset(&mut store, false, &output).is_err());
        assert!(!store.state().is_empty());

        reset(&mut store, true, &output).unwrap();
        assert!(store.state().is_empty());
        assert!(open(&dir).state().is_empty());
    }
}
