//! Snapshot export
//!
//! Writes the live domain data into a standalone database file with the
//! current schema. The target either appears complete or not at all.

use std::path::Path;
use std::time::Duration;

use rusqlite::backup::Backup;
use rusqlite::Connection;

use crate::error::{HoursError, HoursResult};
use crate::storage::file_io::{partial_path, remove_database_files};
use crate::storage::{
    migrate_connection, DomainReader, LiveDatabase, MigrationContext, TimeTrackingRepository,
    CURRENT_SCHEMA_VERSION,
};

/// Entries fetched per round trip
pub const EXPORT_BATCH_SIZE: usize = 500;

/// What went into a snapshot
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExportSummary {
    pub project_count: usize,
    pub entry_count: usize,
    pub period_close_count: usize,
}

pub struct SnapshotExporter {
    batch_size: usize,
}

impl Default for SnapshotExporter {
    fn default() -> Self {
        Self {
            batch_size: EXPORT_BATCH_SIZE,
        }
    }
}

impl SnapshotExporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_batch_size(batch_size: usize) -> Self {
        Self {
            batch_size: batch_size.max(1),
        }
    }

    /// Checkpoint the live database, then export it to `target`.
    ///
    /// A failed checkpoint is logged; the rows still come from the open
    /// connection, which always sees committed state.
    pub fn export_live(&self, live: &LiveDatabase, target: &Path) -> HoursResult<ExportSummary> {
        if let Err(e) = live.checkpoint() {
            log::warn!("Checkpoint before export failed, continuing: {}", e);
        }
        self.export(&live.repository()?, target)
    }

    /// Export everything `reader` sees into a new snapshot at `target`
    pub fn export<R: DomainReader + ?Sized>(
        &self,
        reader: &R,
        target: &Path,
    ) -> HoursResult<ExportSummary> {
        if target.exists() {
            return Err(HoursError::Export(format!(
                "Target already exists: {}",
                target.display()
            )));
        }

        let partial = partial_path(target);
        discard_partial(&partial);

        let written = self
            .write_snapshot(reader, &partial)
            .and_then(|summary| {
                std::fs::rename(&partial, target)
                    .map(|()| summary)
                    .map_err(|e| HoursError::Io(format!("Failed to finalize snapshot: {}", e)))
            });

        match written {
            Ok(summary) => {
                log::debug!(
                    "Exported {} projects and {} entries to {}",
                    summary.project_count,
                    summary.entry_count,
                    target.display()
                );
                Ok(summary)
            }
            Err(e) => {
                discard_partial(&partial);
                Err(match e {
                    HoursError::Export(_) => e,
                    other => HoursError::Export(other.to_string()),
                })
            }
        }
    }

    fn write_snapshot<R: DomainReader + ?Sized>(
        &self,
        reader: &R,
        path: &Path,
    ) -> HoursResult<ExportSummary> {
        let mut conn = Connection::open(path)?;
        // Self-contained file: no WAL side files to carry around.
        conn.execute_batch("PRAGMA journal_mode=DELETE;")?;
        migrate_connection(
            &mut conn,
            0,
            CURRENT_SCHEMA_VERSION,
            &MigrationContext::now(),
        )?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;

        let mut summary = ExportSummary::default();
        let tx = conn.transaction()?;
        {
            let repo = TimeTrackingRepository::new(&tx);

            // Rows go across as stored, without model validation
            for project in reader.project_rows()? {
                repo.insert_project_row(&project)?;
                summary.project_count += 1;
            }

            let total = reader.get_entry_count()? as usize;
            let mut offset = 0;
            while offset < total {
                let batch = reader.entry_rows_batch(self.batch_size, offset)?;
                if batch.is_empty() {
                    break;
                }
                for entry in &batch {
                    repo.insert_entry_row(entry)?;
                }
                offset += batch.len();
                summary.entry_count += batch.len();
            }

            for close in reader.period_close_rows()? {
                repo.insert_period_close_row(&close)?;
                summary.period_close_count += 1;
            }
        }
        tx.commit()?;

        conn.close()
            .map_err(|(_, e)| HoursError::Database(format!("Failed to close snapshot: {}", e)))?;
        Ok(summary)
    }
}

/// Page-level copy of a database file with SQLite's online backup API.
///
/// Keeps the source schema as-is, which is what a pre-upgrade safety copy
/// needs. The copy uses a rollback journal so it is a single file.
pub fn copy_database(source: &Path, target: &Path) -> HoursResult<()> {
    let partial = partial_path(target);
    discard_partial(&partial);

    let result = (|| -> HoursResult<()> {
        let src = Connection::open(source)?;
        let mut dst = Connection::open(&partial)?;
        {
            let backup = Backup::new(&src, &mut dst)?;
            backup.run_to_completion(128, Duration::from_millis(5), None)?;
        }
        dst.execute_batch("PRAGMA journal_mode=DELETE;")?;
        dst.close().map_err(|(_, e)| HoursError::from(e))?;
        std::fs::rename(&partial, target)?;
        Ok(())
    })();

    if result.is_err() {
        discard_partial(&partial);
    }
    result
}

/// Remove a leftover `.partial` file and its side files
fn discard_partial(partial: &Path) {
    if let Err(e) = remove_database_files(partial) {
        log::warn!(
            "Failed to discard partial snapshot {}: {}",
            partial.display(),
            e
        );
    }
}
