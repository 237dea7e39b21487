//! Snapshot schema migration
//!
//! Upgrades an old snapshot by running the migration chain on a private copy
//! in the work directory. The original backup is never opened for writing.

use std::path::{Path, PathBuf};

use chrono::Utc;
use rusqlite::Connection;

use crate::error::{HoursError, HoursResult};
use crate::storage::file_io::{copy_file_atomic, remove_database_files};
use crate::storage::{migrate_connection, MigrationContext, CURRENT_SCHEMA_VERSION};

/// Runs the migration chain over snapshot copies
pub struct SchemaMigrator {
    work_dir: PathBuf,
    context: Option<MigrationContext>,
}

impl SchemaMigrator {
    pub fn new(work_dir: impl Into<PathBuf>) -> Self {
        Self {
            work_dir: work_dir.into(),
            context: None,
        }
    }

    /// Pin the reference time used by backfilling steps
    pub fn with_context(mut self, context: MigrationContext) -> Self {
        self.context = Some(context);
        self
    }

    /// Bring the snapshot at `source` from `from_version` to the current version.
    ///
    /// Returns `source` itself when no migration is needed, otherwise the path
    /// of the migrated copy, which the caller owns and must delete.
    pub fn migrate(&self, source: &Path, from_version: u32) -> HoursResult<PathBuf> {
        if from_version >= CURRENT_SCHEMA_VERSION {
            return Ok(source.to_path_buf());
        }

        let file_name = source
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "snapshot.db".to_string());
        let copy = self.work_dir.join(format!(
            "migrating_{}_{}",
            Utc::now().timestamp_millis(),
            file_name
        ));

        copy_file_atomic(source, &copy).map_err(|e| HoursError::Migration {
            from: from_version,
            to: CURRENT_SCHEMA_VERSION,
            reason: format!("cannot copy backup: {}", e),
        })?;

        match self.migrate_copy(&copy, from_version) {
            Ok(()) => {
                log::info!(
                    "Migrated {} from v{} to v{}",
                    source.display(),
                    from_version,
                    CURRENT_SCHEMA_VERSION
                );
                Ok(copy)
            }
            Err(e) => {
                if let Err(cleanup) = remove_database_files(&copy) {
                    log::warn!(
                        "Failed to discard migration copy {}: {}",
                        copy.display(),
                        cleanup
                    );
                }
                Err(e)
            }
        }
    }

    fn migrate_copy(&self, copy: &Path, from_version: u32) -> HoursResult<()> {
        let fail = |e: rusqlite::Error| HoursError::Migration {
            from: from_version,
            to: CURRENT_SCHEMA_VERSION,
            reason: e.to_string(),
        };

        let mut conn = Connection::open(copy).map_err(fail)?;
        let context = self.context.unwrap_or_else(MigrationContext::now);
        migrate_connection(&mut conn, from_version, CURRENT_SCHEMA_VERSION, &context)?;
        conn.close().map_err(|(_, e)| fail(e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::schema::{read_user_version, table_columns, write_user_version};
    use chrono::TimeZone;
    use rusqlite::params;
    use std::fs;
    use tempfile::TempDir;

    fn v1_snapshot(dir: &Path) -> PathBuf {
        let path = dir.join("manual_20240101_000000.db");
        let mut conn = Connection::open(&path).unwrap();
        migrate_connection(&mut conn, 0, 1, &MigrationContext::now()).unwrap();
        conn.execute_batch(
            "INSERT INTO projects (id, name, createdAt, isActive) VALUES (7, 'Legacy', 1000, 1);",
        )
        .unwrap();
        let start = Utc.with_ymd_and_hms(2024, 1, 10, 9, 0, 0).unwrap();
        conn.execute(
            "INSERT INTO time_entries (id, projectId, startTime, endTime, isRunning)
             VALUES (3, 7, ?1, ?2, 0)",
            params![
                start.timestamp_millis(),
                start.timestamp_millis() + 3_600_000
            ],
        )
        .unwrap();
        path
    }

    #[test]
    fn test_current_version_is_a_no_op() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("current.db");
        fs::write(&source, b"untouched").unwrap();

        let result = SchemaMigrator::new(temp.path().join("work"))
            .migrate(&source, CURRENT_SCHEMA_VERSION)
            .unwrap();
        assert_eq!(result, source);
        assert!(!temp.path().join("work").exists());
    }

    #[test]
    fn test_every_older_version_reaches_current() {
        for from in 1..CURRENT_SCHEMA_VERSION {
            let temp = TempDir::new().unwrap();
            let source = temp.path().join(format!("v{}.db", from));
            {
                let mut conn = Connection::open(&source).unwrap();
                migrate_connection(&mut conn, 0, from, &MigrationContext::now()).unwrap();
            }

            let migrated = SchemaMigrator::new(temp.path().join("work"))
                .migrate(&source, from)
                .unwrap();

            assert_ne!(migrated, source);
            let conn = Connection::open(&migrated).unwrap();
            assert_eq!(read_user_version(&conn).unwrap(), CURRENT_SCHEMA_VERSION);
            let original = Connection::open(&source).unwrap();
            assert_eq!(read_user_version(&original).unwrap(), from);
        }
    }

    #[test]
    fn test_migration_preserves_existing_fields() {
        let temp = TempDir::new().unwrap();
        let source = v1_snapshot(temp.path());
        let before = fs::read(&source).unwrap();
        let ctx = MigrationContext::new(Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap());

        let migrated = SchemaMigrator::new(temp.path().join("work"))
            .with_context(ctx)
            .migrate(&source, 1)
            .unwrap();

        assert_eq!(fs::read(&source).unwrap(), before);

        let conn = Connection::open(&migrated).unwrap();
        let (name, created, active, mode): (String, i64, bool, String) = conn
            .query_row(
                "SELECT name, createdAt, isActive, periodMode FROM projects WHERE id = 7",
                [],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
            )
            .unwrap();
        assert_eq!((name.as_str(), created, active), ("Legacy", 1000, true));
        assert_eq!(mode, "monthly");

        let (project, entry_name): (i64, Option<String>) = conn
            .query_row(
                "SELECT projectId, name FROM time_entries WHERE id = 3",
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .unwrap();
        assert_eq!(project, 7);
        assert!(entry_name.is_none());

        let closes: i64 = conn
            .query_row("SELECT COUNT(*) FROM period_closes", [], |row| row.get(0))
            .unwrap();
        assert_eq!(closes, 1);
    }

    #[test]
    fn test_migration_is_deterministic() {
        let temp = TempDir::new().unwrap();
        let source = v1_snapshot(temp.path());
        let ctx = MigrationContext::new(Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap());
        let migrator = SchemaMigrator::new(temp.path().join("work")).with_context(ctx);

        let dump = |path: &Path| -> Vec<(i64, i64, i64)> {
            Connection::open(path)
                .unwrap()
                .prepare("SELECT projectId, closeTime, createdAt FROM period_closes ORDER BY id")
                .unwrap()
                .query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))
                .unwrap()
                .collect::<rusqlite::Result<_>>()
                .unwrap()
        };

        let first = migrator.migrate(&source, 1).unwrap();
        std::thread::sleep(std::time::Duration::from_millis(5));
        let second = migrator.migrate(&source, 1).unwrap();
        assert_ne!(first, second);
        assert_eq!(dump(&first), dump(&second));
    }

    #[test]
    fn test_failed_migration_discards_copy() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("lying.db");
        {
            // claims v2 but has no tables
            let conn = Connection::open(&source).unwrap();
            write_user_version(&conn, 2).unwrap();
        }
        let work = temp.path().join("work");

        let err = SchemaMigrator::new(&work).migrate(&source, 2).unwrap_err();

        assert!(err.is_migration());
        let leftovers: Vec<_> = fs::read_dir(&work).unwrap().collect();
        assert!(leftovers.is_empty());
        assert!(table_columns(&Connection::open(&source).unwrap(), "projects")
            .unwrap()
            .is_empty());
    }
}
