//! Snapshot statistics
//!
//! Reads row counts out of any database file without assuming it has the
//! current schema. Failures are logged and reported as zeroed statistics.

use std::fs;
use std::path::Path;

use rusqlite::{Connection, OpenFlags};

use super::record::BackupStats;
use crate::error::HoursResult;
use crate::models::from_millis;
use crate::storage::schema::{list_user_tables, PROJECTS_TABLE, TIME_ENTRIES_TABLE};

/// Statistics of the snapshot at `path`; zeroed when it cannot be read
pub fn read_stats(path: &Path) -> BackupStats {
    match try_read_stats(path) {
        Ok(stats) => stats,
        Err(e) => {
            log::warn!("Could not read statistics of {}: {}", path.display(), e);
            BackupStats::default()
        }
    }
}

fn try_read_stats(path: &Path) -> HoursResult<BackupStats> {
    if fs::metadata(path)?.len() == 0 {
        return Ok(BackupStats::default());
    }

    let conn = Connection::open_with_flags(
        path,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )?;

    let tables = list_user_tables(&conn)?;
    let has_projects = tables.iter().any(|t| t == PROJECTS_TABLE);
    let has_entries = tables.iter().any(|t| t == TIME_ENTRIES_TABLE);

    let mut stats = BackupStats::default();
    if has_projects {
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM projects", [], |row| row.get(0))?;
        stats.project_count = count.max(0) as u64;
    }
    if has_entries {
        let (count, last): (i64, Option<i64>) = conn.query_row(
            "SELECT COUNT(*), MAX(startTime) FROM time_entries",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        stats.entry_count = count.max(0) as u64;
        stats.last_entry_at = last.map(from_millis);
    }
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Project, TimeEntry};
    use crate::storage::{migrate_connection, MigrationContext, TimeTrackingRepository};
    use chrono::{TimeZone, Utc};
    use tempfile::TempDir;

    #[test]
    fn test_counts_rows_and_latest_entry() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("snap.db");
        let mut conn = Connection::open(&path).unwrap();
        migrate_connection(&mut conn, 0, 4, &MigrationContext::now()).unwrap();
        let repo = TimeTrackingRepository::new(&conn);
        let project = repo.insert_project(&Project::new("Stats")).unwrap();
        repo.insert_project(&Project::new("Idle")).unwrap();
        let early = Utc.with_ymd_and_hms(2025, 1, 1, 9, 0, 0).unwrap();
        let late = Utc.with_ymd_and_hms(2025, 2, 1, 9, 0, 0).unwrap();
        repo.insert_entry(&TimeEntry::completed(project, early, 30))
            .unwrap();
        repo.insert_entry(&TimeEntry::completed(project, late, 30))
            .unwrap();
        drop(conn);

        let stats = read_stats(&path);
        assert_eq!(stats.project_count, 2);
        assert_eq!(stats.entry_count, 2);
        assert_eq!(stats.last_entry_at, Some(late));
    }

    #[test]
    fn test_missing_and_garbage_files_are_zeroed() {
        let temp = TempDir::new().unwrap();
        assert_eq!(read_stats(&temp.path().join("gone.db")), BackupStats::default());

        let garbage = temp.path().join("garbage.db");
        fs::write(&garbage, b"this is definitely not a database file, just text").unwrap();
        assert_eq!(read_stats(&garbage), BackupStats::default());

        let empty = temp.path().join("empty.db");
        fs::write(&empty, b"").unwrap();
        assert_eq!(read_stats(&empty), BackupStats::default());
    }

    #[test]
    fn test_foreign_tables_are_zeroed() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("other.db");
        let conn = Connection::open(&path).unwrap();
        conn.execute_batch("CREATE TABLE notes (id INTEGER PRIMARY KEY, body TEXT);")
            .unwrap();
        drop(conn);

        assert!(read_stats(&path).is_empty());
    }

    #[test]
    fn test_tolerates_missing_entry_table() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("half.db");
        let conn = Connection::open(&path).unwrap();
        conn.execute_batch(
            "CREATE TABLE projects (id INTEGER PRIMARY KEY, name TEXT);
             INSERT INTO projects (name) VALUES ('only');",
        )
        .unwrap();
        drop(conn);

        let stats = read_stats(&path);
        assert_eq!(stats.project_count, 1);
        assert_eq!(stats.entry_count, 0);
        assert!(stats.last_entry_at.is_none());
    }
}
