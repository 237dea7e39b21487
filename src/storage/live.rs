//! The live database handle
//!
//! Exactly one `LiveDatabase` owns the application's connection. The restore
//! orchestrator closes it, swaps the files underneath and reopens it; every
//! close and reopen is announced to subscribers so they can re-acquire
//! whatever they derived from the old handle.

use std::path::{Path, PathBuf};
use std::sync::mpsc::{channel, Receiver, Sender};

use rusqlite::Connection;

use super::migrations::{migrate_connection, MigrationContext};
use super::repository::TimeTrackingRepository;
use super::schema::{
    infer_structural_version, read_user_version, write_user_version, CURRENT_SCHEMA_VERSION,
};
use crate::error::{HoursError, HoursResult};

/// Lifecycle notifications for holders of the live handle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatabaseEvent {
    /// The handle was closed; anything derived from it is stale
    HandleInvalidated { generation: u64 },
    /// A fresh handle is available
    HandleReopened { generation: u64 },
}

/// Write-ahead log and shared-memory index paths next to a database file
pub fn side_files(path: &Path) -> [PathBuf; 2] {
    let base = path.as_os_str().to_os_string();
    let mut wal = base.clone();
    wal.push("-wal");
    let mut shm = base;
    shm.push("-shm");
    [PathBuf::from(wal), PathBuf::from(shm)]
}

/// Open `path` the way the application always does: WAL journal, pending
/// schema migrations applied, foreign keys enforced.
///
/// An unversioned file that already has the entity tables is stamped with the
/// version its structure matches before the chain runs.
pub fn open_connection(path: &Path) -> HoursResult<Connection> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| HoursError::Io(format!("Failed to create database directory: {}", e)))?;
    }

    let mut conn = Connection::open(path)?;
    conn.execute_batch("PRAGMA journal_mode=WAL;")?;

    let mut version = read_user_version(&conn)?;
    if version == 0 {
        if let Some(inferred) = infer_structural_version(&conn)? {
            write_user_version(&conn, inferred)?;
            log::info!(
                "Unversioned database at {} matches schema v{}",
                path.display(),
                inferred
            );
            version = inferred;
        }
    }

    if version > CURRENT_SCHEMA_VERSION {
        return Err(HoursError::Validation(format!(
            "Database schema version ({}) is newer than this build supports ({}). \
             Please update the application.",
            version, CURRENT_SCHEMA_VERSION
        )));
    }

    let applied = migrate_connection(
        &mut conn,
        version,
        CURRENT_SCHEMA_VERSION,
        &MigrationContext::now(),
    )?;
    if applied > 0 {
        log::info!(
            "Upgraded {} from v{} to v{}",
            path.display(),
            version,
            CURRENT_SCHEMA_VERSION
        );
    }

    // Set after migrations so table rebuilds are never blocked by FK checks.
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    Ok(conn)
}

/// Owner of the live connection
pub struct LiveDatabase {
    path: PathBuf,
    conn: Option<Connection>,
    generation: u64,
    listeners: Vec<Sender<DatabaseEvent>>,
}

impl LiveDatabase {
    /// Open (or create) the live database at `path`
    pub fn open(path: impl Into<PathBuf>) -> HoursResult<Self> {
        let path = path.into();
        let conn = open_connection(&path)?;
        Ok(Self {
            path,
            conn: Some(conn),
            generation: 1,
            listeners: Vec::new(),
        })
    }

    /// Path of the primary database file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Handle generation; changes every time the handle is reopened
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_open(&self) -> bool {
        self.conn.is_some()
    }

    /// Borrow the open connection
    pub fn conn(&self) -> HoursResult<&Connection> {
        self.conn
            .as_ref()
            .ok_or_else(|| HoursError::Storage("Live database is closed".into()))
    }

    /// Domain repository over the open connection
    pub fn repository(&self) -> HoursResult<TimeTrackingRepository<'_>> {
        Ok(TimeTrackingRepository::new(self.conn()?))
    }

    /// Flush the write-ahead log into the primary file
    pub fn checkpoint(&self) -> HoursResult<()> {
        self.conn()?
            .execute_batch("PRAGMA wal_checkpoint(FULL);")
            .map_err(|e| HoursError::Database(format!("WAL checkpoint failed: {}", e)))
    }

    /// Register for lifecycle notifications
    pub fn subscribe(&mut self) -> Receiver<DatabaseEvent> {
        let (tx, rx) = channel();
        self.listeners.push(tx);
        rx
    }

    fn notify(&mut self, event: DatabaseEvent) {
        // Drop listeners whose receiver is gone.
        self.listeners.retain(|tx| tx.send(event).is_ok());
    }

    /// Checkpoint and close the handle.
    ///
    /// The handle is released even when closing reports an error; the error is
    /// returned for the caller to log.
    pub fn close(&mut self) -> HoursResult<()> {
        let Some(conn) = self.conn.take() else {
            return Ok(());
        };
        self.notify(DatabaseEvent::HandleInvalidated {
            generation: self.generation,
        });

        let checkpoint = conn
            .execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")
            .map_err(|e| HoursError::Database(format!("WAL checkpoint failed: {}", e)));

        conn.close()
            .map_err(|(_, e)| HoursError::Database(format!("Failed to close database: {}", e)))?;
        checkpoint
    }

    /// Open the handle again through the normal open path
    pub fn reopen(&mut self) -> HoursResult<()> {
        if self.conn.is_some() {
            self.close()?;
        }
        let conn = open_connection(&self.path)?;
        self.conn = Some(conn);
        self.generation += 1;
        self.notify(DatabaseEvent::HandleReopened {
            generation: self.generation,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Project;
    use tempfile::TempDir;

    #[test]
    fn test_open_creates_current_schema() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("data").join("hours.db");
        let db = LiveDatabase::open(&path).unwrap();

        assert!(path.exists());
        assert_eq!(
            read_user_version(db.conn().unwrap()).unwrap(),
            CURRENT_SCHEMA_VERSION
        );
    }

    #[test]
    fn test_close_and_reopen_notify_subscribers() {
        let temp = TempDir::new().unwrap();
        let mut db = LiveDatabase::open(temp.path().join("hours.db")).unwrap();
        let events = db.subscribe();

        db.close().unwrap();
        assert!(!db.is_open());
        assert!(db.conn().is_err());
        db.reopen().unwrap();

        assert_eq!(
            events.try_recv().unwrap(),
            DatabaseEvent::HandleInvalidated { generation: 1 }
        );
        assert_eq!(
            events.try_recv().unwrap(),
            DatabaseEvent::HandleReopened { generation: 2 }
        );
        assert_eq!(db.generation(), 2);
    }

    #[test]
    fn test_data_survives_close_and_reopen() {
        let temp = TempDir::new().unwrap();
        let mut db = LiveDatabase::open(temp.path().join("hours.db")).unwrap();
        db.repository()
            .unwrap()
            .insert_project(&Project::new("Persisted"))
            .unwrap();

        db.close().unwrap();
        db.reopen().unwrap();

        let projects = db.repository().unwrap().get_all_projects().unwrap();
        assert_eq!(projects.len(), 1);
    }

    #[test]
    fn test_close_is_idempotent() {
        let temp = TempDir::new().unwrap();
        let mut db = LiveDatabase::open(temp.path().join("hours.db")).unwrap();
        db.close().unwrap();
        db.close().unwrap();
    }

    #[test]
    fn test_open_rejects_future_schema() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("future.db");
        {
            let conn = Connection::open(&path).unwrap();
            write_user_version(&conn, CURRENT_SCHEMA_VERSION + 1).unwrap();
        }
        assert!(LiveDatabase::open(&path).is_err());
    }

    #[test]
    fn test_side_files() {
        let [wal, shm] = side_files(Path::new("/tmp/hours.db"));
        assert_eq!(wal, PathBuf::from("/tmp/hours.db-wal"));
        assert_eq!(shm, PathBuf::from("/tmp/hours.db-shm"));
    }
}
