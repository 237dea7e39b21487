//! Backup manager for hours-vault
//!
//! Owns the live database and coordinates every backup operation against it.
//!
//! Locking: a `RwLock` gates the live database file. Exports, validation and
//! statistics take it shared; a restore takes it exclusively for its whole
//! run, so no snapshot is ever taken of a half-swapped file.

use std::path::{Path, PathBuf};
use std::sync::mpsc::Receiver;
use std::sync::{Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Datelike, Duration, Utc};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use super::bridge::{self, unique_backup_path, Locator};
use super::exporter::{copy_database, SnapshotExporter};
use super::kind::BackupKind;
use super::reader::read_stats;
use super::record::{scan_backup_dir, BackupRecord, BackupStats};
use super::restore::{RestoreOrchestrator, RestoreOutcome};
use super::retention::RetentionManager;
use super::validator::{validate_backup, ValidationOutcome};
use crate::config::paths::HoursPaths;
use crate::config::settings::Settings;
use crate::error::{HoursError, HoursResult};
use crate::storage::file_io::{read_json, remove_database_files, write_json_atomic};
use crate::storage::schema::{infer_structural_version, read_user_version};
use crate::storage::{DatabaseEvent, DomainReader, LiveDatabase, CURRENT_SCHEMA_VERSION};

/// Bookkeeping for automatic backups, persisted between runs
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupState {
    /// When the last backup of any kind was created
    #[serde(default)]
    pub last_backup_at: Option<DateTime<Utc>>,
    /// Entry count of the live database at that moment
    #[serde(default)]
    pub entries_at_last_backup: u64,
}

impl BackupState {
    pub fn load(paths: &HoursPaths) -> HoursResult<Self> {
        read_json(paths.backup_state_file())
    }

    pub fn save(&self, paths: &HoursPaths) -> HoursResult<()> {
        write_json_atomic(paths.backup_state_file(), self)
    }

    /// Whether a scheduled backup is due
    pub fn backup_due(&self, now: DateTime<Utc>, entry_count: u64, entry_threshold: u64) -> bool {
        let Some(last) = self.last_backup_at else {
            return true;
        };
        now - last >= Duration::days(1)
            || entry_count >= self.entries_at_last_backup.saturating_add(entry_threshold)
    }
}

/// Manages backup creation, retention and restore
pub struct BackupManager {
    paths: HoursPaths,
    settings: Settings,
    gate: RwLock<()>,
    live: Mutex<LiveDatabase>,
}

impl BackupManager {
    /// Open the live database and wrap it.
    ///
    /// A live file that is about to be upgraded to a newer schema is first
    /// copied to a pre-migration backup.
    pub fn open(paths: HoursPaths, settings: Settings) -> HoursResult<Self> {
        paths.ensure_directories()?;
        let db_path = paths.database_file();

        if let Some(version) = pending_upgrade(&db_path)? {
            let target = unique_backup_path(&paths.backup_dir(), BackupKind::PreMigration);
            copy_database(&db_path, &target).map_err(|e| {
                HoursError::Storage(format!(
                    "Cannot back up database before upgrading from v{}: {}",
                    version, e
                ))
            })?;
            log::info!(
                "Saved pre-migration backup {} (v{})",
                target.display(),
                version
            );
        }

        let live = LiveDatabase::open(&db_path)?;
        Ok(Self {
            paths,
            settings,
            gate: RwLock::new(()),
            live: Mutex::new(live),
        })
    }

    pub fn paths(&self) -> &HoursPaths {
        &self.paths
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Get backup directory path
    pub fn backup_dir(&self) -> PathBuf {
        self.paths.backup_dir()
    }

    fn read_gate(&self) -> HoursResult<RwLockReadGuard<'_, ()>> {
        self.gate
            .read()
            .map_err(|_| HoursError::Storage("Database gate poisoned".into()))
    }

    fn write_gate(&self) -> HoursResult<RwLockWriteGuard<'_, ()>> {
        self.gate
            .write()
            .map_err(|_| HoursError::Storage("Database gate poisoned".into()))
    }

    fn lock_live(&self) -> HoursResult<MutexGuard<'_, LiveDatabase>> {
        self.live
            .lock()
            .map_err(|_| HoursError::Storage("Live database lock poisoned".into()))
    }

    /// Run `f` against the live database, shared with other readers
    pub fn with_live<T>(&self, f: impl FnOnce(&LiveDatabase) -> HoursResult<T>) -> HoursResult<T> {
        let _gate = self.read_gate()?;
        let live = self.lock_live()?;
        f(&live)
    }

    /// Receive a notification whenever the live handle is replaced
    pub fn subscribe(&self) -> HoursResult<Receiver<DatabaseEvent>> {
        Ok(self.lock_live()?.subscribe())
    }

    /// Snapshot the live database as a new backup of `kind`.
    ///
    /// Retention runs afterwards for kinds it caps, then auto-export if
    /// configured. Neither can fail the backup. Uncapped kinds skip
    /// retention, so an emergency backup taken before a restore never
    /// deletes the backup being restored.
    pub fn create_backup(&self, kind: BackupKind) -> HoursResult<BackupRecord> {
        let backup_dir = self.backup_dir();
        std::fs::create_dir_all(&backup_dir)
            .map_err(|e| HoursError::Io(format!("Failed to create backup directory: {}", e)))?;

        let (target, entry_count) = {
            let _gate = self.read_gate()?;
            let live = self.lock_live()?;
            let target = unique_backup_path(&backup_dir, kind);
            SnapshotExporter::new().export_live(&live, &target)?;
            let entry_count = live.repository()?.get_entry_count()?;
            (target, entry_count)
        };

        let record = BackupRecord::from_path(&target)?;
        log::info!("Created {} backup {}", kind, record.file_name);

        let state = BackupState {
            last_backup_at: Some(Utc::now()),
            entries_at_last_backup: entry_count,
        };
        if let Err(e) = state.save(&self.paths) {
            log::warn!("Failed to record backup state: {}", e);
        }

        if kind.retention_cap(&self.settings.backup_retention).is_some() {
            self.prune();
        }
        self.auto_export(&record);
        Ok(record)
    }

    fn auto_export(&self, record: &BackupRecord) {
        let Some(dir) = self.settings.auto_export_dir() else {
            return;
        };
        let destination = Locator::from_path(dir);
        if let Err(e) = std::fs::create_dir_all(dir)
            .map_err(HoursError::from)
            .and_then(|()| bridge::export_backup(record, &destination))
        {
            log::warn!("Auto-export of {} failed: {}", record.file_name, e);
        }
    }

    /// Create a scheduled backup if one is due, plus this month's periodic
    /// backup if it is missing.
    ///
    /// Returns the backups created.
    pub fn check_and_create_backup_if_needed(&self) -> HoursResult<Vec<BackupRecord>> {
        if !self.settings.auto_backup_enabled {
            return Ok(Vec::new());
        }

        let now = Utc::now();
        let state = BackupState::load(&self.paths).unwrap_or_else(|e| {
            log::warn!("Ignoring unreadable backup state: {}", e);
            BackupState::default()
        });
        let entry_count = self.with_live(|live| live.repository()?.get_entry_count())?;

        let mut created = Vec::new();
        if state.backup_due(now, entry_count, self.settings.auto_backup_entry_threshold) {
            created.push(self.create_backup(BackupKind::Scheduled)?);
        }

        let has_periodic_this_month = self.list_backups()?.iter().any(|b| {
            b.kind == BackupKind::Periodic
                && b.created_at.year() == now.year()
                && b.created_at.month() == now.month()
        });
        if !has_periodic_this_month {
            created.push(self.create_backup(BackupKind::Periodic)?);
        }

        Ok(created)
    }

    /// List all backups, newest first
    pub fn list_backups(&self) -> HoursResult<Vec<BackupRecord>> {
        Ok(scan_backup_dir(&self.backup_dir())?
            .into_iter()
            .map(BackupRecord::from_file)
            .collect())
    }

    /// Get a specific backup by filename
    pub fn get_backup(&self, file_name: &str) -> HoursResult<Option<BackupRecord>> {
        if file_name.contains(['/', '\\']) {
            return Ok(None);
        }
        let path = self.backup_dir().join(file_name);
        if !path.is_file() {
            return Ok(None);
        }
        BackupRecord::from_path(&path).map(Some)
    }

    /// Get the most recent backup
    pub fn latest_backup(&self) -> HoursResult<Option<BackupRecord>> {
        Ok(self.list_backups()?.into_iter().next())
    }

    /// Combined size of all backups in bytes
    pub fn total_backup_size(&self) -> HoursResult<u64> {
        Ok(scan_backup_dir(&self.backup_dir())?
            .iter()
            .map(|f| f.size_bytes)
            .sum())
    }

    /// Delete one backup by filename
    pub fn delete_backup(&self, file_name: &str) -> HoursResult<()> {
        let record = self
            .get_backup(file_name)?
            .ok_or_else(|| HoursError::backup_not_found(file_name))?;
        std::fs::remove_file(&record.path)
            .map_err(|e| HoursError::Io(format!("Failed to delete backup: {}", e)))?;
        log::info!("Deleted backup {}", record.file_name);
        Ok(())
    }

    /// Delete every backup. Returns how many were removed.
    pub fn delete_all_backups(&self) -> HoursResult<usize> {
        let mut removed = 0;
        for file in scan_backup_dir(&self.backup_dir())? {
            match std::fs::remove_file(&file.path) {
                Ok(()) => removed += 1,
                Err(e) => log::warn!("Failed to delete {}: {}", file.path.display(), e),
            }
        }
        log::info!("Deleted {} backup(s)", removed);
        Ok(removed)
    }

    /// Validate a snapshot file
    pub fn validate(&self, path: &Path) -> ValidationOutcome {
        // A poisoned gate still hands back the guard.
        let _gate = self.gate.read();
        validate_backup(path)
    }

    /// Row counts of a snapshot file; zeroed if unreadable
    pub fn read_stats(&self, path: &Path) -> BackupStats {
        let _gate = self.gate.read();
        read_stats(path)
    }

    /// Restore a backup into the live database
    pub fn restore(&self, record: &BackupRecord) -> RestoreOutcome {
        self.restore_from_path(&record.path)
    }

    /// Restore any snapshot file into the live database
    pub fn restore_from_path(&self, path: &Path) -> RestoreOutcome {
        let _gate = match self.write_gate() {
            Ok(gate) => gate,
            Err(e) => return RestoreOutcome::Failed(e.to_string()),
        };
        let mut live = match self.lock_live() {
            Ok(live) => live,
            Err(e) => return RestoreOutcome::Failed(e.to_string()),
        };
        RestoreOrchestrator::new(&mut live, self.paths.work_dir()).restore(path)
    }

    /// Enforce the retention policy. Returns the deleted paths.
    pub fn prune(&self) -> Vec<PathBuf> {
        RetentionManager::new(self.backup_dir(), self.settings.backup_retention.clone()).prune()
    }

    /// Backups the next prune would delete
    pub fn prune_candidates(&self) -> Vec<PathBuf> {
        RetentionManager::new(self.backup_dir(), self.settings.backup_retention.clone())
            .candidates()
    }

    /// Copy a backup to an external location
    pub fn export_backup(&self, record: &BackupRecord, destination: &Locator) -> HoursResult<PathBuf> {
        bridge::export_backup(record, destination)
    }

    /// Bring an external snapshot into the backup directory as a manual backup
    pub fn import_backup(&self, source: &Locator) -> HoursResult<BackupRecord> {
        bridge::import_backup(source, &self.backup_dir())
    }

    /// Remove leftovers from interrupted migrations and restores
    pub fn clean_work_dir(&self) -> HoursResult<usize> {
        let _gate = self.write_gate()?;
        let work_dir = self.paths.work_dir();
        if !work_dir.exists() {
            return Ok(0);
        }
        let mut removed = 0;
        for entry in std::fs::read_dir(&work_dir)? {
            let path = entry?.path();
            let result = if path.is_dir() {
                std::fs::remove_dir_all(&path)
            } else {
                remove_database_files(&path)
            };
            match result {
                Ok(()) => removed += 1,
                Err(e) => log::warn!("Failed to remove {}: {}", path.display(), e),
            }
        }
        Ok(removed)
    }
}

/// Version of the live file if opening it will run migrations
fn pending_upgrade(db_path: &Path) -> HoursResult<Option<u32>> {
    if !db_path.is_file() || std::fs::metadata(db_path)?.len() == 0 {
        return Ok(None);
    }
    let conn = Connection::open(db_path)?;
    let mut version = read_user_version(&conn)?;
    if version == 0 {
        match infer_structural_version(&conn)? {
            Some(inferred) => version = inferred,
            None => return Ok(None),
        }
    }
    Ok((version < CURRENT_SCHEMA_VERSION).then_some(version))
}
