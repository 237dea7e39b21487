//! Restore orchestration
//!
//! Replaces the live database with a backup. The live files are copied to a
//! rollback point before anything is deleted; if the restored database cannot
//! be opened and read, the rollback point is put back.
//!
//! Stages run strictly in order:
//!
//! ```text
//! Idle -> Validating -> [Migrating] -> Checkpointing -> RollbackPointCreated
//!      -> Swapping -> Verifying -> Committed | RolledBack -> Idle
//! ```

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use super::migrator::SchemaMigrator;
use super::rollback::RollbackPoint;
use super::validator::validate_backup;
use crate::error::{HoursError, HoursResult};
use crate::storage::file_io::remove_database_files;
use crate::storage::{DomainReader, LiveDatabase, MigrationContext};

/// Where a restore currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestoreStage {
    Idle,
    Validating,
    Migrating,
    Checkpointing,
    RollbackPointCreated,
    Swapping,
    Verifying,
    Committed,
    RolledBack,
}

impl fmt::Display for RestoreStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Validating => "validating",
            Self::Migrating => "migrating",
            Self::Checkpointing => "checkpointing",
            Self::RollbackPointCreated => "rollback point created",
            Self::Swapping => "swapping",
            Self::Verifying => "verifying",
            Self::Committed => "committed",
            Self::RolledBack => "rolled back",
        };
        f.write_str(name)
    }
}

/// Result of a restore
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RestoreOutcome {
    Success,
    Failed(String),
}

impl RestoreOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }

    /// Failure message, if any
    pub fn message(&self) -> Option<&str> {
        match self {
            Self::Success => None,
            Self::Failed(message) => Some(message),
        }
    }
}

/// Drives one restore against an exclusively borrowed live database
pub struct RestoreOrchestrator<'a> {
    live: &'a mut LiveDatabase,
    work_dir: PathBuf,
    migration_context: Option<MigrationContext>,
    stage: RestoreStage,
}

impl<'a> RestoreOrchestrator<'a> {
    pub fn new(live: &'a mut LiveDatabase, work_dir: impl Into<PathBuf>) -> Self {
        Self {
            live,
            work_dir: work_dir.into(),
            migration_context: None,
            stage: RestoreStage::Idle,
        }
    }

    /// Pin the reference time used if the backup needs migrating
    pub fn with_migration_context(mut self, context: MigrationContext) -> Self {
        self.migration_context = Some(context);
        self
    }

    pub fn stage(&self) -> RestoreStage {
        self.stage
    }

    fn enter(&mut self, stage: RestoreStage) {
        log::debug!("Restore: {} -> {}", self.stage, stage);
        self.stage = stage;
    }

    /// Restore the backup at `backup_path` into the live database
    pub fn restore(&mut self, backup_path: &Path) -> RestoreOutcome {
        self.enter(RestoreStage::Validating);
        let validation = validate_backup(backup_path);
        if !validation.usable {
            log::warn!(
                "Refusing to restore {}: {}",
                backup_path.display(),
                validation.message
            );
            self.enter(RestoreStage::Idle);
            return RestoreOutcome::Failed(validation.message);
        }

        let mut migrated_copy = None;
        let source = if validation.requires_migration {
            self.enter(RestoreStage::Migrating);
            let mut migrator = SchemaMigrator::new(&self.work_dir);
            if let Some(context) = self.migration_context {
                migrator = migrator.with_context(context);
            }
            match migrator.migrate(backup_path, validation.backup_version) {
                Ok(path) => {
                    migrated_copy = Some(path.clone());
                    path
                }
                Err(e) => {
                    log::error!("Failed to migrate {}: {}", backup_path.display(), e);
                    self.enter(RestoreStage::Idle);
                    return RestoreOutcome::Failed("Failed to migrate backup".to_string());
                }
            }
        } else {
            backup_path.to_path_buf()
        };

        let outcome = self.swap_in(&source);

        if let Some(copy) = migrated_copy {
            if let Err(e) = remove_database_files(&copy) {
                log::warn!("Failed to delete migrated copy {}: {}", copy.display(), e);
            }
        }

        if outcome.is_success() {
            log::info!("Restored database from {}", backup_path.display());
        }
        self.enter(RestoreStage::Idle);
        outcome
    }

    fn swap_in(&mut self, source: &Path) -> RestoreOutcome {
        self.enter(RestoreStage::Checkpointing);
        if let Err(e) = self.live.close() {
            log::warn!("Live database did not close cleanly: {}", e);
        }

        let live_path = self.live.path().to_path_buf();
        let rollback = match RollbackPoint::create(&live_path, &self.work_dir) {
            Ok(point) => point,
            Err(e) => {
                log::error!("Cannot create safety backup: {}", e);
                if let Err(e) = self.live.reopen() {
                    log::error!("Failed to reopen live database: {}", e);
                }
                return RestoreOutcome::Failed("Cannot create safety backup".to_string());
            }
        };
        self.enter(RestoreStage::RollbackPointCreated);

        let outcome = match self.replace_and_verify(source, &live_path) {
            Ok(()) => {
                self.enter(RestoreStage::Committed);
                RestoreOutcome::Success
            }
            Err(cause) => {
                let outcome = self.roll_back(&rollback, &live_path, &cause);
                self.enter(RestoreStage::RolledBack);
                outcome
            }
        };

        if let Err(e) = rollback.cleanup() {
            log::warn!(
                "Failed to delete rollback point {}: {}",
                rollback.dir().display(),
                e
            );
        }
        outcome
    }

    fn replace_and_verify(&mut self, source: &Path, live_path: &Path) -> HoursResult<()> {
        self.enter(RestoreStage::Swapping);
        remove_database_files(live_path)
            .map_err(|e| HoursError::Restore(format!("Cannot remove live database: {}", e)))?;
        fs::copy(source, live_path)
            .map_err(|e| HoursError::Restore(format!("Cannot copy backup into place: {}", e)))?;

        self.enter(RestoreStage::Verifying);
        self.live.reopen()?;
        let repo = self.live.repository()?;
        repo.get_all_projects()?;
        repo.get_entry_count()?;
        Ok(())
    }

    fn roll_back(
        &mut self,
        rollback: &RollbackPoint,
        live_path: &Path,
        cause: &HoursError,
    ) -> RestoreOutcome {
        log::error!("Restore failed, rolling back: {}", cause);
        if let Err(e) = self.live.close() {
            log::warn!("Failed to close restored database: {}", e);
        }

        match rollback
            .restore_into(live_path)
            .and_then(|()| self.live.reopen())
        {
            Ok(()) => RestoreOutcome::Failed(format!(
                "Restore failed: {}. Rolled back to previous state.",
                cause
            )),
            Err(e) => {
                log::error!(
                    "ROLLBACK FAILED, live database at {} may be inconsistent: {}",
                    live_path.display(),
                    e
                );
                RestoreOutcome::Failed(format!(
                    "Restore failed: {}. Rollback also failed: {}",
                    cause, e
                ))
            }
        }
    }
}
