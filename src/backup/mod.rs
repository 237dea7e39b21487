//! Backup system for hours-vault
//!
//! Snapshots the live SQLite database to standalone files, upgrades old
//! snapshots, and restores them with an automatic rollback on failure.
//!
//! # Architecture
//!
//! - `SnapshotExporter`: writes the live data into a fresh current-schema file
//! - `read_stats`: row counts of any snapshot, zeroed when unreadable
//! - `validate_backup`: classifies a snapshot against the current schema version
//! - `SchemaMigrator`: upgrades a private copy of an old snapshot
//! - `RestoreOrchestrator`: swaps a snapshot in, guarded by a `RollbackPoint`
//! - `RetentionManager`: caps scheduled and periodic backups
//! - `BackupManager`: owns the live database and ties the above together
//!
//! # Backup Format
//!
//! A backup is a plain SQLite file with the schema version in its
//! `user_version` header. File names encode the trigger and a UTC timestamp,
//! e.g. `periodic_20251127_143022.db`.
//!
//! # Retention Policy
//!
//! By default, the system keeps:
//! - 7 scheduled (daily) backups
//! - 6 periodic (monthly) backups
//!
//! Manual, pre-migration and emergency backups are never pruned.
//!
//! # Example
//!
//! ```rust,ignore
//! use hours_vault::backup::{BackupKind, BackupManager};
//! use hours_vault::config::{HoursPaths, Settings};
//!
//! let paths = HoursPaths::new()?;
//! let settings = Settings::load_or_create(&paths)?;
//! let manager = BackupManager::open(paths, settings)?;
//!
//! let record = manager.create_backup(BackupKind::Manual)?;
//!
//! // Later, restore from backup
//! let outcome = manager.restore(&record);
//! assert!(outcome.is_success());
//! ```

mod bridge;
mod exporter;
mod kind;
mod manager;
mod migrator;
mod reader;
mod record;
mod restore;
mod retention;
mod rollback;
mod validator;

pub use bridge::{export_backup, import_backup, Locator};
pub use exporter::{copy_database, ExportSummary, SnapshotExporter, EXPORT_BATCH_SIZE};
pub use kind::{parse_backup_file_name, BackupKind, BackupName, BACKUP_EXTENSION};
pub use manager::{BackupManager, BackupState};
pub use migrator::SchemaMigrator;
pub use reader::read_stats;
pub use record::{BackupRecord, BackupStats};
pub use restore::{RestoreOrchestrator, RestoreOutcome, RestoreStage};
pub use retention::RetentionManager;
pub use rollback::RollbackPoint;
pub use validator::{validate_backup, ValidationOutcome};
