//! hours-vault - Backup and restore engine for a time-tracking database
//!
//! The live data is a single SQLite file of projects, time entries and period
//! closes. This crate snapshots it to standalone backup files, keeps those
//! files in check, and restores them, upgrading old snapshots to the current
//! schema and rolling back when a restore goes wrong.
//!
//! # Architecture
//!
//! The crate is organized into the following modules:
//!
//! - `config`: Configuration and path management
//! - `error`: Custom error types
//! - `models`: Projects, time entries and period closes
//! - `storage`: SQLite schema, migrations and the live database handle
//! - `backup`: Snapshot export, validation, migration, restore and retention
//! - `cli`: Command handlers for the `hours` binary
//!
//! # Example
//!
//! ```rust,ignore
//! use hours_vault::backup::BackupManager;
//! use hours_vault::config::{HoursPaths, Settings};
//!
//! let paths = HoursPaths::new()?;
//! let settings = Settings::load_or_create(&paths)?;
//! let manager = BackupManager::open(paths, settings)?;
//! manager.check_and_create_backup_if_needed()?;
//! ```

pub mod backup;
pub mod cli;
pub mod config;
pub mod error;
pub mod models;
pub mod storage;

pub use error::{HoursError, HoursResult};
