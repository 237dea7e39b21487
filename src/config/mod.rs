//! Configuration module for hours-vault
//!
//! This module provides configuration management including:
//! - XDG-compliant path resolution
//! - User settings persistence
//! - Backup retention and export preferences

pub mod paths;
pub mod settings;

pub use paths::HoursPaths;
pub use settings::{AutoExportSettings, BackupRetention, Settings};
