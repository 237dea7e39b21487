//! Custom error types for hours-vault
//!
//! This module defines the error hierarchy for the backup engine using thiserror
//! for ergonomic error definitions.

use thiserror::Error;

/// The main error type for hours-vault operations
#[derive(Error, Debug)]
pub enum HoursError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// File I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(String),

    /// SQLite errors
    #[error("Database error: {0}")]
    Database(String),

    /// Validation errors for data models and snapshot files
    #[error("Validation error: {0}")]
    Validation(String),

    /// A schema migration step failed
    #[error("Migration from v{from} to v{to} failed: {reason}")]
    Migration { from: u32, to: u32, reason: String },

    /// Snapshot export errors
    #[error("Export error: {0}")]
    Export(String),

    /// Restore errors
    #[error("Restore error: {0}")]
    Restore(String),

    /// Entity not found errors
    #[error("{entity_type} not found: {identifier}")]
    NotFound {
        entity_type: &'static str,
        identifier: String,
    },

    /// Storage errors
    #[error("Storage error: {0}")]
    Storage(String),
}

impl HoursError {
    /// Create a "not found" error for projects
    pub fn project_not_found(identifier: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type: "Project",
            identifier: identifier.into(),
        }
    }

    /// Create a "not found" error for backups
    pub fn backup_not_found(identifier: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type: "Backup",
            identifier: identifier.into(),
        }
    }

    /// Check if this is a "not found" error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Check if this is a migration error
    pub fn is_migration(&self) -> bool {
        matches!(self, Self::Migration { .. })
    }
}

impl From<std::io::Error> for HoursError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for HoursError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err.to_string())
    }
}

impl From<rusqlite::Error> for HoursError {
    fn from(err: rusqlite::Error) -> Self {
        Self::Database(err.to_string())
    }
}

/// Result type alias for hours-vault operations
pub type HoursResult<T> = Result<T, HoursError>;
