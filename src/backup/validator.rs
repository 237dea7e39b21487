//! Backup validation
//!
//! Classifies a snapshot file against the schema version this build writes.
//! Validation never fails: every problem is reported through
//! [`ValidationOutcome`].

use std::path::Path;

use rusqlite::{Connection, OpenFlags};
use serde::Serialize;

use crate::error::HoursResult;
use crate::storage::schema::{
    has_entity_tables, infer_structural_version, list_user_tables, read_user_version,
    CURRENT_SCHEMA_VERSION,
};

/// Result of validating a backup
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationOutcome {
    /// Whether the backup can be restored
    pub usable: bool,
    /// Schema version of the backup; the migration chain starts here.
    /// For an unversioned file this is the version its structure matches.
    pub backup_version: u32,
    /// Version this build writes
    pub current_version: u32,
    /// Whether the schema migrator must run before restoring
    pub requires_migration: bool,
    /// Raw `user_version` header; `0` for unversioned files
    pub header_version: u32,
    pub message: String,
}

impl ValidationOutcome {
    fn unusable(backup_version: u32, message: impl Into<String>) -> Self {
        Self {
            usable: false,
            backup_version,
            current_version: CURRENT_SCHEMA_VERSION,
            requires_migration: false,
            header_version: backup_version,
            message: message.into(),
        }
    }

    fn usable(header_version: u32, backup_version: u32) -> Self {
        let requires_migration = backup_version < CURRENT_SCHEMA_VERSION;
        let message = if requires_migration {
            format!(
                "This backup is from an older version of the app (v{}). It will be \
                 automatically upgraded to the current version (v{}). Your projects and \
                 time entries will be preserved.",
                backup_version, CURRENT_SCHEMA_VERSION
            )
        } else {
            "Backup is compatible with current app version".to_string()
        };
        Self {
            usable: true,
            backup_version,
            current_version: CURRENT_SCHEMA_VERSION,
            requires_migration,
            header_version,
            message,
        }
    }

    /// Get a one-line summary
    pub fn summary(&self) -> String {
        let status = if self.usable { "OK" } else { "UNUSABLE" };
        format!(
            "[{}] v{} (current v{}): {}",
            status, self.backup_version, self.current_version, self.message
        )
    }
}

const CORRUPTED_MESSAGE: &str = "Backup file appears to be corrupted or invalid";

/// Validate the snapshot at `path`
pub fn validate_backup(path: &Path) -> ValidationOutcome {
    if !path.is_file() {
        return ValidationOutcome::unusable(0, "Backup file does not exist");
    }

    match classify(path) {
        Ok(outcome) => outcome,
        Err(e) => {
            log::warn!("Failed to validate {}: {}", path.display(), e);
            ValidationOutcome::unusable(0, format!("Failed to read backup file: {}", e))
        }
    }
}

fn classify(path: &Path) -> HoursResult<ValidationOutcome> {
    let conn = Connection::open_with_flags(
        path,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )?;
    let version = read_user_version(&conn)?;

    if version > CURRENT_SCHEMA_VERSION {
        return Ok(ValidationOutcome::unusable(
            version,
            format!(
                "This backup is from a newer version of the app (v{} vs v{}). \
                 Please update the app to restore this backup.",
                version, CURRENT_SCHEMA_VERSION
            ),
        ));
    }

    if version == 0 {
        // Unversioned: trust the structure, not the header.
        return Ok(match infer_structural_version(&conn)? {
            Some(inferred) => ValidationOutcome::usable(0, inferred),
            None => ValidationOutcome::unusable(0, CORRUPTED_MESSAGE),
        });
    }

    if !has_entity_tables(&list_user_tables(&conn)?) {
        return Ok(ValidationOutcome::unusable(version, CORRUPTED_MESSAGE));
    }

    Ok(ValidationOutcome::usable(version, version))
}
