//! Moving backups in and out of the backup directory
//!
//! Plain byte copies between the backup store and a caller-named location.
//! Nothing here touches the live database.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::Utc;
use url::Url;

use super::kind::BackupKind;
use super::record::BackupRecord;
use super::validator::validate_backup;
use crate::error::{HoursError, HoursResult};
use crate::storage::file_io::{copy_file_atomic, remove_if_exists};

/// An external location, given as a `file://` URI or a plain path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Locator {
    path: PathBuf,
}

impl Locator {
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Resolve against a backup file name: a directory receives the file
    /// under its own name.
    fn destination_for(&self, file_name: &str) -> PathBuf {
        if self.path.is_dir() {
            self.path.join(file_name)
        } else {
            self.path.clone()
        }
    }
}

impl FromStr for Locator {
    type Err = HoursError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(HoursError::Validation("Empty location".into()));
        }

        if !s.contains("://") {
            return Ok(Self::from_path(s));
        }

        let url = Url::parse(s)
            .map_err(|e| HoursError::Validation(format!("Invalid location '{}': {}", s, e)))?;
        if url.scheme() != "file" {
            return Err(HoursError::Validation(format!(
                "Unsupported location scheme: {}",
                url.scheme()
            )));
        }
        // Only local files: no host other than localhost
        let path = url.to_file_path().map_err(|_| {
            HoursError::Validation(format!("Location is not a local file: {}", s))
        })?;
        Ok(Self::from_path(path))
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path.display())
    }
}

/// Copy a backup out to `destination`. Returns where it was written.
pub fn export_backup(record: &BackupRecord, destination: &Locator) -> HoursResult<PathBuf> {
    if !record.path.is_file() {
        return Err(HoursError::backup_not_found(&record.file_name));
    }
    let target = destination.destination_for(&record.file_name);
    copy_file_atomic(&record.path, &target)
        .map_err(|e| HoursError::Export(format!("Failed to export backup: {}", e)))?;
    log::info!("Exported {} to {}", record.file_name, target.display());
    Ok(target)
}

/// Copy an external file into `backup_dir` as a manual backup.
///
/// The copy is validated; an unusable file is removed again and reported as
/// a validation error.
pub fn import_backup(source: &Locator, backup_dir: &Path) -> HoursResult<BackupRecord> {
    if !source.path().is_file() {
        return Err(HoursError::Validation(format!(
            "Import source does not exist: {}",
            source
        )));
    }

    let target = unique_backup_path(backup_dir, BackupKind::Manual);
    copy_file_atomic(source.path(), &target)?;

    let outcome = validate_backup(&target);
    if !outcome.usable {
        if let Err(e) = remove_if_exists(&target) {
            log::warn!("Failed to remove rejected import {}: {}", target.display(), e);
        }
        return Err(HoursError::Validation(outcome.message));
    }

    log::info!("Imported {} as {}", source, target.display());
    BackupRecord::from_path(&target)
}

/// Path for a new backup of `kind` that does not collide with an existing file
pub(crate) fn unique_backup_path(backup_dir: &Path, kind: BackupKind) -> PathBuf {
    let now = Utc::now();
    let mut sequence = 0;
    loop {
        let path = backup_dir.join(kind.file_name(now, sequence));
        if !path.exists() {
            return path;
        }
        sequence += 1;
    }
}
