//! Backup metadata
//!
//! A `BackupRecord` describes one snapshot file in the backup directory. Its
//! category and timestamp come from the file name; its statistics are read
//! from the file every time a record is built.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::kind::{parse_backup_file_name, BackupKind, BackupName};
use super::reader::read_stats;
use crate::error::{HoursError, HoursResult};

/// Row counts of a snapshot
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupStats {
    pub project_count: u64,
    pub entry_count: u64,
    /// Start time of the most recent time entry
    pub last_entry_at: Option<DateTime<Utc>>,
}

impl BackupStats {
    /// No rows found, or the file could not be read
    pub fn is_empty(&self) -> bool {
        self.project_count == 0 && self.entry_count == 0
    }
}

/// Metadata about a backup
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupRecord {
    /// Backup filename
    pub file_name: String,
    /// Full path to backup
    pub path: PathBuf,
    /// When the backup was created
    pub created_at: DateTime<Utc>,
    /// What triggered the backup
    pub kind: BackupKind,
    /// Size in bytes
    pub size_bytes: u64,
    pub stats: BackupStats,
}

impl BackupRecord {
    /// Build a record for a file on disk
    pub fn from_path(path: &Path) -> HoursResult<Self> {
        let file = BackupFile::inspect(path)?.ok_or_else(|| {
            HoursError::Validation(format!("Not a backup file: {}", path.display()))
        })?;
        Ok(Self::from_file(file))
    }

    pub(crate) fn from_file(file: BackupFile) -> Self {
        let stats = read_stats(&file.path);
        Self {
            created_at: file.created_at(),
            kind: file.name.kind,
            size_bytes: file.size_bytes,
            file_name: file.file_name,
            path: file.path,
            stats,
        }
    }
}

/// A snapshot file found in the backup directory, before its stats are read
#[derive(Debug, Clone)]
pub(crate) struct BackupFile {
    pub file_name: String,
    pub path: PathBuf,
    pub name: BackupName,
    pub modified: SystemTime,
    pub size_bytes: u64,
}

impl BackupFile {
    /// Inspect one path; `None` when it is not a snapshot file
    pub fn inspect(path: &Path) -> HoursResult<Option<Self>> {
        let Some(file_name) = path.file_name().map(|n| n.to_string_lossy().to_string()) else {
            return Ok(None);
        };
        let Some(name) = parse_backup_file_name(&file_name) else {
            return Ok(None);
        };

        let metadata = fs::metadata(path)
            .map_err(|e| HoursError::Io(format!("Failed to read {}: {}", path.display(), e)))?;
        if !metadata.is_file() {
            return Ok(None);
        }

        Ok(Some(Self {
            file_name,
            path: path.to_path_buf(),
            name,
            modified: metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH),
            size_bytes: metadata.len(),
        }))
    }

    /// Timestamp from the name, falling back to the modification time
    pub fn created_at(&self) -> DateTime<Utc> {
        self.name
            .created_at
            .unwrap_or_else(|| DateTime::<Utc>::from(self.modified))
    }

    /// Ordering key, larger is newer
    fn recency(&self) -> (SystemTime, DateTime<Utc>, u32) {
        (self.modified, self.created_at(), self.name.sequence)
    }
}

/// All snapshot files in `dir`, newest first
pub(crate) fn scan_backup_dir(dir: &Path) -> HoursResult<Vec<BackupFile>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let mut files = Vec::new();
    for entry in fs::read_dir(dir)
        .map_err(|e| HoursError::Io(format!("Failed to read backup directory: {}", e)))?
    {
        let entry =
            entry.map_err(|e| HoursError::Io(format!("Failed to read directory entry: {}", e)))?;
        if let Some(file) = BackupFile::inspect(&entry.path())? {
            files.push(file);
        }
    }

    files.sort_by(|a, b| b.recency().cmp(&a.recency()));
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    #[test]
    fn test_scan_ignores_foreign_files() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("notes.txt"), b"hello").unwrap();
        fs::write(temp.path().join("manual_20250101_000000.db.partial"), b"").unwrap();
        fs::create_dir(temp.path().join("periodic_20250101_000000.db")).unwrap();
        fs::write(temp.path().join("manual_20250101_000000.db"), b"").unwrap();

        let files = scan_backup_dir(temp.path()).unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].name.kind, BackupKind::Manual);
    }

    #[test]
    fn test_scan_missing_dir_is_empty() {
        let temp = TempDir::new().unwrap();
        assert!(scan_backup_dir(&temp.path().join("nope")).unwrap().is_empty());
    }

    #[test]
    fn test_same_second_backups_order_by_sequence() {
        let temp = TempDir::new().unwrap();
        let ts = Utc.with_ymd_and_hms(2025, 6, 1, 10, 0, 0).unwrap();
        for seq in 0..3 {
            fs::write(temp.path().join(BackupKind::Scheduled.file_name(ts, seq)), b"").unwrap();
        }

        let files = scan_backup_dir(temp.path()).unwrap();
        let sequences: Vec<u32> = files
            .iter()
            .filter(|f| f.modified == files[0].modified)
            .map(|f| f.name.sequence)
            .collect();
        let mut sorted = sequences.clone();
        sorted.sort_by(|a, b| b.cmp(a));
        assert_eq!(sequences, sorted);
    }

    #[test]
    fn test_record_of_empty_file_has_zero_stats() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("manual_20250102_030405.db");
        fs::write(&path, b"").unwrap();

        let record = BackupRecord::from_path(&path).unwrap();
        assert_eq!(record.kind, BackupKind::Manual);
        assert_eq!(record.size_bytes, 0);
        assert!(record.stats.is_empty());
        assert_eq!(
            record.created_at,
            Utc.with_ymd_and_hms(2025, 1, 2, 3, 4, 5).unwrap()
        );
    }
}
