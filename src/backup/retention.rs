//! Retention policy enforcement
//!
//! Scheduled and periodic backups are capped; every other kind is kept until
//! the user deletes it.

use std::fs;
use std::path::{Path, PathBuf};

use super::kind::BackupKind;
use super::record::scan_backup_dir;
use crate::config::settings::BackupRetention;

/// Deletes capped backups beyond their retention count
pub struct RetentionManager {
    backup_dir: PathBuf,
    retention: BackupRetention,
}

impl RetentionManager {
    pub fn new(backup_dir: impl Into<PathBuf>, retention: BackupRetention) -> Self {
        Self {
            backup_dir: backup_dir.into(),
            retention,
        }
    }

    /// Backups `prune` would delete, oldest last
    pub fn candidates(&self) -> Vec<PathBuf> {
        let files = match scan_backup_dir(&self.backup_dir) {
            Ok(files) => files,
            Err(e) => {
                log::warn!("Retention skipped, cannot list backups: {}", e);
                return Vec::new();
            }
        };

        let mut doomed = Vec::new();
        for kind in BackupKind::ALL {
            let Some(cap) = kind.retention_cap(&self.retention) else {
                continue;
            };
            // scan order is newest first
            doomed.extend(
                files
                    .iter()
                    .filter(|f| f.name.kind == kind)
                    .skip(cap)
                    .map(|f| f.path.clone()),
            );
        }
        doomed
    }

    /// Delete every capped backup beyond its cap.
    ///
    /// Returns the deleted paths. Files that cannot be deleted are logged and
    /// skipped.
    pub fn prune(&self) -> Vec<PathBuf> {
        let mut deleted = Vec::new();
        for path in self.candidates() {
            match fs::remove_file(&path) {
                Ok(()) => {
                    log::debug!("Pruned old backup {}", display_name(&path));
                    deleted.push(path);
                }
                Err(e) => log::warn!("Failed to delete old backup {}: {}", path.display(), e),
            }
        }
        if !deleted.is_empty() {
            log::info!("Pruned {} old backup(s)", deleted.len());
        }
        deleted
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use std::time::SystemTime;
    use tempfile::TempDir;

    fn touch(dir: &Path, kind: BackupKind, minutes: i64) -> PathBuf {
        let ts = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap() + Duration::minutes(minutes);
        let path = dir.join(kind.file_name(ts, 0));
        fs::write(&path, b"").unwrap();
        let mtime = SystemTime::UNIX_EPOCH + std::time::Duration::from_secs(ts.timestamp() as u64);
        fs::File::options()
            .write(true)
            .open(&path)
            .unwrap()
            .set_modified(mtime)
            .unwrap();
        path
    }

    fn retention() -> BackupRetention {
        BackupRetention {
            scheduled_count: 3,
            periodic_count: 2,
        }
    }

    #[test]
    fn test_prunes_each_capped_kind_to_its_cap() {
        let temp = TempDir::new().unwrap();
        for i in 0..5 {
            touch(temp.path(), BackupKind::Scheduled, i);
            touch(temp.path(), BackupKind::Periodic, i);
        }
        let manual = touch(temp.path(), BackupKind::Manual, 0);
        let emergency = touch(temp.path(), BackupKind::Emergency, 0);
        let pre = touch(temp.path(), BackupKind::PreMigration, 0);

        let deleted = RetentionManager::new(temp.path(), retention()).prune();

        assert_eq!(deleted.len(), 2 + 3);
        let files = scan_backup_dir(temp.path()).unwrap();
        let count = |kind| files.iter().filter(|f| f.name.kind == kind).count();
        assert_eq!(count(BackupKind::Scheduled), 3);
        assert_eq!(count(BackupKind::Periodic), 2);
        assert!(manual.exists() && emergency.exists() && pre.exists());
    }

    #[test]
    fn test_keeps_newest() {
        let temp = TempDir::new().unwrap();
        let paths: Vec<_> = (0..4)
            .map(|i| touch(temp.path(), BackupKind::Periodic, i))
            .collect();

        let deleted = RetentionManager::new(temp.path(), retention()).prune();

        let mut deleted_sorted = deleted.clone();
        deleted_sorted.sort();
        assert_eq!(deleted_sorted, paths[..2].to_vec());
        assert!(paths[2..].iter().all(|p| p.exists()));
    }

    #[test]
    fn test_missing_dir_is_a_no_op() {
        let temp = TempDir::new().unwrap();
        let manager = RetentionManager::new(temp.path().join("absent"), retention());
        assert!(manager.prune().is_empty());
    }
}
