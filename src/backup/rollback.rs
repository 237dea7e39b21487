//! Rollback points
//!
//! A rollback point is a copy of the live database file and its side files,
//! taken before a restore deletes anything.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::Utc;

use crate::error::{HoursError, HoursResult};
use crate::storage::file_io::remove_database_files;
use crate::storage::side_files;

/// Copy of the live files taken before a destructive operation
#[derive(Debug)]
pub struct RollbackPoint {
    dir: PathBuf,
    primary: PathBuf,
    /// (copy, original location) of the side files that existed
    side_copies: Vec<(PathBuf, PathBuf)>,
}

impl RollbackPoint {
    /// Copy `live_path` and any side files into a fresh directory under `work_dir`
    pub fn create(live_path: &Path, work_dir: &Path) -> HoursResult<Self> {
        let dir = work_dir.join(format!("rollback_{}", Utc::now().timestamp_millis()));
        fs::create_dir_all(&dir).map_err(|e| {
            HoursError::Restore(format!(
                "Cannot create rollback directory {}: {}",
                dir.display(),
                e
            ))
        })?;

        let point = Self {
            primary: dir.join("primary.db"),
            dir,
            side_copies: Vec::new(),
        };
        match point.fill(live_path) {
            Ok(point) => Ok(point),
            Err((point, e)) => {
                if let Err(cleanup) = point.cleanup() {
                    log::warn!(
                        "Failed to remove incomplete rollback point {}: {}",
                        point.dir.display(),
                        cleanup
                    );
                }
                Err(e)
            }
        }
    }

    fn fill(mut self, live_path: &Path) -> Result<Self, (Self, HoursError)> {
        if let Err(e) = fs::copy(live_path, &self.primary) {
            let err = HoursError::Restore(format!(
                "Cannot copy {}: {}",
                live_path.display(),
                e
            ));
            return Err((self, err));
        }

        for side in side_files(live_path) {
            if !side.exists() {
                continue;
            }
            let suffix = side
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();
            let copy = self.dir.join(suffix);
            if let Err(e) = fs::copy(&side, &copy) {
                let err =
                    HoursError::Restore(format!("Cannot copy {}: {}", side.display(), e));
                return Err((self, err));
            }
            self.side_copies.push((copy, side));
        }

        Ok(self)
    }

    /// Directory holding the copies
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Put the saved files back at `live_path`, replacing whatever is there
    pub fn restore_into(&self, live_path: &Path) -> HoursResult<()> {
        remove_database_files(live_path).map_err(|e| {
            HoursError::Restore(format!("Cannot clear {}: {}", live_path.display(), e))
        })?;
        fs::copy(&self.primary, live_path).map_err(|e| {
            HoursError::Restore(format!("Cannot restore {}: {}", live_path.display(), e))
        })?;
        for (copy, original) in &self.side_copies {
            fs::copy(copy, original).map_err(|e| {
                HoursError::Restore(format!("Cannot restore {}: {}", original.display(), e))
            })?;
        }
        Ok(())
    }

    /// Delete the copies. Safe to call any number of times.
    pub fn cleanup(&self) -> io::Result<()> {
        match fs::remove_dir_all(&self.dir) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }
}
