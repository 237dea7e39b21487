//! Path management for hours-vault
//!
//! Provides XDG-compliant path resolution for the live database, backups and
//! the scratch area used by migrations and restores.
//!
//! ## Path Resolution Order
//!
//! 1. `HOURS_VAULT_DIR` environment variable (if set)
//! 2. Unix (Linux/macOS): `$XDG_DATA_HOME/hours-vault` or `~/.local/share/hours-vault`
//! 3. Windows: `%APPDATA%\hours-vault`

use std::path::PathBuf;

use crate::error::HoursError;

/// Name of the live database file inside the data directory
pub const DATABASE_FILE_NAME: &str = "hours.db";

/// Manages all paths used by hours-vault
#[derive(Debug, Clone)]
pub struct HoursPaths {
    /// Base directory for all hours-vault data
    base_dir: PathBuf,
}

impl HoursPaths {
    /// Create a new HoursPaths instance
    ///
    /// # Errors
    ///
    /// Returns an error if the home directory cannot be determined.
    pub fn new() -> Result<Self, HoursError> {
        let base_dir = if let Ok(custom) = std::env::var("HOURS_VAULT_DIR") {
            PathBuf::from(custom)
        } else {
            resolve_default_path()?
        };

        Ok(Self { base_dir })
    }

    /// Create HoursPaths with a custom base directory (useful for testing)
    pub fn with_base_dir(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    /// Get the base directory
    pub fn base_dir(&self) -> &PathBuf {
        &self.base_dir
    }

    /// Get the data directory holding the live database
    pub fn data_dir(&self) -> PathBuf {
        self.base_dir.join("data")
    }

    /// Get the backup directory
    pub fn backup_dir(&self) -> PathBuf {
        self.base_dir.join("backups")
    }

    /// Scratch directory for migration copies and rollback points
    pub fn work_dir(&self) -> PathBuf {
        self.base_dir.join("work")
    }

    /// Get the path to the live database file
    pub fn database_file(&self) -> PathBuf {
        self.data_dir().join(DATABASE_FILE_NAME)
    }

    /// Get the path to the settings file
    pub fn settings_file(&self) -> PathBuf {
        self.base_dir.join("config.json")
    }

    /// Get the path to the automatic-backup bookkeeping file
    pub fn backup_state_file(&self) -> PathBuf {
        self.base_dir.join("backup_state.json")
    }

    /// Ensure all required directories exist
    pub fn ensure_directories(&self) -> Result<(), HoursError> {
        for (dir, label) in [
            (self.base_dir.clone(), "base"),
            (self.data_dir(), "data"),
            (self.backup_dir(), "backup"),
            (self.work_dir(), "work"),
        ] {
            std::fs::create_dir_all(&dir).map_err(|e| {
                HoursError::Io(format!("Failed to create {} directory: {}", label, e))
            })?;
        }
        Ok(())
    }

    /// Check if hours-vault has been initialized (config file exists)
    pub fn is_initialized(&self) -> bool {
        self.settings_file().exists()
    }
}

/// Resolve the default data directory path based on platform
#[cfg(not(windows))]
fn resolve_default_path() -> Result<PathBuf, HoursError> {
    if let Ok(xdg) = std::env::var("XDG_DATA_HOME") {
        return Ok(PathBuf::from(xdg).join("hours-vault"));
    }
    let home = std::env::var("HOME")
        .map_err(|_| HoursError::Config("HOME environment variable not set".into()))?;
    Ok(PathBuf::from(home)
        .join(".local")
        .join("share")
        .join("hours-vault"))
}

/// Resolve the default data directory path based on platform
#[cfg(windows)]
fn resolve_default_path() -> Result<PathBuf, HoursError> {
    let appdata = std::env::var("APPDATA")
        .map_err(|_| HoursError::Config("Could not determine APPDATA directory".into()))?;
    Ok(PathBuf::from(appdata).join("hours-vault"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_custom_base_dir() {
        let temp_dir = TempDir::new().unwrap();
        let paths = HoursPaths::with_base_dir(temp_dir.path().to_path_buf());

        assert_eq!(paths.base_dir(), temp_dir.path());
        assert_eq!(paths.data_dir(), temp_dir.path().join("data"));
        assert_eq!(paths.backup_dir(), temp_dir.path().join("backups"));
        assert_eq!(
            paths.database_file(),
            temp_dir.path().join("data").join("hours.db")
        );
    }

    #[test]
    fn test_ensure_directories() {
        let temp_dir = TempDir::new().unwrap();
        let paths = HoursPaths::with_base_dir(temp_dir.path().join("nested"));

        paths.ensure_directories().unwrap();

        assert!(paths.data_dir().exists());
        assert!(paths.backup_dir().exists());
        assert!(paths.work_dir().exists());
        assert!(!paths.is_initialized());
    }
}
