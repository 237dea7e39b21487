//! User settings for hours-vault
//!
//! Manages backup preferences: retention caps per backup category, automatic
//! backup triggers and the automatic export destination.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::paths::HoursPaths;
use crate::error::HoursError;

/// Backup retention settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupRetention {
    /// Number of scheduled (daily) backups to keep
    pub scheduled_count: u32,
    /// Number of periodic (monthly) backups to keep
    pub periodic_count: u32,
}

impl Default for BackupRetention {
    fn default() -> Self {
        Self {
            scheduled_count: 7,
            periodic_count: 6,
        }
    }
}

/// Automatic copy of every new backup to an external directory
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AutoExportSettings {
    #[serde(default)]
    pub enabled: bool,

    /// Destination directory; auto-export is skipped while this is unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub directory: Option<PathBuf>,
}

/// User settings for hours-vault
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Backup retention policy
    #[serde(default)]
    pub backup_retention: BackupRetention,

    /// Whether `backup auto` may create scheduled backups
    #[serde(default = "default_true")]
    pub auto_backup_enabled: bool,

    /// Entry growth since the last backup that triggers a scheduled backup
    #[serde(default = "default_entry_threshold")]
    pub auto_backup_entry_threshold: u64,

    /// External export of new backups
    #[serde(default)]
    pub auto_export: AutoExportSettings,
}

fn default_true() -> bool {
    true
}

fn default_entry_threshold() -> u64 {
    50
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            backup_retention: BackupRetention::default(),
            auto_backup_enabled: true,
            auto_backup_entry_threshold: default_entry_threshold(),
            auto_export: AutoExportSettings::default(),
        }
    }
}

impl Settings {
    /// Load settings from disk, or create default settings if file doesn't exist
    pub fn load_or_create(paths: &HoursPaths) -> Result<Self, HoursError> {
        let settings_path = paths.settings_file();

        if settings_path.exists() {
            let contents = std::fs::read_to_string(&settings_path)
                .map_err(|e| HoursError::Io(format!("Failed to read settings file: {}", e)))?;

            let settings: Settings = serde_json::from_str(&contents)
                .map_err(|e| HoursError::Config(format!("Failed to parse settings file: {}", e)))?;

            Ok(settings)
        } else {
            // Don't save yet - let caller decide when to persist
            Ok(Settings::default())
        }
    }

    /// Save settings to disk
    pub fn save(&self, paths: &HoursPaths) -> Result<(), HoursError> {
        paths.ensure_directories()?;

        let contents = serde_json::to_string_pretty(self)
            .map_err(|e| HoursError::Config(format!("Failed to serialize settings: {}", e)))?;

        std::fs::write(paths.settings_file(), contents)
            .map_err(|e| HoursError::Io(format!("Failed to write settings file: {}", e)))?;

        Ok(())
    }

    /// Directory new backups are exported to, if auto-export is active
    pub fn auto_export_dir(&self) -> Option<&PathBuf> {
        if self.auto_export.enabled {
            self.auto_export.directory.as_ref()
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.backup_retention.scheduled_count, 7);
        assert_eq!(settings.backup_retention.periodic_count, 6);
        assert!(settings.auto_backup_enabled);
        assert_eq!(settings.auto_backup_entry_threshold, 50);
        assert!(settings.auto_export_dir().is_none());
    }

    #[test]
    fn test_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let paths = HoursPaths::with_base_dir(temp_dir.path().to_path_buf());

        let mut settings = Settings::default();
        settings.backup_retention.periodic_count = 2;
        settings.auto_export = AutoExportSettings {
            enabled: true,
            directory: Some(temp_dir.path().join("exports")),
        };
        settings.save(&paths).unwrap();

        let loaded = Settings::load_or_create(&paths).unwrap();
        assert_eq!(loaded.backup_retention.periodic_count, 2);
        assert_eq!(
            loaded.auto_export_dir(),
            Some(&temp_dir.path().join("exports"))
        );
    }

    #[test]
    fn test_missing_fields_use_defaults() {
        let settings: Settings = serde_json::from_str("{}").unwrap();
        assert!(settings.auto_backup_enabled);
        assert_eq!(settings.backup_retention.scheduled_count, 7);
    }

    #[test]
    fn test_obsolete_fields_are_ignored() {
        let settings: Settings =
            serde_json::from_str(r#"{ "schema_version": 1, "auto_backup_enabled": false }"#)
                .unwrap();
        assert!(!settings.auto_backup_enabled);

        let saved = serde_json::to_string(&settings).unwrap();
        assert!(!saved.contains("schema_version"));
    }
}
