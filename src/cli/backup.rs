//! Backup CLI commands
//!
//! Implements CLI commands for backup management.

use clap::Subcommand;
use std::path::PathBuf;

use crate::backup::{
    validate_backup, BackupKind, BackupManager, BackupRecord, Locator, RestoreOutcome,
};
use crate::error::{HoursError, HoursResult};
use crate::storage::DomainReader;

/// Backup subcommands
#[derive(Subcommand)]
pub enum BackupCommands {
    /// Create a new backup
    Create {
        /// Backup kind (manual, scheduled, periodic, emergency)
        #[arg(short, long, default_value = "manual")]
        kind: String,
    },

    /// List all available backups
    List {
        /// Show detailed information
        #[arg(short, long)]
        verbose: bool,
    },

    /// Show information about a specific backup
    Info {
        /// Backup filename or path (use 'latest' for most recent)
        backup: String,
    },

    /// Check whether a backup can be restored
    Validate {
        /// Backup filename or path (use 'latest' for most recent)
        backup: String,
    },

    /// Restore from a backup
    Restore {
        /// Backup filename or path (use 'latest' for most recent)
        backup: String,

        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,
    },

    /// Delete old backups according to retention policy
    Prune {
        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,
    },

    /// Delete a single backup
    Delete {
        /// Backup filename
        backup: String,
    },

    /// Delete every backup
    Clear {
        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,
    },

    /// Copy a backup to a file, directory or file:// URI
    Export {
        /// Backup filename or path (use 'latest' for most recent)
        backup: String,
        /// Destination
        destination: String,
    },

    /// Copy an external snapshot into the backup directory
    Import {
        /// Source file or file:// URI
        source: String,
    },

    /// Create the automatic backups that are due
    Auto,
}

/// Handle a backup command
pub fn handle_backup_command(manager: &BackupManager, cmd: BackupCommands) -> HoursResult<()> {
    match cmd {
        BackupCommands::Create { kind } => {
            let kind: BackupKind = kind.parse()?;
            if kind == BackupKind::PreMigration {
                return Err(HoursError::Validation(
                    "Pre-migration backups are created automatically".into(),
                ));
            }
            println!("Creating backup...");
            let record = manager.create_backup(kind)?;
            println!("Backup created: {}", record.file_name);
            println!("Location: {}", record.path.display());
            println!(
                "Contents: {} project(s), {} time entries",
                record.stats.project_count, record.stats.entry_count
            );
        }

        BackupCommands::List { verbose } => {
            let backups = manager.list_backups()?;

            if backups.is_empty() {
                println!("No backups found.");
                println!("Create one with: hours backup create");
                return Ok(());
            }

            println!("Available Backups");
            println!("=================");
            println!();

            for (i, backup) in backups.iter().enumerate() {
                let age = chrono::Utc::now().signed_duration_since(backup.created_at);
                let age_str = format_duration(age);

                if verbose {
                    println!(
                        "{}. {} [{}]\n   Created: {}\n   Size: {}\n   Age: {}\n   Projects: {}\n   Entries: {}\n",
                        i + 1,
                        backup.file_name,
                        backup.kind,
                        backup.created_at.format("%Y-%m-%d %H:%M:%S UTC"),
                        format_size(backup.size_bytes),
                        age_str,
                        backup.stats.project_count,
                        backup.stats.entry_count,
                    );
                } else {
                    println!(
                        "  {}. {} ({} ago, {}) [{}]",
                        i + 1,
                        backup.file_name,
                        age_str,
                        format_size(backup.size_bytes),
                        backup.kind,
                    );
                }
            }

            println!();
            println!(
                "Total: {} backup(s), {}",
                backups.len(),
                format_size(manager.total_backup_size()?)
            );
        }

        BackupCommands::Info { backup } => {
            let record = resolve_backup(manager, &backup)?;
            let validation = manager.validate(&record.path);

            println!("Backup Details");
            println!("==============");
            println!("File: {}", record.path.display());
            println!("Kind: {}", record.kind);
            println!("Size: {}", format_size(record.size_bytes));
            println!(
                "Created: {}",
                record.created_at.format("%Y-%m-%d %H:%M:%S UTC")
            );
            println!("Schema version: {}", validation.backup_version);
            println!();
            println!("Contents:");
            println!("  Projects:     {}", record.stats.project_count);
            println!("  Time entries: {}", record.stats.entry_count);
            if let Some(last) = record.stats.last_entry_at {
                println!("  Last entry:   {}", last.format("%Y-%m-%d %H:%M UTC"));
            }
            println!();
            println!(
                "Status: {}",
                if validation.usable { "Restorable" } else { "Unusable" }
            );
        }

        BackupCommands::Validate { backup } => {
            let path = resolve_backup_path(manager, &backup)?;
            let validation = manager.validate(&path);
            println!("{}", validation.summary());
            if !validation.usable {
                return Err(HoursError::Validation(validation.message));
            }
        }

        BackupCommands::Restore { backup, force } => {
            let path = resolve_backup_path(manager, &backup)?;
            let validation = validate_backup(&path);

            println!("Backup Information");
            println!("==================");
            println!("File: {}", path.display());
            println!("Schema version: {}", validation.backup_version);
            println!("Status: {}", validation.message);
            println!();

            if !validation.usable {
                return Err(HoursError::Validation(validation.message));
            }

            if !force {
                println!("WARNING: This will overwrite ALL current data!");
                println!("To proceed, run again with --force flag:");
                println!("  hours backup restore {} --force", backup);
                return Ok(());
            }

            println!("Creating backup of current data before restore...");
            let safety = manager.create_backup(BackupKind::Emergency)?;
            println!("Pre-restore backup saved: {}", safety.file_name);
            println!();

            println!("Restoring from backup...");
            match manager.restore_from_path(&path) {
                RestoreOutcome::Success => {
                    println!("Restore complete!");
                    let (projects, entries) = manager.with_live(|live| {
                        let repo = live.repository()?;
                        Ok((repo.get_all_projects()?.len(), repo.get_entry_count()?))
                    })?;
                    println!("Restored: {} project(s), {} time entries", projects, entries);
                }
                RestoreOutcome::Failed(message) => return Err(HoursError::Restore(message)),
            }
        }

        BackupCommands::Prune { force } => {
            let retention = &manager.settings().backup_retention;
            let candidates = manager.prune_candidates();

            if candidates.is_empty() {
                println!("No backups to prune.");
                println!(
                    "Current retention policy: {} scheduled, {} periodic",
                    retention.scheduled_count, retention.periodic_count
                );
                return Ok(());
            }

            println!("Prune Summary");
            println!("=============");
            println!(
                "Retention policy: {} scheduled, {} periodic",
                retention.scheduled_count, retention.periodic_count
            );
            println!("To be deleted: {} backup(s)", candidates.len());
            for path in &candidates {
                if let Some(name) = path.file_name() {
                    println!("  {}", name.to_string_lossy());
                }
            }
            println!();

            if !force {
                println!("To delete old backups, run again with --force flag:");
                println!("  hours backup prune --force");
                return Ok(());
            }

            let deleted = manager.prune();
            println!("Deleted {} backup(s).", deleted.len());
        }

        BackupCommands::Delete { backup } => {
            manager.delete_backup(&backup)?;
            println!("Deleted backup: {}", backup);
        }

        BackupCommands::Clear { force } => {
            let count = manager.list_backups()?.len();
            if !force {
                println!("This will delete all {} backup(s).", count);
                println!("To proceed, run again with --force flag:");
                println!("  hours backup clear --force");
                return Ok(());
            }
            let removed = manager.delete_all_backups()?;
            println!("Deleted {} backup(s).", removed);
        }

        BackupCommands::Export {
            backup,
            destination,
        } => {
            let record = resolve_backup(manager, &backup)?;
            let destination: Locator = destination.parse()?;
            let written = manager.export_backup(&record, &destination)?;
            println!("Exported {} to {}", record.file_name, written.display());
        }

        BackupCommands::Import { source } => {
            let source: Locator = source.parse()?;
            let record = manager.import_backup(&source)?;
            println!("Imported as: {}", record.file_name);
            println!(
                "Contents: {} project(s), {} time entries",
                record.stats.project_count, record.stats.entry_count
            );
        }

        BackupCommands::Auto => {
            let created = manager.check_and_create_backup_if_needed()?;
            if created.is_empty() {
                println!("No backup needed.");
            }
            for record in created {
                println!("Created {} backup: {}", record.kind, record.file_name);
            }
        }
    }

    Ok(())
}

/// Resolve a backup identifier to a record in the backup directory or on disk
fn resolve_backup(manager: &BackupManager, backup: &str) -> HoursResult<BackupRecord> {
    let path = resolve_backup_path(manager, backup)?;
    BackupRecord::from_path(&path)
}

/// Resolve a backup identifier to a full path
fn resolve_backup_path(manager: &BackupManager, backup: &str) -> HoursResult<PathBuf> {
    // Handle "latest" keyword
    if backup.eq_ignore_ascii_case("latest") {
        return manager
            .latest_backup()?
            .map(|b| b.path)
            .ok_or_else(|| HoursError::backup_not_found("latest"));
    }

    // Check if it's a full path
    let path = PathBuf::from(backup);
    if path.is_file() {
        return Ok(path);
    }

    // Check if it's a filename in the backup directory
    let backup_path = manager.backup_dir().join(backup);
    if backup_path.is_file() {
        return Ok(backup_path);
    }

    let with_ext = manager.backup_dir().join(format!("{}.db", backup));
    if with_ext.is_file() {
        return Ok(with_ext);
    }

    Err(HoursError::backup_not_found(backup))
}

/// Format a duration in human-readable form
fn format_duration(duration: chrono::Duration) -> String {
    let total_seconds = duration.num_seconds().max(0);

    if total_seconds < 60 {
        return format!("{}s", total_seconds);
    }

    let minutes = total_seconds / 60;
    if minutes < 60 {
        return format!("{}m", minutes);
    }

    let hours = minutes / 60;
    if hours < 24 {
        return format!("{}h", hours);
    }

    let days = hours / 24;
    if days < 30 {
        return format!("{}d", days);
    }

    let months = days / 30;
    format!("{}mo", months)
}

/// Format a file size in human-readable form
fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(chrono::Duration::seconds(42)), "42s");
        assert_eq!(format_duration(chrono::Duration::minutes(5)), "5m");
        assert_eq!(format_duration(chrono::Duration::hours(3)), "3h");
        assert_eq!(format_duration(chrono::Duration::days(2)), "2d");
        assert_eq!(format_duration(chrono::Duration::days(65)), "2mo");
        assert_eq!(format_duration(chrono::Duration::seconds(-5)), "0s");
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(2048), "2.0 KB");
        assert_eq!(format_size(5 * 1024 * 1024), "5.0 MB");
    }
}
