//! CLI command handlers
//!
//! This module contains the implementation of CLI commands,
//! bridging the clap argument parsing with the backup engine.

pub mod backup;
pub mod project;

pub use backup::{handle_backup_command, BackupCommands};
pub use project::{handle_entry_command, handle_project_command, EntryCommands, ProjectCommands};
