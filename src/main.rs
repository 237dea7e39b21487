use anyhow::Result;
use clap::{Parser, Subcommand};

use hours_vault::backup::BackupManager;
use hours_vault::cli::{
    handle_backup_command, handle_entry_command, handle_project_command, BackupCommands,
    EntryCommands, ProjectCommands,
};
use hours_vault::config::{HoursPaths, Settings};
use hours_vault::storage::CURRENT_SCHEMA_VERSION;

#[derive(Parser)]
#[command(
    name = "hours",
    author = "Luis Ico",
    version,
    about = "Backup and restore for the hours time-tracking database",
    long_about = "hours keeps point-in-time snapshots of your time-tracking data. \
                  Old snapshots are upgraded to the current schema on restore, and \
                  a failed restore is rolled back to the data you had before."
)]
struct Cli {
    /// Log progress to stderr (RUST_LOG overrides)
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Project management commands
    #[command(subcommand)]
    Project(ProjectCommands),

    /// Time entry commands
    #[command(subcommand)]
    Entry(EntryCommands),

    /// Backup management commands
    #[command(subcommand)]
    Backup(BackupCommands),

    /// Initialize the data directory
    Init,

    /// Show current configuration and paths
    Config,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.debug { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp(None)
        .init();

    let paths = HoursPaths::new()?;
    let settings = Settings::load_or_create(&paths)?;

    match cli.command {
        Some(Commands::Init) => {
            println!("Initializing hours-vault at: {}", paths.base_dir().display());
            settings.save(&paths)?;
            BackupManager::open(paths.clone(), settings)?;
            println!("Initialization complete!");
            println!();
            println!("Database:  {}", paths.database_file().display());
            println!("Backups:   {}", paths.backup_dir().display());
            println!();
            println!("Run 'hours project add <name>' to create your first project.");
        }
        Some(Commands::Config) => {
            println!("hours-vault Configuration");
            println!("=========================");
            println!("Base directory:   {}", paths.base_dir().display());
            println!("Database:         {}", paths.database_file().display());
            println!("Backup directory: {}", paths.backup_dir().display());
            println!("Work directory:   {}", paths.work_dir().display());
            println!("Schema version:   {}", CURRENT_SCHEMA_VERSION);
            println!();
            println!("Settings:");
            println!(
                "  Retention:        {} scheduled, {} periodic",
                settings.backup_retention.scheduled_count,
                settings.backup_retention.periodic_count
            );
            println!("  Auto backup:      {}", settings.auto_backup_enabled);
            println!(
                "  Entry threshold:  {}",
                settings.auto_backup_entry_threshold
            );
            match settings.auto_export_dir() {
                Some(dir) => println!("  Auto export:      {}", dir.display()),
                None => println!("  Auto export:      off"),
            }
        }
        Some(Commands::Project(cmd)) => {
            let manager = BackupManager::open(paths, settings)?;
            handle_project_command(&manager, cmd)?;
            auto_backup(&manager);
        }
        Some(Commands::Entry(cmd)) => {
            let manager = BackupManager::open(paths, settings)?;
            handle_entry_command(&manager, cmd)?;
            auto_backup(&manager);
        }
        Some(Commands::Backup(cmd)) => {
            let manager = BackupManager::open(paths, settings)?;
            if let Err(e) = manager.clean_work_dir() {
                log::warn!("Failed to clean work directory: {}", e);
            }
            handle_backup_command(&manager, cmd)?;
        }
        None => {
            println!("hours - time-tracking data with backups you can trust");
            println!();
            println!("Run 'hours --help' for usage information.");
        }
    }

    Ok(())
}

/// Automatic backups never fail the command that triggered them
fn auto_backup(manager: &BackupManager) {
    match manager.check_and_create_backup_if_needed() {
        Ok(created) => {
            for record in created {
                log::info!("Automatic {} backup: {}", record.kind, record.file_name);
            }
        }
        Err(e) => log::warn!("Automatic backup failed: {}", e),
    }
}
