//! Project and time entry CLI commands
//!
//! Just enough data entry to have something worth backing up.

use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use clap::Subcommand;

use crate::backup::BackupManager;
use crate::error::{HoursError, HoursResult};
use crate::models::{PeriodMode, Project, ProjectId, TimeEntry};
use crate::storage::TimeTrackingRepository;

/// Project subcommands
#[derive(Subcommand)]
pub enum ProjectCommands {
    /// Create a new project
    Add {
        /// Project name
        name: String,
        /// How periods are closed (monthly, manual)
        #[arg(short, long, default_value = "monthly")]
        period_mode: String,
    },
    /// List all projects
    List,
    /// Delete a project with all its time entries
    Delete {
        /// Project name or ID
        project: String,
    },
}

/// Time entry subcommands
#[derive(Subcommand)]
pub enum EntryCommands {
    /// Record a completed time entry
    Add {
        /// Project name or ID
        project: String,
        /// Length in minutes
        minutes: i64,
        /// Label
        #[arg(short, long)]
        name: Option<String>,
        /// Start time (YYYY-MM-DD HH:MM, UTC); defaults to `minutes` ago
        #[arg(short, long)]
        start: Option<String>,
    },
    /// List time entries
    List {
        /// Filter by project
        #[arg(short, long)]
        project: Option<String>,
        /// Number of entries to show
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },
}

/// Handle a project command
pub fn handle_project_command(manager: &BackupManager, cmd: ProjectCommands) -> HoursResult<()> {
    manager.with_live(|live| {
        let repo = live.repository()?;
        match cmd {
            ProjectCommands::Add { name, period_mode } => {
                let mut project = Project::new(name);
                project.period_mode = period_mode.parse()?;
                project.validate()?;
                let id = repo.insert_project(&project)?;
                println!("Created project: {} ({})", project.name, id);
            }

            ProjectCommands::List => {
                let projects = repo.get_all_projects()?;
                if projects.is_empty() {
                    println!("No projects found.");
                    println!("Create one with: hours project add <name>");
                    return Ok(());
                }
                for project in &projects {
                    let entries = repo.get_entries_for_project(project.id)?.len();
                    println!(
                        "  {:<8} {:<30} {:<8} {} entries",
                        project.id.to_string(),
                        project.name,
                        project.period_mode,
                        entries
                    );
                }
            }

            ProjectCommands::Delete { project } => {
                let found = find_project(&repo, &project)?;
                repo.delete_project(found.id)?;
                println!("Deleted project: {}", found.name);
            }
        }
        Ok(())
    })
}

/// Handle a time entry command
pub fn handle_entry_command(manager: &BackupManager, cmd: EntryCommands) -> HoursResult<()> {
    manager.with_live(|live| {
        let repo = live.repository()?;
        match cmd {
            EntryCommands::Add {
                project,
                minutes,
                name,
                start,
            } => {
                let found = find_project(&repo, &project)?;
                let start = match start {
                    Some(s) => parse_start(&s)?,
                    None => Utc::now() - Duration::minutes(minutes),
                };
                let mut entry = TimeEntry::completed(found.id, start, minutes);
                if let Some(name) = name {
                    entry = entry.with_name(name);
                }
                entry.validate()?;
                repo.insert_entry(&entry)?;
                println!("Recorded {} minute(s) on {}", minutes, found.name);
            }

            EntryCommands::List { project, limit } => {
                let entries = match project {
                    Some(p) => repo.get_entries_for_project(find_project(&repo, &p)?.id)?,
                    None => repo.get_all_entries()?,
                };
                if entries.is_empty() {
                    println!("No time entries found.");
                    return Ok(());
                }
                let now = Utc::now();
                for entry in entries.iter().take(limit) {
                    println!(
                        "  {}  {:>5} min  {}  {}",
                        entry.start_time.format("%Y-%m-%d %H:%M"),
                        entry.duration_minutes(now),
                        entry.project_id,
                        entry.name.as_deref().unwrap_or("")
                    );
                }
                if entries.len() > limit {
                    println!("  ... {} more", entries.len() - limit);
                }
            }
        }
        Ok(())
    })
}

/// Find a project by ID or name (case-insensitive)
fn find_project(repo: &TimeTrackingRepository<'_>, identifier: &str) -> HoursResult<Project> {
    if let Ok(id) = identifier.parse::<ProjectId>() {
        if let Some(project) = repo.get_project(id)? {
            return Ok(project);
        }
    }

    repo.get_all_projects()?
        .into_iter()
        .find(|p| p.name.eq_ignore_ascii_case(identifier))
        .ok_or_else(|| HoursError::project_not_found(identifier))
}

fn parse_start(s: &str) -> HoursResult<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M")
        .map(|naive| naive.and_utc())
        .map_err(|e| HoursError::Validation(format!("Invalid start time '{}': {}", s, e)))
}
