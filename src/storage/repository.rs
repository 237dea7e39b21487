//! Domain read/write access
//!
//! `TimeTrackingRepository` is the plain data-access layer over a borrowed
//! connection. The backup engine only depends on the narrow [`DomainReader`]
//! view of it, which hands out rows exactly as stored: no validation, no
//! parsing of enum columns or timestamps.

use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::error::HoursResult;
use crate::models::{
    from_millis, to_millis, EntryId, PeriodClose, PeriodCloseId, Project, ProjectId, TimeEntry,
};

/// A `projects` row as stored
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectRow {
    pub id: ProjectId,
    pub name: String,
    pub created_at: i64,
    pub is_active: bool,
    pub period_mode: String,
}

/// A `time_entries` row as stored
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryRow {
    pub id: EntryId,
    pub project_id: ProjectId,
    pub start_time: i64,
    pub end_time: Option<i64>,
    pub is_running: bool,
    pub name: Option<String>,
}

/// A `period_closes` row as stored
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeriodCloseRow {
    pub id: PeriodCloseId,
    pub project_id: ProjectId,
    pub close_time: i64,
    pub is_automatic: bool,
    pub created_at: i64,
}

/// Read access the snapshot exporter needs
pub trait DomainReader {
    fn project_rows(&self) -> HoursResult<Vec<ProjectRow>>;

    fn get_entry_count(&self) -> HoursResult<u64>;

    /// Entries ordered by start time, then id
    fn entry_rows_batch(&self, limit: usize, offset: usize) -> HoursResult<Vec<EntryRow>>;

    fn period_close_rows(&self) -> HoursResult<Vec<PeriodCloseRow>>;
}

/// Repository over one open connection
pub struct TimeTrackingRepository<'a> {
    conn: &'a Connection,
}

const PROJECT_COLUMNS: &str = "id, name, createdAt, isActive, periodMode";
const ENTRY_COLUMNS: &str = "id, projectId, startTime, endTime, isRunning, name";
const CLOSE_COLUMNS: &str = "id, projectId, closeTime, isAutomatic, createdAt";

fn project_from_row(row: &Row<'_>) -> rusqlite::Result<Project> {
    let period_mode: String = row.get(4)?;
    Ok(Project {
        id: row.get(0)?,
        name: row.get(1)?,
        created_at: from_millis(row.get(2)?),
        is_active: row.get(3)?,
        period_mode: period_mode.parse().unwrap_or_default(),
    })
}

fn entry_from_row(row: &Row<'_>) -> rusqlite::Result<TimeEntry> {
    Ok(TimeEntry {
        id: row.get(0)?,
        project_id: row.get(1)?,
        start_time: from_millis(row.get(2)?),
        end_time: row.get::<_, Option<i64>>(3)?.map(from_millis),
        is_running: row.get(4)?,
        name: row.get(5)?,
    })
}

fn project_row(row: &Row<'_>) -> rusqlite::Result<ProjectRow> {
    Ok(ProjectRow {
        id: row.get(0)?,
        name: row.get(1)?,
        created_at: row.get(2)?,
        is_active: row.get(3)?,
        period_mode: row.get(4)?,
    })
}

fn entry_row(row: &Row<'_>) -> rusqlite::Result<EntryRow> {
    Ok(EntryRow {
        id: row.get(0)?,
        project_id: row.get(1)?,
        start_time: row.get(2)?,
        end_time: row.get(3)?,
        is_running: row.get(4)?,
        name: row.get(5)?,
    })
}

fn close_row(row: &Row<'_>) -> rusqlite::Result<PeriodCloseRow> {
    Ok(PeriodCloseRow {
        id: row.get(0)?,
        project_id: row.get(1)?,
        close_time: row.get(2)?,
        is_automatic: row.get(3)?,
        created_at: row.get(4)?,
    })
}

/// `None` lets SQLite assign the row id
fn explicit_id(raw: i64) -> Option<i64> {
    (raw != 0).then_some(raw)
}

impl<'a> TimeTrackingRepository<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Insert a project, keeping its id if one is set
    pub fn insert_project(&self, project: &Project) -> HoursResult<ProjectId> {
        project.validate()?;
        self.insert_project_row(&ProjectRow {
            id: project.id,
            name: project.name.clone(),
            created_at: to_millis(&project.created_at),
            is_active: project.is_active,
            period_mode: project.period_mode.as_str().to_string(),
        })
    }

    /// Insert a time entry, keeping its id if one is set
    pub fn insert_entry(&self, entry: &TimeEntry) -> HoursResult<EntryId> {
        entry.validate()?;
        self.insert_entry_row(&EntryRow {
            id: entry.id,
            project_id: entry.project_id,
            start_time: to_millis(&entry.start_time),
            end_time: entry.end_time.as_ref().map(to_millis),
            is_running: entry.is_running,
            name: entry.name.clone(),
        })
    }

    /// Insert a period close, keeping its id if one is set
    pub fn insert_period_close(&self, close: &PeriodClose) -> HoursResult<PeriodCloseId> {
        self.insert_period_close_row(&PeriodCloseRow {
            id: close.id,
            project_id: close.project_id,
            close_time: to_millis(&close.close_time),
            is_automatic: close.is_automatic,
            created_at: to_millis(&close.created_at),
        })
    }

    /// Write a project row as given
    pub fn insert_project_row(&self, row: &ProjectRow) -> HoursResult<ProjectId> {
        self.conn.execute(
            "INSERT INTO projects (id, name, createdAt, isActive, periodMode)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                explicit_id(row.id.get()),
                row.name,
                row.created_at,
                row.is_active,
                row.period_mode,
            ],
        )?;
        Ok(ProjectId::new(self.conn.last_insert_rowid()))
    }

    /// Write a time entry row as given
    pub fn insert_entry_row(&self, row: &EntryRow) -> HoursResult<EntryId> {
        self.conn.execute(
            "INSERT INTO time_entries (id, projectId, startTime, endTime, isRunning, name)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                explicit_id(row.id.get()),
                row.project_id,
                row.start_time,
                row.end_time,
                row.is_running,
                row.name,
            ],
        )?;
        Ok(EntryId::new(self.conn.last_insert_rowid()))
    }

    /// Write a period close row as given
    pub fn insert_period_close_row(&self, row: &PeriodCloseRow) -> HoursResult<PeriodCloseId> {
        self.conn.execute(
            "INSERT INTO period_closes (id, projectId, closeTime, isAutomatic, createdAt)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                explicit_id(row.id.get()),
                row.project_id,
                row.close_time,
                row.is_automatic,
                row.created_at,
            ],
        )?;
        Ok(PeriodCloseId::new(self.conn.last_insert_rowid()))
    }

    /// Get a project by id
    pub fn get_project(&self, id: ProjectId) -> HoursResult<Option<Project>> {
        let project = self
            .conn
            .query_row(
                &format!("SELECT {} FROM projects WHERE id = ?1", PROJECT_COLUMNS),
                [id],
                project_from_row,
            )
            .optional()?;
        Ok(project)
    }

    /// Delete a project; its entries and closes go with it
    pub fn delete_project(&self, id: ProjectId) -> HoursResult<bool> {
        let removed = self.conn.execute("DELETE FROM projects WHERE id = ?1", [id])?;
        Ok(removed > 0)
    }

    /// All entries, newest first
    pub fn get_all_entries(&self) -> HoursResult<Vec<TimeEntry>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM time_entries ORDER BY startTime DESC, id DESC",
            ENTRY_COLUMNS
        ))?;
        let entries = stmt
            .query_map([], entry_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(entries)
    }

    /// Entries of one project, newest first
    pub fn get_entries_for_project(&self, project_id: ProjectId) -> HoursResult<Vec<TimeEntry>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM time_entries WHERE projectId = ?1 ORDER BY startTime DESC, id DESC",
            ENTRY_COLUMNS
        ))?;
        let entries = stmt
            .query_map([project_id], entry_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(entries)
    }

    /// All projects by name
    pub fn get_all_projects(&self) -> HoursResult<Vec<Project>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM projects ORDER BY name ASC, id ASC",
            PROJECT_COLUMNS
        ))?;
        let projects = stmt
            .query_map([], project_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(projects)
    }
}

impl DomainReader for TimeTrackingRepository<'_> {
    fn project_rows(&self) -> HoursResult<Vec<ProjectRow>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM projects ORDER BY id ASC",
            PROJECT_COLUMNS
        ))?;
        let rows = stmt
            .query_map([], project_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    fn get_entry_count(&self) -> HoursResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM time_entries", [], |row| row.get(0))?;
        Ok(count.max(0) as u64)
    }

    fn entry_rows_batch(&self, limit: usize, offset: usize) -> HoursResult<Vec<EntryRow>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM time_entries ORDER BY startTime ASC, id ASC LIMIT ?1 OFFSET ?2",
            ENTRY_COLUMNS
        ))?;
        let rows = stmt
            .query_map(params![limit as i64, offset as i64], entry_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    fn period_close_rows(&self) -> HoursResult<Vec<PeriodCloseRow>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM period_closes ORDER BY id ASC",
            CLOSE_COLUMNS
        ))?;
        let rows = stmt
            .query_map([], close_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }
}
