//! Time entry model
//!
//! Time entries are the leaf records of the schema.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::ids::{EntryId, ProjectId};
use crate::error::HoursError;

/// A span of tracked time for one project
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeEntry {
    /// Row id; `0` asks the database to assign one on insert
    pub id: EntryId,

    /// Owning project
    pub project_id: ProjectId,

    /// When tracking started
    pub start_time: DateTime<Utc>,

    /// When tracking stopped; `None` while running
    pub end_time: Option<DateTime<Utc>>,

    /// Whether the timer is still running
    pub is_running: bool,

    /// Optional label
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl TimeEntry {
    /// Create a completed entry of the given length
    pub fn completed(project_id: ProjectId, start_time: DateTime<Utc>, minutes: i64) -> Self {
        Self {
            id: EntryId::new(0),
            project_id,
            start_time,
            end_time: Some(start_time + Duration::minutes(minutes)),
            is_running: false,
            name: None,
        }
    }

    /// Create a running entry started at `start_time`
    pub fn running(project_id: ProjectId, start_time: DateTime<Utc>) -> Self {
        Self {
            id: EntryId::new(0),
            project_id,
            start_time,
            end_time: None,
            is_running: true,
            name: None,
        }
    }

    /// Attach a label
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Duration in whole minutes; running entries are measured up to `now`
    pub fn duration_minutes(&self, now: DateTime<Utc>) -> i64 {
        let end = self.end_time.unwrap_or(now);
        (end - self.start_time).num_minutes()
    }

    /// Validate the entry before it is written
    pub fn validate(&self) -> Result<(), HoursError> {
        if let Some(end) = self.end_time {
            if end < self.start_time {
                return Err(HoursError::Validation(
                    "Time entry ends before it starts".into(),
                ));
            }
        }
        if self.is_running && self.end_time.is_some() {
            return Err(HoursError::Validation(
                "A running time entry cannot have an end time".into(),
            ));
        }
        Ok(())
    }
}
