//! Core data models for hours-vault
//!
//! This module contains the rows that make up a time-tracking database:
//! projects, their time entries and their period closes.

pub mod ids;
pub mod period_close;
pub mod project;
pub mod time_entry;

pub use ids::{EntryId, PeriodCloseId, ProjectId};
pub use period_close::PeriodClose;
pub use project::{PeriodMode, Project};
pub use time_entry::TimeEntry;

use chrono::{DateTime, TimeZone, Utc};

/// Convert a timestamp to the epoch milliseconds stored in the database
pub fn to_millis(ts: &DateTime<Utc>) -> i64 {
    ts.timestamp_millis()
}

/// Convert stored epoch milliseconds back to a timestamp
///
/// Out-of-range values clamp to the Unix epoch.
pub fn from_millis(millis: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(millis)
        .single()
        .unwrap_or_default()
}
