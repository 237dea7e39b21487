//! Period close model
//!
//! Marks the end of a reporting period for a project.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::{PeriodCloseId, ProjectId};

/// The closing instant of one project period
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodClose {
    pub id: PeriodCloseId,
    pub project_id: ProjectId,
    pub close_time: DateTime<Utc>,
    /// Created by the monthly auto-close rather than by the user
    pub is_automatic: bool,
    pub created_at: DateTime<Utc>,
}

impl PeriodClose {
    /// Create a new manual close at `close_time`
    pub fn manual(project_id: ProjectId, close_time: DateTime<Utc>) -> Self {
        Self {
            id: PeriodCloseId::new(0),
            project_id,
            close_time,
            is_automatic: false,
            created_at: Utc::now(),
        }
    }
}
