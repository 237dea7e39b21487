//! Project model
//!
//! Projects are the entity-group rows: every time entry and period close
//! belongs to exactly one project and is removed with it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::ids::ProjectId;
use crate::error::HoursError;

/// How a project's reporting periods are closed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PeriodMode {
    /// A period closes automatically at the end of each calendar month
    #[default]
    Monthly,
    /// Periods are closed by hand
    Manual,
}

impl PeriodMode {
    /// Value stored in the `periodMode` column
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Monthly => "monthly",
            Self::Manual => "manual",
        }
    }
}

impl fmt::Display for PeriodMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PeriodMode {
    type Err = HoursError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "monthly" => Ok(Self::Monthly),
            "manual" => Ok(Self::Manual),
            other => Err(HoursError::Validation(format!(
                "Unknown period mode: {}",
                other
            ))),
        }
    }
}

/// A tracked project
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    /// Row id; `0` asks the database to assign one on insert
    pub id: ProjectId,

    /// Display name
    pub name: String,

    /// When the project was created
    pub created_at: DateTime<Utc>,

    /// Whether this is the project currently selected for tracking
    pub is_active: bool,

    /// Period closing behaviour
    #[serde(default)]
    pub period_mode: PeriodMode,
}

impl Project {
    /// Create a new, not yet persisted project
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: ProjectId::new(0),
            name: name.into(),
            created_at: Utc::now(),
            is_active: false,
            period_mode: PeriodMode::default(),
        }
    }

    /// Whether the row id has been assigned by the database
    pub fn is_persisted(&self) -> bool {
        self.id.get() != 0
    }

    /// Validate the project before it is written
    pub fn validate(&self) -> Result<(), HoursError> {
        if self.name.trim().is_empty() {
            return Err(HoursError::Validation(
                "Project name cannot be empty".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_project() {
        let project = Project::new("Consulting");
        assert_eq!(project.name, "Consulting");
        assert!(!project.is_persisted());
        assert!(!project.is_active);
        assert_eq!(project.period_mode, PeriodMode::Monthly);
    }

    #[test]
    fn test_validation() {
        assert!(Project::new("Ok").validate().is_ok());
        assert!(Project::new("   ").validate().is_err());
    }

    #[test]
    fn test_period_mode_parse() {
        assert_eq!("MONTHLY".parse::<PeriodMode>().unwrap(), PeriodMode::Monthly);
        assert_eq!("manual".parse::<PeriodMode>().unwrap(), PeriodMode::Manual);
        assert!("weekly".parse::<PeriodMode>().is_err());
    }
}
