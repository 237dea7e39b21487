//! Backup categories and the file naming convention
//!
//! Backups are classified from their file name alone:
//! `<prefix>_<yyyyMMdd_HHmmss>.db`, with an optional `-N` suffix when several
//! backups of one category land in the same second. Names written by older
//! releases (`daily_backup_…`, `monthly_backup_…`) map onto the current
//! categories.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::settings::BackupRetention;
use crate::error::HoursError;

/// File extension of every snapshot
pub const BACKUP_EXTENSION: &str = "db";

const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";
const TIMESTAMP_LEN: usize = 15;

/// What triggered a backup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackupKind {
    /// Daily automatic backup
    Scheduled,
    /// Taken before the live database is upgraded to a new schema
    PreMigration,
    /// Requested by the user
    Manual,
    /// Long-lived monthly backup
    Periodic,
    /// Taken when the application is about to do something drastic
    Emergency,
}

impl BackupKind {
    pub const ALL: [BackupKind; 5] = [
        BackupKind::Scheduled,
        BackupKind::PreMigration,
        BackupKind::Manual,
        BackupKind::Periodic,
        BackupKind::Emergency,
    ];

    /// File name prefix for new backups of this kind
    pub fn prefix(&self) -> &'static str {
        match self {
            Self::Scheduled => "scheduled",
            Self::PreMigration => "pre_migration",
            Self::Manual => "manual",
            Self::Periodic => "periodic",
            Self::Emergency => "emergency",
        }
    }

    /// How many backups of this kind retention keeps; `None` means never pruned
    pub fn retention_cap(&self, retention: &BackupRetention) -> Option<usize> {
        match self {
            Self::Scheduled => Some(retention.scheduled_count as usize),
            Self::Periodic => Some(retention.periodic_count as usize),
            Self::Manual | Self::PreMigration | Self::Emergency => None,
        }
    }

    /// Classify a file name by its prefix
    pub fn from_file_name(name: &str) -> Option<Self> {
        const PREFIXES: &[(&str, BackupKind)] = &[
            ("scheduled_", BackupKind::Scheduled),
            ("daily_", BackupKind::Scheduled),
            ("periodic_", BackupKind::Periodic),
            ("monthly_", BackupKind::Periodic),
            ("manual_", BackupKind::Manual),
            ("pre_migration_", BackupKind::PreMigration),
            ("emergency_", BackupKind::Emergency),
        ];
        PREFIXES
            .iter()
            .find(|(prefix, _)| name.starts_with(prefix))
            .map(|(_, kind)| *kind)
    }

    /// File name for a backup of this kind taken at `timestamp`
    pub fn file_name(&self, timestamp: DateTime<Utc>, sequence: u32) -> String {
        let stamp = timestamp.format(TIMESTAMP_FORMAT);
        if sequence == 0 {
            format!("{}_{}.{}", self.prefix(), stamp, BACKUP_EXTENSION)
        } else {
            format!("{}_{}-{}.{}", self.prefix(), stamp, sequence, BACKUP_EXTENSION)
        }
    }
}

impl fmt::Display for BackupKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Scheduled => "scheduled",
            Self::PreMigration => "pre-migration",
            Self::Manual => "manual",
            Self::Periodic => "periodic",
            Self::Emergency => "emergency",
        };
        f.write_str(label)
    }
}

impl FromStr for BackupKind {
    type Err = HoursError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "scheduled" | "daily" => Ok(Self::Scheduled),
            "pre_migration" => Ok(Self::PreMigration),
            "manual" => Ok(Self::Manual),
            "periodic" | "monthly" => Ok(Self::Periodic),
            "emergency" => Ok(Self::Emergency),
            other => Err(HoursError::Validation(format!(
                "Unknown backup kind: {}",
                other
            ))),
        }
    }
}

/// What a backup file name encodes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackupName {
    pub kind: BackupKind,
    /// Timestamp from the name, if it carries one
    pub created_at: Option<DateTime<Utc>>,
    /// Same-second collision counter
    pub sequence: u32,
}

/// Parse a backup file name; `None` for files that are not snapshots.
///
/// `.db` files with an unknown prefix are treated as manual backups so they
/// are listed but never pruned.
pub fn parse_backup_file_name(name: &str) -> Option<BackupName> {
    let stem = name.strip_suffix(&format!(".{}", BACKUP_EXTENSION))?;
    let kind = BackupKind::from_file_name(name).unwrap_or(BackupKind::Manual);

    let (body, sequence) = match stem.rsplit_once('-') {
        Some((body, seq)) if !seq.is_empty() && seq.chars().all(|c| c.is_ascii_digit()) => {
            (body, seq.parse().unwrap_or(0))
        }
        _ => (stem, 0),
    };

    Some(BackupName {
        kind,
        created_at: parse_backup_timestamp(body),
        sequence,
    })
}

/// Parse the trailing `yyyyMMdd_HHmmss` of a name stem
fn parse_backup_timestamp(stem: &str) -> Option<DateTime<Utc>> {
    let start = stem.len().checked_sub(TIMESTAMP_LEN)?;
    let stamp = stem.get(start..)?;
    NaiveDateTime::parse_from_str(stamp, TIMESTAMP_FORMAT)
        .ok()
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, TimeZone, Timelike};

    #[test]
    fn test_file_name_format() {
        let ts = Utc.with_ymd_and_hms(2025, 11, 27, 14, 30, 22).unwrap();
        assert_eq!(
            BackupKind::Periodic.file_name(ts, 0),
            "periodic_20251127_143022.db"
        );
        assert_eq!(
            BackupKind::PreMigration.file_name(ts, 2),
            "pre_migration_20251127_143022-2.db"
        );
    }

    #[test]
    fn test_parse_round_trip() {
        let ts = Utc.with_ymd_and_hms(2025, 11, 27, 14, 30, 22).unwrap();
        for kind in BackupKind::ALL {
            let parsed = parse_backup_file_name(&kind.file_name(ts, 3)).unwrap();
            assert_eq!(parsed.kind, kind);
            assert_eq!(parsed.created_at, Some(ts));
            assert_eq!(parsed.sequence, 3);
        }
    }

    #[test]
    fn test_parse_legacy_names() {
        let daily = parse_backup_file_name("daily_backup_20240105_080910.db").unwrap();
        assert_eq!(daily.kind, BackupKind::Scheduled);
        let ts = daily.created_at.unwrap();
        assert_eq!((ts.year(), ts.month(), ts.day()), (2024, 1, 5));
        assert_eq!((ts.hour(), ts.minute(), ts.second()), (8, 9, 10));

        let monthly = parse_backup_file_name("monthly_backup_202401.db").unwrap();
        assert_eq!(monthly.kind, BackupKind::Periodic);
        assert!(monthly.created_at.is_none());

        let emergency = parse_backup_file_name("emergency_backup_latest.db").unwrap();
        assert_eq!(emergency.kind, BackupKind::Emergency);
    }

    #[test]
    fn test_parse_rejects_other_files() {
        assert!(parse_backup_file_name("notes.txt").is_none());
        assert!(parse_backup_file_name("manual_20250101_000000.db.migrating").is_none());
        let unknown = parse_backup_file_name("imported.db").unwrap();
        assert_eq!(unknown.kind, BackupKind::Manual);
    }

    #[test]
    fn test_retention_caps() {
        let retention = BackupRetention {
            scheduled_count: 3,
            periodic_count: 2,
        };
        assert_eq!(BackupKind::Scheduled.retention_cap(&retention), Some(3));
        assert_eq!(BackupKind::Periodic.retention_cap(&retention), Some(2));
        assert_eq!(BackupKind::Manual.retention_cap(&retention), None);
        assert_eq!(BackupKind::Emergency.retention_cap(&retention), None);
        assert_eq!(BackupKind::PreMigration.retention_cap(&retention), None);
    }

    #[test]
    fn test_kind_from_str() {
        assert_eq!("daily".parse::<BackupKind>().unwrap(), BackupKind::Scheduled);
        assert_eq!(
            "pre-migration".parse::<BackupKind>().unwrap(),
            BackupKind::PreMigration
        );
        assert!("weekly".parse::<BackupKind>().is_err());
    }
}
