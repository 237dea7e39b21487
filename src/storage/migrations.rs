//! Schema migration chain
//!
//! One ordered list of steps, each upgrading a database by exactly one
//! version. The live open path and the snapshot migrator both walk this list,
//! so a fresh database, an upgraded live database and a migrated backup all end
//! up with the same structure.
//!
//! Each step runs in its own transaction together with the header bump.

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use rusqlite::{params, Connection};

use super::schema::write_user_version;
use crate::error::{HoursError, HoursResult};

/// Inputs a step may depend on besides the file itself
#[derive(Debug, Clone, Copy)]
pub struct MigrationContext {
    /// Reference instant for backfilled rows
    pub now: DateTime<Utc>,
}

impl MigrationContext {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self { now }
    }

    pub fn now() -> Self {
        Self::new(Utc::now())
    }

    /// Epoch millis of the first instant of the month containing `now`
    fn current_month_start_millis(&self) -> i64 {
        NaiveDate::from_ymd_opt(self.now.year(), self.now.month(), 1)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|dt| dt.and_utc().timestamp_millis())
            .unwrap_or(0)
    }
}

/// One schema transformation `from -> from + 1`
pub struct MigrationStep {
    pub from: u32,
    pub description: &'static str,
    apply: fn(&Connection, &MigrationContext) -> rusqlite::Result<()>,
}

impl MigrationStep {
    /// Target version of this step
    pub fn to(&self) -> u32 {
        self.from + 1
    }
}

/// The full chain, ordered by source version
pub const MIGRATION_STEPS: &[MigrationStep] = &[
    MigrationStep {
        from: 0,
        description: "create projects and time_entries",
        apply: baseline,
    },
    MigrationStep {
        from: 1,
        description: "add time_entries.name",
        apply: add_entry_name,
    },
    MigrationStep {
        from: 2,
        description: "add period tracking",
        apply: add_period_tracking,
    },
    MigrationStep {
        from: 3,
        description: "index time_entries.projectId",
        apply: index_entry_project,
    },
];

/// Look up the step that upgrades `version`
pub fn step_from(version: u32) -> Option<&'static MigrationStep> {
    MIGRATION_STEPS.iter().find(|s| s.from == version)
}

fn baseline(conn: &Connection, _ctx: &MigrationContext) -> rusqlite::Result<()> {
    conn.execute_batch(
        "CREATE TABLE projects (
            id INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
            name TEXT NOT NULL,
            createdAt INTEGER NOT NULL,
            isActive INTEGER NOT NULL
        );
        CREATE TABLE time_entries (
            id INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
            projectId INTEGER NOT NULL,
            startTime INTEGER NOT NULL,
            endTime INTEGER,
            isRunning INTEGER NOT NULL,
            FOREIGN KEY(projectId) REFERENCES projects(id) ON DELETE CASCADE
        );",
    )
}

fn add_entry_name(conn: &Connection, _ctx: &MigrationContext) -> rusqlite::Result<()> {
    conn.execute_batch("ALTER TABLE time_entries ADD COLUMN name TEXT;")
}

fn add_period_tracking(conn: &Connection, ctx: &MigrationContext) -> rusqlite::Result<()> {
    conn.execute_batch(
        "ALTER TABLE projects ADD COLUMN periodMode TEXT NOT NULL DEFAULT 'monthly';
        CREATE TABLE period_closes (
            id INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
            projectId INTEGER NOT NULL,
            closeTime INTEGER NOT NULL,
            isAutomatic INTEGER NOT NULL DEFAULT 0,
            createdAt INTEGER NOT NULL,
            FOREIGN KEY(projectId) REFERENCES projects(id) ON DELETE CASCADE
        );
        CREATE INDEX index_period_closes_projectId ON period_closes(projectId);
        CREATE INDEX index_period_closes_closeTime ON period_closes(closeTime);",
    )?;

    // One automatic close per project and past month that has entries,
    // placed at the first instant of the following month.
    conn.execute(
        "INSERT INTO period_closes (projectId, closeTime, isAutomatic, createdAt)
         SELECT projectId,
                CAST(strftime('%s', date(startTime / 1000, 'unixepoch', 'start of month', '+1 month')) AS INTEGER) * 1000,
                1,
                ?1
         FROM time_entries
         WHERE startTime < ?2
         GROUP BY projectId, strftime('%Y-%m', startTime / 1000, 'unixepoch')
         ORDER BY projectId, 2",
        params![ctx.now.timestamp_millis(), ctx.current_month_start_millis()],
    )?;
    Ok(())
}

fn index_entry_project(conn: &Connection, _ctx: &MigrationContext) -> rusqlite::Result<()> {
    conn.execute_batch(
        "CREATE INDEX IF NOT EXISTS index_time_entries_projectId ON time_entries(projectId);",
    )
}

/// Apply every step from `from` up to `to` on `conn`.
///
/// Returns the number of steps applied. A missing step or a failing step
/// aborts with [`HoursError::Migration`]; steps already committed stay
/// committed, so callers that need all-or-nothing work on a private copy.
pub fn migrate_connection(
    conn: &mut Connection,
    from: u32,
    to: u32,
    ctx: &MigrationContext,
) -> HoursResult<usize> {
    let mut version = from;
    let mut applied = 0;

    while version < to {
        let step = step_from(version).ok_or_else(|| HoursError::Migration {
            from: version,
            to,
            reason: format!("no migration step from v{}", version),
        })?;

        let fail = |e: rusqlite::Error| HoursError::Migration {
            from: step.from,
            to: step.to(),
            reason: e.to_string(),
        };

        let tx = conn.transaction().map_err(fail)?;
        (step.apply)(&tx, ctx).map_err(fail)?;
        write_user_version(&tx, step.to()).map_err(fail)?;
        tx.commit().map_err(fail)?;

        log::debug!(
            "Applied migration v{} -> v{} ({})",
            step.from,
            step.to(),
            step.description
        );
        version = step.to();
        applied += 1;
    }

    Ok(applied)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::schema::{read_user_version, table_columns, CURRENT_SCHEMA_VERSION};
    use chrono::TimeZone;

    fn millis(y: i32, m: u32, d: u32) -> i64 {
        Utc.with_ymd_and_hms(y, m, d, 12, 0, 0)
            .unwrap()
            .timestamp_millis()
    }

    #[test]
    fn test_chain_has_no_gaps() {
        for (i, step) in MIGRATION_STEPS.iter().enumerate() {
            assert_eq!(step.from, i as u32);
        }
        assert_eq!(
            MIGRATION_STEPS.last().map(|s| s.to()),
            Some(CURRENT_SCHEMA_VERSION)
        );
    }

    #[test]
    fn test_fresh_database_reaches_current_version() {
        let mut conn = Connection::open_in_memory().unwrap();
        let applied =
            migrate_connection(&mut conn, 0, CURRENT_SCHEMA_VERSION, &MigrationContext::now())
                .unwrap();
        assert_eq!(applied, 4);
        assert_eq!(read_user_version(&conn).unwrap(), CURRENT_SCHEMA_VERSION);
        assert!(table_columns(&conn, "time_entries")
            .unwrap()
            .contains(&"name".to_string()));
    }

    #[test]
    fn test_period_backfill_groups_by_project_and_month() {
        let mut conn = Connection::open_in_memory().unwrap();
        let ctx = MigrationContext::new(Utc.with_ymd_and_hms(2025, 3, 15, 0, 0, 0).unwrap());
        migrate_connection(&mut conn, 0, 2, &ctx).unwrap();

        conn.execute_batch(
            "INSERT INTO projects (id, name, createdAt, isActive) VALUES (1, 'A', 0, 1);
             INSERT INTO projects (id, name, createdAt, isActive) VALUES (2, 'B', 0, 0);",
        )
        .unwrap();
        for (project, start) in [
            (1, millis(2025, 1, 3)),
            (1, millis(2025, 1, 20)),
            (1, millis(2025, 2, 10)),
            (2, millis(2025, 2, 11)),
            // current month: no close yet
            (2, millis(2025, 3, 2)),
        ] {
            conn.execute(
                "INSERT INTO time_entries (projectId, startTime, endTime, isRunning) VALUES (?1, ?2, NULL, 0)",
                params![project, start],
            )
            .unwrap();
        }

        migrate_connection(&mut conn, 2, 3, &ctx).unwrap();

        let closes: Vec<(i64, i64, i64)> = conn
            .prepare("SELECT projectId, closeTime, createdAt FROM period_closes ORDER BY projectId, closeTime")
            .unwrap()
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))
            .unwrap()
            .collect::<rusqlite::Result<_>>()
            .unwrap();

        let feb_1 = Utc.with_ymd_and_hms(2025, 2, 1, 0, 0, 0).unwrap().timestamp_millis();
        let mar_1 = Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap().timestamp_millis();
        let created = ctx.now.timestamp_millis();
        assert_eq!(
            closes,
            vec![(1, feb_1, created), (1, mar_1, created), (2, mar_1, created)]
        );
    }

    #[test]
    fn test_failing_step_reports_its_versions() {
        let mut conn = Connection::open_in_memory().unwrap();
        // v1 claimed but no tables present
        let err = migrate_connection(&mut conn, 1, 4, &MigrationContext::now()).unwrap_err();
        match err {
            HoursError::Migration { from, to, .. } => {
                assert_eq!(from, 1);
                assert_eq!(to, 2);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(read_user_version(&conn).unwrap(), 0);
    }
}
