//! On-disk schema contract
//!
//! Every database file, live or snapshot, carries its schema version in the
//! SQLite `user_version` header slot. It can be read without touching any
//! application table, so it is the single source of truth for version
//! comparisons.

use rusqlite::Connection;

/// Schema version written by this build
pub const CURRENT_SCHEMA_VERSION: u32 = 4;

/// Entity-group table
pub const PROJECTS_TABLE: &str = "projects";

/// Leaf-record table
pub const TIME_ENTRIES_TABLE: &str = "time_entries";

/// Period bookkeeping table (added in v3)
pub const PERIOD_CLOSES_TABLE: &str = "period_closes";

/// Foreign-key index on `time_entries.projectId` (added in v4)
pub const ENTRY_PROJECT_INDEX: &str = "index_time_entries_projectId";

/// Read the schema version from the file header
pub fn read_user_version(conn: &Connection) -> rusqlite::Result<u32> {
    let version: i64 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;
    Ok(u32::try_from(version).unwrap_or(0))
}

/// Stamp the schema version into the file header
pub fn write_user_version(conn: &Connection, version: u32) -> rusqlite::Result<()> {
    conn.execute_batch(&format!("PRAGMA user_version = {};", version))
}

/// List user tables, skipping engine-internal and ORM bookkeeping tables
pub fn list_user_tables(conn: &Connection) -> rusqlite::Result<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT name FROM sqlite_master
         WHERE type = 'table'
           AND name NOT LIKE 'sqlite_%'
           AND name NOT LIKE 'android_%'
           AND name NOT LIKE 'room_%'
         ORDER BY name",
    )?;
    let names = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(names)
}

/// Column names of `table`, empty if the table does not exist
pub fn table_columns(conn: &Connection, table: &str) -> rusqlite::Result<Vec<String>> {
    let mut stmt = conn.prepare("SELECT name FROM pragma_table_info(?1)")?;
    let columns = stmt
        .query_map([table], |row| row.get::<_, String>(0))?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(columns)
}

/// Whether an index with this name exists
pub fn index_exists(conn: &Connection, name: &str) -> rusqlite::Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'index' AND name = ?1",
        [name],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

/// Whether both entity tables are present
pub fn has_entity_tables(tables: &[String]) -> bool {
    tables.iter().any(|t| t == PROJECTS_TABLE) && tables.iter().any(|t| t == TIME_ENTRIES_TABLE)
}

/// Infer the schema version of an unversioned file from its structure.
///
/// Returns `None` when the file does not carry both entity tables.
pub fn infer_structural_version(conn: &Connection) -> rusqlite::Result<Option<u32>> {
    let tables = list_user_tables(conn)?;
    if !has_entity_tables(&tables) {
        return Ok(None);
    }

    let entry_columns = table_columns(conn, TIME_ENTRIES_TABLE)?;
    if !entry_columns.iter().any(|c| c == "name") {
        return Ok(Some(1));
    }

    let project_columns = table_columns(conn, PROJECTS_TABLE)?;
    let has_period_mode = project_columns.iter().any(|c| c == "periodMode");
    let has_period_closes = tables.iter().any(|t| t == PERIOD_CLOSES_TABLE);
    if !has_period_mode || !has_period_closes {
        return Ok(Some(2));
    }

    if !index_exists(conn, ENTRY_PROJECT_INDEX)? {
        return Ok(Some(3));
    }

    Ok(Some(CURRENT_SCHEMA_VERSION))
}
