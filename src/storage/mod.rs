//! Storage layer for hours-vault
//!
//! SQLite persistence for the time-tracking domain: the schema header
//! contract, the migration chain, the live database handle and the plain
//! repository used to read and write rows.

pub mod file_io;
pub mod live;
pub mod migrations;
pub mod repository;
pub mod schema;

pub use live::{open_connection, side_files, DatabaseEvent, LiveDatabase};
pub use migrations::{migrate_connection, MigrationContext, MigrationStep, MIGRATION_STEPS};
pub use repository::{DomainReader, EntryRow, PeriodCloseRow, ProjectRow, TimeTrackingRepository};
pub use schema::{CURRENT_SCHEMA_VERSION, PROJECTS_TABLE, TIME_ENTRIES_TABLE};
