//! Strongly-typed row ID wrappers
//!
//! Rows keep their SQLite integer primary keys across export and restore, so
//! the wrappers are transparent over `i64` and convert directly to and from
//! SQL values.

use rusqlite::types::{FromSql, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Macro to generate ID newtype wrappers
macro_rules! define_id {
    ($name:ident, $display_prefix:literal) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            /// Wrap an existing row id
            pub fn new(raw: i64) -> Self {
                Self(raw)
            }

            /// Get the underlying row id
            pub fn get(&self) -> i64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}{}", $display_prefix, self.0)
            }
        }

        impl From<i64> for $name {
            fn from(raw: i64) -> Self {
                Self(raw)
            }
        }

        impl FromStr for $name {
            type Err = std::num::ParseIntError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let s = s.strip_prefix($display_prefix).unwrap_or(s);
                Ok(Self(s.parse()?))
            }
        }

        impl ToSql for $name {
            fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
                self.0.to_sql()
            }
        }

        impl FromSql for $name {
            fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
                i64::column_result(value).map(Self)
            }
        }
    };
}

define_id!(ProjectId, "prj-");
define_id!(EntryId, "ent-");
define_id!(PeriodCloseId, "cls-");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_display() {
        assert_eq!(ProjectId::new(42).to_string(), "prj-42");
        assert_eq!(EntryId::new(7).to_string(), "ent-7");
    }

    #[test]
    fn test_id_parse_with_and_without_prefix() {
        assert_eq!("prj-12".parse::<ProjectId>().unwrap(), ProjectId::new(12));
        assert_eq!("12".parse::<ProjectId>().unwrap(), ProjectId::new(12));
        assert!("prj-abc".parse::<ProjectId>().is_err());
    }

    #[test]
    fn test_id_serialization() {
        let id = EntryId::new(99);
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "99");
        let deserialized: EntryId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, deserialized);
    }
}
