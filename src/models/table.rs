//! Closed set of backend tables the dashboards read from.

use std::fmt;
use std::str::FromStr;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Lowercase SQL identifier, at most 63 bytes like a Postgres name.
const COLUMN_PATTERN: &str = r"^[a-z_][a-z0-9_]{0,62}$";

/// Whether `name` may be interpolated into a query as a column name.
pub fn is_column_name(name: &str) -> bool {
    Regex::new(COLUMN_PATTERN).is_ok_and(|re| re.is_match(name))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Table {
    Applications,
    Payments,
    Invoices,
    Inspections,
    Entities,
    Tasks,
    Reports,
}

impl Table {
    pub const ALL: [Table; 7] = [
        Table::Applications,
        Table::Payments,
        Table::Invoices,
        Table::Inspections,
        Table::Entities,
        Table::Tasks,
        Table::Reports,
    ];

    /// SQL identifier of the table. Only these names are ever interpolated into queries.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Applications => "applications",
            Self::Payments => "payments",
            Self::Invoices => "invoices",
            Self::Inspections => "inspections",
            Self::Entities => "entities",
            Self::Tasks => "tasks",
            Self::Reports => "reports",
        }
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Table {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Table::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| format!("unknown table '{s}'"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_names_round_trip_through_from_str() {
        for table in Table::ALL {
            assert_eq!(table.as_str().parse::<Table>().unwrap(), table);
        }
        assert!("users; drop table".parse::<Table>().is_err());
    }

    #[test]
    fn column_names_are_plain_identifiers() {
        assert!(is_column_name("application_type"));
        assert!(is_column_name("_score2"));
        assert!(!is_column_name("2fast"));
        assert!(!is_column_name("status::text"));
        assert!(!is_column_name("Province"));
        assert!(!is_column_name(""));
        assert!(!is_column_name(&"a".repeat(64)));
    }
}
