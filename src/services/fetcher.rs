//! Row fetching seam between the aggregation layer and the backing store.
//!
//! Dashboards issue one [`RowQuery`] per table. A failed query only takes
//! down the panels built from it; `null` data reads as an empty row set.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;

use crate::errors::FetchError;
use crate::models::analytics::Panel;
use crate::models::period::DateRange;
use crate::models::record::Record;
use crate::models::table::Table;

/// One read against a domain table.
#[derive(Debug, Clone, PartialEq)]
pub struct RowQuery {
    pub table: Table,
    pub range: Option<DateRange>,
    /// Equality filters as `(column, value)`, compared as text.
    pub equals: Vec<(String, String)>,
}

impl RowQuery {
    pub fn new(table: Table) -> Self {
        Self {
            table,
            range: None,
            equals: Vec::new(),
        }
    }

    pub fn within(mut self, range: DateRange) -> Self {
        self.range = Some(range);
        self
    }

    pub fn where_eq(mut self, column: &str, value: &str) -> Self {
        self.equals.push((column.to_string(), value.to_string()));
        self
    }

    /// Apply the query's filters to an already-materialized row.
    pub fn matches(&self, record: &Record) -> bool {
        if let Some(range) = &self.range {
            match record.created_at() {
                Some(ts) if range.contains(ts) => {}
                _ => return false,
            }
        }
        self.equals
            .iter()
            .all(|(column, value)| record.get_category(column).as_deref() == Some(value.as_str()))
    }
}

/// Backend row source. `Ok(None)` means the store answered with no data.
#[async_trait]
pub trait RowSource: Send + Sync {
    async fn fetch(&self, query: &RowQuery) -> Result<Option<Vec<Record>>, FetchError>;

    /// Cheap connectivity probe for readiness checks.
    async fn ping(&self) -> Result<(), FetchError>;
}

/// Fetch rows, normalizing `null` data to an empty set.
pub async fn fetch_rows(
    source: &dyn RowSource,
    query: &RowQuery,
) -> Result<Vec<Record>, FetchError> {
    let rows = source.fetch(query).await?.unwrap_or_default();
    tracing::debug!(table = %query.table, rows = rows.len(), "Fetched rows");
    Ok(rows)
}

/// Fetch rows for a dashboard panel. Errors are logged and become an unavailable panel.
pub async fn fetch_panel(source: &dyn RowSource, query: RowQuery) -> Panel<Vec<Record>> {
    match fetch_rows(source, &query).await {
        Ok(rows) => Panel::Ready(rows),
        Err(e) => {
            tracing::warn!(table = %query.table, error = %e, "Row fetch failed, panel unavailable");
            Panel::unavailable(format!("{}: {e}", query.table))
        }
    }
}

/// Canned table contents for [`MemorySource`].
#[derive(Debug, Clone)]
pub enum TableState {
    Rows(Vec<Record>),
    Null,
    Failing(String),
}

/// In-memory row source used by tests and local demos.
#[derive(Debug, Default)]
pub struct MemorySource {
    tables: HashMap<Table, TableState>,
    latency: HashMap<Table, Duration>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rows(mut self, table: Table, rows: Vec<Record>) -> Self {
        self.tables.insert(table, TableState::Rows(rows));
        self
    }

    pub fn with_null(mut self, table: Table) -> Self {
        self.tables.insert(table, TableState::Null);
        self
    }

    pub fn with_failure(mut self, table: Table, message: &str) -> Self {
        self.tables
            .insert(table, TableState::Failing(message.to_string()));
        self
    }

    pub fn with_latency(mut self, table: Table, delay: Duration) -> Self {
        self.latency.insert(table, delay);
        self
    }
}

#[async_trait]
impl RowSource for MemorySource {
    async fn fetch(&self, query: &RowQuery) -> Result<Option<Vec<Record>>, FetchError> {
        if let Some(delay) = self.latency.get(&query.table).copied() {
            tokio::time::sleep(delay).await;
        }

        match self.tables.get(&query.table) {
            None => Ok(Some(Vec::new())),
            Some(TableState::Null) => Ok(None),
            Some(TableState::Failing(message)) => Err(FetchError::Unavailable(message.clone())),
            Some(TableState::Rows(rows)) => Ok(Some(
                rows.iter().filter(|r| query.matches(r)).cloned().collect(),
            )),
        }
    }

    async fn ping(&self) -> Result<(), FetchError> {
        Ok(())
    }
}
