//! Database connection pool and the Postgres-backed row source.

use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use crate::errors::FetchError;
use crate::models::record::Record;
use crate::models::table::is_column_name;
use crate::services::fetcher::{RowQuery, RowSource};

/// Create a PostgreSQL connection pool.
pub async fn create_pool(database_url: &str, max_connections: u32) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await
}

/// Render the SQL for a row query. Each row comes back as one JSON object.
///
/// The table name comes from a closed enum; filter columns are checked as
/// identifiers. Every value is bound, never interpolated.
pub fn build_sql(query: &RowQuery) -> Result<String, FetchError> {
    let mut sql = format!("SELECT to_jsonb(t) AS row FROM {} t", query.table);
    let mut clauses = Vec::new();
    let mut param = 0;

    if query.range.is_some() {
        clauses.push("t.created_at BETWEEN $1 AND $2".to_string());
        param = 2;
    }
    for (column, _) in &query.equals {
        if !is_column_name(column) {
            return Err(FetchError::InvalidColumn(column.clone()));
        }
        param += 1;
        clauses.push(format!("t.{column}::text = ${param}"));
    }

    if !clauses.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&clauses.join(" AND "));
    }
    Ok(sql)
}

/// Row source reading straight from the portal's Postgres tables.
#[derive(Debug, Clone)]
pub struct PgRowSource {
    pool: PgPool,
}

impl PgRowSource {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RowSource for PgRowSource {
    async fn fetch(&self, query: &RowQuery) -> Result<Option<Vec<Record>>, FetchError> {
        let sql = build_sql(query)?;

        let mut statement = sqlx::query_scalar::<_, serde_json::Value>(&sql);
        if let Some(range) = &query.range {
            statement = statement.bind(range.start).bind(range.end);
        }
        for (_, value) in &query.equals {
            statement = statement.bind(value.as_str());
        }

        let rows = statement.fetch_all(&self.pool).await?;
        Ok(Some(rows.into_iter().map(Record::from).collect()))
    }

    async fn ping(&self) -> Result<(), FetchError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
