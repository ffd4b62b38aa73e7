//! Generic categorical breakdown over any table and column.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::errors::{ApiResponse, AppError};
use crate::models::analytics::DistributionSlice;
use crate::models::table::{is_column_name, Table};
use crate::routes::dashboard::parse_period;
use crate::services::dashboard::{DashboardContext, PeriodInfo};
use crate::services::distribution::{build_distribution, DistributionOptions, SliceValue};
use crate::services::fetcher::fetch_rows;
use crate::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct DistributionPath {
    pub table: String,
    #[validate(length(min = 1, max = 64))]
    pub field: String,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct DistributionQuery {
    pub period: Option<String>,
    #[validate(range(min = 1, max = 50))]
    pub top: Option<usize>,
    /// Label for rows missing the field; without it such rows are skipped.
    #[validate(length(min = 1, max = 64))]
    pub fallback: Option<String>,
    /// Sum this numeric field instead of counting rows.
    #[validate(length(min = 1, max = 64))]
    pub sum: Option<String>,
    /// Restrict to rows with this exact status.
    #[validate(length(min = 1, max = 64))]
    pub status: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DistributionResponse {
    #[serde(flatten)]
    pub info: PeriodInfo,
    pub table: Table,
    pub field: String,
    pub slices: Vec<DistributionSlice>,
}

/// GET /api/v1/distributions/{table}/{field}
pub async fn distribution(
    State(state): State<AppState>,
    Path(path): Path<DistributionPath>,
    Query(query): Query<DistributionQuery>,
) -> Result<Json<ApiResponse<DistributionResponse>>, AppError> {
    path.validate()?;
    query.validate()?;

    let table: Table = path.table.parse().map_err(AppError::Validation)?;
    for column in std::iter::once(&path.field).chain(query.sum.as_ref()) {
        if !is_column_name(column) {
            return Err(AppError::Validation(format!("invalid field '{column}'")));
        }
    }

    let period = parse_period(query.period.as_deref())?;
    let ctx = DashboardContext::new(period, Utc::now());

    let mut row_query = ctx.in_range(table);
    if let Some(status) = &query.status {
        row_query = row_query.where_eq("status", status);
    }
    let rows = fetch_rows(state.source.as_ref(), &row_query)
        .await
        .map_err(|e| AppError::fetch(table, e))?;

    let options = DistributionOptions {
        value: query.sum.as_deref().map_or(SliceValue::Count, SliceValue::Sum),
        fallback: query.fallback.as_deref(),
        top_n: query.top,
        drop_zero: false,
    };
    let slices = build_distribution(&rows, &path.field, &options);

    tracing::debug!(
        table = %table,
        field = %path.field,
        rows = rows.len(),
        slices = slices.len(),
        "Built distribution"
    );

    Ok(ApiResponse::success(DistributionResponse {
        info: PeriodInfo::from(&ctx),
        table,
        field: path.field,
        slices,
    }))
}
