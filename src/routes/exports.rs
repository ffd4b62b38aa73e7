//! CSV exports of trend series for offline reporting.

use axum::{
    extract::{Path, Query, State},
    http::header,
    response::{IntoResponse, Response},
};
use chrono::Utc;

use crate::errors::AppError;
use crate::models::analytics::SeriesPoint;
use crate::models::table::Table;
use crate::routes::dashboard::{parse_period, DashboardQuery};
use crate::services::dashboard::DashboardContext;
use crate::services::fetcher::fetch_rows;
use crate::services::series::{build_series, Metric, MetricExtractor};
use crate::AppState;

const COUNT_TREND: [Metric<'static>; 1] = [Metric::new("count", MetricExtractor::Count)];

/// Render a count series as `label,count` rows.
pub fn trend_to_csv(points: &[SeriesPoint]) -> Result<Vec<u8>, AppError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer
        .write_record(["label", "count"])
        .map_err(|e| AppError::Internal(e.to_string()))?;
    for point in points {
        let count = point.metric("count").round() as u64;
        writer
            .write_record([point.label.as_str(), count.to_string().as_str()])
            .map_err(|e| AppError::Internal(e.to_string()))?;
    }
    writer
        .into_inner()
        .map_err(|e| AppError::Internal(e.to_string()))
}

/// GET /api/v1/exports/{table}/trend.csv
pub async fn trend_csv(
    State(state): State<AppState>,
    Path(table): Path<String>,
    Query(query): Query<DashboardQuery>,
) -> Result<Response, AppError> {
    let table: Table = table.parse().map_err(AppError::Validation)?;
    let period = parse_period(query.period.as_deref())?;
    let ctx = DashboardContext::new(period, Utc::now());

    let rows = fetch_rows(state.source.as_ref(), &ctx.in_trend(table))
        .await
        .map_err(|e| AppError::fetch(table, e))?;
    let body = trend_to_csv(&build_series(&rows, &ctx.plan, "created_at", &COUNT_TREND))?;

    tracing::info!(table = %table, period = %period, rows = rows.len(), "Exported trend CSV");

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{table}-trend.csv\""),
            ),
        ],
        body,
    )
        .into_response())
}
