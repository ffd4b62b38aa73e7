//! Dashboard routes: one aggregated view per staff role.

use axum::{
    extract::{Query, State},
    Json,
};
use chrono::Utc;
use serde::Deserialize;

use crate::errors::{ApiResponse, AppError};
use crate::models::period::Period;
use crate::services::compliance_dashboard::{self, ComplianceDashboard};
use crate::services::dashboard::{self, DashboardContext, ExecutiveDashboard, RegistryDashboard};
use crate::services::revenue_dashboard::{self, RevenueDashboard};
use crate::AppState;

/// Query string shared by every dashboard.
#[derive(Debug, Default, Deserialize)]
pub struct DashboardQuery {
    pub period: Option<String>,
}

/// Parse the requested period, defaulting to monthly.
pub fn parse_period(raw: Option<&str>) -> Result<Period, AppError> {
    match raw {
        None => Ok(Period::default()),
        Some(value) => value.parse().map_err(AppError::Validation),
    }
}

fn context(query: &DashboardQuery) -> Result<DashboardContext, AppError> {
    let period = parse_period(query.period.as_deref())?;
    Ok(DashboardContext::new(period, Utc::now()))
}

/// GET /api/v1/dashboards/registry
pub async fn registry(
    State(state): State<AppState>,
    Query(query): Query<DashboardQuery>,
) -> Result<Json<ApiResponse<RegistryDashboard>>, AppError> {
    let ctx = context(&query)?;
    Ok(ApiResponse::success(
        dashboard::registry(state.source.as_ref(), &ctx).await,
    ))
}

/// GET /api/v1/dashboards/compliance
pub async fn compliance(
    State(state): State<AppState>,
    Query(query): Query<DashboardQuery>,
) -> Result<Json<ApiResponse<ComplianceDashboard>>, AppError> {
    let ctx = context(&query)?;
    Ok(ApiResponse::success(
        compliance_dashboard::compliance(state.source.as_ref(), &ctx).await,
    ))
}

/// GET /api/v1/dashboards/revenue
pub async fn revenue(
    State(state): State<AppState>,
    Query(query): Query<DashboardQuery>,
) -> Result<Json<ApiResponse<RevenueDashboard>>, AppError> {
    let ctx = context(&query)?;
    let dash =
        revenue_dashboard::revenue(state.source.as_ref(), &ctx, &state.config.forecast).await;
    Ok(ApiResponse::success(dash))
}

/// GET /api/v1/dashboards/executive
pub async fn executive(
    State(state): State<AppState>,
    Query(query): Query<DashboardQuery>,
) -> Result<Json<ApiResponse<ExecutiveDashboard>>, AppError> {
    let ctx = context(&query)?;
    Ok(ApiResponse::success(
        dashboard::executive(state.source.as_ref(), &ctx).await,
    ))
}
