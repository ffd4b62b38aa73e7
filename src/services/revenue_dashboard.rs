//! Revenue staff dashboard: invoicing, collections, sector split and forecast.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::analytics::{
    DistributionSlice, ForecastPoint, Panel, SectorPoint, SeriesPoint,
};
use crate::models::record::Record;
use crate::models::table::Table;
use crate::services::dashboard::{DashboardContext, PeriodInfo, PAYMENT_SETTLED, PERMIT_GRANTED};
use crate::services::distribution::{build_distribution, DistributionOptions};
use crate::services::fetcher::{fetch_panel, RowQuery, RowSource};
use crate::services::forecast::{project, ForecastSettings};
use crate::services::series::{build_series, revenue_by_sector, Metric, MetricExtractor};
use crate::services::summaries::{summarize_invoices, InvoiceSummary};

#[derive(Debug, Serialize)]
pub struct RevenueDashboard {
    #[serde(flatten)]
    pub info: PeriodInfo,
    pub invoices: Panel<InvoiceSummary>,
    pub revenue_collected: Panel<f64>,
    pub revenue_trend: Panel<Vec<SeriesPoint>>,
    pub revenue_by_sector: Panel<Vec<SectorPoint>>,
    pub payment_methods: Panel<Vec<DistributionSlice>>,
    pub forecast: Panel<Vec<ForecastPoint>>,
}

const REVENUE_TREND: [Metric<'static>; 2] = [
    Metric::new("collected", MetricExtractor::SumStatus("amount", PAYMENT_SETTLED)),
    Metric::new("payments", MetricExtractor::CountStatus(PAYMENT_SETTLED)),
];

fn settled(payments: &[Record]) -> Vec<Record> {
    payments
        .iter()
        .filter(|p| p.status().is_some_and(|s| PAYMENT_SETTLED.contains(&s)))
        .cloned()
        .collect()
}

/// Granted permits that have not expired as of `now`. A permit without an
/// expiry date counts as active.
fn active_permits(
    applications: &[Record],
    now: DateTime<Utc>,
    settings: &ForecastSettings,
) -> Vec<Record> {
    applications
        .iter()
        .filter(|a| a.status().is_some_and(|s| PERMIT_GRANTED.contains(&s)))
        .filter(|a| {
            !a.get_timestamp(&settings.expiry_field)
                .is_some_and(|expiry| expiry < now)
        })
        .cloned()
        .collect()
}

pub async fn revenue(
    source: &dyn RowSource,
    ctx: &DashboardContext,
    settings: &ForecastSettings,
) -> RevenueDashboard {
    // Applications are read unfiltered: the sector join and the forecast need
    // every parent permit, not only those created inside the period.
    let (invoices, payments, trend_payments, applications) = tokio::join!(
        fetch_panel(source, ctx.in_range(Table::Invoices)),
        fetch_panel(source, ctx.in_range(Table::Payments)),
        fetch_panel(source, ctx.in_trend(Table::Payments)),
        fetch_panel(source, RowQuery::new(Table::Applications)),
    );

    tracing::debug!(
        period = %ctx.period,
        invoices = invoices.ready().map_or(0, Vec::len),
        payments = payments.ready().map_or(0, Vec::len),
        "Building revenue dashboard"
    );

    let settled_in_range = payments.map(|rows| settled(&rows));
    let settled_trend = trend_payments.map(|rows| settled(&rows));

    RevenueDashboard {
        info: ctx.into(),
        invoices: invoices
            .as_ref()
            .map(|rows| summarize_invoices(rows, ctx.now)),
        revenue_collected: settled_in_range
            .as_ref()
            .map(|rows| rows.iter().map(|p| p.amount("amount")).sum()),
        revenue_trend: settled_trend
            .as_ref()
            .map(|rows| build_series(rows, &ctx.plan, "created_at", &REVENUE_TREND)),
        revenue_by_sector: settled_trend
            .zip(&applications)
            .map(|(pays, apps)| revenue_by_sector(pays, apps, &ctx.plan, "amount")),
        payment_methods: settled_in_range.as_ref().map(|rows| {
            build_distribution(
                rows,
                "payment_method",
                &DistributionOptions::pie("Other", 7).summing("amount"),
            )
        }),
        forecast: applications
            .as_ref()
            .map(|rows| project(&active_permits(rows, ctx.now, settings), ctx.now, settings)),
    }
}
