//! Registry and executive dashboards, plus the shared per-request context.
//!
//! Every view fetches its tables concurrently, then aggregates the resident
//! rows synchronously. Each panel degrades independently when its fetch fails.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::analytics::{DistributionSlice, Panel, SeriesPoint};
use crate::models::period::{DateRange, Period};
use crate::models::record::Record;
use crate::models::table::Table;
use crate::services::date_range::{self, BucketPlan};
use crate::services::distribution::{build_distribution, DistributionOptions};
use crate::services::fetcher::{fetch_panel, RowQuery, RowSource};
use crate::services::series::{build_series, Metric, MetricExtractor};
use crate::services::summaries::{
    summarize_entities, summarize_inspections, summarize_invoices, summarize_permits,
    EntitySummary, PermitSummary,
};

/// Raw statuses of a permit that has been granted.
pub const PERMIT_GRANTED: &[&str] = &["approved", "issued"];

/// Raw statuses of a payment that has cleared.
pub const PAYMENT_SETTLED: &[&str] = &["completed", "paid"];

/// Period, resolved range and trend plan for one dashboard request.
#[derive(Debug, Clone)]
pub struct DashboardContext {
    pub period: Period,
    pub range: DateRange,
    pub plan: BucketPlan,
    pub now: DateTime<Utc>,
}

impl DashboardContext {
    pub fn new(period: Period, now: DateTime<Utc>) -> Self {
        let range = date_range::resolve(period, now);
        let plan = BucketPlan::for_period(period, &range, now);
        Self {
            period,
            range,
            plan,
            now,
        }
    }

    /// Query over the filter range.
    pub fn in_range(&self, table: Table) -> RowQuery {
        RowQuery::new(table).within(self.range)
    }

    /// Query over the trend window, which may differ from the filter range.
    pub fn in_trend(&self, table: Table) -> RowQuery {
        match self.plan.span() {
            Some(span) => RowQuery::new(table).within(span),
            None => self.in_range(table),
        }
    }
}

/// Period metadata echoed in every dashboard response.
#[derive(Debug, Clone, Serialize)]
pub struct PeriodInfo {
    pub period: Period,
    pub range: DateRange,
    pub generated_at: DateTime<Utc>,
}

impl From<&DashboardContext> for PeriodInfo {
    fn from(ctx: &DashboardContext) -> Self {
        Self {
            period: ctx.period,
            range: ctx.range,
            generated_at: ctx.now,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RegistryDashboard {
    #[serde(flatten)]
    pub info: PeriodInfo,
    pub permits: Panel<PermitSummary>,
    pub entities: Panel<EntitySummary>,
    pub applications_trend: Panel<Vec<SeriesPoint>>,
    pub by_type: Panel<Vec<DistributionSlice>>,
    pub by_province: Panel<Vec<DistributionSlice>>,
}

const APPLICATION_TREND: [Metric<'static>; 2] = [
    Metric::new("applications", MetricExtractor::Count),
    Metric::new("approvals", MetricExtractor::CountStatus(PERMIT_GRANTED)),
];

/// Registry staff view: application throughput and the entity register.
pub async fn registry(source: &dyn RowSource, ctx: &DashboardContext) -> RegistryDashboard {
    let (applications, entities, trend_rows) = tokio::join!(
        fetch_panel(source, ctx.in_range(Table::Applications)),
        fetch_panel(source, ctx.in_range(Table::Entities)),
        fetch_panel(source, ctx.in_trend(Table::Applications)),
    );

    tracing::debug!(
        period = %ctx.period,
        applications = applications.ready().map_or(0, Vec::len),
        entities = entities.ready().map_or(0, Vec::len),
        "Building registry dashboard"
    );

    RegistryDashboard {
        info: ctx.into(),
        permits: applications.as_ref().map(|rows| summarize_permits(rows)),
        entities: entities.as_ref().map(|rows| summarize_entities(rows)),
        applications_trend: trend_rows
            .as_ref()
            .map(|rows| build_series(rows, &ctx.plan, "created_at", &APPLICATION_TREND)),
        by_type: applications.as_ref().map(|rows| {
            build_distribution(
                rows,
                "application_type",
                &DistributionOptions::pie("Unspecified", 6),
            )
        }),
        by_province: applications.as_ref().map(|rows| {
            build_distribution(rows, "province", &DistributionOptions::bar("Unknown", 10))
        }),
    }
}

/// Headline KPIs; each one degrades on its own.
#[derive(Debug, Serialize)]
pub struct ExecutiveKpis {
    pub applications: Panel<u64>,
    pub approval_rate: Panel<f64>,
    pub revenue_collected: Panel<f64>,
    pub collection_rate: Panel<f64>,
    pub inspection_pass_rate: Panel<f64>,
    pub active_entities: Panel<u64>,
}

#[derive(Debug, Serialize)]
pub struct ExecutiveDashboard {
    #[serde(flatten)]
    pub info: PeriodInfo,
    pub kpis: ExecutiveKpis,
    pub trend: Panel<Vec<SeriesPoint>>,
    pub entities_by_province: Panel<Vec<DistributionSlice>>,
}

/// Merge two series built over the same plan into one point per bucket.
fn merge_series(mut left: Vec<SeriesPoint>, right: Vec<SeriesPoint>) -> Vec<SeriesPoint> {
    for (point, other) in left.iter_mut().zip(right) {
        point.metrics.extend(other.metrics);
    }
    left
}

fn settled_revenue(payments: &[Record]) -> f64 {
    payments
        .iter()
        .filter(|p| p.status().is_some_and(|s| PAYMENT_SETTLED.contains(&s)))
        .map(|p| p.amount("amount"))
        .sum()
}

/// Executive view: cross-department headline numbers and trend.
pub async fn executive(source: &dyn RowSource, ctx: &DashboardContext) -> ExecutiveDashboard {
    let (applications, payments, invoices, inspections, entities, app_trend, payment_trend) =
        tokio::join!(
            fetch_panel(source, ctx.in_range(Table::Applications)),
            fetch_panel(source, ctx.in_range(Table::Payments)),
            fetch_panel(source, ctx.in_range(Table::Invoices)),
            fetch_panel(source, ctx.in_range(Table::Inspections)),
            fetch_panel(source, ctx.in_range(Table::Entities)),
            fetch_panel(source, ctx.in_trend(Table::Applications)),
            fetch_panel(source, ctx.in_trend(Table::Payments)),
        );

    tracing::debug!(period = %ctx.period, "Building executive dashboard");

    let permits = applications.as_ref().map(|rows| summarize_permits(rows));
    let trend = app_trend.zip(&payment_trend).map(|(apps, pays)| {
        merge_series(
            build_series(apps, &ctx.plan, "created_at", &APPLICATION_TREND[..1]),
            build_series(
                pays,
                &ctx.plan,
                "created_at",
                &[Metric::new(
                    "revenue",
                    MetricExtractor::SumStatus("amount", PAYMENT_SETTLED),
                )],
            ),
        )
    });

    ExecutiveDashboard {
        info: ctx.into(),
        kpis: ExecutiveKpis {
            applications: permits.as_ref().map(|p| p.total),
            approval_rate: permits.as_ref().map(|p| p.approval_rate),
            revenue_collected: payments.as_ref().map(|rows| settled_revenue(rows)),
            collection_rate: invoices
                .as_ref()
                .map(|rows| summarize_invoices(rows, ctx.now).collection_rate),
            inspection_pass_rate: inspections
                .as_ref()
                .map(|rows| summarize_inspections(rows, ctx.now).pass_rate),
            active_entities: entities
                .as_ref()
                .map(|rows| summarize_entities(rows).active),
        },
        trend,
        entities_by_province: entities.as_ref().map(|rows| {
            build_distribution(rows, "province", &DistributionOptions::bar("Unknown", 12))
        }),
    }
}
