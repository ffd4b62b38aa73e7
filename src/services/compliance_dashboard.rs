//! Compliance staff dashboard: inspections, workflow tasks and compliance reports.

use serde::Serialize;

use crate::models::analytics::{DistributionSlice, Panel, SeriesPoint};
use crate::models::table::Table;
use crate::services::dashboard::{DashboardContext, PeriodInfo};
use crate::services::distribution::{build_distribution, DistributionOptions};
use crate::services::fetcher::{fetch_panel, RowSource};
use crate::services::series::{build_series, Metric, MetricExtractor};
use crate::services::summaries::{
    stage_progress, summarize_inspections, summarize_reports, summarize_tasks, InspectionSummary,
    ReportSummary, StageProgress, TaskSummary,
};

#[derive(Debug, Serialize)]
pub struct ComplianceDashboard {
    #[serde(flatten)]
    pub info: PeriodInfo,
    pub inspections: Panel<InspectionSummary>,
    pub tasks: Panel<TaskSummary>,
    pub reports: Panel<ReportSummary>,
    pub inspection_trend: Panel<Vec<SeriesPoint>>,
    pub by_inspection_type: Panel<Vec<DistributionSlice>>,
    pub report_types: Panel<Vec<DistributionSlice>>,
    pub stage_progress: Panel<Vec<StageProgress>>,
}

const INSPECTION_TREND: [Metric<'static>; 3] = [
    Metric::new("inspections", MetricExtractor::Count),
    Metric::new("passed", MetricExtractor::CountStatus(&["passed"])),
    Metric::new("failed", MetricExtractor::CountStatus(&["failed"])),
];

pub async fn compliance(source: &dyn RowSource, ctx: &DashboardContext) -> ComplianceDashboard {
    let (inspections, tasks, reports, trend_rows) = tokio::join!(
        fetch_panel(source, ctx.in_range(Table::Inspections)),
        fetch_panel(source, ctx.in_range(Table::Tasks)),
        fetch_panel(source, ctx.in_range(Table::Reports)),
        fetch_panel(source, ctx.in_trend(Table::Inspections)),
    );

    tracing::debug!(
        period = %ctx.period,
        inspections = inspections.ready().map_or(0, Vec::len),
        tasks = tasks.ready().map_or(0, Vec::len),
        "Building compliance dashboard"
    );

    ComplianceDashboard {
        info: ctx.into(),
        inspections: inspections
            .as_ref()
            .map(|rows| summarize_inspections(rows, ctx.now)),
        tasks: tasks.as_ref().map(|rows| summarize_tasks(rows, ctx.now)),
        reports: reports.as_ref().map(|rows| summarize_reports(rows)),
        inspection_trend: trend_rows
            .as_ref()
            .map(|rows| build_series(rows, &ctx.plan, "created_at", &INSPECTION_TREND)),
        by_inspection_type: inspections.as_ref().map(|rows| {
            build_distribution(
                rows,
                "inspection_type",
                &DistributionOptions::pie("General", 8),
            )
        }),
        report_types: reports.as_ref().map(|rows| {
            build_distribution(rows, "report_type", &DistributionOptions::bar("Unknown", 10))
        }),
        stage_progress: tasks.as_ref().map(|rows| stage_progress(rows)),
    }
}
