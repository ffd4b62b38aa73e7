//! Aggregation services: fetching, reduction and the per-role dashboards.

pub mod compliance_dashboard;
pub mod dashboard;
pub mod date_range;
pub mod distribution;
pub mod fetcher;
pub mod forecast;
pub mod reducer;
pub mod revenue_dashboard;
pub mod series;
pub mod summaries;
