//! Trend series: rows folded into labeled buckets with named metrics.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::models::analytics::{SectorPoint, SeriesPoint};
use crate::models::record::Record;
use crate::services::date_range::BucketPlan;

/// Sector label for payments whose parent application cannot be resolved.
pub const UNRESOLVED_SECTOR: &str = "Other";

/// How one metric is computed from a bucket's rows.
#[derive(Debug, Clone, Copy)]
pub enum MetricExtractor<'a> {
    Count,
    /// Rows whose status is in the set.
    CountStatus(&'a [&'a str]),
    /// Sum of a numeric field, null as zero.
    Sum(&'a str),
    /// Sum of a numeric field over rows whose status is in the set.
    SumStatus(&'a str, &'a [&'a str]),
}

impl MetricExtractor<'_> {
    fn apply(&self, rows: &[&Record]) -> f64 {
        match self {
            Self::Count => rows.len() as f64,
            Self::CountStatus(set) => rows.iter().filter(|r| has_status(r, set)).count() as f64,
            Self::Sum(field) => rows.iter().map(|r| r.amount(field)).sum(),
            Self::SumStatus(field, set) => rows
                .iter()
                .filter(|r| has_status(r, set))
                .map(|r| r.amount(field))
                .sum(),
        }
    }
}

fn has_status(record: &Record, set: &[&str]) -> bool {
    record.status().is_some_and(|s| set.contains(&s))
}

/// A named metric in a series.
#[derive(Debug, Clone, Copy)]
pub struct Metric<'a> {
    pub name: &'a str,
    pub extract: MetricExtractor<'a>,
}

impl<'a> Metric<'a> {
    pub const fn new(name: &'a str, extract: MetricExtractor<'a>) -> Self {
        Self { name, extract }
    }
}

/// Group rows by bucket in a single pass. Rows outside the plan, or without
/// a parseable timestamp, are dropped.
fn group_by_bucket<'r>(
    rows: &'r [Record],
    plan: &BucketPlan,
    timestamp_field: &str,
) -> Vec<Vec<&'r Record>> {
    let mut grouped = vec![Vec::new(); plan.len()];
    for row in rows {
        if let Some(idx) = row
            .get_timestamp(timestamp_field)
            .and_then(|ts| plan.index_of(ts))
        {
            grouped[idx].push(row);
        }
    }
    grouped
}

/// Build one point per bucket, applying every metric to the bucket's subset.
pub fn build_series(
    rows: &[Record],
    plan: &BucketPlan,
    timestamp_field: &str,
    metrics: &[Metric<'_>],
) -> Vec<SeriesPoint> {
    group_by_bucket(rows, plan, timestamp_field)
        .iter()
        .zip(plan.buckets())
        .map(|(subset, bucket)| SeriesPoint {
            label: bucket.label.clone(),
            metrics: metrics
                .iter()
                .map(|m| (m.name.to_string(), m.extract.apply(subset)))
                .collect(),
        })
        .collect()
}

/// Monthly payment totals split by the sector (application type) of each
/// payment's parent application.
///
/// Every point carries every sector seen, zero-filled, plus the bucket total.
pub fn revenue_by_sector(
    payments: &[Record],
    applications: &[Record],
    plan: &BucketPlan,
    amount_field: &str,
) -> Vec<SectorPoint> {
    let sector_of: HashMap<String, String> = applications
        .iter()
        .filter_map(|app| Some((app.id()?, app.get_category("application_type")?)))
        .collect();
    let resolve = |payment: &Record| -> String {
        payment
            .get_category("application_id")
            .and_then(|id| sector_of.get(&id).cloned())
            .unwrap_or_else(|| UNRESOLVED_SECTOR.to_string())
    };

    let grouped = group_by_bucket(payments, plan, "created_at");
    let sectors: BTreeSet<String> = grouped.iter().flatten().map(|p| resolve(*p)).collect();

    grouped
        .iter()
        .zip(plan.buckets())
        .map(|(subset, bucket)| {
            let mut by_sector: BTreeMap<String, f64> =
                sectors.iter().map(|s| (s.clone(), 0.0)).collect();
            let mut total = 0.0;
            for payment in subset {
                let amount = payment.amount(amount_field);
                *by_sector.entry(resolve(*payment)).or_default() += amount;
                total += amount;
            }
            SectorPoint {
                label: bucket.label.clone(),
                sectors: by_sector,
                total,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::period::Period;
    use crate::services::date_range::resolve;
    use chrono::{DateTime, TimeZone, Utc};
    use serde_json::json;

    fn jan_15() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 15, 12, 0, 0).unwrap()
    }

    fn plan() -> BucketPlan {
        let now = jan_15();
        BucketPlan::for_period(Period::Ytd, &resolve(Period::Ytd, now), now)
    }

    const METRICS: [Metric<'static>; 2] = [
        Metric::new("applications", MetricExtractor::Count),
        Metric::new("approvals", MetricExtractor::CountStatus(&["approved", "issued"])),
    ];

    #[test]
    fn ytd_trend_keeps_trailing_window_and_zero_buckets() {
        let rows = vec![
            Record::from(json!({"created_at": "2025-01-10T08:00:00Z", "status": "approved"})),
            Record::from(json!({"created_at": "2025-02-01T08:00:00Z", "status": "pending"})),
        ];
        let series = build_series(&rows, &plan(), "created_at", &METRICS);

        assert_eq!(series.len(), 12);
        let feb = series.iter().find(|p| p.label == "Feb").unwrap();
        assert_eq!(feb.metric("applications"), 0.0);

        let jan = series.last().unwrap();
        assert_eq!(jan.label, "Jan");
        assert_eq!(jan.metric("applications"), 1.0);
        assert_eq!(jan.metric("approvals"), 1.0);

        let counted: f64 = series.iter().map(|p| p.metric("applications")).sum();
        assert_eq!(counted, 1.0);
    }

    #[test]
    fn sums_by_status() {
        let rows = vec![
            Record::from(json!({"created_at": "2025-01-02", "status": "paid", "amount": 300})),
            Record::from(json!({"created_at": "2025-01-03", "status": "failed", "amount": 200})),
            Record::from(json!({"created_at": "2025-01-04", "status": "paid", "amount": null})),
        ];
        let metrics = [
            Metric::new("billed", MetricExtractor::Sum("amount")),
            Metric::new("collected", MetricExtractor::SumStatus("amount", &["paid"])),
        ];
        let series = build_series(&rows, &plan(), "created_at", &metrics);
        let jan = series.last().unwrap();
        assert_eq!(jan.metric("billed"), 500.0);
        assert_eq!(jan.metric("collected"), 300.0);
    }

    #[test]
    fn rows_without_timestamp_are_skipped() {
        let rows = vec![Record::from(json!({"status": "approved"}))];
        let series = build_series(&rows, &plan(), "created_at", &METRICS);
        assert!(series.iter().all(|p| p.metric("applications") == 0.0));
    }

    #[test]
    fn sector_join_falls_back_to_other() {
        let applications = vec![
            Record::from(json!({"id": "a1", "application_type": "Mining"})),
            Record::from(json!({"id": 2, "application_type": "Forestry"})),
        ];
        let payments = vec![
            Record::from(json!({"created_at": "2025-01-05", "application_id": "a1", "amount": 1000})),
            Record::from(json!({"created_at": "2025-01-06", "application_id": 2, "amount": 250})),
            Record::from(json!({"created_at": "2025-01-07", "application_id": "missing", "amount": 75})),
            Record::from(json!({"created_at": "2024-12-07", "amount": 10})),
        ];
        let series = revenue_by_sector(&payments, &applications, &plan(), "amount");

        let jan = series.last().unwrap();
        assert_eq!(jan.sector("Mining"), 1000.0);
        assert_eq!(jan.sector("Forestry"), 250.0);
        assert_eq!(jan.sector(UNRESOLVED_SECTOR), 75.0);
        assert_eq!(jan.total, 1325.0);

        let dec = &series[series.len() - 2];
        assert_eq!(dec.sector(UNRESOLVED_SECTOR), 10.0);
        assert!(dec.sectors.contains_key("Mining"));
    }

    #[test]
    fn sectors_named_like_fixed_keys_keep_their_revenue() {
        let applications = vec![
            Record::from(json!({"id": "a1", "application_type": "total"})),
            Record::from(json!({"id": "a2", "application_type": "label"})),
            Record::from(json!({"id": "a3", "application_type": "Mining"})),
        ];
        let payments = vec![
            Record::from(json!({"created_at": "2025-01-05", "application_id": "a1", "amount": 100})),
            Record::from(json!({"created_at": "2025-01-06", "application_id": "a2", "amount": 40})),
            Record::from(json!({"created_at": "2025-01-07", "application_id": "a3", "amount": 1000})),
        ];
        let series = revenue_by_sector(&payments, &applications, &plan(), "amount");

        let jan = series.last().unwrap();
        assert_eq!(jan.sector("total"), 100.0);
        assert_eq!(jan.sector("label"), 40.0);
        assert_eq!(jan.total, 1140.0);

        let json = serde_json::to_value(jan).unwrap();
        assert_eq!(json["label"], "Jan");
        assert_eq!(json["total"], 1140.0);
        assert_eq!(json["sectors"]["total"], 100.0);
        assert_eq!(json["sectors"]["label"], 40.0);
    }

    #[test]
    fn building_twice_is_identical() {
        let rows = vec![
            Record::from(json!({"created_at": "2024-11-10", "status": "approved"})),
            Record::from(json!({"created_at": "2025-01-03", "status": "pending"})),
        ];
        let plan = plan();
        assert_eq!(
            build_series(&rows, &plan, "created_at", &METRICS),
            build_series(&rows, &plan, "created_at", &METRICS)
        );
    }
}
