//! Heuristic twelve-month revenue projection from active permits.
//!
//! The constants here are business estimates, not a fitted model. They are
//! exposed as [`ForecastSettings`] so operators can tune them.

use chrono::{DateTime, Months, Utc};

use crate::models::analytics::ForecastPoint;
use crate::models::record::Record;
use crate::services::date_range::BucketPlan;

#[derive(Debug, Clone, PartialEq)]
pub struct ForecastSettings {
    /// Share of the average fee billed yearly per active permit.
    pub annual_fee_ratio: f64,
    /// Fee assumed when no active permit records one.
    pub fallback_fee: f64,
    /// Multiplier per projected quarter; later quarters use 1.0.
    pub quarter_multipliers: Vec<f64>,
    pub horizon_months: u32,
    pub fee_field: String,
    pub expiry_field: String,
}

impl Default for ForecastSettings {
    fn default() -> Self {
        Self {
            annual_fee_ratio: 0.10,
            fallback_fee: 5000.0,
            quarter_multipliers: vec![1.5, 1.2],
            horizon_months: 12,
            fee_field: "fee_amount".to_string(),
            expiry_field: "expiry_date".to_string(),
        }
    }
}

impl ForecastSettings {
    /// Seasonal multiplier for the projected month at `offset` (0-based).
    pub fn multiplier(&self, offset: usize) -> f64 {
        self.quarter_multipliers
            .get(offset / 3)
            .copied()
            .unwrap_or(1.0)
    }
}

/// Renewal date: explicit expiry, else one year after creation.
fn renewal_date(row: &Record, settings: &ForecastSettings) -> Option<DateTime<Utc>> {
    row.get_timestamp(&settings.expiry_field).or_else(|| {
        row.created_at()
            .and_then(|created| created.checked_add_months(Months::new(12)))
    })
}

/// Average recorded fee across the rows, or the flat fallback when none has one.
pub fn average_fee(rows: &[Record], settings: &ForecastSettings) -> f64 {
    let fees: Vec<f64> = rows
        .iter()
        .filter_map(|r| r.get_f64(&settings.fee_field))
        .collect();
    if fees.is_empty() {
        settings.fallback_fee
    } else {
        fees.iter().sum::<f64>() / fees.len() as f64
    }
}

/// Project renewals and annual fees for the months after `now`.
pub fn project(
    active: &[Record],
    now: DateTime<Utc>,
    settings: &ForecastSettings,
) -> Vec<ForecastPoint> {
    let plan = BucketPlan::upcoming_months(now, settings.horizon_months);
    let avg_fee = average_fee(active, settings);

    let mut renewals = vec![0u64; plan.len()];
    let mut renewal_revenue = vec![0.0f64; plan.len()];
    for row in active {
        let Some(idx) = renewal_date(row, settings).and_then(|ts| plan.index_of(ts)) else {
            continue;
        };
        renewals[idx] += 1;
        renewal_revenue[idx] += row.get_f64(&settings.fee_field).unwrap_or(avg_fee);
    }

    let annual_base = settings.annual_fee_ratio * avg_fee * active.len() as f64;

    plan.buckets()
        .iter()
        .enumerate()
        .map(|(offset, bucket)| {
            let annual_fees = round2(annual_base * settings.multiplier(offset));
            let revenue = round2(renewal_revenue[offset]);
            ForecastPoint {
                label: bucket.label.clone(),
                renewals: renewals[offset],
                renewal_revenue: revenue,
                annual_fees,
                projected_total: round2(revenue + annual_fees),
            }
        })
        .collect()
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 15, 12, 0, 0).unwrap()
    }

    #[test]
    fn multiplier_schedule() {
        let settings = ForecastSettings::default();
        let schedule: Vec<f64> = (0..12).map(|i| settings.multiplier(i)).collect();
        assert_eq!(&schedule[0..3], &[1.5, 1.5, 1.5]);
        assert_eq!(&schedule[3..6], &[1.2, 1.2, 1.2]);
        assert!(schedule[6..].iter().all(|m| *m == 1.0));
    }

    #[test]
    fn empty_portfolio_projects_zero() {
        let points = project(&[], now(), &ForecastSettings::default());
        assert_eq!(points.len(), 12);
        assert!(points.iter().all(|p| p.projected_total == 0.0));
        assert_eq!(points[0].label, "Feb");
    }

    #[test]
    fn no_recorded_fees_use_flat_fallback() {
        let rows = vec![Record::from(json!({"expiry_date": "2025-02-10"}))];
        let settings = ForecastSettings::default();
        assert_eq!(average_fee(&rows, &settings), 5000.0);

        let points = project(&rows, now(), &settings);
        assert_eq!(points[0].renewals, 1);
        assert_eq!(points[0].renewal_revenue, 5000.0);
        // 10% of 5000 for one permit, first-quarter multiplier.
        assert_eq!(points[0].annual_fees, 750.0);
        assert_eq!(points[0].projected_total, 5750.0);
        assert_eq!(points[3].annual_fees, 600.0);
        assert_eq!(points[6].annual_fees, 500.0);
    }

    #[test]
    fn missing_fee_falls_back_to_average() {
        let rows = vec![
            Record::from(json!({"fee_amount": 2000, "expiry_date": "2025-03-01"})),
            Record::from(json!({"fee_amount": 4000, "expiry_date": "2026-06-01"})),
            Record::from(json!({"created_at": "2024-03-20T00:00:00Z"})),
        ];
        let points = project(&rows, now(), &ForecastSettings::default());

        let mar = &points[1];
        assert_eq!(mar.label, "Mar");
        // One explicit renewal (2000) plus one inferred from creation date (average 3000).
        assert_eq!(mar.renewals, 2);
        assert_eq!(mar.renewal_revenue, 5000.0);

        // Expiry beyond the horizon is not projected.
        assert_eq!(points.iter().map(|p| p.renewals).sum::<u64>(), 2);

        // 0.10 * 3000 * 3 rows * 1.5
        assert_eq!(points[0].annual_fees, 1350.0);
    }

    #[test]
    fn custom_settings_apply() {
        let settings = ForecastSettings {
            annual_fee_ratio: 0.2,
            fallback_fee: 1000.0,
            quarter_multipliers: vec![],
            ..ForecastSettings::default()
        };
        let rows = vec![Record::new()];
        let points = project(&rows, now(), &settings);
        assert!(points.iter().all(|p| p.annual_fees == 200.0));
    }
}
