//! Generic single-pass statistic reducer.
//!
//! A schema lists status buckets (each an acceptance set matched by exact
//! string equality) and monetary fields to sum. Buckets are counted
//! independently; `total == Σ by_status` holds when the buckets are mutually
//! exclusive and the schema is exhaustive.

use chrono::{DateTime, Utc};

use crate::models::analytics::SummaryStat;
use crate::models::record::Record;

/// Bucket receiving rows that match no listed status in an exhaustive schema.
pub const OTHER_BUCKET: &str = "other";

/// One named status bucket and the raw statuses it accepts.
#[derive(Debug, Clone, Copy)]
pub struct StatusBucket<'a> {
    pub name: &'a str,
    pub accepts: &'a [&'a str],
}

impl StatusBucket<'_> {
    pub fn matches(&self, record: &Record) -> bool {
        record
            .status()
            .is_some_and(|status| self.accepts.contains(&status))
    }
}

/// Fixed summary shape for one domain.
#[derive(Debug, Clone, Copy)]
pub struct ReducerSchema<'a> {
    pub buckets: &'a [StatusBucket<'a>],
    pub sum_fields: &'a [&'a str],
    pub exhaustive: bool,
}

/// Fold rows into counts by status bucket and sums of monetary fields.
pub fn reduce(rows: &[Record], schema: &ReducerSchema<'_>) -> SummaryStat {
    let mut stat = SummaryStat {
        total: rows.len() as u64,
        ..SummaryStat::default()
    };
    for bucket in schema.buckets {
        stat.by_status.insert(bucket.name.to_string(), 0);
    }
    if schema.exhaustive {
        stat.by_status.insert(OTHER_BUCKET.to_string(), 0);
    }
    for field in schema.sum_fields {
        stat.sums.insert(field.to_string(), 0.0);
    }

    for row in rows {
        let mut matched = false;
        for bucket in schema.buckets {
            if bucket.matches(row) {
                matched = true;
                *stat.by_status.entry(bucket.name.to_string()).or_default() += 1;
            }
        }
        if schema.exhaustive && !matched {
            *stat.by_status.entry(OTHER_BUCKET.to_string()).or_default() += 1;
        }
        for field in schema.sum_fields {
            *stat.sums.entry(field.to_string()).or_default() += row.amount(field);
        }
    }

    stat
}

/// Percentage `numerator / denominator * 100`, unrounded.
///
/// A zero (or non-finite) denominator yields 0, never NaN or infinity.
pub fn rate(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 || !denominator.is_finite() || !numerator.is_finite() {
        return 0.0;
    }
    numerator / denominator * 100.0
}

/// Mean of a field over rows where it is present. Rows with null values are not counted.
pub fn average_non_null(rows: &[Record], field: &str) -> f64 {
    let (sum, count) = rows
        .iter()
        .filter_map(|r| r.get_f64(field))
        .fold((0.0, 0u64), |(sum, count), v| (sum + v, count + 1));
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

/// A row is overdue when its status is not terminal and its due timestamp is strictly past.
pub fn is_overdue(
    record: &Record,
    due_field: &str,
    terminal: &[&str],
    now: DateTime<Utc>,
) -> bool {
    let finished = record.status().is_some_and(|s| terminal.contains(&s));
    !finished && record.get_timestamp(due_field).is_some_and(|due| due < now)
}

/// Round to one decimal place for display.
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
