//! Period resolution and trend bucketing.
//!
//! Calendar-relative periods are computed from the injected `now`, so two
//! calls a second apart may differ. Monthly trends always span the twelve
//! months ending at the current month, independent of the filter range.

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use serde::Serialize;

use crate::models::period::{DateRange, Period};

/// Number of slots in a monthly trend chart.
pub const TREND_MONTHS: u32 = 12;

/// Number of slots in a daily trend chart.
pub const TREND_DAYS: i64 = 7;

/// Floor used for `all-time`: a fixed sentinel, not the earliest record.
pub fn all_time_start() -> DateTime<Utc> {
    month_start(2020, 1)
}

/// Resolve a period keyword to a concrete range relative to `now`.
pub fn resolve(period: Period, now: DateTime<Utc>) -> DateRange {
    match period {
        Period::Weekly => DateRange::new(now - Duration::days(7), now),
        Period::Monthly => DateRange::new(now - Duration::days(30), now),
        Period::Quarterly => DateRange::new(now - Duration::days(90), now),
        Period::Yearly => DateRange::new(now - Duration::days(365), now),
        Period::Mtd => DateRange::new(month_start(now.year(), now.month()), now),
        Period::Ytd => DateRange::new(month_start(now.year(), 1), now),
        Period::LastYear => DateRange::new(
            month_start(now.year() - 1, 1),
            month_start(now.year(), 1) - Duration::milliseconds(1),
        ),
        Period::AllTime => DateRange::new(all_time_start(), now),
    }
}

/// One labeled trend slot covering `[start, end)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Bucket {
    pub label: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// Ordered, contiguous trend slots plus the assignment function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BucketPlan {
    buckets: Vec<Bucket>,
}

impl BucketPlan {
    /// Trend plan for a dashboard period.
    ///
    /// `weekly` gets daily slots ending at the range end. Every other period
    /// gets the fixed trailing twelve months ending at `now`'s month.
    pub fn for_period(period: Period, range: &DateRange, now: DateTime<Utc>) -> Self {
        match period {
            Period::Weekly => Self::daily(range.end, TREND_DAYS),
            _ => Self::trailing_months(now, TREND_MONTHS),
        }
    }

    /// `count` months ending with (and including) the month of `now`.
    pub fn trailing_months(now: DateTime<Utc>, count: u32) -> Self {
        let (year, month) = shift_month(now.year(), now.month(), -(count as i32 - 1));
        Self::months_from(year, month, count)
    }

    /// `count` months starting the month after `now`.
    pub fn upcoming_months(now: DateTime<Utc>, count: u32) -> Self {
        let (year, month) = shift_month(now.year(), now.month(), 1);
        Self::months_from(year, month, count)
    }

    fn months_from(year: i32, month: u32, count: u32) -> Self {
        let buckets = (0..count as i32)
            .map(|offset| {
                let (y, m) = shift_month(year, month, offset);
                let (next_y, next_m) = shift_month(y, m, 1);
                let start = month_start(y, m);
                Bucket {
                    label: start.format("%b").to_string(),
                    start,
                    end: month_start(next_y, next_m),
                }
            })
            .collect();
        Self { buckets }
    }

    /// `count` calendar days ending with the day of `end`.
    pub fn daily(end: DateTime<Utc>, count: i64) -> Self {
        let last_day = day_start(end.date_naive());
        let buckets = (0..count)
            .rev()
            .map(|back| {
                let start = last_day - Duration::days(back);
                Bucket {
                    label: start.format("%a %d").to_string(),
                    start,
                    end: start + Duration::days(1),
                }
            })
            .collect();
        Self { buckets }
    }

    pub fn buckets(&self) -> &[Bucket] {
        &self.buckets
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    pub fn labels(&self) -> Vec<String> {
        self.buckets.iter().map(|b| b.label.clone()).collect()
    }

    /// Whole instant span the plan covers, for fetching trend rows.
    pub fn span(&self) -> Option<DateRange> {
        let first = self.buckets.first()?;
        let last = self.buckets.last()?;
        Some(DateRange::new(
            first.start,
            last.end - Duration::milliseconds(1),
        ))
    }

    /// Slot holding `ts`, or `None` when it falls outside the plan.
    pub fn index_of(&self, ts: DateTime<Utc>) -> Option<usize> {
        let idx = self.buckets.partition_point(|b| b.end <= ts);
        self.buckets
            .get(idx)
            .filter(|b| b.start <= ts)
            .map(|_| idx)
    }
}

/// Labels of the trend slots for a period.
pub fn bucket_labels(period: Period, range: &DateRange, now: DateTime<Utc>) -> Vec<String> {
    BucketPlan::for_period(period, range, now).labels()
}

/// Trend slot a timestamp lands in for a period.
pub fn bucket_index(
    ts: DateTime<Utc>,
    period: Period,
    range: &DateRange,
    now: DateTime<Utc>,
) -> Option<usize> {
    BucketPlan::for_period(period, range, now).index_of(ts)
}

pub(crate) fn month_start(year: i32, month: u32) -> DateTime<Utc> {
    NaiveDate::from_ymd_opt(year, month, 1)
        .map(day_start)
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

pub(crate) fn shift_month(year: i32, month: u32, delta: i32) -> (i32, u32) {
    let total = year * 12 + month as i32 - 1 + delta;
    (total.div_euclid(12), total.rem_euclid(12) as u32 + 1)
}

fn day_start(date: NaiveDate) -> DateTime<Utc> {
    date.and_hms_opt(0, 0, 0)
        .map(|naive| naive.and_utc())
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}
