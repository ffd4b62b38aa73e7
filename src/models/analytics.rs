//! Aggregate shapes handed to the charting front end.

use std::collections::BTreeMap;

use serde::Serialize;

/// Display palette cycled by a slice's position in sorted output.
pub const PALETTE: [&str; 8] = [
    "#2563eb", "#16a34a", "#f59e0b", "#dc2626", "#7c3aed", "#0891b2", "#db2777", "#65a30d",
];

/// Counts by status plus monetary sums, recomputed on every fetch.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SummaryStat {
    pub total: u64,
    pub by_status: BTreeMap<String, u64>,
    pub sums: BTreeMap<String, f64>,
}

impl SummaryStat {
    pub fn count(&self, bucket: &str) -> u64 {
        self.by_status.get(bucket).copied().unwrap_or(0)
    }

    pub fn sum(&self, field: &str) -> f64 {
        self.sums.get(field).copied().unwrap_or(0.0)
    }
}

/// One category's aggregate value plus its display color.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DistributionSlice {
    pub name: String,
    pub value: f64,
    pub color: &'static str,
}

/// One labeled trend bucket with its named metrics flattened alongside.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesPoint {
    pub label: String,
    #[serde(flatten)]
    pub metrics: BTreeMap<String, f64>,
}

impl SeriesPoint {
    pub fn metric(&self, name: &str) -> f64 {
        self.metrics.get(name).copied().unwrap_or(0.0)
    }
}

/// One trend bucket of revenue split by sector. Sector names are free-form
/// data, so they stay in their own map rather than beside `label`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SectorPoint {
    pub label: String,
    pub sectors: BTreeMap<String, f64>,
    pub total: f64,
}

impl SectorPoint {
    pub fn sector(&self, name: &str) -> f64 {
        self.sectors.get(name).copied().unwrap_or(0.0)
    }
}

/// One projected month of revenue.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastPoint {
    pub label: String,
    pub renewals: u64,
    pub renewal_revenue: f64,
    pub annual_fees: f64,
    pub projected_total: f64,
}

/// A dashboard section that degrades on its own when its query fails.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "data", rename_all = "snake_case")]
pub enum Panel<T> {
    Ready(T),
    Unavailable { reason: String },
}

impl<T> Panel<T> {
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::Unavailable {
            reason: reason.into(),
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }

    pub fn ready(&self) -> Option<&T> {
        match self {
            Self::Ready(value) => Some(value),
            Self::Unavailable { .. } => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Panel<U> {
        match self {
            Self::Ready(value) => Panel::Ready(f(value)),
            Self::Unavailable { reason } => Panel::Unavailable { reason },
        }
    }

    pub fn as_ref(&self) -> Panel<&T> {
        match self {
            Self::Ready(value) => Panel::Ready(value),
            Self::Unavailable { reason } => Panel::Unavailable {
                reason: reason.clone(),
            },
        }
    }

    /// Pair two panels; the result is unavailable if either input is.
    pub fn zip<'a, U>(&'a self, other: &'a Panel<U>) -> Panel<(&'a T, &'a U)> {
        match (self, other) {
            (Self::Ready(a), Panel::Ready(b)) => Panel::Ready((a, b)),
            (Self::Unavailable { reason }, _) | (_, Panel::Unavailable { reason }) => {
                Panel::Unavailable {
                    reason: reason.clone(),
                }
            }
        }
    }
}
