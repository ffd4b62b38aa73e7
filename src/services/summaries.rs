//! Per-domain KPI summaries built on the generic reducer.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::record::Record;
use crate::services::reducer::{
    average_non_null, is_overdue, rate, reduce, round1, ReducerSchema, StatusBucket, OTHER_BUCKET,
};

const PERMIT_SCHEMA: ReducerSchema<'static> = ReducerSchema {
    buckets: &[
        StatusBucket {
            name: "approved",
            accepts: &["approved", "issued"],
        },
        StatusBucket {
            name: "pending",
            accepts: &["pending", "submitted", "under_review"],
        },
        StatusBucket {
            name: "rejected",
            accepts: &["rejected", "declined"],
        },
    ],
    sum_fields: &["fee_amount"],
    exhaustive: true,
};

const INVOICE_SCHEMA: ReducerSchema<'static> = ReducerSchema {
    buckets: &[
        StatusBucket {
            name: "paid",
            accepts: &["paid"],
        },
        StatusBucket {
            name: "pending",
            accepts: &["pending", "unpaid", "partially_paid"],
        },
        StatusBucket {
            name: "cancelled",
            accepts: &["cancelled"],
        },
    ],
    sum_fields: &["amount"],
    exhaustive: true,
};

/// Display percentage reported on the summaries.
fn percent(numerator: f64, denominator: f64) -> f64 {
    round1(rate(numerator, denominator))
}

/// Invoice statuses that can no longer become overdue.
const INVOICE_SETTLED: &[&str] = &["paid", "cancelled"];

const INSPECTION_SCHEMA: ReducerSchema<'static> = ReducerSchema {
    buckets: &[
        StatusBucket {
            name: "scheduled",
            accepts: &["scheduled"],
        },
        StatusBucket {
            name: "passed",
            accepts: &["passed"],
        },
        StatusBucket {
            name: "failed",
            accepts: &["failed"],
        },
        StatusBucket {
            name: "completed",
            accepts: &["completed"],
        },
        StatusBucket {
            name: "cancelled",
            accepts: &["cancelled"],
        },
    ],
    sum_fields: &[],
    exhaustive: true,
};

const INSPECTION_CLOSED: &[&str] = &["passed", "failed", "completed", "cancelled"];

const ENTITY_SCHEMA: ReducerSchema<'static> = ReducerSchema {
    buckets: &[
        StatusBucket {
            name: "active",
            accepts: &["active", "registered"],
        },
        StatusBucket {
            name: "suspended",
            accepts: &["suspended"],
        },
        StatusBucket {
            name: "pending",
            accepts: &["pending"],
        },
    ],
    sum_fields: &[],
    exhaustive: true,
};

const TASK_SCHEMA: ReducerSchema<'static> = ReducerSchema {
    buckets: &[
        StatusBucket {
            name: "completed",
            accepts: &["completed"],
        },
        StatusBucket {
            name: "in_progress",
            accepts: &["in_progress"],
        },
        StatusBucket {
            name: "pending",
            accepts: &["pending"],
        },
    ],
    sum_fields: &[],
    exhaustive: true,
};

const TASK_DONE: &[&str] = &["completed"];

const REPORT_SCHEMA: ReducerSchema<'static> = ReducerSchema {
    buckets: &[
        StatusBucket {
            name: "submitted",
            accepts: &["submitted"],
        },
        StatusBucket {
            name: "approved",
            accepts: &["approved", "accepted"],
        },
        StatusBucket {
            name: "rejected",
            accepts: &["rejected"],
        },
    ],
    sum_fields: &[],
    exhaustive: true,
};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PermitSummary {
    pub total: u64,
    pub approved: u64,
    pub pending: u64,
    pub rejected: u64,
    pub other: u64,
    pub approval_rate: f64,
    pub fees_total: f64,
}

pub fn summarize_permits(rows: &[Record]) -> PermitSummary {
    let stat = reduce(rows, &PERMIT_SCHEMA);
    let approved = stat.count("approved");
    PermitSummary {
        total: stat.total,
        approved,
        pending: stat.count("pending"),
        rejected: stat.count("rejected"),
        other: stat.count(OTHER_BUCKET),
        approval_rate: percent(approved as f64, stat.total as f64),
        fees_total: stat.sum("fee_amount"),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InvoiceSummary {
    pub total: u64,
    pub paid: u64,
    pub pending: u64,
    pub cancelled: u64,
    pub overdue: u64,
    pub total_invoiced: f64,
    pub total_collected: f64,
    pub outstanding: f64,
    pub collection_rate: f64,
}

/// Amount collected on one invoice: `amount_paid` when recorded, else the
/// full amount for paid invoices.
fn collected(row: &Record) -> f64 {
    match row.get_f64("amount_paid") {
        Some(paid) => paid,
        None if row.status() == Some("paid") => row.amount("amount"),
        None => 0.0,
    }
}

pub fn summarize_invoices(rows: &[Record], now: DateTime<Utc>) -> InvoiceSummary {
    let stat = reduce(rows, &INVOICE_SCHEMA);
    let overdue = rows
        .iter()
        .filter(|r| is_overdue(r, "due_date", INVOICE_SETTLED, now))
        .count() as u64;
    let total_invoiced = stat.sum("amount");
    let total_collected: f64 = rows.iter().map(collected).sum();

    InvoiceSummary {
        total: stat.total,
        paid: stat.count("paid"),
        pending: stat.count("pending"),
        cancelled: stat.count("cancelled"),
        overdue,
        total_invoiced,
        total_collected,
        outstanding: (total_invoiced - total_collected).max(0.0),
        collection_rate: percent(total_collected, total_invoiced),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InspectionSummary {
    pub total: u64,
    pub scheduled: u64,
    pub completed: u64,
    pub passed: u64,
    pub failed: u64,
    pub cancelled: u64,
    pub overdue: u64,
    pub average_score: f64,
    pub pass_rate: f64,
}

pub fn summarize_inspections(rows: &[Record], now: DateTime<Utc>) -> InspectionSummary {
    let stat = reduce(rows, &INSPECTION_SCHEMA);
    let passed = stat.count("passed");
    let failed = stat.count("failed");
    let overdue = rows
        .iter()
        .filter(|r| is_overdue(r, "scheduled_date", INSPECTION_CLOSED, now))
        .count() as u64;

    InspectionSummary {
        total: stat.total,
        scheduled: stat.count("scheduled"),
        completed: passed + failed + stat.count("completed"),
        passed,
        failed,
        cancelled: stat.count("cancelled"),
        overdue,
        average_score: round1(average_non_null(rows, "score")),
        pass_rate: percent(passed as f64, (passed + failed) as f64),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntitySummary {
    pub total: u64,
    pub active: u64,
    pub suspended: u64,
    pub pending: u64,
    pub other: u64,
    pub active_rate: f64,
}

pub fn summarize_entities(rows: &[Record]) -> EntitySummary {
    let stat = reduce(rows, &ENTITY_SCHEMA);
    let active = stat.count("active");
    EntitySummary {
        total: stat.total,
        active,
        suspended: stat.count("suspended"),
        pending: stat.count("pending"),
        other: stat.count(OTHER_BUCKET),
        active_rate: percent(active as f64, stat.total as f64),
    }
}

/// Service-level classification of one workflow task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SlaStatus {
    OnTime,
    Delayed,
    Open,
}

/// Completed on or before its due date (or with no due date) is on time.
/// Completed late, or still open past due, is delayed.
pub fn classify_sla(task: &Record, now: DateTime<Utc>) -> SlaStatus {
    let due = task.get_timestamp("due_date");
    if task.status().is_some_and(|s| TASK_DONE.contains(&s)) {
        match (task.get_timestamp("completed_at"), due) {
            (Some(done), Some(due)) if done > due => SlaStatus::Delayed,
            _ => SlaStatus::OnTime,
        }
    } else if is_overdue(task, "due_date", TASK_DONE, now) {
        SlaStatus::Delayed
    } else {
        SlaStatus::Open
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskSummary {
    pub total: u64,
    pub completed: u64,
    pub in_progress: u64,
    pub pending: u64,
    pub overdue: u64,
    pub on_time: u64,
    pub delayed: u64,
    pub sla_compliance_rate: f64,
}

pub fn summarize_tasks(rows: &[Record], now: DateTime<Utc>) -> TaskSummary {
    let stat = reduce(rows, &TASK_SCHEMA);
    let mut overdue = 0;
    let mut on_time = 0;
    let mut delayed = 0;
    for row in rows {
        if is_overdue(row, "due_date", TASK_DONE, now) {
            overdue += 1;
        }
        match classify_sla(row, now) {
            SlaStatus::OnTime => on_time += 1,
            SlaStatus::Delayed => delayed += 1,
            SlaStatus::Open => {}
        }
    }

    TaskSummary {
        total: stat.total,
        completed: stat.count("completed"),
        in_progress: stat.count("in_progress"),
        pending: stat.count("pending"),
        overdue,
        on_time,
        delayed,
        sla_compliance_rate: percent(on_time as f64, (on_time + delayed) as f64),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportSummary {
    pub total: u64,
    pub submitted: u64,
    pub approved: u64,
    pub rejected: u64,
    pub other: u64,
}

pub fn summarize_reports(rows: &[Record]) -> ReportSummary {
    let stat = reduce(rows, &REPORT_SCHEMA);
    ReportSummary {
        total: stat.total,
        submitted: stat.count("submitted"),
        approved: stat.count("approved"),
        rejected: stat.count("rejected"),
        other: stat.count(OTHER_BUCKET),
    }
}

/// Completion of one workflow stage across all tasks.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageProgress {
    pub stage: String,
    pub total: u64,
    pub completed: u64,
    pub percent: f64,
}

/// Per-stage completion, in the order stages first appear.
pub fn stage_progress(tasks: &[Record]) -> Vec<StageProgress> {
    let mut stages: Vec<StageProgress> = Vec::new();
    for task in tasks {
        let name = task
            .get_category("stage")
            .unwrap_or_else(|| "Unassigned".to_string());
        let idx = match stages.iter().position(|s| s.stage == name) {
            Some(idx) => idx,
            None => {
                stages.push(StageProgress {
                    stage: name,
                    total: 0,
                    completed: 0,
                    percent: 0.0,
                });
                stages.len() - 1
            }
        };
        stages[idx].total += 1;
        if task.status().is_some_and(|s| TASK_DONE.contains(&s)) {
            stages[idx].completed += 1;
        }
    }
    for stage in &mut stages {
        stage.percent = percent(stage.completed as f64, stage.total as f64);
    }
    stages
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use serde_json::json;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 15, 12, 0, 0).unwrap()
    }

    fn yesterday() -> String {
        (now() - Duration::days(1)).to_rfc3339()
    }

    #[test]
    fn permit_scenario_six_approved_of_ten() {
        let mut rows = Vec::new();
        rows.extend((0..6).map(|_| Record::new().with("status", "approved")));
        rows.extend((0..2).map(|_| Record::new().with("status", "pending")));
        rows.extend((0..2).map(|_| Record::new().with("status", "rejected")));

        let summary = summarize_permits(&rows);
        assert_eq!(summary.total, 10);
        assert_eq!(summary.approved, 6);
        assert_eq!(summary.pending, 2);
        assert_eq!(summary.rejected, 2);
        assert_eq!(summary.other, 0);
        assert_eq!(summary.approval_rate, 60.0);
    }

    #[test]
    fn issued_counts_as_approved() {
        let rows = vec![
            Record::new().with("status", "issued"),
            Record::new().with("status", "under_review"),
        ];
        let summary = summarize_permits(&rows);
        assert_eq!(summary.approved, 1);
        assert_eq!(summary.pending, 1);
    }

    #[test]
    fn pending_invoice_past_due_is_pending_and_overdue() {
        let rows = vec![Record::from(
            json!({"status": "pending", "due_date": yesterday(), "amount": 100.0}),
        )];
        let summary = summarize_invoices(&rows, now());
        assert_eq!(summary.pending, 1);
        assert_eq!(summary.overdue, 1);
    }

    #[test]
    fn paid_invoice_past_due_is_neither_pending_nor_overdue() {
        let rows = vec![Record::from(
            json!({"status": "paid", "due_date": yesterday(), "amount": 100.0}),
        )];
        let summary = summarize_invoices(&rows, now());
        assert_eq!(summary.pending, 0);
        assert_eq!(summary.overdue, 0);
        assert_eq!(summary.paid, 1);
        assert_eq!(summary.total_collected, 100.0);
        assert_eq!(summary.collection_rate, 100.0);
    }

    #[test]
    fn cancelled_invoice_past_due_is_not_overdue() {
        let rows = vec![
            Record::from(json!({"status": "cancelled", "due_date": yesterday(), "amount": 80.0})),
            Record::from(json!({"status": "unpaid", "due_date": yesterday(), "amount": 20.0})),
        ];
        let summary = summarize_invoices(&rows, now());
        assert_eq!(summary.cancelled, 1);
        assert_eq!(summary.overdue, 1);
    }

    #[test]
    fn summary_rates_are_rounded_for_display() {
        let rows = vec![
            Record::from(json!({"status": "active"})),
            Record::from(json!({"status": "pending"})),
            Record::from(json!({"status": "suspended"})),
        ];
        assert_eq!(summarize_entities(&rows).active_rate, 33.3);
    }

    #[test]
    fn no_invoices_collection_rate_is_zero() {
        let summary = summarize_invoices(&[], now());
        assert_eq!(summary.total, 0);
        assert_eq!(summary.collection_rate, 0.0);
        assert!(!summary.collection_rate.is_nan());
    }

    #[test]
    fn partial_payments_use_amount_paid() {
        let rows = vec![
            Record::from(json!({"status": "partially_paid", "amount": 400.0, "amount_paid": 100.0})),
            Record::from(json!({"status": "paid", "amount": 100.0})),
        ];
        let summary = summarize_invoices(&rows, now());
        assert_eq!(summary.total_invoiced, 500.0);
        assert_eq!(summary.total_collected, 200.0);
        assert_eq!(summary.outstanding, 300.0);
        assert_eq!(summary.collection_rate, 40.0);
    }

    #[test]
    fn inspection_average_excludes_unscored() {
        let rows = vec![
            Record::from(json!({"status": "passed", "score": 90})),
            Record::from(json!({"status": "failed", "score": 40})),
            Record::from(json!({"status": "scheduled", "score": null, "scheduled_date": yesterday()})),
        ];
        let summary = summarize_inspections(&rows, now());
        assert_eq!(summary.average_score, 65.0);
        assert_eq!(summary.completed, 2);
        assert_eq!(summary.pass_rate, 50.0);
        assert_eq!(summary.overdue, 1);
    }

    #[test]
    fn entity_active_rate() {
        let rows = vec![
            Record::new().with("status", "active"),
            Record::new().with("status", "registered"),
            Record::new().with("status", "suspended"),
            Record::new().with("status", "dissolved"),
        ];
        let summary = summarize_entities(&rows);
        assert_eq!(summary.active, 2);
        assert_eq!(summary.other, 1);
        assert_eq!(summary.active_rate, 50.0);
    }

    #[test]
    fn sla_classification() {
        let due = "2025-06-10T00:00:00Z";
        let on_time = Record::from(
            json!({"status": "completed", "due_date": due, "completed_at": "2025-06-09T00:00:00Z"}),
        );
        let late = Record::from(
            json!({"status": "completed", "due_date": due, "completed_at": "2025-06-11T00:00:00Z"}),
        );
        let open_overdue = Record::from(json!({"status": "in_progress", "due_date": due}));
        let open = Record::from(json!({"status": "pending", "due_date": "2025-07-01"}));

        assert_eq!(classify_sla(&on_time, now()), SlaStatus::OnTime);
        assert_eq!(classify_sla(&late, now()), SlaStatus::Delayed);
        assert_eq!(classify_sla(&open_overdue, now()), SlaStatus::Delayed);
        assert_eq!(classify_sla(&open, now()), SlaStatus::Open);

        let summary = summarize_tasks(&[on_time, late, open_overdue, open], now());
        assert_eq!(summary.overdue, 1);
        assert_eq!(summary.on_time, 1);
        assert_eq!(summary.delayed, 2);
        assert_eq!(summary.sla_compliance_rate, 33.3);
    }

    #[test]
    fn stage_progress_keeps_first_seen_order() {
        let rows = vec![
            Record::from(json!({"stage": "intake", "status": "completed"})),
            Record::from(json!({"stage": "assessment", "status": "pending"})),
            Record::from(json!({"stage": "intake", "status": "in_progress"})),
            Record::from(json!({"status": "completed"})),
        ];
        let progress = stage_progress(&rows);
        let names: Vec<&str> = progress.iter().map(|p| p.stage.as_str()).collect();
        assert_eq!(names, ["intake", "assessment", "Unassigned"]);
        assert_eq!(progress[0].percent, 50.0);
        assert_eq!(progress[1].percent, 0.0);
        assert_eq!(progress[2].percent, 100.0);
    }

    #[test]
    fn report_counts() {
        let rows = vec![
            Record::new().with("status", "accepted"),
            Record::new().with("status", "submitted"),
        ];
        let summary = summarize_reports(&rows);
        assert_eq!(summary.approved, 1);
        assert_eq!(summary.submitted, 1);
        assert_eq!(summary.total, 2);
    }
}
