use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use super::{percentage, round2};
use crate::models::{
    CommonRecommendation, FieldDetail, ScheduledQueriesDetailTable, ScheduledQueriesDocument,
    ScheduledQueriesMovement, ScheduledQueriesMovementRow, TimeRange, TransformerContext,
};

const SCHEDULED_QUERIES_RECOMMENDATION: &str = "Move Scheduled Queries to Off-Peak Hours";

/// Scheduled jobs that could run outside reservation peaks.
///
/// Every row carries the same daily savings estimate for the whole set, so
/// only the first row's figure is used.
pub(super) fn transform(
    rows: &[ScheduledQueriesMovementRow],
    time_range: TimeRange,
    ctx: &TransformerContext,
    now: DateTime<Utc>,
) -> ScheduledQueriesDocument {
    let savings_price = rows
        .first()
        .map(|row| round2(row.savings_price * ctx.discount * time_range.days() as f64))
        .unwrap_or_default();

    let detailed_table = rows
        .iter()
        .map(|row| ScheduledQueriesDetailTable {
            job_id: row.job_id.clone(),
            location: row.location.clone(),
            billing_project_id: row.billing_project_id.clone(),
            scheduled_time: row.scheduled_time.clone(),
            all_jobs: row.all_jobs,
            slots: row.slots,
        })
        .collect();

    ScheduledQueriesDocument {
        data: ScheduledQueriesMovement {
            detailed_table,
            detailed_table_fields_mapping: fields_mapping(),
            common: CommonRecommendation {
                recommendation: SCHEDULED_QUERIES_RECOMMENDATION.to_string(),
                savings_percentage: percentage(
                    savings_price,
                    ctx.total_scan_price(time_range),
                ),
                savings_price,
            },
        },
        last_update: now,
    }
}

fn fields_mapping() -> BTreeMap<String, FieldDetail> {
    BTreeMap::from([
        ("jobId".into(), FieldDetail::titled(0, true, "Query ID")),
        ("location".into(), FieldDetail::titled(1, false, "location")),
        (
            "billingProjectId".into(),
            FieldDetail::titled(2, false, "billingProjectId"),
        ),
        (
            "scheduledTime".into(),
            FieldDetail::titled(3, true, "Scheduled time"),
        ),
        ("allJobs".into(), FieldDetail::titled(4, true, "Jobs Executions")),
        ("slots".into(), FieldDetail::titled(5, true, "Average Slots Used")),
    ])
}
