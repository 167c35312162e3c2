//! Reshaping of raw query results into persisted documents.
//!
//! [`transform`] dispatches on the result shape. Edition variants of the
//! reservation queries carry a [`ReservationTier`](crate::models::ReservationTier)
//! and share one body per shape; the tier only decides the output key.

mod cost_from_table_types;
mod scan;
mod scheduled_movement;
mod slots;
mod slots_explorer;
mod storage;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::models::{
    QueryName, RawResult, RecommendationDocument, RecommendationSummary, TimeRange,
    TransformerContext,
};

#[derive(Debug, Error)]
pub enum TransformError {
    #[error("{shape} row {index} is invalid: {reason}")]
    InvalidRow {
        shape: &'static str,
        index: usize,
        reason: String,
    },
}

pub type TransformResult<T> = Result<T, TransformError>;

/// A row a shape transformer cannot use. [`transform`] attaches the shape.
#[derive(Debug)]
pub(super) struct InvalidRow {
    pub index: usize,
    pub reason: String,
}

impl InvalidRow {
    fn in_shape(self, shape: &'static str) -> TransformError {
        TransformError::InvalidRow {
            shape,
            index: self.index,
            reason: self.reason,
        }
    }
}

/// Converts one raw result into its documents for `time_range`.
pub fn transform(
    raw: RawResult,
    time_range: TimeRange,
    ctx: &TransformerContext,
    now: DateTime<Utc>,
) -> TransformResult<RecommendationSummary> {
    use RecommendationDocument as Doc;

    let shape = raw.shape();
    let invalid = |e: InvalidRow| e.in_shape(shape);
    let mut summary = RecommendationSummary::new();
    let mut put = |query: QueryName, doc: RecommendationDocument| {
        summary.insert(query, time_range, doc);
    };

    match raw {
        RawResult::CostFromTableTypes(rows) => put(
            QueryName::CostFromTableTypes,
            Doc::CostFromTableTypes(cost_from_table_types::transform(&rows, now)),
        ),
        RawResult::TableStoragePrice(rows) => put(
            QueryName::TableStoragePrice,
            Doc::StoragePrice(storage::price(&rows, now)),
        ),
        RawResult::DatasetStoragePrice(rows) => put(
            QueryName::DatasetStoragePrice,
            Doc::StoragePrice(storage::price(&rows, now)),
        ),
        RawResult::ProjectStoragePrice(rows) => put(
            QueryName::ProjectStoragePrice,
            Doc::StoragePrice(storage::price(&rows, now)),
        ),
        RawResult::TableStorageTB(rows) => put(
            QueryName::TableStorageTB,
            Doc::StorageTB(storage::size(&rows, now)),
        ),
        RawResult::DatasetStorageTB(rows) => put(
            QueryName::DatasetStorageTB,
            Doc::StorageTB(storage::size(&rows, now)),
        ),
        RawResult::ProjectStorageTB(rows) => put(
            QueryName::ProjectStorageTB,
            Doc::StorageTB(storage::size(&rows, now)),
        ),
        RawResult::StorageSavings(rows) => put(
            QueryName::StorageSavings,
            Doc::StorageSavings(storage::savings(&rows, time_range, ctx, now).map_err(invalid)?),
        ),
        RawResult::ScheduledQueriesMovement { tier, rows } => put(
            tier.scheduled_queries_movement(),
            Doc::ScheduledQueriesMovement(scheduled_movement::transform(
                &rows, time_range, ctx, now,
            )),
        ),
        RawResult::SlotsExplorer { tier, rows } => put(
            tier.slots_explorer(),
            Doc::Explorer(slots_explorer::transform(&rows, now).map_err(invalid)?),
        ),
        RawResult::OnDemandSlotsExplorer(rows) => put(
            QueryName::SlotsExplorerOnDemand,
            Doc::Explorer(slots_explorer::transform(&rows, now).map_err(invalid)?),
        ),
        RawResult::UserSlots { tier, run } => {
            put(tier.user_slots(), Doc::UserSlots(slots::user_slots(&run, now)))
        }
        RawResult::BillingProjectSlots { tier, run } => put(
            tier.billing_project_slots(),
            Doc::BillingProjectSlots(slots::billing_project_slots(&run, now)),
        ),
        RawResult::OnDemandBillingProject(run) => {
            let (price, tb) = scan::billing_project(&run, ctx, now);
            put(QueryName::BillingProjectScanPrice, Doc::ScanPrice(price));
            put(QueryName::BillingProjectScanTB, Doc::ScanTB(tb));
        }
        RawResult::OnDemandUser(run) => {
            let (price, tb) = scan::user(&run, ctx, now);
            put(QueryName::UserScanPrice, Doc::ScanPrice(price));
            put(QueryName::UserScanTB, Doc::ScanTB(tb));
        }
        RawResult::OnDemandProject(run) => {
            let (price, tb) = scan::project(&run, ctx, now);
            put(QueryName::ProjectScanPrice, Doc::ScanPrice(price));
            put(QueryName::ProjectScanTB, Doc::ScanTB(tb));
        }
        RawResult::OnDemandDataset(run) => {
            let (price, tb) = scan::dataset(&run, ctx, now);
            put(QueryName::DatasetScanPrice, Doc::ScanPrice(price));
            put(QueryName::DatasetScanTB, Doc::ScanTB(tb));
        }
        RawResult::OnDemandTable(run) => {
            let (price, tb) = scan::table(&run, ctx, now);
            put(QueryName::TableScanPrice, Doc::ScanPrice(price));
            put(QueryName::TableScanTB, Doc::ScanTB(tb));
        }
    }

    Ok(summary)
}

/// Rounds to two decimals.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// `part` as a percentage of `total`, rounded to two decimals. Zero when the
/// total is zero or not finite.
pub fn percentage(part: f64, total: f64) -> f64 {
    if total == 0.0 || !total.is_finite() {
        return 0.0;
    }
    let value = round2(part / total * 100.0);
    if value.is_finite() { value } else { 0.0 }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::models::{
        CostFromTableTypesRow, OnDemandTableRun, ReservationTier, ScanRow, SlotsExplorerRow,
        UserSlotsRun,
    };

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 18, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_percentage_never_divides_by_zero() {
        assert_eq!(percentage(5.0, 0.0), 0.0);
        assert_eq!(percentage(0.0, 0.0), 0.0);
        assert_eq!(percentage(1.0, f64::NAN), 0.0);
        assert_eq!(percentage(1.0, 3.0), 33.33);
        assert_eq!(round2(66.666), 66.67);
    }

    #[test]
    fn test_cost_from_table_types_scenario() {
        let rows = vec![
            CostFromTableTypesRow {
                table_name: Some("a".into()),
                table_type: "clustered".into(),
                total_tb: Some(1.0),
            },
            CostFromTableTypesRow {
                table_name: Some("b".into()),
                table_type: "noPartition".into(),
                total_tb: Some(2.0),
            },
        ];

        let summary = transform(
            RawResult::CostFromTableTypes(rows),
            TimeRange::Month,
            &TransformerContext::default(),
            now(),
        )
        .unwrap();

        let Some(RecommendationDocument::CostFromTableTypes(doc)) =
            summary.get(QueryName::CostFromTableTypes, TimeRange::Month)
        else {
            panic!("missing document");
        };
        assert_eq!(doc.data["clustered"].percentage, 33.33);
        assert_eq!(doc.data["noPartition"].percentage, 66.67);
        assert_eq!(doc.last_update, now());
    }

    #[test]
    fn test_edition_results_are_keyed_by_tier() {
        let summary = transform(
            RawResult::UserSlots {
                tier: ReservationTier::EnterprisePlus,
                run: UserSlotsRun::default(),
            },
            TimeRange::Week,
            &TransformerContext::default(),
            now(),
        )
        .unwrap();

        assert!(
            summary
                .get(QueryName::EnterprisePlusUserSlots, TimeRange::Week)
                .is_some()
        );
        assert!(summary.get(QueryName::UserSlots, TimeRange::Week).is_none());
    }

    #[test]
    fn test_scan_results_produce_price_and_volume_documents() {
        let run = OnDemandTableRun {
            tables: vec![ScanRow {
                project_id: "p".into(),
                dataset_id: "d".into(),
                table_id: "t".into(),
                scan_tb: Some(2.0),
                ..Default::default()
            }],
            ..Default::default()
        };

        let summary = transform(
            RawResult::OnDemandTable(run),
            TimeRange::Day,
            &TransformerContext::default(),
            now(),
        )
        .unwrap();

        let keys: Vec<_> = summary.queries().collect();
        assert_eq!(keys, vec![QueryName::TableScanPrice, QueryName::TableScanTB]);
    }

    #[test]
    fn test_invalid_row_names_the_result_shape() {
        let rows = vec![SlotsExplorerRow {
            day: None,
            hour: 30,
            avg_slots: 1.0,
            max_slots: 1.0,
        }];

        let err = transform(
            RawResult::OnDemandSlotsExplorer(rows.clone()),
            TimeRange::Day,
            &TransformerContext::default(),
            now(),
        )
        .unwrap_err();
        assert_eq!(
            err.to_string(),
            "OnDemandSlotsExplorer row 0 is invalid: hour 30 out of range"
        );

        let err = transform(
            RawResult::SlotsExplorer {
                tier: ReservationTier::Standard,
                rows,
            },
            TimeRange::Day,
            &TransformerContext::default(),
            now(),
        )
        .unwrap_err();
        assert!(err.to_string().starts_with("SlotsExplorer row 0"));
    }
}
