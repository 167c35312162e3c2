use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use super::percentage;
use crate::models::{CostFromTableTypeDocument, CostFromTableTypesRow, TableTypeCost, TableValue};

/// Groups scanned volume by table type, with each type's share of the total.
pub(super) fn transform(rows: &[CostFromTableTypesRow], now: DateTime<Utc>) -> CostFromTableTypeDocument {
    let mut data: BTreeMap<String, TableTypeCost> = BTreeMap::new();
    let mut total = 0.0;

    for row in rows {
        let tb = row.total_tb.unwrap_or_default();
        total += tb;

        let entry = data.entry(row.table_type.clone()).or_default();
        entry.tb += tb;
        entry.tables.push(TableValue {
            table_name: row.table_name.clone(),
            value: tb,
        });
    }

    for entry in data.values_mut() {
        entry.percentage = percentage(entry.tb, total);
    }

    CostFromTableTypeDocument {
        data,
        last_update: now,
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn test_tables_accumulate_under_their_type() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let rows = vec![
            CostFromTableTypesRow {
                table_name: Some("t1".into()),
                table_type: "clustered".into(),
                total_tb: Some(1.5),
            },
            CostFromTableTypesRow {
                table_name: None,
                table_type: "clustered".into(),
                total_tb: None,
            },
        ];

        let doc = transform(&rows, now);
        let clustered = &doc.data["clustered"];
        assert_eq!(clustered.tb, 1.5);
        assert_eq!(clustered.percentage, 100.0);
        assert_eq!(clustered.tables.len(), 2);
        assert_eq!(clustered.tables[1].table_name, None);
    }

    #[test]
    fn test_all_zero_volume_yields_zero_percentages() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let rows = vec![
            CostFromTableTypesRow {
                table_name: Some("t1".into()),
                table_type: "clustered".into(),
                total_tb: Some(0.0),
            },
            CostFromTableTypesRow {
                table_name: Some("t2".into()),
                table_type: "partitioned".into(),
                total_tb: Some(0.0),
            },
        ];

        let doc = transform(&rows, now);
        assert!(doc.data.values().all(|t| t.percentage == 0.0));
        assert!(transform(&[], now).data.is_empty());
    }
}
