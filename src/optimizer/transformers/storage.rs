use std::collections::BTreeMap;

use chrono::{DateTime, SecondsFormat, Utc};

use super::{InvalidRow, percentage};
use crate::models::{
    CommonRecommendation, CommonStorageSavings, FieldDetail, StoragePriceDocument,
    StoragePriceEntry, StoragePriceRow, StorageRecommendationsRow, StorageSavings,
    StorageSavingsDetailTable, StorageSavingsDocument, StorageTBDocument, StorageTBEntry,
    StorageTBRow, TimeRange, TransformerContext,
};

const STORAGE_SAVINGS_RECOMMENDATION: &str = "Backup and Remove Unused Tables";

/// Storage cost rows are monthly; this converts them to the window.
const DAYS_PER_BILLING_MONTH: f64 = 30.0;

/// Document id of a storage entity: `project`, `project:dataset` or
/// `project:dataset.table`.
pub(super) fn entity_key(project: &str, dataset: Option<&str>, table: Option<&str>) -> String {
    match (dataset, table) {
        (Some(dataset), Some(table)) => format!("{project}:{dataset}.{table}"),
        (Some(dataset), None) => format!("{project}:{dataset}"),
        _ => project.to_string(),
    }
}

pub(super) fn price(rows: &[StoragePriceRow], now: DateTime<Utc>) -> StoragePriceDocument {
    rows.iter()
        .map(|row| {
            let key = entity_key(
                &row.project_id,
                row.dataset_id.as_deref(),
                row.table_id.as_deref(),
            );
            let entry = StoragePriceEntry {
                project_id: row.project_id.clone(),
                dataset_id: row.dataset_id.clone(),
                table_id: row.table_id.clone(),
                storage_price: row.storage_price.unwrap_or_default(),
                short_term_storage_price: row.short_term_storage_price.unwrap_or_default(),
                long_term_storage_price: row.long_term_storage_price.unwrap_or_default(),
                last_update: now,
            };
            (key, entry)
        })
        .collect()
}

pub(super) fn size(rows: &[StorageTBRow], now: DateTime<Utc>) -> StorageTBDocument {
    rows.iter()
        .map(|row| {
            let key = entity_key(
                &row.project_id,
                row.dataset_id.as_deref(),
                row.table_id.as_deref(),
            );
            let entry = StorageTBEntry {
                project_id: row.project_id.clone(),
                dataset_id: row.dataset_id.clone(),
                table_id: row.table_id.clone(),
                storage_tb: row.storage_tb.unwrap_or_default(),
                short_term_storage_tb: row.short_term_storage_tb.unwrap_or_default(),
                long_term_storage_tb: row.long_term_storage_tb.unwrap_or_default(),
                last_update: now,
            };
            (key, entry)
        })
        .collect()
}

/// Unused tables whose removal would save storage cost, most expensive
/// first, priced for the window.
pub(super) fn savings(
    rows: &[StorageRecommendationsRow],
    time_range: TimeRange,
    ctx: &TransformerContext,
    now: DateTime<Utc>,
) -> Result<StorageSavingsDocument, InvalidRow> {
    let tables = detail_tables(rows, ctx.discount)?;
    let (detailed_table, savings_price) = scale_to_window(tables, time_range);
    let total = scale(ctx.total_storage_price, time_range);

    Ok(StorageSavingsDocument {
        storage_savings: StorageSavings {
            detailed_table,
            detailed_table_fields_mapping: fields_mapping(),
            common: CommonRecommendation {
                recommendation: STORAGE_SAVINGS_RECOMMENDATION.to_string(),
                savings_percentage: percentage(savings_price, total),
                savings_price,
            },
        },
        last_update: now,
    })
}

/// Groups partitions under their base table. Rows without a cost are
/// ignored; partitions keep their input order.
fn detail_tables(
    rows: &[StorageRecommendationsRow],
    discount: f64,
) -> Result<Vec<StorageSavingsDetailTable>, InvalidRow> {
    let mut tables: BTreeMap<(String, String, String), (StorageSavingsDetailTable, DateTime<Utc>)> =
        BTreeMap::new();

    for (index, row) in rows.iter().enumerate() {
        let Some(cost) = row.cost else {
            continue;
        };
        if row.table_id_base_name.is_empty() {
            return Err(InvalidRow {
                index,
                reason: "empty table base name".to_string(),
            });
        }

        let cost = cost * discount;
        let size = row.storage_size_tb.unwrap_or_default();
        let partition = CommonStorageSavings {
            cost,
            storage_size_tb: size,
            table_create_date: format_date(row.table_create_date),
            table_id: String::new(),
            project_id: row.project_id.clone(),
            dataset_id: row.dataset_id.clone(),
        };

        let key = (
            row.project_id.clone(),
            row.dataset_id.clone(),
            row.table_id_base_name.clone(),
        );
        let (table, earliest) = tables.entry(key).or_insert_with(|| {
            let table = StorageSavingsDetailTable {
                common: CommonStorageSavings {
                    table_id: row.table_id_base_name.clone(),
                    project_id: row.project_id.clone(),
                    dataset_id: row.dataset_id.clone(),
                    ..Default::default()
                },
                partitions_available: Vec::new(),
            };
            (table, row.table_create_date)
        });

        table.common.cost += cost;
        table.common.storage_size_tb += size;
        if row.table_create_date < *earliest {
            *earliest = row.table_create_date;
        }
        table.partitions_available.push(partition);
    }

    let mut tables: Vec<StorageSavingsDetailTable> = tables
        .into_values()
        .map(|(mut table, earliest)| {
            table.common.table_create_date = format_date(earliest);
            table
        })
        .collect();
    tables.sort_by(|a, b| b.common.cost.total_cmp(&a.common.cost));

    Ok(tables)
}

/// Converts monthly costs to the window and returns the total saving.
fn scale_to_window(
    mut tables: Vec<StorageSavingsDetailTable>,
    time_range: TimeRange,
) -> (Vec<StorageSavingsDetailTable>, f64) {
    let mut total = 0.0;
    for table in &mut tables {
        table.common.cost = scale(table.common.cost, time_range);
        for partition in &mut table.partitions_available {
            partition.cost = scale(partition.cost, time_range);
        }
        total += table.common.cost;
    }
    (tables, total)
}

fn scale(monthly: f64, time_range: TimeRange) -> f64 {
    match time_range {
        TimeRange::Month => monthly,
        TimeRange::Week => monthly * 7.0 / DAYS_PER_BILLING_MONTH,
        TimeRange::Day => monthly / DAYS_PER_BILLING_MONTH,
    }
}

fn format_date(date: DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn fields_mapping() -> BTreeMap<String, FieldDetail> {
    BTreeMap::from([
        ("projectId".into(), FieldDetail::titled(0, true, "Project")),
        ("datasetId".into(), FieldDetail::titled(1, true, "Dataset")),
        ("tableId".into(), FieldDetail::titled(2, true, "Table")),
        (
            "tableIdBaseName".into(),
            FieldDetail::titled(3, true, "Base Table ID"),
        ),
        (
            "partitionsAvailable".into(),
            FieldDetail::titled(3, true, "Partition(s) to Remove").partition(),
        ),
        (
            "storageSizeTB".into(),
            FieldDetail::titled(4, true, "Storage (TB)").with_sign("TB"),
        ),
        (
            "cost".into(),
            FieldDetail::titled(5, true, "Storage (US$)").with_sign("$"),
        ),
        (
            "tableCreateDate".into(),
            FieldDetail::titled(7, false, "Table Create Date"),
        ),
    ])
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn date(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    fn row(table: &str, cost: Option<f64>, size: Option<f64>, created: DateTime<Utc>) -> StorageRecommendationsRow {
        StorageRecommendationsRow {
            project_id: "test-project-1".into(),
            dataset_id: "test-dataset-1".into(),
            table_id_base_name: table.into(),
            cost,
            storage_size_tb: size,
            table_create_date: created,
            total_storage_cost: None,
        }
    }

    fn rows() -> Vec<StorageRecommendationsRow> {
        vec![
            row("test-table-1", Some(10.0), Some(5.0), date(2024, 3, 1)),
            row("test-table-1", Some(20.0), Some(10.0), date(2024, 2, 1)),
            row("test-table-2", Some(40.0), Some(20.0), date(2024, 2, 11)),
            row("test-table-2", None, None, date(2024, 2, 13)),
        ]
    }

    #[test]
    fn test_partitions_group_under_base_table() {
        let tables = detail_tables(&rows(), 0.5).unwrap();

        assert_eq!(tables.len(), 2);
        assert_eq!(tables[0].common.table_id, "test-table-2");
        assert_eq!(tables[0].common.cost, 20.0);
        assert_eq!(tables[0].partitions_available.len(), 1);

        let first = &tables[1];
        assert_eq!(first.common.cost, 15.0);
        assert_eq!(first.common.storage_size_tb, 15.0);
        assert_eq!(first.common.table_create_date, "2024-02-01T00:00:00Z");
        let partition_dates: Vec<_> = first
            .partitions_available
            .iter()
            .map(|p| p.table_create_date.as_str())
            .collect();
        assert_eq!(
            partition_dates,
            vec!["2024-03-01T00:00:00Z", "2024-02-01T00:00:00Z"]
        );
        assert!(first.partitions_available.iter().all(|p| p.table_id.is_empty()));
    }

    #[test]
    fn test_month_savings_against_total_storage_price() {
        let ctx = TransformerContext {
            discount: 0.5,
            total_storage_price: 200.0,
            ..Default::default()
        };
        let now = date(2024, 5, 18);

        let doc = savings(&rows()[..3], TimeRange::Month, &ctx, now).unwrap();
        let savings = &doc.storage_savings;
        assert_eq!(savings.common.savings_price, 35.0);
        assert_eq!(savings.common.savings_percentage, 17.5);
        assert_eq!(savings.common.recommendation, STORAGE_SAVINGS_RECOMMENDATION);
        assert!(savings.detailed_table_fields_mapping["partitionsAvailable"].is_partition);
        assert!(!savings.detailed_table_fields_mapping["tableCreateDate"].visible);
        assert_eq!(doc.last_update, now);
    }

    #[test]
    fn test_day_window_scales_costs() {
        let table = |cost: f64, parts: [f64; 2]| StorageSavingsDetailTable {
            common: CommonStorageSavings {
                cost,
                ..Default::default()
            },
            partitions_available: parts
                .iter()
                .map(|c| CommonStorageSavings {
                    cost: *c,
                    ..Default::default()
                })
                .collect(),
        };

        let (tables, total) = scale_to_window(
            vec![table(30.0, [27.0, 3.0]), table(60.0, [54.0, 6.0])],
            TimeRange::Day,
        );

        assert_eq!(total, 3.0);
        assert_eq!(tables[0].common.cost, 1.0);
        assert_eq!(tables[0].partitions_available[0].cost, 0.9);
        assert_eq!(tables[1].partitions_available[1].cost, 0.2);
    }

    #[test]
    fn test_zero_storage_total_gives_zero_percentage() {
        let ctx = TransformerContext::default();
        let doc = savings(&rows(), TimeRange::Week, &ctx, date(2024, 5, 18)).unwrap();
        assert_eq!(doc.storage_savings.common.savings_percentage, 0.0);
        assert!(doc.storage_savings.common.savings_price > 0.0);
    }

    #[test]
    fn test_entity_keys() {
        assert_eq!(entity_key("p", None, None), "p");
        assert_eq!(entity_key("p", Some("d"), None), "p:d");
        assert_eq!(entity_key("p", Some("d"), Some("t")), "p:d.t");
    }

    #[test]
    fn test_price_keeps_list_prices() {
        let rows = vec![StoragePriceRow {
            project_id: "test-project-1".into(),
            dataset_id: Some("test-dataset-1".into()),
            table_id: None,
            storage_price: Some(12.0),
            short_term_storage_price: None,
            long_term_storage_price: Some(4.0),
        }];
        let doc = price(&rows, date(2024, 1, 1));
        let entry = &doc["test-project-1:test-dataset-1"];
        assert_eq!(entry.storage_price, 12.0);
        assert_eq!(entry.short_term_storage_price, 0.0);
        assert_eq!(entry.table_id, None);
    }
}
