use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use super::{InvalidRow, round2};
use crate::models::{ExplorerDocument, SlotsExplorerRow, TimeSeriesData};

#[derive(Debug, Default)]
struct Bucket {
    avg_slots: Vec<f64>,
    max_slots: f64,
}

impl Bucket {
    fn add(&mut self, avg: f64, max: f64) {
        self.avg_slots.push(avg);
        if max > self.max_slots {
            self.max_slots = max;
        }
    }

    fn mean(&self) -> f64 {
        if self.avg_slots.is_empty() {
            return 0.0;
        }
        round2(self.avg_slots.iter().sum::<f64>() / self.avg_slots.len() as f64)
    }
}

/// Slot usage per day and per hour of day: mean usage as bars, peak as a line.
pub(super) fn transform(rows: &[SlotsExplorerRow], now: DateTime<Utc>) -> Result<ExplorerDocument, InvalidRow> {
    let mut days: BTreeMap<String, Bucket> = BTreeMap::new();
    let mut hours: BTreeMap<u32, Bucket> = BTreeMap::new();

    for (index, row) in rows.iter().enumerate() {
        if row.hour > 23 {
            return Err(InvalidRow {
                index,
                reason: format!("hour {} out of range", row.hour),
            });
        }

        if let Some(day) = row.day {
            days.entry(day.format("%Y-%m-%d").to_string())
                .or_default()
                .add(row.avg_slots, row.max_slots);
        }
        hours
            .entry(row.hour)
            .or_default()
            .add(row.avg_slots, row.max_slots);
    }

    Ok(ExplorerDocument {
        day: series(days),
        hour: series(hours.into_iter().map(|(h, b)| (h.to_string(), b))),
        last_update: now,
    })
}

fn series(buckets: impl IntoIterator<Item = (String, Bucket)>) -> TimeSeriesData {
    let mut data = TimeSeriesData::default();
    for (label, bucket) in buckets {
        data.x_axis.push(label);
        data.bar.push(bucket.mean());
        data.line.push(bucket.max_slots);
    }
    data
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, TimeZone};

    use super::*;

    fn row(day: Option<(i32, u32, u32)>, hour: u32, avg: f64, max: f64) -> SlotsExplorerRow {
        SlotsExplorerRow {
            day: day.and_then(|(y, m, d)| NaiveDate::from_ymd_opt(y, m, d)),
            hour,
            avg_slots: avg,
            max_slots: max,
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 18, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_empty_input_gives_empty_series() {
        let doc = transform(&[], now()).unwrap();
        assert_eq!(doc.day, TimeSeriesData::default());
        assert_eq!(doc.hour, TimeSeriesData::default());
        assert_eq!(doc.last_update, now());
    }

    #[test]
    fn test_same_day_different_hours() {
        let rows = vec![
            row(Some((2024, 5, 16)), 5, 10.0, 20.0),
            row(Some((2024, 5, 16)), 6, 15.0, 25.0),
        ];
        let doc = transform(&rows, now()).unwrap();

        assert_eq!(doc.day.x_axis, vec!["2024-05-16"]);
        assert_eq!(doc.day.bar, vec![12.5]);
        assert_eq!(doc.day.line, vec![25.0]);
        assert_eq!(doc.hour.x_axis, vec!["5", "6"]);
        assert_eq!(doc.hour.bar, vec![10.0, 15.0]);
        assert_eq!(doc.hour.line, vec![20.0, 25.0]);
    }

    #[test]
    fn test_axes_sorted_and_null_days_only_count_hourly() {
        let rows = vec![
            row(Some((2024, 5, 17)), 12, 15.0, 25.0),
            row(None, 3, 4.0, 8.0),
            row(Some((2024, 5, 16)), 10, 10.0, 20.0),
        ];
        let doc = transform(&rows, now()).unwrap();

        assert_eq!(doc.day.x_axis, vec!["2024-05-16", "2024-05-17"]);
        assert_eq!(doc.hour.x_axis, vec!["3", "10", "12"]);
    }

    #[test]
    fn test_invalid_hour_is_rejected() {
        let err = transform(&[row(None, 24, 1.0, 1.0)], now()).unwrap_err();
        assert_eq!(err.index, 0);
        assert!(err.reason.contains("hour 24"));
    }
}
