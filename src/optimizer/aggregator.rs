use crate::models::RecommendationSummary;

/// Merges the partial summaries of a run into one.
///
/// Jobs own disjoint `(query, time range)` keys, so this is a plain union.
/// Should two parts share a key anyway, the part merged last wins.
pub fn aggregate(parts: impl IntoIterator<Item = RecommendationSummary>) -> RecommendationSummary {
    let mut summary = RecommendationSummary::new();
    for part in parts {
        let before = summary.len();
        let added = part.len();
        summary.merge(part);
        if summary.len() < before + added {
            tracing::warn!(
                overlapping = before + added - summary.len(),
                "Partial summaries overlap, keeping the later documents"
            );
        }
    }
    summary
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::models::{
        ExplorerDocument, QueryName, RecommendationDocument, TimeRange, TimeSeriesData,
    };

    fn explorer(marker: f64) -> RecommendationDocument {
        RecommendationDocument::Explorer(ExplorerDocument {
            day: TimeSeriesData {
                x_axis: vec!["2024-05-01".into()],
                bar: vec![marker],
                line: vec![marker],
            },
            hour: TimeSeriesData::default(),
            last_update: Utc.with_ymd_and_hms(2024, 5, 18, 0, 0, 0).unwrap(),
        })
    }

    fn part(entries: &[(QueryName, TimeRange, f64)]) -> RecommendationSummary {
        let mut summary = RecommendationSummary::new();
        for (query, time_range, marker) in entries {
            summary.insert(*query, *time_range, explorer(*marker));
        }
        summary
    }

    #[test]
    fn test_disjoint_parts_keep_every_document() {
        let parts = vec![
            part(&[(QueryName::SlotsExplorerOnDemand, TimeRange::Day, 1.0)]),
            part(&[
                (QueryName::SlotsExplorerOnDemand, TimeRange::Week, 2.0),
                (QueryName::StandardSlotsExplorer, TimeRange::Day, 3.0),
            ]),
            RecommendationSummary::new(),
        ];

        let summary = aggregate(parts);
        assert_eq!(summary.len(), 3);
        assert_eq!(
            summary.get(QueryName::StandardSlotsExplorer, TimeRange::Day),
            Some(&explorer(3.0))
        );
        assert_eq!(
            summary.get(QueryName::SlotsExplorerOnDemand, TimeRange::Week),
            Some(&explorer(2.0))
        );
    }

    #[test]
    fn test_overlapping_key_keeps_last_part() {
        let parts = vec![
            part(&[(QueryName::SlotsExplorerOnDemand, TimeRange::Day, 1.0)]),
            part(&[(QueryName::SlotsExplorerOnDemand, TimeRange::Day, 9.0)]),
        ];

        let summary = aggregate(parts);
        assert_eq!(summary.len(), 1);
        assert_eq!(
            summary.get(QueryName::SlotsExplorerOnDemand, TimeRange::Day),
            Some(&explorer(9.0))
        );
    }

    #[test]
    fn test_no_parts_is_empty() {
        assert!(aggregate(Vec::new()).is_empty());
    }
}
