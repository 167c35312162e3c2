use std::collections::BTreeMap;

use super::{QueryName, RecommendationDocument, TimeRange};

/// Output of one run: at most one document per `(query, time range)`.
///
/// Built fresh for every run and consumed once by the writer. Inserting an
/// existing key replaces the previous document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecommendationSummary {
    entries: BTreeMap<QueryName, BTreeMap<TimeRange, RecommendationDocument>>,
}

impl RecommendationSummary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `document`, returning the one it replaced, if any.
    pub fn insert(
        &mut self,
        query: QueryName,
        time_range: TimeRange,
        document: RecommendationDocument,
    ) -> Option<RecommendationDocument> {
        self.entries
            .entry(query)
            .or_default()
            .insert(time_range, document)
    }

    pub fn get(&self, query: QueryName, time_range: TimeRange) -> Option<&RecommendationDocument> {
        self.entries.get(&query)?.get(&time_range)
    }

    /// Number of `(query, time range)` entries.
    pub fn len(&self) -> usize {
        self.entries.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Moves every entry of `other` into `self`. Keys present in both take
    /// `other`'s document.
    pub fn merge(&mut self, other: RecommendationSummary) {
        for (query, windows) in other.entries {
            self.entries.entry(query).or_default().extend(windows);
        }
    }

    /// Entries ordered by query name, then time range.
    pub fn entries(&self) -> impl Iterator<Item = (QueryName, TimeRange, &RecommendationDocument)> {
        self.entries.iter().flat_map(|(query, windows)| {
            windows
                .iter()
                .map(move |(time_range, document)| (*query, *time_range, document))
        })
    }

    pub fn queries(&self) -> impl Iterator<Item = QueryName> + '_ {
        self.entries.keys().copied()
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::models::{ExplorerDocument, TimeSeriesData};

    fn explorer(marker: f64) -> RecommendationDocument {
        RecommendationDocument::Explorer(ExplorerDocument {
            day: TimeSeriesData {
                x_axis: vec!["2024-03-01".into()],
                bar: vec![marker],
                line: vec![marker],
            },
            hour: TimeSeriesData::default(),
            last_update: Utc.with_ymd_and_hms(2024, 3, 2, 0, 0, 0).unwrap(),
        })
    }

    #[test]
    fn test_merge_of_disjoint_summaries_keeps_every_entry() {
        let mut a = RecommendationSummary::new();
        a.insert(QueryName::SlotsExplorerFlatRate, TimeRange::Day, explorer(1.0));
        a.insert(QueryName::SlotsExplorerFlatRate, TimeRange::Week, explorer(2.0));

        let mut b = RecommendationSummary::new();
        b.insert(QueryName::SlotsExplorerOnDemand, TimeRange::Day, explorer(3.0));

        let mut merged = RecommendationSummary::new();
        merged.merge(a.clone());
        merged.merge(b.clone());

        assert_eq!(merged.len(), a.len() + b.len());
        assert_eq!(
            merged.get(QueryName::SlotsExplorerFlatRate, TimeRange::Week),
            Some(&explorer(2.0))
        );
        assert_eq!(
            merged.get(QueryName::SlotsExplorerOnDemand, TimeRange::Day),
            Some(&explorer(3.0))
        );
    }

    #[test]
    fn test_merge_conflict_takes_later_document() {
        let mut a = RecommendationSummary::new();
        a.insert(QueryName::SlotsExplorerFlatRate, TimeRange::Day, explorer(1.0));
        let mut b = RecommendationSummary::new();
        b.insert(QueryName::SlotsExplorerFlatRate, TimeRange::Day, explorer(9.0));

        a.merge(b);
        assert_eq!(a.len(), 1);
        assert_eq!(
            a.get(QueryName::SlotsExplorerFlatRate, TimeRange::Day),
            Some(&explorer(9.0))
        );
    }

    #[test]
    fn test_entries_are_ordered() {
        let mut summary = RecommendationSummary::new();
        summary.insert(QueryName::SlotsExplorerOnDemand, TimeRange::Month, explorer(1.0));
        summary.insert(QueryName::SlotsExplorerOnDemand, TimeRange::Day, explorer(1.0));

        let windows: Vec<_> = summary.entries().map(|(_, tr, _)| tr).collect();
        assert_eq!(windows, vec![TimeRange::Day, TimeRange::Month]);
        assert!(!summary.is_empty());
    }
}
