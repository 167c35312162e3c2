//! Instantiation of query templates with per-customer values.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use chrono::{DateTime, Duration, Utc};
use regex::Regex;
use thiserror::Error;

use crate::models::{QueryName, ReservationGroup, Replacements, TimeRange};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TemplateError {
    #[error("placeholder '{{{0}}}' is referenced but has no value")]
    MissingValue(&'static str),

    #[error("placeholder '{{{0}}}' was left unresolved")]
    Unresolved(String),
}

pub type TemplateResult<T> = Result<T, TemplateError>;

const MODE_HYBRID_WITH_HISTORY: &str = "IS NOT NULL OR projectId";
const MODE_HYBRID_AUDIT_LOG: &str =
    "IS NOT NULL OR protopayload_auditlog.servicedata_v1_bigquery.jobCompletedEvent.job.jobName.projectId";

/// Fragments may reference other fragments; nesting deeper than this is
/// treated as unresolved.
const MAX_FRAGMENT_DEPTH: usize = 4;

/// Renders query templates for one run. All inputs are fixed for the run,
/// so a single instance is shared by every job.
#[derive(Debug, Clone)]
pub struct Templater<'a> {
    pub replacements: &'a Replacements,
    pub fragments: &'a BTreeMap<String, String>,
    pub price_per_tb_scan: f64,
    pub now: DateTime<Utc>,
}

impl<'a> Templater<'a> {
    pub fn new(
        replacements: &'a Replacements,
        fragments: &'a BTreeMap<String, String>,
        price_per_tb_scan: f64,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            replacements,
            fragments,
            price_per_tb_scan,
            now,
        }
    }

    /// Substitutes every placeholder of `template` for `query` over `time_range`.
    pub fn substitute(
        &self,
        query: QueryName,
        template: &str,
        time_range: TimeRange,
    ) -> TemplateResult<String> {
        let mut text = self.inline_fragments(template);

        let values = self.scalar_values(query, time_range);
        for (name, value, required) in &values {
            let placeholder = format!("{{{name}}}");
            if !text.contains(&placeholder) {
                continue;
            }
            if *required && value.is_empty() {
                return Err(TemplateError::MissingValue(name));
            }
            text = text.replace(&placeholder, value);
        }

        match find_placeholder(&text) {
            Some(name) => Err(TemplateError::Unresolved(name.to_string())),
            None => Ok(text),
        }
    }

    fn inline_fragments(&self, template: &str) -> String {
        let mut text = template.to_string();
        for _ in 0..MAX_FRAGMENT_DEPTH {
            let mut changed = false;
            for (name, fragment) in self.fragments {
                let placeholder = format!("{{{name}}}");
                if text.contains(&placeholder) {
                    text = text.replace(&placeholder, fragment);
                    changed = true;
                }
            }
            if !changed {
                break;
            }
        }
        text
    }

    fn scalar_values(&self, query: QueryName, time_range: TimeRange) -> Vec<(&'static str, String, bool)> {
        let r = self.replacements;
        let group = query.reservation_group().unwrap_or(ReservationGroup::FlatRate);

        vec![
            ("projectIdPlaceHolder", r.project_id.clone(), true),
            ("datasetIdPlaceHolder", r.dataset_id.clone(), true),
            ("tablesDiscoveryTable", r.tables_discovery_table.clone(), true),
            ("startDate", self.start_date(time_range), true),
            ("endDate", self.end_date(), true),
            (
                "projectsWithReservations",
                quoted_list(r.projects_for(group)),
                true,
            ),
            ("modePlaceholder", mode_placeholder(query, !r.historical_jobs.is_empty()).to_string(), false),
            ("pricePerTBScan", self.price_per_tb_scan.to_string(), true),
            ("historicalJobsPlaceholder", historical_jobs_clause(&r.historical_jobs), false),
            ("queryPlaceholder", query.as_str().to_string(), true),
        ]
    }

    fn start_date(&self, time_range: TimeRange) -> String {
        let mut start = self.now - Duration::days(time_range.days());
        if let Some(min_date) = self.replacements.min_date
            && min_date > start
        {
            start = min_date;
        }
        start.format("%Y-%m-%d").to_string()
    }

    fn end_date(&self) -> String {
        self.replacements
            .max_date
            .unwrap_or(self.now)
            .format("%Y-%m-%d")
            .to_string()
    }
}

/// Formats projects as a SQL `IN` list. An empty list still yields a valid
/// list matching nothing.
pub fn quoted_list(items: &[String]) -> String {
    if items.is_empty() {
        return r#"("")"#.to_string();
    }
    let quoted: Vec<String> = items.iter().map(|p| format!("\"{p}\"")).collect();
    format!("({})", quoted.join(","))
}

/// Filter selecting the jobs a query is about: reservation queries keep
/// reservation jobs, on-demand queries exclude them, hybrid queries keep
/// every attributed job.
pub fn mode_placeholder(query: QueryName, has_historical_jobs: bool) -> &'static str {
    if query.reservation_group().is_some() {
        ""
    } else if query.requires_discovery() {
        if has_historical_jobs {
            MODE_HYBRID_WITH_HISTORY
        } else {
            MODE_HYBRID_AUDIT_LOG
        }
    } else {
        "NOT"
    }
}

fn historical_jobs_clause(jobs: &[String]) -> String {
    if jobs.is_empty() {
        String::new()
    } else {
        format!("OR jobId IN {}", quoted_list(jobs))
    }
}

/// A `{camelCase}` placeholder.
static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{([a-z][A-Za-z0-9]*)\}").expect("placeholder pattern is valid"));

/// First placeholder left in `text`, if any.
fn find_placeholder(text: &str) -> Option<&str> {
    Some(PLACEHOLDER.captures(text)?.get(1)?.as_str())
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn replacements() -> Replacements {
        Replacements {
            project_id: "mock-project-id".into(),
            dataset_id: "mock-dataset-id".into(),
            tables_discovery_table: "mock-table-discovery".into(),
            projects_with_reservations: vec!["project1".into(), "project2".into()],
            ..Default::default()
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 27, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_substitutes_scalars_and_dates() {
        let replacements = replacements();
        let fragments = BTreeMap::new();
        let templater = Templater::new(&replacements, &fragments, 6.25, now());

        let sql = templater
            .substitute(
                QueryName::ScheduledQueriesMovement,
                "SELECT * FROM `{projectIdPlaceHolder}.{datasetIdPlaceHolder}.jobs` \
                 WHERE day BETWEEN '{startDate}' AND '{endDate}' \
                 AND project IN {projectsWithReservations}",
                TimeRange::Week,
            )
            .unwrap();

        assert_eq!(
            sql,
            "SELECT * FROM `mock-project-id.mock-dataset-id.jobs` \
             WHERE day BETWEEN '2024-03-20' AND '2024-03-27' \
             AND project IN (\"project1\",\"project2\")"
        );
    }

    #[test]
    fn test_min_date_clamps_start() {
        let mut replacements = replacements();
        replacements.min_date = Some(Utc.with_ymd_and_hms(2024, 3, 25, 0, 0, 0).unwrap());
        let fragments = BTreeMap::new();
        let templater = Templater::new(&replacements, &fragments, 6.25, now());

        let sql = templater
            .substitute(QueryName::SlotsExplorerOnDemand, "{startDate}", TimeRange::Month)
            .unwrap();
        assert_eq!(sql, "2024-03-25");
    }

    #[test]
    fn test_fragments_are_inlined_before_scalars() {
        let replacements = replacements();
        let fragments = BTreeMap::from([(
            "jobsDeduplicatedWithClause".to_string(),
            "WITH jobs AS (SELECT * FROM `{projectIdPlaceHolder}.jobs` WHERE x {modePlaceholder} IN (1))"
                .to_string(),
        )]);
        let templater = Templater::new(&replacements, &fragments, 6.25, now());

        let sql = templater
            .substitute(
                QueryName::LimitingJobsSavings,
                "{jobsDeduplicatedWithClause} SELECT {pricePerTBScan}",
                TimeRange::Day,
            )
            .unwrap();
        assert_eq!(
            sql,
            "WITH jobs AS (SELECT * FROM `mock-project-id.jobs` WHERE x NOT IN (1)) SELECT 6.25"
        );
    }

    #[test]
    fn test_empty_discovery_table_is_rejected() {
        let mut replacements = replacements();
        replacements.tables_discovery_table.clear();
        let fragments = BTreeMap::new();
        let templater = Templater::new(&replacements, &fragments, 6.25, now());

        let err = templater
            .substitute(
                QueryName::CostFromTableTypes,
                "SELECT * FROM {tablesDiscoveryTable}",
                TimeRange::Month,
            )
            .unwrap_err();
        assert_eq!(err, TemplateError::MissingValue("tablesDiscoveryTable"));

        // Not referenced, so not required.
        assert!(
            templater
                .substitute(QueryName::CostFromTableTypes, "SELECT 1", TimeRange::Month)
                .is_ok()
        );
    }

    #[test]
    fn test_unknown_placeholder_is_reported() {
        let replacements = replacements();
        let fragments = BTreeMap::new();
        let templater = Templater::new(&replacements, &fragments, 6.25, now());

        let err = templater
            .substitute(
                QueryName::TableStoragePrice,
                "SELECT STRUCT(1 AS a) {notAPlaceholder}",
                TimeRange::Month,
            )
            .unwrap_err();
        assert_eq!(err, TemplateError::Unresolved("notAPlaceholder".into()));
    }

    #[test]
    fn test_find_placeholder_ignores_non_identifiers() {
        assert_eq!(find_placeholder("STRUCT({a: 1})"), None);
        assert_eq!(find_placeholder("{Upper} {two words} {}"), None);
        assert_eq!(
            find_placeholder(r#"JSON '{"k": {leftOver}}'"#),
            Some("leftOver")
        );
        assert_eq!(find_placeholder("{dangling"), None);
    }

    #[test]
    fn test_mode_placeholder() {
        assert_eq!(mode_placeholder(QueryName::LimitingJobsSavings, false), "NOT");
        assert_eq!(mode_placeholder(QueryName::ScheduledQueriesMovement, false), "");
        assert_eq!(
            mode_placeholder(QueryName::TableStorageTB, true),
            MODE_HYBRID_WITH_HISTORY
        );
        assert_eq!(
            mode_placeholder(QueryName::TableStorageTB, false),
            MODE_HYBRID_AUDIT_LOG
        );
    }

    #[test]
    fn test_quoted_list() {
        assert_eq!(quoted_list(&[]), r#"("")"#);
        assert_eq!(quoted_list(&["project1".into()]), r#"("project1")"#);
        assert_eq!(
            quoted_list(&["".into(), "project2".into(), "".into()]),
            r#"("","project2","")"#
        );
    }
}
