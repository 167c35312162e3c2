use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{QueryName, ReservationGroup, TimeRange, UsageMode};

/// Default on-demand price per TB scanned, in USD.
pub const PRICE_PER_TB_SCAN: f64 = 6.25;

/// Capacity edition a reservation was bought under.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum Edition {
    Standard,
    Enterprise,
    EnterprisePlus,
}

/// Per-customer parameters used to instantiate query templates and to decide
/// which queries are worth running. Never mutated during a run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Replacements {
    pub project_id: String,
    pub dataset_id: String,
    #[serde(default)]
    pub tables_discovery_table: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub projects_with_reservations: Vec<String>,
    #[serde(default)]
    pub projects_by_edition: BTreeMap<Edition, Vec<String>>,
    #[serde(default)]
    pub historical_jobs: Vec<String>,
    #[serde(default)]
    pub min_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub max_date: Option<DateTime<Utc>>,
}

impl Replacements {
    /// Projects the customer runs under the given reservation group.
    pub fn projects_for(&self, group: ReservationGroup) -> &[String] {
        let edition = match group {
            ReservationGroup::FlatRate => return &self.projects_with_reservations,
            ReservationGroup::Standard => Edition::Standard,
            ReservationGroup::Enterprise => Edition::Enterprise,
            ReservationGroup::EnterprisePlus => Edition::EnterprisePlus,
        };
        self.projects_by_edition
            .get(&edition)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }
}

/// Total on-demand scan spend for one window.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PeriodTotalPrice {
    pub total_scan_price: f64,
}

/// Run-scoped values needed to shape documents.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransformerContext {
    /// Multiplier applied to list prices (1.0 = no discount).
    pub discount: f64,
    #[serde(default)]
    pub total_scan_price_per_period: BTreeMap<TimeRange, PeriodTotalPrice>,
    /// Monthly storage spend, used to express storage savings as a share.
    #[serde(default)]
    pub total_storage_price: f64,
    #[serde(default = "default_price_per_tb_scan")]
    pub price_per_tb_scan: f64,
}

impl Default for TransformerContext {
    fn default() -> Self {
        Self {
            discount: 1.0,
            total_scan_price_per_period: BTreeMap::new(),
            total_storage_price: 0.0,
            price_per_tb_scan: PRICE_PER_TB_SCAN,
        }
    }
}

impl TransformerContext {
    pub fn total_scan_price(&self, time_range: TimeRange) -> f64 {
        self.total_scan_price_per_period
            .get(&time_range)
            .map(|p| p.total_scan_price)
            .unwrap_or(0.0)
    }

    /// Discounted on-demand price for the given scanned volume.
    pub fn scan_price(&self, scan_tb: f64) -> f64 {
        scan_tb * self.price_per_tb_scan * self.discount
    }
}

fn default_price_per_tb_scan() -> f64 {
    PRICE_PER_TB_SCAN
}

/// Query texts available to a run.
///
/// `queries_per_mode` is keyed by raw names so that a catalogue carrying a
/// name this build does not know about is reported instead of rejected.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryCatalogue {
    #[serde(default)]
    pub queries_per_mode: BTreeMap<UsageMode, BTreeMap<String, String>>,
    /// Templates for the secondary row sets of composite runs.
    #[serde(default)]
    pub sub_queries: BTreeMap<SubQuery, String>,
    /// Shared SQL fragments inlined by name, e.g. `jobsDeduplicatedWithClause`.
    #[serde(default)]
    pub fragments: BTreeMap<String, String>,
}

impl QueryCatalogue {
    pub fn with_query(mut self, mode: UsageMode, name: QueryName, text: impl Into<String>) -> Self {
        self.queries_per_mode
            .entry(mode)
            .or_default()
            .insert(name.as_str().to_string(), text.into());
        self
    }

    pub fn with_sub_query(mut self, sub: SubQuery, text: impl Into<String>) -> Self {
        self.sub_queries.insert(sub, text.into());
        self
    }
}

/// Secondary row sets fetched by composite runs.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "camelCase")]
pub enum SubQuery {
    UserSlotsTopQueries,
    BillingProjectSlotsTopQueries,
    BillingProjectSlotsTopUsers,
    BillingProjectTopQueries,
    BillingProjectTopUsers,
    UserTopTables,
    UserTopDatasets,
    UserTopProjects,
    UserTopQueries,
    ProjectTopTables,
    ProjectTopDatasets,
    ProjectTopQueries,
    ProjectTopUsers,
    DatasetTopQueries,
    DatasetTopUsers,
    DatasetTopTables,
    TableTopQueries,
    TableTopUsers,
}

impl SubQuery {
    pub const ALL: [SubQuery; 18] = [
        Self::UserSlotsTopQueries,
        Self::BillingProjectSlotsTopQueries,
        Self::BillingProjectSlotsTopUsers,
        Self::BillingProjectTopQueries,
        Self::BillingProjectTopUsers,
        Self::UserTopTables,
        Self::UserTopDatasets,
        Self::UserTopProjects,
        Self::UserTopQueries,
        Self::ProjectTopTables,
        Self::ProjectTopDatasets,
        Self::ProjectTopQueries,
        Self::ProjectTopUsers,
        Self::DatasetTopQueries,
        Self::DatasetTopUsers,
        Self::DatasetTopTables,
        Self::TableTopQueries,
        Self::TableTopUsers,
    ];

    /// Catalogue name, as used in `subQueries`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UserSlotsTopQueries => "userSlotsTopQueries",
            Self::BillingProjectSlotsTopQueries => "billingProjectSlotsTopQueries",
            Self::BillingProjectSlotsTopUsers => "billingProjectSlotsTopUsers",
            Self::BillingProjectTopQueries => "billingProjectTopQueries",
            Self::BillingProjectTopUsers => "billingProjectTopUsers",
            Self::UserTopTables => "userTopTables",
            Self::UserTopDatasets => "userTopDatasets",
            Self::UserTopProjects => "userTopProjects",
            Self::UserTopQueries => "userTopQueries",
            Self::ProjectTopTables => "projectTopTables",
            Self::ProjectTopDatasets => "projectTopDatasets",
            Self::ProjectTopQueries => "projectTopQueries",
            Self::ProjectTopUsers => "projectTopUsers",
            Self::DatasetTopQueries => "datasetTopQueries",
            Self::DatasetTopUsers => "datasetTopUsers",
            Self::DatasetTopTables => "datasetTopTables",
            Self::TableTopQueries => "tableTopQueries",
            Self::TableTopUsers => "tableTopUsers",
        }
    }
}

impl std::fmt::Display for SubQuery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
