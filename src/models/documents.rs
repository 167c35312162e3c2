//! Persisted recommendation documents.
//!
//! Field names match the stored JSON (camelCase). Rollup documents are maps
//! from an entity id to that entity's metrics; each entry carries its own
//! `lastUpdate` so partial readers can tell how fresh an entity is.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Savings headline shared by the detail-table recommendations.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CommonRecommendation {
    pub recommendation: String,
    pub savings_percentage: f64,
    pub savings_price: f64,
}

/// Presentation hints for one detail-table column.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FieldDetail {
    pub order: u32,
    pub visible: bool,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub title: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub sign: String,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_partition: bool,
}

impl FieldDetail {
    pub fn new(order: u32, visible: bool) -> Self {
        Self {
            order,
            visible,
            ..Default::default()
        }
    }

    pub fn titled(order: u32, visible: bool, title: &str) -> Self {
        Self {
            order,
            visible,
            title: title.to_string(),
            ..Default::default()
        }
    }

    pub fn with_sign(mut self, sign: &str) -> Self {
        self.sign = sign.to_string();
        self
    }

    pub fn partition(mut self) -> Self {
        self.is_partition = true;
        self
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Table types
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TableValue {
    pub table_name: Option<String>,
    pub value: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TableTypeCost {
    pub tables: Vec<TableValue>,
    pub tb: f64,
    pub percentage: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CostFromTableTypeDocument {
    pub data: BTreeMap<String, TableTypeCost>,
    pub last_update: DateTime<Utc>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Storage
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StoragePriceEntry {
    pub project_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dataset_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table_id: Option<String>,
    pub storage_price: f64,
    pub short_term_storage_price: f64,
    pub long_term_storage_price: f64,
    pub last_update: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StorageTBEntry {
    pub project_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dataset_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table_id: Option<String>,
    #[serde(rename = "storageTB")]
    pub storage_tb: f64,
    #[serde(rename = "shortTermStorageTB")]
    pub short_term_storage_tb: f64,
    #[serde(rename = "longTermStorageTB")]
    pub long_term_storage_tb: f64,
    pub last_update: DateTime<Utc>,
}

pub type StoragePriceDocument = BTreeMap<String, StoragePriceEntry>;
pub type StorageTBDocument = BTreeMap<String, StorageTBEntry>;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CommonStorageSavings {
    pub cost: f64,
    #[serde(rename = "storageSizeTB")]
    pub storage_size_tb: f64,
    pub table_create_date: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub table_id: String,
    pub project_id: String,
    pub dataset_id: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StorageSavingsDetailTable {
    #[serde(flatten)]
    pub common: CommonStorageSavings,
    pub partitions_available: Vec<CommonStorageSavings>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StorageSavings {
    pub detailed_table: Vec<StorageSavingsDetailTable>,
    pub detailed_table_fields_mapping: BTreeMap<String, FieldDetail>,
    #[serde(flatten)]
    pub common: CommonRecommendation,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StorageSavingsDocument {
    pub storage_savings: StorageSavings,
    pub last_update: DateTime<Utc>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Reservations
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledQueriesDetailTable {
    pub job_id: String,
    pub location: String,
    pub billing_project_id: String,
    pub scheduled_time: String,
    pub all_jobs: i64,
    pub slots: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledQueriesMovement {
    pub detailed_table: Vec<ScheduledQueriesDetailTable>,
    pub detailed_table_fields_mapping: BTreeMap<String, FieldDetail>,
    #[serde(flatten)]
    pub common: CommonRecommendation,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledQueriesDocument {
    pub data: ScheduledQueriesMovement,
    pub last_update: DateTime<Utc>,
}

/// One chart series: labels on the x axis, mean usage as bars, peak usage
/// as a line.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TimeSeriesData {
    pub x_axis: Vec<String>,
    pub bar: Vec<f64>,
    pub line: Vec<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExplorerDocument {
    pub day: TimeSeriesData,
    pub hour: TimeSeriesData,
    pub last_update: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SlotsTopQuery {
    pub billing_project_id: String,
    pub user_id: String,
    pub location: String,
    pub executed_queries: i64,
    pub avg_execution_time_sec: f64,
    pub total_execution_time_sec: f64,
    pub avg_slots: f64,
    #[serde(rename = "avgScanTB")]
    pub avg_scan_tb: f64,
    #[serde(rename = "totalScanTB")]
    pub total_scan_tb: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserSlotsEntry {
    pub user_id: String,
    pub slots: f64,
    #[serde(default)]
    pub top_queries: BTreeMap<String, SlotsTopQuery>,
    pub last_update: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BillingProjectSlotsEntry {
    pub billing_project_id: String,
    pub slots: f64,
    #[serde(default)]
    pub top_queries: BTreeMap<String, SlotsTopQuery>,
    #[serde(default)]
    pub top_users: BTreeMap<String, f64>,
    pub last_update: DateTime<Utc>,
}

pub type UserSlotsDocument = BTreeMap<String, UserSlotsEntry>;
pub type BillingProjectSlotsDocument = BTreeMap<String, BillingProjectSlotsEntry>;

// ─────────────────────────────────────────────────────────────────────────────
// On-demand scan rollups
// ─────────────────────────────────────────────────────────────────────────────

/// Identity of the entity a rollup entry describes. Only the fields that
/// apply to the entity kind are set.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct EntityIds {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub billing_project_id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub user_id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub project_id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub dataset_id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub table_id: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CommonTopQuery {
    pub avg_execution_time_sec: f64,
    pub avg_slots: f64,
    pub executed_queries: i64,
    pub total_execution_time_sec: f64,
    pub billing_project_id: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TopQueryPrice {
    pub avg_scan_price: f64,
    pub total_scan_price: f64,
    pub location: String,
    pub user_id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub project_id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub dataset_id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub table_id: String,
    #[serde(flatten)]
    pub common: CommonTopQuery,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TopQueryTB {
    #[serde(rename = "avgScanTB")]
    pub avg_scan_tb: f64,
    #[serde(rename = "totalScanTB")]
    pub total_scan_tb: f64,
    pub location: String,
    pub user_id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub project_id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub dataset_id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub table_id: String,
    #[serde(flatten)]
    pub common: CommonTopQuery,
}

/// Rollup entry expressed in discounted scan price.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ScanPriceEntry {
    #[serde(flatten)]
    pub ids: EntityIds,
    pub scan_price: f64,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub top_queries: BTreeMap<String, TopQueryPrice>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub top_users: BTreeMap<String, f64>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub top_tables: BTreeMap<String, f64>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub top_datasets: BTreeMap<String, f64>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub top_projects: BTreeMap<String, f64>,
    pub last_update: DateTime<Utc>,
}

/// Rollup entry expressed in scanned terabytes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ScanTBEntry {
    #[serde(flatten)]
    pub ids: EntityIds,
    #[serde(rename = "scanTB")]
    pub scan_tb: f64,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub top_queries: BTreeMap<String, TopQueryTB>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub top_users: BTreeMap<String, f64>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub top_tables: BTreeMap<String, f64>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub top_datasets: BTreeMap<String, f64>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub top_projects: BTreeMap<String, f64>,
    pub last_update: DateTime<Utc>,
}

pub type ScanPriceDocument = BTreeMap<String, ScanPriceEntry>;
pub type ScanTBDocument = BTreeMap<String, ScanTBEntry>;

// ─────────────────────────────────────────────────────────────────────────────
// Simulation bookkeeping
// ─────────────────────────────────────────────────────────────────────────────

/// Progress record of a customer's simulation run.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SimulationDetails {
    #[serde(default)]
    pub progress: Option<i64>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub last_update: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Top-level recommender output record of a customer.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationDetails {
    #[serde(default)]
    pub last_update: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Closed set of persisted shapes
// ─────────────────────────────────────────────────────────────────────────────

/// One query's result for one window, in the shape it is persisted in.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(untagged)]
pub enum RecommendationDocument {
    CostFromTableTypes(CostFromTableTypeDocument),
    StoragePrice(StoragePriceDocument),
    StorageTB(StorageTBDocument),
    StorageSavings(StorageSavingsDocument),
    ScheduledQueriesMovement(ScheduledQueriesDocument),
    Explorer(ExplorerDocument),
    UserSlots(UserSlotsDocument),
    BillingProjectSlots(BillingProjectSlotsDocument),
    ScanPrice(ScanPriceDocument),
    ScanTB(ScanTBDocument),
}

impl RecommendationDocument {
    /// Document body as stored.
    pub fn to_body(&self) -> serde_json::Result<serde_json::Value> {
        serde_json::to_value(self)
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::CostFromTableTypes(_) => "costFromTableTypes",
            Self::StoragePrice(_) => "storagePrice",
            Self::StorageTB(_) => "storageTB",
            Self::StorageSavings(_) => "storageSavings",
            Self::ScheduledQueriesMovement(_) => "scheduledQueriesMovement",
            Self::Explorer(_) => "explorer",
            Self::UserSlots(_) => "userSlots",
            Self::BillingProjectSlots(_) => "billingProjectSlots",
            Self::ScanPrice(_) => "scanPrice",
            Self::ScanTB(_) => "scanTB",
        }
    }
}
