//! Row shapes returned by the warehouse, one struct per result set.
//!
//! Numeric columns the warehouse may return as NULL are `Option`s; the
//! transformers treat a missing value as zero.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CostFromTableTypesRow {
    #[serde(default)]
    pub table_name: Option<String>,
    pub table_type: String,
    #[serde(default, rename = "totalTB")]
    pub total_tb: Option<f64>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Storage
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StoragePriceRow {
    pub project_id: String,
    #[serde(default)]
    pub dataset_id: Option<String>,
    #[serde(default)]
    pub table_id: Option<String>,
    #[serde(default)]
    pub storage_price: Option<f64>,
    #[serde(default)]
    pub short_term_storage_price: Option<f64>,
    #[serde(default)]
    pub long_term_storage_price: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StorageTBRow {
    pub project_id: String,
    #[serde(default)]
    pub dataset_id: Option<String>,
    #[serde(default)]
    pub table_id: Option<String>,
    #[serde(default, rename = "storageTB")]
    pub storage_tb: Option<f64>,
    #[serde(default, rename = "shortTermStorageTB")]
    pub short_term_storage_tb: Option<f64>,
    #[serde(default, rename = "longTermStorageTB")]
    pub long_term_storage_tb: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StorageRecommendationsRow {
    pub project_id: String,
    pub dataset_id: String,
    pub table_id_base_name: String,
    #[serde(default)]
    pub cost: Option<f64>,
    #[serde(default, rename = "storageSizeTB")]
    pub storage_size_tb: Option<f64>,
    pub table_create_date: DateTime<Utc>,
    #[serde(default)]
    pub total_storage_cost: Option<f64>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Reservations (flat-rate and editions share these shapes)
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledQueriesMovementRow {
    pub job_id: String,
    pub location: String,
    pub billing_project_id: String,
    pub scheduled_time: String,
    pub all_jobs: i64,
    pub slots: f64,
    pub savings_price: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SlotsExplorerRow {
    #[serde(default)]
    pub day: Option<NaiveDate>,
    pub hour: u32,
    pub avg_slots: f64,
    pub max_slots: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserSlotsRow {
    pub user_id: String,
    pub slots: f64,
}

/// A job that ran often enough to rank among an entity's heaviest queries.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SlotsTopQueryRow {
    #[serde(default)]
    pub billing_project_id: String,
    #[serde(default)]
    pub user_id: String,
    pub job_id: String,
    #[serde(default)]
    pub location: String,
    pub executed_queries: i64,
    #[serde(default)]
    pub avg_execution_time_sec: f64,
    #[serde(default)]
    pub total_execution_time_sec: f64,
    #[serde(default)]
    pub avg_slots: f64,
    #[serde(default, rename = "avgScanTB")]
    pub avg_scan_tb: f64,
    #[serde(default, rename = "totalScanTB")]
    pub total_scan_tb: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BillingProjectSlotsRow {
    pub billing_project_id: String,
    pub slots: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BillingProjectSlotsTopUserRow {
    pub billing_project_id: String,
    #[serde(rename = "user_email")]
    pub user_email: String,
    pub slots: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserSlotsRun {
    pub slots: Vec<UserSlotsRow>,
    pub top_queries: Vec<SlotsTopQueryRow>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BillingProjectSlotsRun {
    pub slots: Vec<BillingProjectSlotsRow>,
    pub top_queries: Vec<SlotsTopQueryRow>,
    pub top_users: Vec<BillingProjectSlotsTopUserRow>,
}

// ─────────────────────────────────────────────────────────────────────────────
// On-demand scan attribution
// ─────────────────────────────────────────────────────────────────────────────

/// Top query row shared by every on-demand rollup.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TopQueryRow {
    #[serde(default)]
    pub billing_project_id: String,
    #[serde(default)]
    pub user_id: String,
    pub job_id: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub executed_queries: i64,
    #[serde(default)]
    pub avg_execution_time_sec: Option<f64>,
    #[serde(default)]
    pub total_execution_time_sec: Option<f64>,
    #[serde(default)]
    pub avg_slots: Option<f64>,
    #[serde(default, rename = "avgScanTB")]
    pub avg_scan_tb: Option<f64>,
    #[serde(default, rename = "totalScanTB")]
    pub total_scan_tb: Option<f64>,
}

/// A top query attributed to an entity (project, dataset or table).
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ScopedTopQueryRow {
    #[serde(default)]
    pub project_id: String,
    #[serde(default)]
    pub dataset_id: String,
    #[serde(default)]
    pub table_id: String,
    #[serde(flatten)]
    pub query: TopQueryRow,
}

/// Scanned volume for one entity.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ScanRow {
    #[serde(default)]
    pub billing_project_id: String,
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub project_id: String,
    #[serde(default)]
    pub dataset_id: String,
    #[serde(default)]
    pub table_id: String,
    #[serde(default, rename = "scanTB")]
    pub scan_tb: Option<f64>,
}

/// Scanned volume for a child entity under a parent (a user's top table,
/// a project's top dataset...). `parent` and `child` are filled by the runner.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ScanBreakdownRow {
    #[serde(default)]
    pub billing_project_id: String,
    #[serde(default)]
    pub user_id: String,
    #[serde(default, rename = "user_email")]
    pub user_email: String,
    #[serde(default)]
    pub project_id: String,
    #[serde(default)]
    pub dataset_id: String,
    #[serde(default)]
    pub table_id: String,
    #[serde(default, rename = "scanTB")]
    pub scan_tb: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct OnDemandBillingProjectRun {
    pub billing_projects: Vec<ScanRow>,
    pub top_queries: Vec<TopQueryRow>,
    pub top_users: Vec<ScanBreakdownRow>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct OnDemandUserRun {
    pub users: Vec<ScanRow>,
    pub top_tables: Vec<ScanBreakdownRow>,
    pub top_datasets: Vec<ScanBreakdownRow>,
    pub top_projects: Vec<ScanBreakdownRow>,
    pub top_queries: Vec<TopQueryRow>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct OnDemandProjectRun {
    pub projects: Vec<ScanRow>,
    pub top_tables: Vec<ScanBreakdownRow>,
    pub top_datasets: Vec<ScanBreakdownRow>,
    pub top_queries: Vec<ScopedTopQueryRow>,
    pub top_users: Vec<ScanBreakdownRow>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct OnDemandDatasetRun {
    pub datasets: Vec<ScanRow>,
    pub top_queries: Vec<ScopedTopQueryRow>,
    pub top_users: Vec<ScanBreakdownRow>,
    pub top_tables: Vec<ScanBreakdownRow>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct OnDemandTableRun {
    pub tables: Vec<ScanRow>,
    pub top_queries: Vec<ScopedTopQueryRow>,
    pub top_users: Vec<ScanBreakdownRow>,
}
