//! On-demand scan rollups.
//!
//! Every scan query yields two documents with the same keys: one in
//! discounted scan price and one in scanned terabytes. Breakdown rows
//! (top users, tables, ...) attach to their parent entity, creating it when
//! the parent was absent from the base rows.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use super::storage::entity_key;
use crate::models::{
    CommonTopQuery, EntityIds, OnDemandBillingProjectRun, OnDemandDatasetRun,
    OnDemandProjectRun, OnDemandTableRun, OnDemandUserRun, ScanBreakdownRow, ScanEntity,
    ScanPriceDocument, ScanPriceEntry, ScanRow, ScanTBDocument, ScanTBEntry, ScopedTopQueryRow,
    TopQueryPrice, TopQueryRow, TopQueryTB, TransformerContext,
};

#[derive(Debug, Clone, Copy)]
enum Breakdown {
    Users,
    Tables,
    Datasets,
    Projects,
}

/// Ids of one row, as borrowed strings.
#[derive(Clone, Copy)]
struct RowIds<'a> {
    billing_project_id: &'a str,
    user_id: &'a str,
    project_id: &'a str,
    dataset_id: &'a str,
    table_id: &'a str,
}

impl<'a> From<&'a ScanRow> for RowIds<'a> {
    fn from(row: &'a ScanRow) -> Self {
        Self {
            billing_project_id: &row.billing_project_id,
            user_id: &row.user_id,
            project_id: &row.project_id,
            dataset_id: &row.dataset_id,
            table_id: &row.table_id,
        }
    }
}

impl<'a> From<&'a ScanBreakdownRow> for RowIds<'a> {
    fn from(row: &'a ScanBreakdownRow) -> Self {
        Self {
            billing_project_id: &row.billing_project_id,
            user_id: &row.user_id,
            project_id: &row.project_id,
            dataset_id: &row.dataset_id,
            table_id: &row.table_id,
        }
    }
}

impl<'a> From<&'a TopQueryRow> for RowIds<'a> {
    fn from(row: &'a TopQueryRow) -> Self {
        Self {
            billing_project_id: &row.billing_project_id,
            user_id: &row.user_id,
            project_id: "",
            dataset_id: "",
            table_id: "",
        }
    }
}

impl<'a> From<&'a ScopedTopQueryRow> for RowIds<'a> {
    fn from(row: &'a ScopedTopQueryRow) -> Self {
        Self {
            billing_project_id: &row.query.billing_project_id,
            user_id: &row.query.user_id,
            project_id: &row.project_id,
            dataset_id: &row.dataset_id,
            table_id: &row.table_id,
        }
    }
}

/// Document key and stored ids of the `entity` a row belongs to.
fn identify(entity: ScanEntity, ids: RowIds<'_>) -> (String, EntityIds) {
    match entity {
        ScanEntity::BillingProject => (
            ids.billing_project_id.to_string(),
            EntityIds {
                billing_project_id: ids.billing_project_id.to_string(),
                ..Default::default()
            },
        ),
        ScanEntity::User => (
            ids.user_id.to_string(),
            EntityIds {
                user_id: ids.user_id.to_string(),
                ..Default::default()
            },
        ),
        ScanEntity::Project => (
            ids.project_id.to_string(),
            EntityIds {
                project_id: ids.project_id.to_string(),
                ..Default::default()
            },
        ),
        ScanEntity::Dataset => (
            entity_key(ids.project_id, Some(ids.dataset_id), None),
            EntityIds {
                project_id: ids.project_id.to_string(),
                dataset_id: ids.dataset_id.to_string(),
                ..Default::default()
            },
        ),
        ScanEntity::Table => (
            entity_key(ids.project_id, Some(ids.dataset_id), Some(ids.table_id)),
            EntityIds {
                project_id: ids.project_id.to_string(),
                dataset_id: ids.dataset_id.to_string(),
                table_id: ids.table_id.to_string(),
                ..Default::default()
            },
        ),
    }
}

/// Key of a breakdown row inside its parent's map.
fn breakdown_key(kind: Breakdown, row: &ScanBreakdownRow) -> String {
    match kind {
        Breakdown::Users if row.user_email.is_empty() => row.user_id.clone(),
        Breakdown::Users => row.user_email.clone(),
        Breakdown::Tables => {
            entity_key(&row.project_id, Some(&row.dataset_id), Some(&row.table_id))
        }
        Breakdown::Datasets => entity_key(&row.project_id, Some(&row.dataset_id), None),
        Breakdown::Projects => row.project_id.clone(),
    }
}

/// Both documents of one rollup, built side by side.
struct Rollup<'a> {
    entity: ScanEntity,
    ctx: &'a TransformerContext,
    now: DateTime<Utc>,
    price: ScanPriceDocument,
    tb: ScanTBDocument,
}

impl<'a> Rollup<'a> {
    fn new(entity: ScanEntity, ctx: &'a TransformerContext, now: DateTime<Utc>) -> Self {
        Self {
            entity,
            ctx,
            now,
            price: ScanPriceDocument::new(),
            tb: ScanTBDocument::new(),
        }
    }

    fn entries(&mut self, ids: RowIds<'_>) -> (&mut ScanPriceEntry, &mut ScanTBEntry) {
        let (key, ids) = identify(self.entity, ids);
        let now = self.now;

        let price = self
            .price
            .entry(key.clone())
            .or_insert_with(|| ScanPriceEntry {
                ids: ids.clone(),
                scan_price: 0.0,
                top_queries: BTreeMap::new(),
                top_users: BTreeMap::new(),
                top_tables: BTreeMap::new(),
                top_datasets: BTreeMap::new(),
                top_projects: BTreeMap::new(),
                last_update: now,
            });
        let tb = self.tb.entry(key).or_insert_with(|| ScanTBEntry {
            ids,
            scan_tb: 0.0,
            top_queries: BTreeMap::new(),
            top_users: BTreeMap::new(),
            top_tables: BTreeMap::new(),
            top_datasets: BTreeMap::new(),
            top_projects: BTreeMap::new(),
            last_update: now,
        });
        (price, tb)
    }

    fn base(mut self, rows: &[ScanRow]) -> Self {
        for row in rows {
            let scan_tb = row.scan_tb.unwrap_or(0.0);
            let scan_price = self.ctx.scan_price(scan_tb);
            let (price, tb) = self.entries(row.into());
            price.scan_price += scan_price;
            tb.scan_tb += scan_tb;
        }
        self
    }

    fn breakdown(mut self, kind: Breakdown, rows: &[ScanBreakdownRow]) -> Self {
        for row in rows {
            let scan_tb = row.scan_tb.unwrap_or(0.0);
            let scan_price = self.ctx.scan_price(scan_tb);
            let child = breakdown_key(kind, row);
            let (price, tb) = self.entries(row.into());

            let (price_map, tb_map) = match kind {
                Breakdown::Users => (&mut price.top_users, &mut tb.top_users),
                Breakdown::Tables => (&mut price.top_tables, &mut tb.top_tables),
                Breakdown::Datasets => (&mut price.top_datasets, &mut tb.top_datasets),
                Breakdown::Projects => (&mut price.top_projects, &mut tb.top_projects),
            };
            *price_map.entry(child.clone()).or_default() += scan_price;
            *tb_map.entry(child).or_default() += scan_tb;
        }
        self
    }

    fn top_queries(mut self, rows: &[TopQueryRow]) -> Self {
        for row in rows {
            self.add_query(row.into(), row, ("", "", ""));
        }
        self
    }

    fn scoped_top_queries(mut self, rows: &[ScopedTopQueryRow]) -> Self {
        for row in rows {
            let scope = (
                row.project_id.as_str(),
                row.dataset_id.as_str(),
                row.table_id.as_str(),
            );
            self.add_query(row.into(), &row.query, scope);
        }
        self
    }

    fn add_query(&mut self, ids: RowIds<'_>, row: &TopQueryRow, scope: (&str, &str, &str)) {
        let (project_id, dataset_id, table_id) = scope;
        let avg_scan_tb = row.avg_scan_tb.unwrap_or(0.0);
        let total_scan_tb = row.total_scan_tb.unwrap_or(0.0);
        let common = CommonTopQuery {
            avg_execution_time_sec: row.avg_execution_time_sec.unwrap_or(0.0),
            avg_slots: row.avg_slots.unwrap_or(0.0),
            executed_queries: row.executed_queries,
            total_execution_time_sec: row.total_execution_time_sec.unwrap_or(0.0),
            billing_project_id: row.billing_project_id.clone(),
        };
        let price_query = TopQueryPrice {
            avg_scan_price: self.ctx.scan_price(avg_scan_tb),
            total_scan_price: self.ctx.scan_price(total_scan_tb),
            location: row.location.clone(),
            user_id: row.user_id.clone(),
            project_id: project_id.to_string(),
            dataset_id: dataset_id.to_string(),
            table_id: table_id.to_string(),
            common: common.clone(),
        };
        let tb_query = TopQueryTB {
            avg_scan_tb,
            total_scan_tb,
            location: row.location.clone(),
            user_id: row.user_id.clone(),
            project_id: project_id.to_string(),
            dataset_id: dataset_id.to_string(),
            table_id: table_id.to_string(),
            common,
        };

        let (price, tb) = self.entries(ids);
        price.top_queries.insert(row.job_id.clone(), price_query);
        tb.top_queries.insert(row.job_id.clone(), tb_query);
    }

    fn finish(self) -> (ScanPriceDocument, ScanTBDocument) {
        (self.price, self.tb)
    }
}

pub(super) fn billing_project(
    run: &OnDemandBillingProjectRun,
    ctx: &TransformerContext,
    now: DateTime<Utc>,
) -> (ScanPriceDocument, ScanTBDocument) {
    Rollup::new(ScanEntity::BillingProject, ctx, now)
        .base(&run.billing_projects)
        .top_queries(&run.top_queries)
        .breakdown(Breakdown::Users, &run.top_users)
        .finish()
}

pub(super) fn user(
    run: &OnDemandUserRun,
    ctx: &TransformerContext,
    now: DateTime<Utc>,
) -> (ScanPriceDocument, ScanTBDocument) {
    Rollup::new(ScanEntity::User, ctx, now)
        .base(&run.users)
        .top_queries(&run.top_queries)
        .breakdown(Breakdown::Tables, &run.top_tables)
        .breakdown(Breakdown::Datasets, &run.top_datasets)
        .breakdown(Breakdown::Projects, &run.top_projects)
        .finish()
}

pub(super) fn project(
    run: &OnDemandProjectRun,
    ctx: &TransformerContext,
    now: DateTime<Utc>,
) -> (ScanPriceDocument, ScanTBDocument) {
    Rollup::new(ScanEntity::Project, ctx, now)
        .base(&run.projects)
        .scoped_top_queries(&run.top_queries)
        .breakdown(Breakdown::Tables, &run.top_tables)
        .breakdown(Breakdown::Datasets, &run.top_datasets)
        .breakdown(Breakdown::Users, &run.top_users)
        .finish()
}

pub(super) fn dataset(
    run: &OnDemandDatasetRun,
    ctx: &TransformerContext,
    now: DateTime<Utc>,
) -> (ScanPriceDocument, ScanTBDocument) {
    Rollup::new(ScanEntity::Dataset, ctx, now)
        .base(&run.datasets)
        .scoped_top_queries(&run.top_queries)
        .breakdown(Breakdown::Users, &run.top_users)
        .breakdown(Breakdown::Tables, &run.top_tables)
        .finish()
}

pub(super) fn table(
    run: &OnDemandTableRun,
    ctx: &TransformerContext,
    now: DateTime<Utc>,
) -> (ScanPriceDocument, ScanTBDocument) {
    Rollup::new(ScanEntity::Table, ctx, now)
        .base(&run.tables)
        .scoped_top_queries(&run.top_queries)
        .breakdown(Breakdown::Users, &run.top_users)
        .finish()
}
