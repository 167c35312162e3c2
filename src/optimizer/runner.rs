//! Typed adapters between query names and the warehouse.
//!
//! The warehouse returns rows as JSON objects; each [`Runner`] knows which
//! row struct to decode them into and which [`RawResult`] variant carries
//! them. Composite runners fetch secondary row sets from the catalogue's
//! sub-queries.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use thiserror::Error;

use super::templating::{TemplateError, Templater};
use crate::models::{
    BillingProjectSlotsRun, OnDemandBillingProjectRun, OnDemandDatasetRun, OnDemandProjectRun,
    OnDemandTableRun, OnDemandUserRun, QueryCatalogue, QueryName, RawResult, ReservationTier,
    ScanEntity, StorageLevel, SubQuery, TimeRange, UserSlotsRun,
};

#[derive(Debug, Error)]
#[error("warehouse query failed: {0}")]
pub struct WarehouseError(pub String);

pub type WarehouseResult<T> = Result<T, WarehouseError>;

/// Query access to the customer's warehouse.
#[async_trait]
pub trait Warehouse: Send + Sync {
    /// Runs `sql` in `location` and returns every row as a JSON object.
    async fn query(&self, sql: &str, location: &str) -> WarehouseResult<Vec<serde_json::Value>>;
}

#[derive(Debug, Error)]
pub enum RunnerError {
    #[error(transparent)]
    Warehouse(#[from] WarehouseError),

    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error("failed to decode rows of '{query}': {source}")]
    Decode {
        query: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("no template for sub-query '{0}'")]
    MissingSubQuery(SubQuery),
}

pub type RunnerResult<T> = Result<T, RunnerError>;

/// How to execute one query and type its rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Runner {
    CostFromTableTypes,
    StoragePrice(StorageLevel),
    StorageTB(StorageLevel),
    StorageSavings,
    ScheduledQueriesMovement(ReservationTier),
    SlotsExplorer(ReservationTier),
    OnDemandSlotsExplorer,
    UserSlots(ReservationTier),
    BillingProjectSlots(ReservationTier),
    OnDemand(ScanEntity),
}

/// Everything a runner needs for one job.
pub struct RunContext<'a> {
    pub warehouse: &'a dyn Warehouse,
    pub templater: &'a Templater<'a>,
    pub catalogue: &'a QueryCatalogue,
    pub query: QueryName,
    pub time_range: TimeRange,
}

impl RunContext<'_> {
    fn location(&self) -> &str {
        &self.templater.replacements.location
    }
}

impl Runner {
    /// Runner for a query name. Names that only exist as document keys
    /// (sub-queries, per-metric outputs) have none.
    pub fn for_query(query: QueryName) -> Option<Runner> {
        use QueryName as Q;
        use ReservationTier as T;

        let runner = match query {
            Q::CostFromTableTypes => Self::CostFromTableTypes,
            Q::TableStoragePrice => Self::StoragePrice(StorageLevel::Table),
            Q::DatasetStoragePrice => Self::StoragePrice(StorageLevel::Dataset),
            Q::ProjectStoragePrice => Self::StoragePrice(StorageLevel::Project),
            Q::TableStorageTB => Self::StorageTB(StorageLevel::Table),
            Q::DatasetStorageTB => Self::StorageTB(StorageLevel::Dataset),
            Q::ProjectStorageTB => Self::StorageTB(StorageLevel::Project),
            Q::StorageSavings => Self::StorageSavings,

            Q::ScheduledQueriesMovement => Self::ScheduledQueriesMovement(T::FlatRate),
            Q::StandardScheduledQueriesMovement => Self::ScheduledQueriesMovement(T::Standard),
            Q::EnterpriseScheduledQueriesMovement => Self::ScheduledQueriesMovement(T::Enterprise),
            Q::EnterprisePlusScheduledQueriesMovement => {
                Self::ScheduledQueriesMovement(T::EnterprisePlus)
            }

            Q::SlotsExplorerFlatRate => Self::SlotsExplorer(T::FlatRate),
            Q::StandardSlotsExplorer => Self::SlotsExplorer(T::Standard),
            Q::EnterpriseSlotsExplorer => Self::SlotsExplorer(T::Enterprise),
            Q::EnterprisePlusSlotsExplorer => Self::SlotsExplorer(T::EnterprisePlus),
            Q::SlotsExplorerOnDemand => Self::OnDemandSlotsExplorer,

            Q::UserSlots => Self::UserSlots(T::FlatRate),
            Q::StandardUserSlots => Self::UserSlots(T::Standard),
            Q::EnterpriseUserSlots => Self::UserSlots(T::Enterprise),
            Q::EnterprisePlusUserSlots => Self::UserSlots(T::EnterprisePlus),

            Q::BillingProjectSlots => Self::BillingProjectSlots(T::FlatRate),
            Q::StandardBillingProjectSlots => Self::BillingProjectSlots(T::Standard),
            Q::EnterpriseBillingProjectSlots => Self::BillingProjectSlots(T::Enterprise),
            Q::EnterprisePlusBillingProjectSlots => Self::BillingProjectSlots(T::EnterprisePlus),

            Q::BillingProject => Self::OnDemand(ScanEntity::BillingProject),
            Q::User => Self::OnDemand(ScanEntity::User),
            Q::Project => Self::OnDemand(ScanEntity::Project),
            Q::Dataset => Self::OnDemand(ScanEntity::Dataset),
            Q::Table => Self::OnDemand(ScanEntity::Table),

            _ => return None,
        };
        Some(runner)
    }

    /// Keys under which this runner's transformed documents are stored.
    pub fn output_queries(&self) -> Vec<QueryName> {
        use QueryName as Q;

        match self {
            Self::CostFromTableTypes => vec![Q::CostFromTableTypes],
            Self::StoragePrice(level) => vec![level.storage_price()],
            Self::StorageTB(level) => vec![level.storage_tb()],
            Self::StorageSavings => vec![Q::StorageSavings],
            Self::ScheduledQueriesMovement(tier) => vec![tier.scheduled_queries_movement()],
            Self::SlotsExplorer(tier) => vec![tier.slots_explorer()],
            Self::OnDemandSlotsExplorer => vec![Q::SlotsExplorerOnDemand],
            Self::UserSlots(tier) => vec![tier.user_slots()],
            Self::BillingProjectSlots(tier) => vec![tier.billing_project_slots()],
            Self::OnDemand(entity) => vec![entity.scan_price(), entity.scan_tb()],
        }
    }

    /// Runs the job. `sql` is the substituted text, or the raw template for
    /// names that skip the replacer stage.
    pub async fn run(&self, ctx: &RunContext<'_>, sql: &str) -> RunnerResult<RawResult> {
        let result = match *self {
            Self::CostFromTableTypes => RawResult::CostFromTableTypes(fetch(ctx, sql).await?),
            Self::StoragePrice(level) => {
                let rows = fetch(ctx, sql).await?;
                match level {
                    StorageLevel::Table => RawResult::TableStoragePrice(rows),
                    StorageLevel::Dataset => RawResult::DatasetStoragePrice(rows),
                    StorageLevel::Project => RawResult::ProjectStoragePrice(rows),
                }
            }
            Self::StorageTB(level) => {
                let rows = fetch(ctx, sql).await?;
                match level {
                    StorageLevel::Table => RawResult::TableStorageTB(rows),
                    StorageLevel::Dataset => RawResult::DatasetStorageTB(rows),
                    StorageLevel::Project => RawResult::ProjectStorageTB(rows),
                }
            }
            Self::StorageSavings => RawResult::StorageSavings(fetch(ctx, sql).await?),
            Self::ScheduledQueriesMovement(tier) => RawResult::ScheduledQueriesMovement {
                tier,
                rows: fetch(ctx, sql).await?,
            },
            Self::SlotsExplorer(tier) => RawResult::SlotsExplorer {
                tier,
                rows: fetch(ctx, sql).await?,
            },
            Self::OnDemandSlotsExplorer => RawResult::OnDemandSlotsExplorer(fetch(ctx, sql).await?),
            Self::UserSlots(tier) => {
                let slots = fetch_primary(ctx, sql).await?;
                let top_queries = fetch_sub(ctx, SubQuery::UserSlotsTopQueries).await?;
                RawResult::UserSlots {
                    tier,
                    run: UserSlotsRun { slots, top_queries },
                }
            }
            Self::BillingProjectSlots(tier) => {
                let slots = fetch_primary(ctx, sql).await?;
                let top_queries = fetch_sub(ctx, SubQuery::BillingProjectSlotsTopQueries).await?;
                let top_users = fetch_sub(ctx, SubQuery::BillingProjectSlotsTopUsers).await?;
                RawResult::BillingProjectSlots {
                    tier,
                    run: BillingProjectSlotsRun {
                        slots,
                        top_queries,
                        top_users,
                    },
                }
            }
            Self::OnDemand(entity) => run_on_demand(ctx, sql, entity).await?,
        };
        Ok(result)
    }
}

async fn run_on_demand(ctx: &RunContext<'_>, sql: &str, entity: ScanEntity) -> RunnerResult<RawResult> {
    let result = match entity {
        ScanEntity::BillingProject => RawResult::OnDemandBillingProject(OnDemandBillingProjectRun {
            billing_projects: fetch_primary(ctx, sql).await?,
            top_queries: fetch_sub(ctx, SubQuery::BillingProjectTopQueries).await?,
            top_users: fetch_sub(ctx, SubQuery::BillingProjectTopUsers).await?,
        }),
        ScanEntity::User => RawResult::OnDemandUser(OnDemandUserRun {
            users: fetch_primary(ctx, sql).await?,
            top_tables: fetch_sub(ctx, SubQuery::UserTopTables).await?,
            top_datasets: fetch_sub(ctx, SubQuery::UserTopDatasets).await?,
            top_projects: fetch_sub(ctx, SubQuery::UserTopProjects).await?,
            top_queries: fetch_sub(ctx, SubQuery::UserTopQueries).await?,
        }),
        ScanEntity::Project => RawResult::OnDemandProject(OnDemandProjectRun {
            projects: fetch_primary(ctx, sql).await?,
            top_tables: fetch_sub(ctx, SubQuery::ProjectTopTables).await?,
            top_datasets: fetch_sub(ctx, SubQuery::ProjectTopDatasets).await?,
            top_queries: fetch_sub(ctx, SubQuery::ProjectTopQueries).await?,
            top_users: fetch_sub(ctx, SubQuery::ProjectTopUsers).await?,
        }),
        ScanEntity::Dataset => RawResult::OnDemandDataset(OnDemandDatasetRun {
            datasets: fetch_primary(ctx, sql).await?,
            top_queries: fetch_sub(ctx, SubQuery::DatasetTopQueries).await?,
            top_users: fetch_sub(ctx, SubQuery::DatasetTopUsers).await?,
            top_tables: fetch_sub(ctx, SubQuery::DatasetTopTables).await?,
        }),
        ScanEntity::Table => RawResult::OnDemandTable(OnDemandTableRun {
            tables: fetch_primary(ctx, sql).await?,
            top_queries: fetch_sub(ctx, SubQuery::TableTopQueries).await?,
            top_users: fetch_sub(ctx, SubQuery::TableTopUsers).await?,
        }),
    };
    Ok(result)
}

async fn fetch<T: DeserializeOwned>(ctx: &RunContext<'_>, sql: &str) -> RunnerResult<Vec<T>> {
    let rows = ctx.warehouse.query(sql, ctx.location()).await?;
    decode(ctx.query.as_str(), rows)
}

/// Primary rows of a composite run. Raw templates of names that skip the
/// replacer stage are substituted here.
async fn fetch_primary<T: DeserializeOwned>(ctx: &RunContext<'_>, sql: &str) -> RunnerResult<Vec<T>> {
    if ctx.query.skips_substitution() {
        fetch_template(ctx, sql).await
    } else {
        fetch(ctx, sql).await
    }
}

/// Substitutes and runs `template` for the job's query and window.
async fn fetch_template<T: DeserializeOwned>(
    ctx: &RunContext<'_>,
    template: &str,
) -> RunnerResult<Vec<T>> {
    let sql = ctx.templater.substitute(ctx.query, template, ctx.time_range)?;
    fetch(ctx, &sql).await
}

/// Secondary row set of a composite run. A failure here only costs the
/// secondary rows; the primary result is still reported.
async fn fetch_sub<T: DeserializeOwned>(ctx: &RunContext<'_>, sub: SubQuery) -> RunnerResult<Vec<T>> {
    let template = ctx
        .catalogue
        .sub_queries
        .get(&sub)
        .ok_or(RunnerError::MissingSubQuery(sub))?;

    match fetch_template(ctx, template).await {
        Ok(rows) => Ok(rows),
        Err(e) => {
            tracing::warn!(
                query = %ctx.query,
                sub_query = %sub,
                time_range = %ctx.time_range,
                error = %e,
                "Sub-query failed, continuing without its rows"
            );
            Ok(Vec::new())
        }
    }
}

fn decode<T: DeserializeOwned>(query: &str, rows: Vec<serde_json::Value>) -> RunnerResult<Vec<T>> {
    rows.into_iter()
        .map(serde_json::from_value)
        .collect::<Result<Vec<T>, _>>()
        .map_err(|source| RunnerError::Decode {
            query: query.to_string(),
            source,
        })
}
