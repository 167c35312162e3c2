//! One optimisation run for a single customer.

use serde::Serialize;
use serde_json::json;
use thiserror::Error;
use tracing::instrument;

use super::executor::Executor;
use crate::config::OptimizerConfig;
use crate::db::{DbError, Document, PROGRESS_DONE, RecommendationsRepo, STATUS_END};
use crate::models::{QueryCatalogue, Replacements};

/// Progress written when a run starts.
pub const PROGRESS_STARTED: i64 = 0;
pub const STATUS_RUNNING: &str = "RUNNING";

#[derive(Debug, Error)]
pub enum OptimizeError {
    #[error("{op} failed for customer '{customer_id}': {source}")]
    Operation {
        op: &'static str,
        customer_id: String,
        #[source]
        source: DbError,
    },
}

impl OptimizeError {
    fn operation(op: &'static str, customer_id: &str, source: DbError) -> Self {
        Self::Operation {
            op,
            customer_id: customer_id.to_string(),
            source,
        }
    }
}

/// What a run did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    pub scheduled: usize,
    pub skipped: usize,
    pub failed: usize,
    pub documents: usize,
    /// False when the run stopped before executing any query.
    pub committed: bool,
}

/// Runs the catalogue for `customer_id` and commits whatever it produced.
///
/// Job failures are logged and never prevent the commit; a run where every
/// job failed still commits an empty summary and closes the progress
/// record. When the run stops early, or the commit fails, progress is
/// still set to done so the simulation does not appear stuck.
#[instrument(skip_all, fields(customer_id = %customer_id))]
pub async fn optimize(
    executor: &Executor,
    repo: &RecommendationsRepo,
    customer_id: &str,
    replacements: &Replacements,
    catalogue: &QueryCatalogue,
    config: &OptimizerConfig,
) -> Result<RunReport, OptimizeError> {
    repo.update_simulation_details(customer_id, progress(PROGRESS_STARTED, STATUS_RUNNING))
        .await
        .map_err(|e| OptimizeError::operation("UpdateSimulationDetails", customer_id, e))?;

    if replacements.min_date.is_none() || replacements.max_date.is_none() {
        tracing::info!("Min and max days are not defined, nothing to optimize");
        finish(repo, customer_id).await;
        return Ok(RunReport::default());
    }

    let outcome = executor
        .execute(
            replacements,
            &config.transformer_context(),
            catalogue,
            config.has_discovery_data,
        )
        .await;
    for err in &outcome.errors {
        tracing::error!(error = %err, "Execute failed");
    }

    let summary = outcome.summary.unwrap_or_default();
    if let Err(e) = repo.commit(customer_id, &summary).await {
        finish(repo, customer_id).await;
        return Err(OptimizeError::operation("Commit", customer_id, e));
    }

    let report = RunReport {
        scheduled: outcome.scheduled,
        skipped: outcome.skipped,
        failed: outcome.errors.len(),
        documents: summary.len(),
        committed: true,
    };
    tracing::info!(
        documents = report.documents,
        failed = report.failed,
        "Recommendations committed"
    );
    Ok(report)
}

/// Marks the simulation done. A failure here is only logged.
async fn finish(repo: &RecommendationsRepo, customer_id: &str) {
    if let Err(e) = repo
        .update_simulation_details(customer_id, progress(PROGRESS_DONE, STATUS_END))
        .await
    {
        tracing::error!(error = %e, "Failed to update simulation details");
    }
}

fn progress(value: i64, status: &str) -> Document {
    let mut fields = Document::new();
    fields.insert("progress".into(), json!(value));
    fields.insert("status".into(), json!(status));
    fields
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use chrono::{DateTime, TimeZone, Utc};
    use serde_json::json;

    use super::*;
    use crate::db::{
        CollectionPath, DbResult, DocumentPath, DocumentStore, MemoryDocumentStore, WriteOp,
    };
    use crate::models::{QueryName, TimeRange, UsageMode};
    use crate::optimizer::FixedClock;
    use crate::optimizer::replay::ReplayWarehouse;

    const CUSTOMER: &str = "c1";

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 18, 12, 0, 0).unwrap()
    }

    fn replacements() -> Replacements {
        Replacements {
            project_id: "p".into(),
            dataset_id: "d".into(),
            tables_discovery_table: "discovery".into(),
            location: "US".into(),
            min_date: Some(Utc.with_ymd_and_hms(2024, 4, 1, 0, 0, 0).unwrap()),
            max_date: Some(now()),
            ..Default::default()
        }
    }

    fn catalogue() -> QueryCatalogue {
        QueryCatalogue::default()
            .with_query(
                UsageMode::OnDemand,
                QueryName::SlotsExplorerOnDemand,
                "SELECT slots",
            )
            .with_query(
                UsageMode::Hybrid,
                QueryName::CostFromTableTypes,
                "SELECT types FROM {tablesDiscoveryTable}",
            )
    }

    fn config() -> OptimizerConfig {
        OptimizerConfig {
            has_discovery_data: true,
            ..OptimizerConfig::default()
        }
    }

    fn setup(
        warehouse: ReplayWarehouse,
        store: Arc<dyn DocumentStore>,
    ) -> (Executor, RecommendationsRepo) {
        let clock = Arc::new(FixedClock(now()));
        (
            Executor::new(Arc::new(warehouse), clock.clone()),
            RecommendationsRepo::new(store, clock),
        )
    }

    async fn assert_done(repo: &RecommendationsRepo) {
        let details = repo.get_simulation_details(CUSTOMER).await.unwrap().unwrap();
        assert_eq!(details.progress, Some(PROGRESS_DONE));
        assert_eq!(details.status.as_deref(), Some(STATUS_END));
        assert_eq!(details.last_update, Some(now()));
    }

    #[tokio::test]
    async fn test_partial_failure_still_commits() {
        let warehouse = ReplayWarehouse::new().fail("slots", "quota exceeded").respond(
            "types",
            vec![json!({ "tableName": "t", "tableType": "clustered", "totalTB": 1.0 })],
        );
        let (executor, repo) = setup(warehouse, Arc::new(MemoryDocumentStore::new()));

        let report = optimize(&executor, &repo, CUSTOMER, &replacements(), &catalogue(), &config())
            .await
            .unwrap();

        assert!(report.committed);
        assert_eq!(report.scheduled, 6);
        assert_eq!(report.failed, 3);
        assert_eq!(report.documents, 3);
        for time_range in TimeRange::ALL {
            assert!(
                repo.get_cost_from_table_types(CUSTOMER, time_range)
                    .await
                    .unwrap()
                    .is_some()
            );
            assert!(
                repo.get_explorer(CUSTOMER, time_range, None)
                    .await
                    .unwrap()
                    .is_none()
            );
        }
        assert_done(&repo).await;
    }

    #[tokio::test]
    async fn test_all_jobs_failing_commits_empty_summary() {
        let warehouse = ReplayWarehouse::new().fail("SELECT", "warehouse unavailable");
        let store = Arc::new(MemoryDocumentStore::new());
        let (executor, repo) = setup(warehouse, store.clone());

        let report = optimize(&executor, &repo, CUSTOMER, &replacements(), &catalogue(), &config())
            .await
            .unwrap();

        assert!(report.committed);
        assert_eq!(report.failed, 6);
        assert_eq!(report.documents, 0);
        // Only the progress record is stored.
        assert_eq!(store.len(), 1);
        assert_done(&repo).await;
    }

    #[tokio::test]
    async fn test_discovery_flag_controls_skipping() {
        let warehouse = ReplayWarehouse::new().respond(
            "types",
            vec![json!({ "tableName": "t", "tableType": "clustered", "totalTB": 1.0 })],
        );
        let (executor, repo) = setup(warehouse, Arc::new(MemoryDocumentStore::new()));
        let config = OptimizerConfig {
            has_discovery_data: false,
            ..OptimizerConfig::default()
        };

        let report = optimize(&executor, &repo, CUSTOMER, &replacements(), &catalogue(), &config)
            .await
            .unwrap();

        // Without discovery data the table-type query is skipped.
        assert_eq!(report.skipped, 3);
        assert!(
            repo.get_cost_from_table_types(CUSTOMER, TimeRange::Month)
                .await
                .unwrap()
                .is_none()
        );
        assert_done(&repo).await;
    }

    #[tokio::test]
    async fn test_missing_date_bounds_end_run_without_executing() {
        let warehouse = ReplayWarehouse::new();
        let mut replacements = replacements();
        replacements.max_date = None;
        let store = Arc::new(MemoryDocumentStore::new());
        let clock = Arc::new(FixedClock(now()));
        let warehouse = Arc::new(warehouse);
        let executor = Executor::new(warehouse.clone(), clock.clone());
        let repo = RecommendationsRepo::new(store, clock);

        let report = optimize(&executor, &repo, CUSTOMER, &replacements, &catalogue(), &config())
            .await
            .unwrap();

        assert_eq!(report, RunReport::default());
        assert!(warehouse.queries().is_empty());
        assert_done(&repo).await;
    }

    /// Memory store whose transactions always fail.
    struct FailingCommits(MemoryDocumentStore);

    #[async_trait]
    impl DocumentStore for FailingCommits {
        async fn get(&self, path: &DocumentPath) -> DbResult<Option<Document>> {
            self.0.get(path).await
        }

        async fn list(
            &self,
            collection: &CollectionPath,
        ) -> DbResult<Vec<(DocumentPath, Document)>> {
            self.0.list(collection).await
        }

        async fn run_transaction(&self, ops: Vec<WriteOp>) -> DbResult<()> {
            if ops.iter().any(|op| matches!(op, WriteOp::Create(..))) {
                return Err(DbError::Validation("disk full".into()));
            }
            self.0.run_transaction(ops).await
        }
    }

    #[tokio::test]
    async fn test_failed_commit_still_ends_progress() {
        let warehouse = ReplayWarehouse::new().respond(
            "types",
            vec![json!({ "tableName": "t", "tableType": "clustered", "totalTB": 1.0 })],
        );
        let (executor, repo) = setup(
            warehouse,
            Arc::new(FailingCommits(MemoryDocumentStore::new())),
        );

        let err = optimize(&executor, &repo, CUSTOMER, &replacements(), &catalogue(), &config())
            .await
            .unwrap_err();

        let OptimizeError::Operation { op, customer_id, source } = err;
        assert_eq!(op, "Commit");
        assert_eq!(customer_id, CUSTOMER);
        assert!(matches!(source, DbError::Commit { .. }));
        assert!(
            repo.get_cost_from_table_types(CUSTOMER, TimeRange::Month)
                .await
                .unwrap()
                .is_none()
        );
        assert_done(&repo).await;
    }

    #[test]
    fn test_progress_fields() {
        let fields = progress(PROGRESS_DONE, STATUS_END);
        assert_eq!(fields["progress"], json!(100));
        assert_eq!(fields["status"], json!("END"));
    }
}
