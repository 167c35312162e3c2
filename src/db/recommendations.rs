use std::collections::BTreeMap;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::instrument;

use super::error::{DbError, DbResult};
use super::paths::{
    DocumentPath, recommendation_details_path, resolve_document_path, simulation_details_path,
};
use super::store::{Document, DocumentStore, WriteOp};
use crate::models::{
    BillingProjectSlotsDocument, CostFromTableTypeDocument, ExplorerDocument, QueryName,
    RecommendationDetails, RecommendationSummary, ReservationTier, ScanEntity, ScanPriceDocument,
    ScanTBDocument, ScheduledQueriesDocument, SimulationDetails, StorageLevel,
    StoragePriceDocument, StorageSavingsDocument, StorageTBDocument, TimeRange, UserSlotsDocument,
};
use crate::optimizer::Clock;

/// Progress value written once a summary is committed.
pub const PROGRESS_DONE: i64 = 100;
pub const STATUS_END: &str = "END";

/// Reads and writes a customer's recommendation documents.
#[derive(Clone)]
pub struct RecommendationsRepo {
    store: Arc<dyn DocumentStore>,
    clock: Arc<dyn Clock>,
}

impl RecommendationsRepo {
    pub fn new(store: Arc<dyn DocumentStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Replaces every document of `summary` and marks the simulation done,
    /// in one transaction.
    ///
    /// Each location is deleted before its new document is created, so
    /// fields of a previous run never survive. The progress record must
    /// already exist.
    #[instrument(skip(self, summary), fields(customer_id = %customer_id, documents = summary.len()))]
    pub async fn commit(&self, customer_id: &str, summary: &RecommendationSummary) -> DbResult<()> {
        let wrap = |source: DbError| DbError::Commit {
            customer_id: customer_id.to_string(),
            source: Box::new(source),
        };

        let mut targets: BTreeMap<DocumentPath, (QueryName, Document)> = BTreeMap::new();
        for (query, time_range, document) in summary.entries() {
            let path = resolve_document_path(customer_id, time_range, query).map_err(wrap)?;
            let body = match document.to_body().map_err(|e| wrap(e.into()))? {
                Value::Object(body) => body,
                other => {
                    return Err(wrap(DbError::Validation(format!(
                        "document of '{query}' is not an object: {other}"
                    ))));
                }
            };
            if let Some((previous, _)) = targets.insert(path.clone(), (query, body)) {
                tracing::warn!(
                    path = %path,
                    previous = %previous,
                    query = %query,
                    "Two summary entries share a location, keeping the later one"
                );
            }
        }

        let progress_path = simulation_details_path(customer_id).map_err(wrap)?;
        let mut ops = Vec::with_capacity(targets.len() * 2 + 1);
        ops.extend(targets.keys().cloned().map(WriteOp::Delete));
        ops.extend(
            targets
                .into_iter()
                .map(|(path, (_, body))| WriteOp::Create(path, body)),
        );
        ops.push(WriteOp::Update(progress_path, progress_fields(self.clock.as_ref())));

        self.store.run_transaction(ops).await.map_err(wrap)?;

        tracing::info!("Committed recommendation summary");
        Ok(())
    }

    /// The stored document of `query` over `time_range`, if any.
    pub async fn get_document<T: DeserializeOwned>(
        &self,
        customer_id: &str,
        time_range: TimeRange,
        query: QueryName,
    ) -> DbResult<Option<T>> {
        let path = resolve_document_path(customer_id, time_range, query)?;
        self.read(&path).await
    }

    async fn read<T: DeserializeOwned>(&self, path: &DocumentPath) -> DbResult<Option<T>> {
        match self.store.get(path).await? {
            Some(body) => Ok(Some(serde_json::from_value(Value::Object(body))?)),
            None => Ok(None),
        }
    }

    pub async fn get_cost_from_table_types(
        &self,
        customer_id: &str,
        time_range: TimeRange,
    ) -> DbResult<Option<CostFromTableTypeDocument>> {
        self.get_document(customer_id, time_range, QueryName::CostFromTableTypes)
            .await
    }

    pub async fn get_storage_price(
        &self,
        customer_id: &str,
        time_range: TimeRange,
        level: StorageLevel,
    ) -> DbResult<Option<StoragePriceDocument>> {
        self.get_document(customer_id, time_range, level.storage_price())
            .await
    }

    pub async fn get_storage_tb(
        &self,
        customer_id: &str,
        time_range: TimeRange,
        level: StorageLevel,
    ) -> DbResult<Option<StorageTBDocument>> {
        self.get_document(customer_id, time_range, level.storage_tb())
            .await
    }

    pub async fn get_storage_savings(
        &self,
        customer_id: &str,
        time_range: TimeRange,
    ) -> DbResult<Option<StorageSavingsDocument>> {
        self.get_document(customer_id, time_range, QueryName::StorageSavings)
            .await
    }

    pub async fn get_scheduled_queries_movement(
        &self,
        customer_id: &str,
        time_range: TimeRange,
        tier: ReservationTier,
    ) -> DbResult<Option<ScheduledQueriesDocument>> {
        self.get_document(customer_id, time_range, tier.scheduled_queries_movement())
            .await
    }

    /// Slots explorer of a reservation tier, or the on-demand one for `None`.
    pub async fn get_explorer(
        &self,
        customer_id: &str,
        time_range: TimeRange,
        tier: Option<ReservationTier>,
    ) -> DbResult<Option<ExplorerDocument>> {
        let query = tier.map_or(QueryName::SlotsExplorerOnDemand, |t| t.slots_explorer());
        self.get_document(customer_id, time_range, query).await
    }

    pub async fn get_user_slots(
        &self,
        customer_id: &str,
        time_range: TimeRange,
        tier: ReservationTier,
    ) -> DbResult<Option<UserSlotsDocument>> {
        self.get_document(customer_id, time_range, tier.user_slots())
            .await
    }

    pub async fn get_billing_project_slots(
        &self,
        customer_id: &str,
        time_range: TimeRange,
        tier: ReservationTier,
    ) -> DbResult<Option<BillingProjectSlotsDocument>> {
        self.get_document(customer_id, time_range, tier.billing_project_slots())
            .await
    }

    pub async fn get_scan_price(
        &self,
        customer_id: &str,
        time_range: TimeRange,
        entity: ScanEntity,
    ) -> DbResult<Option<ScanPriceDocument>> {
        self.get_document(customer_id, time_range, entity.scan_price())
            .await
    }

    pub async fn get_scan_tb(
        &self,
        customer_id: &str,
        time_range: TimeRange,
        entity: ScanEntity,
    ) -> DbResult<Option<ScanTBDocument>> {
        self.get_document(customer_id, time_range, entity.scan_tb())
            .await
    }

    pub async fn get_simulation_details(
        &self,
        customer_id: &str,
    ) -> DbResult<Option<SimulationDetails>> {
        self.read(&simulation_details_path(customer_id)?).await
    }

    pub async fn get_recommendation_details(
        &self,
        customer_id: &str,
    ) -> DbResult<Option<RecommendationDetails>> {
        self.read(&recommendation_details_path(customer_id)?).await
    }

    /// Merges `fields` into the progress record, creating it if needed, and
    /// stamps `lastUpdate`.
    #[instrument(skip(self, fields), fields(customer_id = %customer_id))]
    pub async fn update_simulation_details(
        &self,
        customer_id: &str,
        mut fields: Document,
    ) -> DbResult<()> {
        fields.insert("lastUpdate".into(), json!(self.clock.now()));
        self.store
            .set_merge(&simulation_details_path(customer_id)?, fields)
            .await
    }
}

fn progress_fields(clock: &dyn Clock) -> Document {
    let mut fields = Document::new();
    fields.insert("progress".into(), json!(PROGRESS_DONE));
    fields.insert("status".into(), json!(STATUS_END));
    fields.insert("lastUpdate".into(), json!(clock.now()));
    fields
}
