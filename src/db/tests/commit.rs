//! Shared tests for committing recommendation summaries
//!
//! Tests take the store as a trait object and build a repository with a
//! fixed clock on top of it.

use std::{collections::BTreeMap, sync::Arc};

use chrono::{DateTime, TimeZone, Utc};
use serde_json::{Value, json};

use crate::{
    db::{
        DbError, Document, DocumentStore, PROGRESS_DONE, RecommendationsRepo, STATUS_END,
        resolve_document_path,
    },
    models::{
        CostFromTableTypeDocument, ExplorerDocument, QueryName, RecommendationDocument,
        RecommendationSummary, TableTypeCost, TableValue, TimeRange, TimeSeriesData,
    },
    optimizer::FixedClock,
};

const CUSTOMER: &str = "c1";

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 18, 12, 0, 0).unwrap()
}

fn repo(store: Arc<dyn DocumentStore>) -> RecommendationsRepo {
    RecommendationsRepo::new(store, Arc::new(FixedClock(now())))
}

fn fields(value: Value) -> Document {
    match value {
        Value::Object(map) => map,
        other => panic!("expected a JSON object, got {other}"),
    }
}

fn table_types() -> CostFromTableTypeDocument {
    let mut data = BTreeMap::new();
    data.insert(
        "BASE TABLE".to_string(),
        TableTypeCost {
            tables: vec![TableValue {
                table_name: Some("p.d.t".into()),
                value: 2.0,
            }],
            tb: 2.0,
            percentage: 100.0,
        },
    );
    CostFromTableTypeDocument {
        data,
        last_update: now(),
    }
}

fn explorer() -> ExplorerDocument {
    ExplorerDocument {
        day: TimeSeriesData {
            x_axis: vec!["2024-05-17".into()],
            bar: vec![12.5],
            line: vec![40.0],
        },
        hour: TimeSeriesData::default(),
        last_update: now(),
    }
}

fn summary() -> RecommendationSummary {
    let mut summary = RecommendationSummary::new();
    summary.insert(
        QueryName::CostFromTableTypes,
        TimeRange::Month,
        RecommendationDocument::CostFromTableTypes(table_types()),
    );
    summary.insert(
        QueryName::SlotsExplorerOnDemand,
        TimeRange::Day,
        RecommendationDocument::Explorer(explorer()),
    );
    summary
}

async fn seed_stale_table_types(store: &dyn DocumentStore) {
    let path = resolve_document_path(CUSTOMER, TimeRange::Month, QueryName::CostFromTableTypes)
        .unwrap();
    store
        .create(&path, fields(json!({"stale": true, "data": {}})))
        .await
        .unwrap();
}

async fn start_simulation(repo: &RecommendationsRepo) {
    repo.update_simulation_details(
        CUSTOMER,
        fields(json!({"progress": 10, "status": "RUNNING", "jobId": "job-1"})),
    )
    .await
    .unwrap();
}

// ============================================================================
// Commit Tests
// ============================================================================

pub async fn test_commit_replaces_stale_documents(store: Arc<dyn DocumentStore>) {
    let repo = repo(store.clone());
    start_simulation(&repo).await;
    seed_stale_table_types(store.as_ref()).await;

    repo.commit(CUSTOMER, &summary()).await.expect("commit should succeed");

    let path = resolve_document_path(CUSTOMER, TimeRange::Month, QueryName::CostFromTableTypes)
        .unwrap();
    let raw = store.get(&path).await.unwrap().unwrap();
    assert!(!raw.contains_key("stale"), "fields of the old document survived");

    let stored = repo
        .get_cost_from_table_types(CUSTOMER, TimeRange::Month)
        .await
        .unwrap();
    assert_eq!(stored, Some(table_types()));

    let stored = repo
        .get_explorer(CUSTOMER, TimeRange::Day, None)
        .await
        .unwrap();
    assert_eq!(stored, Some(explorer()));

    let details = repo.get_simulation_details(CUSTOMER).await.unwrap().unwrap();
    assert_eq!(details.progress, Some(PROGRESS_DONE));
    assert_eq!(details.status.as_deref(), Some(STATUS_END));
    assert_eq!(details.last_update, Some(now()));
    assert_eq!(details.extra.get("jobId"), Some(&json!("job-1")));
}

pub async fn test_commit_is_idempotent(store: Arc<dyn DocumentStore>) {
    let repo = repo(store.clone());
    start_simulation(&repo).await;

    repo.commit(CUSTOMER, &summary()).await.unwrap();
    let path = resolve_document_path(CUSTOMER, TimeRange::Day, QueryName::SlotsExplorerOnDemand)
        .unwrap();
    let first = store.get(&path).await.unwrap();

    repo.commit(CUSTOMER, &summary()).await.unwrap();
    let second = store.get(&path).await.unwrap();

    assert!(first.is_some());
    assert_eq!(first, second);
    assert_eq!(
        store.list(&path.parent()).await.unwrap().len(),
        1,
        "re-committing must not add documents"
    );
}

pub async fn test_commit_without_progress_record_leaves_store_untouched(
    store: Arc<dyn DocumentStore>,
) {
    let repo = repo(store.clone());
    seed_stale_table_types(store.as_ref()).await;

    let err = repo.commit(CUSTOMER, &summary()).await.unwrap_err();

    let DbError::Commit { customer_id, source } = err else {
        panic!("expected a commit error");
    };
    assert_eq!(customer_id, CUSTOMER);
    let DbError::Transaction { op, source, .. } = *source else {
        panic!("expected a transaction error");
    };
    assert_eq!(op, "Update");
    assert!(matches!(*source, DbError::NotFound));

    let path = resolve_document_path(CUSTOMER, TimeRange::Month, QueryName::CostFromTableTypes)
        .unwrap();
    let raw = store.get(&path).await.unwrap().unwrap();
    assert_eq!(raw.get("stale"), Some(&json!(true)));
    assert!(
        repo.get_explorer(CUSTOMER, TimeRange::Day, None)
            .await
            .unwrap()
            .is_none()
    );
    assert!(repo.get_simulation_details(CUSTOMER).await.unwrap().is_none());
}

pub async fn test_commit_empty_summary_marks_progress(store: Arc<dyn DocumentStore>) {
    let repo = repo(store);
    start_simulation(&repo).await;

    repo.commit(CUSTOMER, &RecommendationSummary::new())
        .await
        .unwrap();

    let details = repo.get_simulation_details(CUSTOMER).await.unwrap().unwrap();
    assert_eq!(details.progress, Some(PROGRESS_DONE));
    assert_eq!(details.status.as_deref(), Some(STATUS_END));
}

pub async fn test_commits_are_isolated_per_customer(store: Arc<dyn DocumentStore>) {
    let repo = repo(store);
    start_simulation(&repo).await;
    repo.update_simulation_details("c2", Document::new())
        .await
        .unwrap();

    repo.commit(CUSTOMER, &summary()).await.unwrap();

    assert!(
        repo.get_cost_from_table_types("c2", TimeRange::Month)
            .await
            .unwrap()
            .is_none()
    );
    let other = repo.get_simulation_details("c2").await.unwrap().unwrap();
    assert_eq!(other.progress, None);
}

// ============================================================================
// Backends
// ============================================================================

macro_rules! commit_tests {
    ($make:expr) => {
        commit_test!($make, test_commit_replaces_stale_documents);
        commit_test!($make, test_commit_is_idempotent);
        commit_test!($make, test_commit_without_progress_record_leaves_store_untouched);
        commit_test!($make, test_commit_empty_summary_marks_progress);
        commit_test!($make, test_commits_are_isolated_per_customer);
    };
}

macro_rules! commit_test {
    ($make:expr, $name:ident) => {
        #[tokio::test]
        async fn $name() {
            let store: std::sync::Arc<dyn crate::db::DocumentStore> = $make.await;
            super::$name(store).await;
        }
    };
}

mod memory_tests {
    use std::sync::Arc;

    use crate::db::MemoryDocumentStore;

    async fn create_store() -> Arc<MemoryDocumentStore> {
        Arc::new(MemoryDocumentStore::new())
    }

    commit_tests!(create_store());
}

#[cfg(feature = "database-sqlite")]
mod sqlite_tests {
    use std::sync::Arc;

    use crate::db::{
        SqliteDocumentStore,
        tests::harness::{create_sqlite_pool, run_sqlite_migrations},
    };

    async fn create_store() -> Arc<SqliteDocumentStore> {
        let pool = create_sqlite_pool().await;
        run_sqlite_migrations(&pool).await;
        Arc::new(SqliteDocumentStore::new(pool))
    }

    commit_tests!(create_store());
}
