//! Locations of documents in the store.
//!
//! Paths alternate collection and document segments, starting with a
//! collection: `superQuery/simulation-recommender/output/{customer}`.

use std::fmt;

use super::error::{DbError, DbResult};
use crate::models::{QueryName, TimeRange};

const OPTIMIZER: &str = "superQuery";
const SIMULATION_OPTIMISATION: &str = "simulation-optimisation";
const SIMULATION_RECOMMENDER: &str = "simulation-recommender";
const OUTPUT: &str = "output";

const FLAT_RATE: &str = "flat-rate";
const STANDARD: &str = "standard-edition";
const ENTERPRISE: &str = "enterprise-edition";
const ENTERPRISE_PLUS: &str = "enterprise-plus-edition";
const ON_DEMAND: &str = "on-demand";

const ROLL_UPS: &str = "rollUps";
const RECOMMENDATIONS: &str = "recommendations";
const EXPLORER: &str = "explorer";
const TABLES: &str = "tables";

const STORAGE_TB: &str = "storageTB";
const STORAGE_PRICE: &str = "storagePrice";
const SCAN_PRICE: &str = "scanPrice";
const SCAN_TB: &str = "scanTB";
const SLOTS: &str = "slots";

const BILLING_PROJECT: &str = "billingProject";
const USER: &str = "user";
const PROJECT: &str = "project";
const DATASET: &str = "dataset";
const TABLE: &str = "table";

/// Path of a collection.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CollectionPath(String);

/// Path of a document.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DocumentPath(String);

impl CollectionPath {
    /// Top-level collection.
    pub fn root(name: &str) -> Self {
        Self(name.to_string())
    }

    pub fn doc(&self, id: &str) -> DocumentPath {
        DocumentPath(format!("{}/{}", self.0, id))
    }

    /// The document this collection is nested in, if any.
    pub fn parent(&self) -> Option<DocumentPath> {
        self.0
            .rsplit_once('/')
            .map(|(parent, _)| DocumentPath(parent.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl DocumentPath {
    /// Parses a stored path, checking that segments alternate properly.
    pub fn parse(path: &str) -> DbResult<Self> {
        let segments: Vec<&str> = path.split('/').collect();
        if segments.len() % 2 != 0 || segments.iter().any(|s| s.is_empty()) {
            return Err(DbError::Validation(format!(
                "'{path}' is not a document path"
            )));
        }
        Ok(Self(path.to_string()))
    }

    pub fn collection(&self, name: &str) -> CollectionPath {
        CollectionPath(format!("{}/{}", self.0, name))
    }

    /// The collection holding this document.
    pub fn parent(&self) -> CollectionPath {
        match self.0.rsplit_once('/') {
            Some((parent, _)) => CollectionPath(parent.to_string()),
            None => CollectionPath(String::new()),
        }
    }

    /// Last segment.
    pub fn id(&self) -> &str {
        self.0.rsplit_once('/').map_or(&self.0, |(_, id)| id)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for CollectionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn optimizer() -> CollectionPath {
    CollectionPath::root(OPTIMIZER)
}

/// `superQuery/simulation-optimisation/output`
pub fn simulation_optimisation_output() -> CollectionPath {
    optimizer().doc(SIMULATION_OPTIMISATION).collection(OUTPUT)
}

fn recommender(bucket: &str) -> CollectionPath {
    optimizer().doc(SIMULATION_RECOMMENDER).collection(bucket)
}

/// `superQuery/simulation-recommender/output`
pub fn recommender_output() -> CollectionPath {
    recommender(OUTPUT)
}

/// Progress record of a customer's simulation.
pub fn simulation_details_path(customer_id: &str) -> DbResult<DocumentPath> {
    check_customer(customer_id)?;
    Ok(simulation_optimisation_output().doc(customer_id))
}

/// Top-level recommender record of a customer.
pub fn recommendation_details_path(customer_id: &str) -> DbResult<DocumentPath> {
    check_customer(customer_id)?;
    Ok(recommender_output().doc(customer_id))
}

fn check_customer(customer_id: &str) -> DbResult<()> {
    if customer_id.is_empty() || customer_id.contains('/') {
        return Err(DbError::Validation(format!(
            "'{customer_id}' is not a valid customer id"
        )));
    }
    Ok(())
}

/// Where the document of `query` over `time_range` lives for a customer.
///
/// Related names (a rollup and its top-N breakdowns) share one location.
/// Names that never produce a document are rejected.
pub fn resolve_document_path(
    customer_id: &str,
    time_range: TimeRange,
    query: QueryName,
) -> DbResult<DocumentPath> {
    use QueryName as Q;

    check_customer(customer_id)?;
    let tr = time_range.as_str();

    let rollup = |bucket: &str, entity: &str, metric: &str| {
        recommender(bucket)
            .doc(customer_id)
            .collection(ROLL_UPS)
            .doc(tr)
            .collection(entity)
            .doc(metric)
    };
    let recommendations = |bucket: &str| {
        recommender(bucket)
            .doc(customer_id)
            .collection(RECOMMENDATIONS)
            .doc(tr)
    };
    let explorer = |bucket: &str| recommender(bucket).doc(customer_id).collection(EXPLORER).doc(tr);

    let path = match query {
        Q::CostFromTableTypes => simulation_optimisation_output()
            .doc(customer_id)
            .collection(TABLES)
            .doc(tr),

        Q::TableStorageTB => rollup(OUTPUT, TABLE, STORAGE_TB),
        Q::TableStoragePrice => rollup(OUTPUT, TABLE, STORAGE_PRICE),
        Q::DatasetStorageTB => rollup(OUTPUT, DATASET, STORAGE_TB),
        Q::DatasetStoragePrice => rollup(OUTPUT, DATASET, STORAGE_PRICE),
        Q::ProjectStorageTB => rollup(OUTPUT, PROJECT, STORAGE_TB),
        Q::ProjectStoragePrice => rollup(OUTPUT, PROJECT, STORAGE_PRICE),
        Q::StorageSavings => recommendations(OUTPUT),

        Q::ScheduledQueriesMovement => recommendations(FLAT_RATE),
        Q::StandardScheduledQueriesMovement => recommendations(STANDARD),
        Q::EnterpriseScheduledQueriesMovement => recommendations(ENTERPRISE),
        Q::EnterprisePlusScheduledQueriesMovement => recommendations(ENTERPRISE_PLUS),

        Q::SlotsExplorerFlatRate => explorer(FLAT_RATE),
        Q::StandardSlotsExplorer => explorer(STANDARD),
        Q::EnterpriseSlotsExplorer => explorer(ENTERPRISE),
        Q::EnterprisePlusSlotsExplorer => explorer(ENTERPRISE_PLUS),
        Q::SlotsExplorerOnDemand => explorer(ON_DEMAND),

        Q::UserSlots | Q::UserSlotsTopQueries => rollup(FLAT_RATE, USER, SLOTS),
        Q::BillingProjectSlots | Q::BillingProjectSlotsTopQueries | Q::BillingProjectSlotsTopUsers => {
            rollup(FLAT_RATE, BILLING_PROJECT, SLOTS)
        }
        Q::StandardUserSlots => rollup(STANDARD, USER, SLOTS),
        Q::StandardBillingProjectSlots => rollup(STANDARD, BILLING_PROJECT, SLOTS),
        Q::EnterpriseUserSlots => rollup(ENTERPRISE, USER, SLOTS),
        Q::EnterpriseBillingProjectSlots => rollup(ENTERPRISE, BILLING_PROJECT, SLOTS),
        Q::EnterprisePlusUserSlots => rollup(ENTERPRISE_PLUS, USER, SLOTS),
        Q::EnterprisePlusBillingProjectSlots => rollup(ENTERPRISE_PLUS, BILLING_PROJECT, SLOTS),

        Q::LimitingJobsSavings
        | Q::UsePartitionField
        | Q::PhysicalStorage
        | Q::PartitionTables
        | Q::ClusterTables => recommendations(ON_DEMAND),

        Q::BillingProjectScanPrice
        | Q::BillingProjectTopUsersScanPrice
        | Q::BillingProjectTopQueriesScanPrice => rollup(ON_DEMAND, BILLING_PROJECT, SCAN_PRICE),
        Q::BillingProjectScanTB
        | Q::BillingProjectTopUsersScanTB
        | Q::BillingProjectTopQueriesScanTB => rollup(ON_DEMAND, BILLING_PROJECT, SCAN_TB),

        Q::UserScanPrice
        | Q::UserTopProjectsScanPrice
        | Q::UserTopDatasetsScanPrice
        | Q::UserTopTablesScanPrice
        | Q::UserTopQueriesScanPrice => rollup(ON_DEMAND, USER, SCAN_PRICE),
        Q::UserScanTB
        | Q::UserTopProjectsScanTB
        | Q::UserTopDatasetsScanTB
        | Q::UserTopTablesScanTB
        | Q::UserTopQueriesScanTB => rollup(ON_DEMAND, USER, SCAN_TB),

        Q::ProjectScanPrice
        | Q::ProjectTopUsersScanPrice
        | Q::ProjectTopQueriesScanPrice
        | Q::ProjectTopDatasetsScanPrice
        | Q::ProjectTopTablesScanPrice => rollup(ON_DEMAND, PROJECT, SCAN_PRICE),
        Q::ProjectScanTB
        | Q::ProjectTopUsersScanTB
        | Q::ProjectTopQueriesScanTB
        | Q::ProjectTopDatasetsScanTB
        | Q::ProjectTopTablesScanTB => rollup(ON_DEMAND, PROJECT, SCAN_TB),

        Q::DatasetScanPrice
        | Q::DatasetTopUsersScanPrice
        | Q::DatasetTopQueriesScanPrice
        | Q::DatasetTopTablesScanPrice => rollup(ON_DEMAND, DATASET, SCAN_PRICE),
        Q::DatasetScanTB
        | Q::DatasetTopUsersScanTB
        | Q::DatasetTopQueriesScanTB
        | Q::DatasetTopTablesScanTB => rollup(ON_DEMAND, DATASET, SCAN_TB),

        Q::TableScanPrice | Q::TableTopUsersScanPrice | Q::TableTopQueriesScanPrice => {
            rollup(ON_DEMAND, TABLE, SCAN_PRICE)
        }
        Q::TableScanTB | Q::TableTopUsersScanTB | Q::TableTopQueriesScanTB => {
            rollup(ON_DEMAND, TABLE, SCAN_TB)
        }

        // Composite run names; their documents are stored under the
        // per-metric keys above.
        Q::BillingProject | Q::User | Q::Project | Q::Dataset | Q::Table => {
            return Err(DbError::InvalidQuery(query.to_string()));
        }
    };

    Ok(path)
}
