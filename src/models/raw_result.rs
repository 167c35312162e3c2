use super::{
    BillingProjectSlotsRun, CostFromTableTypesRow, OnDemandBillingProjectRun, OnDemandDatasetRun,
    OnDemandProjectRun, OnDemandTableRun, OnDemandUserRun, QueryName, ScheduledQueriesMovementRow,
    SlotsExplorerRow, StoragePriceRow, StorageRecommendationsRow, StorageTBRow, UserSlotsRun,
};

/// Reservation model a slot-based result was measured under.
///
/// Flat-rate and the three editions produce identically shaped rows; the
/// tier is what tells them apart downstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReservationTier {
    FlatRate,
    Standard,
    Enterprise,
    EnterprisePlus,
}

impl ReservationTier {
    pub const ALL: [ReservationTier; 4] = [
        Self::FlatRate,
        Self::Standard,
        Self::Enterprise,
        Self::EnterprisePlus,
    ];

    pub fn scheduled_queries_movement(&self) -> QueryName {
        match self {
            Self::FlatRate => QueryName::ScheduledQueriesMovement,
            Self::Standard => QueryName::StandardScheduledQueriesMovement,
            Self::Enterprise => QueryName::EnterpriseScheduledQueriesMovement,
            Self::EnterprisePlus => QueryName::EnterprisePlusScheduledQueriesMovement,
        }
    }

    pub fn slots_explorer(&self) -> QueryName {
        match self {
            Self::FlatRate => QueryName::SlotsExplorerFlatRate,
            Self::Standard => QueryName::StandardSlotsExplorer,
            Self::Enterprise => QueryName::EnterpriseSlotsExplorer,
            Self::EnterprisePlus => QueryName::EnterprisePlusSlotsExplorer,
        }
    }

    pub fn user_slots(&self) -> QueryName {
        match self {
            Self::FlatRate => QueryName::UserSlots,
            Self::Standard => QueryName::StandardUserSlots,
            Self::Enterprise => QueryName::EnterpriseUserSlots,
            Self::EnterprisePlus => QueryName::EnterprisePlusUserSlots,
        }
    }

    pub fn billing_project_slots(&self) -> QueryName {
        match self {
            Self::FlatRate => QueryName::BillingProjectSlots,
            Self::Standard => QueryName::StandardBillingProjectSlots,
            Self::Enterprise => QueryName::EnterpriseBillingProjectSlots,
            Self::EnterprisePlus => QueryName::EnterprisePlusBillingProjectSlots,
        }
    }
}

/// Granularity of a storage rollup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageLevel {
    Table,
    Dataset,
    Project,
}

impl StorageLevel {
    pub fn storage_price(&self) -> QueryName {
        match self {
            Self::Table => QueryName::TableStoragePrice,
            Self::Dataset => QueryName::DatasetStoragePrice,
            Self::Project => QueryName::ProjectStoragePrice,
        }
    }

    pub fn storage_tb(&self) -> QueryName {
        match self {
            Self::Table => QueryName::TableStorageTB,
            Self::Dataset => QueryName::DatasetStorageTB,
            Self::Project => QueryName::ProjectStorageTB,
        }
    }
}

/// Entity dimension of an on-demand scan rollup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanEntity {
    BillingProject,
    User,
    Project,
    Dataset,
    Table,
}

impl ScanEntity {
    /// Key of the rollup expressed in scan price.
    pub fn scan_price(&self) -> QueryName {
        match self {
            Self::BillingProject => QueryName::BillingProjectScanPrice,
            Self::User => QueryName::UserScanPrice,
            Self::Project => QueryName::ProjectScanPrice,
            Self::Dataset => QueryName::DatasetScanPrice,
            Self::Table => QueryName::TableScanPrice,
        }
    }

    /// Key of the rollup expressed in scanned terabytes.
    pub fn scan_tb(&self) -> QueryName {
        match self {
            Self::BillingProject => QueryName::BillingProjectScanTB,
            Self::User => QueryName::UserScanTB,
            Self::Project => QueryName::ProjectScanTB,
            Self::Dataset => QueryName::DatasetScanTB,
            Self::Table => QueryName::TableScanTB,
        }
    }
}

/// Typed result of one query run. One variant per result shape.
#[derive(Debug, Clone, PartialEq)]
pub enum RawResult {
    CostFromTableTypes(Vec<CostFromTableTypesRow>),
    TableStoragePrice(Vec<StoragePriceRow>),
    DatasetStoragePrice(Vec<StoragePriceRow>),
    ProjectStoragePrice(Vec<StoragePriceRow>),
    TableStorageTB(Vec<StorageTBRow>),
    DatasetStorageTB(Vec<StorageTBRow>),
    ProjectStorageTB(Vec<StorageTBRow>),
    StorageSavings(Vec<StorageRecommendationsRow>),
    ScheduledQueriesMovement {
        tier: ReservationTier,
        rows: Vec<ScheduledQueriesMovementRow>,
    },
    SlotsExplorer {
        tier: ReservationTier,
        rows: Vec<SlotsExplorerRow>,
    },
    OnDemandSlotsExplorer(Vec<SlotsExplorerRow>),
    UserSlots {
        tier: ReservationTier,
        run: UserSlotsRun,
    },
    BillingProjectSlots {
        tier: ReservationTier,
        run: BillingProjectSlotsRun,
    },
    OnDemandBillingProject(OnDemandBillingProjectRun),
    OnDemandUser(OnDemandUserRun),
    OnDemandProject(OnDemandProjectRun),
    OnDemandDataset(OnDemandDatasetRun),
    OnDemandTable(OnDemandTableRun),
}

impl RawResult {
    /// Short shape name for logs and errors.
    pub fn shape(&self) -> &'static str {
        match self {
            Self::CostFromTableTypes(_) => "CostFromTableTypes",
            Self::TableStoragePrice(_) => "TableStoragePrice",
            Self::DatasetStoragePrice(_) => "DatasetStoragePrice",
            Self::ProjectStoragePrice(_) => "ProjectStoragePrice",
            Self::TableStorageTB(_) => "TableStorageTB",
            Self::DatasetStorageTB(_) => "DatasetStorageTB",
            Self::ProjectStorageTB(_) => "ProjectStorageTB",
            Self::StorageSavings(_) => "StorageSavings",
            Self::ScheduledQueriesMovement { .. } => "ScheduledQueriesMovement",
            Self::SlotsExplorer { .. } => "SlotsExplorer",
            Self::OnDemandSlotsExplorer(_) => "OnDemandSlotsExplorer",
            Self::UserSlots { .. } => "UserSlots",
            Self::BillingProjectSlots { .. } => "BillingProjectSlots",
            Self::OnDemandBillingProject(_) => "OnDemandBillingProject",
            Self::OnDemandUser(_) => "OnDemandUser",
            Self::OnDemandProject(_) => "OnDemandProject",
            Self::OnDemandDataset(_) => "OnDemandDataset",
            Self::OnDemandTable(_) => "OnDemandTable",
        }
    }
}
