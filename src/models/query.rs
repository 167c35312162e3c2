use std::{fmt, str::FromStr};

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Billing model bucket a query subset applies to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum UsageMode {
    OnDemand,
    FlatRate,
    Hybrid,
    Standard,
    Enterprise,
    EnterprisePlus,
}

impl UsageMode {
    pub const ALL: [UsageMode; 6] = [
        Self::OnDemand,
        Self::FlatRate,
        Self::Hybrid,
        Self::Standard,
        Self::Enterprise,
        Self::EnterprisePlus,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OnDemand => "on-demand",
            Self::FlatRate => "flat-rate",
            Self::Hybrid => "hybrid",
            Self::Standard => "standard",
            Self::Enterprise => "enterprise",
            Self::EnterprisePlus => "enterprise-plus",
        }
    }
}

impl fmt::Display for UsageMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reporting window a query is evaluated over.
///
/// Ordering is day, week, month. The string form doubles as the document id
/// under which each window's result is stored.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TimeRange {
    #[serde(rename = "past-1-day")]
    Day,
    #[serde(rename = "past-7-days")]
    Week,
    #[serde(rename = "past-30-days")]
    Month,
}

impl TimeRange {
    pub const ALL: [TimeRange; 3] = [Self::Day, Self::Week, Self::Month];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Day => "past-1-day",
            Self::Week => "past-7-days",
            Self::Month => "past-30-days",
        }
    }

    /// Length of the window in days.
    pub fn days(&self) -> i64 {
        match self {
            Self::Day => 1,
            Self::Week => 7,
            Self::Month => 30,
        }
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TimeRange {
    type Err = UnknownName;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "past-1-day" | "day" => Ok(Self::Day),
            "past-7-days" | "week" => Ok(Self::Week),
            "past-30-days" | "month" => Ok(Self::Month),
            other => Err(UnknownName(other.to_string())),
        }
    }
}

/// A name that does not match any known variant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown name '{0}'")]
pub struct UnknownName(pub String);

macro_rules! query_names {
    ($($variant:ident => $wire:literal,)+) => {
        /// Identifier of one analytical query variant, or of a document key
        /// produced from one.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub enum QueryName {
            $($variant,)+
        }

        impl QueryName {
            pub const ALL: &'static [QueryName] = &[$(Self::$variant,)+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $wire,)+
                }
            }
        }

        impl FromStr for QueryName {
            type Err = UnknownName;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($wire => Ok(Self::$variant),)+
                    other => Err(UnknownName(other.to_string())),
                }
            }
        }
    };
}

query_names! {
    // Hybrid / shared
    CostFromTableTypes => "costFromTableTypes",
    TableStoragePrice => "tableStoragePrice",
    DatasetStoragePrice => "datasetStoragePrice",
    ProjectStoragePrice => "projectStoragePrice",
    TableStorageTB => "tableStorageTB",
    DatasetStorageTB => "datasetStorageTB",
    ProjectStorageTB => "projectStorageTB",
    StorageSavings => "storageSavings",

    // Flat-rate
    ScheduledQueriesMovement => "scheduledQueriesMovement",
    SlotsExplorerFlatRate => "slotsExplorerFlatRate",
    UserSlots => "userSlots",
    UserSlotsTopQueries => "userSlotsTopQueries",
    BillingProjectSlots => "billingProjectSlots",
    BillingProjectSlotsTopQueries => "billingProjectSlotsTopQueries",
    BillingProjectSlotsTopUsers => "billingProjectSlotsTopUsers",

    // Editions
    StandardScheduledQueriesMovement => "standardScheduledQueriesMovement",
    StandardSlotsExplorer => "standardSlotsExplorer",
    StandardUserSlots => "standardUserSlots",
    StandardBillingProjectSlots => "standardBillingProjectSlots",
    EnterpriseScheduledQueriesMovement => "enterpriseScheduledQueriesMovement",
    EnterpriseSlotsExplorer => "enterpriseSlotsExplorer",
    EnterpriseUserSlots => "enterpriseUserSlots",
    EnterpriseBillingProjectSlots => "enterpriseBillingProjectSlots",
    EnterprisePlusScheduledQueriesMovement => "enterprisePlusScheduledQueriesMovement",
    EnterprisePlusSlotsExplorer => "enterprisePlusSlotsExplorer",
    EnterprisePlusUserSlots => "enterprisePlusUserSlots",
    EnterprisePlusBillingProjectSlots => "enterprisePlusBillingProjectSlots",

    // On-demand runs
    SlotsExplorerOnDemand => "slotsExplorerOnDemand",
    BillingProject => "billingProject",
    User => "user",
    Project => "project",
    Dataset => "dataset",
    Table => "table",

    // On-demand recommendations
    LimitingJobsSavings => "limitingJobsSavings",
    UsePartitionField => "usePartitionField",
    PhysicalStorage => "physicalStorage",
    PartitionTables => "partitionTables",
    ClusterTables => "clusterTables",

    // On-demand scan rollups
    BillingProjectScanPrice => "billingProjectScanPrice",
    BillingProjectTopUsersScanPrice => "billingProjectTopUsersScanPrice",
    BillingProjectTopQueriesScanPrice => "billingProjectTopQueriesScanPrice",
    BillingProjectScanTB => "billingProjectScanTB",
    BillingProjectTopUsersScanTB => "billingProjectTopUsersScanTB",
    BillingProjectTopQueriesScanTB => "billingProjectTopQueriesScanTB",
    UserScanPrice => "userScanPrice",
    UserTopProjectsScanPrice => "userTopProjectsScanPrice",
    UserTopDatasetsScanPrice => "userTopDatasetsScanPrice",
    UserTopTablesScanPrice => "userTopTablesScanPrice",
    UserTopQueriesScanPrice => "userTopQueriesScanPrice",
    UserScanTB => "userScanTB",
    UserTopProjectsScanTB => "userTopProjectsScanTB",
    UserTopDatasetsScanTB => "userTopDatasetsScanTB",
    UserTopTablesScanTB => "userTopTablesScanTB",
    UserTopQueriesScanTB => "userTopQueriesScanTB",
    ProjectScanPrice => "projectScanPrice",
    ProjectTopUsersScanPrice => "projectTopUsersScanPrice",
    ProjectTopQueriesScanPrice => "projectTopQueriesScanPrice",
    ProjectTopDatasetsScanPrice => "projectTopDatasetsScanPrice",
    ProjectTopTablesScanPrice => "projectTopTablesScanPrice",
    ProjectScanTB => "projectScanTB",
    ProjectTopUsersScanTB => "projectTopUsersScanTB",
    ProjectTopQueriesScanTB => "projectTopQueriesScanTB",
    ProjectTopDatasetsScanTB => "projectTopDatasetsScanTB",
    ProjectTopTablesScanTB => "projectTopTablesScanTB",
    DatasetScanPrice => "datasetScanPrice",
    DatasetTopUsersScanPrice => "datasetTopUsersScanPrice",
    DatasetTopQueriesScanPrice => "datasetTopQueriesScanPrice",
    DatasetTopTablesScanPrice => "datasetTopTablesScanPrice",
    DatasetScanTB => "datasetScanTB",
    DatasetTopUsersScanTB => "datasetTopUsersScanTB",
    DatasetTopQueriesScanTB => "datasetTopQueriesScanTB",
    DatasetTopTablesScanTB => "datasetTopTablesScanTB",
    TableScanPrice => "tableScanPrice",
    TableTopUsersScanPrice => "tableTopUsersScanPrice",
    TableTopQueriesScanPrice => "tableTopQueriesScanPrice",
    TableScanTB => "tableScanTB",
    TableTopUsersScanTB => "tableTopUsersScanTB",
    TableTopQueriesScanTB => "tableTopQueriesScanTB",
}

/// Reservation-backed query groups. A customer with no projects in the
/// matching bucket has nothing for these queries to measure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReservationGroup {
    FlatRate,
    Standard,
    Enterprise,
    EnterprisePlus,
}

impl QueryName {
    /// Queries that need the table-discovery inventory to produce anything.
    pub fn requires_discovery(&self) -> bool {
        matches!(
            self,
            Self::CostFromTableTypes
                | Self::TableStoragePrice
                | Self::DatasetStoragePrice
                | Self::ProjectStoragePrice
                | Self::TableStorageTB
                | Self::DatasetStorageTB
                | Self::ProjectStorageTB
                | Self::StorageSavings
        )
    }

    /// Storage size queries. Their result does not depend on the window.
    pub fn is_storage_tb(&self) -> bool {
        matches!(
            self,
            Self::TableStorageTB | Self::DatasetStorageTB | Self::ProjectStorageTB
        )
    }

    /// The reservation group this query belongs to, if any.
    pub fn reservation_group(&self) -> Option<ReservationGroup> {
        match self {
            Self::ScheduledQueriesMovement
            | Self::SlotsExplorerFlatRate
            | Self::UserSlots
            | Self::BillingProjectSlots => Some(ReservationGroup::FlatRate),
            Self::StandardScheduledQueriesMovement
            | Self::StandardSlotsExplorer
            | Self::StandardUserSlots
            | Self::StandardBillingProjectSlots => Some(ReservationGroup::Standard),
            Self::EnterpriseScheduledQueriesMovement
            | Self::EnterpriseSlotsExplorer
            | Self::EnterpriseUserSlots
            | Self::EnterpriseBillingProjectSlots => Some(ReservationGroup::Enterprise),
            Self::EnterprisePlusScheduledQueriesMovement
            | Self::EnterprisePlusSlotsExplorer
            | Self::EnterprisePlusUserSlots
            | Self::EnterprisePlusBillingProjectSlots => Some(ReservationGroup::EnterprisePlus),
            _ => None,
        }
    }

    /// Names whose text bypasses the replacer stage. The composite runners
    /// of the flat-rate slot and on-demand scan queries substitute these
    /// templates themselves.
    pub fn skips_substitution(&self) -> bool {
        matches!(
            self,
            Self::BillingProjectSlots
                | Self::BillingProjectSlotsTopUsers
                | Self::BillingProjectSlotsTopQueries
                | Self::UserSlots
                | Self::UserSlotsTopQueries
                | Self::BillingProject
                | Self::User
                | Self::Project
                | Self::Dataset
        )
    }
}

impl fmt::Display for QueryName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for QueryName {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for QueryName {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn test_query_name_round_trips_through_wire_name() {
        let mut seen = HashSet::new();
        for name in QueryName::ALL {
            assert!(seen.insert(name.as_str()), "duplicate wire name {}", name);
            assert_eq!(name.as_str().parse::<QueryName>().unwrap(), *name);
        }
    }

    #[test]
    fn test_unknown_query_name_is_rejected() {
        let err = "notAQuery".parse::<QueryName>().unwrap_err();
        assert_eq!(err.to_string(), "unknown name 'notAQuery'");
    }

    #[test]
    fn test_reservation_groups_are_disjoint_and_sized() {
        let mut counts = std::collections::HashMap::new();
        for name in QueryName::ALL {
            if let Some(group) = name.reservation_group() {
                *counts.entry(group).or_insert(0) += 1;
            }
        }
        // One scheduled-movement, explorer, user-slots and billing-project
        // query per group; a name can only ever map to a single group.
        for group in [
            ReservationGroup::FlatRate,
            ReservationGroup::Standard,
            ReservationGroup::Enterprise,
            ReservationGroup::EnterprisePlus,
        ] {
            assert_eq!(counts.get(&group), Some(&4), "{group:?}");
        }
    }

    #[test]
    fn test_storage_tb_queries_require_discovery() {
        for name in QueryName::ALL.iter().filter(|n| n.is_storage_tb()) {
            assert!(name.requires_discovery());
        }
    }

    #[test]
    fn test_time_range_order_and_names() {
        assert!(TimeRange::Day < TimeRange::Week && TimeRange::Week < TimeRange::Month);
        assert_eq!(TimeRange::Week.as_str(), "past-7-days");
        assert_eq!("month".parse::<TimeRange>().unwrap(), TimeRange::Month);
        assert_eq!(
            serde_json::to_string(&TimeRange::Day).unwrap(),
            "\"past-1-day\""
        );
    }

    #[test]
    fn test_query_name_serde() {
        let json = serde_json::to_string(&QueryName::UserTopTablesScanTB).unwrap();
        assert_eq!(json, "\"userTopTablesScanTB\"");
        let back: QueryName = serde_json::from_str(&json).unwrap();
        assert_eq!(back, QueryName::UserTopTablesScanTB);
    }
}
