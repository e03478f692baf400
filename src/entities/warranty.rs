//! WarrantyClaim entity - a customer-reported issue against one battery

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::audit::AuditEntry;
use crate::core::identity::{EntityId, EntityPrefix};

/// Claim lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ClaimStatus {
    #[default]
    Open,
    UnderInvestigation,
    Resolved,
    Closed,
}

impl ClaimStatus {
    pub fn can_transition(from: ClaimStatus, to: ClaimStatus) -> bool {
        use ClaimStatus::*;
        matches!(
            (from, to),
            (Open, UnderInvestigation) | (UnderInvestigation, Resolved) | (Resolved, Closed)
        )
    }
}

impl std::fmt::Display for ClaimStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ClaimStatus::Open => "open",
            ClaimStatus::UnderInvestigation => "under_investigation",
            ClaimStatus::Resolved => "resolved",
            ClaimStatus::Closed => "closed",
        };
        write!(f, "{s}")
    }
}

/// Claim priority
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ClaimPriority {
    Low,
    #[default]
    Medium,
    High,
    Critical,
}

impl std::fmt::Display for ClaimPriority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ClaimPriority::Low => "low",
            ClaimPriority::Medium => "medium",
            ClaimPriority::High => "high",
            ClaimPriority::Critical => "critical",
        };
        write!(f, "{s}")
    }
}

/// Reported failure category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureCategory {
    CapacityFade,
    CellImbalance,
    BmsFault,
    ThermalEvent,
    MechanicalDamage,
    ConnectorFailure,
    Unknown,
}

impl std::fmt::Display for FailureCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            FailureCategory::CapacityFade => "capacity_fade",
            FailureCategory::CellImbalance => "cell_imbalance",
            FailureCategory::BmsFault => "bms_fault",
            FailureCategory::ThermalEvent => "thermal_event",
            FailureCategory::MechanicalDamage => "mechanical_damage",
            FailureCategory::ConnectorFailure => "connector_failure",
            FailureCategory::Unknown => "unknown",
        };
        write!(f, "{s}")
    }
}

/// Resolution disposition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClaimDisposition {
    Repair,
    Replace,
    NoFaultFound,
    Goodwill,
}

/// Who carries the cost
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LiabilityAttribution {
    Manufacturer,
    Supplier,
    Customer,
    Shared,
}

/// A warranty claim against one battery
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WarrantyClaim {
    pub id: EntityId,
    pub battery_id: EntityId,
    pub status: ClaimStatus,
    pub priority: ClaimPriority,
    pub failure_category: FailureCategory,
    pub description: String,

    /// Root-cause analysis, recorded during investigation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rca: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disposition: Option<ClaimDisposition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub liability: Option<LiabilityAttribution>,

    #[serde(default)]
    pub notes: Vec<AuditEntry>,

    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
    pub author: String,
}

impl WarrantyClaim {
    pub fn new(
        battery_id: EntityId,
        priority: ClaimPriority,
        failure_category: FailureCategory,
        description: &str,
        author: &str,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: EntityId::new(EntityPrefix::Wc),
            battery_id,
            status: ClaimStatus::Open,
            priority,
            failure_category,
            description: description.to_string(),
            rca: None,
            disposition: None,
            liability: None,
            notes: Vec::new(),
            created: now,
            updated: now,
            author: author.to_string(),
        }
    }
}
