//! DispatchOrder entity - a shipment grouping one or more batteries

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::audit::{AuditEntry, CustodyEntry};
use crate::core::identity::{EntityId, EntityPrefix};
use crate::entities::battery::CustodyStatus;

/// Dispatch order status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DispatchStatus {
    #[default]
    Draft,
    Picking,
    ReadyToShip,
    Dispatched,
    Completed,
    Cancelled,
}

impl std::fmt::Display for DispatchStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            DispatchStatus::Draft => "draft",
            DispatchStatus::Picking => "picking",
            DispatchStatus::ReadyToShip => "ready_to_ship",
            DispatchStatus::Dispatched => "dispatched",
            DispatchStatus::Completed => "completed",
            DispatchStatus::Cancelled => "cancelled",
        };
        write!(f, "{s}")
    }
}

/// A shipment of batteries to one receiving party
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchOrder {
    pub id: EntityId,
    pub status: DispatchStatus,
    #[serde(default)]
    pub custody_status: CustodyStatus,

    pub customer: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination: Option<String>,

    // Shipping documents
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub packing_list_ref: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manifest_ref: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invoice_ref: Option<String>,

    #[serde(default)]
    pub battery_ids: Vec<EntityId>,

    #[serde(default)]
    pub custody_log: Vec<CustodyEntry>,
    #[serde(default)]
    pub notes: Vec<AuditEntry>,

    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
    pub author: String,
}

impl DispatchOrder {
    pub fn new(customer: &str, author: &str) -> Self {
        let now = Utc::now();
        Self {
            id: EntityId::new(EntityPrefix::Dsp),
            status: DispatchStatus::Draft,
            custody_status: CustodyStatus::AtFactory,
            customer: customer.to_string(),
            destination: None,
            packing_list_ref: None,
            manifest_ref: None,
            invoice_ref: None,
            battery_ids: Vec::new(),
            custody_log: Vec::new(),
            notes: Vec::new(),
            created: now,
            updated: now,
            author: author.to_string(),
        }
    }

    /// Gate for marking the order dispatched
    pub fn ready_for_dispatch(&self) -> Result<(), String> {
        if self.packing_list_ref.is_none() {
            return Err("Packing list reference required before dispatch".to_string());
        }
        if self.battery_ids.is_empty() {
            return Err("Dispatch order has no batteries".to_string());
        }
        Ok(())
    }
}
