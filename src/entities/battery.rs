//! Battery/Pack entity - the traced physical unit
//!
//! A battery is never deleted; it only advances through terminal states
//! (Deployed, Rma, Retired, Scrapped). All history lives in append-only
//! sub-logs on the record itself.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::audit::{AuditEntry, CustodyEntry, MovementEntry};
use crate::core::identity::{EntityId, EntityPrefix};

/// Battery lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BatteryStatus {
    #[default]
    Assembly,
    Provisioning,
    QaTesting,
    InInventory,
    InTransit,
    Deployed,
    Rma,
    Retired,
    Scrapped,
}

impl BatteryStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            BatteryStatus::Deployed
                | BatteryStatus::Rma
                | BatteryStatus::Retired
                | BatteryStatus::Scrapped
        )
    }

    /// Declarative transition table for the unit lifecycle
    pub fn can_transition(from: BatteryStatus, to: BatteryStatus) -> bool {
        use BatteryStatus::*;
        match (from, to) {
            (Scrapped, _) | (Retired, _) => false,
            // Scrap allowed from any live manufacturing/QA state
            (Assembly | Provisioning | QaTesting | InInventory, Scrapped) => true,
            (Assembly, Provisioning) => true,
            (Provisioning, QaTesting) => true,
            // Rework routes back to assembly
            (QaTesting, Assembly) => true,
            (QaTesting, InInventory) => true,
            (InInventory, InTransit) => true,
            (InTransit, Deployed) => true,
            (InTransit | Deployed, Rma) => true,
            (Deployed | Rma, Retired) => true,
            _ => false,
        }
    }
}

impl std::fmt::Display for BatteryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            BatteryStatus::Assembly => "assembly",
            BatteryStatus::Provisioning => "provisioning",
            BatteryStatus::QaTesting => "qa_testing",
            BatteryStatus::InInventory => "in_inventory",
            BatteryStatus::InTransit => "in_transit",
            BatteryStatus::Deployed => "deployed",
            BatteryStatus::Rma => "rma",
            BatteryStatus::Retired => "retired",
            BatteryStatus::Scrapped => "scrapped",
        };
        write!(f, "{s}")
    }
}

/// Provisioning pipeline progress
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ProvisioningStatus {
    #[default]
    NotStarted,
    InProgress,
    Done,
    Blocked,
}

impl std::fmt::Display for ProvisioningStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ProvisioningStatus::NotStarted => "not_started",
            ProvisioningStatus::InProgress => "in_progress",
            ProvisioningStatus::Done => "done",
            ProvisioningStatus::Blocked => "blocked",
        };
        write!(f, "{s}")
    }
}

/// Ordered provisioning pipeline steps
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProvisioningStep {
    BindBms,
    FlashFirmware,
    Calibration,
    SecurityInjection,
    Verification,
}

impl ProvisioningStep {
    /// The step that must follow this one, if any
    pub fn next(&self) -> Option<ProvisioningStep> {
        use ProvisioningStep::*;
        match self {
            BindBms => Some(FlashFirmware),
            FlashFirmware => Some(Calibration),
            Calibration => Some(SecurityInjection),
            SecurityInjection => Some(Verification),
            Verification => None,
        }
    }

    pub fn first() -> ProvisioningStep {
        ProvisioningStep::BindBms
    }
}

impl std::fmt::Display for ProvisioningStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ProvisioningStep::BindBms => "bind_bms",
            ProvisioningStep::FlashFirmware => "flash_firmware",
            ProvisioningStep::Calibration => "calibration",
            ProvisioningStep::SecurityInjection => "security_injection",
            ProvisioningStep::Verification => "verification",
        };
        write!(f, "{s}")
    }
}

/// End-of-line test verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EolResult {
    Pass,
    Fail,
}

impl std::fmt::Display for EolResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EolResult::Pass => write!(f, "pass"),
            EolResult::Fail => write!(f, "fail"),
        }
    }
}

/// QA disposition after EOL testing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QaDisposition {
    Pass,
    Fail,
    Hold,
    Rework,
    Scrap,
}

impl std::fmt::Display for QaDisposition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            QaDisposition::Pass => "pass",
            QaDisposition::Fail => "fail",
            QaDisposition::Hold => "hold",
            QaDisposition::Rework => "rework",
            QaDisposition::Scrap => "scrap",
        };
        write!(f, "{s}")
    }
}

/// Inventory sub-state of a released battery
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InventoryStatus {
    PendingPutaway,
    Available,
    Reserved,
    Quarantined,
    Dispatched,
}

impl std::fmt::Display for InventoryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            InventoryStatus::PendingPutaway => "pending_putaway",
            InventoryStatus::Available => "available",
            InventoryStatus::Reserved => "reserved",
            InventoryStatus::Quarantined => "quarantined",
            InventoryStatus::Dispatched => "dispatched",
        };
        write!(f, "{s}")
    }
}

/// Custody state of a battery or shipment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CustodyStatus {
    #[default]
    AtFactory,
    InTransit,
    Delivered,
    Accepted,
    Rejected,
}

impl CustodyStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, CustodyStatus::Accepted | CustodyStatus::Rejected)
    }

    pub fn can_transition(from: CustodyStatus, to: CustodyStatus) -> bool {
        use CustodyStatus::*;
        matches!(
            (from, to),
            (AtFactory, InTransit) | (InTransit, Delivered) | (Delivered, Accepted | Rejected)
        )
    }
}

impl std::fmt::Display for CustodyStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            CustodyStatus::AtFactory => "at_factory",
            CustodyStatus::InTransit => "in_transit",
            CustodyStatus::Delivered => "delivered",
            CustodyStatus::Accepted => "accepted",
            CustodyStatus::Rejected => "rejected",
        };
        write!(f, "{s}")
    }
}

/// Inventory record; present only once the battery is released to inventory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryRecord {
    pub status: InventoryStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    /// Dispatch order holding the reservation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reserved_by: Option<EntityId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reserved_at: Option<DateTime<Utc>>,
}

impl InventoryRecord {
    pub fn pending_putaway() -> Self {
        Self {
            status: InventoryStatus::PendingPutaway,
            location: None,
            reserved_by: None,
            reserved_at: None,
        }
    }
}

/// A battery pack, the traced physical unit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Battery {
    pub id: EntityId,
    pub batch_id: EntityId,
    pub sku: String,
    pub serial: String,

    pub status: BatteryStatus,
    #[serde(default)]
    pub provisioning_status: ProvisioningStatus,
    /// Last completed pipeline step
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provisioning_step: Option<ProvisioningStep>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eol_result: Option<EolResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qa_disposition: Option<QaDisposition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub certificate_ref: Option<String>,

    #[serde(default)]
    pub release_to_inventory: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inventory: Option<InventoryRecord>,

    #[serde(default)]
    pub custody_status: CustodyStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dispatch_id: Option<EntityId>,

    #[serde(default)]
    pub rework_flag: bool,
    #[serde(default)]
    pub scrap_flag: bool,

    // Append-only sub-logs
    #[serde(default)]
    pub assembly_events: Vec<AuditEntry>,
    #[serde(default)]
    pub provisioning_log: Vec<AuditEntry>,
    #[serde(default)]
    pub eol_log: Vec<AuditEntry>,
    #[serde(default)]
    pub movement_log: Vec<MovementEntry>,
    #[serde(default)]
    pub custody_log: Vec<CustodyEntry>,
    #[serde(default)]
    pub notes: Vec<AuditEntry>,

    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
    pub author: String,
}

impl Battery {
    pub fn new(batch_id: EntityId, sku: &str, serial: &str, author: &str) -> Self {
        let now = Utc::now();
        Self {
            id: EntityId::new(EntityPrefix::Pk),
            batch_id,
            sku: sku.to_string(),
            serial: serial.to_string(),
            status: BatteryStatus::Assembly,
            provisioning_status: ProvisioningStatus::NotStarted,
            provisioning_step: None,
            eol_result: None,
            qa_disposition: None,
            certificate_ref: None,
            release_to_inventory: false,
            inventory: None,
            custody_status: CustodyStatus::AtFactory,
            dispatch_id: None,
            rework_flag: false,
            scrap_flag: false,
            assembly_events: Vec::new(),
            provisioning_log: Vec::new(),
            eol_log: Vec::new(),
            movement_log: Vec::new(),
            custody_log: Vec::new(),
            notes: Vec::new(),
            created: now,
            updated: now,
            author: author.to_string(),
        }
    }

    pub fn inventory_status(&self) -> Option<InventoryStatus> {
        self.inventory.as_ref().map(|r| r.status)
    }

    pub fn inventory_location(&self) -> Option<&str> {
        self.inventory.as_ref().and_then(|r| r.location.as_deref())
    }

    pub fn touch(&mut self) {
        self.updated = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unit_transition_table() {
        use BatteryStatus::*;
        assert!(BatteryStatus::can_transition(Assembly, Provisioning));
        assert!(BatteryStatus::can_transition(Provisioning, QaTesting));
        assert!(BatteryStatus::can_transition(QaTesting, InInventory));
        assert!(BatteryStatus::can_transition(QaTesting, Assembly));
        assert!(BatteryStatus::can_transition(InInventory, InTransit));
        assert!(BatteryStatus::can_transition(InTransit, Deployed));
        assert!(BatteryStatus::can_transition(Deployed, Rma));

        assert!(!BatteryStatus::can_transition(Assembly, InInventory));
        assert!(!BatteryStatus::can_transition(InTransit, Assembly));
        assert!(!BatteryStatus::can_transition(Scrapped, Assembly));
        assert!(!BatteryStatus::can_transition(Retired, Rma));
    }

    #[test]
    fn test_custody_transition_table() {
        use CustodyStatus::*;
        assert!(CustodyStatus::can_transition(AtFactory, InTransit));
        assert!(CustodyStatus::can_transition(InTransit, Delivered));
        assert!(CustodyStatus::can_transition(Delivered, Accepted));
        assert!(CustodyStatus::can_transition(Delivered, Rejected));

        assert!(!CustodyStatus::can_transition(AtFactory, Delivered));
        assert!(!CustodyStatus::can_transition(Accepted, InTransit));
        assert!(!CustodyStatus::can_transition(Rejected, Delivered));
        assert!(Accepted.is_terminal());
        assert!(Rejected.is_terminal());
    }

    #[test]
    fn test_provisioning_step_order() {
        let mut step = ProvisioningStep::first();
        let mut seen = vec![step];
        while let Some(next) = step.next() {
            seen.push(next);
            step = next;
        }
        assert_eq!(
            seen,
            vec![
                ProvisioningStep::BindBms,
                ProvisioningStep::FlashFirmware,
                ProvisioningStep::Calibration,
                ProvisioningStep::SecurityInjection,
                ProvisioningStep::Verification,
            ]
        );
    }

    #[test]
    fn test_new_battery_defaults() {
        let batch_id = EntityId::new(EntityPrefix::Bat);
        let b = Battery::new(batch_id, "PACK-48V-100AH", "SN-0001", "mfg.line1");
        assert_eq!(b.status, BatteryStatus::Assembly);
        assert_eq!(b.provisioning_status, ProvisioningStatus::NotStarted);
        assert_eq!(b.custody_status, CustodyStatus::AtFactory);
        assert!(b.inventory.is_none());
        assert!(b.certificate_ref.is_none());
        assert!(!b.release_to_inventory);
    }
}
