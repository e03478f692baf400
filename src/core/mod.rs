//! Core module - engines, store, identity and errors

pub mod audit;
pub mod batch_flow;
pub mod battery_flow;
pub mod capability;
pub mod compliance;
pub mod custody;
pub mod eol;
pub mod error;
pub mod findings;
pub mod identity;
pub mod store;
pub mod warranty;

pub use audit::{AuditEntry, CustodyEntry, MovementEntry};
pub use batch_flow::{BatchFlow, BatchSpec};
pub use battery_flow::{BatteryFlow, ProvisioningResult};
pub use capability::Elevated;
pub use compliance::{
    evaluate, evidence_pack, readiness, CheckStatus, ComplianceCheck, EvidencePack,
    ReadinessScore, Rule, RuleConfig,
};
pub use custody::{CustodyProtocol, CustodyReport};
pub use eol::{EolSession, EolWorkflow, Measurements, TestSpecBook, TestThresholds};
pub use error::CoreError;
pub use findings::FindingLog;
pub use identity::{EntityId, EntityPrefix, IdParseError};
pub use store::{Collection, Repository, Snapshot, Versioned};
pub use warranty::WarrantyDesk;
