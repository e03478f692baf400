//! Compliance rule engine
//!
//! Stateless, read-only evaluation of a fixed rule set against one store
//! snapshot, plus the composite readiness score and the per-asset evidence
//! pack. Nothing in this module mutates an entity.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::core::identity::EntityId;
use crate::core::store::Snapshot;
use crate::entities::battery::{
    Battery, BatteryStatus, CustodyStatus, EolResult, InventoryStatus,
};
use crate::entities::finding::Severity;

/// Fixed rule identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Rule {
    /// Shipped without EOL pass
    R1,
    /// In transit without a dispatch link
    R2,
    /// EOL pass without a certificate reference
    R3,
    /// Stocked without a location
    R4,
    /// EOL failure not contained
    R5,
    /// Reservation older than the SLA
    R6,
}

impl Rule {
    pub fn code(&self) -> &'static str {
        match self {
            Rule::R1 => "R1",
            Rule::R2 => "R2",
            Rule::R3 => "R3",
            Rule::R4 => "R4",
            Rule::R5 => "R5",
            Rule::R6 => "R6",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Rule::R1 => "Shipped without EOL pass",
            Rule::R2 => "In transit missing dispatch link",
            Rule::R3 => "Certified missing certificate ref",
            Rule::R4 => "Inventory missing location",
            Rule::R5 => "Uncontained EOL failure",
            Rule::R6 => "Stale reservation",
        }
    }
}

/// Verdict of one rule over the snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckStatus {
    Pass,
    Warn,
    Fail,
}

/// One evaluated rule
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComplianceCheck {
    pub rule: Rule,
    pub status: CheckStatus,
    pub severity: Severity,
    pub affected_ids: Vec<EntityId>,
    pub description: String,
}

/// Rule engine configuration
#[derive(Debug, Clone)]
pub struct RuleConfig {
    /// How long a reservation may sit before R6 flags it
    pub reservation_sla: Duration,
}

impl Default for RuleConfig {
    fn default() -> Self {
        Self {
            reservation_sla: Duration::hours(72),
        }
    }
}

/// Evaluate the full rule set against a snapshot
pub fn evaluate(snapshot: &Snapshot, config: &RuleConfig, now: DateTime<Utc>) -> Vec<ComplianceCheck> {
    vec![
        rule_shipped_without_pass(snapshot),
        rule_transit_missing_dispatch(snapshot),
        rule_missing_certificate(snapshot),
        rule_missing_location(snapshot),
        rule_uncontained_failure(snapshot),
        rule_stale_reservation(snapshot, config.reservation_sla, now),
    ]
}

fn check(rule: Rule, severity: Severity, warn_only: bool, affected: Vec<EntityId>) -> ComplianceCheck {
    let status = if affected.is_empty() {
        CheckStatus::Pass
    } else if warn_only {
        CheckStatus::Warn
    } else {
        CheckStatus::Fail
    };
    let description = if affected.is_empty() {
        format!("{}: no violations", rule.title())
    } else {
        format!("{}: {} affected", rule.title(), affected.len())
    };
    ComplianceCheck {
        rule,
        status,
        severity,
        affected_ids: affected,
        description,
    }
}

/// R1: status ∈ {InTransit, Deployed} ⇒ eol_result == Pass
fn rule_shipped_without_pass(snapshot: &Snapshot) -> ComplianceCheck {
    let affected = snapshot
        .batteries
        .iter()
        .filter(|b| {
            matches!(b.status, BatteryStatus::InTransit | BatteryStatus::Deployed)
                && b.eol_result != Some(EolResult::Pass)
        })
        .map(|b| b.id.clone())
        .collect();
    check(Rule::R1, Severity::Critical, false, affected)
}

/// R2: status == InTransit ⇒ dispatch_id set
fn rule_transit_missing_dispatch(snapshot: &Snapshot) -> ComplianceCheck {
    let affected = snapshot
        .batteries
        .iter()
        .filter(|b| b.status == BatteryStatus::InTransit && b.dispatch_id.is_none())
        .map(|b| b.id.clone())
        .collect();
    check(Rule::R2, Severity::Major, false, affected)
}

/// R3: eol_result == Pass ⇒ certificate_ref set (warn)
fn rule_missing_certificate(snapshot: &Snapshot) -> ComplianceCheck {
    let affected = snapshot
        .batteries
        .iter()
        .filter(|b| b.eol_result == Some(EolResult::Pass) && b.certificate_ref.is_none())
        .map(|b| b.id.clone())
        .collect();
    check(Rule::R3, Severity::Minor, true, affected)
}

/// R4: inventory ∈ {Available, Reserved} ⇒ location set (warn)
fn rule_missing_location(snapshot: &Snapshot) -> ComplianceCheck {
    let affected = snapshot
        .batteries
        .iter()
        .filter(|b| {
            matches!(
                b.inventory_status(),
                Some(InventoryStatus::Available | InventoryStatus::Reserved)
            ) && b.inventory_location().is_none()
        })
        .map(|b| b.id.clone())
        .collect();
    check(Rule::R4, Severity::Minor, true, affected)
}

/// R5: eol_result == Fail ⇒ quarantined ∨ scrap_flag ∨ rework_flag
fn rule_uncontained_failure(snapshot: &Snapshot) -> ComplianceCheck {
    let affected = snapshot
        .batteries
        .iter()
        .filter(|b| {
            b.eol_result == Some(EolResult::Fail)
                && b.inventory_status() != Some(InventoryStatus::Quarantined)
                && !b.scrap_flag
                && !b.rework_flag
        })
        .map(|b| b.id.clone())
        .collect();
    check(Rule::R5, Severity::Critical, false, affected)
}

/// R6: inventory Reserved longer than the SLA (advisory)
fn rule_stale_reservation(snapshot: &Snapshot, sla: Duration, now: DateTime<Utc>) -> ComplianceCheck {
    let affected = snapshot
        .batteries
        .iter()
        .filter(|b| {
            b.inventory_status() == Some(InventoryStatus::Reserved)
                && b.inventory
                    .as_ref()
                    .and_then(|r| r.reserved_at)
                    .map(|at| now - at > sla)
                    .unwrap_or(true)
        })
        .map(|b| b.id.clone())
        .collect();
    check(Rule::R6, Severity::Info, true, affected)
}

// --- Readiness score ------------------------------------------------------

/// One weighted coverage dimension of the readiness score
#[derive(Debug, Clone, Serialize)]
pub struct ReadinessDimension {
    pub name: &'static str,
    pub weight: f64,
    /// Coverage ratio in [0, 1]
    pub coverage: f64,
    /// Points awarded, capped at the weight
    pub points: f64,
}

/// Composite 0-100 readiness score
#[derive(Debug, Clone, Serialize)]
pub struct ReadinessScore {
    pub total: u8,
    pub dimensions: Vec<ReadinessDimension>,
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 {
        // Vacuous coverage: nothing in scope counts as covered
        1.0
    } else {
        num as f64 / den as f64
    }
}

fn dimension(name: &'static str, weight: f64, coverage: f64) -> ReadinessDimension {
    let clamped = coverage.clamp(0.0, 1.0);
    ReadinessDimension {
        name,
        weight,
        coverage: clamped,
        points: (weight * clamped).min(weight),
    }
}

/// Aggregate readiness across identity / process / qa / traceability /
/// custody, each capped at 20 points.
pub fn readiness(snapshot: &Snapshot) -> ReadinessScore {
    let batteries = &snapshot.batteries;
    let total = batteries.len();

    let identified = batteries.iter().filter(|b| !b.serial.is_empty()).count();

    let past_assembly: Vec<&Battery> = batteries
        .iter()
        .filter(|b| b.status != BatteryStatus::Assembly)
        .collect();
    let provisioned = past_assembly
        .iter()
        .filter(|b| b.provisioning_status == crate::entities::battery::ProvisioningStatus::Done)
        .count();

    let tested = batteries.iter().filter(|b| b.eol_result.is_some()).count();
    let passed = batteries
        .iter()
        .filter(|b| b.eol_result == Some(EolResult::Pass))
        .count();

    let certified = batteries
        .iter()
        .filter(|b| b.certificate_ref.is_some())
        .count();

    let shipped: Vec<&Battery> = batteries
        .iter()
        .filter(|b| {
            matches!(
                b.custody_status,
                CustodyStatus::InTransit
                    | CustodyStatus::Delivered
                    | CustodyStatus::Accepted
                    | CustodyStatus::Rejected
            )
        })
        .collect();
    let linked = shipped.iter().filter(|b| b.dispatch_id.is_some()).count();

    // Custody consistency: orders whose members all carry the order's status
    let consistent_orders = snapshot
        .dispatch_orders
        .iter()
        .filter(|o| {
            o.battery_ids.iter().all(|id| {
                snapshot
                    .battery(id)
                    .map(|b| b.custody_status == o.custody_status)
                    .unwrap_or(false)
            })
        })
        .count();

    let dimensions = vec![
        dimension("identity", 20.0, ratio(identified, total)),
        dimension("process", 20.0, ratio(provisioned, past_assembly.len())),
        dimension("qa", 20.0, ratio(passed, tested)),
        dimension(
            "traceability",
            20.0,
            ratio(certified + linked, passed + shipped.len()),
        ),
        dimension(
            "custody",
            20.0,
            ratio(consistent_orders, snapshot.dispatch_orders.len()),
        ),
    ];

    let total_points: f64 = dimensions.iter().map(|d| d.points).sum();
    ReadinessScore {
        total: total_points.round().clamp(0.0, 100.0) as u8,
        dimensions,
    }
}

// --- Evidence pack --------------------------------------------------------

/// One event on an asset's merged lifecycle timeline
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimelineEvent {
    pub at: DateTime<Utc>,
    pub stage: &'static str,
    pub detail: String,
}

/// Read-only, per-asset evidence assembly
#[derive(Debug, Clone, Serialize)]
pub struct EvidencePack {
    pub battery_id: EntityId,
    pub serial: String,
    pub sku: String,
    pub batch_id: EntityId,
    pub status: BatteryStatus,
    pub eol_result: Option<EolResult>,
    pub qa_disposition: Option<crate::entities::battery::QaDisposition>,
    pub certificate_ref: Option<String>,
    pub custody_status: CustodyStatus,
    pub timeline: Vec<TimelineEvent>,
    pub movements: Vec<crate::core::audit::MovementEntry>,
    pub finding_ids: Vec<EntityId>,
}

/// Assemble the evidence pack for one battery.
///
/// Pure function of the snapshot: rebuilding against an unchanged battery
/// yields an identical timeline.
pub fn evidence_pack(snapshot: &Snapshot, battery_id: &EntityId) -> Option<EvidencePack> {
    let b = snapshot.battery(battery_id)?;

    let mut timeline: Vec<TimelineEvent> = Vec::new();
    let stages: [(&'static str, &Vec<crate::core::audit::AuditEntry>); 4] = [
        ("assembly", &b.assembly_events),
        ("provisioning", &b.provisioning_log),
        ("eol", &b.eol_log),
        ("note", &b.notes),
    ];
    for (stage, log) in stages {
        for entry in log {
            timeline.push(TimelineEvent {
                at: entry.at,
                stage,
                detail: format!("{} ({})", entry.message, entry.actor),
            });
        }
    }
    for entry in &b.custody_log {
        timeline.push(TimelineEvent {
            at: entry.at,
            stage: "custody",
            detail: match &entry.reason {
                Some(r) => format!("{} - {} ({})", entry.status, r, entry.actor),
                None => format!("{} ({})", entry.status, entry.actor),
            },
        });
    }
    // Stable sort keeps same-timestamp entries in log order, so rebuilds
    // are identical for an unchanged battery
    timeline.sort_by_key(|e| e.at);

    let finding_ids = snapshot
        .findings
        .iter()
        .filter(|f| f.subject == *battery_id)
        .map(|f| f.id.clone())
        .collect();

    Some(EvidencePack {
        battery_id: b.id.clone(),
        serial: b.serial.clone(),
        sku: b.sku.clone(),
        batch_id: b.batch_id.clone(),
        status: b.status,
        eol_result: b.eol_result,
        qa_disposition: b.qa_disposition,
        certificate_ref: b.certificate_ref.clone(),
        custody_status: b.custody_status,
        timeline,
        movements: b.movement_log.clone(),
        finding_ids,
    })
}
