//! Battery lifecycle manager
//!
//! Registration, assembly events, the in-order provisioning pipeline,
//! inventory release, and the warehouse sub-operations. Every mutation is
//! gate-checked first and committed by compare-and-swap; a rejected
//! operation leaves the battery untouched.

use chrono::Utc;

use crate::core::audit::{AuditEntry, MovementEntry};
use crate::core::error::CoreError;
use crate::core::identity::{new_certificate_ref, EntityId};
use crate::core::store::Repository;
use crate::entities::battery::{
    Battery, BatteryStatus, CustodyStatus, EolResult, InventoryRecord, InventoryStatus,
    ProvisioningStatus, ProvisioningStep,
};

/// Outcome reported by the provisioning finalizer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProvisioningResult {
    Pass,
    Fail,
}

pub struct BatteryFlow<'a> {
    repo: &'a Repository,
}

impl<'a> BatteryFlow<'a> {
    pub fn new(repo: &'a Repository) -> Self {
        Self { repo }
    }

    /// Bulk-create `qty` units in Assembly against a batch.
    ///
    /// Serials are the full batch id plus a 1-based index; EOL scan
    /// resolves by serial, so serials must be unique across batches.
    pub fn register_batteries(
        &self,
        batch_id: &EntityId,
        qty: u32,
        actor: &str,
    ) -> Result<Vec<Battery>, CoreError> {
        if qty == 0 {
            return Err(CoreError::validation(
                "Quantity must be at least 1 to register batteries",
            ));
        }
        let batch = self.repo.batches.get(batch_id)?.entity;

        let existing = self
            .repo
            .batteries
            .filter(|b: &Battery| b.batch_id == *batch_id)
            .len() as u32;

        let mut created = Vec::with_capacity(qty as usize);
        for i in 0..qty {
            let serial = format!("{}-{:04}", batch.id, existing + i + 1);
            let mut battery = Battery::new(batch_id.clone(), &batch.sku, &serial, actor);
            battery
                .assembly_events
                .push(AuditEntry::now(actor, "Registered from batch"));
            self.repo
                .batteries
                .insert(battery.id.clone(), battery.clone())?;
            created.push(battery);
        }

        self.repo.batches.update(batch_id, |b| {
            let mut next = b.clone();
            next.quantities.built += qty;
            next.append_note(actor, format!("{qty} batteries registered"));
            Ok(next)
        })?;

        Ok(created)
    }

    /// Append an assembly event; never changes state
    pub fn add_assembly_event(
        &self,
        id: &EntityId,
        event: &str,
        actor: &str,
    ) -> Result<Battery, CoreError> {
        if event.trim().is_empty() {
            return Err(CoreError::validation("Assembly event must not be empty"));
        }
        self.repo.batteries.update(id, |b| {
            let mut next = b.clone();
            next.assembly_events.push(AuditEntry::now(actor, event));
            next.touch();
            Ok(next)
        })
    }

    // --- Provisioning pipeline -------------------------------------------

    pub fn bind_bms(&self, id: &EntityId, bms_serial: &str, actor: &str) -> Result<Battery, CoreError> {
        self.run_step(id, ProvisioningStep::BindBms, &format!("BMS bound: {bms_serial}"), actor)
    }

    pub fn flash_firmware(
        &self,
        id: &EntityId,
        version: &str,
        actor: &str,
    ) -> Result<Battery, CoreError> {
        self.run_step(
            id,
            ProvisioningStep::FlashFirmware,
            &format!("Firmware flashed: {version}"),
            actor,
        )
    }

    pub fn trigger_calibration(&self, id: &EntityId, actor: &str) -> Result<Battery, CoreError> {
        self.run_step(id, ProvisioningStep::Calibration, "Calibration completed", actor)
    }

    pub fn inject_security(&self, id: &EntityId, actor: &str) -> Result<Battery, CoreError> {
        self.run_step(
            id,
            ProvisioningStep::SecurityInjection,
            "Security material injected",
            actor,
        )
    }

    pub fn run_verification(&self, id: &EntityId, actor: &str) -> Result<Battery, CoreError> {
        self.run_step(
            id,
            ProvisioningStep::Verification,
            "Provisioning verification run",
            actor,
        )
    }

    /// Execute one pipeline step, enforcing the step order
    fn run_step(
        &self,
        id: &EntityId,
        step: ProvisioningStep,
        message: &str,
        actor: &str,
    ) -> Result<Battery, CoreError> {
        self.repo.batteries.update(id, |b| {
            match b.provisioning_status {
                ProvisioningStatus::Done => {
                    return Err(CoreError::precondition("Provisioning already finalized"))
                }
                ProvisioningStatus::Blocked => {
                    return Err(CoreError::precondition(
                        "Provisioning is blocked; clear rework first",
                    ))
                }
                _ => {}
            }
            let expected = match b.provisioning_step {
                None => ProvisioningStep::first(),
                Some(done) => done.next().ok_or_else(|| {
                    CoreError::precondition("All provisioning steps already executed")
                })?,
            };
            if step != expected {
                return Err(CoreError::precondition(format!(
                    "Provisioning step out of order: expected {expected}, got {step}"
                )));
            }

            let mut next = b.clone();
            if next.status == BatteryStatus::Assembly {
                // First step pulls the unit out of assembly
                if !BatteryStatus::can_transition(next.status, BatteryStatus::Provisioning) {
                    return Err(CoreError::invalid_transition(
                        next.status,
                        BatteryStatus::Provisioning,
                    ));
                }
                next.status = BatteryStatus::Provisioning;
            } else if next.status != BatteryStatus::Provisioning {
                return Err(CoreError::precondition(format!(
                    "Provisioning steps require assembly/provisioning status (current: {})",
                    next.status
                )));
            }
            next.provisioning_status = ProvisioningStatus::InProgress;
            next.provisioning_step = Some(step);
            next.provisioning_log.push(AuditEntry::now(actor, message));
            next.touch();
            Ok(next)
        })
    }

    /// Close out the pipeline.
    ///
    /// Pass: provisioning Done, status stays Provisioning (EOL moves it on).
    /// Fail: provisioning Blocked plus the rework flag; status is not
    /// rewound - the blocked state stays visible until rework routes the
    /// unit back through assembly.
    pub fn finalize_provisioning(
        &self,
        id: &EntityId,
        result: ProvisioningResult,
        actor: &str,
    ) -> Result<Battery, CoreError> {
        self.repo.batteries.update(id, |b| {
            if b.status != BatteryStatus::Provisioning {
                return Err(CoreError::precondition(format!(
                    "Cannot finalize provisioning from status {}",
                    b.status
                )));
            }
            if b.provisioning_step != Some(ProvisioningStep::Verification) {
                return Err(CoreError::precondition(
                    "Verification step must run before finalizing provisioning",
                ));
            }
            let mut next = b.clone();
            match result {
                ProvisioningResult::Pass => {
                    next.provisioning_status = ProvisioningStatus::Done;
                    next.provisioning_log
                        .push(AuditEntry::now(actor, "Provisioning finalized: pass"));
                }
                ProvisioningResult::Fail => {
                    next.provisioning_status = ProvisioningStatus::Blocked;
                    next.rework_flag = true;
                    next.provisioning_log
                        .push(AuditEntry::now(actor, "Provisioning finalized: fail"));
                    next.notes.push(AuditEntry::now(
                        actor,
                        "Provisioning blocked; unit flagged for rework",
                    ));
                }
            }
            next.touch();
            Ok(next)
        })
    }

    // --- Release & rework -------------------------------------------------

    /// Release a unit to inventory after a passing EOL result.
    ///
    /// Generates a unique certificate reference if none was issued during
    /// the EOL session.
    pub fn approve_battery(&self, id: &EntityId, actor: &str) -> Result<Battery, CoreError> {
        self.repo.batteries.update(id, |b| {
            if b.eol_result != Some(EolResult::Pass) {
                return Err(CoreError::precondition(
                    "EOL result must be PASS before a battery can be approved",
                ));
            }
            let mut next = b.clone();
            if next.certificate_ref.is_none() {
                next.certificate_ref = Some(new_certificate_ref());
            }
            next.release_to_inventory = true;
            next.inventory = Some(InventoryRecord::pending_putaway());
            next.custody_status = CustodyStatus::AtFactory;
            next.notes.push(AuditEntry::now(
                actor,
                format!(
                    "Approved for inventory (certificate {})",
                    next.certificate_ref.as_deref().unwrap_or_default()
                ),
            ));
            next.touch();
            Ok(next)
        })
    }

    /// Advisory rework flag; status is untouched
    pub fn flag_rework(&self, id: &EntityId, notes: &str, actor: &str) -> Result<Battery, CoreError> {
        if notes.trim().is_empty() {
            return Err(CoreError::validation("Rework notes must not be empty"));
        }
        self.repo.batteries.update(id, |b| {
            let mut next = b.clone();
            next.rework_flag = true;
            next.notes
                .push(AuditEntry::now(actor, format!("Rework flagged: {notes}")));
            next.touch();
            Ok(next)
        })
    }

    /// Retire a unit at end of life
    pub fn retire(&self, id: &EntityId, actor: &str) -> Result<Battery, CoreError> {
        self.repo.batteries.update(id, |b| {
            if !BatteryStatus::can_transition(b.status, BatteryStatus::Retired) {
                return Err(CoreError::invalid_transition(b.status, BatteryStatus::Retired));
            }
            let mut next = b.clone();
            next.status = BatteryStatus::Retired;
            next.notes.push(AuditEntry::now(actor, "Battery retired"));
            next.touch();
            Ok(next)
        })
    }

    // --- Inventory sub-operations ----------------------------------------

    fn with_inventory<F>(&self, id: &EntityId, f: F) -> Result<Battery, CoreError>
    where
        F: Fn(&Battery, &InventoryRecord) -> Result<Battery, CoreError>,
    {
        self.repo.batteries.update(id, |b| {
            let record = b.inventory.as_ref().ok_or_else(|| {
                CoreError::precondition("Battery has not been released to inventory")
            })?;
            f(b, record)
        })
    }

    /// Put a pending unit away at a named location
    pub fn put_away(&self, id: &EntityId, location: &str, actor: &str) -> Result<Battery, CoreError> {
        if location.trim().is_empty() {
            return Err(CoreError::validation("Putaway location must not be empty"));
        }
        self.with_inventory(id, |b, rec| {
            if rec.status != InventoryStatus::PendingPutaway {
                return Err(CoreError::precondition(format!(
                    "Putaway requires pending_putaway (current: {})",
                    rec.status
                )));
            }
            let mut next = b.clone();
            let inv = next.inventory.as_mut().expect("checked above");
            inv.status = InventoryStatus::Available;
            inv.location = Some(location.to_string());
            next.movement_log.push(MovementEntry {
                at: Utc::now(),
                actor: actor.to_string(),
                from_location: None,
                to_location: location.to_string(),
            });
            next.touch();
            Ok(next)
        })
    }

    /// Move an available/reserved unit between locations
    pub fn move_to(&self, id: &EntityId, location: &str, actor: &str) -> Result<Battery, CoreError> {
        if location.trim().is_empty() {
            return Err(CoreError::validation("Target location must not be empty"));
        }
        self.with_inventory(id, |b, rec| {
            if !matches!(
                rec.status,
                InventoryStatus::Available | InventoryStatus::Reserved
            ) {
                return Err(CoreError::precondition(format!(
                    "Cannot move a unit in inventory status {}",
                    rec.status
                )));
            }
            let mut next = b.clone();
            let inv = next.inventory.as_mut().expect("checked above");
            let from = inv.location.take();
            inv.location = Some(location.to_string());
            next.movement_log.push(MovementEntry {
                at: Utc::now(),
                actor: actor.to_string(),
                from_location: from,
                to_location: location.to_string(),
            });
            next.touch();
            Ok(next)
        })
    }

    /// Reserve a unit for a dispatch order.
    ///
    /// Re-reserving by the same order is idempotent; a unit reserved by a
    /// different order cannot be double-booked.
    pub fn reserve(
        &self,
        id: &EntityId,
        order_id: &EntityId,
        actor: &str,
    ) -> Result<Battery, CoreError> {
        self.with_inventory(id, |b, rec| {
            match rec.status {
                InventoryStatus::Available => {}
                InventoryStatus::Reserved => {
                    if rec.reserved_by.as_ref() == Some(order_id) {
                        // Idempotent re-reservation
                        return Ok(b.clone());
                    }
                    return Err(CoreError::precondition(format!(
                        "Battery already reserved by {}",
                        rec.reserved_by
                            .as_ref()
                            .map(|o| o.to_string())
                            .unwrap_or_else(|| "another order".to_string())
                    )));
                }
                other => {
                    return Err(CoreError::precondition(format!(
                        "Reserve requires an available unit (current: {other})"
                    )))
                }
            }
            let mut next = b.clone();
            let inv = next.inventory.as_mut().expect("checked above");
            inv.status = InventoryStatus::Reserved;
            inv.reserved_by = Some(order_id.clone());
            inv.reserved_at = Some(Utc::now());
            next.notes.push(AuditEntry::now(
                actor,
                format!("Reserved for dispatch {order_id}"),
            ));
            next.touch();
            Ok(next)
        })
    }

    /// Quarantine is allowed from any inventory status
    pub fn quarantine(&self, id: &EntityId, reason: &str, actor: &str) -> Result<Battery, CoreError> {
        if reason.trim().is_empty() {
            return Err(CoreError::validation("Reason code required for quarantine"));
        }
        self.with_inventory(id, |b, _rec| {
            let mut next = b.clone();
            let inv = next.inventory.as_mut().expect("checked above");
            inv.status = InventoryStatus::Quarantined;
            inv.reserved_by = None;
            inv.reserved_at = None;
            next.notes
                .push(AuditEntry::now(actor, format!("Quarantined: {reason}")));
            next.touch();
            Ok(next)
        })
    }

    /// Release from quarantine back to available
    pub fn release_quarantine(&self, id: &EntityId, actor: &str) -> Result<Battery, CoreError> {
        self.with_inventory(id, |b, rec| {
            if rec.status != InventoryStatus::Quarantined {
                return Err(CoreError::precondition(format!(
                    "Release requires quarantined status (current: {})",
                    rec.status
                )));
            }
            let mut next = b.clone();
            let inv = next.inventory.as_mut().expect("checked above");
            inv.status = InventoryStatus::Available;
            next.notes
                .push(AuditEntry::now(actor, "Released from quarantine"));
            next.touch();
            Ok(next)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::batch_flow::{BatchFlow, BatchSpec};
    use crate::core::identity::EntityPrefix;

    fn setup() -> (Repository, EntityId) {
        let repo = Repository::new();
        let batch = BatchFlow::new(&repo)
            .create_batch(
                BatchSpec {
                    sku: "PACK-48V-100AH".to_string(),
                    qty_started: 10,
                    ..Default::default()
                },
                "mfg.lead",
            )
            .unwrap();
        let id = batch.id;
        (repo, id)
    }

    fn provision(repo: &Repository, id: &EntityId) {
        let flow = BatteryFlow::new(repo);
        flow.bind_bms(id, "BMS-7001", "station.p1").unwrap();
        flow.flash_firmware(id, "fw-2.4.1", "station.p1").unwrap();
        flow.trigger_calibration(id, "station.p1").unwrap();
        flow.inject_security(id, "station.p1").unwrap();
        flow.run_verification(id, "station.p1").unwrap();
    }

    #[test]
    fn test_register_batteries() {
        let (repo, batch_id) = setup();
        let flow = BatteryFlow::new(&repo);
        let units = flow.register_batteries(&batch_id, 3, "mfg.line1").unwrap();
        assert_eq!(units.len(), 3);
        for u in &units {
            assert_eq!(u.status, BatteryStatus::Assembly);
            assert_eq!(u.batch_id, batch_id);
            assert!(u.serial.ends_with("-0001") || u.serial.ends_with("-0002") || u.serial.ends_with("-0003"));
        }
        // Serials are distinct
        let mut serials: Vec<_> = units.iter().map(|u| u.serial.clone()).collect();
        serials.sort();
        serials.dedup();
        assert_eq!(serials.len(), 3);

        assert_eq!(repo.batches.get(&batch_id).unwrap().entity.quantities.built, 3);
    }

    #[test]
    fn test_register_zero_rejected() {
        let (repo, batch_id) = setup();
        let flow = BatteryFlow::new(&repo);
        assert!(matches!(
            flow.register_batteries(&batch_id, 0, "mfg.line1"),
            Err(CoreError::ValidationError { .. })
        ));
    }

    #[test]
    fn test_register_unknown_batch() {
        let repo = Repository::new();
        let flow = BatteryFlow::new(&repo);
        let ghost = EntityId::new(EntityPrefix::Bat);
        assert!(matches!(
            flow.register_batteries(&ghost, 1, "mfg.line1"),
            Err(CoreError::NotFound { .. })
        ));
    }

    #[test]
    fn test_provisioning_steps_enforce_order() {
        let (repo, batch_id) = setup();
        let flow = BatteryFlow::new(&repo);
        let unit = flow.register_batteries(&batch_id, 1, "mfg.line1").unwrap()[0].clone();

        // Skipping bind_bms is rejected
        assert!(matches!(
            flow.flash_firmware(&unit.id, "fw-2.4.1", "station.p1"),
            Err(CoreError::PreconditionFailed { .. })
        ));

        let b = flow.bind_bms(&unit.id, "BMS-7001", "station.p1").unwrap();
        assert_eq!(b.status, BatteryStatus::Provisioning);
        assert_eq!(b.provisioning_status, ProvisioningStatus::InProgress);

        // Repeating a completed step is rejected
        assert!(flow.bind_bms(&unit.id, "BMS-7001", "station.p1").is_err());
    }

    #[test]
    fn test_finalize_pass_leaves_status_provisioning() {
        let (repo, batch_id) = setup();
        let flow = BatteryFlow::new(&repo);
        let unit = flow.register_batteries(&batch_id, 1, "mfg.line1").unwrap()[0].clone();
        provision(&repo, &unit.id);

        let b = flow
            .finalize_provisioning(&unit.id, ProvisioningResult::Pass, "station.p1")
            .unwrap();
        assert_eq!(b.status, BatteryStatus::Provisioning);
        assert_eq!(b.provisioning_status, ProvisioningStatus::Done);
        assert!(!b.rework_flag);
    }

    #[test]
    fn test_finalize_fail_blocks_without_rewinding() {
        let (repo, batch_id) = setup();
        let flow = BatteryFlow::new(&repo);
        let unit = flow.register_batteries(&batch_id, 1, "mfg.line1").unwrap()[0].clone();
        provision(&repo, &unit.id);

        let b = flow
            .finalize_provisioning(&unit.id, ProvisioningResult::Fail, "station.p1")
            .unwrap();
        assert_eq!(b.status, BatteryStatus::Provisioning);
        assert_eq!(b.provisioning_status, ProvisioningStatus::Blocked);
        assert!(b.rework_flag);

        // Blocked pipeline rejects further steps
        assert!(flow.run_verification(&unit.id, "station.p1").is_err());
    }

    #[test]
    fn test_finalize_requires_verification() {
        let (repo, batch_id) = setup();
        let flow = BatteryFlow::new(&repo);
        let unit = flow.register_batteries(&batch_id, 1, "mfg.line1").unwrap()[0].clone();
        flow.bind_bms(&unit.id, "BMS-7001", "station.p1").unwrap();

        assert!(matches!(
            flow.finalize_provisioning(&unit.id, ProvisioningResult::Pass, "station.p1"),
            Err(CoreError::PreconditionFailed { .. })
        ));
    }

    #[test]
    fn test_approve_battery_gated_on_eol_pass() {
        let (repo, batch_id) = setup();
        let flow = BatteryFlow::new(&repo);
        let unit = flow.register_batteries(&batch_id, 1, "mfg.line1").unwrap()[0].clone();

        assert!(matches!(
            flow.approve_battery(&unit.id, "qa.lead"),
            Err(CoreError::PreconditionFailed { .. })
        ));

        repo.batteries
            .update(&unit.id, |b| {
                let mut next = b.clone();
                next.eol_result = Some(EolResult::Pass);
                Ok(next)
            })
            .unwrap();

        let b = flow.approve_battery(&unit.id, "qa.lead").unwrap();
        assert!(b.certificate_ref.as_deref().unwrap().starts_with("CERT-"));
        assert!(b.release_to_inventory);
        assert_eq!(b.inventory_status(), Some(InventoryStatus::PendingPutaway));
        assert_eq!(b.custody_status, CustodyStatus::AtFactory);
    }

    #[test]
    fn test_certificates_unique_across_batteries() {
        let (repo, batch_id) = setup();
        let flow = BatteryFlow::new(&repo);
        let units = flow.register_batteries(&batch_id, 5, "mfg.line1").unwrap();
        let mut refs = Vec::new();
        for u in &units {
            repo.batteries
                .update(&u.id, |b| {
                    let mut next = b.clone();
                    next.eol_result = Some(EolResult::Pass);
                    Ok(next)
                })
                .unwrap();
            let approved = flow.approve_battery(&u.id, "qa.lead").unwrap();
            refs.push(approved.certificate_ref.unwrap());
        }
        let unique: std::collections::HashSet<_> = refs.iter().collect();
        assert_eq!(unique.len(), refs.len());
    }

    #[test]
    fn test_inventory_guards() {
        let (repo, batch_id) = setup();
        let flow = BatteryFlow::new(&repo);
        let unit = flow.register_batteries(&batch_id, 1, "mfg.line1").unwrap()[0].clone();

        // No inventory record before release
        assert!(flow.put_away(&unit.id, "A-01-03", "wh.op").is_err());

        repo.batteries
            .update(&unit.id, |b| {
                let mut next = b.clone();
                next.eol_result = Some(EolResult::Pass);
                Ok(next)
            })
            .unwrap();
        flow.approve_battery(&unit.id, "qa.lead").unwrap();

        let b = flow.put_away(&unit.id, "A-01-03", "wh.op").unwrap();
        assert_eq!(b.inventory_status(), Some(InventoryStatus::Available));
        assert_eq!(b.inventory_location(), Some("A-01-03"));
        assert_eq!(b.movement_log.len(), 1);

        let b = flow.move_to(&unit.id, "B-02-01", "wh.op").unwrap();
        assert_eq!(b.inventory_location(), Some("B-02-01"));
        assert_eq!(b.movement_log.len(), 2);
        assert_eq!(b.movement_log[1].from_location.as_deref(), Some("A-01-03"));
    }

    #[test]
    fn test_double_reserve_excluded() {
        let (repo, batch_id) = setup();
        let flow = BatteryFlow::new(&repo);
        let unit = flow.register_batteries(&batch_id, 1, "mfg.line1").unwrap()[0].clone();
        repo.batteries
            .update(&unit.id, |b| {
                let mut next = b.clone();
                next.eol_result = Some(EolResult::Pass);
                Ok(next)
            })
            .unwrap();
        flow.approve_battery(&unit.id, "qa.lead").unwrap();
        flow.put_away(&unit.id, "A-01-03", "wh.op").unwrap();

        let order_a = EntityId::new(EntityPrefix::Dsp);
        let order_b = EntityId::new(EntityPrefix::Dsp);

        let b = flow.reserve(&unit.id, &order_a, "planner.1").unwrap();
        assert_eq!(b.inventory_status(), Some(InventoryStatus::Reserved));

        // Same order again: idempotent
        flow.reserve(&unit.id, &order_a, "planner.1").unwrap();

        // Different order: rejected, no double booking
        assert!(matches!(
            flow.reserve(&unit.id, &order_b, "planner.2"),
            Err(CoreError::PreconditionFailed { .. })
        ));
        let after = repo.batteries.get(&unit.id).unwrap().entity;
        assert_eq!(after.inventory.unwrap().reserved_by, Some(order_a));
    }

    #[test]
    fn test_quarantine_from_any_inventory_status() {
        let (repo, batch_id) = setup();
        let flow = BatteryFlow::new(&repo);
        let unit = flow.register_batteries(&batch_id, 1, "mfg.line1").unwrap()[0].clone();
        repo.batteries
            .update(&unit.id, |b| {
                let mut next = b.clone();
                next.eol_result = Some(EolResult::Pass);
                Ok(next)
            })
            .unwrap();
        flow.approve_battery(&unit.id, "qa.lead").unwrap();

        // Straight from pending_putaway
        let b = flow
            .quarantine(&unit.id, "moisture ingress suspected", "qa.tech")
            .unwrap();
        assert_eq!(b.inventory_status(), Some(InventoryStatus::Quarantined));

        // Release only from quarantined
        let b = flow.release_quarantine(&unit.id, "qa.tech").unwrap();
        assert_eq!(b.inventory_status(), Some(InventoryStatus::Available));
        assert!(flow.release_quarantine(&unit.id, "qa.tech").is_err());
    }

    #[test]
    fn test_flag_rework_is_advisory() {
        let (repo, batch_id) = setup();
        let flow = BatteryFlow::new(&repo);
        let unit = flow.register_batteries(&batch_id, 1, "mfg.line1").unwrap()[0].clone();

        let b = flow
            .flag_rework(&unit.id, "weld seam visual defect", "qa.tech")
            .unwrap();
        assert!(b.rework_flag);
        assert_eq!(b.status, BatteryStatus::Assembly);

        assert!(matches!(
            flow.flag_rework(&unit.id, "  ", "qa.tech"),
            Err(CoreError::ValidationError { .. })
        ));
    }
}
