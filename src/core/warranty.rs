//! Warranty claim manager
//!
//! Claim intake is gated on the battery's custody state: only assets the
//! customer has received (accepted, delivered or rejected) can be claimed
//! against. Replacement/repair dispositions route the unit to RMA.

use crate::core::audit::AuditEntry;
use crate::core::error::CoreError;
use crate::core::identity::EntityId;
use crate::core::store::Repository;
use crate::entities::battery::{BatteryStatus, CustodyStatus};
use crate::entities::warranty::{
    ClaimDisposition, ClaimPriority, ClaimStatus, FailureCategory, LiabilityAttribution,
    WarrantyClaim,
};

pub struct WarrantyDesk<'a> {
    repo: &'a Repository,
}

impl<'a> WarrantyDesk<'a> {
    pub fn new(repo: &'a Repository) -> Self {
        Self { repo }
    }

    /// Open a claim against a battery in customer custody
    pub fn open_claim(
        &self,
        battery_id: &EntityId,
        priority: ClaimPriority,
        failure_category: FailureCategory,
        description: &str,
        actor: &str,
    ) -> Result<WarrantyClaim, CoreError> {
        if description.trim().is_empty() {
            return Err(CoreError::validation("Claim description must not be empty"));
        }
        let battery = self.repo.batteries.get(battery_id)?.entity;
        if !matches!(
            battery.custody_status,
            CustodyStatus::Accepted | CustodyStatus::Delivered | CustodyStatus::Rejected
        ) {
            return Err(CoreError::precondition(format!(
                "Warranty claims require customer custody (current: {})",
                battery.custody_status
            )));
        }

        let mut claim = WarrantyClaim::new(
            battery_id.clone(),
            priority,
            failure_category,
            description,
            actor,
        );
        claim.notes.push(AuditEntry::now(actor, "Claim opened"));
        self.repo
            .warranty_claims
            .insert(claim.id.clone(), claim.clone())?;

        self.repo.batteries.update(battery_id, |b| {
            let mut next = b.clone();
            next.notes
                .push(AuditEntry::now(actor, format!("Warranty claim {} opened", claim.id)));
            next.touch();
            Ok(next)
        })?;

        Ok(claim)
    }

    pub fn begin_investigation(&self, id: &EntityId, actor: &str) -> Result<WarrantyClaim, CoreError> {
        self.repo.warranty_claims.update(id, |c| {
            if !ClaimStatus::can_transition(c.status, ClaimStatus::UnderInvestigation) {
                return Err(CoreError::invalid_transition(
                    c.status,
                    ClaimStatus::UnderInvestigation,
                ));
            }
            let mut next = c.clone();
            next.status = ClaimStatus::UnderInvestigation;
            next.notes.push(AuditEntry::now(actor, "Investigation started"));
            next.updated = chrono::Utc::now();
            Ok(next)
        })
    }

    /// Record the root-cause analysis during investigation
    pub fn record_rca(&self, id: &EntityId, rca: &str, actor: &str) -> Result<WarrantyClaim, CoreError> {
        if rca.trim().is_empty() {
            return Err(CoreError::validation("RCA text must not be empty"));
        }
        self.repo.warranty_claims.update(id, |c| {
            if c.status != ClaimStatus::UnderInvestigation {
                return Err(CoreError::precondition(format!(
                    "RCA can only be recorded during investigation (current: {})",
                    c.status
                )));
            }
            let mut next = c.clone();
            next.rca = Some(rca.to_string());
            next.notes.push(AuditEntry::now(actor, "RCA recorded"));
            next.updated = chrono::Utc::now();
            Ok(next)
        })
    }

    /// Resolve with a disposition and liability attribution.
    ///
    /// Repair/replace dispositions move the battery to RMA.
    pub fn resolve(
        &self,
        id: &EntityId,
        disposition: ClaimDisposition,
        liability: LiabilityAttribution,
        actor: &str,
    ) -> Result<WarrantyClaim, CoreError> {
        let claim = self.repo.warranty_claims.update(id, |c| {
            if !ClaimStatus::can_transition(c.status, ClaimStatus::Resolved) {
                return Err(CoreError::invalid_transition(c.status, ClaimStatus::Resolved));
            }
            if c.rca.is_none() {
                return Err(CoreError::precondition(
                    "RCA must be recorded before resolving a claim",
                ));
            }
            let mut next = c.clone();
            next.status = ClaimStatus::Resolved;
            next.disposition = Some(disposition);
            next.liability = Some(liability);
            next.notes.push(AuditEntry::now(actor, "Claim resolved"));
            next.updated = chrono::Utc::now();
            Ok(next)
        })?;

        if matches!(
            disposition,
            ClaimDisposition::Repair | ClaimDisposition::Replace
        ) {
            self.repo.batteries.update(&claim.battery_id, |b| {
                if !BatteryStatus::can_transition(b.status, BatteryStatus::Rma) {
                    // Already routed (e.g. a second claim); keep as is
                    return Ok(b.clone());
                }
                let mut next = b.clone();
                next.status = BatteryStatus::Rma;
                next.notes
                    .push(AuditEntry::now(actor, format!("RMA authorized by claim {id}")));
                next.touch();
                Ok(next)
            })?;
        }

        Ok(claim)
    }

    pub fn close_claim(&self, id: &EntityId, actor: &str) -> Result<WarrantyClaim, CoreError> {
        self.repo.warranty_claims.update(id, |c| {
            if !ClaimStatus::can_transition(c.status, ClaimStatus::Closed) {
                return Err(CoreError::invalid_transition(c.status, ClaimStatus::Closed));
            }
            let mut next = c.clone();
            next.status = ClaimStatus::Closed;
            next.notes.push(AuditEntry::now(actor, "Claim closed"));
            next.updated = chrono::Utc::now();
            Ok(next)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::batch_flow::{BatchFlow, BatchSpec};
    use crate::core::battery_flow::BatteryFlow;

    fn battery_in_custody(repo: &Repository, custody: CustodyStatus) -> EntityId {
        let batch = BatchFlow::new(repo)
            .create_batch(
                BatchSpec {
                    sku: "PACK-48V-100AH".to_string(),
                    ..Default::default()
                },
                "mfg.lead",
            )
            .unwrap();
        let unit = BatteryFlow::new(repo)
            .register_batteries(&batch.id, 1, "mfg.line1")
            .unwrap()[0]
            .clone();
        repo.batteries
            .update(&unit.id, |b| {
                let mut next = b.clone();
                next.custody_status = custody;
                if custody == CustodyStatus::Accepted {
                    next.status = BatteryStatus::Deployed;
                }
                Ok(next)
            })
            .unwrap();
        unit.id
    }

    #[test]
    fn test_claim_gated_on_custody() {
        let repo = Repository::new();
        let desk = WarrantyDesk::new(&repo);

        let at_factory = battery_in_custody(&repo, CustodyStatus::AtFactory);
        assert!(matches!(
            desk.open_claim(
                &at_factory,
                ClaimPriority::High,
                FailureCategory::BmsFault,
                "Pack reports BMS fault code 0x41",
                "support.agent"
            ),
            Err(CoreError::PreconditionFailed { .. })
        ));

        let accepted = battery_in_custody(&repo, CustodyStatus::Accepted);
        let claim = desk
            .open_claim(
                &accepted,
                ClaimPriority::High,
                FailureCategory::BmsFault,
                "Pack reports BMS fault code 0x41",
                "support.agent",
            )
            .unwrap();
        assert_eq!(claim.status, ClaimStatus::Open);
    }

    #[test]
    fn test_full_claim_lifecycle_routes_rma() {
        let repo = Repository::new();
        let desk = WarrantyDesk::new(&repo);
        let battery_id = battery_in_custody(&repo, CustodyStatus::Accepted);

        let claim = desk
            .open_claim(
                &battery_id,
                ClaimPriority::Critical,
                FailureCategory::ThermalEvent,
                "Overtemperature shutdown in the field",
                "support.agent",
            )
            .unwrap();

        desk.begin_investigation(&claim.id, "quality.eng").unwrap();

        // Resolving before RCA is rejected
        assert!(matches!(
            desk.resolve(
                &claim.id,
                ClaimDisposition::Replace,
                LiabilityAttribution::Manufacturer,
                "quality.eng"
            ),
            Err(CoreError::PreconditionFailed { .. })
        ));

        desk.record_rca(&claim.id, "Coolant pump connector intermittent", "quality.eng")
            .unwrap();
        let resolved = desk
            .resolve(
                &claim.id,
                ClaimDisposition::Replace,
                LiabilityAttribution::Manufacturer,
                "quality.eng",
            )
            .unwrap();
        assert_eq!(resolved.status, ClaimStatus::Resolved);

        let b = repo.batteries.get(&battery_id).unwrap().entity;
        assert_eq!(b.status, BatteryStatus::Rma);

        let closed = desk.close_claim(&claim.id, "support.agent").unwrap();
        assert_eq!(closed.status, ClaimStatus::Closed);
        assert!(matches!(
            desk.begin_investigation(&claim.id, "quality.eng"),
            Err(CoreError::InvalidTransition { .. })
        ));
    }
}
