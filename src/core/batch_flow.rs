//! Batch lifecycle manager
//!
//! Owns batch status transitions and the two-party hold/release/close
//! protocols. The close gate is a 2-of-2 quorum: production requests,
//! QA approves, in either order; the batch closes exactly when both flags
//! are set. Repeating an approval is a no-op on the flag but still appends
//! an audit note, so the trail shows every sign-off attempt.

use crate::core::capability::Elevated;
use crate::core::error::CoreError;
use crate::core::identity::EntityId;
use crate::core::store::Repository;
use crate::entities::batch::{Batch, BatchStatus};

/// Arguments for creating a batch
#[derive(Debug, Clone, Default)]
pub struct BatchSpec {
    pub sku: String,
    pub bom_ref: Option<String>,
    pub process_params: Vec<(String, String)>,
    pub qty_started: u32,
}

pub struct BatchFlow<'a> {
    repo: &'a Repository,
}

impl<'a> BatchFlow<'a> {
    pub fn new(repo: &'a Repository) -> Self {
        Self { repo }
    }

    /// Create a batch in Draft
    pub fn create_batch(&self, spec: BatchSpec, actor: &str) -> Result<Batch, CoreError> {
        if spec.sku.trim().is_empty() {
            return Err(CoreError::validation("Batch SKU must not be empty"));
        }
        let mut batch = Batch::new(&spec.sku, actor);
        batch.bom_ref = spec.bom_ref;
        batch.process_params = spec.process_params.into_iter().collect();
        batch.quantities.started = spec.qty_started;
        batch.append_note(actor, "Batch created");

        self.repo.batches.insert(batch.id.clone(), batch.clone())?;
        Ok(batch)
    }

    /// Move the batch along its forward path
    pub fn transition(
        &self,
        id: &EntityId,
        to: BatchStatus,
        actor: &str,
    ) -> Result<Batch, CoreError> {
        self.repo.batches.update(id, |batch| {
            if !BatchStatus::can_transition(batch.status, to) {
                return Err(CoreError::invalid_transition(batch.status, to));
            }
            let mut next = batch.clone();
            next.status = to;
            next.append_note(actor, format!("Status → {to}"));
            Ok(next)
        })
    }

    pub fn release_to_production(&self, id: &EntityId, actor: &str) -> Result<Batch, CoreError> {
        self.transition(id, BatchStatus::ReleasedToProduction, actor)
    }

    pub fn start_production(&self, id: &EntityId, actor: &str) -> Result<Batch, CoreError> {
        self.transition(id, BatchStatus::InProduction, actor)
    }

    pub fn submit_for_qa(&self, id: &EntityId, actor: &str) -> Result<Batch, CoreError> {
        self.transition(id, BatchStatus::QaReview, actor)
    }

    pub fn release_to_inventory(&self, id: &EntityId, actor: &str) -> Result<Batch, CoreError> {
        self.transition(id, BatchStatus::ReleasedToInventory, actor)
    }

    pub fn mark_dispatched(&self, id: &EntityId, actor: &str) -> Result<Batch, CoreError> {
        self.transition(id, BatchStatus::Dispatched, actor)
    }

    pub fn scrap(&self, id: &EntityId, reason: &str, actor: &str) -> Result<Batch, CoreError> {
        if reason.trim().is_empty() {
            return Err(CoreError::validation(
                "Reason code required to scrap a batch",
            ));
        }
        self.repo.batches.update(id, |batch| {
            if !BatchStatus::can_transition(batch.status, BatchStatus::Scrapped) {
                return Err(CoreError::invalid_transition(batch.status, BatchStatus::Scrapped));
            }
            let mut next = batch.clone();
            next.status = BatchStatus::Scrapped;
            next.append_note(actor, format!("Scrapped: {reason}"));
            Ok(next)
        })
    }

    /// Production asks for a hold; no status change yet
    pub fn request_hold(&self, id: &EntityId, reason: &str, actor: &str) -> Result<Batch, CoreError> {
        if reason.trim().is_empty() {
            return Err(CoreError::validation(
                "Reason code required for failure/hold",
            ));
        }
        self.repo.batches.update(id, |batch| {
            if batch.status != BatchStatus::InProduction {
                return Err(CoreError::precondition(format!(
                    "Hold can only be requested while in production (current: {})",
                    batch.status
                )));
            }
            let mut next = batch.clone();
            next.hold_request_pending = true;
            next.append_note(actor, format!("Hold requested: {reason}"));
            Ok(next)
        })
    }

    /// QA approves the pending hold; transitions to OnHold.
    ///
    /// Approving with no pending request is rejected: the hold protocol is
    /// request-then-approve, not approve-at-will.
    pub fn approve_hold(&self, id: &EntityId, actor: &str) -> Result<Batch, CoreError> {
        self.repo.batches.update(id, |batch| {
            if !batch.hold_request_pending {
                return Err(CoreError::precondition(
                    "No hold request pending for this batch",
                ));
            }
            if !BatchStatus::can_transition(batch.status, BatchStatus::OnHold) {
                return Err(CoreError::invalid_transition(batch.status, BatchStatus::OnHold));
            }
            let mut next = batch.clone();
            next.status = BatchStatus::OnHold;
            next.hold_request_pending = false;
            next.append_note(actor, "Hold approved");
            Ok(next)
        })
    }

    /// Production asks to resume from hold
    pub fn request_release(&self, id: &EntityId, actor: &str) -> Result<Batch, CoreError> {
        self.repo.batches.update(id, |batch| {
            if batch.status != BatchStatus::OnHold {
                return Err(CoreError::precondition(format!(
                    "Release can only be requested while on hold (current: {})",
                    batch.status
                )));
            }
            let mut next = batch.clone();
            next.release_request_pending = true;
            next.append_note(actor, "Release from hold requested");
            Ok(next)
        })
    }

    /// QA approves the release; transitions back to InProduction
    pub fn approve_release(&self, id: &EntityId, actor: &str) -> Result<Batch, CoreError> {
        self.repo.batches.update(id, |batch| {
            if !batch.release_request_pending {
                return Err(CoreError::precondition(
                    "No release request pending for this batch",
                ));
            }
            if !BatchStatus::can_transition(batch.status, BatchStatus::InProduction) {
                return Err(CoreError::invalid_transition(
                    batch.status,
                    BatchStatus::InProduction,
                ));
            }
            let mut next = batch.clone();
            next.status = BatchStatus::InProduction;
            next.release_request_pending = false;
            next.append_note(actor, "Release from hold approved");
            Ok(next)
        })
    }

    /// Production side of the close quorum
    pub fn request_close_by_prod(&self, id: &EntityId, actor: &str) -> Result<Batch, CoreError> {
        self.close_vote(id, actor, true)
    }

    /// QA side of the close quorum
    pub fn approve_close_by_qa(&self, id: &EntityId, actor: &str) -> Result<Batch, CoreError> {
        self.close_vote(id, actor, false)
    }

    fn close_vote(&self, id: &EntityId, actor: &str, prod_side: bool) -> Result<Batch, CoreError> {
        self.repo.batches.update(id, |batch| {
            if batch.status.is_terminal() {
                return Err(CoreError::invalid_transition(batch.status, BatchStatus::Closed));
            }
            if batch.status != BatchStatus::Dispatched {
                return Err(CoreError::precondition(format!(
                    "Close can only be signed off after dispatch (current: {})",
                    batch.status
                )));
            }
            let mut next = batch.clone();
            let (flag, label) = if prod_side {
                (&mut next.close_request_by_prod, "Production close sign-off")
            } else {
                (&mut next.close_approved_by_qa, "QA close approval")
            };
            // Re-signing is a flag no-op; the note is still appended
            let repeat = *flag;
            *flag = true;
            next.append_note(
                actor,
                if repeat {
                    format!("{label} (repeated)")
                } else {
                    label.to_string()
                },
            );
            if next.close_quorum_met() {
                next.status = BatchStatus::Closed;
                next.append_note(actor, "Close quorum met; batch closed");
            }
            Ok(next)
        })
    }

    /// Unconditional close, bypassing the quorum. Requires the elevated
    /// capability token; the grantor lands in the audit note.
    pub fn force_close(
        &self,
        id: &EntityId,
        elevated: &Elevated,
        actor: &str,
    ) -> Result<Batch, CoreError> {
        self.repo.batches.update(id, |batch| {
            if batch.status.is_terminal() {
                return Err(CoreError::invalid_transition(batch.status, BatchStatus::Closed));
            }
            let mut next = batch.clone();
            next.status = BatchStatus::Closed;
            next.append_note(
                actor,
                format!("Force-closed (override granted by {})", elevated.grantor()),
            );
            Ok(next)
        })
    }
}
