//! Finding manager
//!
//! Manually raised nonconformities with an Open → InReview → Closed
//! lifecycle. Closure requires notes and is irreversible.

use crate::core::audit::AuditEntry;
use crate::core::error::CoreError;
use crate::core::identity::EntityId;
use crate::core::store::Repository;
use crate::entities::finding::{Finding, FindingStatus, Severity};

pub struct FindingLog<'a> {
    repo: &'a Repository,
}

impl<'a> FindingLog<'a> {
    pub fn new(repo: &'a Repository) -> Self {
        Self { repo }
    }

    /// Raise a finding against any entity
    pub fn raise(
        &self,
        subject: EntityId,
        severity: Severity,
        description: &str,
        actor: &str,
    ) -> Result<Finding, CoreError> {
        if description.trim().is_empty() {
            return Err(CoreError::validation(
                "Finding description must not be empty",
            ));
        }
        let mut finding = Finding::new(subject, severity, description, actor);
        finding.notes.push(AuditEntry::now(actor, "Finding raised"));
        self.repo
            .findings
            .insert(finding.id.clone(), finding.clone())?;
        Ok(finding)
    }

    pub fn start_review(&self, id: &EntityId, actor: &str) -> Result<Finding, CoreError> {
        self.repo.findings.update(id, |f| {
            if !FindingStatus::can_transition(f.status, FindingStatus::InReview) {
                return Err(CoreError::invalid_transition(f.status, FindingStatus::InReview));
            }
            let mut next = f.clone();
            next.status = FindingStatus::InReview;
            next.notes.push(AuditEntry::now(actor, "Review started"));
            next.updated = chrono::Utc::now();
            Ok(next)
        })
    }

    /// Close with mandatory notes; terminal
    pub fn close(&self, id: &EntityId, notes: &str, actor: &str) -> Result<Finding, CoreError> {
        if notes.trim().is_empty() {
            return Err(CoreError::validation(
                "Closure notes required to close a finding",
            ));
        }
        self.repo.findings.update(id, |f| {
            if !FindingStatus::can_transition(f.status, FindingStatus::Closed) {
                return Err(CoreError::invalid_transition(f.status, FindingStatus::Closed));
            }
            let mut next = f.clone();
            next.status = FindingStatus::Closed;
            next.closure_notes = Some(notes.to_string());
            next.closed_at = Some(chrono::Utc::now());
            next.closed_by = Some(actor.to_string());
            next.notes
                .push(AuditEntry::now(actor, format!("Closed: {notes}")));
            next.updated = chrono::Utc::now();
            Ok(next)
        })
    }

    /// Open findings against one subject
    pub fn open_for(&self, subject: &EntityId) -> Vec<Finding> {
        self.repo
            .findings
            .filter(|f: &Finding| f.subject == *subject && f.status != FindingStatus::Closed)
    }
}
