//! Batch entity - a production lot sharing SKU/BOM/process parameters

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::audit::AuditEntry;
use crate::core::identity::{EntityId, EntityPrefix};

/// Batch lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BatchStatus {
    #[default]
    Draft,
    ReleasedToProduction,
    InProduction,
    OnHold,
    QaReview,
    ReleasedToInventory,
    Dispatched,
    Closed,
    Scrapped,
}

impl BatchStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, BatchStatus::Closed | BatchStatus::Scrapped)
    }

    /// Declarative transition table; the only place batch legality lives
    pub fn can_transition(from: BatchStatus, to: BatchStatus) -> bool {
        use BatchStatus::*;
        if from.is_terminal() {
            return false;
        }
        // Scrap is reachable from any non-terminal state
        if to == Scrapped {
            return true;
        }
        matches!(
            (from, to),
            (Draft, ReleasedToProduction)
                | (ReleasedToProduction, InProduction)
                | (InProduction, OnHold)
                | (OnHold, InProduction)
                | (InProduction, QaReview)
                | (QaReview, ReleasedToInventory)
                | (ReleasedToInventory, Dispatched)
                | (Dispatched, Closed)
        )
    }

    pub fn allowed_transitions(from: BatchStatus) -> Vec<BatchStatus> {
        use BatchStatus::*;
        let mut next = match from {
            Draft => vec![ReleasedToProduction],
            ReleasedToProduction => vec![InProduction],
            InProduction => vec![OnHold, QaReview],
            OnHold => vec![InProduction],
            QaReview => vec![ReleasedToInventory],
            ReleasedToInventory => vec![Dispatched],
            Dispatched => vec![Closed],
            Closed | Scrapped => vec![],
        };
        if !from.is_terminal() {
            next.push(Scrapped);
        }
        next
    }
}

impl std::fmt::Display for BatchStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            BatchStatus::Draft => "draft",
            BatchStatus::ReleasedToProduction => "released_to_production",
            BatchStatus::InProduction => "in_production",
            BatchStatus::OnHold => "on_hold",
            BatchStatus::QaReview => "qa_review",
            BatchStatus::ReleasedToInventory => "released_to_inventory",
            BatchStatus::Dispatched => "dispatched",
            BatchStatus::Closed => "closed",
            BatchStatus::Scrapped => "scrapped",
        };
        write!(f, "{s}")
    }
}

/// Unit counters for a batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchQuantities {
    pub started: u32,
    pub built: u32,
    pub passed: u32,
    pub failed: u32,
    pub reworked: u32,
}

/// A production batch (lot)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Batch {
    pub id: EntityId,
    pub sku: String,
    pub status: BatchStatus,

    /// Bill-of-materials revision this lot was built against
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bom_ref: Option<String>,

    /// Free-form process parameters captured at release
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub process_params: HashMap<String, String>,

    #[serde(default)]
    pub quantities: BatchQuantities,

    // Two-party gates
    #[serde(default)]
    pub hold_request_pending: bool,
    #[serde(default)]
    pub release_request_pending: bool,
    #[serde(default)]
    pub close_request_by_prod: bool,
    #[serde(default)]
    pub close_approved_by_qa: bool,

    /// Append-only audit notes
    #[serde(default)]
    pub notes: Vec<AuditEntry>,

    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
    pub author: String,
}

impl Batch {
    pub fn new(sku: &str, author: &str) -> Self {
        let now = Utc::now();
        Self {
            id: EntityId::new(EntityPrefix::Bat),
            sku: sku.to_string(),
            status: BatchStatus::Draft,
            bom_ref: None,
            process_params: HashMap::new(),
            quantities: BatchQuantities::default(),
            hold_request_pending: false,
            release_request_pending: false,
            close_request_by_prod: false,
            close_approved_by_qa: false,
            notes: Vec::new(),
            created: now,
            updated: now,
            author: author.to_string(),
        }
    }

    /// First-pass yield in percent; 0 when nothing has been built
    pub fn yield_pct(&self) -> f64 {
        if self.quantities.built == 0 {
            0.0
        } else {
            f64::from(self.quantities.passed) / f64::from(self.quantities.built) * 100.0
        }
    }

    /// Both parties have signed off the close
    pub fn close_quorum_met(&self) -> bool {
        self.close_request_by_prod && self.close_approved_by_qa
    }

    pub fn append_note(&mut self, actor: &str, message: impl Into<String>) {
        self.notes.push(AuditEntry::now(actor, message));
        self.updated = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forward_transitions() {
        use BatchStatus::*;
        assert!(BatchStatus::can_transition(Draft, ReleasedToProduction));
        assert!(BatchStatus::can_transition(ReleasedToProduction, InProduction));
        assert!(BatchStatus::can_transition(InProduction, OnHold));
        assert!(BatchStatus::can_transition(OnHold, InProduction));
        assert!(BatchStatus::can_transition(InProduction, QaReview));
        assert!(BatchStatus::can_transition(QaReview, ReleasedToInventory));
        assert!(BatchStatus::can_transition(ReleasedToInventory, Dispatched));
        assert!(BatchStatus::can_transition(Dispatched, Closed));
    }

    #[test]
    fn test_illegal_transitions() {
        use BatchStatus::*;
        assert!(!BatchStatus::can_transition(Draft, InProduction));
        assert!(!BatchStatus::can_transition(Draft, Closed));
        assert!(!BatchStatus::can_transition(QaReview, InProduction));
        assert!(!BatchStatus::can_transition(Closed, Draft));
        assert!(!BatchStatus::can_transition(Scrapped, Draft));
    }

    #[test]
    fn test_scrap_reachable_from_any_non_terminal() {
        use BatchStatus::*;
        for from in [
            Draft,
            ReleasedToProduction,
            InProduction,
            OnHold,
            QaReview,
            ReleasedToInventory,
            Dispatched,
        ] {
            assert!(BatchStatus::can_transition(from, Scrapped), "{from}");
        }
        assert!(!BatchStatus::can_transition(Closed, Scrapped));
        assert!(!BatchStatus::can_transition(Scrapped, Scrapped));
    }

    #[test]
    fn test_allowed_transitions_match_table() {
        for from in [
            BatchStatus::Draft,
            BatchStatus::InProduction,
            BatchStatus::Dispatched,
            BatchStatus::Closed,
        ] {
            for to in BatchStatus::allowed_transitions(from) {
                assert!(BatchStatus::can_transition(from, to));
            }
        }
        assert!(BatchStatus::allowed_transitions(BatchStatus::Closed).is_empty());
    }

    #[test]
    fn test_yield_pct() {
        let mut batch = Batch::new("PACK-48V-100AH", "mfg.lead");
        assert_eq!(batch.yield_pct(), 0.0);
        batch.quantities.built = 40;
        batch.quantities.passed = 30;
        assert!((batch.yield_pct() - 75.0).abs() < f64::EPSILON);
    }
}
