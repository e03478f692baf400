//! Finding entity - a manually raised nonconformity against any entity

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::audit::AuditEntry;
use crate::core::identity::{EntityId, EntityPrefix};

/// Finding lifecycle status; closure is terminal and irreversible
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FindingStatus {
    #[default]
    Open,
    InReview,
    Closed,
}

impl FindingStatus {
    pub fn can_transition(from: FindingStatus, to: FindingStatus) -> bool {
        use FindingStatus::*;
        matches!((from, to), (Open, InReview) | (Open, Closed) | (InReview, Closed))
    }
}

impl std::fmt::Display for FindingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            FindingStatus::Open => "open",
            FindingStatus::InReview => "in_review",
            FindingStatus::Closed => "closed",
        };
        write!(f, "{s}")
    }
}

/// Severity of a finding or compliance violation
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Minor,
    Major,
    Critical,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Severity::Info => "info",
            Severity::Minor => "minor",
            Severity::Major => "major",
            Severity::Critical => "critical",
        };
        write!(f, "{s}")
    }
}

/// A nonconformity record linked to any entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Finding {
    pub id: EntityId,
    /// The entity this finding is raised against
    pub subject: EntityId,
    pub status: FindingStatus,
    pub severity: Severity,
    pub description: String,

    /// Closure notes; required, written exactly once at close
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub closure_notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub closed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub closed_by: Option<String>,

    #[serde(default)]
    pub notes: Vec<AuditEntry>,

    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
    pub author: String,
}

impl Finding {
    pub fn new(subject: EntityId, severity: Severity, description: &str, author: &str) -> Self {
        let now = Utc::now();
        Self {
            id: EntityId::new(EntityPrefix::Fnd),
            subject,
            status: FindingStatus::Open,
            severity,
            description: description.to_string(),
            closure_notes: None,
            closed_at: None,
            closed_by: None,
            notes: Vec::new(),
            created: now,
            updated: now,
            author: author.to_string(),
        }
    }
}
