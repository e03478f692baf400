//! Append-only audit records
//!
//! Entities carry monotonic event logs: entries are appended before the
//! owning operation commits, and are never reordered or deleted. The entry
//! itself is the electronic signature - actor identity plus timestamp.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A timestamped, actor-attributed log entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub at: DateTime<Utc>,
    pub actor: String,
    pub message: String,
}

impl AuditEntry {
    pub fn now(actor: &str, message: impl Into<String>) -> Self {
        Self {
            at: Utc::now(),
            actor: actor.to_string(),
            message: message.into(),
        }
    }
}

/// An inventory movement record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovementEntry {
    pub at: DateTime<Utc>,
    pub actor: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_location: Option<String>,
    pub to_location: String,
}

/// A custody state change record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustodyEntry {
    pub at: DateTime<Utc>,
    pub actor: String,
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl CustodyEntry {
    pub fn now(actor: &str, status: impl std::fmt::Display, reason: Option<&str>) -> Self {
        Self {
            at: Utc::now(),
            actor: actor.to_string(),
            status: status.to_string(),
            reason: reason.map(|r| r.to_string()),
        }
    }
}
