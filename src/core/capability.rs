//! Elevated override capability
//!
//! The engine never consults a role model; authorization happens before an
//! operation is invoked. The two legitimate overrides (EOL precheck bypass,
//! batch force-close) instead take an explicit `Elevated` token, so the
//! override is visible in the call signature and attributable in the audit
//! trail.

/// Capability token authorizing an override operation.
///
/// Construction is unrestricted: minting the token is the caller-side
/// authorization decision. The engine only demands it where an override is
/// possible and records who granted it.
#[derive(Debug, Clone)]
pub struct Elevated {
    granted_by: String,
}

impl Elevated {
    pub fn granted_by(actor: &str) -> Self {
        Self {
            granted_by: actor.to_string(),
        }
    }

    pub fn grantor(&self) -> &str {
        &self.granted_by
    }
}
