//! Entity identity - prefixed ULID identifiers
//!
//! Every persisted record carries an `EntityId` of the form `PREFIX-ULID`,
//! e.g. `PK-01JD3Y20F01B21V0G4E835NW3J`. The prefix encodes the entity
//! collection and is validated on parse.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use ulid::Ulid;

/// Entity type prefixes
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EntityPrefix {
    /// Production batch (lot)
    Bat,
    /// Battery pack (traced unit)
    Pk,
    /// Dispatch order (shipment)
    Dsp,
    /// Warranty claim
    Wc,
    /// Finding (nonconformity)
    Fnd,
}

impl EntityPrefix {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityPrefix::Bat => "BAT",
            EntityPrefix::Pk => "PK",
            EntityPrefix::Dsp => "DSP",
            EntityPrefix::Wc => "WC",
            EntityPrefix::Fnd => "FND",
        }
    }
}

impl fmt::Display for EntityPrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for EntityPrefix {
    type Err = IdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "BAT" => Ok(EntityPrefix::Bat),
            "PK" => Ok(EntityPrefix::Pk),
            "DSP" => Ok(EntityPrefix::Dsp),
            "WC" => Ok(EntityPrefix::Wc),
            "FND" => Ok(EntityPrefix::Fnd),
            other => Err(IdParseError::UnknownPrefix {
                prefix: other.to_string(),
            }),
        }
    }
}

/// Errors from parsing an entity ID string
#[derive(Debug, Error)]
pub enum IdParseError {
    #[error("Unknown entity prefix: {prefix}")]
    UnknownPrefix { prefix: String },

    #[error("Malformed entity ID (expected PREFIX-ULID): {id}")]
    Malformed { id: String },

    #[error("Invalid ULID in entity ID: {id}")]
    InvalidUlid { id: String },
}

/// A prefixed ULID identifier for a persisted entity
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId {
    prefix: EntityPrefix,
    ulid: Ulid,
}

impl EntityId {
    /// Mint a fresh ID for the given entity type
    pub fn new(prefix: EntityPrefix) -> Self {
        Self {
            prefix,
            ulid: Ulid::new(),
        }
    }

    pub fn prefix(&self) -> EntityPrefix {
        self.prefix
    }

    /// Short display form: prefix plus the first 8 ULID characters
    pub fn short(&self) -> String {
        let full = self.ulid.to_string();
        format!("{}-{}", self.prefix, &full[..8])
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.prefix, self.ulid)
    }
}

impl FromStr for EntityId {
    type Err = IdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (prefix_str, ulid_str) = s.split_once('-').ok_or_else(|| IdParseError::Malformed {
            id: s.to_string(),
        })?;
        let prefix = prefix_str.parse()?;
        let ulid = Ulid::from_string(ulid_str).map_err(|_| IdParseError::InvalidUlid {
            id: s.to_string(),
        })?;
        Ok(Self { prefix, ulid })
    }
}

impl Serialize for EntityId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for EntityId {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Mint a certificate reference. Certificate refs are not entity IDs; they
/// reference issued EOL certificates and must be globally unique.
pub fn new_certificate_ref() -> String {
    format!("CERT-{}", Ulid::new())
}
