//! Versioned in-memory entity store
//!
//! Each collection maps `EntityId` to a versioned slot. All writes go
//! through compare-and-swap on the slot version, so racing actors
//! (stations, planners) cannot silently overwrite each other. The
//! compliance engine reads a deep-copy snapshot taken under the read lock
//! and never observes a half-applied mutation.
//!
//! Persistence is a boundary concern: any backing store offering
//! get / list-with-filter / insert / compare-and-swap per collection can
//! replace `Collection` behind the same interface.

use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{DateTime, Utc};

use crate::core::error::CoreError;
use crate::core::identity::EntityId;
use crate::entities::batch::Batch;
use crate::entities::battery::Battery;
use crate::entities::dispatch::DispatchOrder;
use crate::entities::finding::Finding;
use crate::entities::warranty::WarrantyClaim;

/// Bounded retries for `Collection::update` when a swap loses a race.
const CAS_RETRIES: usize = 3;

/// An entity plus its slot version
#[derive(Debug, Clone)]
pub struct Versioned<T> {
    pub version: u64,
    pub entity: T,
}

/// A keyed, filterable, versioned entity collection
pub struct Collection<T: Clone> {
    slots: RwLock<HashMap<EntityId, Versioned<T>>>,
}

impl<T: Clone> Default for Collection<T> {
    fn default() -> Self {
        Self {
            slots: RwLock::new(HashMap::new()),
        }
    }
}

impl<T: Clone> Collection<T> {
    /// Fetch a copy of the entity and its current version
    pub fn get(&self, id: &EntityId) -> Result<Versioned<T>, CoreError> {
        let slots = self.slots.read().expect("store lock poisoned");
        slots
            .get(id)
            .cloned()
            .ok_or_else(|| CoreError::not_found(id))
    }

    /// Insert a new entity at version 1; the id must be unused
    pub fn insert(&self, id: EntityId, entity: T) -> Result<(), CoreError> {
        let mut slots = self.slots.write().expect("store lock poisoned");
        if slots.contains_key(&id) {
            return Err(CoreError::validation(format!(
                "Entity {id} already exists"
            )));
        }
        slots.insert(id, Versioned { version: 1, entity });
        Ok(())
    }

    /// Replace the entity if the caller's version is still current
    pub fn compare_and_swap(
        &self,
        id: &EntityId,
        expected_version: u64,
        entity: T,
    ) -> Result<u64, CoreError> {
        let mut slots = self.slots.write().expect("store lock poisoned");
        let slot = slots
            .get_mut(id)
            .ok_or_else(|| CoreError::not_found(id))?;
        if slot.version != expected_version {
            return Err(CoreError::Conflict { id: id.clone() });
        }
        slot.version += 1;
        slot.entity = entity;
        Ok(slot.version)
    }

    /// Read-check-mutate-commit loop.
    ///
    /// `f` receives the current entity and returns the mutated copy or a
    /// gate error. On a lost swap the entity is re-read and `f` re-runs
    /// against the winner's state, so the caller sees the gate error that
    /// actually applies rather than a raw version conflict.
    pub fn update<F>(&self, id: &EntityId, f: F) -> Result<T, CoreError>
    where
        F: Fn(&T) -> Result<T, CoreError>,
    {
        for _ in 0..CAS_RETRIES {
            let current = self.get(id)?;
            let next = f(&current.entity)?;
            match self.compare_and_swap(id, current.version, next.clone()) {
                Ok(_) => return Ok(next),
                Err(CoreError::Conflict { .. }) => continue,
                Err(e) => return Err(e),
            }
        }
        Err(CoreError::Conflict { id: id.clone() })
    }

    /// All entities, unordered
    pub fn list(&self) -> Vec<T> {
        let slots = self.slots.read().expect("store lock poisoned");
        slots.values().map(|v| v.entity.clone()).collect()
    }

    /// Entities matching a predicate
    pub fn filter<P>(&self, pred: P) -> Vec<T>
    where
        P: Fn(&T) -> bool,
    {
        let slots = self.slots.read().expect("store lock poisoned");
        slots
            .values()
            .filter(|v| pred(&v.entity))
            .map(|v| v.entity.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.slots.read().expect("store lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// The five entity collections behind one handle
#[derive(Default)]
pub struct Repository {
    pub batches: Collection<Batch>,
    pub batteries: Collection<Battery>,
    pub dispatch_orders: Collection<DispatchOrder>,
    pub warranty_claims: Collection<WarrantyClaim>,
    pub findings: Collection<Finding>,
}

impl Repository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consistent point-in-time copy of every collection.
    ///
    /// Taken collection-by-collection under the read locks; mutating
    /// operations hold the write lock for the whole commit, so no entity
    /// appears half-updated in the copy.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            taken_at: Utc::now(),
            batches: self.batches.list(),
            batteries: self.batteries.list(),
            dispatch_orders: self.dispatch_orders.list(),
            warranty_claims: self.warranty_claims.list(),
            findings: self.findings.list(),
        }
    }
}

/// A point-in-time copy of the entity graph, input to the rule engine
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Snapshot {
    pub taken_at: DateTime<Utc>,
    #[serde(default)]
    pub batches: Vec<Batch>,
    #[serde(default)]
    pub batteries: Vec<Battery>,
    #[serde(default)]
    pub dispatch_orders: Vec<DispatchOrder>,
    #[serde(default)]
    pub warranty_claims: Vec<WarrantyClaim>,
    #[serde(default)]
    pub findings: Vec<Finding>,
}

impl Snapshot {
    /// Load a snapshot from its YAML serialization
    pub fn from_yaml(contents: &str) -> Result<Self, CoreError> {
        serde_yml::from_str(contents).map_err(|e| CoreError::Snapshot {
            message: e.to_string(),
        })
    }

    pub fn battery(&self, id: &EntityId) -> Option<&Battery> {
        self.batteries.iter().find(|b| &b.id == id)
    }
}
