//! Custody transfer protocol
//!
//! Per-order and per-battery custody states:
//! `AtFactory → InTransit → Delivered → {Accepted | Rejected}`.
//! Order-level transitions fan out to every contained battery. Fan-out is
//! atomic-or-reported: the report names exactly which battery ids failed,
//! so members never silently diverge from the order's custody status.

use crate::core::audit::{AuditEntry, CustodyEntry};
use crate::core::battery_flow::BatteryFlow;
use crate::core::error::CoreError;
use crate::core::identity::EntityId;
use crate::core::store::Repository;
use crate::entities::battery::{Battery, BatteryStatus, CustodyStatus, InventoryStatus};
use crate::entities::dispatch::{DispatchOrder, DispatchStatus};

/// Result of one order-level fan-out
#[derive(Debug)]
pub struct CustodyReport {
    pub order: DispatchOrder,
    /// Battery ids the custody change was applied to
    pub applied: Vec<EntityId>,
    /// Battery ids that rejected the change, with the reason
    pub failed: Vec<(EntityId, String)>,
}

impl CustodyReport {
    pub fn fully_applied(&self) -> bool {
        self.failed.is_empty()
    }
}

pub struct CustodyProtocol<'a> {
    repo: &'a Repository,
}

impl<'a> CustodyProtocol<'a> {
    pub fn new(repo: &'a Repository) -> Self {
        Self { repo }
    }

    /// Create a draft dispatch order
    pub fn create_order(&self, customer: &str, actor: &str) -> Result<DispatchOrder, CoreError> {
        if customer.trim().is_empty() {
            return Err(CoreError::validation("Customer must not be empty"));
        }
        let mut order = DispatchOrder::new(customer, actor);
        order.notes.push(AuditEntry::now(actor, "Dispatch order created"));
        self.repo
            .dispatch_orders
            .insert(order.id.clone(), order.clone())?;
        Ok(order)
    }

    /// Attach shipping documents
    pub fn set_documents(
        &self,
        order_id: &EntityId,
        packing_list: Option<&str>,
        manifest: Option<&str>,
        invoice: Option<&str>,
        actor: &str,
    ) -> Result<DispatchOrder, CoreError> {
        self.repo.dispatch_orders.update(order_id, |o| {
            let mut next = o.clone();
            if let Some(p) = packing_list {
                next.packing_list_ref = Some(p.to_string());
            }
            if let Some(m) = manifest {
                next.manifest_ref = Some(m.to_string());
            }
            if let Some(i) = invoice {
                next.invoice_ref = Some(i.to_string());
            }
            next.notes
                .push(AuditEntry::now(actor, "Shipping documents updated"));
            next.updated = chrono::Utc::now();
            Ok(next)
        })
    }

    /// Reserve a battery for the order and add it to the manifest
    pub fn add_battery(
        &self,
        order_id: &EntityId,
        battery_id: &EntityId,
        actor: &str,
    ) -> Result<DispatchOrder, CoreError> {
        // The order must still be at the factory before the unit is
        // reserved; a rejected add must not leave a reservation behind
        let order = self.repo.dispatch_orders.get(order_id)?.entity;
        if order.custody_status != CustodyStatus::AtFactory {
            return Err(CoreError::precondition(format!(
                "Cannot add batteries after custody left the factory (current: {})",
                order.custody_status
            )));
        }

        // Reservation carries the double-booking guard
        BatteryFlow::new(self.repo).reserve(battery_id, order_id, actor)?;

        let result = self.repo.dispatch_orders.update(order_id, |o| {
            if o.custody_status != CustodyStatus::AtFactory {
                return Err(CoreError::precondition(format!(
                    "Cannot add batteries after custody left the factory (current: {})",
                    o.custody_status
                )));
            }
            let mut next = o.clone();
            if !next.battery_ids.contains(battery_id) {
                next.battery_ids.push(battery_id.clone());
            }
            next.status = DispatchStatus::Picking;
            next.notes
                .push(AuditEntry::now(actor, format!("Battery {battery_id} added")));
            next.updated = chrono::Utc::now();
            Ok(next)
        });

        if result.is_err() {
            // The order commit lost; return the unit to stock
            self.unreserve(battery_id, order_id, actor);
        }
        result
    }

    /// Drop a reservation this order holds. Used to unwind a reservation
    /// when the unit never made it onto the manifest.
    fn unreserve(&self, battery_id: &EntityId, order_id: &EntityId, actor: &str) {
        let _ = self.repo.batteries.update(battery_id, |b| {
            let mut next = b.clone();
            match next.inventory.as_mut() {
                Some(inv)
                    if inv.status == InventoryStatus::Reserved
                        && inv.reserved_by.as_ref() == Some(order_id) =>
                {
                    inv.status = InventoryStatus::Available;
                    inv.reserved_by = None;
                    inv.reserved_at = None;
                }
                _ => {
                    return Err(CoreError::precondition(
                        "No reservation held by this order",
                    ))
                }
            }
            next.notes.push(AuditEntry::now(
                actor,
                format!("Reservation for dispatch {order_id} released"),
            ));
            next.touch();
            Ok(next)
        });
    }

    /// Dispatch: order and every member go InTransit; member inventory
    /// records are marked dispatched.
    pub fn mark_dispatched(&self, order_id: &EntityId, actor: &str) -> Result<CustodyReport, CoreError> {
        // Gate inside the closure: a racing transition that wins the swap
        // must fail the loser's re-run, not be silently overwritten
        let order = self.repo.dispatch_orders.update(order_id, |o| {
            o.ready_for_dispatch().map_err(CoreError::precondition)?;
            if !CustodyStatus::can_transition(o.custody_status, CustodyStatus::InTransit) {
                return Err(CoreError::invalid_transition(
                    o.custody_status,
                    CustodyStatus::InTransit,
                ));
            }
            let mut next = o.clone();
            next.status = DispatchStatus::Dispatched;
            next.custody_status = CustodyStatus::InTransit;
            next.custody_log
                .push(CustodyEntry::now(actor, CustodyStatus::InTransit, None));
            next.updated = chrono::Utc::now();
            Ok(next)
        })?;

        let (applied, failed) = self.fan_out(&order.battery_ids, |b| {
            if !CustodyStatus::can_transition(b.custody_status, CustodyStatus::InTransit) {
                return Err(CoreError::invalid_transition(
                    b.custody_status,
                    CustodyStatus::InTransit,
                ));
            }
            if !BatteryStatus::can_transition(b.status, BatteryStatus::InTransit) {
                return Err(CoreError::invalid_transition(b.status, BatteryStatus::InTransit));
            }
            let mut next = b.clone();
            next.status = BatteryStatus::InTransit;
            next.custody_status = CustodyStatus::InTransit;
            next.dispatch_id = Some(order_id.clone());
            if let Some(inv) = next.inventory.as_mut() {
                inv.status = InventoryStatus::Dispatched;
            }
            next.custody_log
                .push(CustodyEntry::now(actor, CustodyStatus::InTransit, None));
            next.touch();
            Ok(next)
        });

        Ok(CustodyReport { order, applied, failed })
    }

    /// Receipt at the destination: order and members go Delivered
    pub fn mark_received(
        &self,
        order_id: &EntityId,
        location: &str,
        actor: &str,
    ) -> Result<CustodyReport, CoreError> {
        self.order_transition(
            order_id,
            CustodyStatus::Delivered,
            Some(location),
            None,
            actor,
        )
    }

    /// Customer acceptance; terminal. Accepted units are deployed.
    pub fn mark_accepted(&self, order_id: &EntityId, actor: &str) -> Result<CustodyReport, CoreError> {
        self.order_transition(order_id, CustodyStatus::Accepted, None, None, actor)
    }

    /// Customer rejection; terminal and requires a reason code
    pub fn mark_rejected(
        &self,
        order_id: &EntityId,
        reason: &str,
        actor: &str,
    ) -> Result<CustodyReport, CoreError> {
        if reason.trim().is_empty() {
            return Err(CoreError::validation("Reason code required for rejection"));
        }
        self.order_transition(order_id, CustodyStatus::Rejected, None, Some(reason), actor)
    }

    fn order_transition(
        &self,
        order_id: &EntityId,
        to: CustodyStatus,
        location: Option<&str>,
        reason: Option<&str>,
        actor: &str,
    ) -> Result<CustodyReport, CoreError> {
        let note = match (location, reason) {
            (Some(l), _) => Some(format!("at {l}")),
            (None, Some(r)) => Some(r.to_string()),
            _ => None,
        };

        // Commit the order first, gate inside the closure, so a lost swap
        // re-runs against the winner and the transition applies exactly once
        let order = self.repo.dispatch_orders.update(order_id, |o| {
            if !CustodyStatus::can_transition(o.custody_status, to) {
                return Err(CoreError::invalid_transition(o.custody_status, to));
            }
            let mut next = o.clone();
            next.custody_status = to;
            if to.is_terminal() {
                next.status = DispatchStatus::Completed;
            }
            next.custody_log
                .push(CustodyEntry::now(actor, to, note.as_deref()));
            next.updated = chrono::Utc::now();
            Ok(next)
        })?;

        let (applied, failed) = self.fan_out(&order.battery_ids, |b| {
            if !CustodyStatus::can_transition(b.custody_status, to) {
                return Err(CoreError::invalid_transition(b.custody_status, to));
            }
            let mut next = b.clone();
            next.custody_status = to;
            if to == CustodyStatus::Accepted
                && BatteryStatus::can_transition(next.status, BatteryStatus::Deployed)
            {
                next.status = BatteryStatus::Deployed;
            }
            next.custody_log
                .push(CustodyEntry::now(actor, to, note.as_deref()));
            next.touch();
            Ok(next)
        });

        Ok(CustodyReport { order, applied, failed })
    }

    /// Apply one mutation to every member, collecting per-member outcomes
    fn fan_out<F>(&self, ids: &[EntityId], f: F) -> (Vec<EntityId>, Vec<(EntityId, String)>)
    where
        F: Fn(&Battery) -> Result<Battery, CoreError>,
    {
        let mut applied = Vec::new();
        let mut failed = Vec::new();
        for id in ids {
            match self.repo.batteries.update(id, &f) {
                Ok(_) => applied.push(id.clone()),
                Err(e) => failed.push((id.clone(), e.to_string())),
            }
        }
        (applied, failed)
    }
}
