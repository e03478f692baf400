//! Battery registration, provisioning pipeline and inventory operation tests

mod common;

use packtrace::core::{BatteryFlow, CoreError, EolWorkflow, ProvisioningResult, Repository};
use packtrace::entities::battery::{BatteryStatus, InventoryStatus, ProvisioningStatus};

#[test]
fn registration_serials_follow_batch_and_count() {
    let repo = Repository::new();
    let batch = common::production_batch(&repo);
    let flow = BatteryFlow::new(&repo);

    let first = flow.register_batteries(&batch.id, 3, "alice").unwrap();
    assert_eq!(first.len(), 3);
    for (i, b) in first.iter().enumerate() {
        assert_eq!(b.serial, format!("{}-{:04}", batch.id, i + 1));
        assert_eq!(b.status, BatteryStatus::Assembly);
        assert_eq!(b.sku, common::SKU);
    }

    // A second registration continues the serial sequence
    let second = flow.register_batteries(&batch.id, 2, "alice").unwrap();
    assert_eq!(second[0].serial, format!("{}-0004", batch.id));

    let updated = repo.batches.get(&batch.id).unwrap().entity;
    assert_eq!(updated.quantities.built, 5);
}

#[test]
fn serials_are_unique_across_batches_created_back_to_back() {
    let repo = Repository::new();
    let flow = BatteryFlow::new(&repo);

    // Batches minted in the same instant must still yield distinct serials,
    // since EOL sessions resolve batteries by serial
    let batch_a = common::production_batch(&repo);
    let batch_b = common::production_batch(&repo);
    let a = flow.register_batteries(&batch_a.id, 1, "alice").unwrap();
    let b = flow.register_batteries(&batch_b.id, 1, "alice").unwrap();
    assert_ne!(a[0].serial, b[0].serial);
}

#[test]
fn registration_rejects_zero_quantity() {
    let repo = Repository::new();
    let batch = common::production_batch(&repo);
    let err = BatteryFlow::new(&repo)
        .register_batteries(&batch.id, 0, "alice")
        .unwrap_err();
    assert!(matches!(err, CoreError::ValidationError { .. }));
}

#[test]
fn provisioning_steps_must_run_in_order() {
    let repo = Repository::new();
    let (_, battery) = common::registered_battery(&repo);
    let flow = BatteryFlow::new(&repo);

    // Calibration before BMS binding is out of order
    let err = flow.trigger_calibration(&battery.id, "bob").unwrap_err();
    assert!(matches!(err, CoreError::PreconditionFailed { .. }));

    let after_bind = flow.bind_bms(&battery.id, "BMS-1", "bob").unwrap();
    assert_eq!(after_bind.status, BatteryStatus::Provisioning);
    assert_eq!(after_bind.provisioning_status, ProvisioningStatus::InProgress);

    // Repeating a completed step is also rejected
    let err = flow.bind_bms(&battery.id, "BMS-1", "bob").unwrap_err();
    assert!(matches!(err, CoreError::PreconditionFailed { .. }));
}

#[test]
fn finalize_requires_verification_step() {
    let repo = Repository::new();
    let (_, battery) = common::registered_battery(&repo);
    let flow = BatteryFlow::new(&repo);
    flow.bind_bms(&battery.id, "BMS-1", "bob").unwrap();
    let err = flow
        .finalize_provisioning(&battery.id, ProvisioningResult::Pass, "bob")
        .unwrap_err();
    assert!(matches!(err, CoreError::PreconditionFailed { .. }));
}

#[test]
fn finalize_pass_marks_pipeline_done() {
    let repo = Repository::new();
    let (_, battery) = common::provisioned_battery(&repo);
    assert_eq!(battery.provisioning_status, ProvisioningStatus::Done);
    assert_eq!(battery.status, BatteryStatus::Provisioning);
    assert!(!battery.rework_flag);
}

#[test]
fn finalize_fail_blocks_without_rewinding_status() {
    let repo = Repository::new();
    let (_, battery) = common::registered_battery(&repo);
    let flow = BatteryFlow::new(&repo);
    flow.bind_bms(&battery.id, "BMS-1", "bob").unwrap();
    flow.flash_firmware(&battery.id, "fw-1", "bob").unwrap();
    flow.trigger_calibration(&battery.id, "bob").unwrap();
    flow.inject_security(&battery.id, "bob").unwrap();
    flow.run_verification(&battery.id, "bob").unwrap();

    let blocked = flow
        .finalize_provisioning(&battery.id, ProvisioningResult::Fail, "bob")
        .unwrap();
    assert_eq!(blocked.provisioning_status, ProvisioningStatus::Blocked);
    assert_eq!(blocked.status, BatteryStatus::Provisioning);
    assert!(blocked.rework_flag);
}

#[test]
fn put_away_then_move_updates_location_and_log() {
    let repo = Repository::new();
    let eol = EolWorkflow::new(&repo, common::spec_book());
    let battery = common::stocked_battery(&repo, &eol, "RACK-A1");
    assert_eq!(battery.inventory_status(), Some(InventoryStatus::Available));
    assert_eq!(battery.inventory_location(), Some("RACK-A1"));

    let moved = BatteryFlow::new(&repo)
        .move_to(&battery.id, "RACK-B4", "dave")
        .unwrap();
    assert_eq!(moved.inventory_location(), Some("RACK-B4"));
    assert_eq!(moved.movement_log.len(), 2);
    assert_eq!(moved.movement_log[1].from_location.as_deref(), Some("RACK-A1"));
    assert_eq!(moved.movement_log[1].to_location, "RACK-B4");
}

#[test]
fn put_away_requires_pending_putaway() {
    let repo = Repository::new();
    let eol = EolWorkflow::new(&repo, common::spec_book());
    let battery = common::stocked_battery(&repo, &eol, "RACK-A1");
    let err = BatteryFlow::new(&repo)
        .put_away(&battery.id, "RACK-A2", "dave")
        .unwrap_err();
    assert!(matches!(err, CoreError::PreconditionFailed { .. }));
}

#[test]
fn quarantine_clears_reservation_and_release_restores() {
    let repo = Repository::new();
    let eol = EolWorkflow::new(&repo, common::spec_book());
    let flow = BatteryFlow::new(&repo);
    let battery = common::stocked_battery(&repo, &eol, "RACK-A1");

    let order_id = packtrace::core::CustodyProtocol::new(&repo)
        .create_order("Acme Grid", "erin")
        .unwrap()
        .id;
    flow.reserve(&battery.id, &order_id, "erin").unwrap();

    let quarantined = flow
        .quarantine(&battery.id, "swelling observed", "qa-lead")
        .unwrap();
    assert_eq!(
        quarantined.inventory_status(),
        Some(InventoryStatus::Quarantined)
    );
    assert!(quarantined.inventory.as_ref().unwrap().reserved_by.is_none());

    let restored = flow.release_quarantine(&battery.id, "qa-lead").unwrap();
    assert_eq!(restored.inventory_status(), Some(InventoryStatus::Available));
}

#[test]
fn quarantine_requires_reason() {
    let repo = Repository::new();
    let eol = EolWorkflow::new(&repo, common::spec_book());
    let battery = common::stocked_battery(&repo, &eol, "RACK-A1");
    let err = BatteryFlow::new(&repo)
        .quarantine(&battery.id, "", "qa-lead")
        .unwrap_err();
    assert!(matches!(err, CoreError::ValidationError { .. }));
}

#[test]
fn reserve_is_exclusive_but_idempotent_per_order() {
    let repo = Repository::new();
    let eol = EolWorkflow::new(&repo, common::spec_book());
    let flow = BatteryFlow::new(&repo);
    let battery = common::stocked_battery(&repo, &eol, "RACK-A1");

    let custody = packtrace::core::CustodyProtocol::new(&repo);
    let order_a = custody.create_order("Acme Grid", "erin").unwrap();
    let order_b = custody.create_order("Borealis Power", "erin").unwrap();

    flow.reserve(&battery.id, &order_a.id, "erin").unwrap();
    // Same order again is a no-op
    let again = flow.reserve(&battery.id, &order_a.id, "erin").unwrap();
    assert_eq!(again.inventory_status(), Some(InventoryStatus::Reserved));

    // A different order is refused
    let err = flow.reserve(&battery.id, &order_b.id, "erin").unwrap_err();
    assert!(matches!(err, CoreError::PreconditionFailed { .. }));
}
