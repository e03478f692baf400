//! Shared test helpers for integration tests

#![allow(dead_code)]

use packtrace::core::{
    BatchFlow, BatchSpec, BatteryFlow, EolWorkflow, Measurements, ProvisioningResult, Repository,
    TestSpecBook, TestThresholds,
};
use packtrace::entities::battery::QaDisposition;
use packtrace::entities::{Batch, Battery};

pub const SKU: &str = "PACK-48V-100";

pub fn thresholds() -> TestThresholds {
    TestThresholds {
        voltage_min_v: 46.0,
        voltage_max_v: 54.6,
        capacity_min_ah: 95.0,
        internal_resistance_max_mohm: 25.0,
        temperature_max_c: 45.0,
        cell_balancing_delta_max_mv: 50.0,
    }
}

pub fn spec_book() -> TestSpecBook {
    let mut book = TestSpecBook::default();
    book.insert(SKU, thresholds());
    book
}

pub fn passing_measurements() -> Measurements {
    Measurements {
        voltage_v: 51.2,
        capacity_ah: 102.0,
        internal_resistance_mohm: 12.0,
        temperature_max_c: 31.0,
        cell_balancing_delta_mv: 18.0,
    }
}

pub fn failing_measurements() -> Measurements {
    Measurements {
        voltage_v: 44.0,
        capacity_ah: 80.0,
        internal_resistance_mohm: 12.0,
        temperature_max_c: 31.0,
        cell_balancing_delta_mv: 18.0,
    }
}

/// Batch created and moved into production
pub fn production_batch(repo: &Repository) -> Batch {
    let flow = BatchFlow::new(repo);
    let batch = flow
        .create_batch(
            BatchSpec {
                sku: SKU.to_string(),
                bom_ref: Some("BOM-048".to_string()),
                process_params: vec![("formation_profile".to_string(), "FP-3".to_string())],
                qty_started: 10,
            },
            "alice",
        )
        .unwrap();
    flow.release_to_production(&batch.id, "alice").unwrap();
    flow.start_production(&batch.id, "alice").unwrap()
}

/// One battery registered against a fresh production batch
pub fn registered_battery(repo: &Repository) -> (Batch, Battery) {
    let batch = production_batch(repo);
    let flow = BatteryFlow::new(repo);
    let mut batteries = flow.register_batteries(&batch.id, 1, "alice").unwrap();
    (batch, batteries.remove(0))
}

/// Battery with the full provisioning pipeline run and finalized as pass
pub fn provisioned_battery(repo: &Repository) -> (Batch, Battery) {
    let (batch, battery) = registered_battery(repo);
    let flow = BatteryFlow::new(repo);
    flow.bind_bms(&battery.id, "BMS-7001", "bob").unwrap();
    flow.flash_firmware(&battery.id, "fw-2.4.1", "bob").unwrap();
    flow.trigger_calibration(&battery.id, "bob").unwrap();
    flow.inject_security(&battery.id, "bob").unwrap();
    flow.run_verification(&battery.id, "bob").unwrap();
    let battery = flow
        .finalize_provisioning(&battery.id, ProvisioningResult::Pass, "bob")
        .unwrap();
    (batch, battery)
}

/// Battery qualified through a full passing EOL session, put away as Available
pub fn stocked_battery(repo: &Repository, eol: &EolWorkflow, location: &str) -> Battery {
    let (_, battery) = provisioned_battery(repo);
    eol.register_station("EOL-1");
    let mut session = eol.start_session("EOL-1", &battery.serial).unwrap();
    eol.precheck(&mut session, None, "carol").unwrap();
    eol.run_test(&mut session, passing_measurements(), "carol")
        .unwrap();
    eol.set_disposition(&mut session, QaDisposition::Pass, None, "carol")
        .unwrap();
    eol.generate_certificate(&mut session, "carol").unwrap();
    eol.finalize(session, "carol").unwrap();
    BatteryFlow::new(repo)
        .put_away(&battery.id, location, "dave")
        .unwrap()
}
