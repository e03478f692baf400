//! CLI smoke tests: drive the real workflows in-process, write the snapshot
//! YAML to a temp dir and run the binary against it.

mod common;

use std::fs;

use assert_cmd::cargo;
use assert_cmd::Command;
use packtrace::core::{CustodyProtocol, EolWorkflow, Repository};
use predicates::prelude::*;
use tempfile::TempDir;

fn packtrace() -> Command {
    Command::new(cargo::cargo_bin!("packtrace"))
}

fn write_snapshot(repo: &Repository, tmp: &TempDir) -> std::path::PathBuf {
    let path = tmp.path().join("snapshot.yaml");
    let yaml = serde_yml::to_string(&repo.snapshot()).unwrap();
    fs::write(&path, yaml).unwrap();
    path
}

#[test]
fn audit_passes_on_clean_snapshot() {
    let tmp = TempDir::new().unwrap();
    let repo = Repository::new();
    let eol = EolWorkflow::new(&repo, common::spec_book());
    common::stocked_battery(&repo, &eol, "RACK-A1");
    let path = write_snapshot(&repo, &tmp);

    packtrace()
        .args(["audit", path.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("0 failed"));
}

#[test]
fn audit_fails_on_violating_snapshot() {
    let tmp = TempDir::new().unwrap();
    let repo = Repository::new();
    let (_, battery) = common::provisioned_battery(&repo);
    repo.batteries
        .update(&battery.id, |b| {
            let mut next = b.clone();
            next.status = packtrace::entities::BatteryStatus::InTransit;
            Ok(next)
        })
        .unwrap();
    let path = write_snapshot(&repo, &tmp);

    packtrace()
        .args(["audit", path.to_str().unwrap()])
        .assert()
        .failure()
        .stdout(predicate::str::contains("Shipped without EOL pass"))
        .stdout(predicate::str::contains(battery.id.to_string()));
}

#[test]
fn audit_strict_fails_on_warnings() {
    let tmp = TempDir::new().unwrap();
    let repo = Repository::new();
    let (_, battery) = common::provisioned_battery(&repo);
    // Pass verdict without a certificate only warns (R3)
    repo.batteries
        .update(&battery.id, |b| {
            let mut next = b.clone();
            next.eol_result = Some(packtrace::entities::EolResult::Pass);
            Ok(next)
        })
        .unwrap();
    let path = write_snapshot(&repo, &tmp);

    packtrace()
        .args(["audit", path.to_str().unwrap()])
        .assert()
        .success();
    packtrace()
        .args(["audit", "--strict", path.to_str().unwrap()])
        .assert()
        .failure();
}

#[test]
fn readiness_reports_dimensions_and_total() {
    let tmp = TempDir::new().unwrap();
    let repo = Repository::new();
    let eol = EolWorkflow::new(&repo, common::spec_book());
    common::stocked_battery(&repo, &eol, "RACK-A1");
    let path = write_snapshot(&repo, &tmp);

    packtrace()
        .args(["readiness", path.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("traceability"))
        .stdout(predicate::str::contains("Readiness:"));
}

#[test]
fn evidence_dumps_pack_for_known_battery() {
    let tmp = TempDir::new().unwrap();
    let repo = Repository::new();
    let eol = EolWorkflow::new(&repo, common::spec_book());
    let battery = common::stocked_battery(&repo, &eol, "RACK-A1");
    let custody = CustodyProtocol::new(&repo);
    let order = custody.create_order("Acme Grid", "erin").unwrap();
    custody.add_battery(&order.id, &battery.id, "erin").unwrap();
    let path = write_snapshot(&repo, &tmp);

    packtrace()
        .args(["evidence", path.to_str().unwrap(), &battery.id.to_string()])
        .assert()
        .success()
        .stdout(predicate::str::contains(&battery.serial))
        .stdout(predicate::str::contains("timeline"));

    packtrace()
        .args([
            "evidence",
            "--json",
            path.to_str().unwrap(),
            &battery.id.to_string(),
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"timeline\""));
}

#[test]
fn evidence_rejects_unknown_battery() {
    let tmp = TempDir::new().unwrap();
    let repo = Repository::new();
    let path = write_snapshot(&repo, &tmp);
    let ghost =
        packtrace::core::EntityId::new(packtrace::core::EntityPrefix::Pk).to_string();

    packtrace()
        .args(["evidence", path.to_str().unwrap(), &ghost])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"));
}

#[test]
fn missing_snapshot_file_is_a_clean_error() {
    packtrace()
        .args(["audit", "no-such-file.yaml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Cannot read snapshot"));
}
