//! End-of-line qualification workflow
//!
//! A per-battery, single-session stepper:
//! `Scan → Precheck → Test → Disposition → Certify (optional) → Finalize`.
//! A test station holds at most one session; starting a session on a busy
//! station fails instead of queueing. The pass/fail verdict is computed
//! deterministically from the per-SKU threshold specification - there is no
//! randomness anywhere in the verdict path.

use std::collections::HashMap;
use std::sync::RwLock;

use crate::core::audit::AuditEntry;
use crate::core::capability::Elevated;
use crate::core::error::CoreError;
use crate::core::identity::{new_certificate_ref, EntityId};
use crate::core::store::Repository;
use crate::entities::battery::{
    Battery, BatteryStatus, CustodyStatus, EolResult, InventoryRecord, ProvisioningStatus,
    QaDisposition,
};

/// One EOL measurement set
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Measurements {
    pub voltage_v: f64,
    pub capacity_ah: f64,
    pub internal_resistance_mohm: f64,
    pub temperature_max_c: f64,
    pub cell_balancing_delta_mv: f64,
}

/// Per-SKU acceptance thresholds
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TestThresholds {
    pub voltage_min_v: f64,
    pub voltage_max_v: f64,
    pub capacity_min_ah: f64,
    pub internal_resistance_max_mohm: f64,
    pub temperature_max_c: f64,
    pub cell_balancing_delta_max_mv: f64,
}

impl TestThresholds {
    /// Deterministic verdict: the list names every violated check
    pub fn evaluate(&self, m: &Measurements) -> (EolResult, Vec<String>) {
        let mut violations = Vec::new();
        if m.voltage_v < self.voltage_min_v {
            violations.push(format!(
                "voltage {:.2}V below minimum {:.2}V",
                m.voltage_v, self.voltage_min_v
            ));
        }
        if m.voltage_v > self.voltage_max_v {
            violations.push(format!(
                "voltage {:.2}V above maximum {:.2}V",
                m.voltage_v, self.voltage_max_v
            ));
        }
        if m.capacity_ah < self.capacity_min_ah {
            violations.push(format!(
                "capacity {:.1}Ah below minimum {:.1}Ah",
                m.capacity_ah, self.capacity_min_ah
            ));
        }
        if m.internal_resistance_mohm > self.internal_resistance_max_mohm {
            violations.push(format!(
                "internal resistance {:.2}mΩ above maximum {:.2}mΩ",
                m.internal_resistance_mohm, self.internal_resistance_max_mohm
            ));
        }
        if m.temperature_max_c > self.temperature_max_c {
            violations.push(format!(
                "temperature {:.1}°C above maximum {:.1}°C",
                m.temperature_max_c, self.temperature_max_c
            ));
        }
        if m.cell_balancing_delta_mv > self.cell_balancing_delta_max_mv {
            violations.push(format!(
                "cell balancing delta {:.0}mV above maximum {:.0}mV",
                m.cell_balancing_delta_mv, self.cell_balancing_delta_max_mv
            ));
        }
        let result = if violations.is_empty() {
            EolResult::Pass
        } else {
            EolResult::Fail
        };
        (result, violations)
    }
}

/// Per-SKU test specification book, loaded from configuration
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct TestSpecBook {
    #[serde(default)]
    pub thresholds: HashMap<String, TestThresholds>,
}

impl TestSpecBook {
    pub fn from_yaml(contents: &str) -> Result<Self, CoreError> {
        serde_yml::from_str(contents)
            .map_err(|e| CoreError::validation(format!("Invalid test spec: {e}")))
    }

    pub fn for_sku(&self, sku: &str) -> Result<&TestThresholds, CoreError> {
        self.thresholds.get(sku).ok_or_else(|| {
            CoreError::precondition(format!("No test specification configured for SKU {sku}"))
        })
    }

    pub fn insert(&mut self, sku: &str, thresholds: TestThresholds) {
        self.thresholds.insert(sku.to_string(), thresholds);
    }
}

/// Workflow step position
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionStep {
    Scanned,
    Prechecked,
    Tested,
    Dispositioned,
    Certified,
    Finalized,
}

/// One battery's qualification session on one station
#[derive(Debug)]
pub struct EolSession {
    pub station: String,
    pub battery_id: EntityId,
    step: SessionStep,
    result: Option<EolResult>,
    disposition: Option<QaDisposition>,
}

/// EOL workflow engine: station pool + stepper over the repository
pub struct EolWorkflow<'a> {
    repo: &'a Repository,
    spec: TestSpecBook,
    // station name → battery currently under test
    stations: RwLock<HashMap<String, Option<EntityId>>>,
}

impl<'a> EolWorkflow<'a> {
    pub fn new(repo: &'a Repository, spec: TestSpecBook) -> Self {
        Self {
            repo,
            spec,
            stations: RwLock::new(HashMap::new()),
        }
    }

    pub fn register_station(&self, name: &str) {
        self.stations
            .write()
            .expect("station lock poisoned")
            .entry(name.to_string())
            .or_insert(None);
    }

    pub fn station_busy(&self, name: &str) -> bool {
        self.stations
            .read()
            .expect("station lock poisoned")
            .get(name)
            .map(|slot| slot.is_some())
            .unwrap_or(false)
    }

    /// SCAN: resolve the battery by serial or id and claim the station
    pub fn start_session(&self, station: &str, query: &str) -> Result<EolSession, CoreError> {
        let battery = self.resolve(query)?;

        let mut stations = self.stations.write().expect("station lock poisoned");
        let slot = stations
            .get_mut(station)
            .ok_or_else(|| CoreError::not_found(format!("station {station}")))?;
        if let Some(occupant) = slot {
            return Err(CoreError::precondition(format!(
                "Station {station} is busy testing {occupant}"
            )));
        }
        *slot = Some(battery.id.clone());

        Ok(EolSession {
            station: station.to_string(),
            battery_id: battery.id,
            step: SessionStep::Scanned,
            result: None,
            disposition: None,
        })
    }

    fn resolve(&self, query: &str) -> Result<Battery, CoreError> {
        if let Ok(id) = query.parse::<EntityId>() {
            return Ok(self.repo.batteries.get(&id)?.entity);
        }
        self.repo
            .batteries
            .filter(|b: &Battery| b.serial == query)
            .into_iter()
            .next()
            .ok_or_else(|| CoreError::not_found(query))
    }

    fn release_station(&self, session: &EolSession) {
        if let Some(slot) = self
            .stations
            .write()
            .expect("station lock poisoned")
            .get_mut(&session.station)
        {
            *slot = None;
        }
    }

    /// Abandon a session without a verdict; frees the station
    pub fn cancel_session(&self, session: EolSession) {
        self.release_station(&session);
    }

    fn expect_step(session: &EolSession, expected: SessionStep) -> Result<(), CoreError> {
        if session.step != expected {
            return Err(CoreError::precondition(format!(
                "EOL session for {} is not at the required step",
                session.battery_id
            )));
        }
        Ok(())
    }

    /// PRECHECK: provisioning must be complete, unless an elevated caller
    /// overrides - and the override is recorded as its own audit entry.
    pub fn precheck(
        &self,
        session: &mut EolSession,
        override_token: Option<&Elevated>,
        actor: &str,
    ) -> Result<Battery, CoreError> {
        Self::expect_step(session, SessionStep::Scanned)?;
        let battery = self.repo.batteries.update(&session.battery_id, |b| {
            let overridden = match (b.provisioning_status, override_token) {
                (ProvisioningStatus::Done, _) => false,
                (_, Some(_)) => true,
                (status, None) => {
                    return Err(CoreError::precondition(format!(
                        "Provisioning must be done before EOL precheck (current: {status})"
                    )))
                }
            };
            if !BatteryStatus::can_transition(b.status, BatteryStatus::QaTesting) {
                return Err(CoreError::invalid_transition(b.status, BatteryStatus::QaTesting));
            }
            let mut next = b.clone();
            next.status = BatteryStatus::QaTesting;
            next.eol_log.push(AuditEntry::now(actor, "EOL precheck passed"));
            if overridden {
                let grantor = override_token.expect("override checked").grantor();
                next.eol_log.push(AuditEntry::now(
                    actor,
                    format!("Precheck provisioning gate overridden (granted by {grantor})"),
                ));
            }
            next.touch();
            Ok(next)
        })?;
        session.step = SessionStep::Prechecked;
        Ok(battery)
    }

    /// TEST: record measurements and compute the verdict from the SKU spec
    pub fn run_test(
        &self,
        session: &mut EolSession,
        measurements: Measurements,
        actor: &str,
    ) -> Result<(EolResult, Vec<String>), CoreError> {
        Self::expect_step(session, SessionStep::Prechecked)?;
        let battery = self.repo.batteries.get(&session.battery_id)?.entity;
        let thresholds = self.spec.for_sku(&battery.sku)?;
        let (result, violations) = thresholds.evaluate(&measurements);

        self.repo.batteries.update(&session.battery_id, |b| {
            let mut next = b.clone();
            next.eol_result = Some(result);
            next.eol_log.push(AuditEntry::now(
                actor,
                format!(
                    "EOL test {}: {:.2}V, {:.1}Ah, {:.2}mΩ, {:.1}°C max, {:.0}mV delta",
                    result,
                    measurements.voltage_v,
                    measurements.capacity_ah,
                    measurements.internal_resistance_mohm,
                    measurements.temperature_max_c,
                    measurements.cell_balancing_delta_mv,
                ),
            ));
            for v in &violations {
                next.eol_log.push(AuditEntry::now(actor, format!("Violation: {v}")));
            }
            next.touch();
            Ok(next)
        })?;

        session.step = SessionStep::Tested;
        session.result = Some(result);
        Ok((result, violations))
    }

    /// DISPOSITION: any non-pass disposition requires a reason code
    pub fn set_disposition(
        &self,
        session: &mut EolSession,
        disposition: QaDisposition,
        reason: Option<&str>,
        actor: &str,
    ) -> Result<Battery, CoreError> {
        Self::expect_step(session, SessionStep::Tested)?;
        if disposition != QaDisposition::Pass
            && reason.map(str::trim).unwrap_or_default().is_empty()
        {
            return Err(CoreError::validation(
                "Reason code required for failure/hold dispositions",
            ));
        }
        if disposition == QaDisposition::Pass && session.result != Some(EolResult::Pass) {
            return Err(CoreError::precondition(
                "Cannot disposition PASS against a failing EOL result",
            ));
        }

        let battery = self.repo.batteries.update(&session.battery_id, |b| {
            let mut next = b.clone();
            next.qa_disposition = Some(disposition);
            let note = match reason {
                Some(r) => format!("QA disposition: {disposition} ({r})"),
                None => format!("QA disposition: {disposition}"),
            };
            next.eol_log.push(AuditEntry::now(actor, note));
            match disposition {
                QaDisposition::Scrap => {
                    next.status = BatteryStatus::Scrapped;
                    next.scrap_flag = true;
                }
                QaDisposition::Fail | QaDisposition::Rework => {
                    next.rework_flag = true;
                }
                QaDisposition::Pass | QaDisposition::Hold => {}
            }
            next.touch();
            Ok(next)
        })?;

        session.step = SessionStep::Dispositioned;
        session.disposition = Some(disposition);
        Ok(battery)
    }

    /// CERTIFY: only reachable after a PASS disposition
    pub fn generate_certificate(
        &self,
        session: &mut EolSession,
        actor: &str,
    ) -> Result<String, CoreError> {
        Self::expect_step(session, SessionStep::Dispositioned)?;
        if session.disposition != Some(QaDisposition::Pass) {
            return Err(CoreError::precondition(
                "Certificate requires a PASS disposition",
            ));
        }
        let cert = new_certificate_ref();
        self.repo.batteries.update(&session.battery_id, |b| {
            let mut next = b.clone();
            next.certificate_ref = Some(cert.clone());
            next.eol_log
                .push(AuditEntry::now(actor, format!("Certificate issued: {cert}")));
            next.touch();
            Ok(next)
        })?;
        session.step = SessionStep::Certified;
        Ok(cert)
    }

    /// FINALIZE: route the unit out of the session and free the station.
    ///
    /// Pass → InInventory / AtFactory / PendingPutaway. Rework → back to
    /// Assembly with the pipeline reset. Scrap already landed at
    /// disposition. Fail/Hold stay in QaTesting.
    pub fn finalize(&self, session: EolSession, actor: &str) -> Result<Battery, CoreError> {
        if !matches!(
            session.step,
            SessionStep::Dispositioned | SessionStep::Certified
        ) {
            self.release_station(&session);
            return Err(CoreError::precondition(
                "Disposition must be recorded before finalizing the session",
            ));
        }
        let disposition = session.disposition.expect("dispositioned");

        let outcome = self.repo.batteries.update(&session.battery_id, |b| {
            let mut next = b.clone();
            match disposition {
                QaDisposition::Pass => {
                    next.status = BatteryStatus::InInventory;
                    next.release_to_inventory = true;
                    next.inventory = Some(InventoryRecord::pending_putaway());
                    next.custody_status = CustodyStatus::AtFactory;
                    next.eol_log
                        .push(AuditEntry::now(actor, "EOL finalized: released to inventory"));
                }
                QaDisposition::Rework => {
                    next.status = BatteryStatus::Assembly;
                    next.provisioning_status = ProvisioningStatus::NotStarted;
                    next.provisioning_step = None;
                    next.eol_log
                        .push(AuditEntry::now(actor, "EOL finalized: routed to rework"));
                }
                QaDisposition::Scrap => {
                    next.eol_log
                        .push(AuditEntry::now(actor, "EOL finalized: scrapped"));
                }
                QaDisposition::Fail | QaDisposition::Hold => {
                    next.eol_log.push(AuditEntry::now(
                        actor,
                        format!("EOL finalized: held in QA ({disposition})"),
                    ));
                }
            }
            next.touch();
            Ok(next)
        });

        self.release_station(&session);
        outcome
    }
}
