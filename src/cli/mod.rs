//! CLI module - argument parsing and command dispatch
//!
//! The CLI is a read-only presentation boundary: it loads an entity-graph
//! snapshot from a YAML file and reports on it. It never mutates entities.

pub mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "packtrace", version, about = "Battery asset lifecycle compliance auditor")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Evaluate the compliance rule set against a snapshot
    Audit(AuditArgs),
    /// Compute the composite readiness score for a snapshot
    Readiness(SnapshotArgs),
    /// Assemble the evidence pack for one battery
    Evidence(EvidenceArgs),
}

#[derive(clap::Args, Debug)]
pub struct SnapshotArgs {
    /// Path to the snapshot YAML file
    #[arg(value_name = "SNAPSHOT")]
    pub snapshot: PathBuf,
}

#[derive(clap::Args, Debug)]
pub struct AuditArgs {
    /// Path to the snapshot YAML file
    #[arg(value_name = "SNAPSHOT")]
    pub snapshot: PathBuf,

    /// Reservation staleness SLA in hours (rule R6)
    #[arg(long, default_value_t = 72)]
    pub reservation_sla_hours: i64,

    /// Exit nonzero on warnings as well as failures
    #[arg(long)]
    pub strict: bool,
}

#[derive(clap::Args, Debug)]
pub struct EvidenceArgs {
    /// Path to the snapshot YAML file
    #[arg(value_name = "SNAPSHOT")]
    pub snapshot: PathBuf,

    /// Battery entity ID (PK-…)
    #[arg(value_name = "BATTERY_ID")]
    pub battery_id: String,

    /// Emit the pack as JSON instead of YAML
    #[arg(long)]
    pub json: bool,
}
