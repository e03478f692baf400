//! `packtrace audit` - evaluate the rule set against a snapshot

use chrono::{Duration, Utc};
use console::style;
use miette::Result;
use tabled::{Table, Tabled};

use crate::cli::AuditArgs;
use crate::core::compliance::{evaluate, CheckStatus, RuleConfig};

#[derive(Tabled)]
struct RuleRow {
    #[tabled(rename = "Rule")]
    rule: &'static str,
    #[tabled(rename = "Check")]
    title: &'static str,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Severity")]
    severity: String,
    #[tabled(rename = "Affected")]
    affected: usize,
}

pub fn run(args: AuditArgs) -> Result<()> {
    let snapshot = super::load_snapshot(&args.snapshot)?;
    let config = RuleConfig {
        reservation_sla: Duration::hours(args.reservation_sla_hours),
    };
    let checks = evaluate(&snapshot, &config, Utc::now());

    let rows: Vec<RuleRow> = checks
        .iter()
        .map(|c| RuleRow {
            rule: c.rule.code(),
            title: c.rule.title(),
            status: match c.status {
                CheckStatus::Pass => style("pass").green().to_string(),
                CheckStatus::Warn => style("warn").yellow().to_string(),
                CheckStatus::Fail => style("FAIL").red().bold().to_string(),
            },
            severity: c.severity.to_string(),
            affected: c.affected_ids.len(),
        })
        .collect();
    println!("{}", Table::new(rows));

    let mut failures = 0usize;
    let mut warnings = 0usize;
    for c in &checks {
        match c.status {
            CheckStatus::Fail => failures += 1,
            CheckStatus::Warn => warnings += 1,
            CheckStatus::Pass => {}
        }
        if c.status != CheckStatus::Pass {
            println!(
                "\n{} {}",
                style(format!("[{}]", c.rule.code())).cyan(),
                c.description
            );
            for id in &c.affected_ids {
                println!("  - {id}");
            }
        }
    }

    println!(
        "\n{} rule(s) evaluated over {} batteries: {} failed, {} warned",
        checks.len(),
        snapshot.batteries.len(),
        failures,
        warnings
    );

    if failures > 0 || (args.strict && warnings > 0) {
        return Err(miette::miette!("Compliance audit found violations"));
    }
    Ok(())
}
