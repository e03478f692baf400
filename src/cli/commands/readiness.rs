//! `packtrace readiness` - composite readiness score

use console::style;
use miette::Result;
use tabled::{Table, Tabled};

use crate::cli::SnapshotArgs;
use crate::core::compliance::readiness;

#[derive(Tabled)]
struct DimensionRow {
    #[tabled(rename = "Dimension")]
    name: &'static str,
    #[tabled(rename = "Coverage")]
    coverage: String,
    #[tabled(rename = "Points")]
    points: String,
}

pub fn run(args: SnapshotArgs) -> Result<()> {
    let snapshot = super::load_snapshot(&args.snapshot)?;
    let score = readiness(&snapshot);

    let rows: Vec<DimensionRow> = score
        .dimensions
        .iter()
        .map(|d| DimensionRow {
            name: d.name,
            coverage: format!("{:.0}%", d.coverage * 100.0),
            points: format!("{:.1}/{:.0}", d.points, d.weight),
        })
        .collect();
    println!("{}", Table::new(rows));

    let colored = if score.total >= 90 {
        style(score.total).green()
    } else if score.total >= 70 {
        style(score.total).yellow()
    } else {
        style(score.total).red()
    };
    println!("\nReadiness: {colored}/100");
    Ok(())
}
