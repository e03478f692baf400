//! `packtrace evidence` - per-asset evidence pack

use miette::Result;

use crate::cli::EvidenceArgs;
use crate::core::compliance::evidence_pack;
use crate::core::identity::EntityId;

pub fn run(args: EvidenceArgs) -> Result<()> {
    let snapshot = super::load_snapshot(&args.snapshot)?;
    let id: EntityId = args
        .battery_id
        .parse()
        .map_err(|e| miette::miette!("{}", e))?;

    let pack = evidence_pack(&snapshot, &id)
        .ok_or_else(|| miette::miette!("Battery not found in snapshot: {}", id))?;

    if args.json {
        let json = serde_json::to_string_pretty(&pack).map_err(|e| miette::miette!("{}", e))?;
        println!("{json}");
    } else {
        let yaml = serde_yml::to_string(&pack).map_err(|e| miette::miette!("{}", e))?;
        print!("{yaml}");
    }
    Ok(())
}
