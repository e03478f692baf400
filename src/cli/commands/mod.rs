//! Command implementations

pub mod audit;
pub mod evidence;
pub mod readiness;

use std::path::Path;

use miette::Result;

use crate::core::store::Snapshot;

/// Load a snapshot file, mapping errors to terminal diagnostics
pub fn load_snapshot(path: &Path) -> Result<Snapshot> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| miette::miette!("Cannot read snapshot {}: {}", path.display(), e))?;
    Snapshot::from_yaml(&contents).map_err(|e| miette::miette!("{}", e))
}
