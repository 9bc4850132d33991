//! Shutdown-state persistence (spec.md §1 names the interface
//! out-of-scope; SPEC_FULL.md §6 implements it): an opaque dump/restore
//! of the Worker's catalog and stats, gated by
//! `behavior.shutdown_persistence`. Cache contents are intentionally
//! excluded (they are diagnostics, not durable state).

use crate::catalog::Catalog;
use crate::error::{Result, WorkerError};
use crate::stats::StatsTable;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Serialize, Deserialize)]
pub struct WorkerStateDump {
    pub catalog: Catalog,
    pub stats: StatsTable,
}

pub fn dump_state(path: &Path, catalog: &Catalog, stats: &StatsTable) -> Result<()> {
    let dump = serde_json::json!({
        "catalog": catalog,
        "stats": stats,
    });
    let content = serde_json::to_string_pretty(&dump)
        .map_err(|e| WorkerError::Internal(format!("serializing shutdown dump: {e}")))?;
    std::fs::write(path, content)
        .map_err(|e| WorkerError::Internal(format!("writing {}: {e}", path.display())))
}

pub fn restore_state(path: &Path) -> Result<WorkerStateDump> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| WorkerError::ConfigError(format!("reading {}: {e}", path.display())))?;
    serde_json::from_str(&content)
        .map_err(|e| WorkerError::DeserializationFailed(format!("parsing {}: {e}", path.display())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::CatalogEntry;
    use faas_protocol::types::FunctionDescriptor;
    use faas_protocol::value::ValueType;

    #[test]
    fn dump_and_restore_round_trips_catalog_and_stats() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dump.json");

        let mut catalog = Catalog::new();
        catalog.insert_if_absent(
            "f1".into(),
            CatalogEntry {
                descriptor: FunctionDescriptor {
                    name: "add".into(),
                    positional_params: vec![],
                    default_params: vec![],
                    return_type: Some(ValueType::Int),
                    procedure: "add".into(),
                },
                registering_client: "client-1".into(),
            },
        );
        let mut stats = StatsTable::new();
        stats.record_call("f1", 5.0);

        dump_state(&path, &catalog, &stats).unwrap();
        let restored = restore_state(&path).unwrap();
        assert!(restored.catalog.contains("f1"));
        assert_eq!(restored.stats.get("f1").unwrap().calls, 1);
    }
}
