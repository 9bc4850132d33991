//! The Director's mutable state, guarded by a single mutex (spec.md §5
//! "Shared-resource policy": `workers`, `placement`, `pending_fanout`,
//! `synchronized_flag`, `round_robin_index`, `currently_serving_clients`
//! all live under one mutex").

use crate::pending::PendingFanoutTable;
use crate::placement::PlacementMap;
use crate::registry::WorkerRegistry;

pub struct DirectorState {
    pub registry: WorkerRegistry,
    pub placement: PlacementMap,
    pub pending_fanout: PendingFanoutTable,
    /// `false` once a synchronization pass has fully equalized every
    /// Worker's catalog; `register`/Worker death sets it back to `true`.
    pub dirty: bool,
    pub round_robin_index: usize,
    /// Count of client requests currently awaiting a Worker response.
    /// The synchronization loop only starts a pass when this is zero
    /// (spec.md §4.3 guard (b)).
    pub currently_serving_clients: usize,
}

impl Default for DirectorState {
    fn default() -> Self {
        Self {
            registry: WorkerRegistry::new(),
            placement: PlacementMap::new(),
            pending_fanout: PendingFanoutTable::new(),
            dirty: false,
            round_robin_index: 0,
            currently_serving_clients: 0,
        }
    }
}

impl DirectorState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a synchronization pass is allowed to start right now
    /// (spec.md §4.3: "≥2 Workers registered, no client request
    /// in-flight, and the dirty flag is set").
    pub fn sync_pass_allowed(&self) -> bool {
        self.registry.len() >= 2 && self.currently_serving_clients == 0 && self.dirty
    }
}
