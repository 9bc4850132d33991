//! The Worker's mutable state: catalog, stats, and cache, guarded by a
//! single lock (spec.md §5 "Shared-resource policy": "`functions`,
//! `stats`, `cache` under one re-entrant mutex"). Rust's ownership model
//! means handlers never need to re-acquire the lock mid-request, so a
//! plain (non-reentrant) `tokio::sync::Mutex` over one struct stands in
//! for the source's re-entrant lock (see DESIGN.md).

use crate::cache::{CacheKey, LruCache};
use crate::catalog::Catalog;
use crate::procedures::ProcedureRegistry;
use crate::stats::StatsTable;
use faas_protocol::ArgValue;
use std::time::Instant;

pub struct WorkerState {
    pub worker_id: String,
    pub catalog: Catalog,
    pub stats: StatsTable,
    pub cache: LruCache<CacheKey, ArgValue>,
    pub procedures: ProcedureRegistry,
    pub started_at: Instant,
}

impl WorkerState {
    pub fn new(worker_id: String, cache_max_size: usize) -> Self {
        Self {
            worker_id,
            catalog: Catalog::new(),
            stats: StatsTable::new(),
            cache: LruCache::new(cache_max_size),
            procedures: ProcedureRegistry::with_builtins(),
            started_at: Instant::now(),
        }
    }

    pub fn uptime_secs(&self) -> f64 {
        self.started_at.elapsed().as_secs_f64()
    }
}
