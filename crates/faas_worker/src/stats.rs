//! Per-function execution statistics (spec.md §4.4 exec semantics,
//! SPEC_FULL.md §6 `get_stats`).

use std::collections::HashMap;

#[derive(Debug, Clone, Copy, Default, serde::Serialize, serde::Deserialize)]
pub struct FunctionStats {
    pub calls: u64,
    pub tot_exec_time_ms: f64,
}

impl FunctionStats {
    pub fn avg_exec_time_ms(&self) -> f64 {
        if self.calls == 0 {
            0.0
        } else {
            self.tot_exec_time_ms / self.calls as f64
        }
    }

    /// Record a fresh (non-cached) execution (spec.md §4.4: a cache hit
    /// does *not* record a new timing statistic).
    pub fn record_call(&mut self, exec_time_ms: f64) {
        self.calls += 1;
        self.tot_exec_time_ms += exec_time_ms;
    }
}

#[derive(Debug, Default, serde::Serialize, serde::Deserialize)]
pub struct StatsTable {
    per_func: HashMap<String, FunctionStats>,
}

impl StatsTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_call(&mut self, func_id: &str, exec_time_ms: f64) {
        self.per_func
            .entry(func_id.to_string())
            .or_default()
            .record_call(exec_time_ms);
    }

    pub fn remove(&mut self, func_id: &str) {
        self.per_func.remove(func_id);
    }

    pub fn get(&self, func_id: &str) -> Option<FunctionStats> {
        self.per_func.get(func_id).copied()
    }

    pub fn all(&self) -> &HashMap<String, FunctionStats> {
        &self.per_func
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_hits_do_not_affect_call_count() {
        let mut table = StatsTable::new();
        table.record_call("f1", 10.0);
        table.record_call("f1", 20.0);
        let s = table.get("f1").unwrap();
        assert_eq!(s.calls, 2);
        assert_eq!(s.avg_exec_time_ms(), 15.0);
    }

    #[test]
    fn unknown_function_has_no_stats() {
        let table = StatsTable::new();
        assert!(table.get("missing").is_none());
    }
}
