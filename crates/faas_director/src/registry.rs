//! Director-side worker registry (spec.md §3 "Worker record", §4.1).

use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

/// A live Worker as tracked by the Director. `registered_at` and
/// `last_heartbeat` are seconds since the epoch (spec.md §3).
#[derive(Debug, Clone)]
pub struct WorkerRecord {
    pub worker_id: String,
    pub registered_at: f64,
    pub last_heartbeat: f64,
}

pub fn now_secs() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs_f64()
}

/// The live Worker table. Ids are kept in an ordered `Vec` alongside the
/// `HashMap` so selection (`selection::select_worker`) sees a
/// deterministic insertion order.
#[derive(Debug, Default)]
pub struct WorkerRegistry {
    workers: HashMap<String, WorkerRecord>,
    order: Vec<String>,
}

impl WorkerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new Worker, or refreshes its heartbeat if already
    /// known (a Worker that reconnects after a transient disconnect
    /// re-sends `worker_registration`).
    pub fn register(&mut self, worker_id: &str) {
        let now = now_secs();
        if let Some(existing) = self.workers.get_mut(worker_id) {
            existing.last_heartbeat = now;
            return;
        }
        self.workers.insert(
            worker_id.to_string(),
            WorkerRecord {
                worker_id: worker_id.to_string(),
                registered_at: now,
                last_heartbeat: now,
            },
        );
        self.order.push(worker_id.to_string());
    }

    pub fn record_heartbeat(&mut self, worker_id: &str) {
        if let Some(record) = self.workers.get_mut(worker_id) {
            record.last_heartbeat = now_secs();
        }
    }

    pub fn remove(&mut self, worker_id: &str) -> Option<WorkerRecord> {
        self.order.retain(|id| id != worker_id);
        self.workers.remove(worker_id)
    }

    pub fn is_live(&self, worker_id: &str) -> bool {
        self.workers.contains_key(worker_id)
    }

    pub fn get(&self, worker_id: &str) -> Option<&WorkerRecord> {
        self.workers.get(worker_id)
    }

    pub fn len(&self) -> usize {
        self.workers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }

    /// Ids in registration order, for deterministic selection.
    pub fn ids_in_order(&self) -> &[String] {
        &self.order
    }

    /// Finds every Worker whose `last_heartbeat` is older than
    /// `max_age_secs`, excluding Workers still inside their
    /// `grace_period_secs` join-grace window (spec.md §4.1).
    pub fn find_dead(&self, now: f64, max_age_secs: f64, grace_period_secs: f64) -> Vec<String> {
        self.workers
            .values()
            .filter(|record| {
                let age_since_registration = now - record.registered_at;
                if age_since_registration < grace_period_secs {
                    return false;
                }
                now - record.last_heartbeat > max_age_secs
            })
            .map(|record| record.worker_id.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_then_remove_round_trips() {
        let mut registry = WorkerRegistry::new();
        registry.register("worker-1");
        assert!(registry.is_live("worker-1"));
        assert_eq!(registry.ids_in_order(), &["worker-1".to_string()]);
        registry.remove("worker-1");
        assert!(!registry.is_live("worker-1"));
        assert!(registry.ids_in_order().is_empty());
    }

    #[test]
    fn re_registering_refreshes_heartbeat_without_duplicate_order_entry() {
        let mut registry = WorkerRegistry::new();
        registry.register("worker-1");
        registry.register("worker-1");
        assert_eq!(registry.ids_in_order().len(), 1);
    }

    #[test]
    fn fresh_workers_are_protected_by_the_grace_window() {
        let mut registry = WorkerRegistry::new();
        registry.register("worker-1");
        let now = registry.get("worker-1").unwrap().registered_at + 0.5;
        let dead = registry.find_dead(now, 0.1, 5.0);
        assert!(dead.is_empty());
    }

    #[test]
    fn stale_heartbeat_past_grace_window_is_dead() {
        let mut registry = WorkerRegistry::new();
        registry.register("worker-1");
        let registered_at = registry.get("worker-1").unwrap().registered_at;
        let now = registered_at + 10.0;
        let dead = registry.find_dead(now, 4.0, 5.0);
        assert_eq!(dead, vec!["worker-1".to_string()]);
    }
}
