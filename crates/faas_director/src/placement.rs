//! Director-side placement map: `func_id -> set of Worker ids` (spec.md
//! §3). Insertion order per `func_id` is preserved so selection sees a
//! deterministic candidate ordering.

use std::collections::HashMap;

#[derive(Debug, Default)]
pub struct PlacementMap {
    entries: HashMap<String, Vec<String>>,
}

impl PlacementMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `worker_id` to `func_id`'s candidate set if not already
    /// present.
    pub fn add(&mut self, func_id: &str, worker_id: &str) {
        let set = self.entries.entry(func_id.to_string()).or_default();
        if !set.iter().any(|id| id == worker_id) {
            set.push(worker_id.to_string());
        }
    }

    pub fn candidates(&self, func_id: &str) -> &[String] {
        self.entries.get(func_id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn contains(&self, func_id: &str) -> bool {
        self.entries.get(func_id).is_some_and(|set| !set.is_empty())
    }

    /// Removes `func_id` from the map entirely (spec.md §4.2 `unregister`
    /// routing, applied by the router at the point resolved in
    /// DESIGN.md's "Open Questions" entry on fan-out ordering).
    pub fn remove_function(&mut self, func_id: &str) {
        self.entries.remove(func_id);
    }

    /// Drops `worker_id` from every `func_id` entry it appears in, used
    /// by the liveness watcher on Worker death.
    pub fn remove_worker(&mut self, worker_id: &str) {
        self.entries.retain(|_, set| {
            set.retain(|id| id != worker_id);
            true
        });
    }

    pub fn func_ids(&self) -> impl Iterator<Item = &String> {
        self.entries.keys()
    }

    /// Ensures every `func_id` already placed is also placed on every
    /// live worker (spec.md §4.3 step 6, after a successful
    /// synchronization pass).
    pub fn mirror_onto_all(&mut self, live_worker_ids: &[String]) {
        for set in self.entries.values_mut() {
            for worker_id in live_worker_ids {
                if !set.iter().any(|id| id == worker_id) {
                    set.push(worker_id.clone());
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_is_idempotent() {
        let mut map = PlacementMap::new();
        map.add("f1", "worker-1");
        map.add("f1", "worker-1");
        assert_eq!(map.candidates("f1"), &["worker-1".to_string()]);
    }

    #[test]
    fn remove_worker_clears_it_from_every_entry() {
        let mut map = PlacementMap::new();
        map.add("f1", "worker-1");
        map.add("f2", "worker-1");
        map.add("f2", "worker-2");
        map.remove_worker("worker-1");
        assert!(map.candidates("f1").is_empty());
        assert_eq!(map.candidates("f2"), &["worker-2".to_string()]);
    }

    #[test]
    fn remove_function_drops_the_whole_entry() {
        let mut map = PlacementMap::new();
        map.add("f1", "worker-1");
        map.remove_function("f1");
        assert!(!map.contains("f1"));
    }

    #[test]
    fn mirror_onto_all_adds_missing_workers() {
        let mut map = PlacementMap::new();
        map.add("f1", "worker-1");
        map.mirror_onto_all(&["worker-1".to_string(), "worker-2".to_string()]);
        assert_eq!(map.candidates("f1"), &["worker-1".to_string(), "worker-2".to_string()]);
    }
}
