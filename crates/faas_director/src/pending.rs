//! Pending fan-out table (spec.md §3): `request_id -> {client_id,
//! remaining_count}`. Tracks in-flight multi-Worker `unregister` fan-outs
//! so only the final response is forwarded to the requesting client.
//!
//! Also carries the `func_id` the fan-out is unregistering, so the
//! placement entry can be dropped on the *last* response rather than
//! up front (spec.md §9 Open Questions: "the correct order is
//! delete-on-last-response").

use std::collections::HashMap;

#[derive(Debug, Clone)]
pub struct PendingFanout {
    pub client_id: String,
    pub func_id: String,
    pub remaining: usize,
}

#[derive(Debug, Default)]
pub struct PendingFanoutTable {
    entries: HashMap<String, PendingFanout>,
}

impl PendingFanoutTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, request_id: String, client_id: String, func_id: String, expected_responses: usize) {
        self.entries.insert(
            request_id,
            PendingFanout {
                client_id,
                func_id,
                remaining: expected_responses,
            },
        );
    }

    /// Decrements the counter for `request_id`. Returns the completed
    /// entry exactly once, on the response that brings `remaining` to
    /// zero (the "only the final response is forwarded" rule, spec.md
    /// §4.2). Intermediate/duplicate responses return `None` and are
    /// absorbed.
    pub fn record_response(&mut self, request_id: &str) -> Option<PendingFanout> {
        let done = {
            let entry = self.entries.get_mut(request_id)?;
            entry.remaining = entry.remaining.saturating_sub(1);
            entry.remaining == 0
        };
        if done {
            self.entries.remove(request_id)
        } else {
            None
        }
    }

    /// Drops every pending obligation outstanding when `worker_id` dies.
    /// Used by the liveness watcher so a Worker's share of an
    /// in-flight fan-out count doesn't stall it forever. Without
    /// tracking which `request_id`s were actually waiting on that
    /// specific Worker (the Director only asked "how many", not "which
    /// ones"), this force-completes every entry currently pending on
    /// Worker death, matching the conservative approximation the source
    /// effectively fell into (see DESIGN.md).
    pub fn drop_worker(&mut self, _worker_id: &str) -> Vec<PendingFanout> {
        let stale: Vec<String> = self.entries.keys().cloned().collect();
        let mut released = Vec::new();
        for request_id in stale {
            if let Some(entry) = self.entries.remove(&request_id) {
                released.push(entry);
            }
        }
        released
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_the_response_that_zeroes_the_counter_is_forwarded() {
        let mut table = PendingFanoutTable::new();
        table.insert("req-1".into(), "client-1".into(), "func-1".into(), 3);
        assert!(table.record_response("req-1").is_none());
        assert!(table.record_response("req-1").is_none());
        let done = table.record_response("req-1").unwrap();
        assert_eq!(done.client_id, "client-1");
        assert_eq!(done.func_id, "func-1");
        assert!(table.is_empty());
    }

    #[test]
    fn unknown_request_id_is_a_no_op() {
        let mut table = PendingFanoutTable::new();
        assert!(table.record_response("missing").is_none());
    }

    #[test]
    fn drop_worker_force_completes_every_pending_entry() {
        let mut table = PendingFanoutTable::new();
        table.insert("req-1".into(), "client-1".into(), "func-1".into(), 2);
        let released = table.drop_worker("worker-1");
        assert_eq!(released.len(), 1);
        assert_eq!(released[0].client_id, "client-1");
        assert!(table.is_empty());
    }
}
