//! Liveness watcher (spec.md §4.1): wakes every
//! `heartbeat_check_interval_ms`, evicts any Worker whose last heartbeat
//! is older than `2 × expected_heartbeat_interval_ms`, protected by a
//! join-grace window of the same width.

use crate::registry::now_secs;
use crate::state::DirectorState;
use crate::transport::OutboundSender;
use faas_protocol::defaults::HEARTBEAT_MISS_TOLERANCE;
use faas_protocol::types::ClientResponse;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::info;

pub async fn run(
    check_interval_ms: u64,
    expected_heartbeat_interval_ms: u64,
    state: Arc<Mutex<DirectorState>>,
    outbound: OutboundSender,
    mut stop: tokio::sync::watch::Receiver<bool>,
) {
    let max_age_secs =
        (HEARTBEAT_MISS_TOLERANCE as f64) * (expected_heartbeat_interval_ms as f64) / 1000.0;
    let grace_period_secs = max_age_secs;
    let mut ticker = tokio::time::interval(Duration::from_millis(check_interval_ms));

    loop {
        tokio::select! {
            biased;
            _ = stop.changed() => {
                if *stop.borrow() {
                    break;
                }
            }
            _ = ticker.tick() => {
                let now = now_secs();
                let mut state = state.lock().await;
                let dead = state.registry.find_dead(now, max_age_secs, grace_period_secs);
                for worker_id in dead {
                    info!(%worker_id, "evicting worker after missed heartbeats");
                    state.registry.remove(&worker_id);
                    state.placement.remove_worker(&worker_id);
                    state.dirty = true;

                    // Force-complete any unregister fan-out this worker
                    // could never finish acking, finishing the
                    // placement removal its last response would have
                    // done (spec.md §9 Open Questions: delete-on-last-
                    // response) and releasing the client it left
                    // waiting.
                    for released in state.pending_fanout.drop_worker(&worker_id) {
                        state.placement.remove_function(&released.func_id);
                        state.currently_serving_clients =
                            state.currently_serving_clients.saturating_sub(1);
                        let body = serde_json::to_vec(&ClientResponse::ok_no_result("unregister"))
                            .unwrap_or_default();
                        let _ = outbound.send((released.client_id, body));
                    }
                }
            }
        }
    }
}
