//! Periodic heartbeat task (spec.md §4.4, §5: "a separate periodic task
//! emits heartbeats to the Director at the configured interval").

use crate::transport::OutboundSender;
use faas_protocol::types::WorkerControl;
use std::time::Duration;
use tracing::warn;

pub async fn run(
    interval_ms: u64,
    outbound: OutboundSender,
    mut stop: tokio::sync::watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(Duration::from_millis(interval_ms));
    loop {
        tokio::select! {
            biased;
            _ = stop.changed() => {
                if *stop.borrow() {
                    break;
                }
            }
            _ = ticker.tick() => {
                let body = match serde_json::to_vec(&WorkerControl::Heartbeat) {
                    Ok(body) => body,
                    Err(e) => {
                        warn!("failed to encode heartbeat: {e}");
                        continue;
                    }
                };
                if outbound.send(body).is_err() {
                    break;
                }
            }
        }
    }
}
