//! The Director process (spec.md §4, §5). Owns the ROUTER transport
//! task, the liveness watcher, the synchronization loop, and dispatches
//! inbound envelopes to the `Router`, all contending on `DirectorState`
//! behind one `tokio::sync::Mutex` (mirrors `faas_worker::Worker`'s
//! shape on the other side of the wire).

use crate::config::DirectorConfig;
use crate::router::Router;
use crate::state::DirectorState;
use crate::{liveness, sync, transport};
use faas_protocol::types::SyncStateResponse;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tracing::info;

pub struct Director {
    config: DirectorConfig,
    state: Arc<Mutex<DirectorState>>,
}

impl Director {
    pub fn new(config: DirectorConfig) -> Self {
        Self {
            config,
            state: Arc::new(Mutex::new(DirectorState::new())),
        }
    }

    /// Binds the ROUTER socket and runs every task until `stop` fires.
    pub async fn run(&self, stop: tokio::sync::watch::Receiver<bool>) -> anyhow::Result<()> {
        let bind_addr = self.config.bind_addr();
        let socket = transport::bind(&bind_addr).await?;
        info!(%bind_addr, "director listening");

        let (outbound_tx, outbound_rx) = transport::outbound_channel();
        let (sync_tx, sync_rx) = mpsc::unbounded_channel::<(String, SyncStateResponse)>();

        let router = Arc::new(Router::new(
            Arc::clone(&self.state),
            outbound_tx.clone(),
            sync_tx,
            self.config.workers.worker_selection_strategy,
        ));

        let liveness_handle = tokio::spawn(liveness::run(
            self.config.workers.heartbeat_check_interval_ms,
            self.config.workers.expected_heartbeat_interval_ms,
            Arc::clone(&self.state),
            outbound_tx.clone(),
            stop.clone(),
        ));

        let sync_handle = tokio::spawn(sync::run(
            self.config.workers.synchronization_interval_ms,
            self.config.workers.worker_selection_strategy,
            Arc::clone(&self.state),
            outbound_tx.clone(),
            sync_rx,
            stop.clone(),
        ));

        let on_message = move |sender_id: String, body: Vec<u8>| {
            let router = Arc::clone(&router);
            tokio::spawn(async move {
                router.handle_envelope(sender_id, body).await;
            });
        };

        transport::run(socket, outbound_rx, stop.clone(), on_message).await;

        liveness_handle.abort();
        sync_handle.abort();

        Ok(())
    }
}
