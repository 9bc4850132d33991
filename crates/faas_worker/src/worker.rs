//! The Worker process (spec.md §4.4, §5). Owns the transport task, the
//! heartbeat task, and dispatches inbound request bodies onto a pool of
//! handler tasks, all contending on `WorkerState` behind one
//! `tokio::sync::Mutex` (see `state.rs`).

use crate::audit::AuditLog;
use crate::config::WorkerConfig;
use crate::error::WorkerError;
use crate::persistence;
use crate::state::WorkerState;
use crate::{handlers, heartbeat, transport};
use faas_protocol::defaults::WORKER_IDENTITY_PREFIX;
use faas_protocol::types::{Operation, SyncStateResponse, WorkerControl};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

pub struct Worker {
    worker_id: String,
    config: WorkerConfig,
    state: Arc<Mutex<WorkerState>>,
    audit: Arc<AuditLog>,
}

impl Worker {
    pub fn new(config: WorkerConfig) -> Self {
        let worker_id = format!("{WORKER_IDENTITY_PREFIX}{}", uuid::Uuid::new_v4());
        let state = WorkerState::new(worker_id.clone(), config.behavior.caching.max_size);
        let audit_path = faas_logging::faas_home().join("audit.ndjson");
        Self {
            worker_id,
            config,
            state: Arc::new(Mutex::new(state)),
            audit: Arc::new(AuditLog::new(audit_path)),
        }
    }

    pub fn id(&self) -> &str {
        &self.worker_id
    }

    /// Connects to the Director, restores persisted state if configured,
    /// sends `worker_registration`, then runs until `stop` fires.
    pub async fn run(&self, stop: tokio::sync::watch::Receiver<bool>) -> anyhow::Result<()> {
        if self.config.behavior.shutdown_persistence {
            match persistence::restore_state(&self.config.behavior.dump_file) {
                Ok(dump) => {
                    let mut state = self.state.lock().await;
                    state.catalog = dump.catalog;
                    state.stats = dump.stats;
                    info!("restored persisted catalog and stats from previous shutdown");
                }
                Err(e) => {
                    warn!("no usable shutdown-state dump to restore: {e}");
                }
            }
        }

        let director_addr = self.config.director_addr();
        let socket = transport::connect(&director_addr).await?;
        info!(worker_id = %self.worker_id, director = %director_addr, "connected to director");

        let (outbound_tx, outbound_rx) = transport::outbound_channel();

        let registration = serde_json::to_vec(&WorkerControl::WorkerRegistration)?;
        outbound_tx
            .send(registration)
            .map_err(|_| anyhow::anyhow!("outbound channel closed before registration"))?;

        let heartbeat_handle = tokio::spawn(heartbeat::run(
            self.config.network.heartbeat_interval_ms,
            outbound_tx.clone(),
            stop.clone(),
        ));

        let state = Arc::clone(&self.state);
        let audit = Arc::clone(&self.audit);
        let outbound_for_handlers = outbound_tx.clone();

        let on_message = move |body: Vec<u8>| {
            let state = Arc::clone(&state);
            let audit = Arc::clone(&audit);
            let outbound = outbound_for_handlers.clone();
            tokio::spawn(async move {
                if let Some(response) = dispatch(&state, &audit, &body).await {
                    if outbound.send(response).is_err() {
                        warn!("outbound channel closed while replying to director");
                    }
                }
            });
        };

        transport::run(
            self.worker_id.clone(),
            socket,
            outbound_rx,
            stop.clone(),
            on_message,
        )
        .await;

        heartbeat_handle.abort();

        if self.config.behavior.shutdown_persistence {
            let state = self.state.lock().await;
            if let Err(e) =
                persistence::dump_state(&self.config.behavior.dump_file, &state.catalog, &state.stats)
            {
                error!("failed to persist shutdown state: {e}");
            } else {
                info!("persisted catalog and stats to {:?}", self.config.behavior.dump_file);
            }
        }

        Ok(())
    }
}

/// Decodes one inbound Director→Worker body, runs the matching handler,
/// and encodes the reply envelope the transport task should send back.
/// Returns `None` only for control messages the Director never expects a
/// direct reply to (there are none left by this point: every path below
/// produces a response, including synchronization replies).
async fn dispatch(
    state: &Arc<Mutex<WorkerState>>,
    audit: &Arc<AuditLog>,
    body: &[u8],
) -> Option<Vec<u8>> {
    let op: Operation = match serde_json::from_slice(body) {
        Ok(op) => op,
        Err(e) => {
            warn!("dropping malformed request body: {e}");
            return encode_forward_error("unknown", "unknown", WorkerError::DeserializationFailed(e.to_string()));
        }
    };

    match op {
        Operation::Register {
            requester,
            serialized_func_base64,
            func_id,
        } => {
            let func_id = match func_id {
                Some(id) => id,
                None => {
                    return encode_forward_error(
                        &requester,
                        "register",
                        WorkerError::Internal("director did not inject func_id".into()),
                    )
                }
            };
            let mut state = state.lock().await;
            match handlers::handle_register(&mut state, audit, &requester, &serialized_func_base64, &func_id) {
                Ok(resp) => encode_forward_ok(&requester, "register", resp),
                Err(e) => encode_forward_error(&requester, "register", e),
            }
        }
        Operation::Unregister {
            requester,
            func_id,
            request_id,
        } => {
            let mut state = state.lock().await;
            match handlers::handle_unregister(&mut state, audit, &requester, &func_id) {
                Ok(resp) => encode_forward_ok_with_id(&requester, "unregister", resp, request_id),
                Err(e) => encode_forward_error_with_id(&requester, "unregister", e, request_id),
            }
        }
        Operation::Exec {
            requester,
            func_id,
            positional_args,
            default_args,
            save_in_cache,
        } => {
            let mut state = state.lock().await;
            match handlers::handle_exec(&mut state, audit, &func_id, &positional_args, &default_args, save_in_cache) {
                Ok(resp) => encode_forward_ok(&requester, "exec", resp),
                Err(e) => encode_forward_error(&requester, "exec", e),
            }
        }
        Operation::List { requester } => {
            let state = state.lock().await;
            let resp = handlers::handle_list(&state);
            encode_forward_ok(&requester, "list", resp)
        }
        Operation::GetStats { requester, func_name } => {
            let state = state.lock().await;
            match handlers::handle_get_stats(&state, func_name.as_deref()) {
                Ok(resp) => encode_forward_ok(&requester, "get_stats", resp),
                Err(e) => encode_forward_error(&requester, "get_stats", e),
            }
        }
        Operation::GetWorkerInfo { requester, .. } => {
            let state = state.lock().await;
            let resp = handlers::handle_get_worker_info(&state);
            encode_forward_ok(&requester, "get_worker_info", resp)
        }
        Operation::GetCacheDump { requester, .. } => {
            let state = state.lock().await;
            let resp = handlers::handle_get_cache_dump(&state);
            encode_forward_ok(&requester, "get_cache_dump", resp)
        }
        Operation::ChainExec { requester, json_workflow } => {
            let mut state = state.lock().await;
            match handlers::handle_chain_exec(&mut state, &json_workflow) {
                Ok(resp) => encode_forward_ok(&requester, "chain_exec", resp),
                Err(e) => encode_forward_error(&requester, "chain_exec", e),
            }
        }
        Operation::GetWorkerIds { requester } => {
            // Director-local per spec.md §4.2; a Worker should never
            // receive this, but reply harmlessly rather than drop it.
            encode_forward_error(
                &requester,
                "get_worker_ids",
                WorkerError::Internal("get_worker_ids is director-local".into()),
            )
        }
        Operation::Ping { requester } => {
            let resp = handlers::handle_ping();
            encode_forward_ok(&requester, "PING", resp)
        }
        Operation::SyncStateRequest => {
            let state = state.lock().await;
            let resp = handlers::handle_sync_state_request(&state);
            encode_sync_response(resp)
        }
        Operation::SyncFunctionCodeRequest { func_id } => {
            let state = state.lock().await;
            match handlers::handle_sync_function_code_request(&state, &func_id) {
                Ok(resp) => encode_sync_response(resp),
                Err(e) => {
                    warn!("sync_function_code_request for unknown func_id {func_id}: {e}");
                    None
                }
            }
        }
        Operation::SyncMissingFunctionCodeCount { .. } => None,
        Operation::Ack => None,
        Operation::SyncMissingFunctionCode {
            func_id,
            code_blob,
            owning_client,
        } => {
            let mut state = state.lock().await;
            handlers::handle_sync_missing_function_code(&mut state, &func_id, code_blob, owning_client);
            None
        }
    }
}

fn encode_sync_response(resp: SyncStateResponse) -> Option<Vec<u8>> {
    let control = WorkerControl::SyncStateResponse(resp);
    serde_json::to_vec(&control)
        .map_err(|e| warn!("failed to encode sync state response: {e}"))
        .ok()
}

fn encode_forward_ok(
    destination_client: &str,
    original_client_operation: &str,
    resp: faas_protocol::types::ClientResponse,
) -> Option<Vec<u8>> {
    encode_forward_ok_with_id(destination_client, original_client_operation, resp, None)
}

fn encode_forward_error(
    destination_client: &str,
    original_client_operation: &str,
    err: WorkerError,
) -> Option<Vec<u8>> {
    encode_forward_error_with_id(destination_client, original_client_operation, err, None)
}

/// `message_id` doubles as the Director-minted fan-out `request_id` on
/// `unregister` replies (spec.md §6 "message_id (for fan-out
/// correlation)"); every other operation gets a fresh one since there is
/// nothing to correlate against.
fn encode_forward_ok_with_id(
    destination_client: &str,
    original_client_operation: &str,
    resp: faas_protocol::types::ClientResponse,
    message_id: Option<String>,
) -> Option<Vec<u8>> {
    let control = WorkerControl::ForwardToClient {
        destination_client: destination_client.to_string(),
        original_client_operation: original_client_operation.to_string(),
        status: "ok".to_string(),
        action: resp.action,
        result_type: resp.result_type.map(|rt| match rt {
            faas_protocol::types::ResultType::Json => "json".to_string(),
            faas_protocol::types::ResultType::PickleBase64 => "pickle_base64".to_string(),
        }),
        result: resp.result,
        message: resp.message,
        message_id: message_id.unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
    };
    serde_json::to_vec(&control)
        .map_err(|e| warn!("failed to encode forward_to_client: {e}"))
        .ok()
}

fn encode_forward_error_with_id(
    destination_client: &str,
    original_client_operation: &str,
    err: WorkerError,
    message_id: Option<String>,
) -> Option<Vec<u8>> {
    let control = WorkerControl::ForwardToClient {
        destination_client: destination_client.to_string(),
        original_client_operation: original_client_operation.to_string(),
        status: "err".to_string(),
        action: Some(err.kind().as_str().to_string()),
        result_type: None,
        result: None,
        message: Some(err.to_string()),
        message_id: message_id.unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
    };
    serde_json::to_vec(&control)
        .map_err(|e| warn!("failed to encode forward_to_client error: {e}"))
        .ok()
}
