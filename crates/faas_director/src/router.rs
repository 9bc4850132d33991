//! Request routing (spec.md §4.2). One `Router` is shared by every
//! handler task spawned off `transport::run`'s `on_message` callback; it
//! never touches the socket directly, only `outbound`.

use crate::config::SelectionStrategyKind;
use crate::error::DirectorError;
use crate::selection::select_worker;
use crate::state::DirectorState;
use crate::transport::OutboundSender;
use base64::Engine;
use faas_protocol::compute_func_id;
use faas_protocol::envelope::{Envelope, SenderKind};
use faas_protocol::types::{
    ClientResponse, FunctionDescriptor, Operation, ResponseStatus, ResultType, SyncStateResponse,
    WorkerControl,
};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tracing::warn;
use uuid::Uuid;

pub struct Router {
    state: Arc<Mutex<DirectorState>>,
    outbound: OutboundSender,
    sync_tx: mpsc::UnboundedSender<(String, SyncStateResponse)>,
    selection_strategy: SelectionStrategyKind,
}

impl Router {
    pub fn new(
        state: Arc<Mutex<DirectorState>>,
        outbound: OutboundSender,
        sync_tx: mpsc::UnboundedSender<(String, SyncStateResponse)>,
        selection_strategy: SelectionStrategyKind,
    ) -> Self {
        Self {
            state,
            outbound,
            sync_tx,
            selection_strategy,
        }
    }

    /// Entry point for every inbound envelope (spec.md §4.2: "Senders
    /// with a `worker-…` identity are handled as Worker→Director control
    /// or response messages; `client-…` identities carry operation
    /// requests").
    pub async fn handle_envelope(&self, sender_id: String, body: Vec<u8>) {
        let envelope = Envelope::new(sender_id.clone(), body);
        match envelope.sender_kind() {
            Ok(SenderKind::Worker) => self.handle_worker_message(&sender_id, &envelope.body).await,
            Ok(SenderKind::Client) => self.handle_client_operation(&sender_id, &envelope.body).await,
            Err(e) => warn!("dropping envelope from unrecognized sender: {e}"),
        }
    }

    fn send_to(&self, destination: &str, op: &Operation) {
        match serde_json::to_vec(op) {
            Ok(body) => {
                if self.outbound.send((destination.to_string(), body)).is_err() {
                    warn!("outbound channel closed while routing to {destination}");
                }
            }
            Err(e) => warn!("failed to encode outbound op for {destination}: {e}"),
        }
    }

    fn reply_to_client(&self, client_id: &str, response: &ClientResponse) {
        match serde_json::to_vec(response) {
            Ok(body) => {
                if self.outbound.send((client_id.to_string(), body)).is_err() {
                    warn!("outbound channel closed while replying to {client_id}");
                }
            }
            Err(e) => warn!("failed to encode client response for {client_id}: {e}"),
        }
    }

    fn reply_error(&self, client_id: &str, err: DirectorError) {
        self.reply_to_client(client_id, &ClientResponse::err(err.kind().as_str(), err.to_string()));
    }

    // ------------------------------------------------------------------
    // Worker -> Director
    // ------------------------------------------------------------------

    async fn handle_worker_message(&self, worker_id: &str, body: &[u8]) {
        let control: WorkerControl = match serde_json::from_slice(body) {
            Ok(c) => c,
            Err(e) => {
                warn!(%worker_id, "dropping malformed worker control message: {e}");
                return;
            }
        };

        match control {
            WorkerControl::WorkerRegistration => {
                {
                    let mut state = self.state.lock().await;
                    state.registry.register(worker_id);
                }
                self.send_to(worker_id, &Operation::Ack);
            }
            WorkerControl::Heartbeat => {
                let mut state = self.state.lock().await;
                state.registry.record_heartbeat(worker_id);
            }
            WorkerControl::ForwardToClient {
                destination_client,
                original_client_operation,
                status,
                action,
                result_type,
                result,
                message,
                message_id,
            } => {
                self.handle_forward_to_client(
                    &destination_client,
                    &original_client_operation,
                    &status,
                    action,
                    result_type,
                    result,
                    message,
                    &message_id,
                )
                .await;
            }
            WorkerControl::SyncStateResponse(resp) => {
                let _ = self.sync_tx.send((worker_id.to_string(), resp));
            }
        }
    }

    /// Forwards a Worker's response on to the client it belongs to
    /// (spec.md §4.2). `unregister` fans out to every Worker holding the
    /// function; only the response that zeroes the pending-fanout
    /// counter is actually forwarded, and the placement entry is removed
    /// at that point rather than up front (spec.md §9 Open Questions:
    /// delete-on-last-response).
    #[allow(clippy::too_many_arguments)]
    async fn handle_forward_to_client(
        &self,
        destination_client: &str,
        original_client_operation: &str,
        status: &str,
        action: Option<String>,
        result_type: Option<String>,
        result: Option<faas_protocol::ArgValue>,
        message: Option<String>,
        message_id: &str,
    ) {
        let response = ClientResponse {
            status: if status == "ok" {
                ResponseStatus::Ok
            } else {
                ResponseStatus::Err
            },
            action,
            result_type: result_type.and_then(|rt| match rt.as_str() {
                "json" => Some(ResultType::Json),
                "pickle_base64" => Some(ResultType::PickleBase64),
                _ => None,
            }),
            result,
            message,
        };

        if original_client_operation == "unregister" {
            let completed = {
                let mut state = self.state.lock().await;
                let completed = state.pending_fanout.record_response(message_id);
                if let Some(ref entry) = completed {
                    state.placement.remove_function(&entry.func_id);
                    state.currently_serving_clients = state.currently_serving_clients.saturating_sub(1);
                }
                completed
            };
            if let Some(entry) = completed {
                self.reply_to_client(&entry.client_id, &response);
            }
            // Intermediate/duplicate fan-out responses are absorbed.
            return;
        }

        {
            let mut state = self.state.lock().await;
            state.currently_serving_clients = state.currently_serving_clients.saturating_sub(1);
        }
        self.reply_to_client(destination_client, &response);
    }

    // ------------------------------------------------------------------
    // Client -> Director
    // ------------------------------------------------------------------

    async fn handle_client_operation(&self, client_id: &str, body: &[u8]) {
        let op: Operation = match serde_json::from_slice(body) {
            Ok(op) => op,
            Err(e) => {
                self.reply_error(client_id, DirectorError::DeserializationFailed(e.to_string()));
                return;
            }
        };

        let op_name = op.name();
        match op {
            Operation::Register {
                serialized_func_base64,
                ..
            } => self.route_register(client_id, serialized_func_base64).await,
            Operation::Unregister { func_id, .. } => self.route_unregister(client_id, func_id).await,
            Operation::Exec {
                func_id,
                positional_args,
                default_args,
                save_in_cache,
                ..
            } => {
                self.route_exec(client_id, func_id, positional_args, default_args, save_in_cache)
                    .await
            }
            Operation::GetWorkerInfo { worker_id, .. } => {
                self.route_to_specific_worker(client_id, &worker_id, |requester| {
                    Operation::GetWorkerInfo {
                        requester,
                        worker_id: worker_id.clone(),
                    }
                })
                .await
            }
            Operation::GetCacheDump { worker_id, .. } => {
                self.route_to_specific_worker(client_id, &worker_id, |requester| {
                    Operation::GetCacheDump {
                        requester,
                        worker_id: worker_id.clone(),
                    }
                })
                .await
            }
            Operation::GetWorkerIds { .. } => self.route_get_worker_ids(client_id).await,
            Operation::List { .. } => {
                self.route_to_any_worker(client_id, |requester| Operation::List { requester })
                    .await
            }
            Operation::GetStats { func_name, .. } => {
                self.route_to_any_worker(client_id, |requester| Operation::GetStats {
                    requester,
                    func_name: func_name.clone(),
                })
                .await
            }
            Operation::Ping { .. } => {
                self.route_to_any_worker(client_id, |requester| Operation::Ping { requester })
                    .await
            }
            Operation::ChainExec { json_workflow, .. } => {
                self.route_to_any_worker(client_id, |requester| Operation::ChainExec {
                    requester,
                    json_workflow: json_workflow.clone(),
                })
                .await
            }
            // Director-only control shapes a client should never send.
            Operation::SyncStateRequest
            | Operation::SyncFunctionCodeRequest { .. }
            | Operation::SyncMissingFunctionCodeCount { .. }
            | Operation::SyncMissingFunctionCode { .. }
            | Operation::Ack => {
                self.reply_error(
                    client_id,
                    DirectorError::Internal(format!("{op_name} is not a client operation")),
                );
            }
        }
    }

    async fn route_register(&self, client_id: &str, serialized_func_base64: String) {
        let raw = match base64::engine::general_purpose::STANDARD.decode(&serialized_func_base64) {
            Ok(raw) => raw,
            Err(e) => {
                self.reply_error(
                    client_id,
                    DirectorError::DeserializationFailed(format!("invalid base64 code blob: {e}")),
                );
                return;
            }
        };
        let descriptor: FunctionDescriptor = match serde_json::from_slice(&raw) {
            Ok(d) => d,
            Err(e) => {
                self.reply_error(
                    client_id,
                    DirectorError::DeserializationFailed(format!("invalid function descriptor: {e}")),
                );
                return;
            }
        };
        let func_id = compute_func_id(&descriptor.name, &raw);

        let worker_id = {
            let mut state = self.state.lock().await;
            let Some(worker_id) = state.registry.ids_in_order().first().cloned() else {
                drop(state);
                self.reply_error(client_id, DirectorError::NoWorkers);
                return;
            };
            state.placement.add(&func_id, &worker_id);
            state.dirty = true;
            state.currently_serving_clients += 1;
            worker_id
        };

        self.send_to(
            &worker_id,
            &Operation::Register {
                requester: client_id.to_string(),
                serialized_func_base64,
                func_id: Some(func_id),
            },
        );
    }

    async fn route_unregister(&self, client_id: &str, func_id: String) {
        let candidates = {
            let state = self.state.lock().await;
            state.placement.candidates(&func_id).to_vec()
        };
        if candidates.is_empty() {
            self.reply_error(client_id, DirectorError::NoWorkers);
            return;
        }

        let request_id = Uuid::new_v4().to_string();
        {
            let mut state = self.state.lock().await;
            state
                .pending_fanout
                .insert(request_id.clone(), client_id.to_string(), func_id.clone(), candidates.len());
            state.currently_serving_clients += 1;
        }

        for worker_id in candidates {
            self.send_to(
                &worker_id,
                &Operation::Unregister {
                    requester: client_id.to_string(),
                    func_id: func_id.clone(),
                    request_id: Some(request_id.clone()),
                },
            );
        }
    }

    async fn route_exec(
        &self,
        client_id: &str,
        func_id: String,
        positional_args: Vec<faas_protocol::ArgValue>,
        default_args: std::collections::BTreeMap<String, faas_protocol::ArgValue>,
        save_in_cache: bool,
    ) {
        let worker_id = {
            let mut state = self.state.lock().await;
            let candidates = state.placement.candidates(&func_id).to_vec();
            let picked = if candidates.len() == 1 {
                Some(candidates[0].clone())
            } else {
                select_worker(self.selection_strategy, &candidates, &mut state.round_robin_index)
                    .map(str::to_string)
            };
            if picked.is_some() {
                state.currently_serving_clients += 1;
            }
            picked
        };

        match worker_id {
            Some(worker_id) => self.send_to(
                &worker_id,
                &Operation::Exec {
                    requester: client_id.to_string(),
                    func_id,
                    positional_args,
                    default_args,
                    save_in_cache,
                },
            ),
            None => self.reply_error(client_id, DirectorError::NoWorkers),
        }
    }

    async fn route_to_specific_worker(
        &self,
        client_id: &str,
        worker_id: &str,
        build: impl FnOnce(String) -> Operation,
    ) {
        let live = {
            let mut state = self.state.lock().await;
            let live = state.registry.is_live(worker_id);
            if live {
                state.currently_serving_clients += 1;
            }
            live
        };
        if !live {
            self.reply_error(client_id, DirectorError::NoWorkers);
            return;
        }
        self.send_to(worker_id, &build(client_id.to_string()));
    }

    async fn route_to_any_worker(&self, client_id: &str, build: impl FnOnce(String) -> Operation) {
        let worker_id = {
            let mut state = self.state.lock().await;
            let candidates = state.registry.ids_in_order().to_vec();
            let picked = select_worker(self.selection_strategy, &candidates, &mut state.round_robin_index)
                .map(str::to_string);
            if picked.is_some() {
                state.currently_serving_clients += 1;
            }
            picked
        };
        match worker_id {
            Some(worker_id) => self.send_to(&worker_id, &build(client_id.to_string())),
            None => self.reply_error(client_id, DirectorError::NoWorkers),
        }
    }

    async fn route_get_worker_ids(&self, client_id: &str) {
        let ids = {
            let state = self.state.lock().await;
            state.registry.ids_in_order().to_vec()
        };
        let result = faas_protocol::ArgValue::Array(
            ids.into_iter().map(faas_protocol::ArgValue::Str).collect(),
        );
        self.reply_to_client(
            client_id,
            &ClientResponse::ok("get_worker_ids", ResultType::Json, result),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::DirectorState;
    use std::collections::BTreeMap;

    fn router() -> (Router, mpsc::UnboundedReceiver<(String, Vec<u8>)>) {
        let state = Arc::new(Mutex::new(DirectorState::new()));
        let (outbound, outbound_rx) = crate::transport::outbound_channel();
        let (sync_tx, _sync_rx) = mpsc::unbounded_channel();
        (
            Router::new(state, outbound, sync_tx, SelectionStrategyKind::RoundRobin),
            outbound_rx,
        )
    }

    #[tokio::test]
    async fn get_worker_ids_is_answered_locally() {
        let (router, mut outbound_rx) = router();
        {
            let mut state = router.state.lock().await;
            state.registry.register("worker-1");
        }
        let body = serde_json::to_vec(&Operation::GetWorkerIds {
            requester: "client-1".into(),
        })
        .unwrap();
        router.handle_client_operation("client-1", &body).await;

        let (dest, reply_body) = outbound_rx.recv().await.unwrap();
        assert_eq!(dest, "client-1");
        let reply: ClientResponse = serde_json::from_slice(&reply_body).unwrap();
        assert_eq!(reply.status, ResponseStatus::Ok);
    }

    #[tokio::test]
    async fn exec_with_no_placement_replies_no_workers() {
        let (router, mut outbound_rx) = router();
        let body = serde_json::to_vec(&Operation::Exec {
            requester: "client-1".into(),
            func_id: "missing".into(),
            positional_args: vec![],
            default_args: BTreeMap::new(),
            save_in_cache: false,
        })
        .unwrap();
        router.handle_client_operation("client-1", &body).await;

        let (_, reply_body) = outbound_rx.recv().await.unwrap();
        let reply: ClientResponse = serde_json::from_slice(&reply_body).unwrap();
        assert_eq!(reply.status, ResponseStatus::Err);
        assert_eq!(reply.action.as_deref(), Some("no_workers"));
    }

    #[tokio::test]
    async fn register_picks_first_worker_and_marks_dirty() {
        let (router, mut outbound_rx) = router();
        {
            let mut state = router.state.lock().await;
            state.registry.register("worker-1");
            state.registry.register("worker-2");
        }
        let descriptor = FunctionDescriptor {
            name: "add".into(),
            positional_params: vec![],
            default_params: vec![],
            return_type: Some(faas_protocol::value::ValueType::Int),
            procedure: "add".into(),
        };
        let raw = serde_json::to_vec(&descriptor).unwrap();
        let blob = base64::engine::general_purpose::STANDARD.encode(&raw);
        let body = serde_json::to_vec(&Operation::Register {
            requester: "client-1".into(),
            serialized_func_base64: blob,
            func_id: None,
        })
        .unwrap();
        router.handle_client_operation("client-1", &body).await;

        let (dest, forwarded) = outbound_rx.recv().await.unwrap();
        assert_eq!(dest, "worker-1");
        let op: Operation = serde_json::from_slice(&forwarded).unwrap();
        match op {
            Operation::Register { func_id, .. } => assert!(func_id.is_some()),
            _ => panic!("wrong variant"),
        }

        let state = router.state.lock().await;
        assert!(state.dirty);
        assert_eq!(state.currently_serving_clients, 1);
    }

    #[tokio::test]
    async fn unregister_fanout_only_forwards_the_final_response() {
        let (router, mut outbound_rx) = router();
        {
            let mut state = router.state.lock().await;
            state.registry.register("worker-1");
            state.registry.register("worker-2");
            state.placement.add("func-1", "worker-1");
            state.placement.add("func-1", "worker-2");
        }
        let body = serde_json::to_vec(&Operation::Unregister {
            requester: "client-1".into(),
            func_id: "func-1".into(),
            request_id: None,
        })
        .unwrap();
        router.handle_client_operation("client-1", &body).await;

        // Drain the two fan-out sends to workers.
        let (_, first) = outbound_rx.recv().await.unwrap();
        let (_, second) = outbound_rx.recv().await.unwrap();
        let extract_request_id = |body: &[u8]| match serde_json::from_slice::<Operation>(body).unwrap() {
            Operation::Unregister { request_id, .. } => request_id.unwrap(),
            _ => panic!("wrong variant"),
        };
        let request_id = extract_request_id(&first);
        assert_eq!(request_id, extract_request_id(&second));

        let control_body = |status: &str| {
            serde_json::to_vec(&WorkerControl::ForwardToClient {
                destination_client: "client-1".into(),
                original_client_operation: "unregister".into(),
                status: status.into(),
                action: Some("unregistered".into()),
                result_type: None,
                result: None,
                message: None,
                message_id: request_id.clone(),
            })
            .unwrap()
        };

        router.handle_worker_message("worker-1", &control_body("ok")).await;
        assert!(outbound_rx.try_recv().is_err());

        router.handle_worker_message("worker-2", &control_body("ok")).await;
        let (dest, final_reply) = outbound_rx.recv().await.unwrap();
        assert_eq!(dest, "client-1");
        let reply: ClientResponse = serde_json::from_slice(&final_reply).unwrap();
        assert_eq!(reply.status, ResponseStatus::Ok);

        let state = router.state.lock().await;
        assert!(!state.placement.contains("func-1"));
        assert_eq!(state.currently_serving_clients, 0);
    }
}
