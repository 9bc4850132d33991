//! Integration tests driving `Router` through a full register -> exec
//! round trip and a multi-worker `unregister` fan-out, using the same
//! in-process channel harness as `router.rs`'s own unit tests (spec.md
//! §4.2).

use base64::Engine;
use faas_director::config::SelectionStrategyKind;
use faas_director::router::Router;
use faas_director::state::DirectorState;
use faas_director::transport::outbound_channel;
use faas_protocol::types::{
    ClientResponse, FunctionDescriptor, Operation, ResponseStatus, WorkerControl,
};
use faas_protocol::value::ValueType;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};

fn router() -> (Router, mpsc::UnboundedReceiver<(String, Vec<u8>)>, Arc<Mutex<DirectorState>>) {
    let state = Arc::new(Mutex::new(DirectorState::new()));
    let (outbound, outbound_rx) = outbound_channel();
    let (sync_tx, _sync_rx) = mpsc::unbounded_channel();
    (
        Router::new(Arc::clone(&state), outbound, sync_tx, SelectionStrategyKind::RoundRobin),
        outbound_rx,
        state,
    )
}

fn add_descriptor() -> FunctionDescriptor {
    FunctionDescriptor {
        name: "add".into(),
        positional_params: vec![
            faas_protocol::types::Param { name: "a".into(), ty: Some(ValueType::Int) },
            faas_protocol::types::Param { name: "b".into(), ty: Some(ValueType::Int) },
        ],
        default_params: vec![],
        return_type: Some(ValueType::Int),
        procedure: "add".into(),
    }
}

#[tokio::test]
async fn register_then_exec_routes_to_the_same_worker() {
    let (router, mut outbound_rx, state) = router();
    {
        let mut state = state.lock().await;
        state.registry.register("worker-1");
    }

    let descriptor = add_descriptor();
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
    let func_id = match serde_json::from_slice::<Operation>(&forwarded).unwrap() {
        Operation::Register { func_id: Some(id), .. } => id,
        other => panic!("unexpected op {other:?}"),
    };

    // The worker acknowledges registration back to the client.
    let ack = WorkerControl::ForwardToClient {
        destination_client: "client-1".into(),
        original_client_operation: "register".into(),
        status: "ok".into(),
        action: Some("registered".into()),
        result_type: None,
        result: None,
        message: None,
        message_id: "m1".into(),
    };
    router
        .handle_worker_message("worker-1", &serde_json::to_vec(&ack).unwrap())
        .await;
    let (dest, reply) = outbound_rx.recv().await.unwrap();
    assert_eq!(dest, "client-1");
    let reply: ClientResponse = serde_json::from_slice(&reply).unwrap();
    assert_eq!(reply.status, ResponseStatus::Ok);

    // Now exec routes to the single worker holding that func_id.
    let body = serde_json::to_vec(&Operation::Exec {
        requester: "client-1".into(),
        func_id,
        positional_args: vec![],
        default_args: BTreeMap::new(),
        save_in_cache: true,
    })
    .unwrap();
    router.handle_client_operation("client-1", &body).await;

    let (dest, forwarded) = outbound_rx.recv().await.unwrap();
    assert_eq!(dest, "worker-1");
    assert!(matches!(
        serde_json::from_slice::<Operation>(&forwarded).unwrap(),
        Operation::Exec { .. }
    ));
}

#[tokio::test]
async fn unregister_fans_out_to_every_holder_and_clears_placement_only_once() {
    let (router, mut outbound_rx, state) = router();
    {
        let mut state = state.lock().await;
        state.registry.register("worker-1");
        state.registry.register("worker-2");
        state.registry.register("worker-3");
        state.placement.add("func-1", "worker-1");
        state.placement.add("func-1", "worker-2");
        state.placement.add("func-1", "worker-3");
    }

    let body = serde_json::to_vec(&Operation::Unregister {
        requester: "client-1".into(),
        func_id: "func-1".into(),
        request_id: None,
    })
    .unwrap();
    router.handle_client_operation("client-1", &body).await;

    let mut request_id = None;
    for _ in 0..3 {
        let (_, body) = outbound_rx.recv().await.unwrap();
        match serde_json::from_slice::<Operation>(&body).unwrap() {
            Operation::Unregister { request_id: Some(id), .. } => {
                if let Some(existing) = &request_id {
                    assert_eq!(existing, &id);
                } else {
                    request_id = Some(id);
                }
            }
            other => panic!("unexpected op {other:?}"),
        }
    }
    let request_id = request_id.unwrap();

    let ack = |status: &str| {
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

    router.handle_worker_message("worker-1", &ack("ok")).await;
    router.handle_worker_message("worker-2", &ack("ok")).await;
    assert!(outbound_rx.try_recv().is_err(), "no reply before the last fan-out response");

    router.handle_worker_message("worker-3", &ack("ok")).await;
    let (dest, reply) = outbound_rx.recv().await.unwrap();
    assert_eq!(dest, "client-1");
    let reply: ClientResponse = serde_json::from_slice(&reply).unwrap();
    assert_eq!(reply.status, ResponseStatus::Ok);

    let state = state.lock().await;
    assert!(!state.placement.contains("func-1"));
}

#[tokio::test]
async fn exec_with_two_candidates_round_robins_across_calls() {
    let (router, mut outbound_rx, state) = router();
    {
        let mut state = state.lock().await;
        state.registry.register("worker-1");
        state.registry.register("worker-2");
        state.placement.add("func-1", "worker-1");
        state.placement.add("func-1", "worker-2");
    }

    let mut destinations = vec![];
    for _ in 0..2 {
        let body = serde_json::to_vec(&Operation::Exec {
            requester: "client-1".into(),
            func_id: "func-1".into(),
            positional_args: vec![],
            default_args: BTreeMap::new(),
            save_in_cache: false,
        })
        .unwrap();
        router.handle_client_operation("client-1", &body).await;
        let (dest, _) = outbound_rx.recv().await.unwrap();
        destinations.push(dest);
    }
    assert_eq!(destinations, vec!["worker-1".to_string(), "worker-2".to_string()]);
}
