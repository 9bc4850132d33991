//! Catalog synchronization loop (spec.md §4.3). Runs in its own task,
//! waking every `synchronization_interval_ms`; a pass only starts when
//! `DirectorState::sync_pass_allowed()` holds. Strictly
//! request-then-collect at each step, as the spec prescribes, to keep
//! queue discipline simple: this task is the only consumer of
//! `sync_inbox_rx`, so no other task needs to distinguish sync traffic
//! from ordinary client/worker operations.

use crate::config::SelectionStrategyKind;
use crate::selection::select_worker;
use crate::state::DirectorState;
use crate::transport::OutboundSender;
use faas_protocol::types::{FunctionDescriptor, Operation, SyncStateResponse};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tracing::{info, warn};

/// One collected `function_code_response` payload, held until it is
/// forwarded on to every Worker missing that function.
struct CodeAnswer {
    code_blob: FunctionDescriptor,
    owning_client: String,
}

pub async fn run(
    interval_ms: u64,
    selection_strategy: SelectionStrategyKind,
    state: Arc<Mutex<DirectorState>>,
    outbound: OutboundSender,
    mut sync_inbox: mpsc::UnboundedReceiver<(String, SyncStateResponse)>,
    mut stop: tokio::sync::watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(Duration::from_millis(interval_ms));
    let pass_timeout = Duration::from_millis(interval_ms.max(1000));

    loop {
        tokio::select! {
            biased;
            _ = stop.changed() => {
                if *stop.borrow() {
                    break;
                }
            }
            _ = ticker.tick() => {
                let (allowed, worker_ids) = {
                    let state = state.lock().await;
                    (state.sync_pass_allowed(), state.registry.ids_in_order().to_vec())
                };
                if !allowed {
                    continue;
                }
                run_pass(&worker_ids, selection_strategy, &state, &outbound, &mut sync_inbox, pass_timeout).await;
            }
        }
    }
}

async fn run_pass(
    worker_ids: &[String],
    selection_strategy: SelectionStrategyKind,
    state: &Arc<Mutex<DirectorState>>,
    outbound: &OutboundSender,
    sync_inbox: &mut mpsc::UnboundedReceiver<(String, SyncStateResponse)>,
    pass_timeout: Duration,
) {
    info!(worker_count = worker_ids.len(), "starting catalog synchronization pass");

    // Step 1-2: request and collect each worker's function set.
    for worker_id in worker_ids {
        let _ = send_to_worker(outbound, worker_id, &Operation::SyncStateRequest);
    }
    let mut functions_per_worker: HashMap<String, HashSet<String>> = HashMap::new();
    for _ in worker_ids {
        match recv_state_response(sync_inbox, pass_timeout).await {
            Some((worker_id, SyncStateResponse::CurrentFunctionsState { functions })) => {
                functions_per_worker.insert(worker_id, functions.into_iter().collect());
            }
            Some((worker_id, _)) => {
                warn!(%worker_id, "unexpected response during sync_state_request collection");
            }
            None => {
                warn!("synchronization pass abandoned: timed out collecting worker function sets");
                return;
            }
        }
    }

    let all: HashSet<String> = functions_per_worker.values().flatten().cloned().collect();
    let missing: HashMap<String, HashSet<String>> = functions_per_worker
        .iter()
        .map(|(worker_id, present)| (worker_id.clone(), all.difference(present).cloned().collect()))
        .collect();

    // Step 3-4: for each globally-missing function, fetch its code blob
    // once from a worker that has it.
    let mut missing_func_ids: HashSet<String> = HashSet::new();
    for set in missing.values() {
        missing_func_ids.extend(set.iter().cloned());
    }

    let mut code_by_func: HashMap<String, CodeAnswer> = HashMap::new();
    let mut round_robin_index = 0usize;
    for func_id in &missing_func_ids {
        let owners: Vec<String> = functions_per_worker
            .iter()
            .filter(|(_, present)| present.contains(func_id))
            .map(|(worker_id, _)| worker_id.clone())
            .collect();
        let Some(source) = select_worker(selection_strategy, &owners, &mut round_robin_index) else {
            warn!(%func_id, "no worker holds a function everyone is missing, skipping");
            continue;
        };
        let _ = send_to_worker(
            outbound,
            source,
            &Operation::SyncFunctionCodeRequest {
                func_id: func_id.clone(),
            },
        );
        match recv_state_response(sync_inbox, pass_timeout).await {
            Some((_, SyncStateResponse::FunctionCodeResponse { func_id, code_blob, owning_client })) => {
                code_by_func.insert(func_id, CodeAnswer { code_blob, owning_client });
            }
            Some((worker_id, _)) => {
                warn!(%worker_id, "unexpected response during sync_function_code_request collection");
            }
            None => {
                warn!("synchronization pass abandoned: timed out collecting function code");
                return;
            }
        }
    }

    // Step 5: push the missing count, then each missing function's code,
    // to every worker that lacks it.
    for (worker_id, missing_here) in &missing {
        if missing_here.is_empty() {
            continue;
        }
        let _ = send_to_worker(
            outbound,
            worker_id,
            &Operation::SyncMissingFunctionCodeCount {
                count: missing_here.len(),
            },
        );
        for func_id in missing_here {
            let Some(answer) = code_by_func.get(func_id) else {
                warn!(%func_id, "no collected code for a function missing at one worker, skipping");
                continue;
            };
            let _ = send_to_worker(
                outbound,
                worker_id,
                &Operation::SyncMissingFunctionCode {
                    func_id: func_id.clone(),
                    code_blob: answer.code_blob.clone(),
                    owning_client: answer.owning_client.clone(),
                },
            );
        }
    }

    // Step 6: every alive worker now holds every function.
    let mut state = state.lock().await;
    state.placement.mirror_onto_all(worker_ids);
    state.dirty = false;
    info!("catalog synchronization pass complete");
}

fn send_to_worker(outbound: &OutboundSender, worker_id: &str, op: &Operation) -> bool {
    match serde_json::to_vec(op) {
        Ok(body) => outbound.send((worker_id.to_string(), body)).is_ok(),
        Err(e) => {
            warn!("failed to encode {worker_id} sync message: {e}");
            false
        }
    }
}

async fn recv_state_response(
    sync_inbox: &mut mpsc::UnboundedReceiver<(String, SyncStateResponse)>,
    timeout: Duration,
) -> Option<(String, SyncStateResponse)> {
    tokio::time::timeout(timeout, sync_inbox.recv()).await.ok().flatten()
}
