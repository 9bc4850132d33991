//! Per-operation request handlers (spec.md §4.4). Pure functions over
//! `WorkerState` so they can be exercised without a socket in tests; the
//! request loop (`worker.rs`) is the only place that touches the
//! transport.

use crate::audit::{AuditEvent, AuditLog};
use crate::cache::CacheKey;
use crate::catalog::CatalogEntry;
use crate::chain::ChainExecutor;
use crate::error::{Result, WorkerError};
use crate::state::WorkerState;
use crate::validator;
use base64::Engine;
use faas_protocol::types::{
    ClientResponse, FunctionDescriptor, ResultType, SyncStateResponse, Workflow,
};
use faas_protocol::ArgValue;
use std::collections::BTreeMap;
use std::time::Instant;

fn decode_descriptor(serialized_func_base64: &str) -> Result<FunctionDescriptor> {
    let raw = base64::engine::general_purpose::STANDARD
        .decode(serialized_func_base64)
        .map_err(|e| WorkerError::DeserializationFailed(format!("invalid base64 code blob: {e}")))?;
    serde_json::from_slice(&raw)
        .map_err(|e| WorkerError::DeserializationFailed(format!("invalid function descriptor: {e}")))
}

/// `register` (spec.md §4.4). The Director has already computed and
/// supplied `func_id`.
pub fn handle_register(
    state: &mut WorkerState,
    audit: &AuditLog,
    requester: &str,
    serialized_func_base64: &str,
    func_id: &str,
) -> Result<ClientResponse> {
    let descriptor = decode_descriptor(serialized_func_base64)?;
    if let Some(missing) = descriptor.missing_annotation() {
        return Err(WorkerError::MissingAnnotation(missing));
    }

    let inserted = state.catalog.insert_if_absent(
        func_id.to_string(),
        CatalogEntry {
            descriptor,
            registering_client: requester.to_string(),
        },
    );

    if inserted {
        audit.record(AuditEvent::Registered {
            func_id: func_id.to_string(),
            client: requester.to_string(),
        });
        Ok(ClientResponse::ok(
            "registered",
            ResultType::Json,
            ArgValue::Str(func_id.to_string()),
        ))
    } else {
        Ok(ClientResponse::ok(
            "no_action",
            ResultType::Json,
            ArgValue::Str(func_id.to_string()),
        ))
    }
}

/// `unregister` (spec.md §4.4). Only the registering client may remove
/// the function; the func_id must currently be known.
pub fn handle_unregister(
    state: &mut WorkerState,
    audit: &AuditLog,
    requester: &str,
    func_id: &str,
) -> Result<ClientResponse> {
    let entry = state.catalog.get(func_id).ok_or(WorkerError::NoFunc)?;
    if entry.registering_client != requester {
        return Err(WorkerError::Forbidden);
    }
    state.catalog.remove(func_id);
    state.stats.remove(func_id);
    audit.record(AuditEvent::Unregistered {
        func_id: func_id.to_string(),
        client: requester.to_string(),
    });
    Ok(ClientResponse::ok_no_result("unregistered"))
}

fn encode_result(value: ArgValue) -> (ResultType, ArgValue) {
    if value.is_json_representable() {
        (ResultType::Json, value)
    } else {
        let ArgValue::Opaque(bytes) = value else {
            unreachable!("is_json_representable() guards this");
        };
        let b64 = base64::engine::general_purpose::STANDARD.encode(bytes);
        (ResultType::PickleBase64, ArgValue::Str(b64))
    }
}

/// `exec` (spec.md §4.4).
pub fn handle_exec(
    state: &mut WorkerState,
    audit: &AuditLog,
    func_id: &str,
    positional_args: &[ArgValue],
    default_args: &BTreeMap<String, ArgValue>,
    save_in_cache: bool,
) -> Result<ClientResponse> {
    let entry = state.catalog.get(func_id).ok_or(WorkerError::NoFunc)?;
    let descriptor = entry.descriptor.clone();
    validator::validate_call(&descriptor, positional_args, default_args)?;

    let key = CacheKey::new(func_id, positional_args, default_args);
    let value = if state.cache.check(&key) {
        audit.record(AuditEvent::CacheHit {
            func_id: func_id.to_string(),
        });
        state.cache.get(&key).expect("checked key must be present")
    } else {
        let start = Instant::now();
        let result = state
            .procedures
            .invoke(&descriptor.procedure, positional_args, default_args)
            .map_err(|e| WorkerError::ExecutionFailed(e.to_string()))?;
        let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;
        state.stats.record_call(func_id, elapsed_ms);
        if save_in_cache {
            state.cache.put(key, result.clone());
        }
        result
    };

    let (result_type, result) = encode_result(value);
    Ok(ClientResponse::ok("executed", result_type, result))
}

/// `list` (SPEC_FULL.md §6): name, `func_id`, and signature of every
/// locally-held function.
pub fn handle_list(state: &WorkerState) -> ClientResponse {
    let items: Vec<ArgValue> = state
        .catalog
        .iter()
        .map(|(func_id, entry)| {
            let mut map = BTreeMap::new();
            map.insert("func_id".to_string(), ArgValue::Str(func_id.clone()));
            map.insert("name".to_string(), ArgValue::Str(entry.descriptor.name.clone()));
            map
        })
        .map(ArgValue::Map)
        .collect();
    ClientResponse::ok("list", ResultType::Json, ArgValue::Array(items))
}

/// `get_stats`, optionally scoped to one function by name (SPEC_FULL.md
/// §6 resolves the underspecified shape: single function when
/// `func_name` is given, full map otherwise).
pub fn handle_get_stats(state: &WorkerState, func_name: Option<&str>) -> Result<ClientResponse> {
    let to_value = |func_id: &str, stats: crate::stats::FunctionStats| {
        let mut map = BTreeMap::new();
        map.insert("func_id".to_string(), ArgValue::Str(func_id.to_string()));
        map.insert("calls".to_string(), ArgValue::Int(stats.calls as i64));
        map.insert(
            "tot_exec_time_ms".to_string(),
            ArgValue::Float(stats.tot_exec_time_ms),
        );
        map.insert(
            "avg_exec_time_ms".to_string(),
            ArgValue::Float(stats.avg_exec_time_ms()),
        );
        ArgValue::Map(map)
    };

    match func_name {
        Some(name) => {
            let (func_id, _) = state.catalog.find_by_name(name).ok_or(WorkerError::NoFunc)?;
            let stats = state.stats.get(func_id).unwrap_or_default();
            Ok(ClientResponse::ok(
                "get_stats",
                ResultType::Json,
                to_value(func_id, stats),
            ))
        }
        None => {
            let items: Vec<ArgValue> = state
                .stats
                .all()
                .iter()
                .map(|(func_id, stats)| to_value(func_id, *stats))
                .collect();
            Ok(ClientResponse::ok(
                "get_stats",
                ResultType::Json,
                ArgValue::Array(items),
            ))
        }
    }
}

/// `get_worker_info` (SPEC_FULL.md §6).
pub fn handle_get_worker_info(state: &WorkerState) -> ClientResponse {
    let mut map = BTreeMap::new();
    map.insert("worker_id".to_string(), ArgValue::Str(state.worker_id.clone()));
    map.insert("uptime_secs".to_string(), ArgValue::Float(state.uptime_secs()));
    map.insert(
        "catalog_size".to_string(),
        ArgValue::Int(state.catalog.len() as i64),
    );
    map.insert(
        "cache_occupancy".to_string(),
        ArgValue::Int(state.cache.len() as i64),
    );
    map.insert(
        "cache_max_size".to_string(),
        ArgValue::Int(state.cache.max_size() as i64),
    );
    ClientResponse::ok("get_worker_info", ResultType::Json, ArgValue::Map(map))
}

/// `get_cache_dump` (spec.md §4.5 `dump`).
pub fn handle_get_cache_dump(state: &WorkerState) -> ClientResponse {
    let items: Vec<ArgValue> = state
        .cache
        .dump()
        .into_iter()
        .map(|(key, value)| {
            let mut map = BTreeMap::new();
            map.insert("func_id".to_string(), ArgValue::Str(key.func_id));
            map.insert(
                "positional_args".to_string(),
                ArgValue::Array(
                    key.positional
                        .into_iter()
                        .map(ArgValue::Str)
                        .collect(),
                ),
            );
            map.insert("default_args".to_string(), ArgValue::Str(key.defaults));
            map.insert("value".to_string(), value);
            ArgValue::Map(map)
        })
        .collect();
    ClientResponse::ok("get_cache_dump", ResultType::Json, ArgValue::Array(items))
}

/// `chain_exec` (spec.md §4.6).
pub fn handle_chain_exec(state: &mut WorkerState, workflow: &Workflow) -> Result<ClientResponse> {
    let mut exec = ChainExecutor {
        catalog: &state.catalog,
        procedures: &state.procedures,
        cache: &mut state.cache,
        stats: &mut state.stats,
    };
    let result = exec.execute(workflow)?;
    let (result_type, result) = encode_result(result);
    Ok(ClientResponse::ok("chain_executed", result_type, result))
}

pub fn handle_ping() -> ClientResponse {
    ClientResponse::ok("pong", ResultType::Json, ArgValue::Bool(true))
}

/// `sync_state_request` (spec.md §4.3 step 1/2).
pub fn handle_sync_state_request(state: &WorkerState) -> SyncStateResponse {
    SyncStateResponse::CurrentFunctionsState {
        functions: state.catalog.func_ids(),
    }
}

/// `sync_function_code_request` (spec.md §4.3 step 3/4).
pub fn handle_sync_function_code_request(
    state: &WorkerState,
    func_id: &str,
) -> Result<SyncStateResponse> {
    let entry = state.catalog.get(func_id).ok_or(WorkerError::NoFunc)?;
    Ok(SyncStateResponse::FunctionCodeResponse {
        func_id: func_id.to_string(),
        code_blob: entry.descriptor.clone(),
        owning_client: entry.registering_client.clone(),
    })
}

/// `sync_missing_function_code` install (spec.md §4.3 step 5/6).
pub fn handle_sync_missing_function_code(
    state: &mut WorkerState,
    func_id: &str,
    code_blob: FunctionDescriptor,
    owning_client: String,
) {
    state.catalog.install(
        func_id.to_string(),
        CatalogEntry {
            descriptor: code_blob,
            registering_client: owning_client,
        },
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::Engine;

    fn descriptor_blob() -> String {
        let descriptor = crate::procedures::add_descriptor();
        let json = serde_json::to_vec(&descriptor).unwrap();
        base64::engine::general_purpose::STANDARD.encode(json)
    }

    #[test]
    fn register_then_exec_matches_worked_example() {
        let mut state = WorkerState::new("worker-1".into(), 8);
        let audit = AuditLog::new(std::env::temp_dir().join("faas_worker_test_audit.ndjson"));
        let blob = descriptor_blob();
        let func_id = "func-add";
        handle_register(&mut state, &audit, "client-1", &blob, func_id).unwrap();

        let mut defaults = BTreeMap::new();
        defaults.insert("c".to_string(), ArgValue::Int(21));
        let response = handle_exec(
            &mut state,
            &audit,
            func_id,
            &[ArgValue::Int(12), ArgValue::Int(69)],
            &defaults,
            false,
        )
        .unwrap();
        assert_eq!(response.result, Some(ArgValue::Int(12 + 69 * 21)));
    }

    #[test]
    fn second_cached_exec_does_not_increment_calls() {
        let mut state = WorkerState::new("worker-1".into(), 8);
        let audit = AuditLog::new(std::env::temp_dir().join("faas_worker_test_audit2.ndjson"));
        let blob = descriptor_blob();
        let func_id = "func-add";
        handle_register(&mut state, &audit, "client-1", &blob, func_id).unwrap();

        let mut defaults = BTreeMap::new();
        defaults.insert("c".to_string(), ArgValue::Int(21));
        handle_exec(&mut state, &audit, func_id, &[ArgValue::Int(1), ArgValue::Int(2)], &defaults, true).unwrap();
        handle_exec(&mut state, &audit, func_id, &[ArgValue::Int(1), ArgValue::Int(2)], &defaults, true).unwrap();
        assert_eq!(state.stats.get(func_id).unwrap().calls, 1);
    }

    #[test]
    fn unregister_by_non_owner_is_forbidden() {
        let mut state = WorkerState::new("worker-1".into(), 8);
        let audit = AuditLog::new(std::env::temp_dir().join("faas_worker_test_audit3.ndjson"));
        let blob = descriptor_blob();
        handle_register(&mut state, &audit, "client-A", &blob, "func-add").unwrap();
        let err = handle_unregister(&mut state, &audit, "client-B", "func-add").unwrap_err();
        assert!(matches!(err, WorkerError::Forbidden));
    }
}
