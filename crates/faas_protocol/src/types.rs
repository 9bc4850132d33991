//! JSON payload shapes exchanged over the envelope (spec.md §3, §6).

use crate::value::{ArgValue, ValueType};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ============================================================================
// Function signature ("reflected" from the code blob, spec.md §9)
// ============================================================================

/// A single positional parameter: name, and its declared type if the
/// client annotated it. `None` triggers `missing_annotation` at register
/// time (spec.md §4.4); this workspace has no runtime reflection, so the
/// client is required to submit the signature alongside the blob instead
/// of us inspecting it (see DESIGN.md, "code transport").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Param {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: Option<ValueType>,
}

/// A named parameter with a default value and declared type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DefaultParam {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: Option<ValueType>,
    pub default: ArgValue,
}

/// The function's reflected signature plus a handle into the Worker's
/// procedure table. This *is* the "code blob": content-addressing hashes
/// `name + base64(code)` where `code` is this struct's canonical JSON
/// serialization (spec.md §3 `func_id` formula; see DESIGN.md for why a
/// plugin-table handle stands in for sandboxed bytecode/WASM).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDescriptor {
    pub name: String,
    pub positional_params: Vec<Param>,
    #[serde(default)]
    pub default_params: Vec<DefaultParam>,
    pub return_type: Option<ValueType>,
    /// Key into the Worker's `ProcedureRegistry`.
    pub procedure: String,
}

impl FunctionDescriptor {
    /// Every parameter and the return type must carry a declared type
    /// (spec.md §4.4 `missing_annotation`).
    pub fn missing_annotation(&self) -> Option<String> {
        for p in &self.positional_params {
            if p.ty.is_none() {
                return Some(p.name.clone());
            }
        }
        for p in &self.default_params {
            if p.ty.is_none() {
                return Some(p.name.clone());
            }
        }
        if self.return_type.is_none() {
            return Some("<return>".to_string());
        }
        None
    }
}

// ============================================================================
// Workflow (chain_exec payload, spec.md §3, §4.7)
// ============================================================================

/// spec.md §4.7 requires exactly these four fields and rejects any
/// others, so unlike most wire structs this one does not tolerate
/// additions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WorkflowNode {
    pub positional_args: Vec<ArgValue>,
    #[serde(default)]
    pub default_args: BTreeMap<String, ArgValue>,
    pub next: String,
    pub cache_result: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workflow {
    pub id: String,
    pub entry_function: String,
    pub functions: BTreeMap<String, WorkflowNode>,
}

// ============================================================================
// Client <-> Director <-> Worker operations, single "operation" tag
// (spec.md §6). The Director forwards most variants to a Worker
// unmodified; `Register`/`Unregister` gain a Director-injected field.
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "operation", rename_all = "snake_case")]
pub enum Operation {
    Register {
        requester: String,
        serialized_func_base64: String,
        #[serde(default)]
        func_id: Option<String>,
    },
    Unregister {
        requester: String,
        func_id: String,
        #[serde(default)]
        request_id: Option<String>,
    },
    List {
        requester: String,
    },
    GetStats {
        requester: String,
        #[serde(default)]
        func_name: Option<String>,
    },
    Exec {
        requester: String,
        func_id: String,
        #[serde(default)]
        positional_args: Vec<ArgValue>,
        #[serde(default)]
        default_args: BTreeMap<String, ArgValue>,
        #[serde(default)]
        save_in_cache: bool,
    },
    GetWorkerInfo {
        requester: String,
        worker_id: String,
    },
    GetCacheDump {
        requester: String,
        worker_id: String,
    },
    ChainExec {
        requester: String,
        json_workflow: Workflow,
    },
    GetWorkerIds {
        requester: String,
    },
    #[serde(rename = "PING")]
    Ping {
        requester: String,
    },
    SyncStateRequest,
    SyncFunctionCodeRequest {
        func_id: String,
    },
    SyncMissingFunctionCodeCount {
        count: usize,
    },
    SyncMissingFunctionCode {
        func_id: String,
        code_blob: FunctionDescriptor,
        owning_client: String,
    },
    /// Director's acknowledgement of a `worker_registration` control
    /// message (spec.md §4.1: "replies with an ACK"). The Worker treats
    /// this as a no-op; it exists so the registration handshake has a
    /// reply on the wire rather than relying on silence.
    Ack,
}

impl Operation {
    pub fn requester(&self) -> Option<&str> {
        match self {
            Operation::Register { requester, .. }
            | Operation::Unregister { requester, .. }
            | Operation::List { requester }
            | Operation::GetStats { requester, .. }
            | Operation::Exec { requester, .. }
            | Operation::GetWorkerInfo { requester, .. }
            | Operation::GetCacheDump { requester, .. }
            | Operation::ChainExec { requester, .. }
            | Operation::GetWorkerIds { requester }
            | Operation::Ping { requester } => Some(requester),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Operation::Register { .. } => "register",
            Operation::Unregister { .. } => "unregister",
            Operation::List { .. } => "list",
            Operation::GetStats { .. } => "get_stats",
            Operation::Exec { .. } => "exec",
            Operation::GetWorkerInfo { .. } => "get_worker_info",
            Operation::GetCacheDump { .. } => "get_cache_dump",
            Operation::ChainExec { .. } => "chain_exec",
            Operation::GetWorkerIds { .. } => "get_worker_ids",
            Operation::Ping { .. } => "PING",
            Operation::SyncStateRequest => "sync_state_request",
            Operation::SyncFunctionCodeRequest { .. } => "sync_function_code_request",
            Operation::SyncMissingFunctionCodeCount { .. } => "sync_missing_function_code_count",
            Operation::SyncMissingFunctionCode { .. } => "sync_missing_function_code",
            Operation::Ack => "ack",
        }
    }
}

// ============================================================================
// Worker -> Director control messages (spec.md §6)
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "director_operation", rename_all = "snake_case")]
pub enum WorkerControl {
    WorkerRegistration,
    Heartbeat,
    ForwardToClient {
        destination_client: String,
        original_client_operation: String,
        status: String,
        #[serde(default)]
        action: Option<String>,
        #[serde(default)]
        result_type: Option<String>,
        #[serde(default)]
        result: Option<ArgValue>,
        #[serde(default)]
        message: Option<String>,
        message_id: String,
    },
    #[serde(rename = "sync_state_response")]
    SyncStateResponse(SyncStateResponse),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum SyncStateResponse {
    CurrentFunctionsState { functions: Vec<String> },
    FunctionCodeResponse {
        func_id: String,
        code_blob: FunctionDescriptor,
        owning_client: String,
    },
}

// ============================================================================
// The final reply delivered to the Client (spec.md §6)
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientResponse {
    pub status: ResponseStatus,
    #[serde(default)]
    pub action: Option<String>,
    #[serde(default)]
    pub result_type: Option<ResultType>,
    #[serde(default)]
    pub result: Option<ArgValue>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseStatus {
    Ok,
    Err,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultType {
    Json,
    PickleBase64,
}

impl ClientResponse {
    pub fn ok(action: impl Into<String>, result_type: ResultType, result: ArgValue) -> Self {
        Self {
            status: ResponseStatus::Ok,
            action: Some(action.into()),
            result_type: Some(result_type),
            result: Some(result),
            message: None,
        }
    }

    pub fn ok_no_result(action: impl Into<String>) -> Self {
        Self {
            status: ResponseStatus::Ok,
            action: Some(action.into()),
            result_type: None,
            result: None,
            message: None,
        }
    }

    pub fn err(action: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status: ResponseStatus::Err,
            action: Some(action.into()),
            result_type: None,
            result: None,
            message: Some(message.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operation_tag_roundtrips() {
        let op = Operation::Exec {
            requester: "client-1".into(),
            func_id: "abc".into(),
            positional_args: vec![ArgValue::Int(1)],
            default_args: BTreeMap::new(),
            save_in_cache: true,
        };
        let json = serde_json::to_string(&op).unwrap();
        assert!(json.contains("\"operation\":\"exec\""));
        let back: Operation = serde_json::from_str(&json).unwrap();
        assert_eq!(op, back);
    }

    #[test]
    fn ping_uses_uppercase_literal() {
        let op = Operation::Ping {
            requester: "client-1".into(),
        };
        let json = serde_json::to_string(&op).unwrap();
        assert!(json.contains("\"operation\":\"PING\""));
    }

    #[test]
    fn register_injected_func_id_roundtrips() {
        let json = r#"{"operation":"register","requester":"client-1","serialized_func_base64":"Zm9v","func_id":"abc123"}"#;
        let op: Operation = serde_json::from_str(json).unwrap();
        match op {
            Operation::Register { func_id, .. } => assert_eq!(func_id.as_deref(), Some("abc123")),
            _ => panic!("wrong variant"),
        }
    }

    #[test]
    fn descriptor_flags_missing_return_annotation() {
        let descriptor = FunctionDescriptor {
            name: "add".into(),
            positional_params: vec![Param {
                name: "a".into(),
                ty: Some(ValueType::Int),
            }],
            default_params: vec![],
            return_type: None,
            procedure: "add".into(),
        };
        assert_eq!(descriptor.missing_annotation(), Some("<return>".to_string()));
    }
}
