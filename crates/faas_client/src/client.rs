//! The thin client SDK (spec.md §1, §2, SPEC_FULL.md §6): one DEALER
//! socket, one call per operation, a single request/response round
//! trip bounded by a receive timeout, no retry. Grounded on the
//! teacher's `casparian_sentinel::control_client::ControlClient`: a
//! single `request()` primitive plus one typed wrapper per RPC, ported
//! from a synchronous `zmq::REQ` socket to the workspace's async
//! DEALER transport (see `faas_protocol::transport`).
//!
//! A retry-on-timeout wrapper existed in the source this system was
//! distilled from; it is deliberately dropped here (spec.md §9 "Open
//! Questions") because retrying a timed-out `exec`/`chain_exec` risks
//! running side-effecting user code twice with no idempotency guard.

use crate::error::{ClientError, Result};
use crate::validator;
use base64::Engine;
use faas_protocol::defaults::{CLIENT_IDENTITY_PREFIX, DEFAULT_CLIENT_RECV_TIMEOUT_MS};
use faas_protocol::transport::{dealer_envelope_message, decode_dealer_message};
use faas_protocol::types::{ClientResponse, FunctionDescriptor, Operation, ResponseStatus, Workflow};
use faas_protocol::ArgValue;
use std::collections::BTreeMap;
use std::time::Duration;
use zeromq::{DealerSocket, Socket, SocketRecv, SocketSend};

/// A single-connection, single-flight handle to a Director.
pub struct FaasClient {
    client_id: String,
    socket: DealerSocket,
    recv_timeout: Duration,
}

impl FaasClient {
    pub async fn connect(director_addr: &str) -> Result<Self> {
        Self::connect_with_timeout(
            director_addr,
            Duration::from_millis(DEFAULT_CLIENT_RECV_TIMEOUT_MS),
        )
        .await
    }

    pub async fn connect_with_timeout(director_addr: &str, recv_timeout: Duration) -> Result<Self> {
        let client_id = format!("{CLIENT_IDENTITY_PREFIX}{}", uuid::Uuid::new_v4());
        let mut socket = DealerSocket::new();
        socket
            .connect(director_addr)
            .await
            .map_err(|e| ClientError::Transport(e.to_string()))?;
        Ok(Self {
            client_id,
            socket,
            recv_timeout,
        })
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Send one operation, wait for exactly one reply, surface a
    /// `status=err` response as `ClientError::Server`.
    async fn call(&mut self, op: Operation) -> Result<ClientResponse> {
        let body = serde_json::to_vec(&op).map_err(|e| ClientError::Protocol(e.to_string()))?;
        let msg = dealer_envelope_message(&self.client_id, &body);
        self.socket
            .send(msg)
            .await
            .map_err(|e| ClientError::Transport(e.to_string()))?;

        let reply = tokio::time::timeout(self.recv_timeout, self.socket.recv())
            .await
            .map_err(|_| ClientError::Timeout)?
            .map_err(|e| ClientError::Transport(e.to_string()))?;

        let body = decode_dealer_message(reply).map_err(|e| ClientError::Protocol(e.to_string()))?;
        let resp: ClientResponse =
            serde_json::from_slice(&body).map_err(|e| ClientError::Protocol(e.to_string()))?;

        if resp.status == ResponseStatus::Err {
            return Err(ClientError::Server {
                action: resp.action.unwrap_or_default(),
                message: resp.message.unwrap_or_default(),
            });
        }
        Ok(resp)
    }

    /// Registers a function, returning its content-addressed `func_id`
    /// (spec.md §3, §8: "A successful register returns a func_id equal
    /// to hex(SHA-256(name + \":\" + base64(code)))").
    pub async fn register(&mut self, descriptor: &FunctionDescriptor) -> Result<String> {
        let code =
            serde_json::to_vec(descriptor).map_err(|e| ClientError::Protocol(e.to_string()))?;
        let serialized_func_base64 = base64::engine::general_purpose::STANDARD.encode(&code);
        let resp = self
            .call(Operation::Register {
                requester: self.client_id.clone(),
                serialized_func_base64,
                func_id: None,
            })
            .await?;
        match resp.result {
            Some(ArgValue::Str(func_id)) => Ok(func_id),
            _ => Err(ClientError::Protocol(
                "register response missing a func_id result".into(),
            )),
        }
    }

    pub async fn unregister(&mut self, func_id: impl Into<String>) -> Result<()> {
        self.call(Operation::Unregister {
            requester: self.client_id.clone(),
            func_id: func_id.into(),
            request_id: None,
        })
        .await?;
        Ok(())
    }

    pub async fn list(&mut self) -> Result<Vec<ArgValue>> {
        let resp = self
            .call(Operation::List {
                requester: self.client_id.clone(),
            })
            .await?;
        as_array(resp)
    }

    pub async fn get_stats(&mut self, func_name: Option<&str>) -> Result<ArgValue> {
        let resp = self
            .call(Operation::GetStats {
                requester: self.client_id.clone(),
                func_name: func_name.map(str::to_string),
            })
            .await?;
        resp.result
            .ok_or_else(|| ClientError::Protocol("get_stats response carried no result".into()))
    }

    pub async fn exec(
        &mut self,
        func_id: impl Into<String>,
        positional_args: Vec<ArgValue>,
        default_args: BTreeMap<String, ArgValue>,
        save_in_cache: bool,
    ) -> Result<ArgValue> {
        let resp = self
            .call(Operation::Exec {
                requester: self.client_id.clone(),
                func_id: func_id.into(),
                positional_args,
                default_args,
                save_in_cache,
            })
            .await?;
        resp.result
            .ok_or_else(|| ClientError::Protocol("exec response carried no result".into()))
    }

    pub async fn get_worker_info(&mut self, worker_id: impl Into<String>) -> Result<ArgValue> {
        let resp = self
            .call(Operation::GetWorkerInfo {
                requester: self.client_id.clone(),
                worker_id: worker_id.into(),
            })
            .await?;
        resp.result
            .ok_or_else(|| ClientError::Protocol("get_worker_info response carried no result".into()))
    }

    pub async fn get_cache_dump(&mut self, worker_id: impl Into<String>) -> Result<Vec<ArgValue>> {
        let resp = self
            .call(Operation::GetCacheDump {
                requester: self.client_id.clone(),
                worker_id: worker_id.into(),
            })
            .await?;
        as_array(resp)
    }

    /// Runs the client-side structural validator (spec.md §4.7) before
    /// ever touching the socket, then submits the workflow.
    pub async fn chain_exec(&mut self, workflow: Workflow) -> Result<ArgValue> {
        validator::validate_structural(&workflow)?;
        let resp = self
            .call(Operation::ChainExec {
                requester: self.client_id.clone(),
                json_workflow: workflow,
            })
            .await?;
        resp.result
            .ok_or_else(|| ClientError::Protocol("chain_exec response carried no result".into()))
    }

    pub async fn get_worker_ids(&mut self) -> Result<Vec<String>> {
        let resp = self
            .call(Operation::GetWorkerIds {
                requester: self.client_id.clone(),
            })
            .await?;
        as_array(resp)?
            .into_iter()
            .map(|v| match v {
                ArgValue::Str(s) => Ok(s),
                _ => Err(ClientError::Protocol("get_worker_ids entry was not a string".into())),
            })
            .collect()
    }

    pub async fn ping(&mut self) -> Result<bool> {
        let resp = self
            .call(Operation::Ping {
                requester: self.client_id.clone(),
            })
            .await?;
        Ok(matches!(resp.result, Some(ArgValue::Bool(true))))
    }
}

fn as_array(resp: ClientResponse) -> Result<Vec<ArgValue>> {
    match resp.result {
        Some(ArgValue::Array(items)) => Ok(items),
        _ => Err(ClientError::Protocol("expected an array result".into())),
    }
}
