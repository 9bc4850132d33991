//! The SDK-visible error taxonomy. Unlike `faas_worker::WorkerError` /
//! `faas_director::DirectorError`, this type never crosses the wire:
//! it just wraps whatever `faas_protocol::ErrorKind` came back in an
//! `err` `ClientResponse`, or a local transport/encoding failure.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ClientError>;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("no response from director within the configured timeout")]
    Timeout,

    #[error("transport error: {0}")]
    Transport(String),

    #[error("malformed response from director: {0}")]
    Protocol(String),

    #[error("workflow is not structurally valid: {0}")]
    InvalidWorkflow(String),

    #[error("{action}: {message}")]
    Server { action: String, message: String },
}
