//! Wire-level decode/encode failures.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ProtocolError>;

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("expected {expected} frames, got {got}")]
    InvalidFrameCount { expected: usize, got: usize },

    #[error("sender identity frame is not valid UTF-8")]
    InvalidSenderIdentity,

    #[error("sender identity '{0}' has neither the 'client-' nor 'worker-' prefix")]
    UnknownSenderKind(String),

    #[error("failed to decode JSON body: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to decode base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),
}
