//! Worker-local error taxonomy (spec.md §7), grounded on the teacher's
//! `casparian_worker::schema_validation::SchemaValidationError`.

use faas_protocol::ErrorKind;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, WorkerError>;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("no function registered under this func_id")]
    NoFunc,

    #[error("only the registering client may unregister this function")]
    Forbidden,

    #[error("missing type annotation on '{0}'")]
    MissingAnnotation(String),

    #[error("workflow validation failed: {0}")]
    ValidationFailed(String),

    #[error("{0}")]
    ExecutionFailed(String),

    #[error("failed to decode request body: {0}")]
    DeserializationFailed(String),

    #[error("configuration error: {0}")]
    ConfigError(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl WorkerError {
    /// The wire-level `action` discriminator for this error (spec.md §7).
    pub fn kind(&self) -> ErrorKind {
        match self {
            WorkerError::NoFunc => ErrorKind::NoFunc,
            WorkerError::Forbidden => ErrorKind::Forbidden,
            WorkerError::MissingAnnotation(_) => ErrorKind::MissingAnnotation,
            WorkerError::ValidationFailed(_) => ErrorKind::ValidationFailed,
            WorkerError::ExecutionFailed(_) => ErrorKind::ExecutionFailed,
            WorkerError::DeserializationFailed(_) => ErrorKind::DeserializationFailed,
            WorkerError::ConfigError(_) => ErrorKind::ConfigError,
            WorkerError::Internal(_) => ErrorKind::InternalError,
        }
    }
}

impl From<serde_json::Error> for WorkerError {
    fn from(err: serde_json::Error) -> Self {
        WorkerError::DeserializationFailed(err.to_string())
    }
}
