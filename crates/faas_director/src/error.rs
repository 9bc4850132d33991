//! Director-local error taxonomy (spec.md §7), grounded on the teacher's
//! `casparian_worker::schema_validation::SchemaValidationError`.

use faas_protocol::ErrorKind;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, DirectorError>;

#[derive(Debug, Error)]
pub enum DirectorError {
    #[error("no workers are registered to serve this request")]
    NoWorkers,

    #[error("no function registered under this func_id")]
    NoFunc,

    #[error("failed to decode request body: {0}")]
    DeserializationFailed(String),

    #[error("configuration error: {0}")]
    ConfigError(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl DirectorError {
    /// The wire-level `action` discriminator for this error (spec.md §7).
    pub fn kind(&self) -> ErrorKind {
        match self {
            DirectorError::NoWorkers => ErrorKind::NoWorkers,
            DirectorError::NoFunc => ErrorKind::NoFunc,
            DirectorError::DeserializationFailed(_) => ErrorKind::DeserializationFailed,
            DirectorError::ConfigError(_) => ErrorKind::ConfigError,
            DirectorError::Internal(_) => ErrorKind::InternalError,
        }
    }
}

impl From<serde_json::Error> for DirectorError {
    fn from(err: serde_json::Error) -> Self {
        DirectorError::DeserializationFailed(err.to_string())
    }
}
