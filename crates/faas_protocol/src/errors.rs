//! The client-visible error taxonomy (spec.md §7).
//!
//! These are the `action` discriminators an `err` `ClientResponse` may
//! carry. They are shared between `faas_worker` and `faas_director` so
//! both sides speak the same vocabulary without either depending on the
//! other.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NoWorkers,
    NoFunc,
    Forbidden,
    MissingAnnotation,
    ValidationFailed,
    ExecutionFailed,
    Timeout,
    DeserializationFailed,
    ConfigError,
    InternalError,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::NoWorkers => "no_workers",
            ErrorKind::NoFunc => "no_func",
            ErrorKind::Forbidden => "forbidden",
            ErrorKind::MissingAnnotation => "missing_annotation",
            ErrorKind::ValidationFailed => "validation_failed",
            ErrorKind::ExecutionFailed => "execution_failed",
            ErrorKind::Timeout => "timeout",
            ErrorKind::DeserializationFailed => "deserialization_failed",
            ErrorKind::ConfigError => "config_error",
            ErrorKind::InternalError => "internal_error",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_snake_case_action_names() {
        assert_eq!(ErrorKind::NoWorkers.as_str(), "no_workers");
        assert_eq!(ErrorKind::MissingAnnotation.as_str(), "missing_annotation");
    }
}
