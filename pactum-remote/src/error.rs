//! Errors reported to remote callers.

use pactum_types::PactumError;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

pub type RemoteResult<T> = Result<T, RemoteError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RemoteErrorKind {
    /// No server handles the request, or the request is malformed.
    Unsupported,
    PolicyNotFound,
    PolicyViolation,
    /// Anything else, including panics inside a handler.
    Unknown,
}

impl fmt::Display for RemoteErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Unsupported => "UNSUPPORTED",
            Self::PolicyNotFound => "POLICY_NOT_FOUND",
            Self::PolicyViolation => "POLICY_VIOLATION",
            Self::Unknown => "UNKNOWN",
        };
        f.write_str(name)
    }
}

/// The error half of the response protocol.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{kind}: {message}")]
pub struct RemoteError {
    pub kind: RemoteErrorKind,
    pub message: String,
}

impl RemoteError {
    pub fn new(kind: RemoteErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn unsupported(message: impl Into<String>) -> Self {
        Self::new(RemoteErrorKind::Unsupported, message)
    }

    pub fn unknown(message: impl Into<String>) -> Self {
        Self::new(RemoteErrorKind::Unknown, message)
    }
}

impl From<PactumError> for RemoteError {
    fn from(err: PactumError) -> Self {
        let kind = match &err {
            PactumError::PolicyNotFound(_) => RemoteErrorKind::PolicyNotFound,
            PactumError::PolicyViolation(_) => RemoteErrorKind::PolicyViolation,
            PactumError::ConnectionProviderNotFound(_) => RemoteErrorKind::Unsupported,
            _ => RemoteErrorKind::Unknown,
        };
        Self::new(kind, err.to_string())
    }
}
