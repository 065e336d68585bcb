//! Error types for the tracker client

use crate::resource::types::ResourceId;
use crate::shared::types::account::Role;

use std::fmt;
use thiserror::Error;

/// A single field-scoped validation failure
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldError {
    pub field: String,
    pub message: String
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> FieldError {
        FieldError { field: field.into(), message: message.into() }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

fn join_field_errors(errors: &[FieldError]) -> String {
    errors.iter().map(|e| e.to_string()).collect::<Vec<_>>().join("; ")
}

/// Tracker client error type
#[derive(Debug, Error)]
pub enum Error {
    /// Local input rejected before any network call
    #[error("Validation failed: {}", join_field_errors(.0))]
    Validation(Vec<FieldError>),

    /// Action attempted below the required role
    #[error("Requires {required} role, current role is {current}")]
    PermissionDenied { required: Role, current: Role },

    /// Server answered 403
    #[error("Access denied")]
    AccessDenied,

    /// Structured server rejection, message kept verbatim
    #[error("{0}")]
    Rejected(String),

    /// Transport failure or non-2xx without a structured body
    #[error("Request failed: {0}")]
    Network(String),

    /// Same control submitted twice
    #[error("{0} is already in progress")]
    InFlight(String),

    #[error("Resource {0} is not in the cache")]
    NotFound(ResourceId),

    #[error("Config error: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Field errors for a validation failure, empty otherwise
    pub fn field_errors(&self) -> &[FieldError] {
        match self {
            Error::Validation(errors) => errors,
            _ => &[]
        }
    }

    /// Whether the failure happened before anything was sent
    pub fn is_local(&self) -> bool {
        matches!(self, Error::Validation(_) | Error::PermissionDenied { .. } | Error::InFlight(_))
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::Network(err.to_string())
    }
}

/// Result type for tracker operations
pub type Result<T> = std::result::Result<T, Error>;
