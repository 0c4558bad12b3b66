//! Client-facing status taxonomy of query operations.

use std::fmt;

use directory_schema::ManifestError;
use thiserror::Error;

use crate::escape::EscapeError;
use crate::planner::PlanError;
use crate::store::StoreError;

/// Status category of a failed query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Code {
    /// The request is missing a required field or carries a malformed one.
    InvalidArgument,
    /// The requested entity does not exist, or no variant fits the device.
    NotFound,
    /// Stored data is broken or a collaborator failed.
    Internal,
}

impl Code {
    /// Canonical upper-case name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidArgument => "INVALID_ARGUMENT",
            Self::NotFound => "NOT_FOUND",
            Self::Internal => "INTERNAL",
        }
    }
}

impl fmt::Display for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failed query: a status code and a human-readable message.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{code}: {message}")]
pub struct Status {
    /// Category.
    pub code: Code,
    /// Description for the client.
    pub message: String,
}

impl Status {
    fn new(code: Code, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// An `INVALID_ARGUMENT` status.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::new(Code::InvalidArgument, message)
    }

    /// A `NOT_FOUND` status.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(Code::NotFound, message)
    }

    /// An `INTERNAL` status.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(Code::Internal, message)
    }
}

impl From<StoreError> for Status {
    fn from(err: StoreError) -> Self {
        Self::internal(err.to_string())
    }
}

impl From<ManifestError> for Status {
    fn from(err: ManifestError) -> Self {
        Self::internal(err.to_string())
    }
}

impl From<PlanError> for Status {
    fn from(err: PlanError) -> Self {
        Self::internal(err.to_string())
    }
}

impl From<EscapeError> for Status {
    fn from(err: EscapeError) -> Self {
        Self::internal(err.to_string())
    }
}
