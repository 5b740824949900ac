//! Error types for the core data model.

use thiserror::Error;

/// Result type alias for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors raised while parsing core values or building a working set.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error("invalid score '{0}'")]
    InvalidScore(String),

    #[error("invalid role '{0}'")]
    InvalidRole(String),

    #[error("invalid timestamp '{0}'")]
    InvalidTimestamp(String),

    #[error("duplicate resource id: {0}")]
    DuplicateResource(String),

    #[error("duplicate node id: {0}")]
    DuplicateNode(String),

    #[error("resource '{rsc}' references unknown node '{node}'")]
    UnknownNode { rsc: String, node: String },

    #[error("clone instance '{0}' must carry a ':<n>' suffix")]
    InvalidInstanceId(String),
}
