//! Errors that drop a single constraint.
//!
//! None of these are fatal: the walker records each as a configuration
//! diagnostic and moves on to the next constraint.

use thiserror::Error;

pub type ConstraintResult<T> = Result<T, ConstraintError>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConstraintError {
    #[error("constraint '{constraint}' is missing required attribute '{attribute}'")]
    MissingAttribute {
        constraint: String,
        attribute: &'static str,
    },

    #[error("constraint '{constraint}' has a resource set without an id")]
    MissingSetId { constraint: String },

    #[error("constraint '{constraint}' references unknown resource '{rsc}'")]
    UnknownResource { constraint: String, rsc: String },

    #[error("constraint '{constraint}' references '{reference}', which is neither a resource nor a tag")]
    InvalidReference {
        constraint: String,
        reference: String,
    },

    #[error("tag or template '{0}' does not refer to any resource")]
    EmptyTag(String),

    #[error("constraint '{constraint}' colocates two tags or templates")]
    TagToTagColocation { constraint: String },

    #[error("constraint '{constraint}' uses instance '{instance}' of '{rsc}', which is not a clone")]
    InstanceOfNonClone {
        constraint: String,
        rsc: String,
        instance: String,
    },

    #[error("constraint '{constraint}' references unknown instance '{instance}' of '{rsc}'")]
    UnknownInstance {
        constraint: String,
        rsc: String,
        instance: String,
    },

    #[error("constraint '{constraint}' has invalid role '{role}'")]
    InvalidRole { constraint: String, role: String },

    #[error("constraint '{constraint}' has invalid pattern '{pattern}': {reason}")]
    InvalidPattern {
        constraint: String,
        pattern: String,
        reason: String,
    },

    #[error("location constraint '{0}' has neither a node and score nor any rules")]
    NoRules(String),
}
