use thiserror::Error;

pub type RuleResult<T> = Result<T, RuleError>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RuleError {
    #[error("unknown operation '{0}'")]
    UnknownOperation(String),

    #[error("unknown value type '{0}'")]
    UnknownValueType(String),

    #[error("invalid date '{0}'")]
    InvalidDate(String),

    #[error("invalid range '{0}' in date specification")]
    InvalidRange(String),

    #[error("date expression '{0}' needs a start or an end")]
    MissingBound(String),
}
