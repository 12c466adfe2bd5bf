use thiserror::Error;

/// Errors produced by type operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid guid: {0}")]
    InvalidGuid(String),

    #[error("unknown value kind code: {0}")]
    UnknownKindCode(u32),

    #[error("invalid text runs: {0}")]
    InvalidRuns(String),
}
