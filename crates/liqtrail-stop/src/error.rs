//! Stop engine error types.

use liqtrail_core::CoreError;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StopError {
    #[error("Invalid snapshot: {0}")]
    InvalidSnapshot(String),

    #[error("Trailing stop not entered: on_entry must be called first")]
    NotEntered,

    #[error("Trailing stop already entered")]
    AlreadyEntered,

    #[error("Arithmetic overflow: {0}")]
    Arithmetic(String),
}

impl From<CoreError> for StopError {
    fn from(e: CoreError) -> Self {
        match e {
            CoreError::InvalidSnapshot(msg) => Self::InvalidSnapshot(msg),
            other => Self::InvalidSnapshot(other.to_string()),
        }
    }
}

pub type StopResult<T> = Result<T, StopError>;
