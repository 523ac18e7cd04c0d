//! Registry error types.

use liqtrail_core::PositionKey;
use liqtrail_stop::StopError;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("No trailing stop registered for {0}")]
    NotFound(PositionKey),

    #[error(transparent)]
    Stop(#[from] StopError),

    #[error("Stop dispatcher is shut down")]
    DispatcherClosed,
}

pub type RegistryResult<T> = Result<T, RegistryError>;
