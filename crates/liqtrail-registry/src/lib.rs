//! Trailing stop registry and tick dispatch.
//!
//! # Key Components
//!
//! - [`StopRegistry`]: concurrent map from position key to controller
//! - [`ControllerHandle`]: shared, lock-serialized access to one controller
//! - [`StopDispatcherHandle`]: routes entries and ticks to sharded actor tasks
//!   so one key is always processed by one task, in arrival order
//! - [`ExitSignal`]: emitted once per position when its stop is breached

pub mod dispatcher;
pub mod error;
pub mod registry;

pub use dispatcher::{
    spawn_stop_dispatcher, DispatcherConfig, ExitSignal, StopDispatcherHandle, StopShardMsg,
};
pub use error::{RegistryError, RegistryResult};
pub use registry::{ControllerHandle, StopRegistry};
