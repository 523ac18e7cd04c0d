//! Position key to controller mapping.
//!
//! # Locking
//!
//! The map (`DashMap`) is the only shared mutable structure. Each controller
//! sits behind its own `parking_lot::Mutex`, so calls for one key are
//! serialized while distinct keys run in parallel.
//!
//! Lock order is always map shard, then controller. Handles are cloned out of
//! the map before a controller is locked for ticking, so a slow tick never
//! holds a map shard.

use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::Mutex;
use tracing::{debug, info_span};

use liqtrail_core::{MarketSnapshot, PositionKey, TrailingStopConfig};
use liqtrail_stop::{
    EntryResult, StopError, StopPhase, StopResult, StopStatus, TickOutcome,
    TrailingStopController,
};
use liqtrail_telemetry::Metrics;

use crate::error::{RegistryError, RegistryResult};

// ============================================================================
// ControllerHandle
// ============================================================================

/// Shared handle to one position's controller.
///
/// Cloning is cheap; all clones refer to the same controller.
#[derive(Debug, Clone)]
pub struct ControllerHandle {
    key: PositionKey,
    inner: Arc<Mutex<TrailingStopController>>,
}

impl ControllerHandle {
    fn new(key: PositionKey, config: TrailingStopConfig) -> Self {
        Self {
            key,
            inner: Arc::new(Mutex::new(TrailingStopController::new(config))),
        }
    }

    pub fn key(&self) -> &PositionKey {
        &self.key
    }

    pub fn on_entry(&self, snapshot: &MarketSnapshot) -> StopResult<EntryResult> {
        let _span = info_span!("trailing_stop", key = %self.key).entered();
        self.inner.lock().on_entry(snapshot)
    }

    pub fn on_tick(&self, snapshot: &MarketSnapshot) -> StopResult<TickOutcome> {
        let _span = info_span!("trailing_stop", key = %self.key).entered();
        self.inner.lock().on_tick(snapshot)
    }

    pub fn close(&self) -> StopResult<()> {
        let _span = info_span!("trailing_stop", key = %self.key).entered();
        self.inner.lock().close()
    }

    pub fn status(&self) -> StopStatus {
        self.inner.lock().status()
    }

    pub fn phase(&self) -> StopPhase {
        self.inner.lock().phase()
    }

    /// True if both handles refer to the same controller.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

// ============================================================================
// StopRegistry
// ============================================================================

/// Registry of active trailing stops keyed by (user, token).
///
/// Entries are created lazily and removed on close. No entry means no
/// trailing stop for that pair.
#[derive(Debug)]
pub struct StopRegistry {
    entries: DashMap<PositionKey, ControllerHandle>,
    default_config: TrailingStopConfig,
}

impl StopRegistry {
    #[must_use]
    pub fn new(default_config: TrailingStopConfig) -> Self {
        Self {
            entries: DashMap::new(),
            default_config,
        }
    }

    pub fn default_config(&self) -> &TrailingStopConfig {
        &self.default_config
    }

    /// Get the controller for `key`, creating one with the default config.
    ///
    /// Idempotent: an existing controller is returned as is, never reset.
    pub fn get_or_create(&self, key: &PositionKey) -> ControllerHandle {
        self.get_or_create_with(key, || self.default_config.clone())
    }

    /// Get the controller for `key`, creating one with a position-specific
    /// config. `config` is only called if the key is absent.
    pub fn get_or_create_with<F>(&self, key: &PositionKey, config: F) -> ControllerHandle
    where
        F: FnOnce() -> TrailingStopConfig,
    {
        if let Some(existing) = self.entries.get(key) {
            return existing.value().clone();
        }
        match self.entries.entry(key.clone()) {
            Entry::Occupied(occupied) => occupied.get().clone(),
            Entry::Vacant(vacant) => {
                debug!(key = %key, "Trailing stop controller created");
                Metrics::active_stops_inc();
                let handle = ControllerHandle::new(key.clone(), config());
                vacant.insert(handle).value().clone()
            }
        }
    }

    pub fn get(&self, key: &PositionKey) -> Option<ControllerHandle> {
        self.entries.get(key).map(|entry| entry.value().clone())
    }

    /// Remove the controller for `key` without closing it.
    ///
    /// Existing handles stay usable; later `get_or_create` calls get a fresh
    /// controller.
    pub fn remove(&self, key: &PositionKey) -> RegistryResult<ControllerHandle> {
        match self.entries.remove(key) {
            Some((_, handle)) => {
                Metrics::active_stops_dec();
                debug!(key = %key, "Trailing stop controller removed");
                Ok(handle)
            }
            None => Err(RegistryError::NotFound(key.clone())),
        }
    }

    /// Close the controller for `key` and remove it.
    ///
    /// The controller is unregistered before it is closed, so the one closed
    /// is exactly the one removed and a racing re-entry gets a fresh
    /// controller. Ticks already holding a handle see `Inactive` from here on.
    /// A controller that was never entered is removed as well. Returns the
    /// final status.
    pub fn close_and_remove(&self, key: &PositionKey) -> RegistryResult<StopStatus> {
        let handle = self.remove(key)?;
        match handle.close() {
            Ok(()) | Err(StopError::NotEntered) => {}
            Err(e) => return Err(e.into()),
        }
        Ok(handle.status())
    }

    /// Remove `key` only if its controller was never entered.
    ///
    /// Used to drop a lazily created controller after a rejected entry.
    pub fn discard_uninitialized(&self, key: &PositionKey) -> bool {
        let removed = self
            .entries
            .remove_if(key, |_, handle| handle.phase() == StopPhase::Uninitialized)
            .is_some();
        if removed {
            Metrics::active_stops_dec();
        }
        removed
    }

    pub fn contains(&self, key: &PositionKey) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Status of every registered controller, sorted by key.
    pub fn statuses(&self) -> Vec<(PositionKey, StopStatus)> {
        let handles: Vec<ControllerHandle> =
            self.entries.iter().map(|entry| entry.value().clone()).collect();
        let mut statuses: Vec<_> = handles
            .into_iter()
            .map(|handle| (handle.key.clone(), handle.status()))
            .collect();
        statuses.sort_by(|a, b| a.0.cmp(&b.0));
        statuses
    }
}

impl Default for StopRegistry {
    fn default() -> Self {
        Self::new(TrailingStopConfig::default())
    }
}

// ============================================================================
// Tests
// ============================================================================
