//! Sharded tick dispatcher.
//!
//! Fans entries and ticks out to `N` shard tasks. A position key is always
//! routed to shard `hash(key) % N`, so one task applies every tick for that
//! key in arrival order while distinct keys progress in parallel.
//!
//! # Architecture
//!
//! ```text
//! price feed ──► StopDispatcherHandle::tick(key, snapshot)
//!                        │ hash(key) % N
//!                        ▼
//!                 StopShardTask[i] ──► StopRegistry ──► TrailingStopController
//!                        │ exit = true (once per key)
//!                        ▼
//!                 exit_tx.try_send(ExitSignal) ──► order-execution consumer
//!                                                        │
//!                              StopDispatcherHandle::close(key) ◄──┘
//! ```
//!
//! The dispatcher never executes trades. The consumer of [`ExitSignal`]s
//! sells the position and then calls [`StopDispatcherHandle::close`].

use std::collections::hash_map::DefaultHasher;
use std::collections::{HashMap, HashSet};
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

use liqtrail_core::{MarketSnapshot, PositionKey, Price, TrailingStopConfig};
use liqtrail_stop::{EntryResult, StopError, StopStatus, TickOutcome, TickResult};
use liqtrail_telemetry::Metrics;

use crate::error::{RegistryError, RegistryResult};
use crate::registry::StopRegistry;

// ============================================================================
// Configuration
// ============================================================================

/// Dispatcher sizing and alerting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatcherConfig {
    /// Number of shard tasks.
    #[serde(default = "default_shards")]
    pub shards: usize,

    /// Inbound queue capacity per shard.
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,

    /// Exit signal queue capacity.
    #[serde(default = "default_exit_channel_capacity")]
    pub exit_channel_capacity: usize,

    /// Consecutive invalid snapshots for one key before a feed alert.
    #[serde(default = "default_invalid_snapshot_alert_threshold")]
    pub invalid_snapshot_alert_threshold: u32,
}

fn default_shards() -> usize {
    4
}

fn default_channel_capacity() -> usize {
    1024
}

fn default_exit_channel_capacity() -> usize {
    256
}

fn default_invalid_snapshot_alert_threshold() -> u32 {
    5
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            shards: default_shards(),
            channel_capacity: default_channel_capacity(),
            exit_channel_capacity: default_exit_channel_capacity(),
            invalid_snapshot_alert_threshold: default_invalid_snapshot_alert_threshold(),
        }
    }
}

// ============================================================================
// ExitSignal
// ============================================================================

/// A breached trailing stop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExitSignal {
    pub key: PositionKey,
    /// Price of the tick that breached the stop.
    pub price: Price,
    pub trailing_stop_price: Price,
    pub highest_price: Price,
    pub armed: bool,
    /// Gain of the high-water mark over entry.
    pub gain_pct: Decimal,
    pub triggered_at: DateTime<Utc>,
}

impl ExitSignal {
    fn from_tick(key: PositionKey, result: &TickResult) -> Self {
        Self {
            key,
            price: result.current_price,
            trailing_stop_price: result.trailing_stop_price,
            highest_price: result.highest_price,
            armed: result.armed,
            gain_pct: result.gain_pct,
            triggered_at: Utc::now(),
        }
    }
}

// ============================================================================
// StopShardMsg
// ============================================================================

/// Messages for a shard task.
#[derive(Debug)]
pub enum StopShardMsg {
    /// Enter a position. `config` overrides the registry default.
    Entry {
        key: PositionKey,
        config: Option<TrailingStopConfig>,
        snapshot: MarketSnapshot,
        reply: oneshot::Sender<RegistryResult<EntryResult>>,
    },

    /// Apply a price tick.
    Tick {
        key: PositionKey,
        snapshot: MarketSnapshot,
    },

    /// Drop per-key bookkeeping after a close.
    Forget(PositionKey),

    /// Reply once every earlier message on this shard is processed.
    Flush(oneshot::Sender<()>),

    /// Graceful shutdown.
    Shutdown,
}

// ============================================================================
// StopShardTask
// ============================================================================

/// One shard of the dispatcher.
///
/// Owns the per-key bookkeeping for the keys routed to it; controller state
/// lives in the shared registry.
struct StopShardTask {
    shard: usize,
    rx: mpsc::Receiver<StopShardMsg>,
    registry: Arc<StopRegistry>,
    exit_tx: mpsc::Sender<ExitSignal>,
    /// Keys that already emitted an exit signal.
    signalled: HashSet<PositionKey>,
    /// Consecutive invalid snapshots per key.
    invalid_streaks: HashMap<PositionKey, u32>,
    alert_threshold: u32,
}

impl StopShardTask {
    async fn run(mut self) {
        debug!(shard = self.shard, "StopShardTask started");

        while let Some(msg) = self.rx.recv().await {
            match msg {
                StopShardMsg::Shutdown => {
                    debug!(shard = self.shard, "StopShardTask shutting down");
                    break;
                }
                msg => self.handle_message(msg),
            }
        }

        debug!(shard = self.shard, "StopShardTask terminated");
    }

    fn handle_message(&mut self, msg: StopShardMsg) {
        match msg {
            StopShardMsg::Entry {
                key,
                config,
                snapshot,
                reply,
            } => {
                let result = self.on_entry(&key, config, &snapshot);
                if reply.send(result).is_err() {
                    trace!(key = %key, "Entry caller went away before reply");
                }
            }
            StopShardMsg::Tick { key, snapshot } => self.on_tick(key, &snapshot),
            StopShardMsg::Forget(key) => {
                self.signalled.remove(&key);
                self.invalid_streaks.remove(&key);
            }
            StopShardMsg::Flush(reply) => {
                let _ = reply.send(());
            }
            StopShardMsg::Shutdown => {}
        }
    }

    fn on_entry(
        &mut self,
        key: &PositionKey,
        config: Option<TrailingStopConfig>,
        snapshot: &MarketSnapshot,
    ) -> RegistryResult<EntryResult> {
        let handle = match config {
            Some(config) => self.registry.get_or_create_with(key, || config),
            None => self.registry.get_or_create(key),
        };

        match handle.on_entry(snapshot) {
            Ok(entry) => {
                self.signalled.remove(key);
                self.invalid_streaks.remove(key);
                Metrics::entry(
                    entry.stop_pct.to_f64().unwrap_or_default(),
                    entry.used_fallback,
                );
                Ok(entry)
            }
            Err(e) => {
                if matches!(e, StopError::InvalidSnapshot(_)) {
                    Metrics::invalid_snapshot("entry");
                }
                warn!(key = %key, error = %e, "Trailing stop entry rejected");
                self.registry.discard_uninitialized(key);
                Err(e.into())
            }
        }
    }

    fn on_tick(&mut self, key: PositionKey, snapshot: &MarketSnapshot) {
        let Some(handle) = self.registry.get(&key) else {
            trace!(key = %key, "Tick for position without trailing stop");
            Metrics::tick("untracked");
            return;
        };

        match handle.on_tick(snapshot) {
            Ok(TickOutcome::Active(result)) => {
                self.invalid_streaks.remove(&key);
                if result.just_armed {
                    Metrics::armed();
                }
                if result.vol_spike {
                    Metrics::vol_spike();
                }
                if result.exit {
                    Metrics::tick("exit");
                    if self.signalled.insert(key.clone()) {
                        self.emit_exit(ExitSignal::from_tick(key, &result));
                    }
                } else {
                    Metrics::tick("hold");
                }
            }
            Ok(TickOutcome::Inactive) => {
                Metrics::tick("inactive");
            }
            Err(StopError::InvalidSnapshot(reason)) => {
                Metrics::invalid_snapshot("tick");
                Metrics::tick("rejected");
                let streak = self.invalid_streaks.entry(key.clone()).or_insert(0);
                *streak += 1;
                if *streak == self.alert_threshold {
                    warn!(
                        key = %key,
                        streak = *streak,
                        reason = %reason,
                        "Repeated invalid snapshots, feed may be broken"
                    );
                } else {
                    debug!(key = %key, reason = %reason, "Invalid snapshot rejected");
                }
            }
            Err(e) => {
                Metrics::tick("rejected");
                warn!(key = %key, error = %e, "Tick rejected");
            }
        }
    }

    fn emit_exit(&mut self, signal: ExitSignal) {
        info!(
            key = %signal.key,
            price = %signal.price,
            stop = %signal.trailing_stop_price,
            "Exit signal"
        );

        // Non-blocking send
        match self.exit_tx.try_send(signal) {
            Ok(()) => Metrics::exit_sent(),
            Err(mpsc::error::TrySendError::Full(signal)) => {
                warn!(key = %signal.key, "Exit channel full, signal dropped");
                Metrics::exit_dropped();
                // Let the next breaching tick retry
                self.signalled.remove(&signal.key);
            }
            Err(mpsc::error::TrySendError::Closed(signal)) => {
                warn!(key = %signal.key, "Exit channel closed, signal dropped");
                Metrics::exit_dropped();
            }
        }
    }
}

// ============================================================================
// StopDispatcherHandle
// ============================================================================

/// Handle for routing work to the shard tasks.
#[derive(Clone)]
pub struct StopDispatcherHandle {
    shards: Arc<[mpsc::Sender<StopShardMsg>]>,
    registry: Arc<StopRegistry>,
}

impl StopDispatcherHandle {
    pub fn registry(&self) -> &Arc<StopRegistry> {
        &self.registry
    }

    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }

    /// Shard index for a key.
    pub fn shard_for(&self, key: &PositionKey) -> usize {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        (hasher.finish() % self.shards.len() as u64) as usize
    }

    fn sender(&self, key: &PositionKey) -> &mpsc::Sender<StopShardMsg> {
        &self.shards[self.shard_for(key)]
    }

    /// Enter a position with the registry's default config.
    pub async fn enter(
        &self,
        key: PositionKey,
        snapshot: MarketSnapshot,
    ) -> RegistryResult<EntryResult> {
        self.send_entry(key, None, snapshot).await
    }

    /// Enter a position with its own config.
    pub async fn enter_with(
        &self,
        key: PositionKey,
        config: TrailingStopConfig,
        snapshot: MarketSnapshot,
    ) -> RegistryResult<EntryResult> {
        self.send_entry(key, Some(config), snapshot).await
    }

    async fn send_entry(
        &self,
        key: PositionKey,
        config: Option<TrailingStopConfig>,
        snapshot: MarketSnapshot,
    ) -> RegistryResult<EntryResult> {
        let (reply, rx) = oneshot::channel();
        self.sender(&key)
            .send(StopShardMsg::Entry {
                key,
                config,
                snapshot,
                reply,
            })
            .await
            .map_err(|_| RegistryError::DispatcherClosed)?;
        rx.await.map_err(|_| RegistryError::DispatcherClosed)?
    }

    /// Queue a tick. Ticks for one key are applied in the order queued.
    pub async fn tick(&self, key: PositionKey, snapshot: MarketSnapshot) -> RegistryResult<()> {
        self.sender(&key)
            .send(StopShardMsg::Tick { key, snapshot })
            .await
            .map_err(|_| RegistryError::DispatcherClosed)
    }

    /// Close and remove a position's stop.
    ///
    /// Takes effect immediately: ticks still queued for the key become no-ops.
    /// Returns the final status.
    pub async fn close(&self, key: &PositionKey) -> RegistryResult<StopStatus> {
        let status = self.registry.close_and_remove(key)?;
        self.sender(key)
            .send(StopShardMsg::Forget(key.clone()))
            .await
            .map_err(|_| RegistryError::DispatcherClosed)?;
        Ok(status)
    }

    /// Current status of a position's stop.
    pub fn status(&self, key: &PositionKey) -> RegistryResult<StopStatus> {
        self.registry
            .get(key)
            .map(|handle| handle.status())
            .ok_or_else(|| RegistryError::NotFound(key.clone()))
    }

    /// Wait until every shard has processed all messages queued so far.
    pub async fn flush(&self) -> RegistryResult<()> {
        for tx in self.shards.iter() {
            let (reply, rx) = oneshot::channel();
            tx.send(StopShardMsg::Flush(reply))
                .await
                .map_err(|_| RegistryError::DispatcherClosed)?;
            rx.await.map_err(|_| RegistryError::DispatcherClosed)?;
        }
        Ok(())
    }

    /// Request graceful shutdown of every shard.
    ///
    /// Messages queued before the shutdown are processed first.
    pub async fn shutdown(&self) {
        for tx in self.shards.iter() {
            let _ = tx.send(StopShardMsg::Shutdown).await;
        }
    }
}

// ============================================================================
// Spawn function
// ============================================================================

/// Spawn the dispatcher shard tasks.
///
/// Returns the handle, the exit signal receiver, and the shard join handles.
#[must_use]
pub fn spawn_stop_dispatcher(
    registry: Arc<StopRegistry>,
    config: &DispatcherConfig,
) -> (
    StopDispatcherHandle,
    mpsc::Receiver<ExitSignal>,
    Vec<JoinHandle<()>>,
) {
    let shard_count = config.shards.max(1);
    let (exit_tx, exit_rx) = mpsc::channel(config.exit_channel_capacity.max(1));

    let mut senders = Vec::with_capacity(shard_count);
    let mut joins = Vec::with_capacity(shard_count);
    for shard in 0..shard_count {
        let (tx, rx) = mpsc::channel(config.channel_capacity.max(1));
        let task = StopShardTask {
            shard,
            rx,
            registry: registry.clone(),
            exit_tx: exit_tx.clone(),
            signalled: HashSet::new(),
            invalid_streaks: HashMap::new(),
            alert_threshold: config.invalid_snapshot_alert_threshold.max(1),
        };
        senders.push(tx);
        joins.push(tokio::spawn(task.run()));
    }

    info!(
        shards = shard_count,
        channel_capacity = config.channel_capacity,
        "Stop dispatcher started"
    );

    let handle = StopDispatcherHandle {
        shards: senders.into(),
        registry,
    };
    (handle, exit_rx, joins)
}

// ============================================================================
// Tests
// ============================================================================
