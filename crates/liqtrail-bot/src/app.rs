//! Feed replay.
//!
//! Plays a JSON-lines feed of `entry` / `tick` / `close` events through the
//! stop dispatcher and plays the order-execution side: every exit signal is
//! logged as a simulated sell, then the position's stop is closed.
//!
//! ```text
//! {"event":"entry","user_id":"1","token_id":"BONK","snapshot":{"price":"100", ...}}
//! {"event":"tick","user_id":"1","token_id":"BONK","snapshot":{"price":"115", ...}}
//! {"event":"close","user_id":"1","token_id":"BONK"}
//! ```

use std::sync::Arc;

use liqtrail_core::{MarketSnapshot, PositionKey, TokenId, UserId};
use liqtrail_registry::{
    spawn_stop_dispatcher, ExitSignal, RegistryError, StopDispatcherHandle, StopRegistry,
};
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::AppConfig;
use crate::error::AppResult;

/// One line of a replay feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ReplayEvent {
    Entry {
        user_id: UserId,
        token_id: TokenId,
        snapshot: MarketSnapshot,
    },
    Tick {
        user_id: UserId,
        token_id: TokenId,
        snapshot: MarketSnapshot,
    },
    Close {
        user_id: UserId,
        token_id: TokenId,
    },
}

/// Counters for one replay run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReplaySummary {
    pub lines: u64,
    pub malformed_lines: u64,
    pub entries: u64,
    pub rejected_entries: u64,
    /// Entries skipped because the user disabled trailing stops.
    pub skipped_entries: u64,
    pub ticks: u64,
    pub closes: u64,
    /// Exit signals acted on with a simulated sell.
    pub exits: u64,
}

/// Drives the dispatcher from a replay feed.
pub struct ReplayRunner {
    config: AppConfig,
    dispatcher: StopDispatcherHandle,
    exit_rx: mpsc::Receiver<ExitSignal>,
    shard_joins: Vec<JoinHandle<()>>,
    summary: ReplaySummary,
}

impl ReplayRunner {
    /// Create a runner and spawn the dispatcher.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(config: AppConfig) -> Self {
        let registry = Arc::new(StopRegistry::new(config.trailing_stop.clone()));
        let (dispatcher, exit_rx, shard_joins) =
            spawn_stop_dispatcher(registry, &config.dispatcher);
        Self {
            config,
            dispatcher,
            exit_rx,
            shard_joins,
            summary: ReplaySummary::default(),
        }
    }

    pub fn dispatcher(&self) -> &StopDispatcherHandle {
        &self.dispatcher
    }

    /// Replay every line of `reader`, then drain remaining exit signals and
    /// shut the dispatcher down.
    pub async fn run<R>(mut self, reader: R) -> AppResult<ReplaySummary>
    where
        R: AsyncBufRead + Unpin,
    {
        let mut lines = reader.lines();

        loop {
            tokio::select! {
                biased;

                Some(signal) = self.exit_rx.recv() => {
                    self.execute_exit(signal).await?;
                }

                line = lines.next_line() => {
                    match line? {
                        Some(line) => self.handle_line(&line).await?,
                        None => break,
                    }
                }
            }
        }

        // Every queued tick has run once flush returns
        self.dispatcher.flush().await?;
        while let Ok(signal) = self.exit_rx.try_recv() {
            self.execute_exit(signal).await?;
        }

        let open = self.dispatcher.registry().statuses();
        for (key, status) in &open {
            info!(
                key = %key,
                phase = %status.phase,
                stop = ?status.trailing_stop_price.map(|p| p.to_string()),
                "Position still open at end of feed"
            );
        }

        self.dispatcher.shutdown().await;
        for join in self.shard_joins.drain(..) {
            if let Err(e) = join.await {
                warn!(error = %e, "Shard task failed");
            }
        }

        info!(summary = ?self.summary, "Replay finished");
        Ok(self.summary)
    }

    async fn handle_line(&mut self, line: &str) -> AppResult<()> {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return Ok(());
        }
        self.summary.lines += 1;

        match serde_json::from_str::<ReplayEvent>(line) {
            Ok(event) => self.handle_event(event).await,
            Err(e) => {
                self.summary.malformed_lines += 1;
                warn!(line = self.summary.lines, error = %e, "Malformed replay line skipped");
                Ok(())
            }
        }
    }

    async fn handle_event(&mut self, event: ReplayEvent) -> AppResult<()> {
        match event {
            ReplayEvent::Entry {
                user_id,
                token_id,
                snapshot,
            } => {
                if !self.config.trailing_stop_enabled(&user_id) {
                    self.summary.skipped_entries += 1;
                    debug!(user = %user_id, token = %token_id, "Trailing stop disabled for user");
                    return Ok(());
                }
                let key = PositionKey::new(user_id, token_id);
                let result = match self.config.trailing_stop_override(&key.user) {
                    Some(config) => {
                        self.dispatcher
                            .enter_with(key.clone(), config.clone(), snapshot)
                            .await
                    }
                    None => self.dispatcher.enter(key.clone(), snapshot).await,
                };
                match result {
                    Ok(entry) => {
                        self.summary.entries += 1;
                        info!(
                            key = %key,
                            stop_pct = %entry.stop_pct,
                            initial_stop = %entry.initial_stop_price,
                            "Position entered"
                        );
                    }
                    Err(RegistryError::Stop(e)) => {
                        self.summary.rejected_entries += 1;
                        warn!(key = %key, error = %e, "Entry rejected");
                    }
                    Err(e) => return Err(e.into()),
                }
            }
            ReplayEvent::Tick {
                user_id,
                token_id,
                snapshot,
            } => {
                self.summary.ticks += 1;
                self.dispatcher
                    .tick(PositionKey::new(user_id, token_id), snapshot)
                    .await?;
            }
            ReplayEvent::Close { user_id, token_id } => {
                let key = PositionKey::new(user_id, token_id);
                self.close(&key).await?;
            }
        }
        Ok(())
    }

    /// Act on an exit signal: simulate the sell, then close the stop.
    async fn execute_exit(&mut self, signal: ExitSignal) -> AppResult<()> {
        self.summary.exits += 1;
        info!(
            key = %signal.key,
            price = %signal.price,
            stop = %signal.trailing_stop_price,
            highest = %signal.highest_price,
            gain_pct = %signal.gain_pct,
            armed = signal.armed,
            "Simulated sell on trailing stop"
        );
        self.close(&signal.key).await
    }

    async fn close(&mut self, key: &PositionKey) -> AppResult<()> {
        match self.dispatcher.close(key).await {
            Ok(status) => {
                self.summary.closes += 1;
                debug!(key = %key, phase = %status.phase, "Trailing stop closed");
                Ok(())
            }
            Err(RegistryError::NotFound(_)) => {
                debug!(key = %key, "Close for position without trailing stop");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}
