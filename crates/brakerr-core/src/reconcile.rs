//! Reconciliation loop: wakes on [`ChangeSignal`], reads the latest
//! [`AggregateState`], maps it to a speed tier and applies it once.

use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::error::ApplyError;
use crate::session::AggregateState;
use crate::signal::{ChangeSignal, StateCell};

/// A limit update that did not go through, with the tier it was meant for.
#[derive(Debug, thiserror::Error)]
#[error("failed to apply {tier} tier ({kib} KiB/s): {error}")]
pub struct FailedApply {
    pub tier: Tier,
    pub kib: u64,
    #[source]
    pub error: ApplyError,
}

/// Bounded wait on the change signal; keeps the loop responsive to shutdown.
pub const WAIT_TIMEOUT: Duration = Duration::from_millis(200);

/// Something that can cap the transfer rate of a download client.
#[async_trait]
pub trait RateLimiter: Send + Sync {
    /// Short label for log lines, e.g. `qbit|http://host:8080`.
    fn describe(&self) -> String;

    /// Applies a limit in KiB/s; 0 removes the cap.
    async fn set_limit(&self, kib: u64) -> Result<(), ApplyError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    Streaming,
    Active,
    Idle,
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Tier::Streaming => "streaming",
            Tier::Active => "active",
            Tier::Idle => "idle",
        };
        f.write_str(s)
    }
}

/// Limit per tier, in KiB/s.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpeedTiers {
    pub streaming: u64,
    pub active: u64,
    pub idle: u64,
}

impl SpeedTiers {
    /// An unset active tier uses the streaming limit.
    pub fn new(streaming: u64, active: Option<u64>, idle: u64) -> Self {
        Self {
            streaming,
            active: active.unwrap_or(streaming),
            idle,
        }
    }

    /// Streaming wins over active, active over idle.
    pub fn select(&self, state: AggregateState) -> (Tier, u64) {
        if state.is_streaming {
            (Tier::Streaming, self.streaming)
        } else if state.has_active_session {
            (Tier::Active, self.active)
        } else {
            (Tier::Idle, self.idle)
        }
    }
}

/// Consumer side of the poller. Sole caller of its [`RateLimiter`].
pub struct ReconciliationLoop<L> {
    limiter: L,
    tiers: SpeedTiers,
    state: Arc<StateCell>,
    signal: Arc<ChangeSignal>,
    wait_timeout: Duration,
    last_applied: Option<Tier>,
    applied: u64,
}

impl<L: RateLimiter> ReconciliationLoop<L> {
    pub fn new(
        limiter: L,
        tiers: SpeedTiers,
        state: Arc<StateCell>,
        signal: Arc<ChangeSignal>,
    ) -> Self {
        Self {
            limiter,
            tiers,
            state,
            signal,
            wait_timeout: WAIT_TIMEOUT,
            last_applied: None,
            applied: 0,
        }
    }

    pub fn with_wait_timeout(mut self, timeout: Duration) -> Self {
        self.wait_timeout = timeout;
        self
    }

    /// Tier of the last successful update.
    pub fn last_applied(&self) -> Option<Tier> {
        self.last_applied
    }

    /// Number of successful updates.
    pub fn applied_count(&self) -> u64 {
        self.applied
    }

    /// Reads the current state and issues exactly one limit update.
    pub async fn reconcile_once(&mut self) -> Result<Tier, FailedApply> {
        let state = self.state.snapshot();
        let (tier, kib) = self.tiers.select(state);
        if let Err(error) = self.limiter.set_limit(kib).await {
            return Err(FailedApply { tier, kib, error });
        }

        match tier {
            Tier::Streaming => tracing::info!(%tier, kib, "streaming detected, setting speed to {} KiB/s", kib),
            Tier::Active => tracing::info!(%tier, kib, "active session detected, setting speed to {} KiB/s", kib),
            Tier::Idle => tracing::info!(%tier, kib, "no active sessions, setting speed to {} KiB/s", kib),
        }
        if let Some(prev) = self.last_applied.filter(|prev| *prev != tier) {
            tracing::debug!(from = %prev, to = %tier, "tier transition");
        }
        self.last_applied = Some(tier);
        self.applied += 1;
        Ok(tier)
    }

    /// Runs until `cancel` fires. Apply failures are logged and not retried;
    /// the next signal retries implicitly.
    pub async fn run(&mut self, cancel: CancellationToken) {
        tracing::info!(target_client = %self.limiter.describe(), "waiting for update events");
        loop {
            let woke = tokio::select! {
                _ = cancel.cancelled() => break,
                woke = self.signal.wait_timeout(self.wait_timeout) => woke,
            };
            if !woke {
                continue;
            }

            tracing::info!("update event triggered");
            match self.reconcile_once().await {
                Ok(_) => tracing::info!("speed limit updated, waiting for next update event"),
                Err(e) => tracing::error!(
                    target_client = %self.limiter.describe(),
                    tier = %e.tier,
                    kib = e.kib,
                    "failed to apply speed limit: {}",
                    e.error
                ),
            }
        }
        tracing::info!(applied = self.applied, "reconciliation loop stopped");
    }
}
