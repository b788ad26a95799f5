//! Session poller: fetches sessions on a fixed period, classifies them and
//! publishes the aggregate state when it changes.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::error::FetchError;
use crate::session::{self, AggregateState, Amnesty, PauseTracker, Session};
use crate::signal::{ChangeSignal, StateCell};

/// Where playback sessions come from.
#[async_trait]
pub trait SessionSource: Send + Sync {
    /// Short label for log lines, e.g. `jellyfin|http://host:8096`.
    fn describe(&self) -> String;

    async fn fetch(&self) -> Result<Vec<Session>, FetchError>;
}

/// Producer side. Owns the pause tracker and the last published state.
pub struct SessionPoller<S> {
    source: S,
    interval: Duration,
    amnesty: Amnesty,
    tracker: PauseTracker,
    last_published: AggregateState,
    state: Arc<StateCell>,
    signal: Arc<ChangeSignal>,
}

impl<S: SessionSource> SessionPoller<S> {
    pub fn new(
        source: S,
        interval: Duration,
        amnesty: Amnesty,
        state: Arc<StateCell>,
        signal: Arc<ChangeSignal>,
    ) -> Self {
        let last_published = state.snapshot();
        Self {
            source,
            interval,
            amnesty,
            tracker: PauseTracker::new(),
            last_published,
            state,
            signal,
        }
    }

    pub fn tracker(&self) -> &PauseTracker {
        &self.tracker
    }

    pub fn last_published(&self) -> AggregateState {
        self.last_published
    }

    /// One tick: fetch, classify at `now`, publish and signal on change.
    /// Returns the newly published state, or `None` when nothing changed.
    /// On fetch failure nothing is modified.
    pub async fn poll_once(
        &mut self,
        now: DateTime<Utc>,
    ) -> Result<Option<AggregateState>, FetchError> {
        let sessions = self.source.fetch().await?;
        let (state, tracker) = session::classify(&sessions, &self.tracker, now, self.amnesty);
        self.tracker = tracker;

        if state == self.last_published {
            return Ok(None);
        }
        tracing::debug!(
            source = %self.source.describe(),
            sessions = sessions.len(),
            from = ?self.last_published,
            to = ?state,
            "aggregate state changed"
        );
        self.last_published = state;
        self.state.publish(state);
        self.signal.set();
        Ok(Some(state))
    }

    /// Polls until `cancel` fires. Fetch failures are logged and retried on
    /// the next tick; the sleep between ticks is interruptible.
    pub async fn run(mut self, cancel: CancellationToken) {
        let source = self.source.describe();
        tracing::info!(%source, interval_secs = self.interval.as_secs_f64(), "session poller started");
        loop {
            let result = tokio::select! {
                _ = cancel.cancelled() => break,
                r = self.poll_once(Utc::now()) => r,
            };
            if let Err(e) = result {
                tracing::error!(%source, "error getting sessions: {}", e);
            }

            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(self.interval) => {}
            }
        }
        tracing::info!(%source, "session poller stopped");
    }
}
