//! Playback session model and the classifier that reduces a poll response
//! to an [`AggregateState`].
//!
//! Flow per poll: Jellyfin records → [`Session`] → [`classify`] →
//! ([`AggregateState`], updated [`PauseTracker`]).

mod classify;

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;

pub use classify::classify;

/// One playback context reported by the media server for the current poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    /// Stable identifier, unique within one poll response.
    pub id: String,
    /// User name, diagnostics only.
    pub user: Option<String>,
    /// Name of the now-playing item. `None` means nothing is playing and the
    /// session is ignored by the classifier.
    pub now_playing: Option<String>,
    pub is_paused: bool,
    /// Last observed activity; `None` when the server sent no usable value.
    pub last_activity: Option<DateTime<Utc>>,
}

impl Session {
    pub fn has_now_playing(&self) -> bool {
        self.now_playing.is_some()
    }

    /// Display name for log lines.
    pub fn title(&self) -> &str {
        self.now_playing.as_deref().unwrap_or("<nothing>")
    }
}

/// Aggregate playback state published by the poller and read by the
/// reconciliation loop. Both flags always travel together.
///
/// Invariant: `is_streaming` implies `has_active_session`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AggregateState {
    pub has_active_session: bool,
    pub is_streaming: bool,
}

impl AggregateState {
    pub const IDLE: AggregateState = AggregateState {
        has_active_session: false,
        is_streaming: false,
    };

    /// Builds a state, forcing `has_active_session` when streaming.
    pub fn new(has_active_session: bool, is_streaming: bool) -> Self {
        Self {
            has_active_session: has_active_session || is_streaming,
            is_streaming,
        }
    }
}

/// Activity/pause amnesty window. `-1` in configuration disables it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Amnesty {
    Disabled,
    Window(Duration),
}

impl Amnesty {
    /// Maps the configured seconds value; any negative value disables amnesty.
    pub fn from_secs(secs: i64) -> Self {
        if secs < 0 {
            Amnesty::Disabled
        } else {
            Amnesty::Window(Duration::seconds(secs))
        }
    }

    pub fn is_enabled(&self) -> bool {
        matches!(self, Amnesty::Window(_))
    }
}

/// Session id → time the session was first observed paused.
///
/// Owned by the poller; only entries for sessions present in the latest
/// poll response survive a classification pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PauseTracker {
    paused_since: HashMap<String, DateTime<Utc>>,
}

impl PauseTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn paused_since(&self, session_id: &str) -> Option<DateTime<Utc>> {
        self.paused_since.get(session_id).copied()
    }

    pub fn len(&self) -> usize {
        self.paused_since.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paused_since.is_empty()
    }

    pub(crate) fn insert(&mut self, session_id: &str, at: DateTime<Utc>) {
        self.paused_since.insert(session_id.to_string(), at);
    }

    pub(crate) fn remove(&mut self, session_id: &str) -> Option<DateTime<Utc>> {
        self.paused_since.remove(session_id)
    }

    pub(crate) fn retain(&mut self, mut keep: impl FnMut(&str) -> bool) {
        self.paused_since.retain(|id, _| {
            let kept = keep(id);
            if !kept {
                tracing::debug!(
                    session = %id,
                    "removing from paused tracker, no longer in session list"
                );
            }
            kept
        });
    }
}
