//! Pure session classification: no I/O, no shared state.

use chrono::{DateTime, Utc};
use std::collections::HashSet;

use super::{AggregateState, Amnesty, PauseTracker, Session};

/// Classifies one poll response.
///
/// Sessions without a now-playing item are skipped. With amnesty enabled, a
/// session whose last activity is inside the window counts as active, and a
/// paused session keeps counting as streaming until it has been paused for
/// the whole window. With amnesty disabled, paused sessions never count and
/// are never tracked. Tracker entries for ids absent from `sessions` are
/// dropped.
///
/// Returns the aggregate state and the tracker to use on the next poll.
pub fn classify(
    sessions: &[Session],
    tracker: &PauseTracker,
    now: DateTime<Utc>,
    amnesty: Amnesty,
) -> (AggregateState, PauseTracker) {
    let mut tracker = tracker.clone();
    let mut active = false;
    let mut streaming = false;

    let present: HashSet<&str> = sessions.iter().map(|s| s.id.as_str()).collect();

    for session in sessions.iter().filter(|s| s.has_now_playing()) {
        let id = session.id.as_str();
        let title = session.title();

        if let (Amnesty::Window(window), Some(last)) = (amnesty, session.last_activity) {
            if now.signed_duration_since(last) < window {
                tracing::debug!(session = %id, user = ?session.user, %last, "recent activity, counts as active");
                active = true;
            }
        }

        if !session.is_paused {
            streaming = true;
            if tracker.remove(id).is_some() {
                tracing::debug!(session = %id, %title, "no longer paused, removed from paused tracker");
            }
            continue;
        }

        let Amnesty::Window(window) = amnesty else {
            continue;
        };
        match tracker.paused_since(id) {
            None => {
                tracker.insert(id, now);
                tracing::debug!(session = %id, %title, "paused, noted time");
                streaming = true;
            }
            Some(since) if now.signed_duration_since(since) >= window => {
                tracing::debug!(session = %id, %title, %since, "paused for too long");
            }
            Some(_) => streaming = true,
        }
    }

    tracker.retain(|id| present.contains(id));

    (AggregateState::new(active, streaming), tracker)
}
