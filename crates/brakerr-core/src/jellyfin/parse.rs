//! Decoding of the Jellyfin `/Sessions` payload.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::session::Session;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawSession {
    id: String,
    #[serde(default)]
    user_name: Option<String>,
    #[serde(default)]
    last_activity_date: Option<String>,
    #[serde(default)]
    now_playing_item: Option<RawItem>,
    #[serde(default)]
    play_state: Option<RawPlayState>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawItem {
    #[serde(default)]
    name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawPlayState {
    #[serde(default)]
    is_paused: bool,
}

impl From<RawSession> for Session {
    fn from(raw: RawSession) -> Self {
        Session {
            last_activity: raw.last_activity_date.as_deref().and_then(parse_timestamp),
            now_playing: raw
                .now_playing_item
                .map(|item| item.name.unwrap_or_else(|| "<untitled>".to_string())),
            is_paused: raw.play_state.unwrap_or_default().is_paused,
            user: raw.user_name,
            id: raw.id,
        }
    }
}

/// Parses `2024-11-04T08:45:39.9536253Z`-style timestamps (RFC 3339, any
/// number of fractional digits). Unparseable values yield `None`.
fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    match DateTime::parse_from_rfc3339(value) {
        Ok(t) => Some(t.with_timezone(&Utc)),
        Err(e) => {
            tracing::debug!(source = "jellyfin", value, "unparseable LastActivityDate: {}", e);
            None
        }
    }
}

/// Decodes a `/Sessions` response body.
pub fn parse_sessions(body: &[u8]) -> Result<Vec<Session>, serde_json::Error> {
    let raw: Vec<RawSession> = serde_json::from_slice(body)?;
    Ok(raw.into_iter().map(Session::from).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const SAMPLE: &str = r#"[
        {
            "Id": "a1",
            "UserName": "alice",
            "LastActivityDate": "2024-11-04T08:45:39.9536253Z",
            "NowPlayingItem": { "Name": "Big Buck Bunny", "Type": "Movie" },
            "PlayState": { "IsPaused": true, "PositionTicks": 120000 }
        },
        {
            "Id": "b2",
            "UserName": "bob",
            "LastActivityDate": "2024-11-04T08:40:00.0000000Z",
            "PlayState": { "IsPaused": false }
        },
        {
            "Id": "c3",
            "NowPlayingItem": { "Name": "Sintel" }
        }
    ]"#;

    #[test]
    fn parses_sessions_and_fields() {
        let sessions = parse_sessions(SAMPLE.as_bytes()).unwrap();
        assert_eq!(sessions.len(), 3);

        let a = &sessions[0];
        assert_eq!(a.id, "a1");
        assert_eq!(a.user.as_deref(), Some("alice"));
        assert_eq!(a.now_playing.as_deref(), Some("Big Buck Bunny"));
        assert!(a.is_paused);
        let expected = Utc.with_ymd_and_hms(2024, 11, 4, 8, 45, 39).unwrap()
            + chrono::Duration::nanoseconds(953_625_300);
        assert_eq!(a.last_activity, Some(expected));

        let b = &sessions[1];
        assert!(!b.has_now_playing());
        assert!(!b.is_paused);

        let c = &sessions[2];
        assert!(c.has_now_playing());
        assert!(!c.is_paused, "missing PlayState means playing");
        assert!(c.last_activity.is_none());
        assert!(c.user.is_none());
    }

    #[test]
    fn bad_timestamp_is_unknown_not_an_error() {
        let body = r#"[{"Id":"x","LastActivityDate":"yesterday","NowPlayingItem":{"Name":"n"}}]"#;
        let sessions = parse_sessions(body.as_bytes()).unwrap();
        assert!(sessions[0].last_activity.is_none());
    }

    #[test]
    fn empty_list() {
        assert!(parse_sessions(b"[]").unwrap().is_empty());
    }

    #[test]
    fn malformed_payload_is_an_error() {
        assert!(parse_sessions(b"{\"error\":\"nope\"}").is_err());
        assert!(parse_sessions(br#"[{"UserName":"no id"}]"#).is_err());
    }
}
