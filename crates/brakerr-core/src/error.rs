//! Error kinds for the three failure classes: fatal-startup (login),
//! transient-fetch (Jellyfin sessions) and transient-apply (rate limit).

use thiserror::Error;

/// Failure retrieving sessions from Jellyfin. Logged by the poller and
/// retried on the next tick; the previously published state stays in effect.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("transport: {0}")]
    Transport(#[from] curl::Error),
    #[error("HTTP {0}")]
    Http(u32),
    #[error("invalid session list: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("background task failed: {0}")]
    Join(String),
}

/// Failure authenticating against qBittorrent. Always fatal at startup.
#[derive(Debug, Error)]
pub enum LoginError {
    #[error("failed to login to qBittorrent, check your credentials")]
    BadCredentials,
    #[error("failed to login to qBittorrent, temporarily banned, try again later")]
    Banned,
    #[error("qBittorrent login returned HTTP {0}")]
    Http(u32),
    #[error("qBittorrent login accepted but no session cookie was returned")]
    MissingCookie,
    #[error("transport: {0}")]
    Transport(#[from] curl::Error),
}

/// Failure applying a rate limit. Logged by the reconciliation loop, which
/// then waits for the next signal instead of retrying.
#[derive(Debug, Error)]
pub enum ApplyError {
    #[error("transport: {0}")]
    Transport(#[from] curl::Error),
    #[error("HTTP {0}")]
    Http(u32),
    #[error("qBittorrent session expired or was rejected")]
    SessionExpired,
    #[error("limit of {0} KiB/s overflows the byte rate")]
    Overflow(u64),
    #[error("background task failed: {0}")]
    Join(String),
}

/// Configuration rejected by `BrakerrConfig::validate`.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required setting `{0}`")]
    Missing(&'static str),
    #[error("update interval must be at least 1 second, got {0}")]
    IntervalTooShort(u64),
    #[error("ignore_paused_after_secs must be -1 (disabled) or >= 0, got {0}")]
    InvalidAmnesty(i64),
}
