//! qBittorrent bandwidth controller.
//!
//! Authenticates against the WebUI API and sets the global transfer rate
//! limit. Operator values are KiB/s; the API takes bytes/s, 0 = unlimited.
//! An expired WebUI session is renewed once per limit call.

mod login;

use async_trait::async_trait;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use crate::config::LimitDirection;
use crate::error::{ApplyError, LoginError};
use crate::http::{self, Request};
use crate::reconcile::RateLimiter;

/// Converts an operator-facing KiB/s value to the WebUI's bytes/s.
pub fn kib_to_bytes(kib: u64) -> Result<u64, ApplyError> {
    kib.checked_mul(1024).ok_or(ApplyError::Overflow(kib))
}

/// Authenticated qBittorrent WebUI session. Clones share the session cookie.
#[derive(Clone)]
pub struct QbitClient {
    url: String,
    username: String,
    password: String,
    verify_tls: bool,
    sid: Arc<RwLock<String>>,
    direction: LimitDirection,
}

impl fmt::Debug for QbitClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QbitClient")
            .field("url", &self.url)
            .field("username", &self.username)
            .field("verify_tls", &self.verify_tls)
            .field("direction", &self.direction)
            .finish_non_exhaustive()
    }
}

impl QbitClient {
    /// Logs in. Failure here is fatal to startup.
    /// Runs in the current thread; call from `spawn_blocking` if used from async code.
    pub fn login(
        url: &str,
        username: &str,
        password: &str,
        verify_tls: bool,
        direction: LimitDirection,
    ) -> Result<Self, LoginError> {
        let url = url.trim_end_matches('/').to_string();
        tracing::debug!(source = "qbit", url = %url, "connecting to qBittorrent");
        let sid = login::login(&url, username, password, verify_tls)?;
        tracing::debug!(source = "qbit", url = %url, "connected to qBittorrent");
        Ok(Self {
            url,
            username: username.to_string(),
            password: password.to_string(),
            verify_tls,
            sid: Arc::new(RwLock::new(sid)),
            direction,
        })
    }

    fn endpoint(&self) -> String {
        let action = match self.direction {
            LimitDirection::Download => "setDownloadLimit",
            LimitDirection::Upload => "setUploadLimit",
        };
        format!("{}/api/v2/transfer/{}", self.url, action)
    }

    fn current_sid(&self) -> String {
        self.sid
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Logs in again and stores the new session cookie.
    fn renew_session(&self) -> Result<(), LoginError> {
        let sid = login::login(&self.url, &self.username, &self.password, self.verify_tls)?;
        *self.sid.write().unwrap_or_else(PoisonError::into_inner) = sid;
        tracing::info!(source = "qbit", url = %self.url, "renewed qBittorrent session");
        Ok(())
    }

    /// One limit request with the current cookie. Returns the HTTP status.
    fn post_limit(&self, bytes: u64) -> Result<u32, ApplyError> {
        let limit = bytes.to_string();
        let req = Request {
            url: self.endpoint(),
            headers: vec![format!("Referer: {}", self.url)],
            cookie: Some(format!("{}={}", login::SESSION_COOKIE, self.current_sid())),
            form: Some(http::form_encode(&[("limit", limit.as_str())])),
            verify_tls: self.verify_tls,
        };
        Ok(http::perform(&req)?.code)
    }

    /// Sets the rate limit to `kib` KiB/s (0 = unlimited). A rejected session
    /// triggers one fresh login and one repeat of the request.
    /// Runs in the current thread; use [`RateLimiter::set_limit`] from async code.
    pub fn set_limit_blocking(&self, kib: u64) -> Result<(), ApplyError> {
        let bytes = kib_to_bytes(kib)?;
        tracing::debug!(
            source = "qbit",
            url = %self.url,
            direction = ?self.direction,
            kib,
            bytes,
            "setting speed limit"
        );
        let mut code = self.post_limit(bytes)?;
        if matches!(code, 401 | 403) {
            tracing::warn!(source = "qbit", url = %self.url, code, "session rejected, logging in again");
            if let Err(e) = self.renew_session() {
                tracing::error!(source = "qbit", url = %self.url, "re-login failed: {}", e);
                return Err(ApplyError::SessionExpired);
            }
            code = self.post_limit(bytes)?;
        }
        match code {
            200..=299 => Ok(()),
            401 | 403 => Err(ApplyError::SessionExpired),
            code => Err(ApplyError::Http(code)),
        }
    }
}

#[async_trait]
impl RateLimiter for QbitClient {
    fn describe(&self) -> String {
        format!("qbit|{}", self.url)
    }

    async fn set_limit(&self, kib: u64) -> Result<(), ApplyError> {
        let client = self.clone();
        tokio::task::spawn_blocking(move || client.set_limit_blocking(kib))
            .await
            .map_err(|e| ApplyError::Join(e.to_string()))?
    }
}
