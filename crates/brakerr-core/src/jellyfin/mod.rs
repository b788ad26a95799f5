//! Jellyfin session source.
//!
//! Fetches `GET /Sessions` with the `MediaBrowser Token` header and decodes
//! the records into [`Session`] values for the classifier.

mod parse;

use async_trait::async_trait;

use crate::error::FetchError;
use crate::http::{self, Request};
use crate::poller::SessionSource;
use crate::session::Session;

pub use parse::parse_sessions;

/// Client for one Jellyfin server. Cheap to clone; each fetch opens its own
/// curl handle.
#[derive(Debug, Clone)]
pub struct JellyfinClient {
    url: String,
    api_key: String,
    verify_tls: bool,
}

impl JellyfinClient {
    pub fn new(url: &str, api_key: &str, verify_tls: bool) -> Self {
        Self {
            url: url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            verify_tls,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Fetches and decodes the current session list.
    /// Runs in the current thread; use [`SessionSource::fetch`] from async code.
    pub fn fetch_sessions_blocking(&self) -> Result<Vec<Session>, FetchError> {
        tracing::debug!(source = "jellyfin", url = %self.url, "getting sessions");
        let req = Request {
            url: format!("{}/Sessions", self.url),
            headers: vec![
                format!("Authorization: MediaBrowser Token=\"{}\"", self.api_key),
                "Accept: application/json".to_string(),
            ],
            verify_tls: self.verify_tls,
            ..Request::default()
        };
        let resp = http::perform(&req)?;
        tracing::debug!(source = "jellyfin", url = %self.url, code = resp.code, "got response");
        if !resp.is_success() {
            return Err(FetchError::Http(resp.code));
        }
        Ok(parse_sessions(&resp.body)?)
    }
}

#[async_trait]
impl SessionSource for JellyfinClient {
    fn describe(&self) -> String {
        format!("jellyfin|{}", self.url)
    }

    async fn fetch(&self) -> Result<Vec<Session>, FetchError> {
        let client = self.clone();
        tokio::task::spawn_blocking(move || client.fetch_sessions_blocking())
            .await
            .map_err(|e| FetchError::Join(e.to_string()))?
    }
}
