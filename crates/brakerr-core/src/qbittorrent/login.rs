//! qBittorrent WebUI login (`POST /api/v2/auth/login`).

use crate::error::LoginError;
use crate::http::{self, Request, Response};

/// Session cookie name issued by the WebUI.
pub(super) const SESSION_COOKIE: &str = "SID";

/// Logs in and returns the session cookie value.
pub(super) fn login(
    url: &str,
    username: &str,
    password: &str,
    verify_tls: bool,
) -> Result<String, LoginError> {
    let req = Request {
        url: format!("{}/api/v2/auth/login", url),
        // The WebUI rejects requests whose Referer/Origin does not match its host.
        headers: vec![format!("Referer: {}", url)],
        form: Some(http::form_encode(&[
            ("username", username),
            ("password", password),
        ])),
        verify_tls,
        ..Request::default()
    };
    let resp = http::perform(&req)?;
    interpret_login(&resp)
}

/// Maps a login response to the session cookie or a [`LoginError`].
///
/// 200 + `Ok.` is success, 200 with any other body (`Fails.`) or 401 means
/// bad credentials, 403 means the client IP is temporarily banned.
pub(super) fn interpret_login(resp: &Response) -> Result<String, LoginError> {
    match resp.code {
        200 if resp.text().trim() == "Ok." => resp
            .set_cookie(SESSION_COOKIE)
            .ok_or(LoginError::MissingCookie),
        200 | 401 => Err(LoginError::BadCredentials),
        403 => Err(LoginError::Banned),
        code => Err(LoginError::Http(code)),
    }
}
