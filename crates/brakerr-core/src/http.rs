//! Minimal blocking HTTP over libcurl, shared by the Jellyfin and
//! qBittorrent clients.
//!
//! Runs in the current thread; call from `spawn_blocking` if used from async code.

use std::str;
use std::time::Duration;

/// Outgoing request. Body present means POST, absent means GET.
#[derive(Debug, Clone, Default)]
pub struct Request {
    pub url: String,
    /// Header lines, e.g. `"Referer: http://host"`.
    pub headers: Vec<String>,
    /// Raw `Cookie` value to send, e.g. `"SID=abc"`.
    pub cookie: Option<String>,
    /// URL-encoded form body.
    pub form: Option<String>,
    pub verify_tls: bool,
}

/// Response status, header lines and body.
#[derive(Debug, Clone)]
pub struct Response {
    pub code: u32,
    pub headers: Vec<String>,
    pub body: Vec<u8>,
}

impl Response {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.code)
    }

    /// Body as UTF-8 text, lossily decoded.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Value of the cookie `name` from any `Set-Cookie` header.
    pub fn set_cookie(&self, name: &str) -> Option<String> {
        self.headers
            .iter()
            .filter_map(|line| {
                let (k, v) = line.split_once(':')?;
                k.trim()
                    .eq_ignore_ascii_case("set-cookie")
                    .then(|| v.trim())
            })
            .find_map(|v| parse_cookie_pair(v, name))
    }
}

fn parse_cookie_pair(set_cookie: &str, name: &str) -> Option<String> {
    let first = set_cookie.split(';').next()?.trim();
    let (k, v) = first.split_once('=')?;
    (k.trim() == name).then(|| v.trim().to_string())
}

/// Performs the request and collects status, headers and body.
pub fn perform(req: &Request) -> Result<Response, curl::Error> {
    let mut headers: Vec<String> = Vec::new();
    let mut body: Vec<u8> = Vec::new();

    let mut easy = curl::easy::Easy::new();
    easy.url(&req.url)?;
    easy.follow_location(true)?;
    easy.max_redirections(5)?;
    easy.connect_timeout(Duration::from_secs(10))?;
    easy.timeout(Duration::from_secs(30))?;
    easy.ssl_verify_peer(req.verify_tls)?;
    easy.ssl_verify_host(req.verify_tls)?;

    if let Some(form) = &req.form {
        easy.post(true)?;
        easy.post_fields_copy(form.as_bytes())?;
    } else {
        easy.get(true)?;
    }
    if let Some(cookie) = &req.cookie {
        easy.cookie(cookie)?;
    }

    let mut list = curl::easy::List::new();
    for h in &req.headers {
        list.append(h)?;
    }
    if !req.headers.is_empty() {
        easy.http_headers(list)?;
    }

    {
        let mut transfer = easy.transfer();
        transfer.header_function(|data| {
            if let Ok(s) = str::from_utf8(data) {
                headers.push(s.trim_end().to_string());
            }
            true
        })?;
        transfer.write_function(|data| {
            body.extend_from_slice(data);
            Ok(data.len())
        })?;
        transfer.perform()?;
    }

    let code = easy.response_code()?;
    Ok(Response {
        code,
        headers,
        body,
    })
}

/// Builds an `application/x-www-form-urlencoded` body.
pub fn form_encode(pairs: &[(&str, &str)]) -> String {
    let mut easy = curl::easy::Easy::new();
    pairs
        .iter()
        .map(|(k, v)| {
            format!(
                "{}={}",
                easy.url_encode(k.as_bytes()),
                easy.url_encode(v.as_bytes())
            )
        })
        .collect::<Vec<_>>()
        .join("&")
}
