//! Integration test: qBittorrent login and limit updates against a local stub server.

mod common;

use brakerr_core::config::LimitDirection;
use brakerr_core::error::{ApplyError, LoginError};
use brakerr_core::qbittorrent::QbitClient;
use brakerr_core::reconcile::RateLimiter;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use common::http_stub::{self, Recorded, StubResponse};

fn webui(req: &Recorded) -> StubResponse {
    match req.path.as_str() {
        "/api/v2/auth/login" => {
            if req.body == "username=admin&password=adminadmin" {
                StubResponse::new(200, "Ok.")
                    .with_header("Set-Cookie: SID=s3ss10n; HttpOnly; path=/; SameSite=Strict")
            } else {
                StubResponse::new(200, "Fails.")
            }
        }
        "/api/v2/transfer/setDownloadLimit" | "/api/v2/transfer/setUploadLimit" => {
            if req.header("Cookie") == Some("SID=s3ss10n") {
                StubResponse::new(200, "")
            } else {
                StubResponse::new(403, "Forbidden")
            }
        }
        _ => StubResponse::new(404, ""),
    }
}

#[tokio::test]
async fn login_then_set_download_limit_in_bytes() {
    let (url, requests) = http_stub::start(webui);
    let client = QbitClient::login(&url, "admin", "adminadmin", true, LimitDirection::Download)
        .expect("login");

    client.set_limit(500).await.expect("set limit");
    client.set_limit(0).await.expect("unlimited");

    let reqs = requests.lock().unwrap();
    assert_eq!(reqs.len(), 3);
    assert_eq!(reqs[0].method, "POST");
    assert_eq!(reqs[0].header("Referer"), Some(url.as_str()));
    assert_eq!(reqs[1].path, "/api/v2/transfer/setDownloadLimit");
    assert_eq!(reqs[1].body, "limit=512000");
    assert_eq!(reqs[2].body, "limit=0");
}

#[test]
fn upload_direction_targets_upload_endpoint() {
    let (url, requests) = http_stub::start(webui);
    let client = QbitClient::login(&url, "admin", "adminadmin", true, LimitDirection::Upload)
        .expect("login");
    client.set_limit_blocking(1).expect("set limit");
    let reqs = requests.lock().unwrap();
    assert_eq!(reqs[1].path, "/api/v2/transfer/setUploadLimit");
    assert_eq!(reqs[1].body, "limit=1024");
}

#[test]
fn bad_credentials_are_distinct_from_ban() {
    let (url, _) = http_stub::start(webui);
    let err = QbitClient::login(&url, "admin", "nope", true, LimitDirection::Download).unwrap_err();
    assert!(matches!(err, LoginError::BadCredentials));

    let (banned, _) = http_stub::start(|_| StubResponse::new(403, "Your IP address has been banned"));
    let err = QbitClient::login(&banned, "admin", "adminadmin", true, LimitDirection::Download)
        .unwrap_err();
    assert!(matches!(err, LoginError::Banned));
}

#[tokio::test]
async fn expired_session_is_renewed_and_limit_retried() {
    // Every login hands out a fresh SID; the first one is already stale.
    let logins = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&logins);
    let (url, requests) = http_stub::start(move |req| {
        if req.path == "/api/v2/auth/login" {
            let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
            StubResponse::new(200, "Ok.").with_header(&format!("Set-Cookie: SID=s{n}"))
        } else if req.header("Cookie") == Some("SID=s1") {
            StubResponse::new(403, "Forbidden")
        } else {
            StubResponse::new(200, "")
        }
    });
    let client = QbitClient::login(&url, "admin", "pw", true, LimitDirection::Download).unwrap();

    client.set_limit(100).await.expect("retried after re-login");
    client.set_limit(200).await.expect("renewed cookie is kept");

    assert_eq!(logins.load(Ordering::SeqCst), 2);
    let reqs = requests.lock().unwrap();
    let cookies: Vec<_> = reqs.iter().map(|r| (r.path.as_str(), r.header("Cookie"))).collect();
    assert_eq!(
        cookies,
        vec![
            ("/api/v2/auth/login", None),
            ("/api/v2/transfer/setDownloadLimit", Some("SID=s1")),
            ("/api/v2/auth/login", None),
            ("/api/v2/transfer/setDownloadLimit", Some("SID=s2")),
            ("/api/v2/transfer/setDownloadLimit", Some("SID=s2")),
        ]
    );
    assert_eq!(reqs[3].body, "limit=102400");
}

#[tokio::test]
async fn rejected_session_is_apply_error() {
    // Login succeeds but the cookie is never accepted afterwards, even after
    // the one re-login.
    let (url, requests) = http_stub::start(|req| {
        if req.path == "/api/v2/auth/login" {
            StubResponse::new(200, "Ok.").with_header("Set-Cookie: SID=stale")
        } else {
            StubResponse::new(403, "Forbidden")
        }
    });
    let client = QbitClient::login(&url, "admin", "pw", true, LimitDirection::Download).unwrap();
    assert!(matches!(
        client.set_limit(100).await,
        Err(ApplyError::SessionExpired)
    ));
    // login, limit, re-login, retried limit; no further attempts
    assert_eq!(requests.lock().unwrap().len(), 4);
}

#[tokio::test]
async fn failed_relogin_is_session_expired() {
    let logins = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&logins);
    let (url, requests) = http_stub::start(move |req| {
        if req.path == "/api/v2/auth/login" {
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                StubResponse::new(200, "Ok.").with_header("Set-Cookie: SID=first")
            } else {
                StubResponse::new(403, "Your IP address has been banned")
            }
        } else {
            StubResponse::new(401, "")
        }
    });
    let client = QbitClient::login(&url, "admin", "pw", true, LimitDirection::Download).unwrap();
    assert!(matches!(
        client.set_limit(100).await,
        Err(ApplyError::SessionExpired)
    ));
    assert_eq!(logins.load(Ordering::SeqCst), 2);
    assert_eq!(requests.lock().unwrap().len(), 3);
}
