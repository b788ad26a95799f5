//! `brakerr run` – poll Jellyfin and keep the qBittorrent limit in sync until interrupted.

use anyhow::{Context, Result};
use brakerr_core::config::BrakerrConfig;
use brakerr_core::jellyfin::JellyfinClient;
use brakerr_core::poller::SessionPoller;
use brakerr_core::qbittorrent::QbitClient;
use brakerr_core::reconcile::ReconciliationLoop;
use brakerr_core::signal::{ChangeSignal, StateCell};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

pub async fn run_daemon(cfg: BrakerrConfig) -> Result<()> {
    cfg.validate()?;
    tracing::info!("starting brakerr");

    // Without an authenticated session no limit can ever be applied.
    let qbit_cfg = cfg.qbittorrent.clone();
    let qbit = tokio::task::spawn_blocking(move || {
        QbitClient::login(
            &qbit_cfg.url,
            &qbit_cfg.username,
            &qbit_cfg.password,
            qbit_cfg.verify_https,
            qbit_cfg.direction,
        )
    })
    .await
    .context("qBittorrent login task failed")?
    .with_context(|| format!("<qbit|{}>", cfg.qbittorrent.url))?;

    let state = Arc::new(StateCell::default());
    let signal = Arc::new(ChangeSignal::new());
    let cancel = CancellationToken::new();

    let jellyfin = JellyfinClient::new(
        &cfg.jellyfin.url,
        &cfg.jellyfin.api_key,
        cfg.jellyfin.verify_https,
    );
    let poller = SessionPoller::new(
        jellyfin,
        cfg.update_interval(),
        cfg.amnesty(),
        Arc::clone(&state),
        Arc::clone(&signal),
    );
    let poll_handle = tokio::spawn(poller.run(cancel.clone()));
    tokio::spawn(cancel_on_shutdown_signal(cancel.clone()));

    // Force an initial update so a stale limit is not left in place.
    signal.set();

    let mut reconciler = ReconciliationLoop::new(qbit, cfg.tiers(), state, signal);
    reconciler.run(cancel.clone()).await;

    cancel.cancel();
    if let Err(e) = poll_handle.await {
        tracing::warn!("session poller task ended abnormally: {}", e);
    }
    tracing::info!(
        applied = reconciler.applied_count(),
        last_tier = ?reconciler.last_applied(),
        "brakerr stopped"
    );
    Ok(())
}

/// Cancels `cancel` on ctrl-c, or SIGTERM on unix.
async fn cancel_on_shutdown_signal(cancel: CancellationToken) {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    r = tokio::signal::ctrl_c() => {
                        if let Err(e) = r {
                            tracing::warn!("cannot listen for ctrl-c: {}", e);
                            term.recv().await;
                        }
                    }
                    _ = term.recv() => {}
                }
            }
            Err(e) => {
                tracing::warn!("cannot listen for SIGTERM: {}", e);
                if let Err(e) = tokio::signal::ctrl_c().await {
                    tracing::warn!("cannot listen for ctrl-c: {}", e);
                    return;
                }
            }
        }
    }
    #[cfg(not(unix))]
    {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("cannot listen for ctrl-c: {}", e);
            return;
        }
    }
    tracing::info!("shutdown requested");
    cancel.cancel();
}
