//! `brakerr status` – one Jellyfin query, classified with an empty pause tracker.

use anyhow::{Context, Result};
use brakerr_core::config::BrakerrConfig;
use brakerr_core::jellyfin::JellyfinClient;
use brakerr_core::poller::SessionSource;
use brakerr_core::session::{self, PauseTracker};
use chrono::Utc;

pub async fn run_status(cfg: BrakerrConfig) -> Result<()> {
    cfg.validate_jellyfin()?;
    let client = JellyfinClient::new(
        &cfg.jellyfin.url,
        &cfg.jellyfin.api_key,
        cfg.jellyfin.verify_https,
    );
    let sessions = client
        .fetch()
        .await
        .with_context(|| format!("<jellyfin|{}> getting sessions", client.url()))?;

    if sessions.is_empty() {
        println!("No sessions.");
    } else {
        println!("{:<34} {:<12} {:<7} {:<26} {}", "ID", "USER", "PAUSED", "LAST ACTIVITY", "PLAYING");
        for s in &sessions {
            let last = s
                .last_activity
                .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
                .unwrap_or_else(|| "-".to_string());
            println!(
                "{:<34} {:<12} {:<7} {:<26} {}",
                s.id,
                s.user.as_deref().unwrap_or("-"),
                s.is_paused,
                last,
                s.now_playing.as_deref().unwrap_or("-")
            );
        }
    }

    let (state, _) = session::classify(&sessions, &PauseTracker::new(), Utc::now(), cfg.amnesty());
    let (tier, kib) = cfg.tiers().select(state);
    println!();
    println!(
        "active: {}  streaming: {}  tier: {} ({} KiB/s, {:?})",
        state.has_active_session, state.is_streaming, tier, kib, cfg.qbittorrent.direction
    );
    Ok(())
}
