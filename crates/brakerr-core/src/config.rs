use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::ConfigError;
use crate::reconcile::SpeedTiers;
use crate::session::Amnesty;

/// Which qBittorrent transfer limit is controlled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LimitDirection {
    #[default]
    Download,
    Upload,
}

impl std::str::FromStr for LimitDirection {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "download" => Ok(LimitDirection::Download),
            "upload" => Ok(LimitDirection::Upload),
            other => Err(format!("expected `download` or `upload`, got `{other}`")),
        }
    }
}

/// `[jellyfin]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct JellyfinConfig {
    /// Base URL of the Jellyfin server, e.g. `http://jellyfin:8096`.
    pub url: String,
    pub api_key: String,
    pub verify_https: bool,
    /// Seconds between session polls (at least 1).
    pub update_interval_secs: u64,
    /// Amnesty window in seconds for paused/recently active sessions; -1 disables it.
    pub ignore_paused_after_secs: i64,
}

impl Default for JellyfinConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            api_key: String::new(),
            verify_https: true,
            update_interval_secs: 5,
            ignore_paused_after_secs: -1,
        }
    }
}

/// `[qbittorrent]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QbitConfig {
    /// Base URL of the WebUI, e.g. `http://qbittorrent:8080`.
    pub url: String,
    pub username: String,
    pub password: String,
    pub verify_https: bool,
    pub direction: LimitDirection,
}

impl Default for QbitConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            username: String::new(),
            password: String::new(),
            verify_https: true,
            direction: LimitDirection::Download,
        }
    }
}

/// `[limits]` section, all values in KiB/s. 0 means unlimited.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Applied while anything is streaming.
    pub streaming_kib: u64,
    /// Applied while sessions are active but nothing streams. Falls back to
    /// `streaming_kib` when unset.
    pub active_kib: Option<u64>,
    /// Applied when nothing is active.
    pub idle_kib: u64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            streaming_kib: 1024,
            active_kib: None,
            idle_kib: 0,
        }
    }
}

/// Global configuration loaded from `~/.config/brakerr/config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrakerrConfig {
    pub jellyfin: JellyfinConfig,
    pub qbittorrent: QbitConfig,
    pub limits: LimitsConfig,
}

impl BrakerrConfig {
    /// Rejects configurations the daemon cannot run with.
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        self.validate_jellyfin()?;
        if self.qbittorrent.url.trim().is_empty() {
            return Err(ConfigError::Missing("qbittorrent.url"));
        }
        if self.qbittorrent.username.is_empty() {
            return Err(ConfigError::Missing("qbittorrent.username"));
        }
        if self.qbittorrent.password.is_empty() {
            return Err(ConfigError::Missing("qbittorrent.password"));
        }
        Ok(())
    }

    /// Subset of [`validate`](Self::validate) needed to query Jellyfin only.
    pub fn validate_jellyfin(&self) -> std::result::Result<(), ConfigError> {
        let jf = &self.jellyfin;
        if jf.url.trim().is_empty() {
            return Err(ConfigError::Missing("jellyfin.url"));
        }
        if jf.api_key.is_empty() {
            return Err(ConfigError::Missing("jellyfin.api_key"));
        }
        if jf.update_interval_secs < 1 {
            return Err(ConfigError::IntervalTooShort(jf.update_interval_secs));
        }
        if jf.ignore_paused_after_secs < -1 {
            return Err(ConfigError::InvalidAmnesty(jf.ignore_paused_after_secs));
        }
        Ok(())
    }

    pub fn update_interval(&self) -> Duration {
        Duration::from_secs(self.jellyfin.update_interval_secs.max(1))
    }

    pub fn amnesty(&self) -> Amnesty {
        Amnesty::from_secs(self.jellyfin.ignore_paused_after_secs)
    }

    pub fn tiers(&self) -> SpeedTiers {
        SpeedTiers::new(
            self.limits.streaming_kib,
            self.limits.active_kib,
            self.limits.idle_kib,
        )
    }
}

/// Values given on the command line or via `BRAKERR_*` environment
/// variables. Every `Some` replaces the corresponding file value.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub jellyfin_url: Option<String>,
    pub jellyfin_api_key: Option<String>,
    pub jellyfin_verify_https: Option<bool>,
    pub jellyfin_update_interval: Option<u64>,
    pub jellyfin_ignore_paused_after: Option<i64>,
    pub qbit_url: Option<String>,
    pub qbit_username: Option<String>,
    pub qbit_password: Option<String>,
    pub qbit_verify_https: Option<bool>,
    pub qbit_direction: Option<LimitDirection>,
    pub speed_limit: Option<u64>,
    pub speed_limit_paused: Option<u64>,
    pub speed_limit_idle: Option<u64>,
}

impl ConfigOverrides {
    pub fn apply(self, cfg: &mut BrakerrConfig) {
        fn set<T>(slot: &mut T, value: Option<T>) {
            if let Some(v) = value {
                *slot = v;
            }
        }
        set(&mut cfg.jellyfin.url, self.jellyfin_url);
        set(&mut cfg.jellyfin.api_key, self.jellyfin_api_key);
        set(&mut cfg.jellyfin.verify_https, self.jellyfin_verify_https);
        set(&mut cfg.jellyfin.update_interval_secs, self.jellyfin_update_interval);
        set(
            &mut cfg.jellyfin.ignore_paused_after_secs,
            self.jellyfin_ignore_paused_after,
        );
        set(&mut cfg.qbittorrent.url, self.qbit_url);
        set(&mut cfg.qbittorrent.username, self.qbit_username);
        set(&mut cfg.qbittorrent.password, self.qbit_password);
        set(&mut cfg.qbittorrent.verify_https, self.qbit_verify_https);
        set(&mut cfg.qbittorrent.direction, self.qbit_direction);
        set(&mut cfg.limits.streaming_kib, self.speed_limit);
        if self.speed_limit_paused.is_some() {
            cfg.limits.active_kib = self.speed_limit_paused;
        }
        set(&mut cfg.limits.idle_kib, self.speed_limit_idle);
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("brakerr")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<BrakerrConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = BrakerrConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }
    load_from(&path)
}

/// Load configuration from an explicit path; the file must exist.
pub fn load_from(path: &Path) -> Result<BrakerrConfig> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    let cfg: BrakerrConfig =
        toml::from_str(&data).with_context(|| format!("parsing config {}", path.display()))?;
    Ok(cfg)
}
