//! CLI for brakerr.

mod commands;

use anyhow::Result;
use brakerr_core::config::{self, BrakerrConfig, ConfigOverrides, LimitDirection};
use brakerr_core::logging;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use commands::{run_config_path, run_daemon, run_status};

/// Top-level CLI. Without a subcommand, `run` is assumed.
#[derive(Debug, Parser)]
#[command(name = "brakerr")]
#[command(about = "Throttle qBittorrent while Jellyfin is streaming", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<CliCommand>,

    /// Config file (default: ~/.config/brakerr/config.toml, created if missing).
    #[arg(long, global = true, env = "BRAKERR_CONFIG", value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Console log level: trace, debug, info, warn, error (or 10/20/30/40/50).
    #[arg(long, alias = "log_level", global = true, env = "BRAKERR_LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Log file level, same values as --log-level.
    #[arg(
        long,
        alias = "log_file_level",
        global = true,
        env = "BRAKERR_LOG_FILE_LEVEL",
        default_value = "warn"
    )]
    pub log_file_level: String,

    #[command(flatten)]
    pub settings: SettingsArgs,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Watch Jellyfin and keep the qBittorrent limit in sync (default).
    Run,

    /// Query Jellyfin once and show the tier that would be applied.
    Status,

    /// Print the config file path.
    ConfigPath,
}

/// Per-setting overrides; each wins over the config file.
#[derive(Debug, Default, Args)]
pub struct SettingsArgs {
    /// Jellyfin server URL.
    #[arg(long, alias = "jellyfin_url", global = true, env = "BRAKERR_JELLYFIN_URL")]
    pub jellyfin_url: Option<String>,

    /// Jellyfin API key.
    #[arg(long, alias = "jellyfin_api_key", global = true, env = "BRAKERR_JELLYFIN_API_KEY", hide_env_values = true)]
    pub jellyfin_api_key: Option<String>,

    /// Verify the Jellyfin TLS certificate.
    #[arg(long, alias = "jellyfin_verify_https", global = true, env = "BRAKERR_JELLYFIN_VERIFY_HTTPS", value_name = "BOOL")]
    pub jellyfin_verify_https: Option<bool>,

    /// Seconds between Jellyfin session polls.
    #[arg(long, alias = "jellyfin_update_interval", global = true, env = "BRAKERR_JELLYFIN_UPDATE_INTERVAL", value_name = "SECS")]
    pub jellyfin_update_interval: Option<u64>,

    /// Treat paused/recently active sessions as active for this many seconds (-1 disables).
    #[arg(
        long,
        alias = "jellyfin_ignore_paused_after",
        global = true,
        env = "BRAKERR_JELLYFIN_IGNORE_PAUSED_AFTER",
        value_name = "SECS",
        allow_negative_numbers = true
    )]
    pub jellyfin_ignore_paused_after: Option<i64>,

    /// qBittorrent WebUI URL.
    #[arg(long, alias = "qbit_url", global = true, env = "BRAKERR_QBIT_URL")]
    pub qbit_url: Option<String>,

    /// qBittorrent username.
    #[arg(long, alias = "qbit_username", global = true, env = "BRAKERR_QBIT_USERNAME")]
    pub qbit_username: Option<String>,

    /// qBittorrent password.
    #[arg(long, alias = "qbit_password", global = true, env = "BRAKERR_QBIT_PASSWORD", hide_env_values = true)]
    pub qbit_password: Option<String>,

    /// Verify the qBittorrent TLS certificate.
    #[arg(long, alias = "qbit_verify_https", global = true, env = "BRAKERR_QBIT_VERIFY_HTTPS", value_name = "BOOL")]
    pub qbit_verify_https: Option<bool>,

    /// Which limit to control: download or upload.
    #[arg(long, alias = "qbit_direction", global = true, env = "BRAKERR_QBIT_DIRECTION")]
    pub qbit_direction: Option<LimitDirection>,

    /// Limit in KiB/s while something is streaming.
    #[arg(long, alias = "qbit_speed_limit", global = true, env = "BRAKERR_QBIT_SPEED_LIMIT", value_name = "KIB")]
    pub qbit_speed_limit: Option<u64>,

    /// Limit in KiB/s while sessions are active but nothing streams.
    #[arg(long, alias = "qbit_speed_limit_paused", global = true, env = "BRAKERR_QBIT_SPEED_LIMIT_PAUSED", value_name = "KIB")]
    pub qbit_speed_limit_paused: Option<u64>,

    /// Limit in KiB/s when nothing is active (0 = unlimited).
    #[arg(long, alias = "qbit_speed_limit_idle", global = true, env = "BRAKERR_QBIT_SPEED_LIMIT_IDLE", value_name = "KIB")]
    pub qbit_speed_limit_idle: Option<u64>,
}

impl SettingsArgs {
    fn into_overrides(self) -> ConfigOverrides {
        ConfigOverrides {
            jellyfin_url: self.jellyfin_url,
            jellyfin_api_key: self.jellyfin_api_key,
            jellyfin_verify_https: self.jellyfin_verify_https,
            jellyfin_update_interval: self.jellyfin_update_interval,
            jellyfin_ignore_paused_after: self.jellyfin_ignore_paused_after,
            qbit_url: self.qbit_url,
            qbit_username: self.qbit_username,
            qbit_password: self.qbit_password,
            qbit_verify_https: self.qbit_verify_https,
            qbit_direction: self.qbit_direction,
            speed_limit: self.qbit_speed_limit,
            speed_limit_paused: self.qbit_speed_limit_paused,
            speed_limit_idle: self.qbit_speed_limit_idle,
        }
    }
}

impl Cli {
    pub async fn run_from_args() -> Result<()> {
        Cli::parse().run().await
    }

    async fn run(self) -> Result<()> {
        if let Err(e) = logging::init_logging(&self.log_level, &self.log_file_level) {
            logging::init_logging_stderr(&self.log_level);
            tracing::warn!("file logging unavailable, logging to stderr only: {:#}", e);
        }

        let command = self.command.unwrap_or(CliCommand::Run);
        if let CliCommand::ConfigPath = command {
            return run_config_path(self.config.as_deref());
        }

        let cfg = load_config(self.config, self.settings)?;
        match command {
            CliCommand::Run => run_daemon(cfg).await,
            CliCommand::Status => run_status(cfg).await,
            CliCommand::ConfigPath => Ok(()),
        }
    }
}

/// File (explicit or default) overlaid with flag/env overrides.
fn load_config(path: Option<PathBuf>, settings: SettingsArgs) -> Result<BrakerrConfig> {
    let mut cfg = match path {
        Some(p) => config::load_from(&p)?,
        None => config::load_or_init()?,
    };
    settings.into_overrides().apply(&mut cfg);
    tracing::debug!(
        jellyfin = %cfg.jellyfin.url,
        qbit = %cfg.qbittorrent.url,
        interval_secs = cfg.jellyfin.update_interval_secs,
        ignore_paused_after_secs = cfg.jellyfin.ignore_paused_after_secs,
        limits = ?cfg.limits,
        "loaded config"
    );
    Ok(cfg)
}
