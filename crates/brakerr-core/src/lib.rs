pub mod config;
pub mod error;
pub mod logging;

pub mod http;
pub mod jellyfin;
pub mod poller;
pub mod qbittorrent;
pub mod reconcile;
pub mod session;
pub mod signal;
