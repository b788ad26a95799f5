//! CLI command handlers, one per file.

mod config_path;
mod run;
mod status;

pub use config_path::run_config_path;
pub use run::run_daemon;
pub use status::run_status;
