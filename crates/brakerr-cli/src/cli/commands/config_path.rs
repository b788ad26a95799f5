//! `brakerr config-path` – print where the config file lives.

use anyhow::Result;
use brakerr_core::config;
use std::path::Path;

pub fn run_config_path(explicit: Option<&Path>) -> Result<()> {
    let path = match explicit {
        Some(p) => p.to_path_buf(),
        None => config::config_path()?,
    };
    println!("{}", path.display());
    Ok(())
}
