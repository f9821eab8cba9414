//! Configuration file discovery
//!
//! Order: `--config`, then `DDNSD_CONFIG_PATH`, then the first existing file
//! among `$HOME/.config/ddnsd/ddnsd.toml`, `/etc/ddnsd/ddnsd.toml` and
//! `./ddnsd.toml`. An explicitly named path is returned even if it does not
//! exist, so the load error names the file the operator asked for.

use anyhow::{Result, bail};
use std::path::{Path, PathBuf};

/// Environment variable naming the configuration file
pub const CONFIG_PATH_ENV: &str = "DDNSD_CONFIG_PATH";

const FILE_NAME: &str = "ddnsd.toml";

/// Home directory of the invoking user
///
/// Falls back to the passwd entry when `HOME` is unset, as under systemd.
pub fn home_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|dirs| dirs.home_dir().to_path_buf())
}

/// Locations searched when no path is given explicitly
pub fn default_candidates(home: Option<&Path>) -> Vec<PathBuf> {
    let mut candidates = Vec::new();
    if let Some(home) = home {
        candidates.push(home.join(".config").join("ddnsd").join(FILE_NAME));
    }
    candidates.push(PathBuf::from("/etc/ddnsd").join(FILE_NAME));
    candidates.push(PathBuf::from(FILE_NAME));
    candidates
}

/// Pick the configuration file to load
pub fn find_config(
    cli_path: Option<&Path>,
    env_path: Option<&str>,
    candidates: &[PathBuf],
) -> Result<PathBuf> {
    if let Some(path) = cli_path {
        return Ok(path.to_path_buf());
    }

    if let Some(path) = env_path.filter(|p| !p.is_empty()) {
        return Ok(PathBuf::from(path));
    }

    if let Some(path) = candidates.iter().find(|p| p.is_file()) {
        return Ok(path.clone());
    }

    let searched: Vec<String> = candidates.iter().map(|p| p.display().to_string()).collect();
    bail!(
        "No configuration file found. Pass --config, set {}, or create one of: {}",
        CONFIG_PATH_ENV,
        searched.join(", ")
    )
}
