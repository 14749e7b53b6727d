//! Configuration loader with XDG-compliant path resolution
//!
//! Loads configuration from multiple locations with layered priority:
//! 1. `/etc/procrun/config.toml` (lowest priority)
//! 2. `~/.config/procrun/config.toml`
//! 3. `~/.procrun.toml`
//! 4. `./.procrun.toml` (highest priority)

use std::path::PathBuf;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use super::model::Config;
use crate::error::ExecError;

/// Application name used for XDG directories
const APP_NAME: &str = "procrun";

/// Get XDG config search paths in priority order (lowest to highest)
pub fn config_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();

    paths.push(PathBuf::from(format!("/etc/{}/config.toml", APP_NAME)));

    if let Some(config_dir) = dirs::config_dir() {
        paths.push(config_dir.join(APP_NAME).join("config.toml"));
    }

    if let Some(home) = dirs::home_dir() {
        paths.push(home.join(format!(".{}.toml", APP_NAME)));
    }

    paths.push(PathBuf::from(format!(".{}.toml", APP_NAME)));

    paths
}

/// Load configuration with XDG layering
///
/// Later files override earlier ones, an explicit `override_path` overrides
/// all files, and `PROCRUN_`-prefixed environment variables override
/// everything (`PROCRUN_DEFAULTS__SHELL=bash` maps to `defaults.shell`).
///
/// # Errors
/// * `ExecError::Config` - A source exists but does not parse or has wrong types
pub fn load_config(override_path: Option<&str>) -> Result<Config, ExecError> {
    let mut figment = Figment::new().merge(Serialized::defaults(Config::default()));

    for path in config_paths() {
        if path.exists() {
            tracing::debug!("Loading config from: {}", path.display());
            figment = figment.merge(Toml::file(&path));
        }
    }

    if let Some(path) = override_path {
        let path = PathBuf::from(path);
        if path.exists() {
            tracing::debug!("Loading override config from: {}", path.display());
            figment = figment.merge(Toml::file(&path));
        } else {
            tracing::warn!("Override config not found: {}", path.display());
        }
    }

    figment = figment.merge(Env::prefixed("PROCRUN_").split("__"));

    figment
        .extract()
        .map_err(|e| ExecError::Config(e.to_string()))
}

/// Find all existing config files
pub fn find_config_files() -> Vec<PathBuf> {
    config_paths().into_iter().filter(|p| p.exists()).collect()
}
