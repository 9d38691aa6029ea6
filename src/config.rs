use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::report::OutputFormat;

#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub classifier: ClassifierConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Deserialize)]
pub struct ClassifierConfig {
    #[serde(default)]
    pub remote_url: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Default, Deserialize)]
pub struct OutputConfig {
    #[serde(default)]
    pub format: OutputFormat,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            remote_url: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_timeout_secs() -> u64 { 10 }

pub fn load_config(path: &Path) -> Option<Config> {
    let content = std::fs::read_to_string(path).ok()?;
    match toml::from_str(&content) {
        Ok(config) => Some(config),
        Err(err) => {
            log::debug!("Invalid config {}: {}", path.display(), err);
            None
        }
    }
}

/// Explicit path, else `./marinescore.toml`, else the user config dirs.
pub fn find_config(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    let local = PathBuf::from("marinescore.toml");
    if local.exists() {
        return Some(local);
    }
    if let Some(home) = dirs::home_dir() {
        let xdg = home.join(".config").join("marinescore").join("config.toml");
        if xdg.exists() {
            return Some(xdg);
        }
    }
    if let Some(config_dir) = dirs::config_dir() {
        let platform = config_dir.join("marinescore").join("config.toml");
        if platform.exists() {
            return Some(platform);
        }
    }
    None
}
