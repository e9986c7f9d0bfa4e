use anyhow::{Context, Result};
use faceid_match::{Matcher, DEFAULT_TOLERANCE};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub static CONFIG_PATH: Lazy<&'static Path> = Lazy::new(|| {
    Path::new(option_env!("FACEID_CONFIG_PATH").unwrap_or("/usr/local/etc/faceid/config.toml"))
});

pub static FACE_STORE_PREFIX: Lazy<&'static Path> = Lazy::new(|| {
    Path::new(option_env!("FACEID_STORE_PREFIX").unwrap_or("/usr/local/etc/faceid"))
});

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Maximum Euclidean distance for a match, lower is stricter.
    pub tolerance: f64,
    /// Length of the encodings produced by the embedding model.
    pub dimension: usize,
    pub store_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tolerance: DEFAULT_TOLERANCE,
            dimension: 128,
            store_dir: None,
        }
    }
}

impl Config {
    pub fn matcher(&self) -> Matcher {
        Matcher::new(self.dimension).with_tolerance(self.tolerance)
    }

    pub fn store_dir(&self) -> &Path {
        self.store_dir.as_deref().unwrap_or(&FACE_STORE_PREFIX)
    }
}

pub fn load_config(path: Option<&Path>) -> Result<Config> {
    let path = path.unwrap_or(&CONFIG_PATH);
    if !path.exists() {
        return Ok(Config::default());
    }
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading config at {}", path.display()))?;
    toml::from_str(&raw).with_context(|| format!("parsing config {}", path.display()))
}

pub fn save_config(cfg: &Config, path: Option<&Path>) -> Result<()> {
    let path = path.unwrap_or(&CONFIG_PATH);
    let data = toml::to_string_pretty(cfg)?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, data)?;
    Ok(())
}
