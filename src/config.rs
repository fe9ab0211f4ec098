use crate::posture::PostureThresholds;
use crate::session::DEFAULT_STATE_KEY;
use crate::store;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

pub const EXAMPLE: &str = include_str!("../config.example.toml");

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub storage: StorageConfig,
    pub posture: PostureThresholds,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    File,
    Memory,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub dir: PathBuf,
    pub key: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::File,
            dir: PathBuf::from(".stride-lab"),
            key: DEFAULT_STATE_KEY.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "warn".to_string(),
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed reading config file: {}", path.display()))?;
        let cfg: Config = toml::from_str(&raw)
            .with_context(|| format!("failed parsing config file: {}", path.display()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load `path` if given (defaults otherwise), then apply environment
    /// overrides.
    pub fn resolve(path: Option<&Path>) -> Result<Self> {
        let mut cfg = match path {
            Some(p) => Self::load(p)?,
            None => Self::default(),
        };
        cfg.apply_env();
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn apply_env(&mut self) {
        if let Ok(dir) = std::env::var("STRIDE_STATE_DIR") {
            if !dir.trim().is_empty() {
                self.storage.dir = PathBuf::from(dir.trim());
                self.storage.backend = StorageBackend::File;
            }
        }
        if let Ok(key) = std::env::var("STRIDE_STATE_KEY") {
            if !key.trim().is_empty() {
                self.storage.key = key.trim().to_string();
            }
        }
        self.posture = self.posture.with_env_overrides();
    }

    pub fn validate(&self) -> Result<()> {
        let p = &self.posture;
        if p.strong_score > 100 {
            anyhow::bail!("posture.strong_score must be at most 100 (got {})", p.strong_score);
        }
        if p.fair_score >= p.strong_score {
            anyhow::bail!(
                "posture.fair_score ({}) must be below posture.strong_score ({})",
                p.fair_score,
                p.strong_score
            );
        }
        if self.storage.key.trim().is_empty() {
            anyhow::bail!("storage.key must not be empty");
        }
        // File storage turns the key into a file name.
        if self.storage.backend == StorageBackend::File {
            store::validate_key(&self.storage.key)
                .context("storage.key is not usable with file storage")?;
        }
        Ok(())
    }
}
