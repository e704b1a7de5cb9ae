//! Global (per-user) configuration.
//!
//! Stored as TOML at `~/.skills/config.toml`, or wherever `SKILLS_CONFIG` points.
//! Every key is optional; a missing file is the default configuration.
//!
//! ```toml
//! cache_dir = "/var/cache/skills"
//! repos_dir = "/var/cache/skills-repos"
//! git_timeout_secs = 120
//! install_targets = ["claude-code", "codex"]
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;

use crate::constants::DEFAULT_GIT_TIMEOUT;

/// User-wide settings shared by every project.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalConfig {
    /// Where immutable commit snapshots live
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_dir: Option<PathBuf>,

    /// Where full working copies live
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repos_dir: Option<PathBuf>,

    /// Upper bound for a single git subprocess
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub git_timeout_secs: Option<u64>,

    /// Install targets to use instead of all known ones
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub install_targets: Option<Vec<String>>,
}

impl GlobalConfig {
    /// Loads the config from [`GlobalConfig::default_path`], or the default when absent.
    pub async fn load() -> Result<Self> {
        let path = Self::default_path()?;
        if path.exists() {
            Self::load_from(&path).await
        } else {
            tracing::debug!("No global config at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    /// Loads the config from an explicit path.
    ///
    /// # Errors
    ///
    /// Fails when the file cannot be read or is not valid TOML for this schema.
    pub async fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read global config from {}", path.display()))?;

        toml::from_str(&content)
            .with_context(|| format!("Failed to parse global config from {}", path.display()))
    }

    /// Writes the config as pretty TOML, creating the parent directory.
    pub async fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await.with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize global config")?;

        fs::write(path, content)
            .await
            .with_context(|| format!("Failed to write global config to {}", path.display()))
    }

    /// `SKILLS_CONFIG` if set, else `<home>/config.toml`.
    pub fn default_path() -> Result<PathBuf> {
        if let Ok(path) = std::env::var("SKILLS_CONFIG") {
            return Ok(PathBuf::from(path));
        }
        Ok(super::get_home_dir()?.join("config.toml"))
    }

    /// The git timeout to hand to the stager.
    #[must_use]
    pub fn git_timeout(&self) -> Duration {
        self.git_timeout_secs.map_or(DEFAULT_GIT_TIMEOUT, Duration::from_secs)
    }
}
