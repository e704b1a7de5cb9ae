//! Configuration: the user's home directory, the global config file and the
//! on-disk store layout.
//!
//! # Store layout
//!
//! ```text
//! ~/.skills/
//! ├── config.toml          # optional GlobalConfig
//! ├── repos/               # one working copy per host/owner/repo
//! │   ├── .locks/          # per-working-copy checkout locks
//! │   └── github.com/anthropics/skills/
//! └── cache/               # one immutable snapshot per commit
//!     └── 4b825dc642cb6eb9a060e54bf8d69288fbee4904/
//! ```
//!
//! # Environment variables
//!
//! | Variable | Effect |
//! |----------|--------|
//! | `SKILLS_HOME` | replaces `~/.skills` |
//! | `SKILLS_CONFIG` | path of the global config file |
//! | `SKILLS_CACHE_DIR` | snapshot directory |
//! | `SKILLS_REPOS_DIR` | working-copy directory |
//!
//! Environment variables win over the config file, which wins over the defaults.

mod global;

pub use global::GlobalConfig;

use anyhow::Result;
use std::path::{Path, PathBuf};

use crate::core::file_error::{FileOperation, FileResultExt};

/// `SKILLS_HOME` if set, else `~/.skills`.
///
/// # Errors
///
/// Fails when no home directory can be determined.
pub fn get_home_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var("SKILLS_HOME") {
        return Ok(PathBuf::from(dir));
    }

    Ok(dirs::home_dir()
        .ok_or_else(|| anyhow::anyhow!("Unable to determine home directory"))?
        .join(".skills"))
}

/// Where working copies and snapshots are kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreLayout {
    pub repos_dir: PathBuf,
    pub cache_dir: PathBuf,
}

impl StoreLayout {
    /// Both stores below a single root (`<root>/repos`, `<root>/cache`).
    pub fn under(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        Self {
            repos_dir: root.join("repos"),
            cache_dir: root.join("cache"),
        }
    }

    /// Applies environment overrides, then config keys, then defaults, and creates
    /// both directories.
    pub fn resolve(config: &GlobalConfig) -> Result<Self> {
        let home = get_home_dir()?;

        let repos_dir = std::env::var_os("SKILLS_REPOS_DIR")
            .map(PathBuf::from)
            .or_else(|| config.repos_dir.clone())
            .unwrap_or_else(|| home.join("repos"));
        let cache_dir = std::env::var_os("SKILLS_CACHE_DIR")
            .map(PathBuf::from)
            .or_else(|| config.cache_dir.clone())
            .unwrap_or_else(|| home.join("cache"));

        for dir in [&repos_dir, &cache_dir] {
            std::fs::create_dir_all(dir).with_file_context(
                FileOperation::CreateDir,
                dir,
                "creating store directory",
                "config::StoreLayout::resolve",
            )?;
        }

        Ok(Self { repos_dir, cache_dir })
    }
}
