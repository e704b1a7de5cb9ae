//! Lock file management for reproducible installs.
//!
//! `skills-lock.json` records, for every resolved artifact, the exact commit it came
//! from and the fingerprint of its files at that commit. It is keyed by
//! `<source>/<artifact>`; the pinned ref is stored inside the entry, never in the key,
//! so an artifact has at most one entry.
//!
//! ```json
//! {
//!   "$schema": "https://skills.sh/schemas/skills-lock.json",
//!   "version": 1,
//!   "artifacts": {
//!     "anthropics/skills/pdf": {
//!       "sha": "4b825dc642cb6eb9a060e54bf8d69288fbee4904",
//!       "integrity": "sha256:9f86d081884c7d659a2feaa0c55ad015a3bf4f1b2b0b822cd15d6c15b0f00a08",
//!       "path": "skills/pdf",
//!       "ref": "v1.2.0",
//!       "metadata": {
//!         "source": "anthropics/skills",
//!         "url": "https://github.com/anthropics/skills.git",
//!         "format": "claude-marketplace",
//!         "description": "PDF toolkit"
//!       }
//!     }
//!   }
//! }
//! ```
//!
//! Entries are kept in a `BTreeMap`, so the file is written with sorted keys and
//! re-saving an unchanged lock produces identical bytes.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::constants::{LOCK_FILE_VERSION, LOCK_SCHEMA_URL};
use crate::core::SkillsError;
use crate::core::file_error::read_optional;
use crate::discovery::RepoFormat;
use crate::utils::atomic_write;

/// Where a locked artifact came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockedMetadata {
    /// Source name as declared in the project configuration
    pub source: String,
    pub url: String,
    pub format: RepoFormat,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Descriptor frontmatter or sidecar contents
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra: Option<serde_json::Value>,
}

/// One resolved artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockedArtifact {
    /// Commit the artifact was resolved against
    pub sha: String,
    /// Fingerprint of `path` at `sha`
    pub integrity: String,
    /// Artifact directory relative to the repository root
    pub path: String,
    /// Ref the user pinned, if any
    #[serde(rename = "ref", default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    pub metadata: LockedMetadata,
}

/// The lock file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockFile {
    #[serde(rename = "$schema", default = "default_schema")]
    pub schema: String,
    pub version: u32,
    #[serde(default)]
    pub artifacts: BTreeMap<String, LockedArtifact>,
}

fn default_schema() -> String {
    LOCK_SCHEMA_URL.to_string()
}

impl Default for LockFile {
    fn default() -> Self {
        Self::new()
    }
}

impl LockFile {
    #[must_use]
    pub fn new() -> Self {
        Self {
            schema: default_schema(),
            version: LOCK_FILE_VERSION,
            artifacts: BTreeMap::new(),
        }
    }

    /// Loads the lock file at `path`; a missing or empty file is an empty lock.
    ///
    /// # Errors
    ///
    /// - [`SkillsError::LockfileVersion`] when the file was written by a newer format
    /// - [`SkillsError::ConfigError`] when the file is not valid lock JSON
    pub fn load(path: &Path) -> Result<Self> {
        let Some(content) = read_optional(path, "lock file", "lockfile::load")? else {
            return Ok(Self::new());
        };
        if content.trim().is_empty() {
            return Ok(Self::new());
        }

        // check the version before the shape, so newer formats get the clearer error
        let raw: serde_json::Value = serde_json::from_str(&content).map_err(|e| {
            SkillsError::ConfigError {
                message: format!("Invalid JSON in {}: {e}", path.display()),
            }
        })?;
        if let Some(found) = raw.get("version").and_then(serde_json::Value::as_u64) {
            let found = u32::try_from(found).unwrap_or(u32::MAX);
            if found > LOCK_FILE_VERSION {
                return Err(SkillsError::LockfileVersion {
                    found,
                    supported: LOCK_FILE_VERSION,
                }
                .into());
            }
        }

        let lock: Self = serde_json::from_value(raw).map_err(|e| SkillsError::ConfigError {
            message: format!("Invalid lock file {}: {e}", path.display()),
        })?;
        tracing::debug!("Loaded {} lock entries from {}", lock.artifacts.len(), path.display());
        Ok(lock)
    }

    /// Writes the lock file atomically as pretty JSON with a trailing newline.
    pub fn save(&self, path: &Path) -> Result<()> {
        let mut content =
            serde_json::to_string_pretty(self).context("Failed to serialize lock file")?;
        content.push('\n');
        atomic_write(path, content.as_bytes())
            .with_context(|| format!("Failed to write lock file {}", path.display()))
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&LockedArtifact> {
        self.artifacts.get(key)
    }

    /// Inserts or replaces the entry for `key`, returning the previous one.
    pub fn insert(&mut self, key: impl Into<String>, entry: LockedArtifact) -> Option<LockedArtifact> {
        self.artifacts.insert(key.into(), entry)
    }

    pub fn remove(&mut self, key: &str) -> Option<LockedArtifact> {
        self.artifacts.remove(key)
    }

    /// Keeps only entries whose key satisfies `keep`; returns the removed keys.
    pub fn retain(&mut self, mut keep: impl FnMut(&str) -> bool) -> Vec<String> {
        let removed: Vec<String> =
            self.artifacts.keys().filter(|key| !keep(key)).cloned().collect();
        for key in &removed {
            self.artifacts.remove(key);
        }
        removed
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.artifacts.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.artifacts.len()
    }
}
