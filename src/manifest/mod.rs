//! Project configuration (`skills.json`).
//!
//! The project file declares which repositories to draw from and which artifacts
//! and collections to install. It is edited by `skills add`/`skills remove` and by
//! hand; resolved commits never appear here, only in the lock file.
//!
//! ```json
//! {
//!   "$schema": "https://skills.sh/schemas/skills.json",
//!   "sources": [
//!     { "name": "anthropics/skills", "url": "https://github.com/anthropics/skills.git" }
//!   ],
//!   "artifacts": ["anthropics/skills/pdf@v1.2.0"],
//!   "collections": ["anthropics/skills/document-skills"]
//! }
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::constants::{CONFIG_FILE, CONFIG_SCHEMA_URL};
use crate::core::SkillsError;
use crate::core::file_error::read_optional;
use crate::resolver::reference::ArtifactRef;
use crate::source::Source;
use crate::utils::atomic_write;

/// The parsed `skills.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectConfig {
    #[serde(rename = "$schema", default = "default_schema")]
    pub schema: String,

    #[serde(default)]
    pub sources: Vec<Source>,

    /// `<source>/<artifact>[@<ref>]` declarations
    #[serde(default)]
    pub artifacts: Vec<String>,

    /// `<source>/<collection>` declarations
    #[serde(default)]
    pub collections: Vec<String>,
}

fn default_schema() -> String {
    CONFIG_SCHEMA_URL.to_string()
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            schema: default_schema(),
            sources: Vec::new(),
            artifacts: Vec::new(),
            collections: Vec::new(),
        }
    }
}

impl ProjectConfig {
    /// Path of the project file inside `project_dir`.
    #[must_use]
    pub fn path_in(project_dir: &Path) -> PathBuf {
        project_dir.join(CONFIG_FILE)
    }

    /// Loads `skills.json` from `project_dir`; an absent file is an empty project.
    ///
    /// # Errors
    ///
    /// [`SkillsError::ConfigError`] when the file is not valid JSON for this schema.
    pub fn load(project_dir: &Path) -> Result<Self> {
        let path = Self::path_in(project_dir);
        let Some(content) = read_optional(&path, "project configuration", "manifest::load")?
        else {
            tracing::debug!("No {} in {}, starting empty", CONFIG_FILE, project_dir.display());
            return Ok(Self::default());
        };

        serde_json::from_str(&content).map_err(|e| {
            SkillsError::ConfigError {
                message: format!("Invalid {}: {e}", path.display()),
            }
            .into()
        })
    }

    /// Writes `skills.json` atomically as pretty JSON with a trailing newline.
    pub fn save(&self, project_dir: &Path) -> Result<()> {
        let path = Self::path_in(project_dir);
        let mut content =
            serde_json::to_string_pretty(self).context("Failed to serialize project configuration")?;
        content.push('\n');
        atomic_write(&path, content.as_bytes())
            .with_context(|| format!("Failed to write {}", path.display()))
    }

    /// Registers `source`.
    ///
    /// Returns `false` when an identical source is already registered.
    ///
    /// # Errors
    ///
    /// [`SkillsError::DuplicateSource`] when the name is taken by a source that differs
    /// in URL, subdirectory or forced format.
    pub fn add_source(&mut self, source: Source) -> Result<bool> {
        if let Some(existing) = self.find_source(&source.name) {
            if *existing == source {
                tracing::debug!("Source '{}' already declared", source.name);
                return Ok(false);
            }
            return Err(SkillsError::DuplicateSource {
                name: source.name,
                existing: existing.to_string(),
            }
            .into());
        }
        self.sources.push(source);
        Ok(true)
    }

    #[must_use]
    pub fn find_source(&self, name: &str) -> Option<&Source> {
        self.sources.iter().find(|s| s.name == name)
    }

    /// Declares an artifact, replacing any declaration with the same lock key.
    pub fn add_artifact(&mut self, reference: &ArtifactRef) {
        let key = reference.key();
        self.artifacts.retain(|declared| declared_key(declared).as_deref() != Some(key.as_str()));
        self.artifacts.push(reference.to_string());
    }

    /// Declares a collection; pins are not recorded for collections.
    pub fn add_collection(&mut self, reference: &ArtifactRef) {
        let key = reference.key();
        if !self.collections.iter().any(|declared| declared_key(declared).as_deref() == Some(key.as_str())) {
            self.collections.push(key);
        }
    }

    /// Removes the artifact or collection declared as `target` (pin optional).
    ///
    /// Returns whether anything was removed.
    pub fn remove(&mut self, target: &str) -> bool {
        let key = declared_key(target).unwrap_or_else(|| target.to_string());
        let before = self.artifacts.len() + self.collections.len();
        self.artifacts.retain(|declared| declared_key(declared).as_deref() != Some(key.as_str()));
        self.collections.retain(|declared| declared_key(declared).as_deref() != Some(key.as_str()));
        before != self.artifacts.len() + self.collections.len()
    }

    /// Parsed artifact declarations, in file order.
    pub fn artifact_refs(&self) -> Result<Vec<ArtifactRef>> {
        self.artifacts.iter().map(|declared| ArtifactRef::parse(declared)).collect()
    }

    /// Parsed collection declarations, in file order.
    pub fn collection_refs(&self) -> Result<Vec<ArtifactRef>> {
        self.collections.iter().map(|declared| ArtifactRef::parse(declared)).collect()
    }

    /// Checks that source names are unique and every declaration parses and names a
    /// declared source.
    ///
    /// # Errors
    ///
    /// - [`SkillsError::ConfigError`] for duplicate source names
    /// - [`SkillsError::InvalidReference`] for malformed declarations
    /// - [`SkillsError::SourceNotFound`] for declarations naming unknown sources
    pub fn validate(&self) -> Result<()> {
        let mut names = HashSet::new();
        for source in &self.sources {
            if !names.insert(source.name.as_str()) {
                return Err(SkillsError::ConfigError {
                    message: format!("Source '{}' is declared more than once", source.name),
                }
                .into());
            }
        }

        for reference in self.artifact_refs()?.into_iter().chain(self.collection_refs()?) {
            if !names.contains(reference.source.as_str()) {
                return Err(SkillsError::SourceNotFound {
                    name: reference.source,
                }
                .into());
            }
        }
        Ok(())
    }
}

fn declared_key(declared: &str) -> Option<String> {
    ArtifactRef::parse(declared).ok().map(|r| r.key())
}
