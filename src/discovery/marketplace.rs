//! Marketplace format: `.claude-plugin/marketplace.json` lists named groups.
//!
//! ```json
//! {
//!   "name": "anthropic-agent-skills",
//!   "plugins": [
//!     { "name": "document-skills", "description": "Office formats",
//!       "skills": ["./skills/pdf", "./skills/docx"] },
//!     { "name": "example-skills", "source": "./examples" }
//!   ]
//! }
//! ```
//!
//! A group with an explicit `skills` list contributes exactly those directories
//! (resolved against its `source`, default the root). A group without one contributes
//! every directory under `<source>/skills/`. Each group with at least one contributed
//! artifact becomes a collection.

use anyhow::Result;
use serde::Deserialize;
use std::path::Path;

use super::{
    Claims, DiscoveredCollection, DiscoveryResult, RepoFormat, child_dirs, frontmatter_artifact,
    normalize_rel,
};
use crate::constants::{ARTIFACTS_DIR, MARKETPLACE_MANIFEST};
use crate::core::SkillsError;
use crate::core::file_error::read_optional;
use crate::markdown::FrontmatterParser;

#[derive(Debug, Deserialize)]
struct MarketplaceManifest {
    #[serde(default)]
    plugins: Vec<PluginGroup>,
}

#[derive(Debug, Deserialize)]
struct PluginGroup {
    name: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    source: Option<GroupSource>,
    #[serde(default)]
    skills: Option<Vec<String>>,
}

/// A group's `source`: a local directory, or a remote reference that cannot be scanned.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum GroupSource {
    Path(String),
    Remote(serde_json::Value),
}

fn load_manifest(base: &Path) -> Result<MarketplaceManifest> {
    let path = base.join(MARKETPLACE_MANIFEST);
    let Some(content) = read_optional(&path, "marketplace manifest", "discovery::marketplace")?
    else {
        return Ok(MarketplaceManifest { plugins: Vec::new() });
    };

    serde_json::from_str(&content).map_err(|e| {
        SkillsError::ManifestParseError {
            file: MARKETPLACE_MANIFEST.to_string(),
            reason: e.to_string(),
        }
        .into()
    })
}

pub(crate) fn discover(base: &Path, root_name: &str) -> Result<DiscoveryResult> {
    let manifest = load_manifest(base)?;
    let parser = FrontmatterParser::new();
    let mut claims = Claims::default();
    let mut result = DiscoveryResult::empty(RepoFormat::ClaudeMarketplace);

    for group in &manifest.plugins {
        let group_dir = match &group.source {
            None => ".".to_string(),
            Some(GroupSource::Path(path)) => match normalize_rel(".", path) {
                Some(dir) => dir,
                None => {
                    tracing::warn!(
                        "Skipping group '{}': source '{}' leaves the repository",
                        group.name,
                        path
                    );
                    continue;
                }
            },
            Some(GroupSource::Remote(_)) => {
                tracing::debug!("Group '{}' has a remote source; scanning the root", group.name);
                ".".to_string()
            }
        };

        let candidates: Vec<String> = match &group.skills {
            Some(explicit) => explicit
                .iter()
                .filter_map(|path| {
                    let rel = normalize_rel(&group_dir, path);
                    if rel.is_none() {
                        tracing::warn!(
                            "Skipping '{}' in group '{}': path leaves the repository",
                            path,
                            group.name
                        );
                    }
                    rel
                })
                .filter(|rel| {
                    let exists = base.join(rel).is_dir();
                    if !exists {
                        tracing::warn!("Group '{}' lists missing directory '{}'", group.name, rel);
                    }
                    exists
                })
                .collect(),
            None => {
                let container = normalize_rel(&group_dir, ARTIFACTS_DIR)
                    .unwrap_or_else(|| ARTIFACTS_DIR.to_string());
                child_dirs(&base.join(&container))?
                    .into_iter()
                    .map(|child| format!("{container}/{child}"))
                    .collect()
            }
        };

        let mut members = Vec::new();
        for rel in candidates {
            if !claims.claim(&rel) {
                continue;
            }
            let artifact = frontmatter_artifact(
                base,
                &rel,
                root_name,
                RepoFormat::ClaudeMarketplace,
                group.description.as_deref(),
                &parser,
            )?;
            members.push(artifact.name.clone());
            result.artifacts.push(artifact);
        }

        if members.is_empty() {
            tracing::debug!("Group '{}' contributed no artifacts", group.name);
            continue;
        }
        result.collections.push(DiscoveredCollection {
            name: group.name.clone(),
            description: group.description.clone(),
            artifacts: members,
            path: group_dir,
        });
    }

    Ok(result)
}
