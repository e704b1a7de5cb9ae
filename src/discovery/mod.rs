//! Format detection and artifact discovery.
//!
//! A staged repository (or a `subdir` of it) publishes artifacts under one of several
//! conventions. [`detect`] picks the convention by strict precedence:
//!
//! 1. `.claude-plugin/marketplace.json` → [`RepoFormat::ClaudeMarketplace`]
//! 2. `.claude-plugin/plugin.json` → [`RepoFormat::ClaudePlugin`]
//! 3. a `skills/` directory → [`RepoFormat::Simple`]
//! 4. otherwise [`RepoFormat::Unknown`]
//!
//! [`discover`] then dispatches to the matching strategy and returns a
//! [`DiscoveryResult`]. An explicit `format` on the [`Source`] skips detection.
//!
//! Finding nothing is a successful, empty result. Only malformed manifests,
//! descriptors or sidecars fail, with [`crate::core::SkillsError::ManifestParseError`].
//!
//! # Path de-duplication
//!
//! Strategies that scan several places (marketplace groups, plugin directories) share a
//! [`Claims`] set keyed by normalized relative path. The first scan to reach a path owns
//! it; later scans skip it, so a path yields at most one [`DiscoveredArtifact`].

mod marketplace;
mod metadata;
mod plugin;
mod simple;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use walkdir::WalkDir;

use crate::constants::{
    ARTIFACTS_DIR, DESCRIPTOR_FILES, FALLBACK_SEARCH_DEPTH, FALLBACK_SEARCH_DIRS,
    MARKETPLACE_MANIFEST, PLUGIN_MANIFEST, SKIP_DIRS,
};
use crate::markdown::FrontmatterParser;
use crate::source::Source;
use crate::utils::normalize_path_for_storage;

/// Manifest convention a repository follows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RepoFormat {
    ClaudeMarketplace,
    ClaudePlugin,
    Simple,
    Unknown,
}

impl RepoFormat {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ClaudeMarketplace => "claude-marketplace",
            Self::ClaudePlugin => "claude-plugin",
            Self::Simple => "simple",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for RepoFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RepoFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "claude-marketplace" => Ok(Self::ClaudeMarketplace),
            "claude-plugin" => Ok(Self::ClaudePlugin),
            "simple" => Ok(Self::Simple),
            "unknown" => Ok(Self::Unknown),
            other => Err(anyhow::anyhow!(
                "Unknown format '{other}' (expected claude-marketplace, claude-plugin, simple or unknown)"
            )),
        }
    }
}

/// What kind of bundle an artifact is.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    #[default]
    Skill,
}

/// An artifact found by discovery. Recomputed on every call, never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscoveredArtifact {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub kind: ArtifactKind,
    /// Relative to the discovery root, `/`-separated, `.` for the root itself
    pub path: String,
    pub format: RepoFormat,
    /// Frontmatter or sidecar contents, when a descriptor was found
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

/// A named group of artifacts from the same discovery result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveredCollection {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Member artifact names
    pub artifacts: Vec<String>,
    pub path: String,
}

/// Everything a repository publishes at one commit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscoveryResult {
    pub artifacts: Vec<DiscoveredArtifact>,
    pub collections: Vec<DiscoveredCollection>,
    pub format: RepoFormat,
}

impl DiscoveryResult {
    #[must_use]
    pub const fn empty(format: RepoFormat) -> Self {
        Self {
            artifacts: Vec::new(),
            collections: Vec::new(),
            format,
        }
    }

    /// The first artifact with this name.
    #[must_use]
    pub fn find_artifact(&self, name: &str) -> Option<&DiscoveredArtifact> {
        self.artifacts.iter().find(|a| a.name == name)
    }

    #[must_use]
    pub fn find_collection(&self, name: &str) -> Option<&DiscoveredCollection> {
        self.collections.iter().find(|c| c.name == name)
    }

    #[must_use]
    pub fn artifact_names(&self) -> Vec<String> {
        self.artifacts.iter().map(|a| a.name.clone()).collect()
    }

    #[must_use]
    pub fn collection_names(&self) -> Vec<String> {
        self.collections.iter().map(|c| c.name.clone()).collect()
    }

    /// Names reported by more than one artifact; lookups only ever see the first.
    #[must_use]
    pub fn duplicate_names(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut duplicates = Vec::new();
        for artifact in &self.artifacts {
            if !seen.insert(artifact.name.as_str()) && !duplicates.contains(&artifact.name) {
                duplicates.push(artifact.name.clone());
            }
        }
        duplicates
    }
}

/// Detects the manifest convention used at `root`.
///
/// ```rust,no_run
/// use skills_cli::discovery::{RepoFormat, detect};
/// use std::path::Path;
///
/// assert_eq!(detect(Path::new("/path/to/snapshot")), RepoFormat::Simple);
/// ```
#[must_use]
pub fn detect(root: &Path) -> RepoFormat {
    if root.join(MARKETPLACE_MANIFEST).is_file() {
        RepoFormat::ClaudeMarketplace
    } else if root.join(PLUGIN_MANIFEST).is_file() {
        RepoFormat::ClaudePlugin
    } else if root.join(ARTIFACTS_DIR).is_dir() {
        RepoFormat::Simple
    } else {
        RepoFormat::Unknown
    }
}

/// Discovers the artifacts and collections `source` publishes in `repo_root`.
///
/// Discovery runs against `repo_root/subdir` when the source has a subdirectory. A
/// missing subdirectory is an empty result. Unnamed artifacts or collections at the
/// discovery root take [`Source::root_name`], never the name of `repo_root` itself,
/// so names stay stable across commits.
///
/// # Errors
///
/// [`crate::core::SkillsError::ManifestParseError`] for malformed manifest JSON,
/// frontmatter YAML or sidecar JSON; io errors other than "not found".
pub fn discover(repo_root: &Path, source: &Source) -> Result<DiscoveryResult> {
    let base = match source.subdir.as_deref() {
        Some(subdir) => repo_root.join(subdir),
        None => repo_root.to_path_buf(),
    };

    if !base.is_dir() {
        tracing::warn!(
            "Discovery root {} does not exist in source '{}'",
            base.display(),
            source.name
        );
        return Ok(DiscoveryResult::empty(source.format.unwrap_or(RepoFormat::Unknown)));
    }

    let format = match source.format {
        Some(forced) => {
            tracing::debug!("Source '{}' forces format {}", source.name, forced);
            forced
        }
        None => detect(&base),
    };

    let root_name = source.root_name();
    let result = match format {
        RepoFormat::ClaudeMarketplace => marketplace::discover(&base, &root_name),
        RepoFormat::ClaudePlugin => plugin::discover(&base, &root_name),
        RepoFormat::Simple => simple::discover(&base),
        RepoFormat::Unknown => discover_fallback(&base, &root_name),
    }
    .with_context(|| format!("Failed to discover artifacts in source '{}'", source.name))?;

    for name in result.duplicate_names() {
        tracing::warn!("Source '{}' publishes more than one artifact named '{}'", source.name, name);
    }
    tracing::debug!(
        "Discovered {} artifact(s) and {} collection(s) in '{}' ({})",
        result.artifacts.len(),
        result.collections.len(),
        source.name,
        result.format
    );
    Ok(result)
}

/// Best effort for repositories following no known convention.
///
/// Tries the simple strategy, then the root itself as an artifact, then the
/// well-known agent folders. When those yield nothing, walks the tree up to
/// [`FALLBACK_SEARCH_DEPTH`] levels deep.
fn discover_fallback(base: &Path, root_name: &str) -> Result<DiscoveryResult> {
    let mut result = simple::discover(base)?;
    result.format = RepoFormat::Unknown;
    if !result.artifacts.is_empty() {
        for artifact in &mut result.artifacts {
            artifact.format = RepoFormat::Unknown;
        }
        return Ok(result);
    }

    let parser = FrontmatterParser::new();
    if has_descriptor(base) {
        let artifact =
            frontmatter_artifact(base, ".", root_name, RepoFormat::Unknown, None, &parser)?;
        result.artifacts.push(artifact);
        return Ok(result);
    }

    let mut claims = Claims::default();
    for dir in FALLBACK_SEARCH_DIRS {
        for child in child_dirs(&base.join(dir))? {
            let rel = format!("{dir}/{child}");
            if has_descriptor(&base.join(&rel)) && claims.claim(&rel) {
                result.artifacts.push(frontmatter_artifact(
                    base,
                    &rel,
                    root_name,
                    RepoFormat::Unknown,
                    None,
                    &parser,
                )?);
            }
        }
    }

    if result.artifacts.is_empty() {
        for rel in search_tree(base)? {
            result.artifacts.push(frontmatter_artifact(
                base,
                &rel,
                root_name,
                RepoFormat::Unknown,
                None,
                &parser,
            )?);
        }
    }
    Ok(result)
}

fn is_skipped(entry: &walkdir::DirEntry) -> bool {
    let name = entry.file_name().to_string_lossy();
    name.starts_with('.') || SKIP_DIRS.iter().any(|skip| *skip == name)
}

/// Directories below `base` holding a descriptor, in walk order.
///
/// Does not descend into a directory once it is found to be an artifact.
fn search_tree(base: &Path) -> Result<Vec<String>> {
    let mut found = Vec::new();
    let mut walker = WalkDir::new(base)
        .min_depth(1)
        .max_depth(FALLBACK_SEARCH_DEPTH)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.file_type().is_dir() && !is_skipped(e));

    while let Some(entry) = walker.next() {
        let entry = entry.with_context(|| format!("Failed to walk directory: {}", base.display()))?;
        if !has_descriptor(entry.path()) {
            continue;
        }
        let rel = entry
            .path()
            .strip_prefix(base)
            .with_context(|| format!("{} is outside {}", entry.path().display(), base.display()))?;
        found.push(normalize_path_for_storage(rel));
        walker.skip_current_dir();
    }

    tracing::debug!("Tree search under {} found {} artifact(s)", base.display(), found.len());
    Ok(found)
}

/// Relative paths already contributed by an earlier scan.
#[derive(Debug, Default)]
pub(crate) struct Claims {
    seen: HashSet<String>,
}

impl Claims {
    /// Returns `true` if `rel` was not claimed before.
    pub(crate) fn claim(&mut self, rel: &str) -> bool {
        let fresh = self.seen.insert(rel.to_string());
        if !fresh {
            tracing::debug!("Skipping {}: already contributed by an earlier group", rel);
        }
        fresh
    }
}

/// Lexically normalizes `path` relative to `parent` (both relative to the discovery root).
///
/// Returns `None` when the result would leave the root. The root itself is `"."`.
pub(crate) fn normalize_rel(parent: &str, path: &str) -> Option<String> {
    let mut parts: Vec<&str> = Vec::new();
    let joined = if path.starts_with('/') { path.to_string() } else { format!("{parent}/{path}") };
    for segment in joined.split(['/', '\\']) {
        match segment {
            "" | "." => {}
            ".." => {
                parts.pop()?;
            }
            other => parts.push(other),
        }
    }
    if parts.is_empty() { Some(".".to_string()) } else { Some(parts.join("/")) }
}

/// Immediate subdirectories of `dir` that may hold artifacts, sorted by name.
///
/// Hidden and build directories are skipped. A missing `dir` yields nothing.
pub(crate) fn child_dirs(dir: &Path) -> Result<Vec<String>> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) if e.kind() == std::io::ErrorKind::NotADirectory => return Ok(Vec::new()),
        Err(e) => {
            return Err(e).with_context(|| format!("Failed to read directory: {}", dir.display()));
        }
    };

    let mut names = Vec::new();
    for entry in entries {
        let entry = entry.with_context(|| format!("Failed to read directory: {}", dir.display()))?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().to_string();
        if name.starts_with('.') || SKIP_DIRS.contains(&name.as_str()) {
            continue;
        }
        names.push(name);
    }
    names.sort();
    Ok(names)
}

/// Whether `dir` contains one of the descriptor files.
pub(crate) fn has_descriptor(dir: &Path) -> bool {
    DESCRIPTOR_FILES.iter().any(|file| dir.join(file).is_file())
}

/// Last segment of `rel`; the discovery root itself is `root_name`.
pub(crate) fn dir_name(root_name: &str, rel: &str) -> String {
    match rel.rsplit('/').next() {
        Some(last) if rel != "." && !last.is_empty() => last.to_string(),
        _ => root_name.to_string(),
    }
}

/// Builds an artifact whose metadata comes from descriptor frontmatter.
///
/// Without any descriptor file the name is [`dir_name`] of `rel` and the description
/// falls back to `group_description`.
pub(crate) fn frontmatter_artifact(
    base: &Path,
    rel: &str,
    root_name: &str,
    format: RepoFormat,
    group_description: Option<&str>,
    parser: &FrontmatterParser,
) -> Result<DiscoveredArtifact> {
    let dir = if rel == "." { base.to_path_buf() } else { base.join(rel) };
    let fallback_name = dir_name(root_name, rel);

    let artifact = match metadata::read_descriptor(&dir, rel, &fallback_name, parser)? {
        Some(meta) => DiscoveredArtifact {
            name: meta.name,
            description: meta.description,
            kind: ArtifactKind::Skill,
            path: rel.to_string(),
            format,
            metadata: meta.raw,
        },
        None => DiscoveredArtifact {
            name: fallback_name,
            description: group_description.map(str::to_string),
            kind: ArtifactKind::Skill,
            path: rel.to_string(),
            format,
            metadata: None,
        },
    };
    Ok(artifact)
}
