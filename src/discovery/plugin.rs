//! Plugin format: one `.claude-plugin/plugin.json` describing the whole repository.
//!
//! The conventional `skills/` folder is always scanned. The manifest's `skills` key
//! adds more directories; each is either an artifact itself or a container of them.
//! Everything found forms a single collection.

use anyhow::Result;
use serde::Deserialize;
use std::path::Path;

use super::{
    Claims, DiscoveredCollection, DiscoveryResult, RepoFormat, child_dirs, dir_name,
    frontmatter_artifact, has_descriptor, normalize_rel,
};
use crate::constants::{ARTIFACTS_DIR, PLUGIN_MANIFEST};
use crate::core::SkillsError;
use crate::core::file_error::read_optional;
use crate::markdown::FrontmatterParser;

#[derive(Debug, Default, Deserialize)]
struct PluginManifest {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    skills: Option<OneOrMany>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl OneOrMany {
    fn into_vec(self) -> Vec<String> {
        match self {
            Self::One(path) => vec![path],
            Self::Many(paths) => paths,
        }
    }
}

fn load_manifest(base: &Path) -> Result<PluginManifest> {
    let path = base.join(PLUGIN_MANIFEST);
    let Some(content) = read_optional(&path, "plugin manifest", "discovery::plugin")? else {
        return Ok(PluginManifest::default());
    };

    serde_json::from_str(&content).map_err(|e| {
        SkillsError::ManifestParseError {
            file: PLUGIN_MANIFEST.to_string(),
            reason: e.to_string(),
        }
        .into()
    })
}

/// Artifact directories under one scanned location.
fn candidates(base: &Path, rel: &str, allow_self: bool) -> Result<Vec<String>> {
    let dir = base.join(rel);
    if allow_self && has_descriptor(&dir) {
        return Ok(vec![rel.to_string()]);
    }
    Ok(child_dirs(&dir)?
        .into_iter()
        .map(|child| if rel == "." { child } else { format!("{rel}/{child}") })
        .collect())
}

pub(crate) fn discover(base: &Path, root_name: &str) -> Result<DiscoveryResult> {
    let manifest = load_manifest(base)?;
    let parser = FrontmatterParser::new();
    let mut claims = Claims::default();
    let mut result = DiscoveryResult::empty(RepoFormat::ClaudePlugin);

    let mut locations = vec![(ARTIFACTS_DIR.to_string(), false)];
    for extra in manifest.skills.map(OneOrMany::into_vec).unwrap_or_default() {
        match normalize_rel(".", &extra) {
            Some(rel) => locations.push((rel, true)),
            None => tracing::warn!("Skipping '{}' from {}: path leaves the repository", extra, PLUGIN_MANIFEST),
        }
    }

    for (location, allow_self) in locations {
        for rel in candidates(base, &location, allow_self)? {
            if !claims.claim(&rel) {
                continue;
            }
            result.artifacts.push(frontmatter_artifact(
                base,
                &rel,
                root_name,
                RepoFormat::ClaudePlugin,
                manifest.description.as_deref(),
                &parser,
            )?);
        }
    }

    if !result.artifacts.is_empty() {
        result.collections.push(DiscoveredCollection {
            name: manifest.name.unwrap_or_else(|| dir_name(root_name, ".")),
            description: manifest.description,
            artifacts: result.artifact_names(),
            path: ".".to_string(),
        });
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discovery::tests::write;
    use tempfile::TempDir;

    #[test]
    fn test_default_folder_and_single_collection() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        write(root, PLUGIN_MANIFEST, r#"{"name": "office", "description": "Office formats"}"#);
        write(root, "skills/pdf/SKILL.md", "---\nname: pdf\n---\n");
        write(root, "skills/docx/skill.md", "---\nname: docx\ndescription: Word\n---\n");

        let result = discover(root, "office").unwrap();
        assert_eq!(result.artifact_names(), vec!["docx", "pdf"]);
        assert_eq!(result.collections.len(), 1);

        let collection = &result.collections[0];
        assert_eq!(collection.name, "office");
        assert_eq!(collection.description.as_deref(), Some("Office formats"));
        assert_eq!(collection.artifacts, vec!["docx", "pdf"]);
    }

    #[test]
    fn test_extra_directories_merge_without_duplicates() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        write(
            root,
            PLUGIN_MANIFEST,
            r#"{"skills": ["./extra", "./skills", "./standalone"]}"#,
        );
        write(root, "skills/pdf/SKILL.md", "---\nname: pdf\n---\n");
        write(root, "extra/xlsx/SKILL.md", "---\nname: xlsx\n---\n");
        write(root, "standalone/SKILL.md", "---\nname: solo\n---\n");
        write(root, "standalone/nested/SKILL.md", "---\nname: not-scanned\n---\n");

        let result = discover(root, "office").unwrap();
        assert_eq!(result.artifact_names(), vec!["pdf", "xlsx", "solo"]);
        assert_eq!(result.find_artifact("solo").unwrap().path, "standalone");
        assert_eq!(result.collections[0].artifacts.len(), 3);
    }

    #[test]
    fn test_skills_as_single_string() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        write(root, PLUGIN_MANIFEST, r#"{"name": "p", "skills": "custom"}"#);
        write(root, "custom/review/SKILL.md", "---\nname: review\n---\n");

        let result = discover(root, "office").unwrap();
        assert_eq!(result.artifact_names(), vec!["review"]);
        assert_eq!(result.artifacts[0].path, "custom/review");
    }

    #[test]
    fn test_unnamed_collection_uses_root_name() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("6aaf885c0d1e2f3a4b5c6d7e8f9a0b1c2d3e4f50");
        write(&root, PLUGIN_MANIFEST, "{}");
        write(&root, "skills/pdf/README.md", "no descriptor");

        let result = discover(&root, "my-plugin").unwrap();
        assert_eq!(result.collections[0].name, "my-plugin");
        assert_eq!(result.artifacts[0].name, "pdf");
        assert!(result.artifacts[0].metadata.is_none());
    }

    #[test]
    fn test_no_artifacts_means_no_collection() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), PLUGIN_MANIFEST, r#"{"name": "empty"}"#);

        let result = discover(temp.path(), "office").unwrap();
        assert!(result.artifacts.is_empty());
        assert!(result.collections.is_empty());
    }

    #[test]
    fn test_malformed_manifest() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), PLUGIN_MANIFEST, r#"{"skills": 42}"#);

        let err = discover(temp.path(), "office").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<SkillsError>(),
            Some(SkillsError::ManifestParseError { .. })
        ));
    }
}
