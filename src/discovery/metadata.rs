//! Artifact metadata from descriptor frontmatter and sidecar files.
//!
//! Both readers return `Ok(None)` when their file does not exist and an error when it
//! exists but cannot be parsed.

use anyhow::Result;
use std::path::Path;

use crate::constants::{DESCRIPTOR_FILES, SIDECAR_FILE};
use crate::core::SkillsError;
use crate::core::file_error::read_optional;
use crate::markdown::FrontmatterParser;

/// Name, description and raw metadata read from an artifact directory.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ArtifactMetadata {
    pub name: String,
    pub description: Option<String>,
    pub raw: Option<serde_json::Value>,
}

fn display_path(rel: &str, file: &str) -> String {
    if rel == "." { file.to_string() } else { format!("{rel}/{file}") }
}

/// Reads the first descriptor file present in `dir`.
///
/// A descriptor without frontmatter yields `fallback_name` and no description.
pub(crate) fn read_descriptor(
    dir: &Path,
    rel: &str,
    fallback_name: &str,
    parser: &FrontmatterParser,
) -> Result<Option<ArtifactMetadata>> {
    for file in DESCRIPTOR_FILES {
        let path = dir.join(file);
        let Some(content) = read_optional(&path, "artifact descriptor", "discovery::metadata")?
        else {
            continue;
        };

        let shown = display_path(rel, file);
        let meta = match parser.parse(&content, &shown)? {
            Some(frontmatter) => ArtifactMetadata {
                name: frontmatter.get_str("name").unwrap_or(fallback_name).to_string(),
                description: frontmatter.get_str("description").map(str::to_string),
                raw: Some(frontmatter.to_json(&shown)?),
            },
            None => {
                tracing::debug!("{} has no frontmatter", shown);
                ArtifactMetadata {
                    name: fallback_name.to_string(),
                    description: None,
                    raw: None,
                }
            }
        };
        return Ok(Some(meta));
    }
    Ok(None)
}

/// Reads the simple-format sidecar (`skill.json`) in `dir`.
pub(crate) fn read_sidecar(
    dir: &Path,
    rel: &str,
    fallback_name: &str,
) -> Result<Option<ArtifactMetadata>> {
    let path = dir.join(SIDECAR_FILE);
    let Some(content) = read_optional(&path, "artifact sidecar", "discovery::metadata")? else {
        return Ok(None);
    };

    let shown = display_path(rel, SIDECAR_FILE);
    let value: serde_json::Value =
        serde_json::from_str(&content).map_err(|e| SkillsError::ManifestParseError {
            file: shown.clone(),
            reason: e.to_string(),
        })?;
    let Some(object) = value.as_object() else {
        return Err(SkillsError::ManifestParseError {
            file: shown,
            reason: "expected a JSON object".to_string(),
        }
        .into());
    };

    let text = |key: &str| {
        object
            .get(key)
            .and_then(serde_json::Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };

    Ok(Some(ArtifactMetadata {
        name: text("name").unwrap_or_else(|| fallback_name.to_string()),
        description: text("description"),
        raw: Some(value.clone()),
    }))
}
