//! YAML frontmatter extraction.
//!
//! Extraction and parsing are separate steps. `gray_matter` locates the block and
//! hands back its raw text; `serde_yaml` then parses it. This keeps "no frontmatter"
//! (a normal outcome) apart from "frontmatter that is not valid YAML" (an error the
//! caller must surface).

use anyhow::Result;
use gray_matter::{
    Matter, Pod,
    engine::Engine,
};
use std::fmt::Debug;

use crate::core::SkillsError;

/// gray_matter engine that returns the frontmatter text untouched.
struct RawFrontmatter;

impl Engine for RawFrontmatter {
    fn parse(content: &str) -> Result<Pod, gray_matter::Error> {
        Ok(Pod::String(content.to_string()))
    }
}

/// A parsed frontmatter mapping.
#[derive(Debug, Clone, PartialEq)]
pub struct Frontmatter {
    pub mapping: serde_yaml::Mapping,
}

impl Frontmatter {
    /// A non-empty string value for `key`.
    #[must_use]
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.mapping
            .get(key)
            .and_then(serde_yaml::Value::as_str)
            .map(str::trim)
            .filter(|value| !value.is_empty())
    }

    /// The whole mapping as JSON, for storing alongside lock entries.
    pub fn to_json(&self, file: &str) -> Result<serde_json::Value> {
        serde_json::to_value(&self.mapping).map_err(|e| {
            SkillsError::ManifestParseError {
                file: file.to_string(),
                reason: format!("frontmatter cannot be represented as JSON: {e}"),
            }
            .into()
        })
    }
}

/// Extracts and parses YAML frontmatter.
pub struct FrontmatterParser {
    raw_matter: Matter<RawFrontmatter>,
}

impl Debug for FrontmatterParser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrontmatterParser").finish()
    }
}

impl Default for FrontmatterParser {
    fn default() -> Self {
        Self::new()
    }
}

impl FrontmatterParser {
    #[must_use]
    pub fn new() -> Self {
        Self {
            raw_matter: Matter::new(),
        }
    }

    /// The raw frontmatter text, if the content starts with a non-empty block.
    #[must_use]
    pub fn extract_raw(&self, content: &str) -> Option<String> {
        match self.raw_matter.parse::<String>(content) {
            Ok(result) => result.data.filter(|text| !text.trim().is_empty()),
            Err(_) => None,
        }
    }

    /// Parses the frontmatter of `content`.
    ///
    /// Returns `Ok(None)` when there is no frontmatter block.
    ///
    /// # Errors
    ///
    /// [`SkillsError::ManifestParseError`] (naming `file`) when the block is not valid
    /// YAML or is not a mapping.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use skills_cli::markdown::FrontmatterParser;
    ///
    /// let parser = FrontmatterParser::new();
    /// let fm = parser.parse("---\nname: pdf\n---\n# PDF", "SKILL.md")?.unwrap();
    /// assert_eq!(fm.get_str("name"), Some("pdf"));
    ///
    /// assert!(parser.parse("# Just a heading", "SKILL.md")?.is_none());
    /// # Ok::<(), anyhow::Error>(())
    /// ```
    pub fn parse(&self, content: &str, file: &str) -> Result<Option<Frontmatter>> {
        let Some(raw) = self.extract_raw(content) else {
            return Ok(None);
        };

        let value: serde_yaml::Value =
            serde_yaml::from_str(&raw).map_err(|e| SkillsError::ManifestParseError {
                file: file.to_string(),
                reason: format!("invalid YAML frontmatter: {e}"),
            })?;

        match value {
            serde_yaml::Value::Mapping(mapping) => Ok(Some(Frontmatter { mapping })),
            serde_yaml::Value::Null => Ok(None),
            _ => Err(SkillsError::ManifestParseError {
                file: file.to_string(),
                reason: "frontmatter must be a YAML mapping".to_string(),
            }
            .into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_frontmatter_fields() {
        let parser = FrontmatterParser::new();
        let content = "---\nname: docx\ndescription: \"Word documents\"\nlicense: MIT\n---\n\nBody";
        let fm = parser.parse(content, "SKILL.md").unwrap().unwrap();

        assert_eq!(fm.get_str("name"), Some("docx"));
        assert_eq!(fm.get_str("description"), Some("Word documents"));
        assert_eq!(fm.get_str("missing"), None);

        let json = fm.to_json("SKILL.md").unwrap();
        assert_eq!(json["license"], "MIT");
    }

    #[test]
    fn test_blank_values_are_ignored() {
        let parser = FrontmatterParser::new();
        let fm = parser.parse("---\nname: \"  \"\n---\n", "SKILL.md").unwrap().unwrap();
        assert_eq!(fm.get_str("name"), None);
    }

    #[test]
    fn test_no_frontmatter() {
        let parser = FrontmatterParser::new();
        assert!(parser.parse("# Title\n\nText", "SKILL.md").unwrap().is_none());
        assert!(parser.parse("", "SKILL.md").unwrap().is_none());
    }

    #[test]
    fn test_malformed_yaml_is_an_error() {
        let parser = FrontmatterParser::new();
        let err = parser.parse("---\nname: [unclosed\n---\n", "skills/pdf/SKILL.md").unwrap_err();

        match err.downcast_ref::<SkillsError>() {
            Some(SkillsError::ManifestParseError { file, .. }) => {
                assert_eq!(file, "skills/pdf/SKILL.md");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_scalar_frontmatter_is_an_error() {
        let parser = FrontmatterParser::new();
        assert!(parser.parse("---\njust words\n---\n", "SKILL.md").is_err());
    }
}
