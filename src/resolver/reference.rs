//! Declared artifact and collection references.
//!
//! A reference has the shape `<source>/<name>[@<ref>]`. Source names usually contain a
//! `/` themselves (`owner/repo`), while artifact names never contain `/` or `@`, so the
//! reference is split at the first `@` and then at the last `/`:
//!
//! ```text
//! anthropics/skills/pdf@release/v2
//! └──── source ───┘ └┬┘ └── ref ──┘
//!                   name
//! ```

use anyhow::Result;
use std::fmt;
use std::str::FromStr;

use crate::core::SkillsError;

/// A parsed `<source>/<name>[@<ref>]` reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArtifactRef {
    pub source: String,
    pub name: String,
    /// Pinned branch, tag or commit
    pub reference: Option<String>,
}

impl ArtifactRef {
    pub fn new(source: impl Into<String>, name: impl Into<String>, reference: Option<String>) -> Self {
        Self {
            source: source.into(),
            name: name.into(),
            reference,
        }
    }

    /// Parses a declared reference.
    ///
    /// ```rust
    /// use skills_cli::resolver::reference::ArtifactRef;
    ///
    /// let parsed = ArtifactRef::parse("anthropics/skills/pdf@v1.2.0")?;
    /// assert_eq!(parsed.source, "anthropics/skills");
    /// assert_eq!(parsed.name, "pdf");
    /// assert_eq!(parsed.reference.as_deref(), Some("v1.2.0"));
    /// assert_eq!(parsed.key(), "anthropics/skills/pdf");
    /// # Ok::<(), anyhow::Error>(())
    /// ```
    ///
    /// # Errors
    ///
    /// [`SkillsError::InvalidReference`] when the source, name or ref is empty.
    pub fn parse(input: &str) -> Result<Self> {
        let invalid = |reason: &str| SkillsError::InvalidReference {
            input: input.to_string(),
            reason: reason.to_string(),
        };

        let trimmed = input.trim();
        let (body, reference) = match trimmed.split_once('@') {
            Some((body, reference)) => {
                let reference = reference.trim();
                if reference.is_empty() {
                    return Err(invalid("'@' must be followed by a branch, tag or commit").into());
                }
                (body, Some(reference.to_string()))
            }
            None => (trimmed, None),
        };

        let Some((source, name)) = body.rsplit_once('/') else {
            return Err(invalid("expected '<source>/<name>'").into());
        };
        if source.is_empty() {
            return Err(invalid("source name is empty").into());
        }
        if name.is_empty() {
            return Err(invalid("artifact name is empty").into());
        }

        Ok(Self::new(source, name, reference))
    }

    /// The lock key, `<source>/<name>`; the pin never takes part.
    #[must_use]
    pub fn key(&self) -> String {
        format!("{}/{}", self.source, self.name)
    }
}

impl fmt::Display for ArtifactRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.reference {
            Some(reference) => write!(f, "{}/{}@{}", self.source, self.name, reference),
            None => write!(f, "{}/{}", self.source, self.name),
        }
    }
}

impl FromStr for ArtifactRef {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}
