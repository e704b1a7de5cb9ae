//! Simple format: every directory under `skills/` is one artifact.
//!
//! Metadata comes from a `skill.json` sidecar inside the artifact directory. This
//! format never produces collections.

use anyhow::Result;
use std::path::Path;

use super::metadata::read_sidecar;
use super::{ArtifactKind, DiscoveredArtifact, DiscoveryResult, RepoFormat, child_dirs};
use crate::constants::ARTIFACTS_DIR;

pub(crate) fn discover(base: &Path) -> Result<DiscoveryResult> {
    let mut result = DiscoveryResult::empty(RepoFormat::Simple);

    for child in child_dirs(&base.join(ARTIFACTS_DIR))? {
        let rel = format!("{ARTIFACTS_DIR}/{child}");
        let artifact = match read_sidecar(&base.join(&rel), &rel, &child)? {
            Some(meta) => DiscoveredArtifact {
                name: meta.name,
                description: meta.description,
                kind: ArtifactKind::Skill,
                path: rel,
                format: RepoFormat::Simple,
                metadata: meta.raw,
            },
            None => DiscoveredArtifact {
                name: child,
                description: None,
                kind: ArtifactKind::Skill,
                path: rel,
                format: RepoFormat::Simple,
                metadata: None,
            },
        };
        result.artifacts.push(artifact);
    }

    Ok(result)
}
