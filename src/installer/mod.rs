//! Copies locked artifacts into agent directories.
//!
//! Each install target is an agent tool that reads skills from a fixed folder below
//! the project root:
//!
//! | Target | Directory |
//! |--------|-----------|
//! | `claude-code` | `.claude/skills` |
//! | `opencode` | `.opencode/skills` |
//! | `cursor` | `.cursor/skills` |
//! | `codex` | `.codex/skills` |
//!
//! An artifact is installed as `<target dir>/<artifact name>/`, copied from its cache
//! snapshot. A previous copy is removed first, so files deleted upstream disappear.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use crate::core::SkillsError;
use crate::utils::{copy_dir_filtered, ensure_dir, remove_dir_all, sanitize_component};

/// An agent tool and the project-relative folder it reads skills from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InstallTarget {
    pub name: &'static str,
    pub dir: &'static str,
}

pub const INSTALL_TARGETS: &[InstallTarget] = &[
    InstallTarget { name: "claude-code", dir: ".claude/skills" },
    InstallTarget { name: "opencode", dir: ".opencode/skills" },
    InstallTarget { name: "cursor", dir: ".cursor/skills" },
    InstallTarget { name: "codex", dir: ".codex/skills" },
];

/// The targets to use: all of them, or only those named in `selected`.
///
/// # Errors
///
/// [`SkillsError::ConfigError`] for an unknown target name.
pub fn select_targets(selected: Option<&[String]>) -> Result<Vec<InstallTarget>> {
    let Some(names) = selected else {
        return Ok(INSTALL_TARGETS.to_vec());
    };

    names
        .iter()
        .map(|name| {
            INSTALL_TARGETS.iter().copied().find(|t| t.name == name).ok_or_else(|| {
                let known: Vec<_> = INSTALL_TARGETS.iter().map(|t| t.name).collect();
                SkillsError::ConfigError {
                    message: format!(
                        "Unknown install target '{name}' (expected one of: {})",
                        known.join(", ")
                    ),
                }
                .into()
            })
        })
        .collect()
}

/// Where `artifact` lands for `target` inside `project_dir`.
#[must_use]
pub fn install_path(project_dir: &Path, target: &InstallTarget, artifact: &str) -> PathBuf {
    project_dir.join(target.dir).join(sanitize_component(artifact))
}

/// Copies `snapshot_dir` into every target, replacing earlier copies.
///
/// Returns the installed directories.
pub async fn install_artifact(
    project_dir: &Path,
    artifact: &str,
    snapshot_dir: &Path,
    targets: &[InstallTarget],
) -> Result<Vec<PathBuf>> {
    if !snapshot_dir.is_dir() {
        return Err(anyhow::anyhow!(
            "Snapshot of '{}' is missing: {}",
            artifact,
            snapshot_dir.display()
        ));
    }

    let destinations: Vec<PathBuf> =
        targets.iter().map(|target| install_path(project_dir, target, artifact)).collect();
    let snapshot_dir = snapshot_dir.to_path_buf();
    let copies = destinations.clone();

    tokio::task::spawn_blocking(move || -> Result<()> {
        for dest in &copies {
            remove_dir_all(dest)?;
            if let Some(parent) = dest.parent() {
                ensure_dir(parent)?;
            }
            copy_dir_filtered(&snapshot_dir, dest, &|name| name == ".git")
                .with_context(|| format!("Failed to install into {}", dest.display()))?;
        }
        Ok(())
    })
    .await
    .context("Install task panicked")??;

    tracing::debug!("Installed '{}' into {} target(s)", artifact, destinations.len());
    Ok(destinations)
}

/// Deletes the installed copies of `artifact`; returns how many existed.
pub fn remove_artifact(project_dir: &Path, artifact: &str, targets: &[InstallTarget]) -> Result<usize> {
    let mut removed = 0;
    for target in targets {
        let dest = install_path(project_dir, target, artifact);
        if dest.exists() {
            remove_dir_all(&dest)?;
            removed += 1;
        }
    }
    Ok(removed)
}
