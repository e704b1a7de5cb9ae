//! `skills install`: resolve what is declared and copy it into the agent folders.
//!
//! Lock entries whose declaration still matches are reused without touching the
//! network; new or re-pinned declarations are resolved. Every successfully resolved
//! entry is then installed from its cache snapshot into each install target.
//!
//! Entries no longer declared are pruned from the lock file, but only after a batch
//! in which every collection could be expanded and nothing failed. Otherwise an
//! unreachable repository would silently drop its artifacts from the lock.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use std::path::PathBuf;

use super::common::{CommandContext, print_report};
use crate::core::SkillsError;
use crate::installer::{InstallTarget, install_artifact, remove_artifact};
use crate::lockfile::LockedArtifact;
use crate::resolver::{LockResolver, ResolveMode};

#[derive(Args)]
pub struct InstallCommand {
    /// Re-resolve every declaration, ignoring existing lock entries
    #[arg(long)]
    refresh: bool,
}

impl InstallCommand {
    pub async fn execute(self, ctx: CommandContext) -> Result<()> {
        ctx.config.validate()?;
        let targets = ctx.targets()?;
        let mut lock = ctx.load_lock()?;
        let mut resolver = ctx.resolver();

        let mode = if self.refresh { ResolveMode::Refresh } else { ResolveMode::Locked };
        let report = resolver.resolve_all(&ctx.config, &mut lock, mode, None).await;
        let failures = print_report(&report);

        let resolved = report.resolved_keys();
        let mut keys: Vec<&String> = resolved.iter().collect();
        keys.sort();

        let mut installed = 0;
        let mut install_failures = 0;
        for key in keys {
            let Some(entry) = lock.get(key).cloned() else {
                continue;
            };
            match install_entry(&ctx, &mut resolver, key, &entry, &targets).await {
                Ok(paths) => {
                    installed += 1;
                    tracing::debug!("Installed {} into {} location(s)", key, paths.len());
                }
                Err(err) => {
                    install_failures += 1;
                    eprintln!("  {} {}: {:#}", "✗".red(), key, err);
                }
            }
        }

        if report.incomplete || failures > 0 {
            tracing::warn!("Keeping undeclared lock entries because resolution was incomplete");
        } else {
            let pruned = lock.retain(|key| resolved.contains(key));
            for key in &pruned {
                remove_artifact(&ctx.project_dir, artifact_name(key), &targets)
                    .with_context(|| format!("Failed to remove installed copies of {key}"))?;
                println!("  {} {}", "-".red(), key);
            }
        }

        ctx.save_lock(&lock)?;

        let total_failures = failures + install_failures;
        if total_failures > 0 {
            return Err(anyhow::anyhow!(
                "{total_failures} artifact(s) failed to install ({installed} installed)"
            ));
        }

        println!("{} {} artifact(s)", "Installed".green().bold(), installed);
        Ok(())
    }
}

pub(super) async fn install_entry(
    ctx: &CommandContext,
    resolver: &mut LockResolver,
    key: &str,
    entry: &LockedArtifact,
    targets: &[InstallTarget],
) -> Result<Vec<PathBuf>> {
    let source = ctx
        .config
        .find_source(&entry.metadata.source)
        .ok_or_else(|| SkillsError::SourceNotFound {
            name: entry.metadata.source.clone(),
        })?;
    let snapshot = resolver.materialize(source, entry).await?;
    install_artifact(&ctx.project_dir, artifact_name(key), &snapshot, targets).await
}

/// The artifact name part of a lock key.
fn artifact_name(key: &str) -> &str {
    key.rsplit('/').next().unwrap_or(key)
}
