//! `skills list`

use anyhow::Result;
use clap::Args;
use colored::Colorize;

use super::common::{CommandContext, short_sha};
use crate::lockfile::LockFile;
use crate::resolver::reference::ArtifactRef;

#[derive(Args)]
pub struct ListCommand {
    /// Also show lock entries that are no longer declared
    #[arg(long)]
    all: bool,
}

impl ListCommand {
    pub async fn execute(self, ctx: CommandContext) -> Result<()> {
        let lock = ctx.load_lock()?;

        if ctx.config.artifacts.is_empty() && ctx.config.collections.is_empty() {
            println!("No artifacts declared. Add one with {}", "skills add <source>".cyan());
            return Ok(());
        }

        let artifacts = ctx.config.artifact_refs()?;
        if !artifacts.is_empty() {
            println!("{}", "Artifacts:".bold());
            for reference in &artifacts {
                println!("  {}", describe(reference, &lock));
            }
        }

        let collections = ctx.config.collection_refs()?;
        if !collections.is_empty() {
            println!("{}", "Collections:".bold());
            for collection in &collections {
                println!("  {}", collection.key().cyan());
                let prefix = format!("{}/", collection.source);
                let members: Vec<_> = lock
                    .artifacts
                    .iter()
                    .filter(|(key, _)| key.starts_with(&prefix))
                    .filter(|(key, _)| !artifacts.iter().any(|a| a.key() == **key))
                    .collect();
                for (key, entry) in members {
                    println!("    {} {}", key, short_sha(&entry.sha).dimmed());
                }
            }
        }

        if self.all {
            let declared: Vec<String> = artifacts.iter().map(ArtifactRef::key).collect();
            let stray: Vec<&String> = lock
                .artifacts
                .keys()
                .filter(|key| !declared.contains(*key))
                .filter(|key| !collections.iter().any(|c| key.starts_with(&format!("{}/", c.source))))
                .collect();
            if !stray.is_empty() {
                println!("{}", "Locked but not declared:".bold());
                for key in stray {
                    println!("  {}", key.yellow());
                }
            }
        }
        Ok(())
    }
}

fn describe(reference: &ArtifactRef, lock: &LockFile) -> String {
    let label = reference.to_string().cyan().to_string();
    match lock.get(&reference.key()) {
        None => format!("{label} {}", "(not installed)".yellow()),
        Some(entry) if entry.reference != reference.reference => {
            format!("{label} {}", "(lock out of date, run skills install)".yellow())
        }
        Some(entry) => format!("{label} {}", short_sha(&entry.sha).dimmed()),
    }
}
