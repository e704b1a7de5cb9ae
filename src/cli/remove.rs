//! `skills remove`

use anyhow::Result;
use clap::Args;
use colored::Colorize;

use super::common::CommandContext;
use crate::installer::remove_artifact;
use crate::resolver::reference::ArtifactRef;

#[derive(Args)]
pub struct RemoveCommand {
    /// Declared artifact or collection, e.g. `owner/repo/pdf`
    reference: String,
}

impl RemoveCommand {
    pub async fn execute(self, mut ctx: CommandContext) -> Result<()> {
        let reference = ArtifactRef::parse(&self.reference)?;
        let key = reference.key();

        if !ctx.config.remove(&key) {
            return Err(anyhow::anyhow!(
                "'{key}' is not declared in {}",
                crate::constants::CONFIG_FILE
            ));
        }
        ctx.save_config()?;

        let mut lock = ctx.load_lock()?;
        if lock.remove(&key).is_some() {
            ctx.save_lock(&lock)?;
        }

        let removed = remove_artifact(&ctx.project_dir, &reference.name, &ctx.targets()?)?;
        tracing::debug!("Removed {} installed cop(ies) of {}", removed, key);

        println!("{} {}", "Removed".green(), key.bold());
        Ok(())
    }
}
