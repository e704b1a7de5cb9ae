//! `skills update`: move declarations to the newest commit of their ref.
//!
//! Every repository is fetched once; entries whose ref now resolves to a different
//! commit are replaced and reinstalled. Pinned tags normally stay put, branches and
//! unpinned declarations follow upstream.
//!
//! A failed reinstall is reported and counted like a failed resolution. The lock file
//! is written either way; `skills install` repairs the installed copies later.

use anyhow::Result;
use clap::Args;
use colored::Colorize;

use super::common::{CommandContext, print_report};
use super::install::install_entry;
use crate::resolver::{Outcome, ResolveMode};

#[derive(Args)]
pub struct UpdateCommand {
    /// Lock keys, artifact names or collection keys to update (default: all)
    names: Vec<String>,
}

impl UpdateCommand {
    pub async fn execute(self, ctx: CommandContext) -> Result<()> {
        ctx.config.validate()?;
        let targets = ctx.targets()?;
        let mut lock = ctx.load_lock()?;
        let mut resolver = ctx.resolver();

        let filter = (!self.names.is_empty()).then_some(self.names.as_slice());
        let report = resolver.resolve_all(&ctx.config, &mut lock, ResolveMode::Update, filter).await;
        if report.items.is_empty() && filter.is_some() {
            return Err(anyhow::anyhow!(
                "Nothing declared matches {}",
                self.names.join(", ")
            ));
        }
        let failures = print_report(&report);

        let mut changed = 0;
        let mut install_failures = 0;
        for item in &report.items {
            if !matches!(item.outcome, Outcome::Added | Outcome::Updated { .. }) {
                continue;
            }
            let Some(entry) = lock.get(&item.key).cloned() else {
                continue;
            };
            match install_entry(&ctx, &mut resolver, &item.key, &entry, &targets).await {
                Ok(_) => changed += 1,
                Err(err) => {
                    install_failures += 1;
                    eprintln!("  {} {}: {:#}", "✗".red(), item.key, err);
                }
            }
        }

        ctx.save_lock(&lock)?;

        let total_failures = failures + install_failures;
        if total_failures > 0 {
            return Err(anyhow::anyhow!(
                "{total_failures} artifact(s) failed to update ({changed} updated)"
            ));
        }
        if changed == 0 {
            println!("{}", "Everything is up to date".green());
        } else {
            println!("{} {} artifact(s)", "Updated".green().bold(), changed);
        }
        Ok(())
    }
}
