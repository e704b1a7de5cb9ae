//! `skills verify`: recompute fingerprints of cached snapshots.

use anyhow::Result;
use clap::Args;
use colored::Colorize;

use super::common::CommandContext;
use crate::core::SkillsError;

#[derive(Args)]
pub struct VerifyCommand {}

impl VerifyCommand {
    pub async fn execute(self, ctx: CommandContext) -> Result<()> {
        let lock = ctx.load_lock()?;
        if lock.is_empty() {
            println!("Lock file is empty; nothing to verify");
            return Ok(());
        }

        let report = ctx.resolver().verify_lock(&lock).await?;

        for key in &report.not_cached {
            println!("  {} {} (not cached)", "?".yellow(), key);
        }
        for mismatch in &report.mismatches {
            if let SkillsError::IntegrityMismatch { key, expected, actual } = mismatch {
                eprintln!("  {} {}", "✗".red(), key);
                eprintln!("      expected {expected}");
                eprintln!("      actual   {actual}");
            }
        }

        if !report.mismatches.is_empty() {
            return Err(anyhow::anyhow!(
                "{} artifact(s) failed integrity verification",
                report.mismatches.len()
            ));
        }

        println!("{} {} artifact(s)", "Verified".green().bold(), report.verified.len());
        Ok(())
    }
}
