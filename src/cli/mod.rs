//! Command-line interface for `skills`.
//!
//! Each subcommand lives in its own module with a clap `Args` struct and an
//! `execute` method taking the shared [`common::CommandContext`].
//!
//! # Commands
//!
//! - `add` - register a source and declare one of its artifacts or collections
//! - `install` - resolve declarations against the lock file and copy artifacts
//!   into the agent folders
//! - `update` - move declarations to the newest commit of their ref
//! - `list` - show declarations and their lock status
//! - `remove` - drop a declaration, its lock entry and installed copies
//! - `verify` - recompute fingerprints of cached snapshots
//!
//! # Workflow
//!
//! ```bash
//! skills add anthropics/skills --artifact pdf
//! skills install
//! skills update pdf
//! skills verify
//! ```
//!
//! # Global options
//!
//! - `--verbose` - debug logging
//! - `--quiet` - warnings and errors only
//! - `--project-dir` - project root (default: current directory)
//!
//! `RUST_LOG` always takes precedence over the verbosity flags.

mod add;
pub mod common;
mod install;
mod list;
mod remove;
mod update;
mod verify;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use common::CommandContext;

/// Settings derived from the global flags.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CliConfig {
    /// Default log filter when `RUST_LOG` is unset
    pub log_level: String,
    pub project_dir: Option<PathBuf>,
}

impl CliConfig {
    /// Installs the stderr subscriber. Safe to call more than once.
    pub fn init_logging(&self) {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(self.log_level.as_str()));

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .try_init();
    }
}

#[derive(Parser)]
#[command(
    name = "skills",
    about = "Install agent skills from git repositories",
    version,
    long_about = "skills resolves skill artifacts published in git repositories, pins them \
                  in skills-lock.json and installs them into the folders agent tools read."
)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug output
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Only print warnings and errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Project root containing skills.json
    #[arg(long, global = true, value_name = "DIR")]
    project_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Register a source and declare an artifact or collection from it
    Add(add::AddCommand),

    /// Resolve declarations and install artifacts
    Install(install::InstallCommand),

    /// Update artifacts to the newest commit of their ref
    Update(update::UpdateCommand),

    /// List declarations and their lock status
    List(list::ListCommand),

    /// Remove a declaration and its installed copies
    Remove(remove::RemoveCommand),

    /// Check cached snapshots against the lock file
    Verify(verify::VerifyCommand),
}

impl Cli {
    pub async fn execute(self) -> Result<()> {
        let config = self.build_config();
        config.init_logging();
        self.execute_with_config(config).await
    }

    #[must_use]
    pub fn build_config(&self) -> CliConfig {
        let log_level = if self.verbose {
            "debug"
        } else if self.quiet {
            "warn"
        } else {
            "info"
        };

        CliConfig {
            log_level: log_level.to_string(),
            project_dir: self.project_dir.clone(),
        }
    }

    /// Runs the command against the project named by `config`.
    pub async fn execute_with_config(self, config: CliConfig) -> Result<()> {
        let project_dir = match config.project_dir {
            Some(dir) => dir,
            None => std::env::current_dir().context("Failed to determine current directory")?,
        };
        let ctx = CommandContext::new(project_dir).await?;

        match self.command {
            Commands::Add(cmd) => cmd.execute(ctx).await,
            Commands::Install(cmd) => cmd.execute(ctx).await,
            Commands::Update(cmd) => cmd.execute(ctx).await,
            Commands::List(cmd) => cmd.execute(ctx).await,
            Commands::Remove(cmd) => cmd.execute(ctx).await,
            Commands::Verify(cmd) => cmd.execute(ctx).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbosity_levels() {
        let cli = Cli::parse_from(["skills", "--verbose", "list"]);
        assert_eq!(cli.build_config().log_level, "debug");

        let cli = Cli::parse_from(["skills", "list", "--quiet"]);
        assert_eq!(cli.build_config().log_level, "warn");

        let cli = Cli::parse_from(["skills", "list"]);
        assert_eq!(cli.build_config().log_level, "info");
    }

    #[test]
    fn test_verbose_conflicts_with_quiet() {
        assert!(Cli::try_parse_from(["skills", "--verbose", "--quiet", "list"]).is_err());
    }

    #[test]
    fn test_project_dir_is_global() {
        let cli = Cli::parse_from(["skills", "install", "--project-dir", "/tmp/project"]);
        assert_eq!(cli.build_config().project_dir, Some(PathBuf::from("/tmp/project")));
    }

    #[test]
    fn test_cli_definition() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
