//! State shared by every subcommand.

use anyhow::{Context, Result};
use colored::Colorize;
use std::path::PathBuf;

use crate::config::{GlobalConfig, StoreLayout};
use crate::constants::LOCK_FILE;
use crate::core::SkillsError;
use crate::installer::{InstallTarget, select_targets};
use crate::lockfile::LockFile;
use crate::manifest::ProjectConfig;
use crate::resolver::{BatchReport, LockResolver, Outcome};
use crate::stager::RepositoryStager;

/// Project files plus the global configuration for one invocation.
#[derive(Debug)]
pub struct CommandContext {
    pub project_dir: PathBuf,
    pub config: ProjectConfig,
    pub lock_path: PathBuf,
    pub global: GlobalConfig,
    pub layout: StoreLayout,
}

impl CommandContext {
    /// Loads `skills.json` from `project_dir` and the global config.
    ///
    /// # Errors
    /// Fails when either file exists but cannot be parsed, or the store directories
    /// cannot be created.
    pub async fn new(project_dir: PathBuf) -> Result<Self> {
        let global = GlobalConfig::load().await?;
        let layout = StoreLayout::resolve(&global)?;
        let config = ProjectConfig::load(&project_dir)?;
        let lock_path = project_dir.join(LOCK_FILE);

        tracing::debug!(
            "Project {} (repos: {}, cache: {})",
            project_dir.display(),
            layout.repos_dir.display(),
            layout.cache_dir.display()
        );

        Ok(Self {
            project_dir,
            config,
            lock_path,
            global,
            layout,
        })
    }

    #[must_use]
    pub fn resolver(&self) -> LockResolver {
        LockResolver::new(RepositoryStager::new(&self.layout, Some(self.global.git_timeout())))
    }

    pub fn targets(&self) -> Result<Vec<InstallTarget>> {
        select_targets(self.global.install_targets.as_deref())
    }

    pub fn load_lock(&self) -> Result<LockFile> {
        LockFile::load(&self.lock_path)
            .with_context(|| format!("Failed to load lock file: {}", self.lock_path.display()))
    }

    pub fn save_lock(&self, lock: &LockFile) -> Result<()> {
        lock.save(&self.lock_path)
            .with_context(|| format!("Failed to save lock file: {}", self.lock_path.display()))
    }

    pub fn save_config(&self) -> Result<()> {
        self.config.save(&self.project_dir)
    }
}

/// Prints warnings and one line per changed or failed item.
///
/// Returns the number of failures.
pub fn print_report(report: &BatchReport) -> usize {
    for warning in &report.warnings {
        eprintln!("{} {}", "warning:".yellow().bold(), warning);
    }

    let mut failures = 0;
    for item in &report.items {
        let label = match &item.collection {
            Some(collection) => format!("{} (from {})", item.key, collection),
            None => item.key.clone(),
        };
        match &item.outcome {
            Outcome::UpToDate => tracing::debug!("{} is up to date", item.key),
            Outcome::Added => println!("  {} {}", "+".green(), label),
            Outcome::Updated { previous_sha } => {
                println!("  {} {} (was {})", "~".cyan(), label, short_sha(previous_sha).dimmed());
            }
            Outcome::Failed(err) => {
                failures += 1;
                eprintln!("  {} {}: {}", "✗".red(), label, describe(err));
            }
        }
    }
    failures
}

/// One-line rendering of a batch failure.
fn describe(err: &anyhow::Error) -> String {
    match err.downcast_ref::<SkillsError>() {
        Some(typed) => typed.to_string(),
        None => format!("{err:#}"),
    }
}

#[must_use]
pub fn short_sha(sha: &str) -> &str {
    sha.get(..8).unwrap_or(sha)
}
