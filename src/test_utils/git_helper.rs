//! Git test helper utilities
//!
//! Synchronous wrappers around the git CLI for building fixture repositories.

use anyhow::{Context, Result, bail};
use std::path::{Path, PathBuf};
use std::process::Command;

/// Runs git inside one repository directory.
///
/// Use this instead of raw `std::process::Command` in tests so failures carry
/// git's stderr.
pub struct TestGit {
    repo_path: PathBuf,
}

impl TestGit {
    fn run(&self, args: &[&str], action: &str) -> Result<std::process::Output> {
        let output = Command::new("git")
            .args(args)
            .current_dir(&self.repo_path)
            .env("GIT_TERMINAL_PROMPT", "0")
            .output()
            .with_context(|| action.to_string())?;

        if !output.status.success() {
            bail!("{} failed: {}", action, String::from_utf8_lossy(&output.stderr));
        }
        Ok(output)
    }

    pub fn new(repo_path: impl Into<PathBuf>) -> Self {
        Self {
            repo_path: repo_path.into(),
        }
    }

    #[must_use]
    pub fn repo_path(&self) -> &Path {
        &self.repo_path
    }

    /// Initializes a repository whose first branch is `main`, whatever the local
    /// git default is.
    pub fn init(&self) -> Result<()> {
        self.run(&["init", "--quiet"], "Failed to initialize git repository")?;
        self.run(&["symbolic-ref", "HEAD", "refs/heads/main"], "Failed to set initial branch")?;
        Ok(())
    }

    /// Sets a committer identity and disables signing.
    pub fn config_user(&self) -> Result<()> {
        self.run(&["config", "user.email", "test@skills.example"], "Failed to set user.email")?;
        self.run(&["config", "user.name", "Test User"], "Failed to set user.name")?;
        self.run(&["config", "commit.gpgsign", "false"], "Failed to disable commit signing")?;
        self.run(&["config", "tag.gpgsign", "false"], "Failed to disable tag signing")?;
        Ok(())
    }

    pub fn add_all(&self) -> Result<()> {
        self.run(&["add", "--all", "."], "Failed to add files to git")?;
        Ok(())
    }

    /// Commits whatever is staged; an empty commit is allowed.
    pub fn commit(&self, message: &str) -> Result<()> {
        self.run(&["commit", "--quiet", "--allow-empty", "-m", message], "Failed to create git commit")?;
        Ok(())
    }

    /// Creates a lightweight tag at HEAD.
    pub fn tag(&self, tag_name: &str) -> Result<()> {
        self.run(&["tag", tag_name], &format!("Failed to create tag: {tag_name}"))?;
        Ok(())
    }

    /// Creates a branch at HEAD without switching to it.
    pub fn branch(&self, branch_name: &str) -> Result<()> {
        self.run(&["branch", branch_name], &format!("Failed to create branch: {branch_name}"))?;
        Ok(())
    }

    pub fn rev_parse_head(&self) -> Result<String> {
        let output = self.run(&["rev-parse", "HEAD"], "Failed to get current commit SHA")?;
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}
