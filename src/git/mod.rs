//! Git operations wrapper
//!
//! The crate drives the system `git` binary rather than an embedded library, so SSH
//! agents, credential helpers and `~/.gitconfig` work exactly as they do for the user.
//! [`command_builder::GitCommand`] spawns and maps errors; [`GitRepo`] is the small set
//! of working-copy operations the stager needs.
//!
//! Every operation accepts the timeout chosen by the caller. Dropping a future kills
//! the running git process.

pub mod command_builder;

use anyhow::Result;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::source::strip_auth_from_url;
use command_builder::GitCommand;

/// A local working copy driven through the git CLI.
#[derive(Debug, Clone)]
pub struct GitRepo {
    path: PathBuf,
    timeout: Option<Duration>,
}

impl GitRepo {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            timeout: None,
        }
    }

    /// Applies a timeout to every command run through this handle.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether `path` holds a working copy (a `.git` directory or gitfile).
    #[must_use]
    pub fn is_git_repo(&self) -> bool {
        self.path.join(".git").exists()
    }

    fn command(&self, cmd: GitCommand) -> GitCommand {
        cmd.current_dir(&self.path).with_timeout(self.timeout)
    }

    /// Clones `url` into `target`.
    ///
    /// # Errors
    ///
    /// [`crate::core::SkillsError::RepositoryUnavailable`] when the remote cannot be
    /// reached or read.
    pub async fn clone(url: &str, target: &Path, timeout: Option<Duration>) -> Result<Self> {
        GitCommand::clone(url, target)
            .with_timeout(timeout)
            .with_context(strip_auth_from_url(url))
            .execute_success()
            .await?;

        Ok(Self::new(target).with_timeout(timeout))
    }

    /// Fetches every branch and tag from `origin`, then refreshes the remote default
    /// branch pointer. A failed refresh only logs a warning.
    pub async fn fetch(&self, url: &str) -> Result<()> {
        self.command(GitCommand::fetch(url))
            .with_context(strip_auth_from_url(url))
            .execute_success()
            .await?;

        if let Err(e) = self.command(GitCommand::refresh_remote_head()).execute_success().await {
            tracing::warn!(
                "Could not refresh default branch of {}: {}",
                self.path.display(),
                e
            );
        }
        Ok(())
    }

    /// Peels `expression` to a full commit id, or `None` if it names nothing.
    pub async fn resolve_commit(&self, expression: &str) -> Result<Option<String>> {
        let output =
            self.command(GitCommand::verify_commit(expression)).execute_allow_failure().await?;
        Ok(output.map(|o| o.stdout.trim().to_string()).filter(|sha| !sha.is_empty()))
    }

    /// Forces the working tree to `sha` and removes untracked files.
    pub async fn checkout_detached(&self, sha: &str) -> Result<()> {
        self.command(GitCommand::checkout_detached(sha)).execute_success().await?;
        self.command(GitCommand::clean()).execute_success().await
    }

    /// The commit currently checked out.
    pub async fn head_commit(&self) -> Result<String> {
        self.command(GitCommand::current_commit()).execute_stdout().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::TestGit;
    use tempfile::TempDir;

    fn repo_with_commit(dir: &Path) -> String {
        let git = TestGit::new(dir);
        git.init().unwrap();
        git.config_user().unwrap();
        std::fs::write(dir.join("README.md"), "hello").unwrap();
        git.add_all().unwrap();
        git.commit("initial").unwrap();
        git.rev_parse_head().unwrap()
    }

    #[tokio::test]
    async fn test_resolve_commit() {
        let temp = TempDir::new().unwrap();
        let sha = repo_with_commit(temp.path());
        let repo = GitRepo::new(temp.path());

        assert!(repo.is_git_repo());
        assert_eq!(repo.resolve_commit("HEAD").await.unwrap(), Some(sha.clone()));
        assert_eq!(repo.resolve_commit(&sha[..8]).await.unwrap(), Some(sha.clone()));
        assert_eq!(repo.resolve_commit("no-such-branch").await.unwrap(), None);
        assert_eq!(repo.head_commit().await.unwrap(), sha);
    }

    #[tokio::test]
    async fn test_clone_missing_repository_is_unavailable() {
        let temp = TempDir::new().unwrap();
        let url = format!("file://{}", temp.path().join("missing").display());
        let err = GitRepo::clone(&url, &temp.path().join("target"), None).await.unwrap_err();

        let typed = err.downcast_ref::<crate::core::SkillsError>().unwrap();
        assert!(matches!(typed, crate::core::SkillsError::RepositoryUnavailable { .. }));
    }
}
