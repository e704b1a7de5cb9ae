//! Type-safe Git command builder for consistent command execution
//!
//! Every git subprocess the crate spawns goes through [`GitCommand`], which gives
//! uniform logging, error mapping to [`SkillsError`], an optional caller-supplied
//! timeout, and cancellation: the child is killed when the future is dropped.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;

use crate::core::SkillsError;
use crate::source::strip_auth_from_url;
use crate::utils::platform::get_git_command;

/// Builder for a single git invocation.
///
/// ```rust,no_run
/// use skills_cli::git::command_builder::GitCommand;
/// use std::time::Duration;
///
/// # async fn example() -> anyhow::Result<()> {
/// let sha = GitCommand::current_commit()
///     .current_dir("/path/to/repo")
///     .with_timeout(Some(Duration::from_secs(30)))
///     .execute_stdout()
///     .await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default)]
pub struct GitCommand {
    args: Vec<String>,

    /// Passed to git as `-C <dir>`
    current_dir: Option<PathBuf>,

    /// Extra environment for the child
    env_vars: Vec<(String, String)>,

    /// None means wait until git exits or the future is dropped
    timeout_duration: Option<Duration>,

    /// Free-form label included in log lines
    context: Option<String>,

    /// Remote URL reported when a clone or fetch fails
    remote_url: Option<String>,
}

impl GitCommand {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs the command inside `dir` (via `git -C`).
    #[must_use]
    pub fn current_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.current_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env_vars.push((key.into(), value.into()));
        self
    }

    /// Sets a timeout for the command (None for no timeout).
    #[must_use]
    pub const fn with_timeout(mut self, duration: Option<Duration>) -> Self {
        self.timeout_duration = duration;
        self
    }

    #[must_use]
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    /// Records the remote URL so clone/fetch failures name the repository.
    ///
    /// Credentials in the URL are dropped before it is stored.
    #[must_use]
    pub fn with_remote(mut self, url: &str) -> Self {
        self.remote_url = Some(strip_auth_from_url(url));
        self
    }

    fn operation(&self) -> String {
        self.args.first().cloned().unwrap_or_else(|| "unknown".to_string())
    }

    async fn run(&self) -> Result<std::process::Output> {
        let git_command = get_git_command();
        let mut cmd = Command::new(git_command);

        let mut full_args = Vec::new();
        if let Some(ref dir) = self.current_dir {
            full_args.push("-C".to_string());
            full_args.push(dir.display().to_string());
        }
        full_args.extend(self.args.iter().cloned());
        let shown = redacted(&full_args);

        cmd.args(&full_args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .env("GIT_TERMINAL_PROMPT", "0")
            .kill_on_drop(true);
        for (key, value) in &self.env_vars {
            tracing::trace!(target: "git", "Setting env var: {}={}", key, value);
            cmd.env(key, value);
        }

        match self.context {
            Some(ref ctx) => tracing::debug!(
                target: "git",
                "({}) Executing command: {} {}",
                ctx,
                git_command,
                shown
            ),
            None => tracing::debug!(
                target: "git",
                "Executing command: {} {}",
                git_command,
                shown
            ),
        }

        let output_future = cmd.output();
        let result = if let Some(duration) = self.timeout_duration {
            if let Ok(result) = timeout(duration, output_future).await {
                result
            } else {
                tracing::warn!(
                    target: "git",
                    "Command timed out after {} seconds: git {}",
                    duration.as_secs(),
                    shown
                );
                return Err(self.failure(format!(
                    "git {} timed out after {} seconds. This may indicate network issues \
                     or a credential prompt waiting for input",
                    self.operation(),
                    duration.as_secs()
                ))
                .into());
            }
        } else {
            output_future.await
        };

        match result {
            Ok(output) => Ok(output),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(SkillsError::GitNotFound.into()),
            Err(e) => Err(e).context(format!("Failed to execute git {shown}")),
        }
    }

    /// Maps a failure of this command to the matching [`SkillsError`].
    fn failure(&self, reason: String) -> SkillsError {
        let operation = self.operation();
        match operation.as_str() {
            "clone" | "fetch" => SkillsError::RepositoryUnavailable {
                url: self.remote_url.clone().unwrap_or_else(|| "unknown".to_string()),
                operation,
                reason,
            },
            "checkout" => SkillsError::GitCheckoutFailed {
                reference: self
                    .args
                    .iter()
                    .skip(1)
                    .rfind(|arg| !arg.starts_with('-'))
                    .cloned()
                    .unwrap_or_default(),
                reason,
            },
            _ => SkillsError::GitCommandError {
                operation,
                stderr: reason,
            },
        }
    }

    fn log_elapsed(&self, elapsed: Duration) {
        let operation = self.operation();
        let ctx = self.context.as_deref().unwrap_or("-");
        if elapsed.as_secs() > 1 {
            tracing::info!(target: "git::perf", "({}) Git {} took {:.2}s", ctx, operation, elapsed.as_secs_f64());
        } else if elapsed.as_millis() > 100 {
            tracing::debug!(target: "git::perf", "({}) Git {} took {}ms", ctx, operation, elapsed.as_millis());
        }
    }

    /// Executes the command, failing on a non-zero exit status.
    ///
    /// # Errors
    ///
    /// - [`SkillsError::GitNotFound`] when git cannot be spawned
    /// - [`SkillsError::RepositoryUnavailable`] for failed clones and fetches
    /// - [`SkillsError::GitCheckoutFailed`] for failed checkouts
    /// - [`SkillsError::GitCommandError`] for everything else, including timeouts
    pub async fn execute(self) -> Result<GitCommandOutput> {
        let start = std::time::Instant::now();
        let output = self.run().await?;
        self.log_elapsed(start.elapsed());

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();

        if !output.status.success() {
            tracing::debug!(
                target: "git",
                "Command failed with exit code: {:?}",
                output.status.code()
            );
            if !stderr.is_empty() {
                tracing::debug!(target: "git", "Error: {}", stderr.trim());
            }
            let reason = if stderr.trim().is_empty() { stdout } else { stderr };
            return Err(self.failure(reason).into());
        }

        if !stderr.is_empty() {
            tracing::trace!(target: "git", "{}", stderr.trim());
        }

        Ok(GitCommandOutput { stdout, stderr })
    }

    /// Executes the command, returning `Ok(None)` on a non-zero exit status.
    ///
    /// Spawn failures and timeouts are still errors. Used for probes such as
    /// `rev-parse --verify` where failure is an answer, not a fault.
    pub async fn execute_allow_failure(self) -> Result<Option<GitCommandOutput>> {
        let output = self.run().await?;
        if !output.status.success() {
            tracing::trace!(
                target: "git",
                "Probe git {} exited with {:?}",
                self.operation(),
                output.status.code()
            );
            return Ok(None);
        }

        Ok(Some(GitCommandOutput {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        }))
    }

    /// Executes the command and returns trimmed stdout.
    pub async fn execute_stdout(self) -> Result<String> {
        let output = self.execute().await?;
        Ok(output.stdout.trim().to_string())
    }

    /// Executes the command, discarding its output.
    pub async fn execute_success(self) -> Result<()> {
        self.execute().await?;
        Ok(())
    }
}

/// Joins command arguments for logs, without credentials embedded in URLs.
fn redacted(args: &[String]) -> String {
    args.iter().map(|arg| strip_auth_from_url(arg)).collect::<Vec<_>>().join(" ")
}

/// Output from a git command
#[derive(Debug, Clone)]
pub struct GitCommandOutput {
    pub stdout: String,
    pub stderr: String,
}

// Convenience builders for the operations the stager performs

impl GitCommand {
    /// Full clone of `url` into `target`.
    pub fn clone(url: &str, target: impl AsRef<Path>) -> Self {
        Self::new()
            .args(["clone", "--quiet"])
            .arg(url)
            .arg(target.as_ref().display().to_string())
            .with_remote(url)
    }

    /// Fetches every branch and tag from `origin`, pruning deleted branches.
    pub fn fetch(url: &str) -> Self {
        Self::new().args(["fetch", "--quiet", "--tags", "--force", "--prune", "origin"]).with_remote(url)
    }

    /// Re-reads the remote default branch into `refs/remotes/origin/HEAD`.
    pub fn refresh_remote_head() -> Self {
        Self::new().args(["remote", "set-head", "origin", "--auto"])
    }

    /// Detached, forced checkout of a commit.
    pub fn checkout_detached(sha: &str) -> Self {
        Self::new().args(["checkout", "--quiet", "--force", "--detach", sha])
    }

    /// Removes untracked and ignored files from the working tree.
    pub fn clean() -> Self {
        Self::new().args(["clean", "-ffdxq"])
    }

    /// Peels an expression to a full commit id; fails when it does not resolve.
    pub fn verify_commit(expression: &str) -> Self {
        Self::new().args(["rev-parse", "--verify", "--quiet", &format!("{expression}^{{commit}}")])
    }

    pub fn current_commit() -> Self {
        Self::new().args(["rev-parse", "HEAD"])
    }
}
