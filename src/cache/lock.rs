//! Cross-process file locks.
//!
//! A [`CacheLock`] holds an exclusive OS lock on `<dir>/.locks/<name>.lock` for as
//! long as it lives. The stager uses it to serialize checkouts of one working copy
//! between `skills` processes; in-process callers are serialized separately.

use anyhow::{Context, Result};
use fs4::fs_std::FileExt;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

/// An exclusive lock released on drop.
#[derive(Debug)]
pub struct CacheLock {
    file: File,
    path: PathBuf,
}

impl CacheLock {
    /// Blocks (off the async runtime) until the lock named `name` under `dir` is held.
    ///
    /// The lock file is created on first use and never deleted.
    ///
    /// ```rust,no_run
    /// use skills_cli::cache::lock::CacheLock;
    /// use std::path::Path;
    ///
    /// # async fn example() -> anyhow::Result<()> {
    /// let lock = CacheLock::acquire(Path::new("/home/user/.skills/repos"), "github.com_o_r").await?;
    /// // ... mutate the working copy ...
    /// drop(lock);
    /// # Ok(())
    /// # }
    /// ```
    ///
    /// # Errors
    ///
    /// Fails when the `.locks` directory or the lock file cannot be created, or the
    /// platform refuses the lock.
    pub async fn acquire(dir: &Path, name: &str) -> Result<Self> {
        let locks_dir = dir.join(".locks");
        tokio::fs::create_dir_all(&locks_dir).await.map_err(|e| match e.kind() {
            std::io::ErrorKind::PermissionDenied => anyhow::anyhow!(
                "Permission denied: cannot create locks directory at {}",
                locks_dir.display()
            ),
            std::io::ErrorKind::NotADirectory => anyhow::anyhow!(
                "Cannot create locks directory: {} is not a directory",
                dir.display()
            ),
            _ => anyhow::anyhow!("Failed to create directory {}: {}", locks_dir.display(), e),
        })?;

        let path = locks_dir.join(format!("{name}.lock"));
        let lock_path = path.clone();
        let name = name.to_string();

        let file = tokio::task::spawn_blocking(move || -> Result<File> {
            let file = OpenOptions::new()
                .create(true)
                .write(true)
                .truncate(true)
                .open(&lock_path)
                .with_context(|| format!("Failed to open lock file: {}", lock_path.display()))?;
            file.lock_exclusive().with_context(|| format!("Failed to acquire lock for: {name}"))?;
            Ok(file)
        })
        .await
        .context("Lock acquisition task panicked")??;

        tracing::trace!("Acquired lock {}", path.display());
        Ok(Self { file, path })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for CacheLock {
    fn drop(&mut self) {
        #[allow(unstable_name_collisions)]
        if let Err(e) = FileExt::unlock(&self.file) {
            tracing::warn!("Failed to unlock {}: {}", self.path.display(), e);
        }
    }
}
