//! Content-addressed snapshot store.
//!
//! Every commit a resolution touches is copied once into `<cache>/<sha>/` with its
//! `.git` metadata removed. Snapshots are immutable: once a directory for a sha
//! exists it is never rewritten, so resolving the same commit twice skips the
//! checkout entirely.
//!
//! ```text
//! ~/.skills/cache/
//! ├── 0f3a9c.../          # full tree of commit 0f3a9c...
//! │   └── skills/pdf/SKILL.md
//! └── .tmp-XXXXXX/        # snapshot being written, renamed into place when complete
//! ```
//!
//! Writers copy into a temporary sibling and rename it into place. A reader either
//! sees a complete snapshot or none. When two writers race, the loser discards its
//! copy and uses the winner's.

pub mod integrity;
pub mod lock;

pub use integrity::{compute_fingerprint, verify_fingerprint};
pub use lock::CacheLock;

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use crate::utils::{copy_dir_filtered, ensure_dir};

/// Handle on the snapshot directory.
#[derive(Debug, Clone)]
pub struct ContentCache {
    root: PathBuf,
}

fn is_commit_id(sha: &str) -> bool {
    !sha.is_empty() && sha.bytes().all(|b| b.is_ascii_hexdigit())
}

impl ContentCache {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Where the snapshot for `sha` lives (whether or not it exists).
    ///
    /// # Errors
    ///
    /// Rejects anything that is not a hex commit id, so a sha can never name a path
    /// outside the cache.
    pub fn path_for(&self, sha: &str) -> Result<PathBuf> {
        if !is_commit_id(sha) {
            return Err(anyhow::anyhow!("Invalid commit id '{sha}': expected a hex string"));
        }
        Ok(self.root.join(sha))
    }

    /// Whether a snapshot for `sha` is present.
    #[must_use]
    pub fn has(&self, sha: &str) -> bool {
        self.path_for(sha).map(|p| p.is_dir()).unwrap_or(false)
    }

    /// Copies the working tree at `source_dir` into the snapshot for `sha`.
    ///
    /// `.git` entries are skipped at every depth. An existing snapshot is returned
    /// unchanged.
    pub async fn put(&self, sha: &str, source_dir: &Path) -> Result<PathBuf> {
        let target = self.path_for(sha)?;
        if target.is_dir() {
            tracing::trace!("Snapshot {} already cached", sha);
            return Ok(target);
        }

        let root = self.root.clone();
        let source_dir = source_dir.to_path_buf();
        let sha_owned = sha.to_string();
        tokio::task::spawn_blocking(move || write_snapshot(&root, &source_dir, &target, &sha_owned))
            .await
            .context("Snapshot task panicked")?
    }

    /// Fingerprint of `rel` inside the snapshot for `sha`.
    pub async fn fingerprint(&self, sha: &str, rel: &str) -> Result<String> {
        let dir = self.path_for(sha)?.join(rel);
        tokio::task::spawn_blocking(move || compute_fingerprint(&dir))
            .await
            .context("Fingerprint task panicked")?
    }

    /// Recomputes the fingerprint of `rel` at `sha`; `Err(actual)` on mismatch.
    pub async fn verify(
        &self,
        sha: &str,
        rel: &str,
        expected: &str,
    ) -> Result<std::result::Result<(), String>> {
        let dir = self.path_for(sha)?.join(rel);
        let expected = expected.to_string();
        tokio::task::spawn_blocking(move || verify_fingerprint(&dir, &expected))
            .await
            .context("Verification task panicked")?
    }
}

fn write_snapshot(root: &Path, source_dir: &Path, target: &Path, sha: &str) -> Result<PathBuf> {
    ensure_dir(root)?;
    let staging = tempfile::Builder::new()
        .prefix(".tmp-")
        .tempdir_in(root)
        .with_context(|| format!("Failed to create staging directory in {}", root.display()))?;

    copy_dir_filtered(source_dir, staging.path(), &|name| name == ".git")
        .with_context(|| format!("Failed to copy snapshot of {sha}"))?;

    match std::fs::rename(staging.path(), target) {
        Ok(()) => {
            // dropping `staging` now finds nothing to delete
            tracing::debug!("Cached snapshot {} at {}", sha, target.display());
            Ok(target.to_path_buf())
        }
        Err(_) if target.is_dir() => {
            tracing::debug!("Snapshot {} was cached concurrently; discarding duplicate", sha);
            Ok(target.to_path_buf())
        }
        Err(e) => Err(e).with_context(|| {
            format!("Failed to move snapshot into place at {}", target.display())
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const SHA: &str = "0123456789abcdef0123456789abcdef01234567";

    fn working_tree() -> TempDir {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        fs::create_dir_all(root.join("skills/pdf")).unwrap();
        fs::write(root.join("skills/pdf/SKILL.md"), "---\nname: pdf\n---\n").unwrap();
        fs::create_dir_all(root.join(".git/objects")).unwrap();
        fs::write(root.join(".git/HEAD"), "ref: refs/heads/main").unwrap();
        fs::create_dir_all(root.join("vendor/sub/.git")).unwrap();
        fs::write(root.join("vendor/sub/.git/config"), "x").unwrap();
        fs::write(root.join("vendor/sub/file.txt"), "kept").unwrap();
        temp
    }

    #[test]
    fn test_path_for_rejects_non_hex() {
        let cache = ContentCache::new("/tmp/cache");
        assert!(cache.path_for(SHA).is_ok());
        assert!(cache.path_for("../etc").is_err());
        assert!(cache.path_for("").is_err());
        assert!(cache.path_for("main").is_err());
        assert!(!cache.has("../etc"));
    }

    #[tokio::test]
    async fn test_put_strips_git_metadata() {
        let store = TempDir::new().unwrap();
        let source = working_tree();
        let cache = ContentCache::new(store.path());

        assert!(!cache.has(SHA));
        let path = cache.put(SHA, source.path()).await.unwrap();
        assert!(cache.has(SHA));
        assert_eq!(path, store.path().join(SHA));
        assert!(path.join("skills/pdf/SKILL.md").is_file());
        assert!(path.join("vendor/sub/file.txt").is_file());
        assert!(!path.join(".git").exists());
        assert!(!path.join("vendor/sub/.git").exists());

        // no staging directories left behind
        let leftovers: Vec<_> = fs::read_dir(store.path())
            .unwrap()
            .filter_map(Result::ok)
            .filter(|e| e.file_name().to_string_lossy().starts_with(".tmp-"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[tokio::test]
    async fn test_put_is_idempotent() {
        let store = TempDir::new().unwrap();
        let source = working_tree();
        let cache = ContentCache::new(store.path());

        cache.put(SHA, source.path()).await.unwrap();
        fs::write(source.path().join("skills/pdf/SKILL.md"), "changed").unwrap();
        let path = cache.put(SHA, source.path()).await.unwrap();

        let content = fs::read_to_string(path.join("skills/pdf/SKILL.md")).unwrap();
        assert_eq!(content, "---\nname: pdf\n---\n");
    }

    #[tokio::test]
    async fn test_concurrent_puts_agree() {
        let store = TempDir::new().unwrap();
        let source = working_tree();
        let cache = ContentCache::new(store.path());

        let (a, b) = tokio::join!(cache.put(SHA, source.path()), cache.put(SHA, source.path()));
        assert_eq!(a.unwrap(), b.unwrap());
        assert!(cache.has(SHA));
    }

    #[tokio::test]
    async fn test_fingerprint_and_verify() {
        let store = TempDir::new().unwrap();
        let source = working_tree();
        let cache = ContentCache::new(store.path());
        cache.put(SHA, source.path()).await.unwrap();

        let fingerprint = cache.fingerprint(SHA, "skills/pdf").await.unwrap();
        assert!(cache.verify(SHA, "skills/pdf", &fingerprint).await.unwrap().is_ok());

        fs::write(store.path().join(SHA).join("skills/pdf/SKILL.md"), "tampered").unwrap();
        let mismatch = cache.verify(SHA, "skills/pdf", &fingerprint).await.unwrap();
        assert!(mismatch.is_err());
    }
}
