//! Repository staging: working copies, ref resolution and snapshotting.
//!
//! Each source URL maps to exactly one working copy under the repos directory:
//!
//! ```text
//! https://github.com/anthropics/skills.git  →  <repos>/github.com/anthropics/skills
//! ssh://git@gitlab.com/team/tools.git       →  <repos>/gitlab.com/team/tools
//! file:///srv/git/internal                  →  <repos>/local/srv/git/internal
//! ```
//!
//! The mapping is a pure function of the URL, so "already cloned" needs no index.
//!
//! # Concurrency
//!
//! A working copy can only have one commit checked out. [`RepositoryStager::checkout_and_cache`]
//! therefore serializes per working copy twice over: an in-process async mutex keyed by
//! path, and a [`CacheLock`] file lock for other processes. Snapshot reads need neither.

use anyhow::{Context, Result};
use dashmap::DashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

use crate::cache::{CacheLock, ContentCache};
use crate::config::StoreLayout;
use crate::core::SkillsError;
use crate::git::GitRepo;
use crate::source::{Source, strip_auth_from_url};
use crate::utils::sanitize_component;

/// A working copy after [`RepositoryStager::ensure`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedRepository {
    pub path: PathBuf,
    /// Commit the remote default branch points at
    pub sha: String,
}

/// A commit available as an immutable snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedCommit {
    pub sha: String,
    pub cache_path: PathBuf,
}

/// Owns the working copies and feeds the snapshot cache.
///
/// Cloning the stager shares its checkout locks.
#[derive(Debug, Clone)]
pub struct RepositoryStager {
    repos_dir: PathBuf,
    cache: ContentCache,
    timeout: Option<Duration>,
    checkout_locks: Arc<DashMap<PathBuf, Arc<Mutex<()>>>>,
}

impl RepositoryStager {
    /// Creates a stager over `layout`; `timeout` bounds every git subprocess.
    pub fn new(layout: &StoreLayout, timeout: Option<Duration>) -> Self {
        Self {
            repos_dir: layout.repos_dir.clone(),
            cache: ContentCache::new(&layout.cache_dir),
            timeout,
            checkout_locks: Arc::new(DashMap::new()),
        }
    }

    #[must_use]
    pub const fn cache(&self) -> &ContentCache {
        &self.cache
    }

    /// The deterministic working-copy location for `url`.
    #[must_use]
    pub fn working_copy_path(&self, url: &str) -> PathBuf {
        let mut path = self.repos_dir.clone();
        for component in working_copy_components(url) {
            path.push(component);
        }
        path
    }

    fn repo(&self, path: &Path) -> GitRepo {
        GitRepo::new(path).with_timeout(self.timeout)
    }

    /// Clones the source if no working copy exists, otherwise fetches every ref.
    ///
    /// # Errors
    ///
    /// [`SkillsError::RepositoryUnavailable`] when the remote cannot be reached; network
    /// failures are not retried.
    pub async fn ensure(&self, source: &Source) -> Result<StagedRepository> {
        let path = self.working_copy_path(&source.url);
        let repo = self.repo(&path);

        if repo.is_git_repo() {
            tracing::debug!("Fetching {} into {}", source.display_url(), path.display());
            repo.fetch(&source.url).await?;
        } else {
            if path.exists() {
                tracing::warn!("Replacing incomplete working copy at {}", path.display());
                crate::utils::remove_dir_all(&path)?;
            }
            if let Some(parent) = path.parent() {
                crate::utils::ensure_dir(parent)?;
            }
            tracing::info!("Cloning {}", source.display_url());
            GitRepo::clone(&source.url, &path, self.timeout).await?;
        }

        let sha = self.resolve(&path, "HEAD").await?;
        Ok(StagedRepository { path, sha })
    }

    /// Resolves a ref expression in the working copy at `path` to a full commit id.
    ///
    /// `HEAD` means the remote default branch. Any other expression is tried as a
    /// remote branch, then a tag, then verbatim (commit ids, `HEAD~1`, ...). The
    /// checkout is never touched.
    ///
    /// # Errors
    ///
    /// [`SkillsError::RefNotFound`] when nothing matches.
    pub async fn resolve(&self, path: &Path, reference: &str) -> Result<String> {
        let repo = self.repo(path);
        let candidates = if reference == "HEAD" {
            vec!["refs/remotes/origin/HEAD".to_string(), "HEAD".to_string()]
        } else {
            vec![
                format!("refs/remotes/origin/{reference}"),
                format!("refs/tags/{reference}"),
                reference.to_string(),
            ]
        };

        for candidate in &candidates {
            if let Some(sha) = repo.resolve_commit(candidate).await? {
                tracing::trace!("Resolved {} via {} to {}", reference, candidate, sha);
                return Ok(sha);
            }
        }

        Err(SkillsError::RefNotFound {
            reference: reference.to_string(),
            repository: path.display().to_string(),
        }
        .into())
    }

    /// Resolves `reference` and makes sure a snapshot of that commit exists.
    ///
    /// A commit that is already cached returns immediately without touching the
    /// working copy.
    pub async fn checkout_and_cache(&self, path: &Path, reference: &str) -> Result<CachedCommit> {
        let sha = self.resolve(path, reference).await?;
        if self.cache.has(&sha) {
            tracing::debug!("Commit {} already cached; skipping checkout", short(&sha));
            return Ok(CachedCommit {
                cache_path: self.cache.path_for(&sha)?,
                sha,
            });
        }

        let local = self
            .checkout_locks
            .entry(path.to_path_buf())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let _local_guard = local.lock().await;
        let _file_guard = CacheLock::acquire(&self.repos_dir, &self.lock_name(path)).await?;

        // another holder may have cached it while we waited
        if self.cache.has(&sha) {
            return Ok(CachedCommit {
                cache_path: self.cache.path_for(&sha)?,
                sha,
            });
        }

        tracing::debug!("Checking out {} in {}", short(&sha), path.display());
        self.repo(path).checkout_detached(&sha).await?;
        let cache_path = self
            .cache
            .put(&sha, path)
            .await
            .with_context(|| format!("Failed to cache commit {sha}"))?;

        Ok(CachedCommit { sha, cache_path })
    }

    fn lock_name(&self, path: &Path) -> String {
        let rel = path.strip_prefix(&self.repos_dir).unwrap_or(path);
        let parts: Vec<String> =
            rel.components().map(|c| sanitize_component(&c.as_os_str().to_string_lossy())).collect();
        parts.join("_")
    }
}

fn short(sha: &str) -> &str {
    &sha[..sha.len().min(8)]
}

/// Host followed by path segments, each sanitized, with a trailing `.git` removed.
fn working_copy_components(url: &str) -> Vec<String> {
    let (host, path) = if let Some(rest) = url.strip_prefix("file://") {
        ("local".to_string(), rest.to_string())
    } else if url.contains("://") {
        let stripped = strip_auth_from_url(url);
        let rest = stripped.split_once("://").map_or("", |(_, rest)| rest);
        match rest.split_once('/') {
            Some((host, path)) => (host.to_string(), path.to_string()),
            None => (rest.to_string(), String::new()),
        }
    } else if let Some((host, path)) = url.split_once(':') {
        // scp-style user@host:path
        let host = host.rsplit_once('@').map_or(host, |(_, h)| h);
        (host.to_string(), path.to_string())
    } else {
        ("local".to_string(), url.to_string())
    };

    let path = path.trim_end_matches('/');
    let path = path.strip_suffix(".git").unwrap_or(path);

    let mut components = vec![sanitize_component(&host)];
    components.extend(
        path.split(['/', '\\'])
            .filter(|segment| !segment.is_empty())
            .map(sanitize_component),
    );
    components
}
