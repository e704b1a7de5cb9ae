//! Lock resolution.
//!
//! The resolver reconciles the declarations in `skills.json` with the entries in
//! `skills-lock.json`. For every declared artifact it decides whether the existing
//! lock entry can stand, and if not drives stager → discovery → cache to produce a
//! new one:
//!
//! 1. stage the source repository (clone or fetch, once per source per resolver)
//! 2. resolve the pin (or `HEAD`) to a commit and make sure it is snapshotted
//! 3. discover the snapshot (memoized per source and commit)
//! 4. find the artifact by name
//! 5. fingerprint its directory inside the snapshot
//! 6. emit a [`LockedArtifact`] replacing the previous entry
//!
//! # Modes
//!
//! | Mode | Existing entry with the same pin | Otherwise |
//! |------|----------------------------------|-----------|
//! | [`ResolveMode::Locked`] | kept, nothing is staged | resolved |
//! | [`ResolveMode::Refresh`] | re-resolved | resolved |
//! | [`ResolveMode::Update`] | re-staged; replaced only if the commit moved | resolved |
//!
//! An entry recorded under a different pin than the one now declared is never up to
//! date, so changing `@v1` to `@v2` re-resolves without a forced refresh.
//!
//! # Batches
//!
//! [`LockResolver::resolve_all`] resolves every declared artifact, then expands every
//! declared collection into its members. A failing item is recorded in the
//! [`BatchReport`] and the batch moves on; partial success is normal. Collection
//! members that were already resolved in the same batch (because they are also
//! declared individually, possibly with a pin) are skipped.

pub mod reference;

use anyhow::{Context, Result};
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;

use crate::core::SkillsError;
use crate::discovery::{self, DiscoveryResult};
use crate::lockfile::{LockFile, LockedArtifact, LockedMetadata};
use crate::manifest::ProjectConfig;
use crate::source::Source;
use crate::stager::{CachedCommit, RepositoryStager, StagedRepository};
use reference::ArtifactRef;

/// How existing lock entries are treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveMode {
    /// Keep entries whose pin still matches the declaration
    Locked,
    /// Re-resolve everything
    Refresh,
    /// Re-stage and replace entries whose commit moved
    Update,
}

/// What happened to one item of a batch.
#[derive(Debug)]
pub enum Outcome {
    UpToDate,
    Added,
    Updated { previous_sha: String },
    Failed(anyhow::Error),
}

impl Outcome {
    #[must_use]
    pub const fn is_failure(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

/// One resolved (or failed) declaration.
#[derive(Debug)]
pub struct ItemReport {
    /// Lock key, or the raw declaration when it could not be parsed
    pub key: String,
    /// Collection this item was expanded from
    pub collection: Option<String>,
    pub outcome: Outcome,
}

/// Result of [`LockResolver::resolve_all`].
#[derive(Debug, Default)]
pub struct BatchReport {
    pub items: Vec<ItemReport>,
    pub warnings: Vec<String>,
    /// A collection could not be expanded, so its members are unknown
    pub incomplete: bool,
}

impl BatchReport {
    #[must_use]
    pub fn has_failures(&self) -> bool {
        self.items.iter().any(|item| item.outcome.is_failure())
    }

    pub fn failures(&self) -> impl Iterator<Item = &ItemReport> {
        self.items.iter().filter(|item| item.outcome.is_failure())
    }

    /// Lock keys that resolved successfully in this batch.
    #[must_use]
    pub fn resolved_keys(&self) -> HashSet<String> {
        self.items
            .iter()
            .filter(|item| !item.outcome.is_failure())
            .map(|item| item.key.clone())
            .collect()
    }

    fn push(&mut self, key: String, collection: Option<String>, outcome: Outcome) {
        self.items.push(ItemReport { key, collection, outcome });
    }
}

/// Result of [`LockResolver::verify_lock`].
#[derive(Debug, Default)]
pub struct VerifyReport {
    /// Keys whose fingerprint matched
    pub verified: Vec<String>,
    /// [`SkillsError::IntegrityMismatch`] per failing key
    pub mismatches: Vec<SkillsError>,
    /// Keys whose snapshot is not cached, so nothing could be checked
    pub not_cached: Vec<String>,
}

/// Drives resolution for one run. Memoization lives as long as the resolver.
pub struct LockResolver {
    stager: RepositoryStager,
    staged: HashMap<String, StagedRepository>,
    unavailable: HashMap<String, SkillsError>,
    discoveries: HashMap<(String, String), Arc<DiscoveryResult>>,
    warnings: Vec<String>,
}

impl LockResolver {
    pub fn new(stager: RepositoryStager) -> Self {
        Self {
            stager,
            staged: HashMap::new(),
            unavailable: HashMap::new(),
            discoveries: HashMap::new(),
            warnings: Vec::new(),
        }
    }

    #[must_use]
    pub const fn stager(&self) -> &RepositoryStager {
        &self.stager
    }

    /// Stages `source` at most once per resolver; failures are remembered too.
    async fn stage(&mut self, source: &Source) -> Result<StagedRepository> {
        if let Some(staged) = self.staged.get(&source.name) {
            return Ok(staged.clone());
        }
        if let Some(err) = self.unavailable.get(&source.name) {
            return Err(err.clone().into());
        }

        match self.stager.ensure(source).await {
            Ok(staged) => {
                self.staged.insert(source.name.clone(), staged.clone());
                Ok(staged)
            }
            Err(err) => {
                if let Some(typed) = err.downcast_ref::<SkillsError>() {
                    self.unavailable.insert(source.name.clone(), typed.clone());
                }
                Err(err)
            }
        }
    }

    /// Discovers the snapshot of `commit`, once per source and commit.
    async fn discover(&mut self, source: &Source, commit: &CachedCommit) -> Result<Arc<DiscoveryResult>> {
        let memo_key = (source.name.clone(), commit.sha.clone());
        if let Some(result) = self.discoveries.get(&memo_key) {
            return Ok(Arc::clone(result));
        }

        let root = commit.cache_path.clone();
        let owned = source.clone();
        let result = tokio::task::spawn_blocking(move || discovery::discover(&root, &owned))
            .await
            .context("Discovery task panicked")??;

        for name in result.duplicate_names() {
            self.warnings.push(format!(
                "Source '{}' publishes several artifacts named '{}'; using the first",
                source.name, name
            ));
        }

        let result = Arc::new(result);
        self.discoveries.insert(memo_key, Arc::clone(&result));
        Ok(result)
    }

    /// Resolves one artifact declaration.
    ///
    /// Returns the outcome and, unless it is [`Outcome::UpToDate`], the entry that
    /// should replace `existing`.
    ///
    /// # Errors
    ///
    /// Staging, ref resolution, discovery, lookup ([`SkillsError::ArtifactNotFound`])
    /// and fingerprint failures.
    pub async fn resolve(
        &mut self,
        source: &Source,
        reference: &ArtifactRef,
        existing: Option<&LockedArtifact>,
        mode: ResolveMode,
    ) -> Result<(Outcome, Option<LockedArtifact>)> {
        let same_pin = existing.filter(|entry| entry.reference == reference.reference);

        if mode == ResolveMode::Locked && same_pin.is_some() {
            tracing::debug!("{} is locked; skipping resolution", reference.key());
            return Ok((Outcome::UpToDate, None));
        }

        let staged = self.stage(source).await?;
        let pin = reference.reference.as_deref().unwrap_or("HEAD");

        if mode == ResolveMode::Update {
            if let Some(entry) = same_pin {
                let sha = self.stager.resolve(&staged.path, pin).await?;
                if sha == entry.sha {
                    tracing::debug!("{} still at {}", reference.key(), sha);
                    return Ok((Outcome::UpToDate, None));
                }
            }
        }

        let commit = self.stager.checkout_and_cache(&staged.path, pin).await?;
        let result = self.discover(source, &commit).await?;

        let Some(artifact) = result.find_artifact(&reference.name) else {
            return Err(SkillsError::ArtifactNotFound {
                name: reference.name.clone(),
                source_name: source.name.clone(),
                available: result.artifact_names(),
            }
            .into());
        };

        let repo_path = repo_relative(source.subdir.as_deref(), &artifact.path);
        let integrity = self
            .stager
            .cache()
            .fingerprint(&commit.sha, &repo_path)
            .await
            .with_context(|| format!("Failed to fingerprint {}", reference.key()))?;

        let entry = LockedArtifact {
            sha: commit.sha.clone(),
            integrity,
            path: repo_path,
            reference: reference.reference.clone(),
            metadata: LockedMetadata {
                source: source.name.clone(),
                url: source.url.clone(),
                format: artifact.format,
                description: artifact.description.clone(),
                extra: artifact.metadata.clone(),
            },
        };

        let outcome = match existing {
            None => Outcome::Added,
            Some(previous) if *previous == entry => return Ok((Outcome::UpToDate, None)),
            Some(previous) => Outcome::Updated {
                previous_sha: previous.sha.clone(),
            },
        };
        tracing::debug!("Resolved {} to {} ({})", reference, commit.sha, entry.integrity);
        Ok((outcome, Some(entry)))
    }

    /// Stages `source`, snapshots `pin` and runs discovery on it.
    ///
    /// Used to show what a source publishes before anything is declared.
    pub async fn inspect(
        &mut self,
        source: &Source,
        pin: &str,
    ) -> Result<(CachedCommit, Arc<DiscoveryResult>)> {
        let staged = self.stage(source).await?;
        let commit = self.stager.checkout_and_cache(&staged.path, pin).await?;
        let result = self.discover(source, &commit).await?;
        Ok((commit, result))
    }

    /// Member names of a collection at the source's default branch.
    ///
    /// # Errors
    ///
    /// [`SkillsError::CollectionNotFound`] when discovery reports no such collection.
    pub async fn expand_collection(&mut self, source: &Source, name: &str) -> Result<Vec<String>> {
        let (_, result) = self.inspect(source, "HEAD").await?;

        result.find_collection(name).map(|c| c.artifacts.clone()).ok_or_else(|| {
            SkillsError::CollectionNotFound {
                name: name.to_string(),
                source_name: source.name.clone(),
                available: result.collection_names(),
            }
            .into()
        })
    }

    /// Resolves every declaration of `config` against `lock`, updating `lock` in place.
    ///
    /// `filter` restricts the batch to declarations whose lock key, artifact name or
    /// collection key appears in it.
    pub async fn resolve_all(
        &mut self,
        config: &ProjectConfig,
        lock: &mut LockFile,
        mode: ResolveMode,
        filter: Option<&[String]>,
    ) -> BatchReport {
        let mut report = BatchReport::default();
        let mut resolved = HashSet::new();
        let selected = |reference: &ArtifactRef, collection: Option<&str>| {
            filter.is_none_or(|names| {
                names.iter().any(|n| {
                    *n == reference.key() || *n == reference.name || collection == Some(n.as_str())
                })
            })
        };

        for declared in &config.artifacts {
            let reference = match ArtifactRef::parse(declared) {
                Ok(reference) => reference,
                Err(err) => {
                    report.push(declared.clone(), None, Outcome::Failed(err));
                    continue;
                }
            };
            if !selected(&reference, None) {
                continue;
            }
            resolved.insert(reference.key());
            let outcome = self.resolve_into(config, lock, &reference, mode).await;
            report.push(reference.key(), None, outcome);
        }

        for declared in &config.collections {
            let collection = match ArtifactRef::parse(declared) {
                Ok(reference) => reference,
                Err(err) => {
                    report.incomplete = true;
                    report.push(declared.clone(), None, Outcome::Failed(err));
                    continue;
                }
            };
            if let Some(pin) = &collection.reference {
                report.warnings.push(format!(
                    "Collection '{}' ignores the pinned ref '{}'; pin individual artifacts instead",
                    collection.key(),
                    pin
                ));
            }

            let members = match self.expand_for(config, &collection).await {
                Ok(members) => members,
                Err(err) => {
                    report.incomplete = true;
                    report.push(collection.key(), None, Outcome::Failed(err));
                    continue;
                }
            };

            let collection_key = collection.key();
            for member in members {
                let reference = ArtifactRef::new(collection.source.clone(), member, None);
                if !selected(&reference, Some(&collection_key)) {
                    continue;
                }
                if !resolved.insert(reference.key()) {
                    tracing::debug!("{} already resolved in this batch", reference.key());
                    continue;
                }
                let outcome = self.resolve_into(config, lock, &reference, mode).await;
                report.push(reference.key(), Some(collection_key.clone()), outcome);
            }
        }

        report.warnings.append(&mut self.warnings);
        report
    }

    async fn expand_for(&mut self, config: &ProjectConfig, collection: &ArtifactRef) -> Result<Vec<String>> {
        let source = find_source(config, &collection.source)?;
        self.expand_collection(&source, &collection.name).await
    }

    async fn resolve_into(
        &mut self,
        config: &ProjectConfig,
        lock: &mut LockFile,
        reference: &ArtifactRef,
        mode: ResolveMode,
    ) -> Outcome {
        let source = match find_source(config, &reference.source) {
            Ok(source) => source,
            Err(err) => return Outcome::Failed(err),
        };

        let key = reference.key();
        match self.resolve(&source, reference, lock.get(&key), mode).await {
            Ok((outcome, Some(entry))) => {
                lock.insert(key, entry);
                outcome
            }
            Ok((outcome, None)) => outcome,
            Err(err) => {
                tracing::debug!("Resolution of {} failed: {:#}", reference, err);
                Outcome::Failed(err)
            }
        }
    }

    /// Makes sure the snapshot behind `entry` exists and returns the artifact
    /// directory inside it.
    ///
    /// A missing snapshot is rebuilt from the source at the locked commit.
    pub async fn materialize(&mut self, source: &Source, entry: &LockedArtifact) -> Result<PathBuf> {
        let cache = self.stager.cache().clone();
        if !cache.has(&entry.sha) {
            let staged = self.stage(source).await?;
            self.stager.checkout_and_cache(&staged.path, &entry.sha).await?;
        }
        Ok(cache.path_for(&entry.sha)?.join(&entry.path))
    }

    /// Recomputes the fingerprint of every cached entry. Never modifies `lock`.
    pub async fn verify_lock(&self, lock: &LockFile) -> Result<VerifyReport> {
        let cache = self.stager.cache();
        let mut report = VerifyReport::default();

        for (key, entry) in &lock.artifacts {
            if !cache.has(&entry.sha) {
                report.not_cached.push(key.clone());
                continue;
            }
            let actual = match cache.verify(&entry.sha, &entry.path, &entry.integrity).await {
                Ok(Ok(())) => {
                    report.verified.push(key.clone());
                    continue;
                }
                Ok(Err(actual)) => actual,
                Err(err) => {
                    tracing::debug!("Could not fingerprint {}: {:#}", key, err);
                    "missing".to_string()
                }
            };
            report.mismatches.push(SkillsError::IntegrityMismatch {
                key: key.clone(),
                expected: entry.integrity.clone(),
                actual,
            });
        }
        Ok(report)
    }
}

fn find_source(config: &ProjectConfig, name: &str) -> Result<Source> {
    config.find_source(name).cloned().ok_or_else(|| {
        SkillsError::SourceNotFound {
            name: name.to_string(),
        }
        .into()
    })
}

/// Joins the source subdirectory and a discovery path into a repository path.
fn repo_relative(subdir: Option<&str>, path: &str) -> String {
    let subdir = subdir.map(|s| s.trim_matches('/')).filter(|s| !s.is_empty() && *s != ".");
    match (subdir, path) {
        (None, path) => path.to_string(),
        (Some(subdir), ".") => subdir.to_string(),
        (Some(subdir), path) => format!("{subdir}/{path}"),
    }
}
