//! skills - pinned agent skills from git repositories
//!
//! Skill repositories publish *artifacts* (a directory with a `SKILL.md` and any
//! supporting files) and optionally *collections* of them. This crate turns a
//! project's declarations into exact, integrity-checked copies:
//!
//! - `skills.json` declares sources, artifacts (optionally pinned to a ref) and
//!   collections
//! - `skills-lock.json` records, per artifact, the commit it resolved to, its path in
//!   the repository and a content fingerprint
//! - a content-addressed cache keeps one snapshot per commit, so reinstalling or
//!   resolving the same commit again never touches git
//!
//! # Pipeline
//!
//! ```text
//! "owner/repo"  ──source──▶  Source { name, url, subdir }
//!               ──stager──▶  working copy (clone or fetch, once per run)
//!               ──stager──▶  commit sha, snapshot in cache/<sha>/
//!               ──discovery─▶ artifacts + collections (format detected per repo)
//!               ──resolver──▶ lock entry { sha, path, integrity }
//!               ──installer─▶ .claude/skills/<name>/, .cursor/skills/<name>/, ...
//! ```
//!
//! # Modules
//!
//! - [`source`] - normalizes `owner/repo`, URLs, SSH and local paths
//! - [`stager`] - per-repository working copies, ref resolution, checkout into the cache
//! - [`cache`] - content-addressed snapshots, fingerprints and cross-process locks
//! - [`discovery`] - format detection and artifact discovery for marketplace, plugin,
//!   simple and unconventional repositories
//! - [`resolver`] - batch resolution of declarations into lock entries
//! - [`lockfile`] / [`manifest`] - `skills-lock.json` and `skills.json`
//! - [`installer`] - copies locked artifacts into agent folders
//! - [`git`] - thin async wrapper over the system `git` binary
//! - [`cli`] - the `skills` command
//!
//! # Example
//!
//! ```rust,no_run
//! use skills_cli::config::StoreLayout;
//! use skills_cli::lockfile::LockFile;
//! use skills_cli::manifest::ProjectConfig;
//! use skills_cli::resolver::{LockResolver, ResolveMode};
//! use skills_cli::stager::RepositoryStager;
//! use std::path::Path;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let project = Path::new(".");
//! let config = ProjectConfig::load(project)?;
//! let mut lock = LockFile::load(&project.join("skills-lock.json"))?;
//!
//! let stager = RepositoryStager::new(&StoreLayout::under("/tmp/skills"), None);
//! let mut resolver = LockResolver::new(stager);
//! let report = resolver.resolve_all(&config, &mut lock, ResolveMode::Locked, None).await;
//! for failure in report.failures() {
//!     eprintln!("{} failed to resolve", failure.key);
//! }
//! lock.save(&project.join("skills-lock.json"))?;
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod cli;
pub mod config;
pub mod constants;
pub mod core;
pub mod discovery;
pub mod git;
pub mod installer;
pub mod lockfile;
pub mod manifest;
pub mod markdown;
pub mod resolver;
pub mod source;
pub mod stager;
pub mod utils;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
