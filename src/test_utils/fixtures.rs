//! Fixture repositories served over `file://` URLs.

use anyhow::{Context, Result};
use std::collections::HashMap;
use std::path::PathBuf;

use super::git_helper::TestGit;

enum Step {
    Write(String, String),
    Remove(String),
    Commit(String),
    Tag(String),
    Branch(String),
}

/// Scripted construction of a git repository.
///
/// Steps run in order; `file` and `remove` only touch the working tree until the
/// next `commit`.
///
/// ```rust,no_run
/// use skills_cli::test_utils::RepoBuilder;
///
/// let repo = RepoBuilder::new("/tmp/remote")
///     .file("skills/pdf/SKILL.md", "---\nname: pdf\n---\n")
///     .commit("add pdf")
///     .tag("v1")
///     .build()
///     .unwrap();
/// assert!(repo.url.starts_with("file://"));
/// ```
pub struct RepoBuilder {
    path: PathBuf,
    steps: Vec<Step>,
}

/// A built fixture repository.
#[derive(Debug, Clone)]
pub struct FixtureRepo {
    pub path: PathBuf,
    /// `file://` URL usable as a source
    pub url: String,
    /// Commit at the tip of `main`
    pub head: String,
    /// Tag name to commit id
    pub tags: HashMap<String, String>,
}

impl RepoBuilder {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            steps: Vec::new(),
        }
    }

    #[must_use]
    pub fn file(mut self, rel: &str, content: &str) -> Self {
        self.steps.push(Step::Write(rel.to_string(), content.to_string()));
        self
    }

    #[must_use]
    pub fn remove(mut self, rel: &str) -> Self {
        self.steps.push(Step::Remove(rel.to_string()));
        self
    }

    #[must_use]
    pub fn commit(mut self, message: &str) -> Self {
        self.steps.push(Step::Commit(message.to_string()));
        self
    }

    #[must_use]
    pub fn tag(mut self, name: &str) -> Self {
        self.steps.push(Step::Tag(name.to_string()));
        self
    }

    /// Creates a branch at the current commit, staying on `main`.
    #[must_use]
    pub fn branch(mut self, name: &str) -> Self {
        self.steps.push(Step::Branch(name.to_string()));
        self
    }

    pub fn build(self) -> Result<FixtureRepo> {
        std::fs::create_dir_all(&self.path)
            .with_context(|| format!("Failed to create {}", self.path.display()))?;
        let git = TestGit::new(&self.path);
        git.init()?;
        git.config_user()?;

        let mut tags = HashMap::new();
        for step in self.steps {
            match step {
                Step::Write(rel, content) => {
                    let target = self.path.join(&rel);
                    if let Some(parent) = target.parent() {
                        std::fs::create_dir_all(parent)?;
                    }
                    std::fs::write(&target, content)
                        .with_context(|| format!("Failed to write {}", target.display()))?;
                }
                Step::Remove(rel) => {
                    let target = self.path.join(&rel);
                    if target.is_dir() {
                        std::fs::remove_dir_all(&target)?;
                    } else {
                        std::fs::remove_file(&target)?;
                    }
                }
                Step::Commit(message) => {
                    git.add_all()?;
                    git.commit(&message)?;
                }
                Step::Tag(name) => {
                    git.tag(&name)?;
                    tags.insert(name, git.rev_parse_head()?);
                }
                Step::Branch(name) => git.branch(&name)?,
            }
        }

        let head = git.rev_parse_head()?;
        Ok(FixtureRepo {
            url: format!("file://{}", self.path.display()),
            path: self.path,
            head,
            tags,
        })
    }
}
