//! Shared harness for integration tests.

use anyhow::Result;
use assert_cmd::Command;
use skills_cli::config::StoreLayout;
use skills_cli::constants::LOCK_FILE;
use skills_cli::lockfile::LockFile;
use skills_cli::manifest::ProjectConfig;
use skills_cli::resolver::LockResolver;
use skills_cli::stager::RepositoryStager;
use skills_cli::test_utils::{RepoBuilder, init_test_logging};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;

/// An empty project plus an isolated skills home, both under one temp dir.
pub struct TestProject {
    _temp: TempDir,
    root: PathBuf,
    project_dir: PathBuf,
    home: PathBuf,
}

impl TestProject {
    pub fn new() -> Result<Self> {
        init_test_logging(None);
        let temp = TempDir::new()?;
        let root = temp.path().to_path_buf();
        let project_dir = root.join("project");
        let home = root.join("home");
        std::fs::create_dir_all(&project_dir)?;
        std::fs::create_dir_all(&home)?;
        Ok(Self {
            _temp: temp,
            root,
            project_dir,
            home,
        })
    }

    pub fn project_path(&self) -> &Path {
        &self.project_dir
    }

    /// A builder for a fixture repository named `name` next to the project.
    pub fn remote(&self, name: &str) -> RepoBuilder {
        RepoBuilder::new(self.root.join("remotes").join(name))
    }

    pub fn layout(&self) -> StoreLayout {
        StoreLayout::under(&self.home)
    }

    pub fn resolver(&self) -> LockResolver {
        LockResolver::new(RepositoryStager::new(&self.layout(), Some(Duration::from_secs(60))))
    }

    pub fn write_config(&self, config: &ProjectConfig) -> Result<()> {
        config.save(&self.project_dir)
    }

    pub fn load_config(&self) -> Result<ProjectConfig> {
        ProjectConfig::load(&self.project_dir)
    }

    pub fn load_lock(&self) -> Result<LockFile> {
        LockFile::load(&self.project_dir.join(LOCK_FILE))
    }

    /// Runs the `skills` binary against this project with an isolated home.
    pub fn run(&self, args: &[&str]) -> assert_cmd::assert::Assert {
        let layout = self.layout();
        Command::cargo_bin("skills")
            .expect("skills binary is built")
            .args(args)
            .arg("--project-dir")
            .arg(&self.project_dir)
            .env("SKILLS_HOME", &self.home)
            .env("SKILLS_CONFIG", self.home.join("config.toml"))
            .env("SKILLS_CACHE_DIR", &layout.cache_dir)
            .env("SKILLS_REPOS_DIR", &layout.repos_dir)
            .env("NO_COLOR", "1")
            .env_remove("RUST_LOG")
            .assert()
    }
}

/// `SKILL.md` content with the given frontmatter name.
pub fn skill_md(name: &str, body: &str) -> String {
    format!("---\nname: {name}\ndescription: {name} skill\n---\n\n{body}\n")
}
