//! Names, paths and defaults shared across the crate.
//!
//! File-name conventions for the manifests a source repository can publish live
//! here, next to the project file names and the store defaults, so detection,
//! discovery and the CLI agree on a single spelling.

use std::time::Duration;

/// Project configuration file, written next to the project root.
pub const CONFIG_FILE: &str = "skills.json";

/// Project lock file.
pub const LOCK_FILE: &str = "skills-lock.json";

/// `$schema` value written into [`CONFIG_FILE`].
pub const CONFIG_SCHEMA_URL: &str = "https://skills.sh/schemas/skills.json";

/// `$schema` value written into [`LOCK_FILE`].
pub const LOCK_SCHEMA_URL: &str = "https://skills.sh/schemas/skills-lock.json";

/// Highest lock file version this build reads and the version it writes.
pub const LOCK_FILE_VERSION: u32 = 1;

/// Multi-group index published by marketplace repositories.
pub const MARKETPLACE_MANIFEST: &str = ".claude-plugin/marketplace.json";

/// Single-group manifest published by plugin repositories.
pub const PLUGIN_MANIFEST: &str = ".claude-plugin/plugin.json";

/// Conventional top-level folder holding one directory per artifact.
pub const ARTIFACTS_DIR: &str = "skills";

/// Descriptor files carrying YAML frontmatter, in lookup order.
pub const DESCRIPTOR_FILES: &[&str] = &["SKILL.md", "skill.md"];

/// Sidecar metadata file used by simple-format repositories.
pub const SIDECAR_FILE: &str = "skill.json";

/// Directory names never treated as artifacts while scanning.
pub const SKIP_DIRS: &[&str] = &["node_modules", "target", "dist", "build", "__pycache__"];

/// Agent folders searched when a repository follows no known convention.
pub const FALLBACK_SEARCH_DIRS: &[&str] = &[
    "skills/.curated",
    "skills/.experimental",
    "skills/.system",
    ".agent/skills",
    ".agents/skills",
    ".claude/skills",
    ".codex/skills",
    ".cursor/skills",
    ".github/skills",
    ".goose/skills",
    ".kilocode/skills",
    ".kiro/skills",
    ".opencode/skills",
    ".roo/skills",
    ".trae/skills",
    ".windsurf/skills",
];

/// How many levels below the discovery root the last-resort tree search descends.
pub const FALLBACK_SEARCH_DEPTH: usize = 5;

/// Host assumed for `owner/repo` shorthand.
pub const DEFAULT_HOST: &str = "github.com";

/// Hosts whose URLs follow the `host/owner/repo` layout.
pub const KNOWN_HOSTS: &[&str] = &["github.com", "gitlab.com", "bitbucket.org", "codeberg.org"];

/// Git timeout applied by the CLI when the global config sets none.
pub const DEFAULT_GIT_TIMEOUT: Duration = Duration::from_secs(300);
