//! Test utilities
//!
//! Available to unit tests and, through the `test-utils` feature, to the
//! integration suite.
//!
//! - [`TestGit`]: synchronous git helper for fixture setup
//! - [`RepoBuilder`]: scripted fixture repositories reachable through `file://` URLs
//! - [`init_test_logging`]: opt-in tracing output
//!
//! ```rust,no_run
//! use skills_cli::test_utils::{RepoBuilder, init_test_logging};
//!
//! init_test_logging(None);
//! let temp = tempfile::TempDir::new().unwrap();
//! let repo = RepoBuilder::new(temp.path().join("remote"))
//!     .file("skills/pdf/skill.json", r#"{"name":"pdf"}"#)
//!     .commit("initial")
//!     .build()
//!     .unwrap();
//! ```

pub mod fixtures;
pub mod git_helper;

pub use fixtures::{FixtureRepo, RepoBuilder};
pub use git_helper::TestGit;

use std::sync::Once;
use tracing::Level;
use tracing_subscriber::EnvFilter;

static INIT_LOGGING: Once = Once::new();

/// Installs a test subscriber once per process.
///
/// Uses `level` when given, else `RUST_LOG`; with neither, logging stays off.
///
/// ```bash
/// RUST_LOG=git=debug cargo test
/// ```
pub fn init_test_logging(level: Option<Level>) {
    INIT_LOGGING.call_once(|| {
        let filter = if let Some(level) = level {
            EnvFilter::new(level.to_string())
        } else if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            return;
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .try_init();
    });
}
