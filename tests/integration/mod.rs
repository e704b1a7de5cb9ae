//! Integration tests for skills
//!
//! Every test builds real git repositories under a temp dir and reaches them through
//! `file://` URLs, so no network access is needed. `git` must be on `PATH`.
//!
//! ```bash
//! cargo test --test integration
//! RUST_LOG=skills_cli=debug cargo test --test integration -- --nocapture
//! ```
//!
//! - **common**: `TestProject` harness (isolated store, project dir, binary runner)
//! - **resolution**: batch resolution through the library API
//! - **commands**: the `skills` binary end to end

mod commands;
mod common;
mod resolution;
