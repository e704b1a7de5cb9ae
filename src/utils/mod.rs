//! Cross-platform utilities and helpers
//!
//! This module provides the file system and platform helpers shared by the stager,
//! the cache, the discoverer and the installer. All utilities behave the same way on
//! Windows, macOS, and Linux.
//!
//! # Modules
//!
//! - [`fs`] - File system operations with atomic writes and filtered directory copies
//! - [`platform`] - Platform-specific helpers and path normalization
//!
//! # Example
//!
//! ```rust,no_run
//! use skills_cli::utils::{atomic_write, ensure_dir};
//! use std::path::Path;
//!
//! # fn example() -> anyhow::Result<()> {
//! ensure_dir(Path::new(".claude/skills"))?;
//! atomic_write(Path::new("skills-lock.json"), b"{}")?;
//! # Ok(())
//! # }
//! ```

pub mod fs;
pub mod platform;

pub use fs::{atomic_write, copy_dir_filtered, ensure_dir, remove_dir_all};
pub use platform::{get_git_command, is_windows, normalize_path_for_storage, sanitize_component};
