//! Markdown helpers.
//!
//! Artifact descriptors (`SKILL.md`) are markdown files whose metadata lives in a
//! YAML frontmatter block delimited by `---` lines:
//!
//! ```text
//! ---
//! name: pdf
//! description: Extract text and tables from PDF files
//! ---
//!
//! # PDF toolkit
//! ```

pub mod frontmatter;

pub use frontmatter::{Frontmatter, FrontmatterParser};
