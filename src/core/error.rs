//! Error handling for skills-cli
//!
//! The error system follows two rules:
//! 1. **Strongly-typed errors** so the resolver can tell a missing artifact from a
//!    network failure and keep a batch going
//! 2. **User-friendly messages** with actionable suggestions for CLI users
//!
//! # Architecture
//!
//! - [`SkillsError`] - every failure the engine distinguishes
//! - [`ErrorContext`] - wrapper that adds details and a suggestion for display
//!
//! Code above the leaves returns [`anyhow::Result`] and adds `.context(...)`; the typed
//! error survives inside the chain and is recovered with `downcast_ref`.
//!
//! # Error Categories
//!
//! - **Sources**: [`SkillsError::InvalidSourceFormat`], [`SkillsError::SourceNotFound`],
//!   [`SkillsError::DuplicateSource`]
//! - **Repositories**: [`SkillsError::RepositoryUnavailable`], [`SkillsError::RefNotFound`],
//!   [`SkillsError::GitNotFound`], [`SkillsError::GitCommandError`]
//! - **Discovery**: [`SkillsError::ManifestParseError`], [`SkillsError::ArtifactNotFound`],
//!   [`SkillsError::CollectionNotFound`]
//! - **Integrity**: [`SkillsError::IntegrityMismatch`]
//!
//! # Examples
//!
//! ```rust,no_run
//! use skills_cli::core::{SkillsError, user_friendly_error};
//!
//! let err = SkillsError::ArtifactNotFound {
//!     name: "pdfs".to_string(),
//!     source_name: "anthropics/skills".to_string(),
//!     available: vec!["pdf".to_string(), "docx".to_string()],
//! };
//! let ctx = user_friendly_error(anyhow::Error::from(err));
//! assert_eq!(ctx.suggestion.as_deref(), Some("Did you mean 'pdf'?"));
//! ```

use colored::Colorize;
use std::fmt;
use thiserror::Error;

/// Every failure the engine distinguishes.
#[derive(Error, Debug)]
pub enum SkillsError {
    /// A source reference has no path-like structure at all
    #[error("Invalid source '{input}': {reason}")]
    InvalidSourceFormat {
        /// The input as typed by the user
        input: String,
        /// Why it could not be parsed
        reason: String,
    },

    /// A declared artifact or collection reference is malformed
    #[error("Invalid reference '{input}': {reason}")]
    InvalidReference { input: String, reason: String },

    /// Clone or fetch failed (network, authentication, missing repository)
    #[error("Repository unavailable: {url} ({operation} failed)")]
    RepositoryUnavailable {
        url: String,
        /// `clone` or `fetch`
        operation: String,
        /// Git's stderr
        reason: String,
    },

    /// A branch, tag or commit expression does not exist in the repository
    #[error("Ref '{reference}' not found in {repository}")]
    RefNotFound { reference: String, repository: String },

    /// A manifest, descriptor or sidecar exists but cannot be parsed
    #[error("Failed to parse {file}: {reason}")]
    ManifestParseError { file: String, reason: String },

    /// Discovery did not report an artifact with this name
    #[error("Artifact '{name}' not found in source '{source_name}'")]
    ArtifactNotFound {
        name: String,
        source_name: String,
        /// Names discovery did report, used for suggestions
        available: Vec<String>,
    },

    /// Discovery did not report a collection with this name
    #[error("Collection '{name}' not found in source '{source_name}'")]
    CollectionNotFound { name: String, source_name: String, available: Vec<String> },

    /// A recomputed fingerprint differs from the locked one
    #[error("Integrity mismatch for '{key}': expected {expected}, found {actual}")]
    IntegrityMismatch { key: String, expected: String, actual: String },

    /// A reference names a source that is not declared in the project
    #[error("Source '{name}' is not declared in the project configuration")]
    SourceNotFound { name: String },

    /// A different source is already registered under this name
    #[error("Source '{name}' is already declared as {existing}")]
    DuplicateSource { name: String, existing: String },

    /// The git executable is not on PATH
    #[error("Git is not installed or not found in PATH")]
    GitNotFound,

    /// A git command other than clone/fetch/checkout failed
    #[error("Git operation failed: {operation}")]
    GitCommandError { operation: String, stderr: String },

    /// Checking out a resolved commit failed
    #[error("Failed to checkout '{reference}': {reason}")]
    GitCheckoutFailed { reference: String, reason: String },

    /// The lock file was written by a newer release
    #[error("Lock file version {found} is newer than the supported version {supported}")]
    LockfileVersion { found: u32, supported: u32 },

    /// Global or project configuration is unusable
    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl Clone for SkillsError {
    fn clone(&self) -> Self {
        match self {
            Self::InvalidSourceFormat { input, reason } => Self::InvalidSourceFormat {
                input: input.clone(),
                reason: reason.clone(),
            },
            Self::InvalidReference { input, reason } => Self::InvalidReference {
                input: input.clone(),
                reason: reason.clone(),
            },
            Self::RepositoryUnavailable { url, operation, reason } => Self::RepositoryUnavailable {
                url: url.clone(),
                operation: operation.clone(),
                reason: reason.clone(),
            },
            Self::RefNotFound { reference, repository } => Self::RefNotFound {
                reference: reference.clone(),
                repository: repository.clone(),
            },
            Self::ManifestParseError { file, reason } => Self::ManifestParseError {
                file: file.clone(),
                reason: reason.clone(),
            },
            Self::ArtifactNotFound { name, source_name, available } => Self::ArtifactNotFound {
                name: name.clone(),
                source_name: source_name.clone(),
                available: available.clone(),
            },
            Self::CollectionNotFound { name, source_name, available } => {
                Self::CollectionNotFound {
                    name: name.clone(),
                    source_name: source_name.clone(),
                    available: available.clone(),
                }
            }
            Self::IntegrityMismatch { key, expected, actual } => Self::IntegrityMismatch {
                key: key.clone(),
                expected: expected.clone(),
                actual: actual.clone(),
            },
            Self::SourceNotFound { name } => Self::SourceNotFound { name: name.clone() },
            Self::DuplicateSource { name, existing } => Self::DuplicateSource {
                name: name.clone(),
                existing: existing.clone(),
            },
            Self::GitNotFound => Self::GitNotFound,
            Self::GitCommandError { operation, stderr } => Self::GitCommandError {
                operation: operation.clone(),
                stderr: stderr.clone(),
            },
            Self::GitCheckoutFailed { reference, reason } => Self::GitCheckoutFailed {
                reference: reference.clone(),
                reason: reason.clone(),
            },
            Self::LockfileVersion { found, supported } => Self::LockfileVersion {
                found: *found,
                supported: *supported,
            },
            Self::ConfigError { message } => Self::ConfigError { message: message.clone() },
            // io::Error is not Clone; keep kind and message
            Self::IoError(e) => Self::IoError(std::io::Error::new(e.kind(), e.to_string())),
        }
    }
}

/// An error plus optional details and a suggestion, ready for display.
#[derive(Debug)]
pub struct ErrorContext {
    pub error: SkillsError,
    pub suggestion: Option<String>,
    pub details: Option<String>,
}

impl ErrorContext {
    #[must_use]
    pub const fn new(error: SkillsError) -> Self {
        Self {
            error,
            suggestion: None,
            details: None,
        }
    }

    #[must_use]
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    #[must_use]
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Prints the error to stderr with colors.
    pub fn display(&self) {
        eprintln!("{}: {}", "error".red().bold(), self.error);

        if let Some(details) = &self.details {
            eprintln!("{}: {}", "details".yellow(), details);
        }

        if let Some(suggestion) = &self.suggestion {
            eprintln!("{}: {}", "suggestion".green(), suggestion);
        }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)?;

        if let Some(details) = &self.details {
            write!(f, "\nDetails: {details}")?;
        }

        if let Some(suggestion) = &self.suggestion {
            write!(f, "\nSuggestion: {suggestion}")?;
        }

        Ok(())
    }
}

/// Returns the candidate closest to `name`, if any is reasonably close.
fn closest_match<'a>(name: &str, candidates: &'a [String]) -> Option<&'a str> {
    candidates
        .iter()
        .map(|candidate| (candidate, strsim::jaro_winkler(name, candidate)))
        .filter(|(_, score)| *score >= 0.8)
        .max_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(candidate, _)| candidate.as_str())
}

fn list_or_none(names: &[String]) -> String {
    if names.is_empty() {
        "none".to_string()
    } else {
        names.join(", ")
    }
}

/// Converts any error into an [`ErrorContext`] with a suggestion when one is known.
///
/// The first [`SkillsError`] found in the chain decides the message; otherwise the
/// full chain is reported as a configuration-style error.
#[must_use]
pub fn user_friendly_error(error: anyhow::Error) -> ErrorContext {
    if let Some(skills_error) = error.chain().find_map(|e| e.downcast_ref::<SkillsError>()) {
        return create_error_context(skills_error.clone());
    }

    if let Some(io_error) = error.downcast_ref::<std::io::Error>() {
        if io_error.kind() == std::io::ErrorKind::PermissionDenied {
            return ErrorContext::new(SkillsError::IoError(std::io::Error::new(
                io_error.kind(),
                io_error.to_string(),
            )))
            .with_suggestion("Check file ownership and permissions of the project and ~/.skills");
        }
    }

    let mut message = error.to_string();
    for cause in error.chain().skip(1) {
        message.push_str(&format!("\n  caused by: {cause}"));
    }
    ErrorContext::new(SkillsError::ConfigError { message })
}

/// Builds the suggestion text for a typed error.
#[must_use]
pub fn create_error_context(error: SkillsError) -> ErrorContext {
    match &error {
        SkillsError::InvalidSourceFormat { .. } => {
            let ctx = ErrorContext::new(error);
            ctx.with_suggestion(
                "Use 'owner/repo', 'owner/repo#path', an https/ssh URL, or 'git@host:owner/repo'",
            )
        }
        SkillsError::InvalidReference { .. } => {
            let ctx = ErrorContext::new(error);
            ctx.with_suggestion("References look like 'owner/repo/name' or 'owner/repo/name@v1.0.0'")
        }
        SkillsError::RepositoryUnavailable { reason, .. } => {
            let details = reason.trim().to_string();
            ErrorContext::new(error)
                .with_suggestion(
                    "Check the URL, your network connection, and that your git credentials can access the repository",
                )
                .with_details(details)
        }
        SkillsError::RefNotFound { .. } => ErrorContext::new(error)
            .with_suggestion("Check that the branch, tag or commit exists on the remote"),
        SkillsError::ManifestParseError { .. } => ErrorContext::new(error)
            .with_suggestion("The source repository publishes an invalid manifest; report it upstream or pin an earlier ref"),
        SkillsError::ArtifactNotFound { name, available, .. }
        | SkillsError::CollectionNotFound { name, available, .. } => {
            let suggestion = closest_match(name, available).map(|m| format!("Did you mean '{m}'?"));
            let details = format!("Available: {}", list_or_none(available));
            let ctx = ErrorContext::new(error).with_details(details);
            match suggestion {
                Some(s) => ctx.with_suggestion(s),
                None => ctx,
            }
        }
        SkillsError::IntegrityMismatch { .. } => ErrorContext::new(error).with_suggestion(
            "The cached snapshot changed on disk; delete it from the cache directory and run 'skills install' again",
        ),
        SkillsError::SourceNotFound { .. } => ErrorContext::new(error)
            .with_suggestion("Register the source first with 'skills add <source>'"),
        SkillsError::DuplicateSource { .. } => ErrorContext::new(error)
            .with_suggestion("Edit or remove the existing source in skills.json, or repeat it exactly"),
        SkillsError::GitNotFound => ErrorContext::new(error)
            .with_suggestion("Install git from https://git-scm.com/ and make sure it is on PATH"),
        SkillsError::GitCommandError { stderr, .. }
        | SkillsError::GitCheckoutFailed { reason: stderr, .. } => {
            let details = stderr.trim().to_string();
            ErrorContext::new(error).with_details(details)
        }
        SkillsError::LockfileVersion { .. } => ErrorContext::new(error)
            .with_suggestion("Upgrade skills-cli to read this lock file"),
        SkillsError::ConfigError { .. } | SkillsError::IoError(_) => ErrorContext::new(error),
    }
}
