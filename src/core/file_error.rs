//! Structured file system errors.
//!
//! Captures what was being done to which file, and why, at the call site instead of
//! re-parsing io error strings later.

use std::path::{Path, PathBuf};
use thiserror::Error;

/// The kind of file system operation that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileOperation {
    Read,
    Write,
    CreateDir,
    Remove,
    Copy,
}

impl std::fmt::Display for FileOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Read => write!(f, "reading"),
            Self::Write => write!(f, "writing"),
            Self::CreateDir => write!(f, "creating directory"),
            Self::Remove => write!(f, "removing"),
            Self::Copy => write!(f, "copying"),
        }
    }
}

/// An io error annotated with the operation, path, purpose and caller.
#[derive(Error, Debug)]
#[error("Failed {operation} '{}' for {purpose} ({caller})", file_path.display())]
pub struct FileOperationError {
    pub operation: FileOperation,
    pub file_path: PathBuf,
    /// What the file was needed for, e.g. "marketplace manifest"
    pub purpose: String,
    /// Module or function that performed the operation
    pub caller: String,
    #[source]
    pub source: std::io::Error,
}

impl FileOperationError {
    /// Returns `true` when the underlying io error is `NotFound`.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.source.kind() == std::io::ErrorKind::NotFound
    }
}

/// Extension trait attaching [`FileOperationError`] context to io results.
///
/// ```rust,no_run
/// use skills_cli::core::file_error::{FileOperation, FileResultExt};
/// use std::path::Path;
///
/// let path = Path::new("skills.json");
/// let content = std::fs::read_to_string(path)
///     .with_file_context(FileOperation::Read, path, "project configuration", "manifest::load");
/// ```
pub trait FileResultExt<T> {
    fn with_file_context(
        self,
        operation: FileOperation,
        file_path: impl Into<PathBuf>,
        purpose: impl Into<String>,
        caller: impl Into<String>,
    ) -> Result<T, FileOperationError>;
}

impl<T> FileResultExt<T> for Result<T, std::io::Error> {
    fn with_file_context(
        self,
        operation: FileOperation,
        file_path: impl Into<PathBuf>,
        purpose: impl Into<String>,
        caller: impl Into<String>,
    ) -> Result<T, FileOperationError> {
        self.map_err(|source| FileOperationError {
            operation,
            file_path: file_path.into(),
            purpose: purpose.into(),
            caller: caller.into(),
            source,
        })
    }
}

/// Reads a UTF-8 file, mapping "does not exist" to `Ok(None)`.
///
/// Absence is a normal outcome for optional manifests and descriptors; every other
/// failure (permissions, invalid UTF-8, a directory in place of a file) is an error.
///
/// # Errors
///
/// Returns a [`FileOperationError`] for any io failure other than `NotFound`.
pub fn read_optional(
    path: &Path,
    purpose: &str,
    caller: &str,
) -> Result<Option<String>, FileOperationError> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e).with_file_context(FileOperation::Read, path, purpose, caller),
    }
}
