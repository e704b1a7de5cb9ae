//! Platform-specific helpers.

use std::path::Path;

/// Returns `true` when compiled for Windows.
#[must_use]
pub const fn is_windows() -> bool {
    cfg!(windows)
}

/// Name of the git executable to spawn.
#[must_use]
pub const fn get_git_command() -> &'static str {
    if is_windows() {
        "git.exe"
    } else {
        "git"
    }
}

/// Renders a path with forward slashes regardless of platform.
///
/// Used for every path that is persisted (lock entries) or hashed (fingerprints), so
/// the same tree produces the same bytes on every operating system.
///
/// # Examples
///
/// ```rust
/// use skills_cli::utils::normalize_path_for_storage;
/// use std::path::Path;
///
/// assert_eq!(normalize_path_for_storage(Path::new("skills/pdf")), "skills/pdf");
/// assert_eq!(normalize_path_for_storage("skills\\pdf"), "skills/pdf");
/// ```
pub fn normalize_path_for_storage<P: AsRef<Path>>(path: P) -> String {
    let path_str = path.as_ref().to_string_lossy();

    let cleaned = if let Some(stripped) = path_str.strip_prefix(r"\\?\UNC\") {
        format!("//{stripped}")
    } else if let Some(stripped) = path_str.strip_prefix(r"\\?\") {
        stripped.to_string()
    } else {
        path_str.to_string()
    };

    cleaned.replace('\\', "/")
}

/// Reduces an arbitrary string to a single safe path component.
///
/// Characters outside `[A-Za-z0-9._-]` become `_`, and components that would be
/// interpreted as `.` or `..` are prefixed with `_`.
///
/// ```rust
/// use skills_cli::utils::sanitize_component;
///
/// assert_eq!(sanitize_component("github.com:22"), "github.com_22");
/// assert_eq!(sanitize_component(".."), "_..");
/// ```
#[must_use]
pub fn sanitize_component(value: &str) -> String {
    let cleaned: String = value
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();

    if cleaned.is_empty() || cleaned.chars().all(|c| c == '.') {
        format!("_{cleaned}")
    } else {
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_path_for_storage_strips_prefixes() {
        assert_eq!(normalize_path_for_storage(r"\\?\C:\repo\skills"), "C:/repo/skills");
        assert_eq!(normalize_path_for_storage(r"\\?\UNC\server\share"), "//server/share");
    }

    #[test]
    fn test_sanitize_component() {
        assert_eq!(sanitize_component("owner"), "owner");
        assert_eq!(sanitize_component("my repo"), "my_repo");
        assert_eq!(sanitize_component(""), "_");
        assert_eq!(sanitize_component("."), "_.");
    }
}
