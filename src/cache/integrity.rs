//! Content fingerprints for artifact directories.
//!
//! A fingerprint covers every regular file below a directory, excluding anything
//! under a dot-prefixed path segment (`.git`, `.DS_Store`, ...). Files are fed to a
//! single SHA-256 in byte order of their `/`-separated relative path: first the path
//! bytes, then the file bytes. The result is rendered as `sha256:<lowercase hex>`.
//!
//! Because the path is hashed, renaming a file changes the fingerprint even when no
//! content changed. Timestamps and permissions are never hashed.

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::utils::normalize_path_for_storage;

pub const INTEGRITY_PREFIX: &str = "sha256:";

fn is_hidden(entry: &walkdir::DirEntry) -> bool {
    entry.depth() > 0 && entry.file_name().to_string_lossy().starts_with('.')
}

/// Regular files below `dir` with their normalized relative paths, sorted.
fn collect_files(dir: &Path) -> Result<Vec<(String, PathBuf)>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(dir).follow_links(false).into_iter().filter_entry(|e| !is_hidden(e)) {
        let entry = entry.with_context(|| format!("Failed to walk directory: {}", dir.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let rel = entry
            .path()
            .strip_prefix(dir)
            .with_context(|| format!("{} is outside {}", entry.path().display(), dir.display()))?;
        files.push((normalize_path_for_storage(rel), entry.path().to_path_buf()));
    }
    files.sort_by(|a, b| a.0.as_bytes().cmp(b.0.as_bytes()));
    Ok(files)
}

/// Computes the fingerprint of `dir`.
///
/// # Errors
///
/// Fails when `dir` does not exist or a file cannot be read.
pub fn compute_fingerprint(dir: &Path) -> Result<String> {
    if !dir.is_dir() {
        return Err(anyhow::anyhow!("Cannot fingerprint missing directory: {}", dir.display()));
    }

    let mut hasher = Sha256::new();
    let files = collect_files(dir)?;
    for (rel, path) in &files {
        hasher.update(rel.as_bytes());
        let mut file =
            File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
        io::copy(&mut file, &mut hasher)
            .with_context(|| format!("Failed to hash {}", path.display()))?;
    }

    tracing::trace!("Fingerprinted {} file(s) in {}", files.len(), dir.display());
    Ok(format!("{INTEGRITY_PREFIX}{}", hex::encode(hasher.finalize())))
}

/// Recomputes the fingerprint of `dir` and compares it with `expected`.
///
/// Returns the actual fingerprint on mismatch.
pub fn verify_fingerprint(dir: &Path, expected: &str) -> Result<std::result::Result<(), String>> {
    let actual = compute_fingerprint(dir)?;
    if actual == expected { Ok(Ok(())) } else { Ok(Err(actual)) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn tree(files: &[(&str, &str)]) -> TempDir {
        let temp = TempDir::new().unwrap();
        for (rel, content) in files {
            let path = temp.path().join(rel);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, content).unwrap();
        }
        temp
    }

    #[test]
    fn test_format_and_determinism() {
        let a = tree(&[("SKILL.md", "# pdf"), ("scripts/run.py", "print(1)")]);
        let b = tree(&[("scripts/run.py", "print(1)"), ("SKILL.md", "# pdf")]);

        let first = compute_fingerprint(a.path()).unwrap();
        assert!(first.starts_with(INTEGRITY_PREFIX));
        assert_eq!(first.len(), INTEGRITY_PREFIX.len() + 64);
        assert_eq!(first, compute_fingerprint(a.path()).unwrap());
        assert_eq!(first, compute_fingerprint(b.path()).unwrap());
    }

    #[test]
    fn test_rename_changes_fingerprint() {
        let a = tree(&[("SKILL.md", "same")]);
        let b = tree(&[("README.md", "same")]);
        assert_ne!(compute_fingerprint(a.path()).unwrap(), compute_fingerprint(b.path()).unwrap());
    }

    #[test]
    fn test_content_change_detected() {
        let temp = tree(&[("SKILL.md", "v1")]);
        let before = compute_fingerprint(temp.path()).unwrap();

        fs::write(temp.path().join("SKILL.md"), "v2").unwrap();
        match verify_fingerprint(temp.path(), &before).unwrap() {
            Err(actual) => assert_ne!(actual, before),
            Ok(()) => panic!("modification not detected"),
        }
    }

    #[test]
    fn test_hidden_entries_ignored() {
        let plain = tree(&[("SKILL.md", "x")]);
        let noisy = tree(&[("SKILL.md", "x"), (".git/HEAD", "ref"), ("sub/.DS_Store", "junk")]);
        fs::create_dir_all(noisy.path().join("empty-dir")).unwrap();

        assert_eq!(
            compute_fingerprint(plain.path()).unwrap(),
            compute_fingerprint(noisy.path()).unwrap()
        );
    }

    #[test]
    fn test_missing_directory_fails() {
        let temp = TempDir::new().unwrap();
        assert!(compute_fingerprint(&temp.path().join("absent")).is_err());
    }
}
