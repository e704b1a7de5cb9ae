//! File system helpers with consistent error context.
//!
//! Writes go through a temporary file and a rename so readers never observe a
//! half-written lock or config file. Directory copies skip symlinks; snapshots
//! and installed artifacts only ever contain regular files and directories.

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

/// Creates `path` and all missing parents.
///
/// # Errors
///
/// Fails when the directory cannot be created or when `path` exists but is not
/// a directory.
pub fn ensure_dir(path: &Path) -> Result<()> {
    if !path.exists() {
        fs::create_dir_all(path).with_context(|| {
            let platform_help = if crate::utils::platform::is_windows() {
                "On Windows: Check that the path length is < 260 chars or that long path support is enabled"
            } else {
                "Check directory permissions and path validity"
            };

            format!("Failed to create directory: {}\n\n{}", path.display(), platform_help)
        })?;
    } else if !path.is_dir() {
        return Err(anyhow::anyhow!("Path exists but is not a directory: {}", path.display()));
    }
    Ok(())
}

/// Writes `content` to `path` atomically.
///
/// The bytes are written and synced to a sibling temporary file, which is then
/// renamed over the destination. Parent directories are created as needed.
///
/// # Errors
///
/// Returns an error if the temporary file cannot be created, written, synced or
/// renamed into place.
pub fn atomic_write(path: &Path, content: &[u8]) -> Result<()> {
    use std::io::Write;

    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    ensure_dir(parent)?;

    let mut temp = tempfile::NamedTempFile::new_in(parent)
        .with_context(|| format!("Failed to create temp file in: {}", parent.display()))?;
    temp.write_all(content)
        .with_context(|| format!("Failed to write temp file for: {}", path.display()))?;
    temp.as_file().sync_all().with_context(|| "Failed to sync file to disk")?;

    temp.persist(path)
        .map_err(|e| e.error)
        .with_context(|| format!("Failed to rename temp file to: {}", path.display()))?;

    Ok(())
}

/// Recursively copies `src` into `dst`, skipping entries whose file name matches `skip`.
///
/// The predicate is applied at every depth, so `|name| name == ".git"` also drops
/// nested submodule metadata.
///
/// # Errors
///
/// Fails on the first directory that cannot be read or file that cannot be copied.
pub fn copy_dir_filtered(src: &Path, dst: &Path, skip: &dyn Fn(&str) -> bool) -> Result<()> {
    ensure_dir(dst)?;

    for entry in
        fs::read_dir(src).with_context(|| format!("Failed to read directory: {}", src.display()))?
    {
        let entry = entry?;
        let name = entry.file_name();
        if skip(&name.to_string_lossy()) {
            continue;
        }

        let file_type = entry.file_type()?;
        let src_path = entry.path();
        let dst_path = dst.join(&name);

        if file_type.is_dir() {
            copy_dir_filtered(&src_path, &dst_path, skip)?;
        } else if file_type.is_file() {
            fs::copy(&src_path, &dst_path).with_context(|| {
                format!("Failed to copy file from {} to {}", src_path.display(), dst_path.display())
            })?;
        }
    }

    Ok(())
}

/// Removes a directory tree if it exists.
pub fn remove_dir_all(path: &Path) -> Result<()> {
    if path.exists() {
        fs::remove_dir_all(path)
            .with_context(|| format!("Failed to remove directory: {}", path.display()))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_ensure_dir() {
        let temp = tempdir().unwrap();
        let test_dir = temp.path().join("a").join("b");

        assert!(!test_dir.exists());
        ensure_dir(&test_dir).unwrap();
        assert!(test_dir.is_dir());

        // Second call is a no-op
        ensure_dir(&test_dir).unwrap();
    }

    #[test]
    fn test_ensure_dir_on_file() {
        let temp = tempdir().unwrap();
        let file_path = temp.path().join("file.txt");
        fs::write(&file_path, "content").unwrap();

        let result = ensure_dir(&file_path);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("not a directory"));
    }

    #[test]
    fn test_atomic_write_replaces_content() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("nested").join("lock.json");

        atomic_write(&path, b"first").unwrap();
        atomic_write(&path, b"second").unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "second");
        let leftovers: Vec<_> = fs::read_dir(path.parent().unwrap()).unwrap().collect();
        assert_eq!(leftovers.len(), 1);
    }

    #[test]
    fn test_copy_dir_filtered_skips_matching_names() {
        let temp = tempdir().unwrap();
        let src = temp.path().join("src");
        fs::create_dir_all(src.join(".git/objects")).unwrap();
        fs::create_dir_all(src.join("skills/pdf/.git")).unwrap();
        fs::write(src.join(".git/HEAD"), "ref").unwrap();
        fs::write(src.join("skills/pdf/SKILL.md"), "# pdf").unwrap();
        fs::write(src.join("skills/pdf/.git/config"), "x").unwrap();
        fs::write(src.join(".gitignore"), "target").unwrap();

        let dst = temp.path().join("dst");
        copy_dir_filtered(&src, &dst, &|name| name == ".git").unwrap();

        assert!(!dst.join(".git").exists());
        assert!(!dst.join("skills/pdf/.git").exists());
        assert!(dst.join("skills/pdf/SKILL.md").is_file());
        assert!(dst.join(".gitignore").is_file());
    }

    #[test]
    fn test_remove_dir_all_missing_is_ok() {
        let temp = tempdir().unwrap();
        remove_dir_all(&temp.path().join("missing")).unwrap();
    }
}
