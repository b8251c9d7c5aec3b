//! Relative-path anchoring for file arguments.
//!
//! With `--basepath` (or `XLQ_BASEPATH`) set, relative file arguments are
//! resolved against it, and anything that climbs back out of the base via
//! `..` is rejected before the engine's sandbox ever sees it.

use std::path::{Component, Path, PathBuf};

use anyhow::{bail, Result};

/// Lexically normalise a path: resolve `.` and `..` components without
/// touching the filesystem.
fn lexical_clean(path: &Path) -> PathBuf {
    let mut cleaned = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !cleaned.pop() {
                    cleaned.push(Component::ParentDir);
                }
            }
            other => cleaned.push(other),
        }
    }
    cleaned
}

/// Resolve a file argument against an optional base directory.
///
/// Absolute paths and the no-basepath case pass through unchanged. A
/// relative path is joined to the base; if the joined path escapes the
/// base the resolution is denied.
pub fn resolve_file_path(basepath: Option<&str>, file: &str) -> Result<String> {
    let Some(base) = basepath.filter(|b| !b.is_empty()) else {
        return Ok(file.to_string());
    };
    if Path::new(file).is_absolute() {
        return Ok(file.to_string());
    }

    let clean_base = lexical_clean(Path::new(base));
    let resolved = lexical_clean(&Path::new(base).join(file));
    if !resolved.starts_with(&clean_base) {
        bail!("path traversal denied: {file:?} escapes basepath {base:?}");
    }
    Ok(resolved.to_string_lossy().into_owned())
}

/// The effective basepath: the flag wins, the environment fills in.
pub fn effective_basepath(flag: Option<&str>) -> Option<String> {
    match flag {
        Some(b) if !b.is_empty() => Some(b.to_string()),
        _ => std::env::var("XLQ_BASEPATH").ok().filter(|s| !s.is_empty()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passes_through_without_basepath() {
        assert_eq!(resolve_file_path(None, "data.xlsx").unwrap(), "data.xlsx");
        assert_eq!(resolve_file_path(Some(""), "data.xlsx").unwrap(), "data.xlsx");
    }

    #[test]
    fn absolute_paths_ignore_basepath() {
        assert_eq!(
            resolve_file_path(Some("/srv/sheets"), "/tmp/x.xlsx").unwrap(),
            "/tmp/x.xlsx"
        );
    }

    #[test]
    fn joins_relative_paths() {
        assert_eq!(
            resolve_file_path(Some("/srv/sheets"), "q1/data.xlsx").unwrap(),
            "/srv/sheets/q1/data.xlsx"
        );
    }

    #[test]
    fn normalises_inner_dot_segments() {
        assert_eq!(
            resolve_file_path(Some("/srv/sheets"), "./q1/../q2/data.xlsx").unwrap(),
            "/srv/sheets/q2/data.xlsx"
        );
    }

    #[test]
    fn rejects_traversal_out_of_base() {
        assert!(resolve_file_path(Some("/srv/sheets"), "../secrets.xlsx").is_err());
        assert!(resolve_file_path(Some("/srv/sheets"), "a/../../secrets.xlsx").is_err());
    }

    #[test]
    fn lexical_clean_handles_leading_parents() {
        assert_eq!(lexical_clean(Path::new("../a/b")), PathBuf::from("../a/b"));
        assert_eq!(lexical_clean(Path::new("/a/./b/../c")), PathBuf::from("/a/c"));
    }
}
