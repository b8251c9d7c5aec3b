//! Filesystem access sandbox.
//!
//! Every path coming from a front-end is resolved here before the engine
//! touches it. The allow-list is built exactly once at startup and is
//! immutable afterwards; validation fails closed on any ambiguity
//! (unresolvable paths, symlinks escaping the list, sensitive names).

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::{Result, XlqError};
use crate::limits;

/// File base names that are never written, regardless of location.
const BLOCKED_NAMES: &[&str] = &[".git", ".env", "id_rsa", "id_ed25519"];

/// Glob patterns matched against the base name on write paths.
const BLOCKED_GLOBS: &[&str] = &["*.key", "*.pem", "*.p12", "*.pfx", "*.sqlite", "*.db"];

/// Directory components that make any write path sensitive.
const BLOCKED_DIRS: &[&str] = &[".git", "node_modules"];

/// An immutable, ordered set of canonical directories inside which the
/// engine may read and write. The working directory is always the first
/// entry.
#[derive(Debug, Clone)]
pub struct Sandbox {
    allowed: Vec<PathBuf>,
}

impl Sandbox {
    /// Build the allow-list from the working directory plus `extras`.
    ///
    /// Each entry is canonicalised (absolute, symlinks resolved) and must
    /// be an existing directory; the filesystem root is rejected as too
    /// broad. Duplicates are dropped, keeping insertion order. Any failure
    /// aborts construction so a sandbox is never partially configured.
    pub fn initialize<I, S>(extras: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let cwd = std::env::current_dir()
            .map_err(|e| XlqError::ResolutionFailure(format!("cannot determine working directory: {e}")))?;

        let mut allowed: Vec<PathBuf> = Vec::new();
        let mut add = |raw: &Path| -> Result<()> {
            let canonical = fs::canonicalize(raw).map_err(|e| {
                XlqError::ResolutionFailure(format!("{}: {e}", raw.display()))
            })?;
            if !canonical.is_dir() {
                return Err(XlqError::ResolutionFailure(format!(
                    "not a directory: {}",
                    canonical.display()
                )));
            }
            if canonical.parent().is_none() {
                return Err(XlqError::ResolutionFailure(
                    "refusing filesystem root as an allowed path".to_string(),
                ));
            }
            if !allowed.contains(&canonical) {
                allowed.push(canonical);
            }
            Ok(())
        };

        add(&cwd)?;
        for extra in extras {
            let trimmed = extra.as_ref().trim();
            if trimmed.is_empty() {
                continue;
            }
            add(Path::new(trimmed))?;
        }

        Ok(Sandbox { allowed })
    }

    /// Defensive copy of the allow-list, for diagnostics.
    pub fn allowed_paths(&self) -> Vec<PathBuf> {
        self.allowed.clone()
    }

    /// Resolve a path for reading: absolute, symlinks resolved, and inside
    /// the allow-list.
    pub fn validate_read(&self, requested: &str) -> Result<PathBuf> {
        if requested.trim().is_empty() {
            return Err(XlqError::ResolutionFailure("file path cannot be empty".to_string()));
        }
        let abs = make_absolute(Path::new(requested))?;
        let resolved = fs::canonicalize(&abs).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                XlqError::FileNotFound(requested.to_string())
            } else {
                XlqError::ResolutionFailure(format!("{requested}: {e}"))
            }
        })?;
        if self.contains(&resolved) {
            Ok(resolved)
        } else {
            Err(XlqError::PathOutsideAllowed(requested.to_string()))
        }
    }

    /// Validate a path for writing.
    ///
    /// Beyond the read checks this rejects sensitive names, honours the
    /// overwrite flag, and requires the canonical parent directory to
    /// exist, be writable, and lie inside the allow-list. For a new file
    /// the returned path is the absolute unresolved target; for an
    /// overwrite it is the resolved target.
    pub fn validate_write(&self, requested: &str, allow_overwrite: bool) -> Result<PathBuf> {
        if requested.trim().is_empty() {
            return Err(XlqError::ResolutionFailure("file path cannot be empty".to_string()));
        }
        if is_blocked_write_path(Path::new(requested)) {
            return Err(XlqError::WriteDeniedSensitive(requested.to_string()));
        }

        let mut target = make_absolute(Path::new(requested))?;
        if is_blocked_write_path(&target) {
            return Err(XlqError::WriteDeniedSensitive(target.display().to_string()));
        }

        match fs::symlink_metadata(&target) {
            Ok(_) => {
                if !allow_overwrite {
                    return Err(XlqError::FileExists(target.display().to_string()));
                }
                target = fs::canonicalize(&target).map_err(|e| {
                    XlqError::ResolutionFailure(format!("{requested}: {e}"))
                })?;
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(XlqError::ResolutionFailure(format!("{requested}: {e}")));
            }
        }

        let parent = target
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .ok_or_else(|| {
                XlqError::WriteDeniedUnwritable(format!("no parent directory for {requested}"))
            })?;

        let parent_meta = fs::metadata(parent).map_err(|_| {
            XlqError::WriteDeniedUnwritable(format!(
                "parent directory does not exist: {}",
                parent.display()
            ))
        })?;
        if !parent_meta.is_dir() {
            return Err(XlqError::WriteDeniedUnwritable(format!(
                "parent path is not a directory: {}",
                parent.display()
            )));
        }

        let real_parent = fs::canonicalize(parent).map_err(|e| {
            XlqError::ResolutionFailure(format!("{}: {e}", parent.display()))
        })?;
        if !self.contains(&real_parent) {
            return Err(XlqError::PathOutsideAllowed(requested.to_string()));
        }

        // only probed once the parent is known to be inside the allow-list
        probe_writable(parent, &target)?;

        Ok(target)
    }

    /// Size gate for write targets. Missing files pass (new-file path).
    pub fn check_size(&self, path: &Path, max: u64) -> Result<()> {
        match fs::metadata(path) {
            Ok(meta) => {
                if meta.len() > max {
                    Err(XlqError::FileTooLarge {
                        size: meta.len(),
                        limit: max,
                    })
                } else {
                    Ok(())
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(XlqError::ResolutionFailure(format!("{}: {e}", path.display()))),
        }
    }

    /// Convenience gate using the engine's write-size policy.
    pub fn check_write_size(&self, path: &Path) -> Result<()> {
        self.check_size(path, limits::MAX_WRITE_FILE_SIZE)
    }

    fn contains(&self, resolved: &Path) -> bool {
        self.allowed.iter().any(|base| resolved.starts_with(base))
    }
}

fn make_absolute(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        let cwd = std::env::current_dir()
            .map_err(|e| XlqError::ResolutionFailure(format!("cannot determine working directory: {e}")))?;
        Ok(cwd.join(path))
    }
}

/// Verify the parent directory accepts new files by creating and removing
/// a uniquely named probe with exclusive-create semantics.
fn probe_writable(parent: &Path, target: &Path) -> Result<()> {
    let base = target
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let probe = parent.join(format!(".xlq_write_test_{base}"));
    let result = fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&probe);
    match result {
        Ok(mut f) => {
            let _ = f.flush();
            drop(f);
            let _ = fs::remove_file(&probe);
            Ok(())
        }
        Err(_) => Err(XlqError::WriteDeniedUnwritable(format!(
            "parent directory not writable: {}",
            parent.display()
        ))),
    }
}

fn is_blocked_write_path(path: &Path) -> bool {
    let base = match path.file_name().and_then(|n| n.to_str()) {
        Some(b) => b,
        None => return false,
    };
    if BLOCKED_NAMES.contains(&base) {
        return true;
    }
    for pattern in BLOCKED_GLOBS {
        if let Ok(p) = glob::Pattern::new(pattern) {
            if p.matches(base) {
                return true;
            }
        }
    }
    path.components().any(|c| {
        c.as_os_str()
            .to_str()
            .map(|s| BLOCKED_DIRS.contains(&s))
            .unwrap_or(false)
    })
}
