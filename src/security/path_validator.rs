//! Path validation for collection roots and the store location.
//!
//! Roots in the tool table are usually given relative to the home directory.
//! They must stay inside it: traversal components are rejected before the
//! path is ever joined.

use anyhow::{anyhow, bail, Context, Result};
use std::path::{Component, Path, PathBuf};

/// Validate a relative path taken from configuration.
///
/// Rejects `..`, absolute components and null bytes.
pub fn validate_relative_path(path: &Path) -> Result<()> {
    for component in path.components() {
        match component {
            Component::ParentDir => {
                bail!("Path traversal attempt detected: path contains '..'");
            }
            Component::RootDir | Component::Prefix(_) => {
                bail!("Absolute paths not allowed here: {}", path.display());
            }
            _ => {}
        }
    }

    if path.to_string_lossy().contains('\0') {
        bail!("Path contains null bytes");
    }

    Ok(())
}

/// Resolve `path` beneath `base`, refusing anything that escapes it.
///
/// Existing paths are canonicalized so that symlinks pointing outside the
/// base are caught; missing paths are resolved component by component.
pub fn resolve_under(base: &Path, path: &Path) -> Result<PathBuf> {
    validate_relative_path(path)?;

    let full_path = base.join(path);
    if full_path.exists() && base.exists() {
        let base_canonical = base
            .canonicalize()
            .context("Failed to canonicalize base directory")?;
        let canonical = full_path
            .canonicalize()
            .context("Failed to canonicalize path")?;

        if !canonical.starts_with(&base_canonical) {
            return Err(anyhow!("Path escapes base directory: {:?}", canonical));
        }
        return Ok(full_path);
    }

    let mut resolved = base.to_path_buf();
    for component in path.components() {
        match component {
            Component::Normal(name) => resolved.push(name),
            Component::CurDir => {}
            _ => return Err(anyhow!("Invalid path component: {:?}", component)),
        }
    }
    Ok(resolved)
}

/// Validates that a path is safe to hold the artifact database.
pub fn validate_db_path(path: &Path) -> Result<()> {
    let path_str = path.to_string_lossy().to_lowercase();

    let dangerous_paths = [
        "/etc",
        "/sys",
        "/proc",
        "/dev",
        "/boot",
        "c:\\windows",
        "c:\\program files",
        "/system",
        "/usr",
    ];

    for dangerous in dangerous_paths {
        if path_str.starts_with(dangerous) {
            return Err(anyhow!(
                "Cannot write to system directory: {}",
                path.display()
            ));
        }
    }

    if path.is_dir() {
        bail!("Database path is a directory: {}", path.display());
    }

    Ok(())
}
