//! Raw filesystem primitives used by the handles

use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use tracing::debug;
use walkdir::WalkDir;

use crate::error::{Error, Result};

/// Absolute, lexically normalized form of `path`. An empty path means the current directory.
pub fn normalize(path: &Path) -> io::Result<PathBuf> {
    let absolute = if path.as_os_str().is_empty() {
        std::env::current_dir()?
    } else {
        std::path::absolute(path)?
    };

    let mut normalized = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other),
        }
    }
    Ok(normalized)
}

/// True if anything (including a dangling symlink) occupies `path`.
pub fn occupied(path: &Path) -> bool {
    fs::symlink_metadata(path).is_ok()
}

pub fn ensure_dir(path: &Path) -> Result<()> {
    fs::create_dir_all(path).map_err(|e| Error::io_at(path, e))
}

pub fn ensure_parent(path: &Path) -> Result<()> {
    match path.parent() {
        Some(parent) => ensure_dir(parent),
        None => Ok(()),
    }
}

/// Create an empty file (and its ancestors) if nothing is there yet.
pub fn touch(path: &Path) -> Result<()> {
    ensure_parent(path)?;
    match fs::OpenOptions::new().append(true).create(true).open(path) {
        Ok(_) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::PermissionDenied && path.is_file() => Ok(()),
        Err(e) => Err(Error::io_at(path, e)),
    }
}

/// Remove a file, symlink or whole directory tree.
pub fn remove_any(path: &Path) -> Result<()> {
    let meta = fs::symlink_metadata(path).map_err(|e| Error::io_at(path, e))?;
    let removed = if meta.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    };
    removed.map_err(|e| Error::io_at(path, e))
}

/// Rename, falling back to copy-then-remove when the rename itself is refused
/// (typically because source and destination live on different devices).
pub fn move_any(from: &Path, to: &Path) -> Result<()> {
    match fs::rename(from, to) {
        Ok(()) => Ok(()),
        Err(rename_err) => {
            let meta = fs::symlink_metadata(from).map_err(|e| Error::io_at(from, e))?;
            debug!(from = %from.display(), to = %to.display(), error = %rename_err, "rename refused, copying instead");
            let copied = if meta.is_dir() {
                copy_tree(from, to)
            } else {
                fs::copy(from, to).map(|_| ()).map_err(|e| Error::io_at(to, e))
            };
            match copied {
                Ok(()) => remove_any(from),
                Err(_) => Err(Error::io_at(from, rename_err)),
            }
        }
    }
}

pub fn copy_file(from: &Path, to: &Path) -> Result<()> {
    ensure_parent(to)?;
    fs::copy(from, to)
        .map(|_| ())
        .map_err(|e| Error::io_at(to, e))
}

/// Recursively copy the directory `from` to `to`.
pub fn copy_tree(from: &Path, to: &Path) -> Result<()> {
    for entry in WalkDir::new(from) {
        let entry = entry.map_err(io::Error::from)?;
        let relative = entry.path().strip_prefix(from).unwrap_or(entry.path());
        let target = to.join(relative);
        if entry.file_type().is_dir() {
            ensure_dir(&target)?;
        } else {
            copy_file(entry.path(), &target)?;
        }
    }
    Ok(())
}

/// First of `name`, `name (1)`, `name (2)`, ... that is not occupied.
pub fn free_name(path: &Path) -> PathBuf {
    if !occupied(path) {
        return path.to_path_buf();
    }
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let extension = path
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();

    (1..)
        .map(|n| path.with_file_name(format!("{stem} ({n}){extension}")))
        .find(|candidate| !occupied(candidate))
        .unwrap_or_else(|| path.to_path_buf())
}

/// Move `path` into `trash_dir`, returning where it ended up.
pub fn trash(path: &Path, trash_dir: &Path) -> Result<PathBuf> {
    ensure_dir(trash_dir)?;
    let name = path
        .file_name()
        .ok_or_else(|| Error::InvalidName(path.display().to_string()))?;
    let target = free_name(&trash_dir.join(name));
    move_any(path, &target)?;
    debug!(from = %path.display(), to = %target.display(), "moved to trash");
    Ok(target)
}
