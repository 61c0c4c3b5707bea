//! State and behaviour shared by [`File`] and [`Dir`] handles

use std::cell::RefCell;
use std::cmp::Ordering;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Weak;

use tracing::debug;

use crate::config::{IfExists, Settings};
use crate::dir::{Dir, DirInner};
use crate::entries::Entry;
use crate::error::{Error, Result};
use crate::ops;

/// Path, parent back-reference and settings of one handle.
///
/// The path sits in a `RefCell` so moves and renames are visible to every
/// clone of the handle.
pub struct Node {
    path: RefCell<PathBuf>,
    parent: RefCell<Weak<DirInner>>,
    settings: Settings,
}

impl Node {
    pub(crate) fn new(path: PathBuf, settings: Settings) -> Self {
        Self {
            path: RefCell::new(path),
            parent: RefCell::new(Weak::new()),
            settings,
        }
    }

    pub(crate) fn path(&self) -> PathBuf {
        self.path.borrow().clone()
    }

    pub(crate) fn set_path(&self, path: PathBuf) {
        *self.path.borrow_mut() = path;
    }

    pub(crate) fn name(&self) -> String {
        let path = self.path.borrow();
        match path.file_name() {
            Some(name) => name.to_string_lossy().into_owned(),
            None => path.display().to_string(),
        }
    }

    pub(crate) fn settings(&self) -> &Settings {
        &self.settings
    }

    pub(crate) fn set_parent(&self, dir: &Dir) {
        *self.parent.borrow_mut() = dir.downgrade();
    }

    /// The parent handle, if one is still alive and still contains this path.
    pub(crate) fn live_parent(&self) -> Option<Dir> {
        let parent = Dir::upgrade(&self.parent.borrow())?;
        let contained = self.path.borrow().parent() == Some(parent.path().as_path());
        contained.then_some(parent)
    }

    pub(crate) fn parent_dir(&self) -> Result<Dir> {
        if let Some(parent) = self.live_parent() {
            return Ok(parent);
        }
        let path = self.path();
        let parent_path = path.parent().unwrap_or(&path).to_path_buf();
        let parent = Dir::with_settings(parent_path, self.settings.clone())?;
        self.set_parent(&parent);
        Ok(parent)
    }

    /// Drop the back-reference if it no longer names the containing directory.
    fn forget_stale_parent(&self) {
        if self.live_parent().is_none() {
            *self.parent.borrow_mut() = Weak::new();
        }
    }

    /// Apply the collision policy to `dest` and return the path to use.
    pub(crate) fn resolve_destination(&self, dest: &Path) -> Result<PathBuf> {
        let dest = ops::normalize(dest)?;
        if dest == self.path() {
            return Err(Error::SamePath(dest));
        }
        if !ops::occupied(&dest) {
            return Ok(dest);
        }

        match self.settings.if_exists {
            IfExists::Fail => Err(Error::AlreadyExists {
                path: dest,
                policy: IfExists::Fail,
            }),
            IfExists::Allow => {
                ops::remove_any(&dest)?;
                Ok(dest)
            }
            IfExists::Trash => {
                ops::trash(&dest, &self.settings.trash_dir())?;
                Ok(dest)
            }
            IfExists::MakeCopy => Ok(ops::free_name(&dest)),
        }
    }
}

/// Common surface of [`File`](crate::File) and [`Dir`] handles.
pub trait PathHandle {
    #[doc(hidden)]
    fn node(&self) -> &Node;

    /// Make sure the object exists on disk.
    fn create(&self) -> Result<()>;

    /// Remove the object from disk. The handle stays usable and can be recreated.
    fn delete(&self) -> Result<()>;

    fn path(&self) -> PathBuf {
        self.node().path()
    }

    fn name(&self) -> String {
        self.node().name()
    }

    fn settings(&self) -> &Settings {
        self.node().settings()
    }

    fn exists(&self) -> bool {
        ops::occupied(&self.path())
    }

    fn metadata(&self) -> Result<fs::Metadata> {
        let path = self.path();
        fs::metadata(&path).map_err(|e| Error::io_at(path, e))
    }

    /// The containing directory. The root is its own parent.
    fn parent(&self) -> Result<Dir> {
        self.node().parent_dir()
    }
}

/// Ancestry order: `a < b` iff `a` lies strictly inside `b`.
pub(crate) fn ancestry(a: &Path, b: &Path) -> Option<Ordering> {
    if a == b {
        Some(Ordering::Equal)
    } else if a.starts_with(b) {
        Some(Ordering::Less)
    } else if b.starts_with(a) {
        Some(Ordering::Greater)
    } else {
        None
    }
}

/// Compare a handle path with a caller-supplied path.
pub(crate) fn same_path(handle: &Path, other: &Path) -> bool {
    match ops::normalize(other) {
        Ok(other) => handle == other,
        Err(_) => handle == other,
    }
}

/// Reject names that would escape the parent or address nothing.
pub(crate) fn validate_name(name: &str) -> Result<()> {
    if name.is_empty()
        || name == "."
        || name == ".."
        || name.ends_with('.')
        || name.chars().any(std::path::is_separator)
    {
        return Err(Error::InvalidName(name.to_string()));
    }
    Ok(())
}

/// Remove `entry` from its live parent's cache under `old_path`'s name.
pub(crate) fn detach<H: Entry>(entry: &H, old_path: &Path) {
    let Some(parent) = entry.node().live_parent() else {
        return;
    };
    if let Some(name) = old_path.file_name().and_then(|n| n.to_str()) {
        H::cache(&parent).borrow_mut().forget(name);
    }
}

/// Move `entry` on disk to `dest` and update the handle in place.
pub(crate) fn relocate<H: Entry>(entry: &H, dest: &Path) -> Result<PathBuf> {
    let node = entry.node();
    let from = node.path();
    let dest = node.resolve_destination(dest)?;
    ops::ensure_parent(&dest)?;
    ops::move_any(&from, &dest)?;

    detach(entry, &from);
    node.set_path(dest.clone());
    node.forget_stale_parent();
    entry.rebase();
    entry.invalidate();
    debug!(from = %from.display(), to = %dest.display(), "relocated");
    Ok(dest)
}

/// Rename `entry` within its directory.
pub(crate) fn rename<H: Entry>(entry: &H, name: &str) -> Result<()> {
    validate_name(name)?;
    let parent = entry.node().live_parent();
    let dest = entry.path().with_file_name(name);
    relocate(entry, &dest)?;
    if let Some(parent) = parent {
        entry.node().set_parent(&parent);
        H::cache(&parent)
            .borrow_mut()
            .store(entry.name(), entry.clone());
    }
    Ok(())
}

/// Copy `entry` on disk to `dest` and return a handle to the copy.
pub(crate) fn duplicate<H: Entry>(entry: &H, dest: &Path) -> Result<H> {
    let from = entry.path();
    let dest = entry.node().resolve_destination(dest)?;
    ops::ensure_parent(&dest)?;
    H::copy_on_disk(&from, &dest)?;
    debug!(from = %from.display(), to = %dest.display(), "copied");
    H::open(dest, entry.settings().clone())
}

/// Send `entry` to the trash directory. The handle keeps its old path.
pub(crate) fn send_to_trash<H: Entry>(entry: &H) -> Result<PathBuf> {
    let from = entry.path();
    let landed = ops::trash(&from, &entry.settings().trash_dir())?;
    detach(entry, &from);
    entry.invalidate();
    Ok(landed)
}

/// Identity (`==`) and ancestry (`<`) by path for a handle type.
macro_rules! impl_path_identity {
    ($ty:ty) => {
        impl $ty {
            /// True if both handles share the same underlying state.
            pub fn ptr_eq(&self, other: &Self) -> bool {
                std::rc::Rc::ptr_eq(&self.0, &other.0)
            }
        }

        impl PartialEq for $ty {
            fn eq(&self, other: &Self) -> bool {
                self.path() == other.path()
            }
        }

        impl PartialEq<std::path::Path> for $ty {
            fn eq(&self, other: &std::path::Path) -> bool {
                $crate::handle::same_path(&self.path(), other)
            }
        }

        impl PartialEq<std::path::PathBuf> for $ty {
            fn eq(&self, other: &std::path::PathBuf) -> bool {
                $crate::handle::same_path(&self.path(), other)
            }
        }

        impl PartialOrd for $ty {
            fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
                $crate::handle::ancestry(&self.path(), &other.path())
            }
        }

        impl std::fmt::Display for $ty {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.path().display())
            }
        }

        impl std::fmt::Debug for $ty {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.debug_tuple(stringify!($ty)).field(&self.path()).finish()
            }
        }
    };
}

pub(crate) use impl_path_identity;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ancestry_is_component_wise() {
        let root = Path::new("/data");
        assert_eq!(ancestry(Path::new("/data/a/b"), root), Some(Ordering::Less));
        assert_eq!(ancestry(root, Path::new("/data/a")), Some(Ordering::Greater));
        assert_eq!(ancestry(root, root), Some(Ordering::Equal));
        assert_eq!(ancestry(Path::new("/data2/x"), root), None);
    }

    #[test]
    fn test_validate_name() {
        assert!(validate_name("report.txt").is_ok());
        assert!(validate_name(".hidden").is_ok());
        for bad in ["", ".", "..", "a/b", "trailing."] {
            assert!(matches!(validate_name(bad), Err(Error::InvalidName(_))), "{bad}");
        }
    }
}
