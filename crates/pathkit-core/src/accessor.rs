//! Views over a directory's files or subdirectories

use std::fs;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::vec;

use crate::dir::Dir;
use crate::entries::{self, Entry};
use crate::error::{Error, Result};
use crate::handle::PathHandle;
use crate::resolver::is_special;

/// Name-indexed access to one kind of child of a [`Dir`].
///
/// Every enumerating call resynchronizes with the filesystem first; `get`
/// only does so when the name is not cached yet.
pub struct Accessor<'a, H: Entry> {
    dir: &'a Dir,
    kind: PhantomData<H>,
}

impl<'a, H: Entry> Accessor<'a, H> {
    pub(crate) fn new(dir: &'a Dir) -> Self {
        Self {
            dir,
            kind: PhantomData,
        }
    }

    pub fn synchronize(&self) -> Result<()> {
        entries::synchronize::<H>(self.dir)
    }

    /// Current raw names, sorted.
    pub fn names(&self) -> Result<Vec<String>> {
        self.synchronize()?;
        Ok(H::cache(self.dir).borrow().names())
    }

    /// Names as of the last synchronization, without touching the disk.
    pub fn cached_names(&self) -> Vec<String> {
        H::cache(self.dir).borrow().names()
    }

    pub fn paths(&self) -> Result<Vec<PathBuf>> {
        let root = self.dir.path();
        Ok(self
            .names()?
            .into_iter()
            .map(|name| root.join(name))
            .collect())
    }

    pub fn len(&self) -> Result<usize> {
        self.synchronize()?;
        Ok(H::cache(self.dir).borrow().len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Whether the last listing was refused for lack of permission.
    pub fn is_forbidden(&self) -> bool {
        H::cache(self.dir).borrow().is_forbidden()
    }

    pub fn get(&self, name: &str) -> Result<H> {
        entries::access(self.dir, name)
    }

    /// Materialize every current child, one at a time.
    pub fn iter(&self) -> Result<Entries<'a, H>> {
        Ok(Entries {
            dir: self.dir,
            names: self.names()?.into_iter(),
            kind: PhantomData,
        })
    }

    /// True if `path` names one of the current children. Relative paths are
    /// taken relative to the directory; symlinks in the parent part are
    /// resolved before comparing.
    pub fn contains(&self, path: impl AsRef<Path>) -> Result<bool> {
        let own = self.dir.path();
        let path = crate::ops::normalize(&own.join(path))?;
        let Some(parent) = path.parent() else {
            return Ok(false);
        };
        if parent != own.as_path() && !same_location(parent, &own) {
            return Ok(false);
        }
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            return Ok(false);
        };
        Ok(self.names()?.iter().any(|candidate| candidate == name))
    }

    /// Delete the child `name` from disk.
    pub fn remove(&self, name: &str) -> Result<()> {
        self.get(name)?.delete()
    }

    /// Identifier-style access to the same children.
    pub fn by_identifier(&self) -> IdentAccessor<'a, H> {
        IdentAccessor {
            dir: self.dir,
            kind: PhantomData,
        }
    }
}

fn same_location(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// Iterator returned by [`Accessor::iter`]
pub struct Entries<'a, H: Entry> {
    dir: &'a Dir,
    names: vec::IntoIter<String>,
    kind: PhantomData<H>,
}

impl<H: Entry> Iterator for Entries<'_, H> {
    type Item = Result<H>;

    fn next(&mut self) -> Option<Self::Item> {
        let name = self.names.next()?;
        Some(entries::access(self.dir, &name))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.names.size_hint()
    }
}

/// Access to children through clean identifiers (`report_2024` for `Report 2024.csv`).
pub struct IdentAccessor<'a, H: Entry> {
    dir: &'a Dir,
    kind: PhantomData<H>,
}

impl<H: Entry> IdentAccessor<'_, H> {
    fn lookup(&self, identifier: &str) -> Option<Vec<String>> {
        H::cache(self.dir).borrow_mut().index_mut().lookup(identifier)
    }

    /// Resolve `identifier` to a child handle.
    ///
    /// Unknown identifiers trigger one resynchronization; if still unknown the
    /// identifier is tried verbatim as a raw name.
    pub fn get(&self, identifier: &str) -> Result<H> {
        if is_special(identifier) {
            return Err(Error::not_found(self.dir.path(), identifier));
        }

        let (names, synced) = match self.lookup(identifier) {
            Some(names) => (Some(names), false),
            None => {
                entries::synchronize::<H>(self.dir)?;
                (self.lookup(identifier), true)
            }
        };
        let access = |name: &str| {
            if synced {
                entries::access_synced::<H>(self.dir, name)
            } else {
                entries::access::<H>(self.dir, name)
            }
        };

        match names.as_deref() {
            None | Some([]) => access(identifier),
            Some([name]) => access(name),
            Some(candidates) => Err(Error::Ambiguous {
                identifier: identifier.to_string(),
                candidates: candidates.to_vec(),
            }),
        }
    }

    /// Identifiers that currently resolve to exactly one child.
    pub fn identifiers(&self) -> Result<Vec<String>> {
        entries::synchronize::<H>(self.dir)?;
        Ok(H::cache(self.dir).borrow_mut().index_mut().identifiers())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file::File;
    use tempfile::TempDir;

    #[test]
    fn test_unknown_identifier_lists_once() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("present.txt"), "").unwrap();
        let dir = Dir::new(tmp.path()).unwrap();
        let before = entries::listings::<File>(&dir);

        assert!(dir.f().get("absent").unwrap_err().is_not_found());
        assert_eq!(entries::listings::<File>(&dir), before + 1);

        fs::write(tmp.path().join("late.txt"), "").unwrap();
        assert_eq!(dir.f().get("late").unwrap().name(), "late.txt");
        assert_eq!(entries::listings::<File>(&dir), before + 2);
    }

    #[cfg(unix)]
    #[test]
    fn test_contains_through_symlinked_parent() {
        let tmp = TempDir::new().unwrap();
        let real = tmp.path().join("real");
        fs::create_dir(&real).unwrap();
        fs::write(real.join("x.txt"), "").unwrap();
        std::os::unix::fs::symlink(&real, tmp.path().join("alias")).unwrap();
        let dir = Dir::new(&real).unwrap();

        assert!(dir.files().contains(tmp.path().join("alias").join("x.txt")).unwrap());
        assert!(!dir.files().contains(tmp.path().join("alias").join("y.txt")).unwrap());
        assert!(!dir.files().contains(tmp.path().join("x.txt")).unwrap());
    }
}
