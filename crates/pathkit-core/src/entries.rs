//! Per-directory child caches and the listing synchronizer
//!
//! Each [`Dir`] keeps one [`EntryCache`] for files and one for directories.
//! A cache maps raw names to slots that are either still unmaterialized or
//! hold a live handle. Synchronizing reconciles the slots with a fresh
//! listing: existing slots survive, vanished names are dropped and new ones
//! arrive unmaterialized. Handles are only built on access.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, trace, warn};

use crate::config::Settings;
use crate::dir::Dir;
use crate::error::{Error, Result};
use crate::handle::PathHandle;
use crate::resolver::NameIndex;

mod sealed {
    pub trait Sealed {}
    impl Sealed for crate::File {}
    impl Sealed for crate::Dir {}
}

/// Which side of a directory listing a cache tracks
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Dir,
}

impl EntryKind {
    /// File identifiers lose their extension, directory identifiers do not.
    pub fn strips_extension(self) -> bool {
        self == EntryKind::File
    }

    fn admits(self, is_dir: bool) -> bool {
        is_dir == (self == EntryKind::Dir)
    }
}

/// A handle type that can live in a directory's child cache.
///
/// Implemented by [`File`](crate::File) and [`Dir`] only.
pub trait Entry: PathHandle + Clone + sealed::Sealed {
    #[doc(hidden)]
    const KIND: EntryKind;

    #[doc(hidden)]
    fn cache(dir: &Dir) -> &RefCell<EntryCache<Self>>;

    /// Build a handle for an existing or to-be-created path.
    #[doc(hidden)]
    fn open(path: PathBuf, settings: Settings) -> Result<Self>;

    /// Build a handle for a normalized path already present in a listing.
    /// Touches nothing on disk.
    #[doc(hidden)]
    fn attach(path: PathBuf, settings: Settings) -> Self;

    #[doc(hidden)]
    fn copy_on_disk(from: &Path, to: &Path) -> Result<()>;

    /// Refresh paths of materialized descendants after this handle moved.
    #[doc(hidden)]
    fn rebase(&self) {}

    /// Drop anything cached about the content at the old location.
    #[doc(hidden)]
    fn invalidate(&self) {}
}

pub(crate) enum Slot<H> {
    Unmaterialized,
    Materialized(H),
}

/// Raw-name slots plus the identifier index for one kind of child
pub struct EntryCache<H> {
    slots: BTreeMap<String, Slot<H>>,
    index: NameIndex,
    forbidden: bool,
    #[cfg(test)]
    listings: usize,
}

impl<H: Entry> EntryCache<H> {
    pub(crate) fn new() -> Self {
        Self {
            slots: BTreeMap::new(),
            index: NameIndex::new(H::KIND.strips_extension()),
            forbidden: false,
            #[cfg(test)]
            listings: 0,
        }
    }

    pub(crate) fn names(&self) -> Vec<String> {
        self.slots.keys().cloned().collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.slots.len()
    }

    pub(crate) fn is_forbidden(&self) -> bool {
        self.forbidden
    }

    pub(crate) fn index_mut(&mut self) -> &mut NameIndex {
        &mut self.index
    }

    /// Handle for `name` if one has already been materialized.
    pub(crate) fn materialized(&self, name: &str) -> Option<H> {
        match self.slots.get(name) {
            Some(Slot::Materialized(handle)) => Some(handle.clone()),
            _ => None,
        }
    }

    pub(crate) fn materialized_handles(&self) -> Vec<H> {
        self.slots
            .values()
            .filter_map(|slot| match slot {
                Slot::Materialized(handle) => Some(handle.clone()),
                Slot::Unmaterialized => None,
            })
            .collect()
    }

    /// Carry existing slots into a fresh listing and reindex.
    fn reconcile(&mut self, listing: Vec<String>, lazy: bool) {
        let mut previous = std::mem::take(&mut self.slots);
        self.slots = listing
            .into_iter()
            .map(|name| {
                let slot = previous.remove(&name).unwrap_or(Slot::Unmaterialized);
                (name, slot)
            })
            .collect();
        self.forbidden = false;
        trace!(dropped = previous.len(), kept = self.slots.len(), "reconciled listing");
        self.reindex(lazy);
    }

    /// Fold the outcome of a listing into the cache. A permission error only
    /// marks the cache forbidden; the previous slots stay.
    fn absorb(&mut self, listing: io::Result<Vec<String>>, lazy: bool) -> io::Result<()> {
        #[cfg(test)]
        {
            self.listings += 1;
        }
        match listing {
            Ok(names) => {
                self.reconcile(names, lazy);
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::PermissionDenied => {
                self.forbidden = true;
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Insert or replace a materialized handle.
    pub(crate) fn store(&mut self, name: String, handle: H) {
        let known = self.slots.contains_key(&name);
        self.slots.insert(name, Slot::Materialized(handle));
        if !known {
            self.reindex(true);
        }
    }

    pub(crate) fn forget(&mut self, name: &str) {
        if self.slots.remove(name).is_some() {
            self.reindex(true);
        }
    }

    pub(crate) fn clear(&mut self) {
        self.slots.clear();
        self.reindex(true);
    }

    fn reindex(&mut self, lazy: bool) {
        let names = self.names();
        self.index.acquire(names, lazy);
    }
}

/// Names in `path` that belong to `kind`. Directories are entries that are
/// directories once symlinks are followed; everything else counts as a file.
fn list_names(path: &Path, kind: EntryKind) -> io::Result<Vec<String>> {
    let mut names = Vec::new();
    for entry in fs::read_dir(path)? {
        let entry = entry?;
        let Ok(file_type) = entry.file_type() else {
            continue;
        };
        let is_dir = file_type.is_dir() || (file_type.is_symlink() && entry.path().is_dir());
        if !kind.admits(is_dir) {
            continue;
        }
        match entry.file_name().into_string() {
            Ok(name) => names.push(name),
            Err(raw) => warn!(dir = %path.display(), name = ?raw, "skipping non UTF-8 name"),
        }
    }
    Ok(names)
}

/// Reconcile the `H` cache of `dir` with the filesystem.
///
/// A listing refused for lack of permission marks the cache forbidden and
/// otherwise leaves it untouched.
pub(crate) fn synchronize<H: Entry>(dir: &Dir) -> Result<()> {
    let path = dir.path();
    let listing = list_names(&path, H::KIND);
    match &listing {
        Ok(names) => {
            debug!(dir = %path.display(), kind = ?H::KIND, count = names.len(), "synchronized")
        }
        Err(e) if e.kind() == io::ErrorKind::PermissionDenied => {
            warn!(dir = %path.display(), "listing forbidden")
        }
        Err(_) => {}
    }
    H::cache(dir)
        .borrow_mut()
        .absorb(listing, dir.settings().lazy_index)
        .map_err(|e| Error::io_at(path, e))
}

/// Materialize `name` if its slot is known, without touching the listing.
pub(crate) fn lookup<H: Entry>(dir: &Dir, name: &str) -> Result<Option<H>> {
    {
        let cache = H::cache(dir).borrow();
        match cache.slots.get(name) {
            None => return Ok(None),
            Some(Slot::Materialized(handle)) => return Ok(Some(handle.clone())),
            Some(Slot::Unmaterialized) => {}
        }
    }

    let path = dir.path().join(name);
    if fs::symlink_metadata(&path).is_err() {
        H::cache(dir).borrow_mut().forget(name);
        return Ok(None);
    }

    let handle = H::attach(path, dir.settings().clone());
    handle.node().set_parent(dir);
    H::cache(dir)
        .borrow_mut()
        .store(name.to_string(), handle.clone());
    trace!(dir = %dir.path().display(), name, "materialized");
    Ok(Some(handle))
}

/// Handle for the child `name`, resynchronizing once on a miss.
pub(crate) fn access<H: Entry>(dir: &Dir, name: &str) -> Result<H> {
    if let Some(handle) = lookup(dir, name)? {
        return Ok(handle);
    }
    synchronize::<H>(dir)?;
    access_synced(dir, name)
}

/// Handle for the child `name` in a cache that was just synchronized.
pub(crate) fn access_synced<H: Entry>(dir: &Dir, name: &str) -> Result<H> {
    lookup(dir, name)?.ok_or_else(|| missing::<H>(dir, name))
}

fn missing<H: Entry>(dir: &Dir, name: &str) -> Error {
    if H::cache(dir).borrow().is_forbidden() {
        Error::Forbidden(dir.path())
    } else {
        Error::not_found(dir.path(), name)
    }
}

/// Listings taken so far for the `H` cache of `dir`.
#[cfg(test)]
pub(crate) fn listings<H: Entry>(dir: &Dir) -> usize {
    H::cache(dir).borrow().listings
}
