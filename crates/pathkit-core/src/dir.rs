//! Directory handles

use std::cell::RefCell;
use std::fs;
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::rc::{Rc, Weak};

use tracing::debug;
use walkdir::WalkDir;

use crate::accessor::{Accessor, IdentAccessor};
use crate::config::Settings;
use crate::entries::{self, Entry, EntryCache, EntryKind};
use crate::error::{Error, Result};
use crate::file::File;
use crate::format::compress_tree;
use crate::handle::{self, impl_path_identity, validate_name, Node, PathHandle};
use crate::ops;

pub(crate) struct DirInner {
    node: Node,
    files: RefCell<EntryCache<File>>,
    dirs: RefCell<EntryCache<Dir>>,
}

/// Handle to a directory that keeps a synchronized view of its children.
///
/// Clones share state: the path, the child caches and every materialized
/// child handle. Constructing a `Dir` creates the directory if needed.
#[derive(Clone)]
pub struct Dir(Rc<DirInner>);

impl_path_identity!(Dir);

/// A file or directory handle
#[derive(Clone, Debug, PartialEq)]
pub enum Entity {
    File(File),
    Dir(Dir),
}

impl Entity {
    /// Open whatever lives at `path`, picking the variant from the on-disk kind.
    pub fn open(path: impl AsRef<Path>, settings: Settings) -> Result<Self> {
        let path = ops::normalize(path.as_ref())?;
        let meta = fs::metadata(&path).map_err(|e| Error::io_at(&path, e))?;
        if meta.is_dir() {
            Dir::with_settings(path, settings).map(Entity::Dir)
        } else if meta.is_file() {
            File::with_settings(path, settings).map(Entity::File)
        } else {
            Err(Error::TypeMismatch(format!(
                "'{}' is neither a file nor a directory",
                path.display()
            )))
        }
    }

    pub fn path(&self) -> PathBuf {
        match self {
            Entity::File(file) => file.path(),
            Entity::Dir(dir) => dir.path(),
        }
    }

    pub fn name(&self) -> String {
        match self {
            Entity::File(file) => file.name(),
            Entity::Dir(dir) => dir.name(),
        }
    }

    pub fn as_file(&self) -> Option<&File> {
        match self {
            Entity::File(file) => Some(file),
            Entity::Dir(_) => None,
        }
    }

    pub fn as_dir(&self) -> Option<&Dir> {
        match self {
            Entity::Dir(dir) => Some(dir),
            Entity::File(_) => None,
        }
    }
}

impl From<File> for Entity {
    fn from(file: File) -> Self {
        Entity::File(file)
    }
}

impl From<Dir> for Entity {
    fn from(dir: Dir) -> Self {
        Entity::Dir(dir)
    }
}

/// A temporary directory removed when dropped.
pub struct ScopedDir {
    dir: Dir,
    _guard: tempfile::TempDir,
}

impl ScopedDir {
    pub fn dir(&self) -> &Dir {
        &self.dir
    }
}

impl Deref for ScopedDir {
    type Target = Dir;

    fn deref(&self) -> &Dir {
        &self.dir
    }
}

impl Dir {
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        Self::with_settings(path, Settings::default())
    }

    pub fn with_settings(path: impl AsRef<Path>, settings: Settings) -> Result<Self> {
        let path = ops::normalize(path.as_ref())?;
        let dir = Self::unlisted(path, settings);
        dir.create()?;
        dir.synchronize()?;
        Ok(dir)
    }

    fn unlisted(path: PathBuf, settings: Settings) -> Self {
        Dir(Rc::new(DirInner {
            node: Node::new(path, settings),
            files: RefCell::new(EntryCache::new()),
            dirs: RefCell::new(EntryCache::new()),
        }))
    }

    pub fn from_cwd() -> Result<Self> {
        Self::new(std::env::current_dir()?)
    }

    pub fn from_home() -> Result<Self> {
        let home = dirs::home_dir()
            .ok_or_else(|| Error::Unsupported("no home directory on this platform".into()))?;
        Self::new(home)
    }

    /// Per-user application data directory: `<data dir>[/author][/app][/version]`.
    pub fn from_appdata(
        app_name: Option<&str>,
        app_author: Option<&str>,
        version: Option<&str>,
    ) -> Result<Self> {
        let mut path = dirs::data_dir()
            .ok_or_else(|| Error::Unsupported("no data directory on this platform".into()))?;
        for segment in [app_author, app_name, version].into_iter().flatten() {
            validate_name(segment)?;
            path.push(segment);
        }
        Self::new(path)
    }

    /// A fresh temporary directory, removed with everything in it on drop.
    pub fn from_temp(settings: Settings) -> Result<ScopedDir> {
        let guard = tempfile::Builder::new().prefix("pathkit-").tempdir()?;
        let dir = Self::with_settings(guard.path(), settings)?;
        Ok(ScopedDir { dir, _guard: guard })
    }

    pub(crate) fn downgrade(&self) -> Weak<DirInner> {
        Rc::downgrade(&self.0)
    }

    pub(crate) fn upgrade(weak: &Weak<DirInner>) -> Option<Self> {
        weak.upgrade().map(Dir)
    }

    pub(crate) fn file_cache(&self) -> &RefCell<EntryCache<File>> {
        &self.0.files
    }

    pub(crate) fn dir_cache(&self) -> &RefCell<EntryCache<Dir>> {
        &self.0.dirs
    }

    pub fn files(&self) -> Accessor<'_, File> {
        Accessor::new(self)
    }

    pub fn dirs(&self) -> Accessor<'_, Dir> {
        Accessor::new(self)
    }

    /// Files by clean identifier (extension stripped).
    pub fn f(&self) -> IdentAccessor<'_, File> {
        self.files().by_identifier()
    }

    /// Subdirectories by clean identifier.
    pub fn d(&self) -> IdentAccessor<'_, Dir> {
        self.dirs().by_identifier()
    }

    /// Resynchronize both caches.
    pub fn synchronize(&self) -> Result<()> {
        entries::synchronize::<File>(self)?;
        entries::synchronize::<Dir>(self)
    }

    pub fn len(&self) -> Result<usize> {
        Ok(self.files().len()? + self.dirs().len()?)
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Every child, subdirectories first.
    pub fn iter(&self) -> Result<impl Iterator<Item = Result<Entity>> + '_> {
        let dirs = self.dirs().iter()?.map(|dir| dir.map(Entity::Dir));
        let files = self.files().iter()?.map(|file| file.map(Entity::File));
        Ok(dirs.chain(files))
    }

    pub fn contains(&self, path: impl AsRef<Path>) -> Result<bool> {
        let path = path.as_ref();
        Ok(self.files().contains(path)? || self.dirs().contains(path)?)
    }

    /// The child `name`, whichever kind it is.
    pub fn get(&self, name: &str) -> Result<Entity> {
        match self.dirs().get(name) {
            Ok(dir) => Ok(Entity::Dir(dir)),
            Err(e) if e.is_not_found() => self.files().get(name).map(Entity::File),
            Err(e) => Err(e),
        }
    }

    /// Create (if needed) and register the file `name[.extension]`.
    pub fn new_file(&self, name: &str, extension: Option<&str>) -> Result<File> {
        let name = match extension {
            Some(ext) => format!("{name}.{}", ext.trim_start_matches('.')),
            None => name.to_string(),
        };
        self.adopt(name)
    }

    /// Create (if needed) and register the subdirectory `name`.
    pub fn new_dir(&self, name: &str) -> Result<Dir> {
        self.adopt(name.to_string())
    }

    pub fn make_file(&self, name: &str, extension: Option<&str>) -> Result<()> {
        self.new_file(name, extension).map(drop)
    }

    pub fn make_dir(&self, name: &str) -> Result<()> {
        self.new_dir(name).map(drop)
    }

    fn adopt<H: Entry>(&self, name: String) -> Result<H> {
        validate_name(&name)?;
        let existing = H::cache(self).borrow().materialized(&name);
        if let Some(handle) = existing {
            handle.create()?;
            return Ok(handle);
        }

        let handle = H::open(self.path().join(&name), self.settings().clone())?;
        handle.node().set_parent(self);
        H::cache(self).borrow_mut().store(name, handle.clone());
        Ok(handle)
    }

    /// Subdirectory at a nested relative path, creating intermediate levels.
    pub fn join_dir(&self, relative: impl AsRef<Path>) -> Result<Dir> {
        let mut current = self.clone();
        for segment in segments(relative.as_ref())? {
            current = current.new_dir(&segment)?;
        }
        Ok(current)
    }

    /// File at a nested relative path, creating intermediate directories.
    pub fn join_file(&self, relative: impl AsRef<Path>) -> Result<File> {
        let mut segments = segments(relative.as_ref())?;
        let name = segments
            .pop()
            .ok_or_else(|| Error::InvalidName(relative.as_ref().display().to_string()))?;
        let mut current = self.clone();
        for segment in segments {
            current = current.new_dir(&segment)?;
        }
        current.new_file(&name, None)
    }

    /// The directory `levels` steps up. The root is its own ancestor.
    pub fn ancestor(&self, levels: usize) -> Result<Dir> {
        let mut current = self.clone();
        for _ in 0..levels {
            current = current.parent()?;
        }
        Ok(current)
    }

    /// Place `entity` into this directory, copying it when `preserve_original`
    /// is set and moving it otherwise. Returns the handle now living here.
    pub fn bind(&self, entity: impl Into<Entity>, preserve_original: bool) -> Result<Entity> {
        match entity.into() {
            Entity::File(file) => self.bind_entry(file, preserve_original).map(Entity::File),
            Entity::Dir(dir) => self.bind_entry(dir, preserve_original).map(Entity::Dir),
        }
    }

    pub(crate) fn bind_entry<H: Entry>(&self, entry: H, preserve_original: bool) -> Result<H> {
        check_kind::<H>(&entry.path())?;
        let here = self.path();
        if H::KIND == EntryKind::Dir && here.starts_with(entry.path()) {
            return Err(Error::Unsupported(format!(
                "cannot place '{}' inside itself",
                entry.path().display()
            )));
        }

        let target = here.join(entry.name());
        let bound = if entry.path().parent() == Some(here.as_path()) {
            entry
        } else if preserve_original {
            handle::duplicate(&entry, &target)?
        } else {
            handle::relocate(&entry, &target)?;
            entry
        };

        bound.node().set_parent(self);
        H::cache(self)
            .borrow_mut()
            .store(bound.name(), bound.clone());
        debug!(dir = %here.display(), name = %bound.name(), preserve_original, "bound");
        Ok(bound)
    }

    pub fn rename(&self, name: &str) -> Result<()> {
        handle::rename(self, name)
    }

    /// Copy beside this directory under `name`.
    pub fn new_rename(&self, name: &str) -> Result<Dir> {
        validate_name(name)?;
        self.new_copy(self.path().with_file_name(name))
    }

    pub fn move_path(&self, path: impl AsRef<Path>) -> Result<()> {
        handle::relocate(self, path.as_ref()).map(drop)
    }

    pub fn move_to(&self, dir: &Dir) -> Result<()> {
        dir.bind_entry(self.clone(), false).map(drop)
    }

    pub fn copy(&self, path: impl AsRef<Path>) -> Result<()> {
        self.new_copy(path).map(drop)
    }

    pub fn new_copy(&self, path: impl AsRef<Path>) -> Result<Dir> {
        handle::duplicate(self, path.as_ref())
    }

    pub fn copy_to(&self, dir: &Dir) -> Result<()> {
        self.new_copy_to(dir).map(drop)
    }

    pub fn new_copy_to(&self, dir: &Dir) -> Result<Dir> {
        dir.bind_entry(self.clone(), true)
    }

    /// Move the whole tree into the trash directory.
    pub fn trash(&self) -> Result<PathBuf> {
        let landed = handle::send_to_trash(self)?;
        self.forget_children();
        Ok(landed)
    }

    /// Delete every child, keeping the directory itself.
    ///
    /// Materialized children are deleted through their handles; the rest are
    /// removed by name, so symlinks are never followed.
    pub fn clear(&self) -> Result<()> {
        let dirs = self.dir_cache().borrow().materialized_handles();
        for dir in dirs {
            dir.delete()?;
        }
        let files = self.file_cache().borrow().materialized_handles();
        for file in files {
            file.delete()?;
        }

        self.synchronize()?;
        let mut names = self.dir_cache().borrow().names();
        names.extend(self.file_cache().borrow().names());
        let root = self.path();
        for name in names {
            ops::remove_any(&root.join(name))?;
        }
        debug!(dir = %root.display(), "cleared");
        self.synchronize()
    }

    /// Total size in bytes of every file below this directory.
    pub fn size(&self) -> Result<u64> {
        let mut total = 0;
        for entry in WalkDir::new(self.path()) {
            let entry = entry.map_err(std::io::Error::from)?;
            if entry.file_type().is_file() {
                total += entry.metadata().map_err(std::io::Error::from)?.len();
            }
        }
        Ok(total)
    }

    /// Zip this directory. Defaults to `<parent>/<name>.zip`.
    pub fn compress(&self, dest: Option<&Path>) -> Result<File> {
        let archive = match dest {
            Some(path) => File::with_settings(path, self.settings().clone())?,
            None => self.parent()?.new_file(&self.name(), Some("zip"))?,
        };
        compress_tree(&self.path(), &archive.path())?;
        archive.invalidate();
        debug!(dir = %self.path().display(), archive = %archive.path().display(), "compressed");
        Ok(archive)
    }

    /// Create a symlink in this directory pointing at `target`, named after the
    /// target unless `name` is given.
    pub fn symlink_to(&self, target: impl AsRef<Path>, name: Option<&str>) -> Result<PathBuf> {
        let target = ops::normalize(target.as_ref())?;
        let name = match name {
            Some(name) => name.to_string(),
            None => target
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .ok_or_else(|| Error::InvalidName(target.display().to_string()))?,
        };
        validate_name(&name)?;
        let link = self.path().join(name);
        make_symlink(&target, &link).map_err(|e| Error::io_at(&link, e))?;
        Ok(link)
    }

    fn forget_children(&self) {
        self.0.files.borrow_mut().clear();
        self.0.dirs.borrow_mut().clear();
    }

    /// Re-path materialized descendants below the current path.
    fn rebase_children(&self) {
        let here = self.path();
        for file in self.0.files.borrow().materialized_handles() {
            file.node().set_path(here.join(file.name()));
        }
        for dir in self.0.dirs.borrow().materialized_handles() {
            dir.node().set_path(here.join(dir.name()));
            dir.rebase_children();
        }
    }
}

impl PathHandle for Dir {
    fn node(&self) -> &Node {
        &self.0.node
    }

    fn create(&self) -> Result<()> {
        ops::ensure_dir(&self.path())
    }

    fn delete(&self) -> Result<()> {
        let path = self.path();
        match fs::remove_dir_all(&path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(Error::io_at(path, e)),
        }
        handle::detach(self, &path);
        self.forget_children();
        debug!(dir = %path.display(), "deleted");
        Ok(())
    }
}

impl Entry for Dir {
    const KIND: EntryKind = EntryKind::Dir;

    fn cache(dir: &Dir) -> &RefCell<EntryCache<Self>> {
        dir.dir_cache()
    }

    fn open(path: PathBuf, settings: Settings) -> Result<Self> {
        Self::with_settings(path, settings)
    }

    fn attach(path: PathBuf, settings: Settings) -> Self {
        Self::unlisted(path, settings)
    }

    fn copy_on_disk(from: &Path, to: &Path) -> Result<()> {
        ops::copy_tree(from, to)
    }

    fn rebase(&self) {
        self.rebase_children();
    }
}

/// Normal components of a relative path.
fn segments(relative: &Path) -> Result<Vec<String>> {
    relative
        .components()
        .map(|component| match component {
            std::path::Component::Normal(segment) => segment
                .to_str()
                .map(str::to_owned)
                .ok_or_else(|| Error::InvalidName(relative.display().to_string())),
            _ => Err(Error::InvalidName(relative.display().to_string())),
        })
        .collect()
}

/// The on-disk kind at `path` must agree with `H`.
fn check_kind<H: Entry>(path: &Path) -> Result<()> {
    let meta = fs::metadata(path).map_err(|e| Error::io_at(path, e))?;
    let agrees = match H::KIND {
        EntryKind::Dir => meta.is_dir(),
        EntryKind::File => meta.is_file(),
    };
    if agrees {
        return Ok(());
    }
    let found = if meta.is_dir() {
        "a directory"
    } else if meta.is_file() {
        "a file"
    } else {
        "neither a file nor a directory"
    };
    Err(Error::TypeMismatch(format!(
        "expected {:?} at '{}', found {found}",
        H::KIND,
        path.display()
    )))
}

#[cfg(unix)]
fn make_symlink(target: &Path, link: &Path) -> std::io::Result<()> {
    std::os::unix::fs::symlink(target, link)
}

#[cfg(windows)]
fn make_symlink(target: &Path, link: &Path) -> std::io::Result<()> {
    if target.is_dir() {
        std::os::windows::fs::symlink_dir(target, link)
    } else {
        std::os::windows::fs::symlink_file(target, link)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_new_file_registers_without_resync() {
        let tmp = TempDir::new().unwrap();
        let dir = Dir::new(tmp.path()).unwrap();

        let file = dir.new_file("notes", Some("txt")).unwrap();
        assert_eq!(dir.files().cached_names(), vec!["notes.txt".to_string()]);

        let again = dir.new_file("notes", Some(".txt")).unwrap();
        assert!(file.ptr_eq(&again));
    }

    #[test]
    fn test_new_file_rejects_separators() {
        let tmp = TempDir::new().unwrap();
        let dir = Dir::new(tmp.path()).unwrap();
        assert!(matches!(dir.new_file("a/b", None), Err(Error::InvalidName(_))));
        assert!(matches!(dir.new_dir(".."), Err(Error::InvalidName(_))));
    }

    #[test]
    fn test_join_file_creates_levels() {
        let tmp = TempDir::new().unwrap();
        let dir = Dir::new(tmp.path()).unwrap();
        let file = dir.join_file("a/b/c.txt").unwrap();
        assert_eq!(file.path(), tmp.path().join("a").join("b").join("c.txt"));
        assert!(file.path().is_file());
        assert_eq!(file.parent().unwrap().name(), "b");
    }

    #[test]
    fn test_root_is_own_ancestor() {
        let root = Dir::unlisted(PathBuf::from("/"), Settings::default());
        assert_eq!(root.ancestor(3).unwrap().path(), PathBuf::from("/"));
    }

    #[test]
    fn test_entity_open_picks_kind() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("x.txt"), "x").unwrap();
        let entity = Entity::open(tmp.path().join("x.txt"), Settings::default()).unwrap();
        assert!(entity.as_file().is_some());
        let entity = Entity::open(tmp.path(), Settings::default()).unwrap();
        assert!(entity.as_dir().is_some());
    }
}
