//! File handles

use std::cell::RefCell;
use std::cmp::Ordering;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::sync::Arc;
use std::time::SystemTime;

use chrono::{DateTime, Local};
use tracing::{debug, trace};

use crate::config::Settings;
use crate::dir::Dir;
use crate::entries::{Entry, EntryCache, EntryKind};
use crate::error::{Error, Result};
use crate::format::{Content, Format};
use crate::handle::{self, ancestry, impl_path_identity, validate_name, Node, PathHandle};
use crate::ops;

struct Decoded {
    modified: SystemTime,
    content: Content,
}

pub(crate) struct FileInner {
    node: Node,
    decoded: RefCell<Option<Decoded>>,
}

/// Handle to a regular file.
///
/// Content goes through the [`Format`] registered for the file's extension.
/// Decoded content is cached until the file's modification time changes.
#[derive(Clone)]
pub struct File(Rc<FileInner>);

impl_path_identity!(File);

impl PartialEq<Dir> for File {
    fn eq(&self, other: &Dir) -> bool {
        self.path() == other.path()
    }
}

impl PartialEq<File> for Dir {
    fn eq(&self, other: &File) -> bool {
        self.path() == other.path()
    }
}

impl PartialOrd<Dir> for File {
    fn partial_cmp(&self, other: &Dir) -> Option<Ordering> {
        ancestry(&self.path(), &other.path())
    }
}

impl PartialOrd<File> for Dir {
    fn partial_cmp(&self, other: &File) -> Option<Ordering> {
        ancestry(&self.path(), &other.path())
    }
}

impl File {
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        Self::with_settings(path, Settings::default())
    }

    /// Open `path`, creating an empty file (and missing ancestors) if needed.
    pub fn with_settings(path: impl AsRef<Path>, settings: Settings) -> Result<Self> {
        let path = ops::normalize(path.as_ref())?;
        ops::touch(&path)?;
        Ok(Self::unlisted(path, settings))
    }

    fn unlisted(path: PathBuf, settings: Settings) -> Self {
        File(Rc::new(FileInner {
            node: Node::new(path, settings),
            decoded: RefCell::new(None),
        }))
    }

    /// Name without the final extension.
    pub fn stem(&self) -> String {
        self.path()
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Lower-cased final extension, `None` for names without one (dotfiles included).
    pub fn extension(&self) -> Option<String> {
        self.path()
            .extension()
            .map(|ext| ext.to_string_lossy().to_lowercase())
            .filter(|ext| !ext.is_empty())
    }

    pub fn format(&self) -> Arc<dyn Format> {
        self.settings().formats.resolve(self.extension().as_deref())
    }

    /// Decoded content, served from the cache while the mtime is unchanged.
    pub fn read(&self) -> Result<Content> {
        let path = self.path();
        let modified = fs::metadata(&path)
            .and_then(|meta| meta.modified())
            .map_err(|e| Error::io_at(&path, e))?;

        if !self.settings().force_read {
            if let Some(decoded) = self.0.decoded.borrow().as_ref() {
                if decoded.modified == modified {
                    trace!(file = %path.display(), "content cache hit");
                    return Ok(decoded.content.clone());
                }
            }
        }

        let content = self.format().read(&path)?;
        *self.0.decoded.borrow_mut() = Some(Decoded {
            modified,
            content: content.clone(),
        });
        Ok(content)
    }

    pub fn content(&self) -> Result<Content> {
        self.read()
    }

    /// Overwrite the file with `content`.
    pub fn write(&self, content: impl Into<Content>) -> Result<()> {
        let path = self.path();
        ops::ensure_parent(&path)?;
        self.format().write(&path, &content.into())?;
        self.invalidate();
        Ok(())
    }

    /// Append `text` to a textual file.
    pub fn append(&self, text: &str) -> Result<()> {
        let format = self.format();
        if !format.is_textual() {
            return Err(Error::Unsupported(format!(
                "cannot append to '{}' ({} format)",
                self.name(),
                format.name()
            )));
        }
        format.append(&self.path(), text)?;
        self.invalidate();
        Ok(())
    }

    pub fn lines(&self) -> Result<Vec<String>> {
        let content = self.read()?;
        let text = content.as_text().ok_or_else(|| {
            Error::Unsupported(format!("'{}' has no line-oriented content", self.name()))
        })?;
        if text.is_empty() {
            return Ok(Vec::new());
        }
        Ok(text.split('\n').map(str::to_owned).collect())
    }

    pub fn line_count(&self) -> Result<usize> {
        Ok(self.lines()?.len())
    }

    pub fn line(&self, index: usize) -> Result<String> {
        let lines = self.lines()?;
        let len = lines.len();
        lines
            .into_iter()
            .nth(index)
            .ok_or(Error::LineOutOfRange { index, len })
    }

    /// Replace line `index` and rewrite the whole file.
    pub fn set_line(&self, index: usize, value: &str) -> Result<()> {
        let mut lines = self.lines()?;
        let len = lines.len();
        let line = lines
            .get_mut(index)
            .ok_or(Error::LineOutOfRange { index, len })?;
        *line = value.to_string();
        self.write(lines)
    }

    /// Remove line `index`, rewrite the whole file and return the removed line.
    pub fn remove_line(&self, index: usize) -> Result<String> {
        let mut lines = self.lines()?;
        if index >= lines.len() {
            return Err(Error::LineOutOfRange {
                index,
                len: lines.len(),
            });
        }
        let removed = lines.remove(index);
        self.write(lines)?;
        Ok(removed)
    }

    pub fn size(&self) -> Result<u64> {
        Ok(self.metadata()?.len())
    }

    pub fn created(&self) -> Result<DateTime<Local>> {
        let meta = self.metadata()?;
        let created = meta.created().map_err(|e| Error::io_at(self.path(), e))?;
        Ok(created.into())
    }

    pub fn modified(&self) -> Result<DateTime<Local>> {
        let meta = self.metadata()?;
        let modified = meta.modified().map_err(|e| Error::io_at(self.path(), e))?;
        Ok(modified.into())
    }

    /// Rename to `name`, or `name.extension` when an extension is given.
    pub fn rename(&self, name: &str, extension: Option<&str>) -> Result<()> {
        handle::rename(self, &compose_name(name, extension)?)
    }

    /// Copy beside this file under a new name.
    pub fn new_rename(&self, name: &str, extension: Option<&str>) -> Result<File> {
        let name = compose_name(name, extension)?;
        self.new_copy(self.path().with_file_name(name))
    }

    pub fn set_stem(&self, stem: &str) -> Result<()> {
        self.rename(stem, self.extension().as_deref())
    }

    /// Replace the extension. An empty extension removes it.
    pub fn set_extension(&self, extension: &str) -> Result<()> {
        let bare = extension.strip_prefix('.').unwrap_or(extension);
        if bare.is_empty() {
            return self.rename(&self.stem(), None);
        }
        if bare.starts_with('.') {
            return Err(Error::InvalidName(extension.to_string()));
        }
        self.rename(&self.stem(), Some(bare))
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

    pub fn new_copy(&self, path: impl AsRef<Path>) -> Result<File> {
        handle::duplicate(self, path.as_ref())
    }

    pub fn copy_to(&self, dir: &Dir) -> Result<()> {
        self.new_copy_to(dir).map(drop)
    }

    pub fn new_copy_to(&self, dir: &Dir) -> Result<File> {
        dir.bind_entry(self.clone(), true)
    }

    /// Move the file into the trash directory and return where it landed.
    pub fn trash(&self) -> Result<PathBuf> {
        handle::send_to_trash(self)
    }
}

fn compose_name(name: &str, extension: Option<&str>) -> Result<String> {
    let composed = match extension {
        Some(ext) => format!("{name}.{}", ext.trim_start_matches('.')),
        None => name.to_string(),
    };
    validate_name(&composed)?;
    Ok(composed)
}

impl PathHandle for File {
    fn node(&self) -> &Node {
        &self.0.node
    }

    fn create(&self) -> Result<()> {
        ops::touch(&self.path())
    }

    fn delete(&self) -> Result<()> {
        let path = self.path();
        match fs::remove_file(&path) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(Error::io_at(path, e)),
        }
        handle::detach(self, &path);
        self.invalidate();
        debug!(file = %path.display(), "deleted");
        Ok(())
    }
}

impl Entry for File {
    const KIND: EntryKind = EntryKind::File;

    fn cache(dir: &Dir) -> &RefCell<EntryCache<Self>> {
        dir.file_cache()
    }

    fn open(path: PathBuf, settings: Settings) -> Result<Self> {
        Self::with_settings(path, settings)
    }

    fn attach(path: PathBuf, settings: Settings) -> Self {
        Self::unlisted(path, settings)
    }

    fn copy_on_disk(from: &Path, to: &Path) -> Result<()> {
        ops::copy_file(from, to)
    }

    fn invalidate(&self) {
        self.0.decoded.borrow_mut().take();
    }
}
