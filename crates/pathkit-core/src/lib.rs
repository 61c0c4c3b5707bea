//! pathkit core: filesystem handles that stay in sync with the disk
//!
//! [`Dir`] and [`File`] wrap paths. A directory keeps a lazily synchronized
//! cache of its children, reachable by raw name through [`Dir::files`] and
//! [`Dir::dirs`] or by clean identifier through [`Dir::f`] and [`Dir::d`].
//! File content is read and written through an extension-keyed
//! [`FormatRegistry`].

mod accessor;
pub mod config;
mod dir;
mod entries;
pub mod error;
mod file;
pub mod format;
mod handle;
mod ops;
pub mod resolver;
mod seek;
mod tree;

pub use accessor::{Accessor, Entries, IdentAccessor};
pub use config::{IfExists, Settings};
pub use dir::{Dir, Entity, ScopedDir};
pub use entries::{Entry, EntryCache, EntryKind};
pub use error::{Error, Result};
pub use file::File;
pub use format::{Content, Format, FormatRegistry};
pub use handle::PathHandle;
pub use seek::{SeekDirs, SeekDirsIter, SeekFiles, SeekFilesIter, Walk, WalkEntry};
pub use tree::{FilePair, TreeComparison, TreeOptions};
