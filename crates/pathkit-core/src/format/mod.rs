//! Extension-keyed codecs used by [`crate::File`] to read and write content.
//!
//! The registry is an explicit value carried in [`crate::Settings`]; nothing
//! registers itself globally. Unknown extensions fall back to plain text.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::{Error, Result};

mod archive;
mod json;
mod serialized;
mod text;

pub(crate) use archive::compress_tree;
pub use archive::ZipFormat;
pub use json::JsonFormat;
pub use serialized::{TomlFormat, YamlFormat};
pub use text::{MarkupFormat, TextFormat};

/// Decoded file content
#[derive(Clone, Debug, PartialEq)]
pub enum Content {
    Empty,
    Text(String),
    Bytes(Vec<u8>),
    Structured(serde_json::Value),
    /// A directory tree, produced by extracting an archive or consumed when writing one.
    Directory(PathBuf),
}

impl Content {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Content::Text(text) => Some(text),
            Content::Empty => Some(""),
            _ => None,
        }
    }

    pub fn as_structured(&self) -> Option<&serde_json::Value> {
        match self {
            Content::Structured(value) => Some(value),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Content::Empty => true,
            Content::Text(text) => text.is_empty(),
            Content::Bytes(bytes) => bytes.is_empty(),
            Content::Structured(value) => value.is_null(),
            Content::Directory(_) => false,
        }
    }
}

impl From<&str> for Content {
    fn from(text: &str) -> Self {
        Content::Text(text.to_string())
    }
}

impl From<String> for Content {
    fn from(text: String) -> Self {
        Content::Text(text)
    }
}

impl From<Vec<String>> for Content {
    fn from(lines: Vec<String>) -> Self {
        Content::Text(lines.join("\n"))
    }
}

impl From<Vec<u8>> for Content {
    fn from(bytes: Vec<u8>) -> Self {
        Content::Bytes(bytes)
    }
}

impl From<serde_json::Value> for Content {
    fn from(value: serde_json::Value) -> Self {
        Content::Structured(value)
    }
}

/// A codec for one family of file extensions
pub trait Format: Send + Sync {
    fn name(&self) -> &'static str;
    fn extensions(&self) -> &'static [&'static str];
    fn read(&self, path: &Path) -> Result<Content>;
    fn write(&self, path: &Path, content: &Content) -> Result<()>;

    /// Plain-text formats accept appends and line editing.
    fn is_textual(&self) -> bool {
        false
    }

    fn append(&self, _path: &Path, _text: &str) -> Result<()> {
        Err(Error::Unsupported(format!(
            "cannot append to non-textual '{}' content",
            self.name()
        )))
    }
}

/// Extension to [`Format`] dispatch table
pub struct FormatRegistry {
    by_extension: HashMap<String, Arc<dyn Format>>,
    fallback: Arc<dyn Format>,
}

impl FormatRegistry {
    /// A registry that treats every file as plain text.
    pub fn new() -> Self {
        Self {
            by_extension: HashMap::new(),
            fallback: Arc::new(TextFormat),
        }
    }

    /// Plain text, markup, JSON, YAML, TOML and zip archives.
    pub fn standard() -> Self {
        let mut registry = Self::new();
        let builtins: [Arc<dyn Format>; 6] = [
            Arc::new(TextFormat),
            Arc::new(MarkupFormat),
            Arc::new(JsonFormat),
            Arc::new(YamlFormat),
            Arc::new(TomlFormat),
            Arc::new(ZipFormat),
        ];
        for format in builtins {
            registry.insert(format);
        }
        registry
    }

    /// Register a format for each of its extensions, replacing earlier claims.
    pub fn register(&mut self, format: Arc<dyn Format>) -> Result<()> {
        if format.extensions().is_empty() {
            return Err(Error::Unsupported(format!(
                "cannot register format '{}' without extensions",
                format.name()
            )));
        }
        self.insert(format);
        Ok(())
    }

    fn insert(&mut self, format: Arc<dyn Format>) {
        for extension in format.extensions() {
            self.by_extension
                .insert(extension.to_ascii_lowercase(), Arc::clone(&format));
        }
    }

    pub fn get(&self, extension: &str) -> Option<Arc<dyn Format>> {
        self.by_extension
            .get(&extension.to_ascii_lowercase())
            .cloned()
    }

    /// The format for `extension`, or the plain-text fallback.
    pub fn resolve(&self, extension: Option<&str>) -> Arc<dyn Format> {
        extension
            .and_then(|ext| self.get(ext))
            .unwrap_or_else(|| Arc::clone(&self.fallback))
    }

    pub fn extensions(&self) -> Vec<&str> {
        let mut extensions: Vec<&str> = self.by_extension.keys().map(String::as_str).collect();
        extensions.sort_unstable();
        extensions
    }
}

impl Default for FormatRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

impl fmt::Debug for FormatRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FormatRegistry")
            .field("extensions", &self.extensions())
            .field("fallback", &self.fallback.name())
            .finish()
    }
}
