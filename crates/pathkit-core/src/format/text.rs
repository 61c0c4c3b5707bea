//! Plain text and markup codecs

use std::fs;
use std::io::Write;
use std::path::Path;

use super::{Content, Format};
use crate::error::{Error, Result};

/// Default codec: UTF-8 text, falling back to raw bytes when the file does not decode
pub struct TextFormat;

impl Format for TextFormat {
    fn name(&self) -> &'static str {
        "text"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["txt", "md", "log", "csv", "ini", "cfg", "py", "rs"]
    }

    fn read(&self, path: &Path) -> Result<Content> {
        read_text(path)
    }

    fn write(&self, path: &Path, content: &Content) -> Result<()> {
        let bytes = match content {
            Content::Empty => Vec::new(),
            Content::Text(text) => text.clone().into_bytes(),
            Content::Bytes(bytes) => bytes.clone(),
            Content::Structured(value) => serde_json::to_string_pretty(value)?.into_bytes(),
            Content::Directory(dir) => {
                return Err(Error::Unsupported(format!(
                    "cannot write directory '{}' as text",
                    dir.display()
                )))
            }
        };
        fs::write(path, bytes).map_err(|e| Error::io_at(path, e))
    }

    fn is_textual(&self) -> bool {
        true
    }

    fn append(&self, path: &Path, text: &str) -> Result<()> {
        let mut file = fs::OpenOptions::new()
            .append(true)
            .create(true)
            .open(path)
            .map_err(|e| Error::io_at(path, e))?;
        file.write_all(text.as_bytes())
            .map_err(|e| Error::io_at(path, e))
    }
}

/// HTML/XML documents, kept as text but not appendable
pub struct MarkupFormat;

impl Format for MarkupFormat {
    fn name(&self) -> &'static str {
        "markup"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["html", "htm", "xml", "svg"]
    }

    fn read(&self, path: &Path) -> Result<Content> {
        read_text(path)
    }

    fn write(&self, path: &Path, content: &Content) -> Result<()> {
        match content {
            Content::Empty | Content::Text(_) | Content::Bytes(_) => TextFormat.write(path, content),
            other => Err(Error::Unsupported(format!(
                "markup files take text, not {other:?}"
            ))),
        }
    }
}

fn read_text(path: &Path) -> Result<Content> {
    let bytes = fs::read(path).map_err(|e| Error::io_at(path, e))?;
    Ok(match String::from_utf8(bytes) {
        Ok(text) => Content::Text(text),
        Err(e) => Content::Bytes(e.into_bytes()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_text_append_and_read() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("notes.txt");
        TextFormat.write(&path, &Content::from("one")).unwrap();
        TextFormat.append(&path, "\ntwo").unwrap();
        assert_eq!(TextFormat.read(&path).unwrap(), Content::from("one\ntwo"));
    }

    #[test]
    fn test_undecodable_text_reads_as_bytes() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("blob.bin");
        fs::write(&path, [0xff, 0xfe, 0x00]).unwrap();
        assert_eq!(
            TextFormat.read(&path).unwrap(),
            Content::Bytes(vec![0xff, 0xfe, 0x00])
        );
    }

    #[test]
    fn test_markup_refuses_append() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("page.html");
        assert!(matches!(
            MarkupFormat.append(&path, "<p/>"),
            Err(Error::Unsupported(_))
        ));
    }
}
