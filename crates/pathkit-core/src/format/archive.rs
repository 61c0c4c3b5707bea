//! Zip archives: reading extracts, writing compresses a directory tree

use std::fs;
use std::io;
use std::path::Path;

use tracing::debug;
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use super::{Content, Format};
use crate::error::{Error, Result};

pub struct ZipFormat;

impl Format for ZipFormat {
    fn name(&self) -> &'static str {
        "zip"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["zip"]
    }

    /// Extract into a sibling directory named after the archive's stem.
    fn read(&self, path: &Path) -> Result<Content> {
        let stem = path
            .file_stem()
            .ok_or_else(|| Error::InvalidName(path.display().to_string()))?;
        let output = path.with_file_name(stem);
        fs::create_dir_all(&output).map_err(|e| Error::io_at(&output, e))?;

        let archive = fs::File::open(path).map_err(|e| Error::io_at(path, e))?;
        ZipArchive::new(archive)?.extract(&output)?;
        debug!(archive = %path.display(), output = %output.display(), "extracted archive");
        Ok(Content::Directory(output))
    }

    fn write(&self, path: &Path, content: &Content) -> Result<()> {
        match content {
            Content::Directory(source) => compress_tree(source, path),
            other => Err(Error::Unsupported(format!(
                "zip archives are written from a directory, not {other:?}"
            ))),
        }
    }
}

/// Write every entry below `source` into a zip at `dest`.
///
/// Entry names are relative to `source`'s parent, so the archive unpacks into a
/// directory carrying `source`'s own name.
pub(crate) fn compress_tree(source: &Path, dest: &Path) -> Result<()> {
    let base = source.parent().unwrap_or(source);
    let out = fs::File::create(dest).map_err(|e| Error::io_at(dest, e))?;
    let mut zip = ZipWriter::new(out);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for entry in WalkDir::new(source).min_depth(1).sort_by_file_name() {
        let entry = entry.map_err(io::Error::from)?;
        if entry.path() == dest {
            continue;
        }
        let name = entry
            .path()
            .strip_prefix(base)
            .unwrap_or(entry.path())
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join("/");

        if entry.file_type().is_dir() {
            zip.add_directory(name, options)?;
        } else {
            zip.start_file(name, options)?;
            let mut input = fs::File::open(entry.path()).map_err(|e| Error::io_at(entry.path(), e))?;
            io::copy(&mut input, &mut zip)?;
        }
    }

    zip.finish()?;
    debug!(source = %source.display(), archive = %dest.display(), "compressed tree");
    Ok(())
}
