#![allow(dead_code)]

use std::fs;
use std::path::Path;

use pathkit_core::{Dir, Settings};
use tempfile::TempDir;

/// Settings that keep trashed objects inside the test's temp directory.
pub fn settings_in(tmp: &TempDir) -> Settings {
    Settings::default().with_trash_dir(tmp.path().join(".trash"))
}

/// A temp directory plus a `Dir` handle on a `work` subdirectory of it.
pub fn workspace() -> (TempDir, Dir) {
    let tmp = TempDir::new().expect("create temp dir");
    let dir = Dir::with_settings(tmp.path().join("work"), settings_in(&tmp)).expect("open work dir");
    (tmp, dir)
}

pub fn write(path: impl AsRef<Path>, contents: &str) {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create parent");
    }
    fs::write(path, contents).expect("write fixture");
}

/// Sorted entry names from a raw OS listing.
pub fn raw_listing(path: impl AsRef<Path>) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(path)
        .expect("read dir")
        .map(|entry| entry.expect("dir entry").file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}
