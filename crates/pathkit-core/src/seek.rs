//! Filtered depth-first traversal below a [`Dir`]

use std::collections::{HashSet, VecDeque};
use std::fs;
use std::path::PathBuf;

use regex::{Regex, RegexBuilder};

use crate::dir::Dir;
use crate::error::Result;
use crate::file::File;
use crate::handle::PathHandle;

/// Filters for [`Dir::seek_files`]. Patterns are regular expressions searched
/// (not anchored) in the relevant string.
#[derive(Clone, Debug, Default)]
pub struct SeekFiles {
    pub depth: Option<usize>,
    /// Matched against the file stem.
    pub name: Option<String>,
    /// Matched against the containing directory's full path. A mismatch prunes the subtree.
    pub parent_path: Option<String>,
    /// Matched against the file's text.
    pub content: Option<String>,
    pub extensions: Option<Vec<String>>,
    pub case_sensitive: bool,
}

impl SeekFiles {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn depth(mut self, depth: usize) -> Self {
        self.depth = Some(depth);
        self
    }

    pub fn name(mut self, pattern: impl Into<String>) -> Self {
        self.name = Some(pattern.into());
        self
    }

    pub fn parent_path(mut self, pattern: impl Into<String>) -> Self {
        self.parent_path = Some(pattern.into());
        self
    }

    pub fn content(mut self, pattern: impl Into<String>) -> Self {
        self.content = Some(pattern.into());
        self
    }

    pub fn extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extensions = Some(
            extensions
                .into_iter()
                .map(|ext| ext.into().trim_start_matches('.').to_lowercase())
                .collect(),
        );
        self
    }

    pub fn case_sensitive(mut self, case_sensitive: bool) -> Self {
        self.case_sensitive = case_sensitive;
        self
    }
}

/// Filters for [`Dir::seek_dirs`]
#[derive(Clone, Debug, Default)]
pub struct SeekDirs {
    pub depth: Option<usize>,
    pub name: Option<String>,
    pub parent_path: Option<String>,
    /// Keep directories holding a file whose name matches.
    pub contains_file: Option<String>,
    /// Keep directories holding a subdirectory whose name matches.
    pub contains_dir: Option<String>,
    pub case_sensitive: bool,
}

impl SeekDirs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn depth(mut self, depth: usize) -> Self {
        self.depth = Some(depth);
        self
    }

    pub fn name(mut self, pattern: impl Into<String>) -> Self {
        self.name = Some(pattern.into());
        self
    }

    pub fn parent_path(mut self, pattern: impl Into<String>) -> Self {
        self.parent_path = Some(pattern.into());
        self
    }

    pub fn contains_file(mut self, pattern: impl Into<String>) -> Self {
        self.contains_file = Some(pattern.into());
        self
    }

    pub fn contains_dir(mut self, pattern: impl Into<String>) -> Self {
        self.contains_dir = Some(pattern.into());
        self
    }

    pub fn case_sensitive(mut self, case_sensitive: bool) -> Self {
        self.case_sensitive = case_sensitive;
        self
    }
}

fn compile(pattern: Option<&str>, case_sensitive: bool) -> Result<Option<Regex>> {
    pattern
        .map(|pattern| {
            RegexBuilder::new(pattern)
                .case_insensitive(!case_sensitive)
                .build()
        })
        .transpose()
        .map_err(Into::into)
}

fn matches(regex: &Option<Regex>, text: &str) -> bool {
    regex.as_ref().map_or(true, |regex| regex.is_match(text))
}

struct FileFilter {
    name: Option<Regex>,
    content: Option<Regex>,
    extensions: Option<Vec<String>>,
}

impl FileFilter {
    fn admits(&self, file: &File) -> bool {
        if !matches(&self.name, &file.stem()) {
            return false;
        }
        if let Some(extensions) = &self.extensions {
            match file.extension() {
                Some(ext) if extensions.contains(&ext) => {}
                _ => return false,
            }
        }
        match &self.content {
            Some(regex) => fs::read_to_string(file.path())
                .map(|text| regex.is_match(&text))
                .unwrap_or(false),
            None => true,
        }
    }
}

struct DirFilter {
    name: Option<Regex>,
    contains_file: Option<Regex>,
    contains_dir: Option<Regex>,
}

impl DirFilter {
    fn admits(&self, dir: &Dir) -> Result<bool> {
        if !matches(&self.name, &dir.name()) {
            return Ok(false);
        }
        if let Some(regex) = &self.contains_file {
            if !dir.files().names()?.iter().any(|name| regex.is_match(name)) {
                return Ok(false);
            }
        }
        if let Some(regex) = &self.contains_dir {
            if !dir.dirs().names()?.iter().any(|name| regex.is_match(name)) {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

/// Explicit-stack depth-first walk shared by both seekers.
///
/// Every directory is reached at most once by its resolved path, so symlinks
/// pointing back up the tree end the descent instead of aliasing the root.
struct Frontier {
    stack: Vec<(Dir, Option<usize>)>,
    parent_path: Option<Regex>,
    visited: HashSet<PathBuf>,
}

/// Path of `dir` with symlinks resolved, or as stored when that fails.
fn resolved(dir: &Dir) -> PathBuf {
    let path = dir.path();
    fs::canonicalize(&path).unwrap_or(path)
}

impl Frontier {
    fn new(root: &Dir, depth: Option<usize>, parent_path: Option<Regex>) -> Self {
        Self {
            stack: vec![(root.clone(), depth)],
            parent_path,
            visited: HashSet::from([resolved(root)]),
        }
    }

    /// Next directory whose children should be inspected, with its subdirectories.
    fn pop(&mut self) -> Option<Result<(Dir, Vec<Dir>)>> {
        loop {
            let (dir, depth) = self.stack.pop()?;
            if !matches(&self.parent_path, &dir.path().to_string_lossy()) {
                continue;
            }

            let subdirs = match dir.dirs().iter() {
                Ok(iter) => iter.collect::<Result<Vec<Dir>>>(),
                Err(e) => Err(e),
            };
            let subdirs: Vec<Dir> = match subdirs {
                Ok(subdirs) => subdirs
                    .into_iter()
                    .filter(|subdir| self.visited.insert(resolved(subdir)))
                    .collect(),
                Err(e) => return Some(Err(e)),
            };

            let next_depth = match depth {
                Some(0) => None,
                Some(depth) => Some(Some(depth - 1)),
                None => Some(None),
            };
            if let Some(next_depth) = next_depth {
                for subdir in subdirs.iter().rev() {
                    self.stack.push((subdir.clone(), next_depth));
                }
            }
            return Some(Ok((dir, subdirs)));
        }
    }
}

/// Iterator returned by [`Dir::seek_files`]
pub struct SeekFilesIter {
    frontier: Frontier,
    filter: FileFilter,
    pending: VecDeque<Result<File>>,
}

impl Iterator for SeekFilesIter {
    type Item = Result<File>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(item) = self.pending.pop_front() {
                return Some(item);
            }
            let (dir, _) = match self.frontier.pop()? {
                Ok(level) => level,
                Err(e) => return Some(Err(e)),
            };
            let files = match dir.files().iter() {
                Ok(files) => files,
                Err(e) => return Some(Err(e)),
            };
            for file in files {
                match file {
                    Ok(file) if self.filter.admits(&file) => self.pending.push_back(Ok(file)),
                    Ok(_) => {}
                    Err(e) => self.pending.push_back(Err(e)),
                }
            }
        }
    }
}

/// Iterator returned by [`Dir::seek_dirs`]
pub struct SeekDirsIter {
    frontier: Frontier,
    filter: DirFilter,
    pending: VecDeque<Result<Dir>>,
}

impl Iterator for SeekDirsIter {
    type Item = Result<Dir>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(item) = self.pending.pop_front() {
                return Some(item);
            }
            let (_, subdirs) = match self.frontier.pop()? {
                Ok(level) => level,
                Err(e) => return Some(Err(e)),
            };
            for subdir in subdirs {
                match self.filter.admits(&subdir) {
                    Ok(true) => self.pending.push_back(Ok(subdir)),
                    Ok(false) => {}
                    Err(e) => self.pending.push_back(Err(e)),
                }
            }
        }
    }
}

/// One level of [`Dir::walk`]
#[derive(Clone, Debug)]
pub struct WalkEntry {
    pub dir: Dir,
    pub dir_names: Vec<String>,
    pub file_names: Vec<String>,
}

impl WalkEntry {
    fn capture(dir: Dir) -> Result<Self> {
        Ok(Self {
            dir_names: dir.dirs().names()?,
            file_names: dir.files().names()?,
            dir,
        })
    }
}

/// Iterator returned by [`Dir::walk`]
pub struct Walk {
    root: Option<Dir>,
    below: SeekDirsIter,
}

impl Iterator for Walk {
    type Item = Result<WalkEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        let dir = match self.root.take() {
            Some(root) => root,
            None => match self.below.next()? {
                Ok(dir) => dir,
                Err(e) => return Some(Err(e)),
            },
        };
        Some(WalkEntry::capture(dir))
    }
}

impl Dir {
    /// Files below this directory that pass every filter in `seek`.
    ///
    /// Depth `Some(0)` only looks at this directory's own files.
    pub fn seek_files(&self, seek: &SeekFiles) -> Result<SeekFilesIter> {
        let parent_path = compile(seek.parent_path.as_deref(), seek.case_sensitive)?;
        Ok(SeekFilesIter {
            frontier: Frontier::new(self, seek.depth, parent_path),
            filter: FileFilter {
                name: compile(seek.name.as_deref(), seek.case_sensitive)?,
                content: compile(seek.content.as_deref(), seek.case_sensitive)?,
                extensions: seek.extensions.clone(),
            },
            pending: VecDeque::new(),
        })
    }

    /// Directories below this one that pass every filter in `seek`. Never
    /// yields `self`.
    pub fn seek_dirs(&self, seek: &SeekDirs) -> Result<SeekDirsIter> {
        let parent_path = compile(seek.parent_path.as_deref(), seek.case_sensitive)?;
        let contains_file = compile(seek.contains_file.as_deref(), seek.case_sensitive)?;
        let contains_dir = compile(seek.contains_dir.as_deref(), seek.case_sensitive)?;
        Ok(SeekDirsIter {
            frontier: Frontier::new(self, seek.depth, parent_path),
            filter: DirFilter {
                name: compile(seek.name.as_deref(), seek.case_sensitive)?,
                contains_file,
                contains_dir,
            },
            pending: VecDeque::new(),
        })
    }

    /// This directory and every directory below it, each with its child names.
    pub fn walk(&self, depth: Option<usize>) -> Result<Walk> {
        let seek = SeekDirs {
            depth,
            ..SeekDirs::default()
        };
        Ok(Walk {
            root: Some(self.clone()),
            below: self.seek_dirs(&seek)?,
        })
    }
}
