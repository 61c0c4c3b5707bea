//! Side-by-side comparison and ASCII rendering of directory trees

use regex::Regex;

use crate::dir::Dir;
use crate::error::Result;
use crate::file::File;
use crate::handle::PathHandle;

/// Files of two directories paired by name. Either side is `None` for unmatched names.
pub type FilePair = (Option<File>, Option<File>);

/// One pair of directories visited by [`Dir::compare_tree`]
#[derive(Clone, Debug)]
pub struct TreeComparison {
    pub left: Option<Dir>,
    pub right: Option<Dir>,
    pub files: Vec<FilePair>,
}

/// Rendering options for [`Dir::visualize`]
#[derive(Clone, Debug, Default)]
pub struct TreeOptions {
    /// Levels of subdirectories to expand. `None` expands everything.
    pub depth: Option<usize>,
    pub file_include: Option<String>,
    pub file_exclude: Option<String>,
    pub dir_include: Option<String>,
    pub dir_exclude: Option<String>,
}

struct NameFilter {
    include: Option<Regex>,
    exclude: Option<Regex>,
}

impl NameFilter {
    fn new(include: Option<&str>, exclude: Option<&str>) -> Result<Self> {
        Ok(Self {
            include: include.map(Regex::new).transpose()?,
            exclude: exclude.map(Regex::new).transpose()?,
        })
    }

    fn admits(&self, name: &str) -> bool {
        self.include.as_ref().map_or(true, |re| re.is_match(name))
            && self.exclude.as_ref().map_or(true, |re| !re.is_match(name))
    }
}

struct Renderer {
    files: NameFilter,
    dirs: NameFilter,
    lines: Vec<String>,
}

impl Renderer {
    fn render(&mut self, dir: &Dir, depth: Option<usize>, padding: &str) -> Result<()> {
        for name in dir.files().names()? {
            if self.files.admits(&name) {
                self.lines.push(format!("{padding} |"));
                self.lines.push(format!("{padding} +--{name}"));
            }
        }

        let mut dirs = Vec::new();
        for subdir in dir.dirs().iter()? {
            let subdir = subdir?;
            if self.dirs.admits(&subdir.name()) {
                dirs.push(subdir);
            }
        }

        let depth = match depth {
            Some(0) => {
                for subdir in &dirs {
                    self.lines.push(format!("{padding} |"));
                    self.lines.push(format!("{padding} +--{}/", subdir.name()));
                }
                return Ok(());
            }
            Some(depth) => Some(depth - 1),
            None => None,
        };

        let count = dirs.len();
        for (index, subdir) in dirs.iter().enumerate() {
            self.lines.push(format!("{padding} |"));
            self.lines.push(format!("{padding} +--{}/", subdir.name()));
            let rail = if index + 1 == count { "" } else { "|" };
            self.render(subdir, depth, &format!("{padding} {rail}"))?;
        }
        Ok(())
    }
}

impl Dir {
    /// Pair this directory's files with `other`'s by name. Unmatched files are
    /// included (against `None`) only when `include_unmatched` is set.
    pub fn compare_files(&self, other: &Dir, include_unmatched: bool) -> Result<Vec<FilePair>> {
        let ours = self.files().names()?;
        let theirs = other.files().names()?;

        let mut pairs = Vec::new();
        for name in ours.iter().filter(|name| theirs.contains(name)) {
            pairs.push((Some(self.files().get(name)?), Some(other.files().get(name)?)));
        }
        if include_unmatched {
            for name in ours.iter().filter(|name| !theirs.contains(name)) {
                pairs.push((Some(self.files().get(name)?), None));
            }
            for name in theirs.iter().filter(|name| !ours.contains(name)) {
                pairs.push((None, Some(other.files().get(name)?)));
            }
        }
        Ok(pairs)
    }

    /// Compare this tree with `other`, descending wherever both sides have a
    /// subdirectory of the same name.
    pub fn compare_tree(&self, other: &Dir, include_unmatched: bool) -> Result<Vec<TreeComparison>> {
        let mut levels = vec![TreeComparison {
            left: Some(self.clone()),
            right: Some(other.clone()),
            files: self.compare_files(other, include_unmatched)?,
        }];

        let ours = self.dirs().names()?;
        let theirs = other.dirs().names()?;
        for name in ours.iter().filter(|name| theirs.contains(name)) {
            let left = self.dirs().get(name)?;
            let right = other.dirs().get(name)?;
            levels.extend(left.compare_tree(&right, include_unmatched)?);
        }

        if include_unmatched {
            for name in ours.iter().filter(|name| !theirs.contains(name)) {
                levels.push(TreeComparison {
                    left: Some(self.dirs().get(name)?),
                    right: None,
                    files: Vec::new(),
                });
            }
            for name in theirs.iter().filter(|name| !ours.contains(name)) {
                levels.push(TreeComparison {
                    left: None,
                    right: Some(other.dirs().get(name)?),
                    files: Vec::new(),
                });
            }
        }
        Ok(levels)
    }

    /// Render the tree below this directory as ASCII art.
    pub fn visualize(&self, options: &TreeOptions) -> Result<String> {
        let mut renderer = Renderer {
            files: NameFilter::new(options.file_include.as_deref(), options.file_exclude.as_deref())?,
            dirs: NameFilter::new(options.dir_include.as_deref(), options.dir_exclude.as_deref())?,
            lines: vec![format!("+--{}/", self.name())],
        };
        renderer.render(self, options.depth, " ")?;
        Ok(renderer.lines.join("\n"))
    }
}
