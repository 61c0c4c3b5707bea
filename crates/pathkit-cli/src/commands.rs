use std::io::Write;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Args, Subcommand, ValueEnum};
use pathkit_core::{
    Content, Dir, Entity, File, PathHandle, SeekDirs, SeekFiles, Settings, TreeOptions,
};
use tracing::debug;

#[derive(Args)]
pub struct LsOptions {
    /// Directory to list (defaults to the current directory)
    #[arg(value_name = "DIR")]
    pub dir: Option<PathBuf>,

    /// Print clean identifiers instead of raw names
    #[arg(long)]
    pub ids: bool,
}

#[derive(Args)]
pub struct TreeArgs {
    #[arg(value_name = "DIR")]
    pub dir: Option<PathBuf>,

    /// Levels of subdirectories to expand
    #[arg(short, long)]
    pub depth: Option<usize>,

    /// Only show files matching this pattern
    #[arg(long, value_name = "REGEX")]
    pub include: Option<String>,

    /// Hide files matching this pattern
    #[arg(long, value_name = "REGEX")]
    pub exclude: Option<String>,
}

#[derive(Args)]
pub struct FindOptions {
    #[arg(value_name = "DIR")]
    pub dir: Option<PathBuf>,

    /// Pattern searched in file stems (or directory names with --dirs)
    #[arg(short, long, value_name = "REGEX")]
    pub name: Option<String>,

    /// Keep only these extensions
    #[arg(short, long = "ext", value_name = "EXT")]
    pub extensions: Vec<String>,

    /// Pattern searched in file contents
    #[arg(short, long, value_name = "REGEX")]
    pub content: Option<String>,

    #[arg(short, long)]
    pub depth: Option<usize>,

    /// Find directories instead of files
    #[arg(long)]
    pub dirs: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum Kind {
    File,
    Dir,
}

#[derive(Args)]
pub struct ResolveOptions {
    /// Clean identifier, e.g. `my_report` for `My Report.csv`
    #[arg(value_name = "IDENTIFIER")]
    pub identifier: String,

    #[arg(long, value_name = "DIR")]
    pub dir: Option<PathBuf>,

    #[arg(long, value_enum, default_value = "file")]
    pub kind: Kind,
}

#[derive(Args)]
pub struct CompressOptions {
    #[arg(value_name = "DIR")]
    pub dir: PathBuf,

    /// Archive path (defaults to `<DIR>.zip` beside the directory)
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List a directory's subdirectories and files
    Ls(LsOptions),

    /// Draw a directory tree
    Tree(TreeArgs),

    /// Search below a directory
    Find(FindOptions),

    /// Resolve a clean identifier to a child path
    Resolve(ResolveOptions),

    /// Print a file's decoded content
    Cat {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },

    /// Zip a directory
    Compress(CompressOptions),
}

impl Commands {
    pub fn run(self, settings: Settings, out: &mut impl Write) -> Result<()> {
        match self {
            Commands::Ls(opts) => ls(opts, settings, out),
            Commands::Tree(opts) => tree(opts, settings, out),
            Commands::Find(opts) => find(opts, settings, out),
            Commands::Resolve(opts) => resolve(opts, settings, out),
            Commands::Cat { file } => cat(file, settings, out),
            Commands::Compress(opts) => compress(opts, settings, out),
        }
    }
}

fn open_dir(path: Option<PathBuf>, settings: Settings) -> Result<Dir> {
    let path = match path {
        Some(path) => path,
        None => std::env::current_dir().context("reading current directory")?,
    };
    if !path.is_dir() {
        bail!("{} is not a directory", path.display());
    }
    Dir::with_settings(&path, settings).with_context(|| format!("opening {}", path.display()))
}

fn ls(opts: LsOptions, settings: Settings, out: &mut impl Write) -> Result<()> {
    let dir = open_dir(opts.dir, settings)?;
    if opts.ids {
        for identifier in dir.d().identifiers()? {
            writeln!(out, "{identifier}/")?;
        }
        for identifier in dir.f().identifiers()? {
            writeln!(out, "{identifier}")?;
        }
        return Ok(());
    }

    for entity in dir.iter()? {
        match entity? {
            Entity::Dir(sub) => writeln!(out, "{}/", sub.name())?,
            Entity::File(file) => writeln!(out, "{}", file.name())?,
        }
    }
    Ok(())
}

fn tree(opts: TreeArgs, settings: Settings, out: &mut impl Write) -> Result<()> {
    let dir = open_dir(opts.dir, settings)?;
    let options = TreeOptions {
        depth: opts.depth,
        file_include: opts.include,
        file_exclude: opts.exclude,
        ..TreeOptions::default()
    };
    writeln!(out, "{}", dir.visualize(&options)?)?;
    Ok(())
}

fn find(opts: FindOptions, settings: Settings, out: &mut impl Write) -> Result<()> {
    let dir = open_dir(opts.dir, settings)?;

    if opts.dirs {
        let mut seek = SeekDirs::new();
        seek.depth = opts.depth;
        seek.name = opts.name;
        for found in dir.seek_dirs(&seek)? {
            writeln!(out, "{}", found?.path().display())?;
        }
        return Ok(());
    }

    let mut seek = SeekFiles::new();
    seek.depth = opts.depth;
    seek.name = opts.name;
    seek.content = opts.content;
    if !opts.extensions.is_empty() {
        seek = seek.extensions(opts.extensions);
    }
    for found in dir.seek_files(&seek)? {
        writeln!(out, "{}", found?.path().display())?;
    }
    Ok(())
}

fn resolve(opts: ResolveOptions, settings: Settings, out: &mut impl Write) -> Result<()> {
    let dir = open_dir(opts.dir, settings)?;
    let path = match opts.kind {
        Kind::File => dir.f().get(&opts.identifier)?.path(),
        Kind::Dir => dir.d().get(&opts.identifier)?.path(),
    };
    debug!(identifier = %opts.identifier, path = %path.display(), "resolved");
    writeln!(out, "{}", path.display())?;
    Ok(())
}

fn cat(path: PathBuf, settings: Settings, out: &mut impl Write) -> Result<()> {
    if !path.is_file() {
        bail!("{} is not a file", path.display());
    }
    let file = File::with_settings(&path, settings)?;
    match file.read()? {
        Content::Empty => {}
        Content::Text(text) => writeln!(out, "{text}")?,
        Content::Bytes(bytes) => writeln!(out, "<{} bytes of binary data>", bytes.len())?,
        Content::Structured(value) => writeln!(out, "{}", serde_json::to_string_pretty(&value)?)?,
        Content::Directory(dir) => writeln!(out, "extracted to {}", dir.display())?,
    }
    Ok(())
}

fn compress(opts: CompressOptions, settings: Settings, out: &mut impl Write) -> Result<()> {
    let dir = open_dir(Some(opts.dir), settings)?;
    let archive = dir.compress(opts.output.as_deref())?;
    writeln!(out, "{}", archive.path().display())?;
    Ok(())
}
