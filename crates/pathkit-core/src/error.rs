//! Error types for pathkit core

use std::io;
use std::path::PathBuf;

use crate::config::IfExists;

/// Core handle error type
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("'{name}' not found in '{}'", parent.display())]
    NotFound { parent: PathBuf, name: String },

    #[error("'{identifier}' does not resolve uniquely. Could refer to any of: {}", quote_all(candidates))]
    Ambiguous {
        identifier: String,
        candidates: Vec<String>,
    },

    #[error("path '{}' already exists and the current collision policy is '{policy}'", path.display())]
    AlreadyExists { path: PathBuf, policy: IfExists },

    #[error("path '{}' is already this handle's path", .0.display())]
    SamePath(PathBuf),

    #[error("listing of '{}' is forbidden", .0.display())]
    Forbidden(PathBuf),

    #[error("type mismatch: {0}")]
    TypeMismatch(String),

    #[error("unsupported operation: {0}")]
    Unsupported(String),

    #[error("name not allowed: {0}")]
    InvalidName(String),

    #[error("line {index} out of range for content with {len} lines")]
    LineOutOfRange { index: usize, len: usize },

    #[error("unknown collision policy '{0}', expected one of: fail, allow, trash, make_copy")]
    UnknownPolicy(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("IO error at '{}': {source}", path.display())]
    IoAt {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("TOML parse error: {0}")]
    TomlDe(#[from] toml::de::Error),

    #[error("TOML serialization error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    #[error("archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("invalid pattern: {0}")]
    Pattern(#[from] regex::Error),
}

impl Error {
    /// Attach the offending path to an I/O error.
    pub fn io_at(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::IoAt {
            path: path.into(),
            source,
        }
    }

    pub fn not_found(parent: impl Into<PathBuf>, name: impl Into<String>) -> Self {
        Self::NotFound {
            parent: parent.into(),
            name: name.into(),
        }
    }

    /// True for both flavours of "the thing is not there".
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::NotFound { .. } => true,
            Self::Io(e) | Self::IoAt { source: e, .. } => e.kind() == io::ErrorKind::NotFound,
            _ => false,
        }
    }
}

fn quote_all(names: &[String]) -> String {
    names
        .iter()
        .map(|name| format!("'{name}'"))
        .collect::<Vec<_>>()
        .join(", ")
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ambiguity_message_lists_candidates() {
        let err = Error::Ambiguous {
            identifier: "data".to_string(),
            candidates: vec!["data.csv".to_string(), "data.json".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "'data' does not resolve uniquely. Could refer to any of: 'data.csv', 'data.json'"
        );
    }

    #[test]
    fn test_not_found_names_parent() {
        let err = Error::not_found("/tmp/parent", "missing.txt");
        assert_eq!(err.to_string(), "'missing.txt' not found in '/tmp/parent'");
        assert!(err.is_not_found());
    }
}
