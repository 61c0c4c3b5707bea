//! Configuration types for pathkit handles

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::format::FormatRegistry;

/// What to do when a copy, move or rename targets a path that already exists
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IfExists {
    /// Refuse the operation with [`Error::AlreadyExists`].
    #[default]
    Fail,
    /// Remove whatever is at the destination, then proceed.
    Allow,
    /// Move whatever is at the destination into the trash directory, then proceed.
    Trash,
    /// Leave the existing object alone and pick a free `name (n).ext` destination.
    MakeCopy,
}

impl fmt::Display for IfExists {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            IfExists::Fail => "fail",
            IfExists::Allow => "allow",
            IfExists::Trash => "trash",
            IfExists::MakeCopy => "make_copy",
        };
        f.write_str(name)
    }
}

impl FromStr for IfExists {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "fail" => Ok(IfExists::Fail),
            "allow" => Ok(IfExists::Allow),
            "trash" => Ok(IfExists::Trash),
            "make_copy" | "copy" => Ok(IfExists::MakeCopy),
            _ => Err(Error::UnknownPolicy(s.to_string())),
        }
    }
}

/// Settings shared by a handle and every relative it instantiates
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Collision policy consulted by every mutating operation.
    pub if_exists: IfExists,
    /// Defer rebuilding identifier indexes until an identifier lookup needs them.
    pub lazy_index: bool,
    /// Re-decode file content on every read instead of trusting the mtime.
    pub force_read: bool,
    /// Where `trash()` and [`IfExists::Trash`] put things. `None` picks a per-user default.
    pub trash_dir: Option<PathBuf>,
    /// Extension to codec dispatch table.
    #[serde(skip)]
    pub formats: Arc<FormatRegistry>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            if_exists: IfExists::Fail,
            lazy_index: true,
            force_read: false,
            trash_dir: None,
            formats: Arc::new(FormatRegistry::standard()),
        }
    }
}

impl Settings {
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load settings from a JSON file. Missing keys keep their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| Error::io_at(path, e))?;
        Self::from_json_str(&raw)
    }

    pub fn with_if_exists(mut self, if_exists: IfExists) -> Self {
        self.if_exists = if_exists;
        self
    }

    pub fn with_trash_dir(mut self, trash_dir: impl Into<PathBuf>) -> Self {
        self.trash_dir = Some(trash_dir.into());
        self
    }

    pub fn with_formats(mut self, formats: FormatRegistry) -> Self {
        self.formats = Arc::new(formats);
        self
    }

    /// Effective trash directory.
    pub fn trash_dir(&self) -> PathBuf {
        match &self.trash_dir {
            Some(dir) => dir.clone(),
            None => dirs::data_local_dir()
                .unwrap_or_else(std::env::temp_dir)
                .join("pathkit")
                .join("trash"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_round_trips_through_strings() {
        for policy in [IfExists::Fail, IfExists::Allow, IfExists::Trash, IfExists::MakeCopy] {
            assert_eq!(policy.to_string().parse::<IfExists>().unwrap(), policy);
        }
        assert_eq!("make-copy".parse::<IfExists>().unwrap(), IfExists::MakeCopy);
        assert!(matches!(
            "overwrite".parse::<IfExists>(),
            Err(Error::UnknownPolicy(_))
        ));
    }

    #[test]
    fn test_settings_from_partial_json() {
        let settings = Settings::from_json_str(r#"{"if_exists": "trash", "trash_dir": "/tmp/bin"}"#).unwrap();
        assert_eq!(settings.if_exists, IfExists::Trash);
        assert!(settings.lazy_index);
        assert_eq!(settings.trash_dir(), PathBuf::from("/tmp/bin"));
        assert!(settings.formats.get("json").is_some());
    }
}
