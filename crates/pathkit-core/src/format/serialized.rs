//! YAML and TOML codecs, both decoded into `serde_json::Value`

use std::fs;
use std::path::Path;

use serde_json::Value;

use super::json::to_value;
use super::{Content, Format};
use crate::error::{Error, Result};

pub struct YamlFormat;

impl Format for YamlFormat {
    fn name(&self) -> &'static str {
        "yaml"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["yaml", "yml"]
    }

    fn read(&self, path: &Path) -> Result<Content> {
        let raw = fs::read_to_string(path).map_err(|e| Error::io_at(path, e))?;
        if raw.trim().is_empty() {
            return Ok(Content::Empty);
        }
        Ok(Content::Structured(serde_yaml::from_str::<Value>(&raw)?))
    }

    fn write(&self, path: &Path, content: &Content) -> Result<()> {
        let raw = serde_yaml::to_string(&to_value(self.name(), content)?)?;
        fs::write(path, raw).map_err(|e| Error::io_at(path, e))
    }
}

pub struct TomlFormat;

impl Format for TomlFormat {
    fn name(&self) -> &'static str {
        "toml"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["toml"]
    }

    fn read(&self, path: &Path) -> Result<Content> {
        let raw = fs::read_to_string(path).map_err(|e| Error::io_at(path, e))?;
        if raw.trim().is_empty() {
            return Ok(Content::Empty);
        }
        Ok(Content::Structured(toml::from_str::<Value>(&raw)?))
    }

    /// TOML documents must be tables at the top level.
    fn write(&self, path: &Path, content: &Content) -> Result<()> {
        let value = to_value(self.name(), content)?;
        let raw = match value {
            Value::Null => String::new(),
            Value::Object(_) => toml::to_string_pretty(&value)?,
            other => {
                return Err(Error::Unsupported(format!(
                    "toml documents must be tables, got {other}"
                )))
            }
        };
        fs::write(path, raw).map_err(|e| Error::io_at(path, e))
    }
}
