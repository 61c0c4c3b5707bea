//! JSON codec

use std::fs;
use std::path::Path;

use serde::Serialize;
use serde_json::Value;

use super::{Content, Format};
use crate::error::{Error, Result};

pub struct JsonFormat;

impl Format for JsonFormat {
    fn name(&self) -> &'static str {
        "json"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["json"]
    }

    /// Files that do not parse come back as their raw text.
    fn read(&self, path: &Path) -> Result<Content> {
        let raw = fs::read_to_string(path).map_err(|e| Error::io_at(path, e))?;
        if raw.trim().is_empty() {
            return Ok(Content::Empty);
        }
        Ok(match serde_json::from_str::<Value>(&raw) {
            Ok(value) => Content::Structured(value),
            Err(_) => Content::Text(raw),
        })
    }

    fn write(&self, path: &Path, content: &Content) -> Result<()> {
        let value = to_value(self.name(), content)?;
        let mut out = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut serializer = serde_json::Serializer::with_formatter(&mut out, formatter);
        value.serialize(&mut serializer)?;
        fs::write(path, out).map_err(|e| Error::io_at(path, e))
    }
}

/// Coerce content into a structured value for the serialized formats.
pub(super) fn to_value(format: &str, content: &Content) -> Result<Value> {
    match content {
        Content::Empty => Ok(Value::Null),
        Content::Text(text) => Ok(Value::String(text.clone())),
        Content::Structured(value) => Ok(value.clone()),
        other => Err(Error::Unsupported(format!(
            "cannot serialize {other:?} as {format}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_json_write_uses_four_space_indent() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("data.json");
        JsonFormat
            .write(&path, &Content::from(json!({"key": [1, 2]})))
            .unwrap();
        let raw = fs::read_to_string(&path).unwrap();
        assert!(raw.contains("\n    \"key\""));
        assert_eq!(
            JsonFormat.read(&path).unwrap(),
            Content::Structured(json!({"key": [1, 2]}))
        );
    }

    #[test]
    fn test_invalid_json_reads_as_text() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("broken.json");
        fs::write(&path, "{not json").unwrap();
        assert_eq!(JsonFormat.read(&path).unwrap(), Content::from("{not json"));
    }

    #[test]
    fn test_bytes_are_not_serializable() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("data.json");
        assert!(matches!(
            JsonFormat.write(&path, &Content::Bytes(vec![1])),
            Err(Error::Unsupported(_))
        ));
    }
}
