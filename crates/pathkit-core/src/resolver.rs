//! Identifier-safe aliases for on-disk names

use std::collections::BTreeMap;

/// Names bracketed by underscores (`__init__`, `_x_`) are never given an identifier.
pub fn is_special(name: &str) -> bool {
    name.len() > 1 && name.starts_with('_') && name.ends_with('_')
}

/// Drop everything from the first dot on, except for a leading dot.
fn strip_extension(name: &str) -> &str {
    let offset = usize::from(name.starts_with('.'));
    match name[offset..].find('.') {
        Some(index) => &name[..offset + index],
        None => name,
    }
}

/// Canonical identifier for `name`.
///
/// Lowercases, collapses every run of characters outside `[a-z0-9]` to a single
/// `_`, trims underscores at both ends and prefixes `_` when the result would
/// start with a digit. File names lose their extension first.
pub fn clean_identifier(name: &str, strip_ext: bool) -> String {
    let base = if strip_ext { strip_extension(name) } else { name };

    let mut clean = String::with_capacity(base.len());
    let mut separated = false;
    for ch in base.chars().flat_map(char::to_lowercase) {
        if ch.is_ascii_alphanumeric() {
            if separated && !clean.is_empty() {
                clean.push('_');
            }
            separated = false;
            clean.push(ch);
        } else {
            separated = true;
        }
    }

    if clean.starts_with(|c: char| c.is_ascii_digit()) {
        clean.insert(0, '_');
    }
    clean
}

/// Mapping from clean identifiers to the raw names that produce them
#[derive(Debug, Default)]
pub struct NameIndex {
    strip_ext: bool,
    mappings: BTreeMap<String, Vec<String>>,
    pending: Option<Vec<String>>,
}

impl NameIndex {
    pub fn new(strip_ext: bool) -> Self {
        Self {
            strip_ext,
            ..Self::default()
        }
    }

    /// Replace the indexed names. With `lazy` the rebuild waits for the next lookup.
    pub fn acquire(&mut self, names: Vec<String>, lazy: bool) {
        self.pending = Some(names);
        if !lazy {
            self.rebuild();
        }
    }

    pub fn is_stale(&self) -> bool {
        self.pending.is_some()
    }

    fn rebuild(&mut self) {
        let Some(names) = self.pending.take() else {
            return;
        };
        self.mappings.clear();
        for name in names {
            if is_special(&name) {
                continue;
            }
            let clean = clean_identifier(&name, self.strip_ext);
            if clean.is_empty() {
                continue;
            }
            self.mappings.entry(clean).or_default().push(name);
        }
    }

    /// Raw names behind `identifier`.
    pub fn lookup(&mut self, identifier: &str) -> Option<Vec<String>> {
        self.rebuild();
        self.mappings.get(identifier).cloned()
    }

    /// Identifiers that resolve to exactly one raw name.
    pub fn identifiers(&mut self) -> Vec<String> {
        self.rebuild();
        self.mappings
            .iter()
            .filter(|(_, names)| names.len() == 1)
            .map(|(identifier, _)| identifier.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_identifier() {
        assert_eq!(clean_identifier("Test.txt", true), "test");
        assert_eq!(clean_identifier("My Report (final).csv", true), "my_report_final");
        assert_eq!(clean_identifier("2024 data.json", true), "_2024_data");
        assert_eq!(clean_identifier("archive.tar.gz", true), "archive");
        assert_eq!(clean_identifier(".gitignore", true), "gitignore");
        assert_eq!(clean_identifier("--weird__name--", false), "weird_name");
        assert_eq!(clean_identifier("v1.2", false), "v1_2");
        assert_eq!(clean_identifier("!!!", false), "");
    }

    #[test]
    fn test_special_names() {
        assert!(is_special("__init__"));
        assert!(is_special("_x_"));
        assert!(!is_special("_"));
        assert!(!is_special("_private"));
    }

    #[test]
    fn test_index_buckets_and_laziness() {
        let mut index = NameIndex::new(true);
        index.acquire(
            vec![
                "data.csv".to_string(),
                "data.json".to_string(),
                "notes.txt".to_string(),
                "_scratch_".to_string(),
            ],
            true,
        );
        assert!(index.is_stale());

        assert_eq!(index.lookup("notes"), Some(vec!["notes.txt".to_string()]));
        assert!(!index.is_stale());
        assert_eq!(index.lookup("data").map(|names| names.len()), Some(2));
        assert_eq!(index.lookup("scratch"), None);
        assert_eq!(index.identifiers(), vec!["notes".to_string()]);
    }
}
