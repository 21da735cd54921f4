use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use crate::error::ConfigStoreError;

/// Separator for multi-valued entries.
pub const LIST_SEPARATOR: &str = "||";

/// Flat string key/value store that strategies and condition sets persist
/// their parameters to.
///
/// On disk this is a single TOML table of string values. Keys are namespaced
/// by the owner (`arn_rule_0_find`, `fms_dest`, ...).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigStore {
    entries: BTreeMap<String, String>,
}

impl ConfigStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a store from disk. A missing file yields an empty store.
    pub fn load(path: &Path) -> Result<Self, ConfigStoreError> {
        let text = match fs::read_to_string(path) {
            Ok(t) => t,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::new()),
            Err(source) => {
                return Err(ConfigStoreError::Io {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };
        let entries: BTreeMap<String, String> = toml::from_str(&text)?;
        Ok(Self { entries })
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigStoreError> {
        let text = toml::to_string(&self.entries)?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| ConfigStoreError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        fs::write(path, text).map_err(|source| ConfigStoreError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn get_or<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.get(key).unwrap_or(default)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Parse a value, ignoring entries that do not parse.
    pub fn get_parsed<T: FromStr>(&self, key: &str) -> Option<T> {
        self.get(key).and_then(|v| v.trim().parse().ok())
    }

    /// Multi-valued entry split on [`LIST_SEPARATOR`]; empty items are dropped.
    pub fn get_list(&self, key: &str) -> Vec<String> {
        self.get(key)
            .map(|v| {
                v.split(LIST_SEPARATOR)
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl ToString) {
        self.entries.insert(key.into(), value.to_string());
    }

    pub fn set_list<S: AsRef<str>>(&mut self, key: impl Into<String>, values: &[S]) {
        let joined = values
            .iter()
            .map(|v| v.as_ref())
            .collect::<Vec<_>>()
            .join(LIST_SEPARATOR);
        self.entries.insert(key.into(), joined);
    }

    /// Drop every key starting with `prefix`, so a re-save does not leave
    /// stale indexed entries behind.
    pub fn remove_prefix(&mut self, prefix: &str) {
        self.entries.retain(|k, _| !k.starts_with(prefix));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}
