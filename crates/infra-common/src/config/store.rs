use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::errors::Result;

type Section = BTreeMap<String, String>;

/// In-memory configuration made of named sections of string key/values
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConfigStore {
    sections: BTreeMap<String, Section>,
}

impl ConfigStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a TOML document whose top-level tables are sections
    pub fn from_toml_str(input: &str) -> Result<Self> {
        Ok(toml::from_str(input)?)
    }

    /// Render the store as TOML
    pub fn to_toml_string(&self) -> Result<String> {
        Ok(toml::to_string(self)?)
    }

    /// Load a store from a TOML file
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let store = Self::from_toml_str(&content)?;
        debug!("Loaded {} configuration sections from {}", store.sections.len(), path.display());
        Ok(store)
    }

    /// Write the store to a TOML file, replacing it
    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path, self.to_toml_string()?)?;
        Ok(())
    }

    pub fn has_section(&self, section: &str) -> bool {
        self.sections.contains_key(section)
    }

    /// Names of all sections, in sorted order
    pub fn section_names(&self) -> impl Iterator<Item = &str> {
        self.sections.keys().map(String::as_str)
    }

    /// Remove a section and all of its keys
    pub fn clean_section(&mut self, section: &str) {
        self.sections.remove(section);
    }

    pub fn get_string(&self, section: &str, key: &str) -> Option<&str> {
        self.sections.get(section)?.get(key).map(String::as_str)
    }

    /// String value, or `default` when the key is absent
    pub fn get_string_or<'a>(&'a self, section: &str, key: &str, default: &'a str) -> &'a str {
        self.get_string(section, key).unwrap_or(default)
    }

    pub fn set_string(&mut self, section: &str, key: &str, value: impl Into<String>) {
        self.sections
            .entry(section.to_string())
            .or_default()
            .insert(key.to_string(), value.into());
    }

    /// Remove one key. The section stays, even when it becomes empty.
    pub fn remove_key(&mut self, section: &str, key: &str) -> Option<String> {
        self.sections.get_mut(section)?.remove(key)
    }

    /// Boolean value; accepts `1/0`, `true/false`, `yes/no`. Unparseable
    /// values fall back to `default`.
    pub fn get_bool(&self, section: &str, key: &str, default: bool) -> bool {
        match self.get_string(section, key).map(|v| v.trim().to_ascii_lowercase()) {
            Some(v) if v == "1" || v == "true" || v == "yes" => true,
            Some(v) if v == "0" || v == "false" || v == "no" => false,
            _ => default,
        }
    }

    pub fn set_bool(&mut self, section: &str, key: &str, value: bool) {
        self.set_string(section, key, if value { "1" } else { "0" });
    }

    pub fn get_int(&self, section: &str, key: &str, default: i64) -> i64 {
        self.get_string(section, key)
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(default)
    }

    pub fn set_int(&mut self, section: &str, key: &str, value: i64) {
        self.set_string(section, key, value.to_string());
    }

    /// Comma separated list; empty entries are dropped
    pub fn get_string_list(&self, section: &str, key: &str) -> Option<Vec<String>> {
        self.get_string(section, key).map(|v| {
            v.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        })
    }

    pub fn set_string_list<S: AsRef<str>>(&mut self, section: &str, key: &str, values: &[S]) {
        let joined = values.iter().map(AsRef::as_ref).collect::<Vec<_>>().join(",");
        self.set_string(section, key, joined);
    }
}
