// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use terrarium_app::KeyValueStore;
use tracing::warn;

/// Preferences kept in one JSON object file, rewritten whole on every change.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    entries: BTreeMap<String, String>,
}

impl JsonFileStore {
    /// Reads `path` if it exists. A file that is not a JSON object is logged
    /// and treated as empty; it is replaced on the next write.
    pub fn open(path: &Path) -> Result<Self> {
        let entries = match fs::read_to_string(path) {
            Ok(raw) => parse_entries(path, &raw),
            Err(error) if error.kind() == ErrorKind::NotFound => BTreeMap::new(),
            Err(error) => {
                return Err(error)
                    .with_context(|| format!("read preferences file {}", path.display()));
            }
        };
        Ok(Self {
            path: path.to_path_buf(),
            entries,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    fn flush(&self) -> Result<()> {
        if let Some(parent) = self
            .path
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
        {
            fs::create_dir_all(parent)
                .with_context(|| format!("create directory {}", parent.display()))?;
        }
        let encoded =
            serde_json::to_string_pretty(&self.entries).context("encode preferences file")?;
        let staging = staging_path(&self.path);
        fs::write(&staging, encoded)
            .with_context(|| format!("write preferences file {}", staging.display()))?;
        fs::rename(&staging, &self.path).with_context(|| {
            format!(
                "move {} into place at {}",
                staging.display(),
                self.path.display()
            )
        })
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.entries.insert(key.to_owned(), value.to_owned());
        self.flush()
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        if self.entries.remove(key).is_none() {
            return Ok(());
        }
        self.flush()
    }
}

fn parse_entries(path: &Path, raw: &str) -> BTreeMap<String, String> {
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(entries)) => entries
            .into_iter()
            .filter_map(|(key, value)| match value {
                Value::String(value) => Some((key, value)),
                _ => None,
            })
            .collect(),
        _ => {
            warn!(path = %path.display(), "ignoring malformed preferences file");
            BTreeMap::new()
        }
    }
}

fn staging_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|name| name.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::{JsonFileStore, staging_path};
    use anyhow::Result;
    use std::fs;
    use std::path::Path;
    use terrarium_app::KeyValueStore;

    #[test]
    fn writes_survive_reopen() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("nested").join("preferences.json");

        let mut store = JsonFileStore::open(&path)?;
        store.set("plants.column_filters", r#"{"dome":"Desert"}"#)?;
        store.set("plants.visible_columns", r#"{"qty":true}"#)?;
        store.remove("plants.visible_columns")?;

        let reopened = JsonFileStore::open(&path)?;
        assert_eq!(
            reopened.get("plants.column_filters")?.as_deref(),
            Some(r#"{"dome":"Desert"}"#)
        );
        assert_eq!(reopened.get("plants.visible_columns")?, None);
        assert!(!staging_path(&path).exists());
        Ok(())
    }

    #[test]
    fn malformed_file_reads_as_empty() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("preferences.json");
        fs::write(&path, "[1, 2, 3]")?;

        let mut store = JsonFileStore::open(&path)?;
        assert_eq!(store.keys().count(), 0);

        store.set("k", "v")?;
        let raw = fs::read_to_string(&path)?;
        assert!(raw.contains("\"k\": \"v\""), "{raw}");
        Ok(())
    }

    #[test]
    fn staging_path_is_a_sibling() {
        assert_eq!(
            staging_path(Path::new("/data/prefs.json")),
            Path::new("/data/prefs.json.tmp")
        );
    }
}
