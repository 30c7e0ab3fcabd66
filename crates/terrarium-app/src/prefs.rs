// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::Result;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info, warn};

pub const DEFAULT_DATASET: &str = "plants";

/// Synchronous string key-value port. Values written by the preference
/// stores are JSON documents.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&mut self, key: &str, value: &str) -> Result<()>;
    fn remove(&mut self, key: &str) -> Result<()>;
}

impl<S: KeyValueStore + ?Sized> KeyValueStore for &mut S {
    fn get(&self, key: &str) -> Result<Option<String>> {
        (**self).get(key)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        (**self).set(key, value)
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        (**self).remove(key)
    }
}

impl<S: KeyValueStore + ?Sized> KeyValueStore for Box<S> {
    fn get(&self, key: &str) -> Result<Option<String>> {
        (**self).get(key)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        (**self).set(key, value)
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        (**self).remove(key)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreferenceKeys {
    pub visibility: String,
    pub filters: String,
}

impl PreferenceKeys {
    pub fn for_dataset(dataset: &str) -> Self {
        Self {
            visibility: format!("{dataset}.visible_columns"),
            filters: format!("{dataset}.column_filters"),
        }
    }
}

impl Default for PreferenceKeys {
    fn default() -> Self {
        Self::for_dataset(DEFAULT_DATASET)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum StoredVisibility {
    Legacy(Vec<String>),
    Map(BTreeMap<String, bool>),
}

/// Per-column shown/hidden flags. Columns never seen before are shown, and
/// that default is written back so the stored map always matches what is
/// rendered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisibilityPreferences {
    key: String,
    shown: BTreeMap<String, bool>,
}

impl VisibilityPreferences {
    pub fn load<S: KeyValueStore + ?Sized>(store: &mut S, key: &str, columns: &[String]) -> Self {
        let (shown, migrated) = match read_raw(store, key).as_deref().map(decode_visibility) {
            Some(Some(StoredVisibility::Map(map))) => (map, false),
            Some(Some(StoredVisibility::Legacy(listed))) => {
                info!(key, columns = listed.len(), "migrating legacy visible-column list");
                (listed.into_iter().map(|column| (column, true)).collect(), true)
            }
            Some(None) => {
                warn!(key, "ignoring malformed column visibility preference");
                (BTreeMap::new(), false)
            }
            None => (BTreeMap::new(), false),
        };

        let mut prefs = Self {
            key: key.to_owned(),
            shown,
        };
        let added = prefs.merge_columns(columns);
        if migrated || added {
            prefs.persist(store);
        }
        prefs
    }

    /// Re-aligns with a new column set after the row store is replaced.
    pub fn reconcile<S: KeyValueStore + ?Sized>(&mut self, store: &mut S, columns: &[String]) {
        if self.merge_columns(columns) {
            self.persist(store);
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn is_shown(&self, column: &str) -> bool {
        self.shown.get(column).copied().unwrap_or(true)
    }

    pub fn as_map(&self) -> &BTreeMap<String, bool> {
        &self.shown
    }

    pub fn hidden_count(&self) -> usize {
        self.shown.values().filter(|shown| !**shown).count()
    }

    pub fn toggle<S: KeyValueStore + ?Sized>(&mut self, store: &mut S, column: &str) -> bool {
        let shown = !self.is_shown(column);
        self.shown.insert(column.to_owned(), shown);
        self.persist(store);
        shown
    }

    pub fn set_all<S: KeyValueStore + ?Sized>(
        &mut self,
        store: &mut S,
        columns: &[String],
        shown: bool,
    ) {
        self.shown = columns
            .iter()
            .map(|column| (column.clone(), shown))
            .collect();
        self.persist(store);
    }

    pub fn reset_to_default<S: KeyValueStore + ?Sized>(&mut self, store: &mut S, columns: &[String]) {
        self.set_all(store, columns, true);
    }

    fn merge_columns(&mut self, columns: &[String]) -> bool {
        // No rows loaded yet: keep the stored flags for when columns arrive.
        if columns.is_empty() {
            return false;
        }
        let current = columns.iter().map(String::as_str).collect::<BTreeSet<_>>();
        self.shown.retain(|column, _| current.contains(column.as_str()));

        let mut added = false;
        for column in columns {
            if !self.shown.contains_key(column) {
                self.shown.insert(column.clone(), true);
                added = true;
            }
        }
        added
    }

    fn persist<S: KeyValueStore + ?Sized>(&self, store: &mut S) {
        write_json(store, &self.key, &self.shown);
    }
}

/// Persisted per-column raw filter text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterPreferences {
    key: String,
}

impl FilterPreferences {
    pub fn new(key: &str) -> Self {
        Self {
            key: key.to_owned(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn load<S: KeyValueStore + ?Sized>(&self, store: &S) -> BTreeMap<String, String> {
        let Some(raw) = read_raw(store, &self.key) else {
            return BTreeMap::new();
        };
        match serde_json::from_str::<Value>(&raw) {
            Ok(Value::Object(entries)) => entries
                .into_iter()
                .filter_map(|(column, text)| match text {
                    Value::String(text) => Some((column, text)),
                    _ => None,
                })
                .collect(),
            _ => {
                warn!(key = %self.key, "ignoring malformed column filter preference");
                BTreeMap::new()
            }
        }
    }

    /// An empty map removes the stored entry.
    pub fn save<S: KeyValueStore + ?Sized>(&self, store: &mut S, filters: &BTreeMap<String, String>) {
        if filters.is_empty() {
            if let Err(error) = store.remove(&self.key) {
                warn!(key = %self.key, "dropping column filter preference failed: {error:#}");
            }
            return;
        }
        write_json(store, &self.key, filters);
    }
}

fn read_raw<S: KeyValueStore + ?Sized>(store: &S, key: &str) -> Option<String> {
    match store.get(key) {
        Ok(raw) => raw,
        Err(error) => {
            warn!(key, "reading preference failed, using defaults: {error:#}");
            None
        }
    }
}

fn decode_visibility(raw: &str) -> Option<StoredVisibility> {
    match serde_json::from_str::<Value>(raw).ok()? {
        Value::Array(items) => Some(StoredVisibility::Legacy(
            items
                .into_iter()
                .filter_map(|item| match item {
                    Value::String(column) => Some(column),
                    _ => None,
                })
                .collect(),
        )),
        Value::Object(entries) => Some(StoredVisibility::Map(
            entries
                .into_iter()
                .filter_map(|(column, shown)| shown.as_bool().map(|shown| (column, shown)))
                .collect(),
        )),
        _ => None,
    }
}

fn write_json<S, T>(store: &mut S, key: &str, value: &T)
where
    S: KeyValueStore + ?Sized,
    T: serde::Serialize,
{
    let raw = match serde_json::to_string(value) {
        Ok(raw) => raw,
        Err(error) => {
            warn!(key, "encoding preference failed: {error}");
            return;
        }
    };
    match store.set(key, &raw) {
        Ok(()) => debug!(key, "preference saved"),
        Err(error) => warn!(key, "saving preference failed, keeping in-memory value: {error:#}"),
    }
}

#[cfg(test)]
mod tests {
    use super::{FilterPreferences, KeyValueStore, PreferenceKeys, VisibilityPreferences};
    use anyhow::{Result, bail};
    use std::collections::BTreeMap;

    #[derive(Debug, Default)]
    struct MapStore {
        entries: BTreeMap<String, String>,
        writes: usize,
        broken: bool,
    }

    impl KeyValueStore for MapStore {
        fn get(&self, key: &str) -> Result<Option<String>> {
            if self.broken {
                bail!("storage disabled");
            }
            Ok(self.entries.get(key).cloned())
        }

        fn set(&mut self, key: &str, value: &str) -> Result<()> {
            if self.broken {
                bail!("quota exceeded");
            }
            self.writes += 1;
            self.entries.insert(key.to_owned(), value.to_owned());
            Ok(())
        }

        fn remove(&mut self, key: &str) -> Result<()> {
            if self.broken {
                bail!("storage disabled");
            }
            self.entries.remove(key);
            Ok(())
        }
    }

    fn columns(names: &[&str]) -> Vec<String> {
        names.iter().map(|name| (*name).to_owned()).collect()
    }

    fn stored_map(store: &MapStore, key: &str) -> serde_json::Value {
        let raw = store.entries.get(key).expect("stored value");
        serde_json::from_str(raw).expect("stored json")
    }

    #[test]
    fn legacy_list_is_migrated_to_map() {
        let mut store = MapStore::default();
        store
            .entries
            .insert("plants.visible_columns".to_owned(), r#"["name","dome"]"#.to_owned());

        let prefs = VisibilityPreferences::load(
            &mut store,
            "plants.visible_columns",
            &columns(&["name", "dome", "qty"]),
        );

        assert!(prefs.is_shown("name"));
        assert!(prefs.is_shown("dome"));
        assert!(prefs.is_shown("qty"));
        assert_eq!(
            stored_map(&store, "plants.visible_columns"),
            serde_json::json!({"name": true, "dome": true, "qty": true})
        );
    }

    #[test]
    fn new_columns_default_shown_and_are_persisted() {
        let mut store = MapStore::default();
        store.entries.insert(
            "plants.visible_columns".to_owned(),
            r#"{"name":true,"notes":false}"#.to_owned(),
        );

        let prefs = VisibilityPreferences::load(
            &mut store,
            "plants.visible_columns",
            &columns(&["name", "notes", "display"]),
        );

        assert!(!prefs.is_shown("notes"));
        assert!(prefs.is_shown("display"));
        assert_eq!(
            stored_map(&store, "plants.visible_columns"),
            serde_json::json!({"name": true, "notes": false, "display": true})
        );
    }

    #[test]
    fn current_map_without_new_columns_is_not_rewritten() {
        let mut store = MapStore::default();
        store.entries.insert(
            "plants.visible_columns".to_owned(),
            r#"{"name":true,"stale":false}"#.to_owned(),
        );

        let prefs =
            VisibilityPreferences::load(&mut store, "plants.visible_columns", &columns(&["name"]));

        assert_eq!(store.writes, 0);
        assert_eq!(prefs.as_map().len(), 1, "stale column pruned in memory");
    }

    #[test]
    fn loading_before_rows_arrive_keeps_hidden_flags() {
        let mut store = MapStore::default();
        store.entries.insert(
            "k".to_owned(),
            r#"{"name":true,"notes":false}"#.to_owned(),
        );

        let mut prefs = VisibilityPreferences::load(&mut store, "k", &[]);
        assert!(!prefs.is_shown("notes"));

        prefs.reconcile(&mut store, &columns(&["name", "notes", "qty"]));
        assert!(!prefs.is_shown("notes"));
        assert_eq!(
            stored_map(&store, "k"),
            serde_json::json!({"name": true, "notes": false, "qty": true})
        );
    }

    #[test]
    fn malformed_visibility_falls_back_to_all_shown() {
        let mut store = MapStore::default();
        store
            .entries
            .insert("plants.visible_columns".to_owned(), "{not json".to_owned());

        let prefs =
            VisibilityPreferences::load(&mut store, "plants.visible_columns", &columns(&["a", "b"]));

        assert!(prefs.is_shown("a") && prefs.is_shown("b"));
        assert_eq!(
            stored_map(&store, "plants.visible_columns"),
            serde_json::json!({"a": true, "b": true})
        );
    }

    #[test]
    fn toggle_and_reset_persist_full_map() {
        let mut store = MapStore::default();
        let cols = columns(&["name", "qty"]);
        let mut prefs = VisibilityPreferences::load(&mut store, "k", &cols);

        assert!(!prefs.toggle(&mut store, "qty"));
        assert_eq!(
            stored_map(&store, "k"),
            serde_json::json!({"name": true, "qty": false})
        );

        prefs.set_all(&mut store, &cols, false);
        assert_eq!(prefs.hidden_count(), 2);

        prefs.reset_to_default(&mut store, &cols);
        assert_eq!(
            stored_map(&store, "k"),
            serde_json::json!({"name": true, "qty": true})
        );
    }

    #[test]
    fn broken_storage_keeps_in_memory_visibility() {
        let mut store = MapStore {
            broken: true,
            ..MapStore::default()
        };
        let cols = columns(&["name", "qty"]);
        let mut prefs = VisibilityPreferences::load(&mut store, "k", &cols);
        assert!(prefs.is_shown("qty"));

        prefs.toggle(&mut store, "qty");
        assert!(!prefs.is_shown("qty"));
    }

    #[test]
    fn filter_preferences_round_trip_and_empty_removes_key() {
        let mut store = MapStore::default();
        let prefs = FilterPreferences::new(&PreferenceKeys::default().filters);
        let filters: BTreeMap<String, String> =
            [("dome".to_owned(), "Tropical".to_owned())].into_iter().collect();

        prefs.save(&mut store, &filters);
        assert_eq!(prefs.load(&store), filters);

        prefs.save(&mut store, &BTreeMap::new());
        assert!(!store.entries.contains_key("plants.column_filters"));
        assert!(prefs.load(&store).is_empty());
    }

    #[test]
    fn filter_preferences_skip_non_string_entries() {
        let mut store = MapStore::default();
        store.entries.insert(
            "plants.column_filters".to_owned(),
            r#"{"dome":"Desert","qty":5}"#.to_owned(),
        );
        let prefs = FilterPreferences::new("plants.column_filters");
        let loaded = prefs.load(&store);
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded.get("dome").map(String::as_str), Some("Desert"));

        store
            .entries
            .insert("plants.column_filters".to_owned(), r#"["dome"]"#.to_owned());
        assert!(prefs.load(&store).is_empty());
    }
}
