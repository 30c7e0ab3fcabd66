// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

mod file;
mod memory;

pub use file::JsonFileStore;
pub use memory::MemoryStore;

use anyhow::{Context, Result, anyhow, bail};
use rusqlite::{Connection, OptionalExtension, params};
use std::collections::BTreeSet;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use terrarium_app::KeyValueStore;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tracing::debug;

pub const APP_NAME: &str = "terrarium";
pub const PREFS_PATH_ENV: &str = "TERRARIUM_PREFS_PATH";

const PREFERENCES_TABLE: &str = "preferences";
const REQUIRED_COLUMNS: [&str; 3] = ["key", "value", "updated_at"];
const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS preferences (
  key TEXT PRIMARY KEY,
  value TEXT NOT NULL,
  updated_at TEXT NOT NULL
);
";

/// SQLite-backed preference store. One row per key.
pub struct Store {
    conn: Connection,
}

impl Store {
    pub fn open(path: &Path) -> Result<Self> {
        let printable = path.to_string_lossy().to_string();
        validate_db_path(&printable)?;
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("create directory {}", parent.display()))?;
        }
        let conn = Connection::open(path)
            .with_context(|| format!("open database at {}", path.display()))?;
        configure_connection(&conn)?;
        let store = Self { conn };
        store.bootstrap()?;
        Ok(store)
    }

    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("open in-memory database")?;
        configure_connection(&conn)?;
        let store = Self { conn };
        store.bootstrap()?;
        Ok(store)
    }

    pub fn raw_connection(&self) -> &Connection {
        &self.conn
    }

    /// Creates the preferences table if needed and checks an existing one has
    /// the expected columns.
    pub fn bootstrap(&self) -> Result<()> {
        self.conn
            .execute_batch(SCHEMA)
            .context("create preferences table")?;

        let columns = table_columns(&self.conn, PREFERENCES_TABLE)?;
        let missing = REQUIRED_COLUMNS
            .iter()
            .copied()
            .filter(|column| !columns.contains(*column))
            .collect::<Vec<_>>();
        if !missing.is_empty() {
            bail!(
                "table `{PREFERENCES_TABLE}` is missing required columns: {}; point storage.path at a terrarium preferences database",
                missing.join(", ")
            );
        }
        Ok(())
    }

    pub fn keys(&self) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT key FROM preferences ORDER BY key ASC")
            .context("prepare preference key query")?;
        let rows = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .context("query preference keys")?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .context("collect preference keys")
    }

    pub fn updated_at(&self, key: &str) -> Result<Option<OffsetDateTime>> {
        let raw = self
            .conn
            .query_row(
                "SELECT updated_at FROM preferences WHERE key = ?",
                params![key],
                |row| row.get::<_, String>(0),
            )
            .optional()
            .with_context(|| format!("read timestamp for preference {key}"))?;
        raw.map(|raw| {
            OffsetDateTime::parse(&raw, &Rfc3339)
                .with_context(|| format!("parse timestamp {raw:?} for preference {key}"))
        })
        .transpose()
    }
}

impl KeyValueStore for Store {
    fn get(&self, key: &str) -> Result<Option<String>> {
        self.conn
            .query_row(
                "SELECT value FROM preferences WHERE key = ?",
                params![key],
                |row| row.get::<_, String>(0),
            )
            .optional()
            .with_context(|| format!("read preference {key}"))
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let now = now_rfc3339()?;
        self.conn
            .execute(
                "
                INSERT INTO preferences (key, value, updated_at)
                VALUES (?, ?, ?)
                ON CONFLICT(key) DO UPDATE SET
                  value = excluded.value,
                  updated_at = excluded.updated_at
                ",
                params![key, value, now],
            )
            .with_context(|| format!("upsert preference {key}"))?;
        debug!(key, "preference written");
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        self.conn
            .execute("DELETE FROM preferences WHERE key = ?", params![key])
            .with_context(|| format!("delete preference {key}"))?;
        Ok(())
    }
}

/// `preferences.db` under the platform data directory, unless
/// `TERRARIUM_PREFS_PATH` points elsewhere.
pub fn default_db_path() -> Result<PathBuf> {
    default_prefs_path("preferences.db")
}

/// `preferences.json` under the platform data directory, unless
/// `TERRARIUM_PREFS_PATH` points elsewhere.
pub fn default_file_path() -> Result<PathBuf> {
    default_prefs_path("preferences.json")
}

fn default_prefs_path(file_name: &str) -> Result<PathBuf> {
    if let Some(override_path) = env::var_os(PREFS_PATH_ENV) {
        return Ok(PathBuf::from(override_path));
    }

    let data_root = dirs::data_local_dir().ok_or_else(|| {
        anyhow!("cannot resolve data directory; set {PREFS_PATH_ENV} to a writable preferences path")
    })?;

    let app_dir = data_root.join(APP_NAME);
    fs::create_dir_all(&app_dir)
        .with_context(|| format!("create data directory {}", app_dir.display()))?;
    Ok(app_dir.join(file_name))
}

pub fn validate_db_path(path: &str) -> Result<()> {
    if path.is_empty() {
        bail!("database path must not be empty");
    }
    if path == ":memory:" {
        return Ok(());
    }

    if let Some(index) = path.find("://")
        && index > 0
    {
        let scheme = &path[..index];
        if scheme.chars().all(char::is_alphabetic) {
            bail!(
                "database path {path:?} looks like a URI ({scheme}://); pass a filesystem path instead"
            );
        }
    }

    if path.starts_with("file:") {
        bail!("database path {path:?} uses file: URI syntax; pass a plain filesystem path");
    }

    if path.contains('?') {
        bail!(
            "database path {path:?} contains '?'; remove query parameters and use a plain file path"
        );
    }

    Ok(())
}

fn configure_connection(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        PRAGMA journal_mode = WAL;
        PRAGMA synchronous = NORMAL;
        PRAGMA busy_timeout = 5000;
        ",
    )
    .context("configure sqlite pragmas")
}

fn table_columns(conn: &Connection, table: &str) -> Result<BTreeSet<String>> {
    let mut stmt = conn
        .prepare(&format!("PRAGMA table_info({table})"))
        .with_context(|| format!("inspect columns for {table}"))?;
    let rows = stmt
        .query_map([], |row| row.get::<_, String>(1))
        .with_context(|| format!("query column info for {table}"))?;

    rows.collect::<rusqlite::Result<BTreeSet<_>>>()
        .with_context(|| format!("collect columns for {table}"))
}

fn now_rfc3339() -> Result<String> {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .context("format current timestamp")
}

#[cfg(test)]
mod tests {
    use super::Store;
    use anyhow::Result;
    use terrarium_app::KeyValueStore;

    #[test]
    fn upsert_replaces_value_and_keeps_one_row() -> Result<()> {
        let mut store = Store::open_memory()?;

        store.set("plants.visible_columns", r#"{"qty":true}"#)?;
        store.set("plants.visible_columns", r#"{"qty":false}"#)?;

        assert_eq!(
            store.get("plants.visible_columns")?.as_deref(),
            Some(r#"{"qty":false}"#)
        );
        assert_eq!(store.keys()?, vec!["plants.visible_columns".to_owned()]);
        assert!(store.updated_at("plants.visible_columns")?.is_some());
        Ok(())
    }

    #[test]
    fn remove_is_idempotent() -> Result<()> {
        let mut store = Store::open_memory()?;
        store.set("plants.column_filters", "{}")?;
        store.remove("plants.column_filters")?;
        store.remove("plants.column_filters")?;
        assert_eq!(store.get("plants.column_filters")?, None);
        assert_eq!(store.updated_at("plants.column_filters")?, None);
        Ok(())
    }

    #[test]
    fn bootstrap_rejects_foreign_preferences_table() -> Result<()> {
        let store = Store::open_memory()?;
        store.raw_connection().execute_batch(
            "
            DROP TABLE preferences;
            CREATE TABLE preferences (key TEXT PRIMARY KEY, value TEXT NOT NULL);
            ",
        )?;

        let error = store.bootstrap().err().map(|error| error.to_string());
        assert!(
            error
                .as_deref()
                .is_some_and(|message| message.contains("missing required columns: updated_at")),
            "unexpected error: {error:?}"
        );
        Ok(())
    }
}
