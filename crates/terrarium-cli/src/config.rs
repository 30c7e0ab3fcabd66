// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use terrarium_app::{DEFAULT_DATASET, DEFAULT_PAGE_SIZE, DEFAULT_QUANTITY_COLUMN, PreferenceKeys};
use terrarium_table::ExplorerOptions;
use tracing_subscriber::EnvFilter;

const CONFIG_VERSION: i64 = 1;
pub const CONFIG_PATH_ENV: &str = "TERRARIUM_CONFIG_PATH";
const MAX_PAGE_SIZE: usize = 1000;
const DEFAULT_SCOPE_FIELD: &str = "dome";
const DEFAULT_LOG_LEVEL: &str = "warn";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub version: i64,
    #[serde(default)]
    pub storage: Storage,
    #[serde(default)]
    pub table: Table,
    #[serde(default)]
    pub log: Log,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            storage: Storage::default(),
            table: Table::default(),
            log: Log::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    #[default]
    Sqlite,
    File,
}

impl Backend {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Sqlite => "sqlite",
            Self::File => "file",
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Storage {
    #[serde(default)]
    pub backend: Backend,
    pub path: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Table {
    pub page_size: Option<usize>,
    pub quantity_column: Option<String>,
    pub scope_field: Option<String>,
    pub dataset: Option<String>,
}

impl Default for Table {
    fn default() -> Self {
        Self {
            page_size: Some(DEFAULT_PAGE_SIZE),
            quantity_column: Some(DEFAULT_QUANTITY_COLUMN.to_owned()),
            scope_field: Some(DEFAULT_SCOPE_FIELD.to_owned()),
            dataset: Some(DEFAULT_DATASET.to_owned()),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Log {
    pub level: Option<String>,
}

impl Config {
    pub fn default_path() -> Result<PathBuf> {
        if let Some(path) = env::var_os(CONFIG_PATH_ENV) {
            return Ok(PathBuf::from(path));
        }

        let config_root = dirs::config_dir().ok_or_else(|| {
            anyhow!("cannot resolve config directory; set {CONFIG_PATH_ENV} to the config file")
        })?;

        let app_dir = config_root.join(terrarium_db::APP_NAME);
        fs::create_dir_all(&app_dir)
            .with_context(|| format!("create config directory {}", app_dir.display()))?;
        Ok(app_dir.join("config.toml"))
    }

    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = fs::read_to_string(path)
            .with_context(|| format!("read config file {}", path.display()))?;
        let value: toml::Value = toml::from_str(&raw)
            .with_context(|| format!("parse TOML config {}", path.display()))?;

        let version = value
            .get("version")
            .and_then(toml::Value::as_integer)
            .ok_or_else(|| {
                anyhow!(
                    "config file {} is not versioned. Add `version = 1` and put values under [storage], [table], and [log]",
                    path.display()
                )
            })?;

        if version != CONFIG_VERSION {
            bail!(
                "unsupported config version {} in {}; expected version = 1",
                version,
                path.display()
            );
        }

        let config: Config = value
            .try_into()
            .with_context(|| format!("decode config {}", path.display()))?;
        config.validate(path)?;
        Ok(config)
    }

    fn validate(&self, path: &Path) -> Result<()> {
        if let Some(prefs_path) = &self.storage.path {
            if self.storage.backend == Backend::Sqlite {
                terrarium_db::validate_db_path(prefs_path)?;
            } else if prefs_path.trim().is_empty() {
                bail!("storage.path in {} must not be empty", path.display());
            }
        }

        if let Some(page_size) = self.table.page_size
            && !(1..=MAX_PAGE_SIZE).contains(&page_size)
        {
            bail!(
                "table.page_size in {} must be between 1 and {MAX_PAGE_SIZE}, got {page_size}",
                path.display()
            );
        }

        for (name, value) in [
            ("table.quantity_column", &self.table.quantity_column),
            ("table.scope_field", &self.table.scope_field),
        ] {
            if let Some(value) = value
                && value.trim().is_empty()
            {
                bail!("{name} in {} must not be blank", path.display());
            }
        }

        if let Some(dataset) = &self.table.dataset {
            validate_dataset(dataset)
                .with_context(|| format!("invalid table.dataset in {}", path.display()))?;
        }

        if let Some(level) = &self.log.level {
            EnvFilter::try_new(level).with_context(|| {
                format!("invalid log.level {level:?} in {}", path.display())
            })?;
        }

        Ok(())
    }

    /// Explicit `storage.path` wins; otherwise the platform default for the
    /// backend, which `TERRARIUM_PREFS_PATH` overrides.
    pub fn prefs_path(&self) -> Result<PathBuf> {
        match (&self.storage.path, self.storage.backend) {
            (Some(path), _) => Ok(PathBuf::from(path)),
            (None, Backend::Sqlite) => terrarium_db::default_db_path(),
            (None, Backend::File) => terrarium_db::default_file_path(),
        }
    }

    pub fn backend(&self) -> Backend {
        self.storage.backend
    }

    pub fn page_size(&self) -> usize {
        self.table.page_size.unwrap_or(DEFAULT_PAGE_SIZE)
    }

    pub fn quantity_column(&self) -> &str {
        self.table
            .quantity_column
            .as_deref()
            .unwrap_or(DEFAULT_QUANTITY_COLUMN)
    }

    pub fn scope_field(&self) -> &str {
        self.table
            .scope_field
            .as_deref()
            .unwrap_or(DEFAULT_SCOPE_FIELD)
    }

    pub fn dataset(&self) -> &str {
        self.table.dataset.as_deref().unwrap_or(DEFAULT_DATASET)
    }

    pub fn log_level(&self) -> &str {
        self.log.level.as_deref().unwrap_or(DEFAULT_LOG_LEVEL)
    }

    pub fn explorer_options(&self) -> ExplorerOptions {
        ExplorerOptions {
            page_size: self.page_size(),
            quantity_column: Some(self.quantity_column().to_owned()),
            keys: PreferenceKeys::for_dataset(self.dataset()),
        }
    }

    pub fn example_config(path: &Path) -> String {
        format!(
            "# terrarium config\n# Place this file at: {}\n\nversion = 1\n\n[storage]\n# sqlite or file\nbackend = \"sqlite\"\n# Optional. Default is the platform data dir (for example ~/.local/share/terrarium/preferences.db)\n# path = \"/absolute/path/to/preferences.db\"\n\n[table]\npage_size = {DEFAULT_PAGE_SIZE}\nquantity_column = \"{DEFAULT_QUANTITY_COLUMN}\"\nscope_field = \"{DEFAULT_SCOPE_FIELD}\"\n# Namespace for saved column visibility and filters\ndataset = \"{DEFAULT_DATASET}\"\n\n[log]\n# TERRARIUM_LOG overrides this\nlevel = \"{DEFAULT_LOG_LEVEL}\"\n",
            path.display(),
        )
    }
}

fn validate_dataset(dataset: &str) -> Result<()> {
    if dataset.is_empty() {
        bail!("dataset name must not be empty");
    }
    if let Some(bad) = dataset.chars().find(|ch| {
        !(ch.is_ascii_lowercase() || ch.is_ascii_digit() || matches!(ch, '_' | '.' | '-'))
    }) {
        bail!("dataset name {dataset:?} contains {bad:?}; use lowercase letters, digits, '_', '.', or '-'");
    }
    Ok(())
}
