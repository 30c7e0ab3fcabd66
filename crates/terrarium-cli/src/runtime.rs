// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use crate::config::{Backend, Config};
use anyhow::{Context, Result, bail};
use serde::Deserialize;
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use terrarium_app::{KeyValueStore, Row, Scope};
use terrarium_db::{JsonFileStore, MemoryStore, Store};
use terrarium_table::{RowSource, collate};
use tracing::{debug, info};

/// Accepts either a bare array of rows or the admin API's `{"plants": [...]}`
/// envelope.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RowPayload {
    Rows(Vec<Row>),
    Envelope { plants: Vec<Row> },
}

impl RowPayload {
    fn into_rows(self) -> Vec<Row> {
        match self {
            Self::Rows(rows) | Self::Envelope { plants: rows } => rows,
        }
    }
}

/// Rows held in memory and served per scope by comparing `scope_field`.
#[derive(Debug, Clone)]
pub struct ScopedRows {
    rows: Vec<Row>,
    scope_field: String,
}

impl ScopedRows {
    pub fn new(rows: Vec<Row>, scope_field: &str) -> Self {
        Self {
            rows,
            scope_field: scope_field.to_owned(),
        }
    }

    pub fn from_json_file(path: &Path, scope_field: &str) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("read rows file {}", path.display()))?;
        let rows = parse_rows(&raw)
            .with_context(|| format!("decode rows file {}", path.display()))?;
        info!(path = %path.display(), rows = rows.len(), "loaded rows file");
        Ok(Self::new(rows, scope_field))
    }
}

impl RowSource for ScopedRows {
    fn scopes(&self) -> Result<Vec<Scope>> {
        let names = self
            .rows
            .iter()
            .map(|row| row.value(&self.scope_field))
            .filter(|value| !value.is_null())
            .map(|value| value.display().trim().to_owned())
            .filter(|name| !name.is_empty() && !name.eq_ignore_ascii_case(Scope::ALL_LABEL))
            .collect::<BTreeSet<_>>();
        let mut names = names.into_iter().collect::<Vec<_>>();
        names.sort_by(|left, right| collate(left, right));
        Ok(std::iter::once(Scope::All)
            .chain(names.into_iter().map(Scope::Named))
            .collect())
    }

    fn fetch(&self, scope: &Scope) -> Result<Vec<Row>> {
        let rows = self
            .rows
            .iter()
            .filter(|row| scope.contains(row.value(&self.scope_field)))
            .cloned()
            .collect::<Vec<_>>();
        debug!(scope = scope.label(), rows = rows.len(), "served rows");
        Ok(rows)
    }
}

pub fn parse_rows(raw: &str) -> Result<Vec<Row>> {
    let payload: RowPayload = serde_json::from_str(raw)
        .context("expected a JSON array of objects or an object with a `plants` array")?;
    Ok(payload.into_rows())
}

/// Opens the configured preference store. Demo runs keep preferences in
/// memory so they never touch real data.
pub fn open_prefs(config: &Config, demo: bool) -> Result<Box<dyn KeyValueStore>> {
    if demo {
        return Ok(Box::new(MemoryStore::new()));
    }
    let path = config.prefs_path()?;
    let store: Box<dyn KeyValueStore> = match config.backend() {
        Backend::Sqlite => Box::new(Store::open(&path).with_context(|| {
            format!(
                "open preferences database {} -- if this path is wrong, set [storage].path or {}",
                path.display(),
                terrarium_db::PREFS_PATH_ENV
            )
        })?),
        Backend::File => Box::new(JsonFileStore::open(&path).with_context(|| {
            format!(
                "open preferences file {} -- if this path is wrong, set [storage].path or {}",
                path.display(),
                terrarium_db::PREFS_PATH_ENV
            )
        })?),
    };
    debug!(backend = config.backend().as_str(), path = %path.display(), "opened preferences");
    Ok(store)
}

pub fn require_scope(source: &dyn RowSource, scope: &Scope) -> Result<()> {
    if matches!(scope, Scope::All) {
        return Ok(());
    }
    let scopes = source.scopes()?;
    if !scopes.contains(scope) {
        let known = scopes
            .iter()
            .map(Scope::label)
            .collect::<Vec<_>>()
            .join(", ");
        bail!("unknown scope {:?}; available: {known}", scope.label());
    }
    Ok(())
}
