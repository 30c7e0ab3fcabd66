// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use terrarium_app::{ColumnKind, Row};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparator {
    Numeric,
    Boolean,
    Date,
    Quantity,
    Text,
}

impl Comparator {
    pub const fn for_kind(kind: ColumnKind) -> Self {
        match kind {
            ColumnKind::Boolean => Self::Boolean,
            ColumnKind::Numeric => Self::Numeric,
            ColumnKind::Date => Self::Date,
            ColumnKind::Text => Self::Text,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSpec {
    pub name: String,
    pub kind: ColumnKind,
    pub comparator: Comparator,
}

/// Ordered columns of the current row store, with kinds inferred once from
/// the first row.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ColumnRegistry {
    columns: Vec<ColumnSpec>,
}

impl ColumnRegistry {
    pub fn derive(rows: &[Row], quantity_column: Option<&str>) -> Self {
        let Some(sample) = rows.first() else {
            return Self::default();
        };
        let columns = sample
            .fields()
            .map(|(name, value)| {
                let kind = ColumnKind::infer(value);
                let comparator = if quantity_column == Some(name) {
                    Comparator::Quantity
                } else {
                    Comparator::for_kind(kind)
                };
                ColumnSpec {
                    name: name.to_owned(),
                    kind,
                    comparator,
                }
            })
            .collect();
        Self { columns }
    }

    pub fn columns(&self) -> &[ColumnSpec] {
        &self.columns
    }

    pub fn names(&self) -> Vec<String> {
        self.columns.iter().map(|spec| spec.name.clone()).collect()
    }

    pub fn get(&self, name: &str) -> Option<&ColumnSpec> {
        self.columns.iter().find(|spec| spec.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Unknown columns are treated as text.
    pub fn kind_of(&self, name: &str) -> ColumnKind {
        self.get(name).map_or(ColumnKind::Text, |spec| spec.kind)
    }

    pub fn comparator_for(&self, name: &str) -> Comparator {
        self.get(name).map_or(Comparator::Text, |spec| spec.comparator)
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}
