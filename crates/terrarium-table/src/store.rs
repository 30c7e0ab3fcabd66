// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::sync::Arc;
use terrarium_app::{Row, Scope};

/// Immutable snapshot of every fetched row for one scope. Refetching builds a
/// new store; nothing edits one in place.
#[derive(Debug, Clone, PartialEq)]
pub struct RowStore {
    scope: Scope,
    rows: Arc<[Row]>,
}

impl RowStore {
    pub fn new(scope: Scope, rows: Vec<Row>) -> Self {
        Self {
            scope,
            rows: rows.into(),
        }
    }

    pub fn empty(scope: Scope) -> Self {
        Self::new(scope, Vec::new())
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn get(&self, index: usize) -> Option<&Row> {
        self.rows.get(index)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::RowStore;
    use terrarium_app::{Row, Scope};

    #[test]
    fn clones_share_rows() {
        let store = RowStore::new(Scope::All, vec![Row::new().with("name", "Fern")]);
        let copy = store.clone();
        assert!(std::ptr::eq(store.rows().as_ptr(), copy.rows().as_ptr()));
        assert_eq!(copy.len(), 1);
        assert!(copy.get(1).is_none());
    }
}
