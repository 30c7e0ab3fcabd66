// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use crate::columns::ColumnRegistry;
use terrarium_app::{ColumnKind, FilterState, Row};

#[derive(Debug, Clone, PartialEq, Eq)]
enum ColumnPredicate {
    Flag(bool),
    Contains(String),
    Nothing,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct ColumnClause {
    column: String,
    predicate: ColumnPredicate,
}

impl ColumnClause {
    fn matches(&self, row: &Row) -> bool {
        let value = row.value(&self.column);
        match &self.predicate {
            ColumnPredicate::Flag(expected) => value.coerce_bool() == *expected,
            ColumnPredicate::Contains(needle) => {
                !value.is_null() && value.display().to_lowercase().contains(needle.as_str())
            }
            ColumnPredicate::Nothing => false,
        }
    }
}

/// Conjunction of the global search and every active column filter, compiled
/// once per recompute.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RowFilter {
    query: Option<String>,
    clauses: Vec<ColumnClause>,
}

impl RowFilter {
    /// Filters on columns the registry does not know are skipped. With no
    /// rows loaded yet every filter is kept.
    pub fn compile(registry: &ColumnRegistry, filters: &FilterState) -> Self {
        let query = filters.active_query().map(str::to_lowercase);
        let clauses = filters
            .active_columns()
            .filter(|(column, _)| registry.is_empty() || registry.contains(column))
            .map(|(column, text)| ColumnClause {
                column: column.to_owned(),
                predicate: column_predicate(registry.kind_of(column), text),
            })
            .collect();
        Self { query, clauses }
    }

    /// Same as [`RowFilter::compile`] with `column` taking `text` instead of
    /// its committed value.
    pub fn compile_with_override(
        registry: &ColumnRegistry,
        filters: &FilterState,
        column: &str,
        text: &str,
    ) -> Self {
        let overridden = filters.clone().with_column(column, text);
        Self::compile(registry, &overridden)
    }

    pub fn is_empty(&self) -> bool {
        self.query.is_none() && self.clauses.is_empty()
    }

    pub fn matches(&self, row: &Row) -> bool {
        if let Some(query) = &self.query
            && !row_contains(row, query)
        {
            return false;
        }
        self.clauses.iter().all(|clause| clause.matches(row))
    }
}

/// Indices of the rows that pass every active predicate, in store order.
pub fn apply_filters(rows: &[Row], registry: &ColumnRegistry, filters: &FilterState) -> Vec<usize> {
    let filter = RowFilter::compile(registry, filters);
    if filter.is_empty() {
        return (0..rows.len()).collect();
    }
    rows.iter()
        .enumerate()
        .filter(|(_, row)| filter.matches(row))
        .map(|(index, _)| index)
        .collect()
}

/// Result count if `column` were filtered by the uncommitted `text`, combined
/// with the committed search and every other committed column filter.
pub fn preview_count(
    rows: &[Row],
    registry: &ColumnRegistry,
    filters: &FilterState,
    column: &str,
    text: &str,
) -> usize {
    let filter = RowFilter::compile_with_override(registry, filters, column, text);
    rows.iter().filter(|row| filter.matches(row)).count()
}

pub fn parse_flag(text: &str) -> Option<bool> {
    match text.trim().to_lowercase().as_str() {
        "yes" | "true" => Some(true),
        "no" | "false" => Some(false),
        _ => None,
    }
}

fn column_predicate(kind: ColumnKind, text: &str) -> ColumnPredicate {
    match kind {
        ColumnKind::Boolean => parse_flag(text).map_or(ColumnPredicate::Nothing, ColumnPredicate::Flag),
        ColumnKind::Numeric | ColumnKind::Date | ColumnKind::Text => {
            ColumnPredicate::Contains(text.trim().to_lowercase())
        }
    }
}

fn row_contains(row: &Row, needle: &str) -> bool {
    row.fields()
        .any(|(_, value)| !value.is_null() && value.display().to_lowercase().contains(needle))
}

#[cfg(test)]
mod tests {
    use super::{RowFilter, apply_filters, parse_flag, preview_count};
    use crate::columns::ColumnRegistry;
    use terrarium_app::{ColumnValue, FilterState, Row};

    fn rows() -> Vec<Row> {
        vec![
            Row::new()
                .with("common_name", "Bird of Paradise")
                .with("dome", "Tropical Dome")
                .with("display", true)
                .with("notes", "healthy"),
            Row::new()
                .with("common_name", "Golden Barrel")
                .with("dome", "Desert Dome")
                .with("display", false)
                .with("notes", ColumnValue::Null),
            Row::new()
                .with("common_name", "Banana")
                .with("dome", "Tropical Dome")
                .with("display", "false")
                .with("notes", "needs repotting"),
        ]
    }

    fn registry(rows: &[Row]) -> ColumnRegistry {
        ColumnRegistry::derive(rows, None)
    }

    #[test]
    fn no_filters_keeps_store_order() {
        let rows = rows();
        let kept = apply_filters(&rows, &registry(&rows), &FilterState::default());
        assert_eq!(kept, vec![0, 1, 2]);
    }

    #[test]
    fn global_query_matches_any_field_case_insensitively() {
        let rows = rows();
        let filters = FilterState {
            query: "  DESERT ".to_owned(),
            ..FilterState::default()
        };
        assert_eq!(apply_filters(&rows, &registry(&rows), &filters), vec![1]);
    }

    #[test]
    fn global_query_matches_boolean_text_form() {
        let rows = rows();
        let filters = FilterState {
            query: "true".to_owned(),
            ..FilterState::default()
        };
        assert_eq!(apply_filters(&rows, &registry(&rows), &filters), vec![0]);
    }

    #[test]
    fn null_fields_never_match_column_filters() {
        let rows = rows();
        let filters = FilterState::default().with_column("notes", "e");
        assert_eq!(apply_filters(&rows, &registry(&rows), &filters), vec![0, 2]);
    }

    #[test]
    fn boolean_columns_accept_yes_no_true_false() {
        let rows = rows();
        let registry = registry(&rows);
        let yes = FilterState::default().with_column("display", "Yes");
        assert_eq!(apply_filters(&rows, &registry, &yes), vec![0]);
        let no = FilterState::default().with_column("display", "FALSE");
        assert_eq!(apply_filters(&rows, &registry, &no), vec![1, 2]);
        let unknown = FilterState::default().with_column("display", "maybe");
        assert!(apply_filters(&rows, &registry, &unknown).is_empty());
    }

    #[test]
    fn predicates_combine_conjunctively() {
        let rows = rows();
        let filters = FilterState {
            query: "a".to_owned(),
            ..FilterState::default()
        }
        .with_column("dome", "tropical")
        .with_column("notes", "repot");
        assert_eq!(apply_filters(&rows, &registry(&rows), &filters), vec![2]);
    }

    #[test]
    fn preview_overrides_one_column_without_touching_committed_state() {
        let rows = rows();
        let registry = registry(&rows);
        let committed = FilterState::default().with_column("dome", "Tropical");

        let count = preview_count(&rows, &registry, &committed, "notes", "healthy");
        let joint = committed.clone().with_column("notes", "healthy");

        assert_eq!(count, apply_filters(&rows, &registry, &joint).len());
        assert_eq!(count, 1);
        assert_eq!(committed.columns.len(), 1);
    }

    #[test]
    fn preview_with_blank_text_drops_that_column() {
        let rows = rows();
        let registry = registry(&rows);
        let committed = FilterState::default()
            .with_column("dome", "Tropical")
            .with_column("notes", "healthy");
        assert_eq!(preview_count(&rows, &registry, &committed, "notes", " "), 2);
    }

    #[test]
    fn filter_on_column_outside_registry_is_skipped() {
        let rows = vec![Row::new().with("name", "Fern"), Row::new().with("name", "Ivy").with("zone", "5b")];
        let registry = ColumnRegistry::derive(&rows, None);
        let filters = FilterState::default()
            .with_column("height", "5")
            .with_column("zone", "5B");
        assert_eq!(apply_filters(&rows, &registry, &filters), vec![0, 1]);
        assert_eq!(preview_count(&rows, &registry, &filters, "name", "ivy"), 1);

        let empty = ColumnRegistry::derive(&[], None);
        assert!(!RowFilter::compile(&empty, &filters).is_empty());
    }

    #[test]
    fn parse_flag_is_strict() {
        assert_eq!(parse_flag(" YES "), Some(true));
        assert_eq!(parse_flag("false"), Some(false));
        assert_eq!(parse_flag("y"), None);
        assert!(RowFilter::default().is_empty());
    }
}
