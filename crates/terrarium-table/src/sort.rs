// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use crate::columns::{ColumnRegistry, Comparator};
use std::cmp::Ordering;
use terrarium_app::{ColumnValue, Row, SortDirection, SortState};

/// Orders `indices` (positions into `rows`) by the active sort. Missing values
/// always land at the end, whatever the direction. Equal rows keep their
/// incoming order.
pub fn apply_sort(
    rows: &[Row],
    indices: &mut [usize],
    registry: &ColumnRegistry,
    sort: Option<&SortState>,
) {
    let Some(sort) = sort else {
        return;
    };
    let comparator = registry.comparator_for(&sort.column);
    indices.sort_by(|left, right| {
        let left_value = rows.get(*left).map_or(ColumnValue::null(), |row| row.value(&sort.column));
        let right_value = rows
            .get(*right)
            .map_or(ColumnValue::null(), |row| row.value(&sort.column));
        match (left_value.is_null(), right_value.is_null()) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Greater,
            (false, true) => Ordering::Less,
            (false, false) => {
                let order = compare_values(comparator, left_value, right_value);
                match sort.direction {
                    SortDirection::Asc => order,
                    SortDirection::Desc => order.reverse(),
                }
            }
        }
    });
}

/// Sorted copy of `rows`; convenience for callers without an index view.
pub fn sort_rows(rows: &[Row], registry: &ColumnRegistry, sort: Option<&SortState>) -> Vec<Row> {
    let mut indices = (0..rows.len()).collect::<Vec<_>>();
    apply_sort(rows, &mut indices, registry, sort);
    indices
        .into_iter()
        .filter_map(|index| rows.get(index).cloned())
        .collect()
}

/// Ascending comparison of two non-null values.
pub fn compare_values(comparator: Comparator, left: &ColumnValue, right: &ColumnValue) -> Ordering {
    match comparator {
        Comparator::Numeric => {
            compare_parsed(left.as_number(), right.as_number(), left, right, f64::total_cmp)
        }
        Comparator::Date => compare_parsed(
            left.as_timestamp(),
            right.as_timestamp(),
            left,
            right,
            |left, right| left.cmp(right),
        ),
        Comparator::Quantity => compare_parsed(
            lenient_number(&left.display()),
            lenient_number(&right.display()),
            left,
            right,
            f64::total_cmp,
        ),
        Comparator::Boolean => left.coerce_bool().cmp(&right.coerce_bool()),
        Comparator::Text => collate(&left.display(), &right.display()),
    }
}

/// Keeps only digits and `.` and parses the longest number at the front of
/// what is left, so `"6+"` reads as 6 and `"1.5 trays."` as 1.5.
pub fn lenient_number(raw: &str) -> Option<f64> {
    let mut seen_dot = false;
    let prefix = raw
        .chars()
        .filter(|ch| ch.is_ascii_digit() || *ch == '.')
        .take_while(|ch| {
            if *ch != '.' {
                return true;
            }
            let first = !seen_dot;
            seen_dot = true;
            first
        })
        .collect::<String>();
    let prefix = prefix.trim_end_matches('.');
    if !prefix.bytes().any(|byte| byte.is_ascii_digit()) {
        return None;
    }
    prefix.parse::<f64>().ok().filter(|value| value.is_finite())
}

/// Case-folded comparison, falling back to the raw text so distinct strings
/// never compare equal.
pub fn collate(left: &str, right: &str) -> Ordering {
    left.chars()
        .flat_map(char::to_lowercase)
        .cmp(right.chars().flat_map(char::to_lowercase))
        .then_with(|| left.cmp(right))
}

fn compare_parsed<T>(
    left: Option<T>,
    right: Option<T>,
    left_value: &ColumnValue,
    right_value: &ColumnValue,
    cmp: impl Fn(&T, &T) -> Ordering,
) -> Ordering {
    match (left, right) {
        (Some(left), Some(right)) => cmp(&left, &right)
            .then_with(|| collate(&left_value.display(), &right_value.display())),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => collate(&left_value.display(), &right_value.display()),
    }
}
