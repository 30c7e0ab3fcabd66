// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use crate::{FilterState, PageState, Scope, SortState};
use std::collections::BTreeMap;

/// Session-local explorer state. Transitions never mutate in place; each
/// command yields a fresh snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ExplorerState {
    pub scope: Scope,
    pub filters: FilterState,
    pub sort: Option<SortState>,
    pub page: PageState,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExplorerCommand {
    SetQuery(String),
    SetColumnFilter { column: String, text: String },
    ClearColumnFilter(String),
    ClearColumnFilters,
    ToggleSort(String),
    ClearSort,
    SetPage(usize),
    NextPage,
    PrevPage,
    SetScope(Scope),
    ResetAll,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExplorerEvent {
    QueryChanged(String),
    ColumnFilterChanged {
        column: String,
        text: Option<String>,
    },
    ColumnFiltersCleared,
    SortChanged(Option<SortState>),
    PageChanged(usize),
    ScopeChanged(Scope),
    Reset,
    StatusUpdated(String),
}

impl ExplorerState {
    pub fn new(scope: Scope, page_size: usize) -> Self {
        Self {
            scope,
            filters: FilterState::default(),
            sort: None,
            page: PageState::new(page_size),
        }
    }

    pub fn with_column_filters(mut self, columns: BTreeMap<String, String>) -> Self {
        for (column, text) in columns {
            self.filters = self.filters.with_column(&column, &text);
        }
        self
    }

    /// Pulls the page index back inside `0..total_pages` (page 0 when empty).
    pub fn with_page_clamped(mut self, total_pages: usize) -> Self {
        self.page.index = self.page.index.min(total_pages.saturating_sub(1));
        self
    }

    pub fn apply(&self, command: ExplorerCommand) -> (Self, Vec<ExplorerEvent>) {
        let mut next = self.clone();
        let events = match command {
            ExplorerCommand::SetQuery(query) => {
                if next.filters.query == query {
                    return (next, Vec::new());
                }
                next.filters.query = query.clone();
                let status = match next.filters.active_query() {
                    Some(active) => format!("search: {active}"),
                    None => "search cleared".to_owned(),
                };
                vec![
                    ExplorerEvent::QueryChanged(query),
                    next.reset_page(),
                    ExplorerEvent::StatusUpdated(status),
                ]
            }
            ExplorerCommand::SetColumnFilter { column, text } => {
                next.filters = next.filters.with_column(&column, &text);
                if next.filters.columns == self.filters.columns {
                    return (next, Vec::new());
                }
                let committed = next.filters.column(&column).map(str::to_owned);
                let status = match &committed {
                    Some(text) => format!("filter {column}: {}", text.trim()),
                    None => format!("filter {column} cleared"),
                };
                vec![
                    ExplorerEvent::ColumnFilterChanged {
                        column,
                        text: committed,
                    },
                    next.reset_page(),
                    ExplorerEvent::StatusUpdated(status),
                ]
            }
            ExplorerCommand::ClearColumnFilter(column) => {
                return self.apply(ExplorerCommand::SetColumnFilter {
                    column,
                    text: String::new(),
                });
            }
            ExplorerCommand::ClearColumnFilters => {
                if next.filters.columns.is_empty() {
                    return (next, Vec::new());
                }
                next.filters.columns.clear();
                vec![
                    ExplorerEvent::ColumnFiltersCleared,
                    next.reset_page(),
                    ExplorerEvent::StatusUpdated("column filters cleared".to_owned()),
                ]
            }
            ExplorerCommand::ToggleSort(column) => {
                next.sort = SortState::cycle(self.sort.as_ref(), &column);
                let status = match &next.sort {
                    Some(sort) => format!("sort {} {}", sort.column, sort.direction.as_str()),
                    None => "sort cleared".to_owned(),
                };
                vec![
                    ExplorerEvent::SortChanged(next.sort.clone()),
                    next.reset_page(),
                    ExplorerEvent::StatusUpdated(status),
                ]
            }
            ExplorerCommand::ClearSort => {
                if next.sort.is_none() {
                    return (next, Vec::new());
                }
                next.sort = None;
                vec![
                    ExplorerEvent::SortChanged(None),
                    next.reset_page(),
                    ExplorerEvent::StatusUpdated("sort cleared".to_owned()),
                ]
            }
            ExplorerCommand::SetPage(index) => next.move_page(index),
            ExplorerCommand::NextPage => next.move_page(self.page.index.saturating_add(1)),
            ExplorerCommand::PrevPage => next.move_page(self.page.index.saturating_sub(1)),
            ExplorerCommand::SetScope(scope) => {
                if next.scope == scope {
                    return (next, Vec::new());
                }
                next.scope = scope.clone();
                let status = format!("scope {}", scope.label());
                vec![
                    ExplorerEvent::ScopeChanged(scope),
                    next.reset_page(),
                    ExplorerEvent::StatusUpdated(status),
                ]
            }
            ExplorerCommand::ResetAll => {
                next = Self::new(self.scope.clone(), self.page.size);
                vec![
                    ExplorerEvent::Reset,
                    ExplorerEvent::StatusUpdated("reset".to_owned()),
                ]
            }
        };
        (next, events)
    }

    fn reset_page(&mut self) -> ExplorerEvent {
        self.page.index = 0;
        ExplorerEvent::PageChanged(0)
    }

    fn move_page(&mut self, index: usize) -> Vec<ExplorerEvent> {
        if self.page.index == index {
            return Vec::new();
        }
        self.page.index = index;
        vec![
            ExplorerEvent::PageChanged(index),
            ExplorerEvent::StatusUpdated(format!("page {}", index + 1)),
        ]
    }
}
