// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use crate::columns::ColumnRegistry;
use crate::filter::{apply_filters, preview_count};
use crate::paging::{paginate, total_pages};
use crate::sort::apply_sort;
use crate::store::RowStore;
use anyhow::{Context, Result};
use terrarium_app::{
    ColumnKind, DEFAULT_PAGE_SIZE, DEFAULT_QUANTITY_COLUMN, ExplorerCommand, ExplorerEvent,
    ExplorerState, FilterPreferences, KeyValueStore, PreferenceKeys, Row, Scope, SortDirection,
    SortState, VisibilityPreferences,
};
use tracing::{debug, info};

/// Fetch collaborator: the full row list for one scope, plus the scopes a
/// user can pick from.
pub trait RowSource {
    fn scopes(&self) -> Result<Vec<Scope>>;
    fn fetch(&self, scope: &Scope) -> Result<Vec<Row>>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExplorerOptions {
    pub page_size: usize,
    pub quantity_column: Option<String>,
    pub keys: PreferenceKeys,
}

impl Default for ExplorerOptions {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            quantity_column: Some(DEFAULT_QUANTITY_COLUMN.to_owned()),
            keys: PreferenceKeys::default(),
        }
    }
}

/// Issued when a refetch starts. Only the most recent ticket can land rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTicket {
    scope: Scope,
    generation: u64,
}

impl FetchTicket {
    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// One explorer session over a row store: committed state, preferences, and
/// the filtered+sorted row order, kept in sync after every action.
#[derive(Debug)]
pub struct Explorer<S: KeyValueStore> {
    store: S,
    options: ExplorerOptions,
    rows: RowStore,
    registry: ColumnRegistry,
    state: ExplorerState,
    visibility: VisibilityPreferences,
    filter_prefs: FilterPreferences,
    ordered: Vec<usize>,
    generation: u64,
    pending: Option<FetchTicket>,
    status: Option<String>,
}

impl<S: KeyValueStore> Explorer<S> {
    pub fn new(store: S, options: ExplorerOptions) -> Self {
        Self::with_rows(store, options, RowStore::empty(Scope::All))
    }

    pub fn with_rows(mut store: S, options: ExplorerOptions, rows: RowStore) -> Self {
        let registry = ColumnRegistry::derive(rows.rows(), options.quantity_column.as_deref());
        let filter_prefs = FilterPreferences::new(&options.keys.filters);
        let state = ExplorerState::new(rows.scope().clone(), options.page_size)
            .with_column_filters(filter_prefs.load(&store));
        let visibility =
            VisibilityPreferences::load(&mut store, &options.keys.visibility, &registry.names());

        let mut explorer = Self {
            store,
            options,
            rows,
            registry,
            state,
            visibility,
            filter_prefs,
            ordered: Vec::new(),
            generation: 0,
            pending: None,
            status: None,
        };
        explorer.recompute();
        explorer
    }

    pub fn state(&self) -> &ExplorerState {
        &self.state
    }

    pub fn options(&self) -> &ExplorerOptions {
        &self.options
    }

    pub fn registry(&self) -> &ColumnRegistry {
        &self.registry
    }

    pub fn rows(&self) -> &RowStore {
        &self.rows
    }

    pub fn visibility(&self) -> &VisibilityPreferences {
        &self.visibility
    }

    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /// Rows that pass the committed filters, in display order.
    pub fn filtered_rows(&self) -> impl Iterator<Item = &Row> {
        self.ordered
            .iter()
            .filter_map(|index| self.rows.get(*index))
    }

    pub fn filtered_len(&self) -> usize {
        self.ordered.len()
    }

    pub fn total_pages(&self) -> usize {
        total_pages(self.ordered.len(), self.state.page.size)
    }

    pub fn dispatch(&mut self, command: ExplorerCommand) -> Vec<ExplorerEvent> {
        debug!(?command, "explorer command");
        let (next, events) = self.state.apply(command);
        let filters_changed = next.filters.columns != self.state.filters.columns;
        self.state = next;
        if filters_changed {
            self.filter_prefs
                .save(&mut self.store, &self.state.filters.columns);
        }
        if let Some(status) = events.iter().rev().find_map(|event| match event {
            ExplorerEvent::StatusUpdated(status) => Some(status.clone()),
            _ => None,
        }) {
            self.status = Some(status);
        }
        if !events.is_empty() {
            self.recompute();
        }
        events
    }

    pub fn set_query(&mut self, query: &str) -> Vec<ExplorerEvent> {
        self.dispatch(ExplorerCommand::SetQuery(query.to_owned()))
    }

    pub fn set_column_filter(&mut self, column: &str, text: &str) -> Vec<ExplorerEvent> {
        self.dispatch(ExplorerCommand::SetColumnFilter {
            column: column.to_owned(),
            text: text.to_owned(),
        })
    }

    pub fn clear_column_filter(&mut self, column: &str) -> Vec<ExplorerEvent> {
        self.dispatch(ExplorerCommand::ClearColumnFilter(column.to_owned()))
    }

    pub fn clear_column_filters(&mut self) -> Vec<ExplorerEvent> {
        self.dispatch(ExplorerCommand::ClearColumnFilters)
    }

    pub fn toggle_sort(&mut self, column: &str) -> Vec<ExplorerEvent> {
        self.dispatch(ExplorerCommand::ToggleSort(column.to_owned()))
    }

    pub fn clear_sort(&mut self) -> Vec<ExplorerEvent> {
        self.dispatch(ExplorerCommand::ClearSort)
    }

    pub fn set_page(&mut self, index: usize) -> Vec<ExplorerEvent> {
        self.dispatch(ExplorerCommand::SetPage(index))
    }

    pub fn next_page(&mut self) -> Vec<ExplorerEvent> {
        self.dispatch(ExplorerCommand::NextPage)
    }

    pub fn prev_page(&mut self) -> Vec<ExplorerEvent> {
        self.dispatch(ExplorerCommand::PrevPage)
    }

    /// Count of rows `column = text` would leave, alongside the committed
    /// search and every other committed column filter. Committed state is not
    /// touched.
    pub fn preview_column_filter(&self, column: &str, text: &str) -> usize {
        preview_count(
            self.rows.rows(),
            &self.registry,
            &self.state.filters,
            column,
            text,
        )
    }

    /// Flips one column's visibility. Returns `None` for unknown columns.
    pub fn toggle_column(&mut self, column: &str) -> Option<bool> {
        if !self.registry.contains(column) {
            return None;
        }
        let shown = self.visibility.toggle(&mut self.store, column);
        self.status = Some(format!(
            "column {column} {}",
            if shown { "shown" } else { "hidden" }
        ));
        Some(shown)
    }

    pub fn set_all_columns(&mut self, shown: bool) {
        self.visibility
            .set_all(&mut self.store, &self.registry.names(), shown);
        self.status = Some(
            if shown {
                "all columns shown"
            } else {
                "all columns hidden"
            }
            .to_owned(),
        );
    }

    pub fn reset_columns(&mut self) {
        self.visibility
            .reset_to_default(&mut self.store, &self.registry.names());
        self.status = Some("columns reset".to_owned());
    }

    /// Clears search, column filters, sort and page, and shows every column.
    pub fn reset_all(&mut self) -> Vec<ExplorerEvent> {
        let events = self.dispatch(ExplorerCommand::ResetAll);
        self.visibility
            .reset_to_default(&mut self.store, &self.registry.names());
        events
    }

    /// Swaps in a new row store. Columns are re-derived and newly seen columns
    /// are shown.
    pub fn replace_rows(&mut self, rows: RowStore) {
        info!(
            scope = rows.scope().label(),
            rows = rows.len(),
            "replacing row store"
        );
        self.registry =
            ColumnRegistry::derive(rows.rows(), self.options.quantity_column.as_deref());
        self.visibility
            .reconcile(&mut self.store, &self.registry.names());
        let (scoped, _) = self
            .state
            .apply(ExplorerCommand::SetScope(rows.scope().clone()));
        let (next, _) = scoped.apply(ExplorerCommand::SetPage(0));
        self.state = next;
        self.status = Some(format!(
            "loaded {} rows for {}",
            rows.len(),
            rows.scope().label()
        ));
        self.rows = rows;
        self.recompute();
    }

    /// Moves to `scope` and returns the ticket its rows must be delivered
    /// with. Any earlier ticket is invalidated.
    pub fn request_scope(&mut self, scope: Scope) -> FetchTicket {
        self.dispatch(ExplorerCommand::SetScope(scope));
        self.generation += 1;
        let ticket = FetchTicket {
            scope: self.state.scope.clone(),
            generation: self.generation,
        };
        debug!(
            scope = ticket.scope.label(),
            generation = ticket.generation,
            "fetch requested"
        );
        self.pending = Some(ticket.clone());
        ticket
    }

    pub fn pending_fetch(&self) -> Option<&FetchTicket> {
        self.pending.as_ref()
    }

    /// Applies fetched rows if `ticket` is the one still pending. Stale or
    /// repeated deliveries are dropped and `false` is returned.
    pub fn complete_fetch(&mut self, ticket: FetchTicket, rows: Vec<Row>) -> bool {
        if self.pending.as_ref() != Some(&ticket)
            || ticket.generation != self.generation
            || ticket.scope != self.state.scope
        {
            debug!(
                scope = ticket.scope.label(),
                generation = ticket.generation,
                current = self.generation,
                "dropping stale fetch"
            );
            return false;
        }
        self.pending = None;
        self.replace_rows(RowStore::new(ticket.scope, rows));
        true
    }

    pub fn refresh_from<R: RowSource + ?Sized>(&mut self, source: &R, scope: Scope) -> Result<bool> {
        let ticket = self.request_scope(scope);
        let rows = source
            .fetch(ticket.scope())
            .with_context(|| format!("fetch rows for scope {}", ticket.scope().label()))?;
        Ok(self.complete_fetch(ticket, rows))
    }

    pub fn view(&self) -> ExplorerView<'_> {
        let window = paginate(&self.ordered, self.state.page.index, self.state.page.size);
        let sort = self.state.sort.as_ref();
        let columns = self
            .registry
            .columns()
            .iter()
            .map(|spec| ColumnView {
                name: spec.name.clone(),
                kind: spec.kind,
                shown: self.visibility.is_shown(&spec.name),
                sort: sort
                    .filter(|sort| sort.column == spec.name)
                    .map(|sort| sort.direction),
                filter: self.state.filters.column(&spec.name).map(str::to_owned),
            })
            .collect();
        ExplorerView {
            scope: self.state.scope.clone(),
            rows: window
                .rows
                .iter()
                .filter_map(|index| self.rows.get(*index))
                .collect(),
            columns,
            page_index: window.page_index,
            total_pages: window.total_pages,
            displayed_total: window.displayed_total,
            store_total: self.rows.len(),
            query: self.state.filters.active_query().map(str::to_owned),
            sort: self.state.sort.clone(),
        }
    }

    fn recompute(&mut self) {
        let rows = self.rows.rows();
        let mut ordered = apply_filters(rows, &self.registry, &self.state.filters);
        apply_sort(rows, &mut ordered, &self.registry, self.state.sort.as_ref());
        self.ordered = ordered;
        let pages = self.total_pages();
        self.state = self.state.clone().with_page_clamped(pages);
        debug!(
            matched = self.ordered.len(),
            total = self.rows.len(),
            page = self.state.page.index,
            pages,
            "recomputed rows"
        );
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnView {
    pub name: String,
    pub kind: ColumnKind,
    pub shown: bool,
    pub sort: Option<SortDirection>,
    pub filter: Option<String>,
}

impl ColumnView {
    pub fn header_label(&self) -> String {
        let mut label = self.name.clone();
        if let Some(direction) = self.sort {
            label.push(' ');
            label.push_str(direction.arrow());
        }
        if self.filter.is_some() {
            label.push_str(" *");
        }
        label
    }
}

/// Everything a renderer needs for one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct ExplorerView<'a> {
    pub scope: Scope,
    pub rows: Vec<&'a Row>,
    pub columns: Vec<ColumnView>,
    pub page_index: usize,
    pub total_pages: usize,
    pub displayed_total: usize,
    pub store_total: usize,
    pub query: Option<String>,
    pub sort: Option<SortState>,
}

impl ExplorerView<'_> {
    pub fn visible_columns(&self) -> impl Iterator<Item = &ColumnView> {
        self.columns.iter().filter(|column| column.shown)
    }

    pub fn hidden_count(&self) -> usize {
        self.columns.iter().filter(|column| !column.shown).count()
    }

    pub fn summary(&self) -> String {
        let mut parts = Vec::new();
        if let Scope::Named(name) = &self.scope {
            parts.push(name.clone());
        }
        let mut count = format!("{} rows", self.displayed_total);
        if self.displayed_total != self.store_total {
            count.push_str(&format!(" ({} total in store)", self.store_total));
        }
        parts.push(count);
        parts.push(format!(
            "page {}/{}",
            self.page_index + 1,
            self.total_pages.max(1)
        ));
        if let Some(sort) = &self.sort {
            parts.push(format!("sort {} {}", sort.column, sort.direction.as_str()));
        }
        let hidden = self.hidden_count();
        if hidden > 0 {
            parts.push(format!("{hidden} hidden"));
        }
        parts.join(" | ")
    }
}
