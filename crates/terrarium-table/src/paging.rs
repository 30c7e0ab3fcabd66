// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow<'a, T> {
    pub rows: &'a [T],
    pub page_index: usize,
    pub total_pages: usize,
    pub displayed_total: usize,
}

/// Slices one page out of `rows`. An index past the end yields an empty page.
pub fn paginate<T>(rows: &[T], page_index: usize, page_size: usize) -> PageWindow<'_, T> {
    let start = page_index.saturating_mul(page_size).min(rows.len());
    let end = start.saturating_add(page_size).min(rows.len());
    PageWindow {
        rows: &rows[start..end],
        page_index,
        total_pages: total_pages(rows.len(), page_size),
        displayed_total: rows.len(),
    }
}

pub fn total_pages(total: usize, page_size: usize) -> usize {
    if page_size == 0 {
        return 0;
    }
    total.div_ceil(page_size)
}

pub fn clamp_page(page_index: usize, total_pages: usize) -> usize {
    page_index.min(total_pages.saturating_sub(1))
}
