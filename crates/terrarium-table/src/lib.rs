// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

pub mod columns;
pub mod explorer;
pub mod filter;
pub mod paging;
pub mod sort;
pub mod store;

pub use columns::{ColumnRegistry, ColumnSpec, Comparator};
pub use explorer::{ColumnView, Explorer, ExplorerOptions, ExplorerView, FetchTicket, RowSource};
pub use filter::{RowFilter, apply_filters, parse_flag, preview_count};
pub use paging::{PageWindow, clamp_page, paginate, total_pages};
pub use sort::{apply_sort, collate, compare_values, lenient_number, sort_rows};
pub use store::RowStore;
