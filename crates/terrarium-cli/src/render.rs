// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use terrarium_table::ExplorerView;

/// Tab-separated page: summary line, header, then one line per row.
pub fn render_page(view: &ExplorerView<'_>) -> String {
    let columns = view.visible_columns().collect::<Vec<_>>();
    let mut out = String::new();
    out.push_str(&view.summary());
    out.push('\n');

    if columns.is_empty() {
        out.push_str("(all columns hidden)\n");
        return out;
    }

    let header = columns
        .iter()
        .map(|column| column.header_label())
        .collect::<Vec<_>>();
    out.push_str(&header.join("\t"));
    out.push('\n');

    for row in &view.rows {
        let cells = columns
            .iter()
            .map(|column| cell_text(&row.value(&column.name).display()))
            .collect::<Vec<_>>();
        out.push_str(&cells.join("\t"));
        out.push('\n');
    }
    if view.rows.is_empty() {
        out.push_str("(no matching rows)\n");
    }
    out
}

fn cell_text(raw: &str) -> String {
    raw.chars()
        .map(|ch| if ch == '\t' || ch == '\n' || ch == '\r' { ' ' } else { ch })
        .collect()
}
