use comfy_table::{presets, CellAlignment, ContentArrangement, Table};
use serde::Serialize;

use crate::app::GlobalOptions;

/// Print `data` as JSON (if `--json`) or call `display_fn` for human-readable output.
pub fn print_output<T: Serialize>(
    data: &T,
    opts: &GlobalOptions,
    display_fn: impl FnOnce(&T),
) -> anyhow::Result<()> {
    if opts.json {
        let json = serde_json::to_string_pretty(data)?;
        println!("{json}");
    } else {
        display_fn(data);
    }
    Ok(())
}

/// Print a `label: value` line with labels padded to `width`.
pub fn print_field(label: &str, value: impl std::fmt::Display, width: usize) {
    println!("{:<width$} {value}", format!("{label}:"), width = width + 1);
}

/// Format a byte count as `0x..` together with its decimal value.
pub fn format_size(size: u32) -> String {
    format!("0x{size:x} ({size})")
}

/// Column alignment for tabular output.
#[derive(Clone, Copy)]
pub enum Align {
    Left,
    Right,
}

/// Whitespace-aligned table on top of `comfy-table`, sized to the widest entry.
pub struct TabWriter {
    table: Table,
    indent: String,
}

impl TabWriter {
    /// Create a writer with `(header, alignment)` column definitions.
    pub fn new(columns: Vec<(&str, Align)>) -> Self {
        let mut table = Table::new();
        table
            .load_preset(presets::NOTHING)
            .set_content_arrangement(ContentArrangement::Dynamic);

        let headers: Vec<&str> = columns.iter().map(|(name, _)| *name).collect();
        table.set_header(headers);

        // Two spaces between columns, none at the outer edges
        let last = columns.len().saturating_sub(1);
        for (i, (_, align)) in columns.iter().enumerate() {
            let cell_align = match align {
                Align::Left => CellAlignment::Left,
                Align::Right => CellAlignment::Right,
            };
            if let Some(col) = table.column_mut(i) {
                col.set_cell_alignment(cell_align);
                let pad_left = if i == 0 { 0 } else { 1 };
                let pad_right = if i == last { 0 } else { 1 };
                col.set_padding((pad_left, pad_right));
            }
        }

        Self {
            table,
            indent: String::new(),
        }
    }

    /// Set the prefix printed in front of every line.
    pub fn indent(mut self, prefix: &str) -> Self {
        self.indent = prefix.to_string();
        self
    }

    /// Add a row. Values are given in column order.
    pub fn row(&mut self, values: Vec<String>) {
        self.table.add_row(values);
    }

    /// Print the table to stdout.
    pub fn print(&self) {
        let output = self.table.to_string();
        for line in output.lines() {
            println!("{}{}", self.indent, line.trim_end());
        }
    }
}
