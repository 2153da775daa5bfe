//! Title-block context: UE, meta and fiscal year printed above the data table.
//!
//! Each format prints these values at known cells, but they drift by a row or a column
//! between revisions of the same template. Fixed positions are read first and the empty ones
//! are then searched by label.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;

use crate::normalize::clean_str;
use crate::table::Grid;
use crate::utils::fold;

static UE_CODE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(\d{3})").unwrap());

/// Extracted context, field name to cleaned text.
pub type Context = BTreeMap<String, String>;

/// Where a format prints its context.
#[derive(Debug, Clone, Copy)]
pub struct ContextLayout {
    /// Field name and `(row, col)` of its value
    pub positions: &'static [(&'static str, (usize, usize))],
    /// Field name and the labels searched, in order, when the fixed cell is empty
    pub labels: &'static [(&'static str, &'static [&'static str])],
    /// Rows scanned for labels
    pub scan_rows: usize,
}

/// Reads each `(row, col)` position, `""` when out of range.
pub fn extract_fixed(grid: &Grid, positions: &[(&str, (usize, usize))]) -> Context {
    positions
        .iter()
        .map(|(field, (r, c))| (field.to_string(), clean_str(grid.get(*r, *c))))
        .collect()
}

/// Finds the first cell of the first `max_rows` rows containing `label` (ignoring case and
/// accents) and returns the cell `col_offset` columns to its right.
///
/// Hits whose offset cell falls outside the row are ignored. Returns `""` when nothing matches.
pub fn scan_for_label(grid: &Grid, label: &str, max_rows: usize, col_offset: usize) -> String {
    let label = fold(label);
    for row in grid.rows().take(max_rows) {
        for (c, cell) in row.iter().enumerate() {
            if fold(cell).contains(&label) {
                if let Some(value) = row.get(c + col_offset) {
                    return clean_str(value);
                }
            }
        }
    }
    String::new()
}

/// UE code derived from its printed name: `"001 - INEI"` or `"001 INEI"` gives `"001"`.
pub fn ue_code_from_name(name: &str) -> Option<String> {
    if let Some((code, _)) = name.split_once(" - ") {
        let code = code.trim();
        if !code.is_empty() && code.chars().all(|c| c.is_ascii_digit()) {
            return Some(code.to_string());
        }
    }
    UE_CODE_RE
        .captures(name.trim())
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

impl ContextLayout {
    /// Fixed positions first, then label scans for the fields left empty.
    ///
    /// `ue_codigo` is derived from `ue_nombre` when still empty.
    pub fn extract(&self, grid: &Grid) -> Context {
        let mut ctx = extract_fixed(grid, self.positions);
        for (field, labels) in self.labels {
            if ctx.get(*field).is_some_and(|v| !v.is_empty()) {
                continue;
            }
            let found = labels
                .iter()
                .map(|label| scan_for_label(grid, label, self.scan_rows, 1))
                .find(|v| !v.is_empty())
                .unwrap_or_default();
            ctx.insert(field.to_string(), found);
        }
        let has_ue_code = ctx.get("ue_codigo").is_some_and(|v| !v.is_empty());
        if !has_ue_code {
            if let Some(code) = ctx.get("ue_nombre").and_then(|n| ue_code_from_name(n)) {
                log::debug!("ue_codigo derived from ue_nombre: {code}");
                ctx.insert("ue_codigo".to_string(), code);
            }
        }
        ctx
    }
}
