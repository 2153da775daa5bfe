//! Workbook loading into string grids.
//!
//! Every cell is turned into its text form once, when the sheet is read. Parsers then work on
//! a [`Grid`] (the whole sheet, addressed by absolute position) or on a [`Table`] (a grid cut
//! at a header row).

use std::io::{Cursor, Read, Seek, SeekFrom};
use std::path::Path;

use calamine::{open_workbook_auto_from_rs, Data, DataType, Reader};
use chrono::Timelike;

use crate::errors::{Error, ImportResult};

/// Number of leading columns forward-filled by default.
pub const DEFAULT_FORWARD_FILL: usize = 4;

/// Which sheet of a workbook to read.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SheetSelector {
    /// Let the parser pick the sheet by name, falling back to the first one
    #[default]
    Auto,
    /// Sheet at this 0-based position
    Index(usize),
    /// Sheet with this name
    Name(String),
}

/// A workbook held in memory.
///
/// The bytes are decoded on each [`Workbook::read_sheet`] call, a parser reads its sheet
/// once and keeps the resulting [`Grid`].
#[derive(Debug, Clone)]
pub struct Workbook {
    bytes: Vec<u8>,
}

impl Workbook {
    /// Wraps raw workbook bytes (xlsx, xlsm, xlsb, xls or ods).
    pub fn from_bytes<B: Into<Vec<u8>>>(bytes: B) -> Self {
        Workbook {
            bytes: bytes.into(),
        }
    }

    /// Reads the whole file at `path`.
    pub fn from_path<P: AsRef<Path>>(path: P) -> ImportResult<Self> {
        Ok(Workbook::from_bytes(std::fs::read(path)?))
    }

    /// Reads `reader` to its end and restores its original position.
    pub fn from_reader<R: Read + Seek>(reader: &mut R) -> ImportResult<Self> {
        let pos = reader.stream_position()?;
        let mut bytes = Vec::new();
        let read = reader.read_to_end(&mut bytes);
        reader.seek(SeekFrom::Start(pos))?;
        read?;
        Ok(Workbook { bytes })
    }

    /// Raw workbook bytes
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Names of all sheets, in workbook order.
    pub fn sheet_names(&self) -> ImportResult<Vec<String>> {
        let workbook = open_workbook_auto_from_rs(Cursor::new(self.bytes.as_slice()))?;
        Ok(workbook.sheet_names())
    }

    /// Reads the selected sheet into a [`Grid`].
    ///
    /// [`SheetSelector::Auto`] reads the first sheet.
    pub fn read_sheet(&self, sheet: &SheetSelector) -> ImportResult<Grid> {
        let mut workbook = open_workbook_auto_from_rs(Cursor::new(self.bytes.as_slice()))?;
        let names = workbook.sheet_names();
        if names.is_empty() {
            return Err(Error::EmptyWorkbook);
        }
        let name = match sheet {
            SheetSelector::Auto => names[0].clone(),
            SheetSelector::Index(idx) => names
                .get(*idx)
                .cloned()
                .ok_or(Error::SheetIndex {
                    idx: *idx,
                    count: names.len(),
                })?,
            SheetSelector::Name(wanted) => names
                .iter()
                .find(|n| *n == wanted)
                .or_else(|| {
                    let wanted = wanted.trim().to_lowercase();
                    names.iter().find(|n| n.trim().to_lowercase() == wanted)
                })
                .cloned()
                .ok_or_else(|| Error::SheetName(wanted.clone()))?,
        };
        let range = workbook.worksheet_range(&name)?;

        // ranges start at their first used cell, the grid keeps absolute positions
        let (row0, col0) = range.start().unwrap_or((0, 0));
        let (row0, col0) = (row0 as usize, col0 as usize);
        let mut rows = vec![Vec::new(); row0];
        for row in range.rows() {
            let mut cells = vec![String::new(); col0];
            cells.extend(row.iter().map(cell_text));
            rows.push(cells);
        }
        log::debug!("read sheet '{}': {} rows", name, rows.len());
        Ok(Grid { name, rows })
    }

    /// Reads a sheet and cuts it as described by `options`.
    pub fn load(&self, sheet: &SheetSelector, options: &LoadOptions) -> ImportResult<Table> {
        Ok(self.read_sheet(sheet)?.table(options))
    }
}

/// Text form of a cell.
///
/// Integral floats lose their `.0` (an ID typed as a number stays `12345678`), dates are
/// rendered as ISO `YYYY-MM-DD`.
pub fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => s.clone(),
        Data::Float(f) => f.to_string(),
        Data::DateTime(_) => match cell.as_datetime() {
            Some(dt) if dt.hour() == 0 && dt.minute() == 0 && dt.second() == 0 => {
                dt.format("%Y-%m-%d").to_string()
            }
            Some(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
            None => cell.to_string(),
        },
        other => other.to_string(),
    }
}

/// A whole sheet as text, row 0 / column 0 being the sheet's A1 cell.
#[derive(Debug, Clone, Default)]
pub struct Grid {
    name: String,
    rows: Vec<Vec<String>>,
}

impl Grid {
    /// Builds a grid from rows of text, mostly useful in tests.
    pub fn from_rows<S: AsRef<str>>(name: &str, rows: &[Vec<S>]) -> Self {
        Grid {
            name: name.to_string(),
            rows: rows
                .iter()
                .map(|r| r.iter().map(|c| c.as_ref().to_string()).collect())
                .collect(),
        }
    }

    /// Sheet name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of rows
    pub fn height(&self) -> usize {
        self.rows.len()
    }

    /// Cells of row `r`, empty when out of range.
    pub fn row(&self, r: usize) -> &[String] {
        self.rows.get(r).map_or(&[], Vec::as_slice)
    }

    /// Raw text at `(r, c)`, `""` when out of range.
    pub fn get(&self, r: usize, c: usize) -> &str {
        self.row(r).get(c).map_or("", String::as_str)
    }

    /// Iterates over the rows
    pub fn rows(&self) -> impl Iterator<Item = &[String]> {
        self.rows.iter().map(Vec::as_slice)
    }

    /// The first `n` rows, as a grid.
    pub fn head(&self, n: usize) -> Grid {
        Grid {
            name: self.name.clone(),
            rows: self.rows.iter().take(n).cloned().collect(),
        }
    }

    /// Cuts the grid into a [`Table`].
    pub fn table(&self, options: &LoadOptions) -> Table {
        let start = options.skip_rows;
        let (columns, first_data) = match options.header_row {
            Some(h) => {
                let h = start + h;
                let columns = self.row(h).iter().map(|c| c.trim().to_string()).collect();
                (columns, h + 1)
            }
            None => (Vec::new(), start),
        };
        let limit = options.n_rows.unwrap_or(usize::MAX);
        let rows = (first_data..self.rows.len())
            .take(limit)
            .map(|index| Row {
                index,
                cells: self.rows[index].clone(),
            })
            .collect();
        let mut table = Table { columns, rows };
        if options.forward_fill > 0 {
            let cols: Vec<usize> = (0..options.forward_fill).collect();
            table.forward_fill(&cols);
        }
        table
    }
}

/// How to cut a sheet into a [`Table`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadOptions {
    /// Header row, counted after `skip_rows`; `None` keeps every row as data
    pub header_row: Option<usize>,
    /// Leading rows dropped before anything else
    pub skip_rows: usize,
    /// Maximum number of data rows
    pub n_rows: Option<usize>,
    /// Number of leading columns forward-filled to repair merged cells
    pub forward_fill: usize,
}

impl Default for LoadOptions {
    fn default() -> Self {
        LoadOptions {
            header_row: None,
            skip_rows: 0,
            n_rows: None,
            forward_fill: DEFAULT_FORWARD_FILL,
        }
    }
}

impl LoadOptions {
    /// Headerless options that keep every cell as found.
    pub fn raw() -> Self {
        LoadOptions {
            forward_fill: 0,
            ..LoadOptions::default()
        }
    }

    /// Sets the header row
    pub fn with_header_row(mut self, header_row: usize) -> Self {
        self.header_row = Some(header_row);
        self
    }

    /// Sets the number of leading rows to drop
    pub fn with_skip_rows(mut self, skip_rows: usize) -> Self {
        self.skip_rows = skip_rows;
        self
    }

    /// Limits the number of data rows
    pub fn with_n_rows(mut self, n_rows: usize) -> Self {
        self.n_rows = Some(n_rows);
        self
    }

    /// Sets how many leading columns are forward-filled
    pub fn with_forward_fill(mut self, columns: usize) -> Self {
        self.forward_fill = columns;
        self
    }
}

/// A data row, remembering where it sits in the sheet.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    index: usize,
    cells: Vec<String>,
}

impl Row {
    /// 0-based sheet row
    pub fn index(&self) -> usize {
        self.index
    }

    /// 1-based row number, as shown by spreadsheet applications
    pub fn number(&self) -> usize {
        self.index + 1
    }

    /// All cells
    pub fn cells(&self) -> &[String] {
        &self.cells
    }

    /// Raw text of column `c`, `""` when out of range.
    pub fn get(&self, c: usize) -> &str {
        self.cells.get(c).map_or("", String::as_str)
    }

    /// Raw text of an optional column.
    pub fn get_opt(&self, c: Option<usize>) -> &str {
        c.map_or("", |c| self.get(c))
    }
}

/// Data rows under a (possibly empty) list of column names.
#[derive(Debug, Clone, Default)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Row>,
}

impl Table {
    /// Builds a table from named columns and positioned rows.
    pub fn new(columns: Vec<String>, rows: Vec<Row>) -> Self {
        Table { columns, rows }
    }

    /// Builds a table whose first row of `rows` is the header, data rows numbered from 1.
    pub fn from_rows<S: AsRef<str>>(rows: &[Vec<S>]) -> Self {
        Grid::from_rows("", rows).table(&LoadOptions::raw().with_header_row(0))
    }

    /// Header names, trimmed
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Data rows
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// `true` when there is neither a header nor a data row
    pub fn is_empty(&self) -> bool {
        self.columns.iter().all(|c| c.is_empty()) && self.rows.is_empty()
    }

    /// Consumes the table, keeping the data rows
    pub fn into_rows(self) -> Vec<Row> {
        self.rows
    }

    /// Removes the first `n` data rows.
    pub fn skip(&mut self, n: usize) {
        let n = n.min(self.rows.len());
        self.rows.drain(..n);
    }

    /// Copies the last non-blank value of each column in `cols` down into blank cells.
    ///
    /// Fully blank rows are left alone and do not reset the carried value.
    pub fn forward_fill(&mut self, cols: &[usize]) {
        let mut carried: Vec<Option<String>> = vec![None; cols.len()];
        for row in &mut self.rows {
            if row.cells.iter().all(|c| c.trim().is_empty()) {
                continue;
            }
            for (slot, &c) in carried.iter_mut().zip(cols) {
                if row.cells.len() <= c {
                    row.cells.resize(c + 1, String::new());
                }
                if row.cells[c].trim().is_empty() {
                    if let Some(v) = slot {
                        row.cells[c] = v.clone();
                    }
                } else {
                    *slot = Some(row.cells[c].clone());
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid() -> Grid {
        Grid::from_rows(
            "Hoja1",
            &[
                vec!["Titulo", "", "", ""],
                vec!["UE", "Meta", "Monto", "Obs"],
                vec!["001", "0001", "10", "a"],
                vec!["", "", "20", ""],
                vec!["", "", "", ""],
                vec!["", "0002", "", "b"],
            ],
        )
    }

    #[test]
    fn header_and_forward_fill() {
        let table = grid().table(&LoadOptions::default().with_header_row(1));
        assert_eq!(table.columns(), ["UE", "Meta", "Monto", "Obs"]);
        assert_eq!(table.rows().len(), 4);
        let r = &table.rows()[1];
        assert_eq!(r.number(), 4);
        assert_eq!(r.cells(), ["001", "0001", "20", "a"]);
        // blank rows stay blank
        assert!(table.rows()[2].cells().iter().all(String::is_empty));
        assert_eq!(table.rows()[3].cells(), ["001", "0002", "20", "b"]);
    }

    #[test]
    fn raw_keeps_blanks() {
        let table = grid().table(&LoadOptions::raw());
        assert_eq!(table.rows().len(), 6);
        assert!(table.columns().is_empty());
        assert_eq!(table.rows()[3].get(0), "");
        assert_eq!(table.rows()[3].get(99), "");
    }

    #[test]
    fn skip_and_limit() {
        let table = grid().table(
            &LoadOptions::raw()
                .with_skip_rows(1)
                .with_header_row(0)
                .with_n_rows(2),
        );
        assert_eq!(table.columns()[0], "UE");
        assert_eq!(table.rows().len(), 2);
        assert_eq!(table.rows()[0].index(), 2);
    }

    #[test]
    fn cell_text_forms() {
        assert_eq!(cell_text(&Data::Float(12345678.0)), "12345678");
        assert_eq!(cell_text(&Data::Float(1.5)), "1.5");
        assert_eq!(cell_text(&Data::Int(7)), "7");
        assert_eq!(cell_text(&Data::Empty), "");
        assert_eq!(cell_text(&Data::String(" x ".into())), " x ");
    }

    #[test]
    fn grid_out_of_range() {
        let g = grid();
        assert_eq!(g.get(100, 0), "");
        assert_eq!(g.head(2).height(), 2);
    }
}
