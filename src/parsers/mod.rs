//! Per-format parsers.
//!
//! Every parser implements [`FormatParser`] and drives a [`Session`], which owns the workbook,
//! the configuration and the [`ParseResult`] being built. The session holds the steps shared by
//! all formats: sheet loading, context extraction, header detection, column checks, amount
//! clamping and reconciliation.

use crate::columns::AliasTable;
use crate::config::{header_scan_rows, HeaderRow, ParserConfig};
use crate::context::{Context, ContextLayout};
use crate::errors::ImportResult;
use crate::formats::Format;
use crate::months::{MonthColumns, MONTH_NAMES};
use crate::normalize::{
    clean_str, is_empty_row, is_header_row, is_valid_classifier, normalize_classifier_code,
    normalize_date, parse_decimal, parse_year, to_decimal, DateValue,
};
use crate::result::{ParseResult, WarningKind};
use crate::table::{Grid, LoadOptions, Row, SheetSelector, Table, Workbook};
use crate::utils::{fold, round2};

mod anexo01;
mod cuadro_ao_meta;
mod formato04;
mod formato1;
mod formato2;
mod formato3;
mod formato5_resumen;
mod formato5a;
mod formato5b;
mod siaf;
mod siga;
mod tablas;

pub use anexo01::Anexo01Parser;
pub use cuadro_ao_meta::CuadroAoMetaParser;
pub use formato04::Formato04Parser;
pub use formato1::Formato1Parser;
pub use formato2::Formato2Parser;
pub use formato3::Formato3Parser;
pub use formato5_resumen::Formato5ResumenParser;
pub use formato5a::Formato5AParser;
pub use formato5b::Formato5BParser;
pub use siaf::SiafParser;
pub use siga::SigaParser;
pub use tablas::TablasParser;

/// Common contract of the format parsers.
pub trait FormatParser: Sized {
    /// Format handled
    const FORMAT: Format;

    /// Column aliases of the data table
    const COLUMNS: AliasTable;

    /// Fields that must resolve for the table to be usable
    const REQUIRED: &'static [&'static str];

    /// Creates a parser, failing only on an illegal configuration.
    fn new(workbook: Workbook, config: ParserConfig) -> ImportResult<Self>;

    /// Creates a parser with the defaults of [`Self::FORMAT`].
    fn with_defaults(workbook: Workbook) -> ImportResult<Self> {
        Self::new(workbook, ParserConfig::for_format(Self::FORMAT))
    }

    /// Structural errors of a loaded table, empty when every required field resolves.
    fn validate_structure(&self, table: &Table) -> Vec<String> {
        missing_columns(Self::FORMAT, table, &Self::COLUMNS, Self::REQUIRED)
    }

    /// Runs the parse. Never fails: problems are reported in the result.
    fn parse(self) -> ParseResult;
}

/// One error per required field that does not resolve against `table`.
pub fn missing_columns(
    format: Format,
    table: &Table,
    aliases: &AliasTable,
    required: &[&str],
) -> Vec<String> {
    let map = aliases.resolve(table.columns());
    map.missing(required)
        .into_iter()
        .map(|field| {
            format!(
                "{}: columna requerida '{field}' no encontrada (alias: {}). Columnas: {:?}",
                format.label(),
                aliases.aliases(field).join(", "),
                table.columns()
            )
        })
        .collect()
}

/// Parses `workbook` as `format`.
///
/// [`Format::Unknown`] and illegal configurations give a result holding one structural error.
pub fn parse_as(format: Format, workbook: Workbook, config: ParserConfig) -> ParseResult {
    fn run<P: FormatParser>(workbook: Workbook, config: ParserConfig) -> ParseResult {
        match P::new(workbook, config) {
            Ok(parser) => parser.parse(),
            Err(e) => {
                let mut result = ParseResult::new(P::FORMAT);
                result.push_error(e.to_string());
                result
            }
        }
    }
    match format {
        Format::CuadroAoMeta => run::<CuadroAoMetaParser>(workbook, config),
        Format::Tablas => run::<TablasParser>(workbook, config),
        Format::Formato1 => run::<Formato1Parser>(workbook, config),
        Format::Formato2 => run::<Formato2Parser>(workbook, config),
        Format::Formato3 => run::<Formato3Parser>(workbook, config),
        Format::Formato04 => run::<Formato04Parser>(workbook, config),
        Format::Formato5A => run::<Formato5AParser>(workbook, config),
        Format::Formato5B => run::<Formato5BParser>(workbook, config),
        Format::Formato5Resumen => run::<Formato5ResumenParser>(workbook, config),
        Format::Anexo01 => run::<Anexo01Parser>(workbook, config),
        Format::Siaf => run::<SiafParser>(workbook, config),
        Format::Siga => run::<SigaParser>(workbook, config),
        Format::Unknown => {
            let mut result = ParseResult::new(Format::Unknown);
            result.push_error("No se pudo determinar el formato del archivo.".to_string());
            result
        }
    }
}

/// Detects the format of `workbook` and parses it with the format defaults.
pub fn parse_workbook(workbook: Workbook) -> ParseResult {
    let format = crate::detector::detect_format(&workbook);
    parse_as(format, workbook, ParserConfig::for_format(format))
}

/// State of one parse.
pub(crate) struct Session {
    format: Format,
    workbook: Workbook,
    config: ParserConfig,
    result: ParseResult,
    valid_rows: usize,
    skipped_rows: usize,
}

impl Session {
    pub(crate) fn new(
        format: Format,
        workbook: Workbook,
        config: ParserConfig,
    ) -> ImportResult<Session> {
        config.validate(format)?;
        Ok(Session {
            format,
            workbook,
            config,
            result: ParseResult::new(format),
            valid_rows: 0,
            skipped_rows: 0,
        })
    }

    pub(crate) fn config(&self) -> &ParserConfig {
        &self.config
    }

    pub(crate) fn result(&mut self) -> &mut ParseResult {
        &mut self.result
    }

    /// Reads the configured sheet; [`SheetSelector::Auto`] takes the first sheet whose
    /// name satisfies `preferred`, else the first sheet.
    ///
    /// A failure is recorded as the structural error of the parse.
    pub(crate) fn read_grid(&mut self, preferred: Option<fn(&str) -> bool>) -> Option<Grid> {
        let mut sheet = self.config.sheet.clone();
        if sheet == SheetSelector::Auto {
            if let Some(preferred) = preferred {
                if let Ok(names) = self.workbook.sheet_names() {
                    if let Some(name) = names.into_iter().find(|n| preferred(&fold(n))) {
                        sheet = SheetSelector::Name(name);
                    }
                }
            }
        }
        match self.workbook.read_sheet(&sheet) {
            Ok(grid) => {
                self.result.set_meta("hoja", grid.name());
                Some(grid)
            }
            Err(e) => {
                let sheet = match &sheet {
                    SheetSelector::Auto => "0".to_string(),
                    SheetSelector::Index(i) => i.to_string(),
                    SheetSelector::Name(n) => n.clone(),
                };
                self.result
                    .push_error(format!("No se pudo cargar la hoja '{sheet}': {e}"));
                None
            }
        }
    }

    /// Extracts the title-block context and copies it into the metadata.
    pub(crate) fn context(&mut self, grid: &Grid, layout: &ContextLayout) -> Context {
        let ctx = layout.extract(grid);
        for (k, v) in &ctx {
            self.result.set_meta(k, v);
        }
        ctx
    }

    /// Fiscal year: the configured override, else `raw`; `0` with a notice when unreadable.
    pub(crate) fn fiscal_year(&mut self, raw: &str) -> i32 {
        let anio = match self.config.anio {
            Some(anio) => anio,
            None => match parse_year(raw) {
                Some(anio) => anio,
                None => {
                    self.result.warn(
                        WarningKind::Notice,
                        None,
                        format!(
                            "{}: no se pudo determinar el año fiscal ('{raw}'); se usa 0.",
                            self.format.label()
                        ),
                    );
                    0
                }
            },
        };
        self.result.set_meta("anio", anio);
        anio
    }

    /// Header row and whether it was found by keywords.
    ///
    /// The row with the most keyword hits wins, the first one on ties.
    pub(crate) fn header_row(&self, grid: &Grid, keywords: &[&str], fallback: usize) -> (usize, bool) {
        if let HeaderRow::Row(h) = self.config.header_row {
            return (h, false);
        }
        let window = header_scan_rows(self.format).max(self.config.data_start_row);
        let best = grid
            .rows()
            .take(window)
            .enumerate()
            .map(|(r, cells)| {
                let cells: Vec<String> = cells.iter().map(|c| fold(c)).collect();
                let hits = keywords
                    .iter()
                    .filter(|k| cells.iter().any(|c| c.contains(*k)))
                    .count();
                (r, hits)
            })
            .filter(|(_, hits)| *hits > 0)
            .fold(None, |best: Option<(usize, usize)>, (r, hits)| match best {
                Some((_, h)) if h >= hits => best,
                _ => Some((r, hits)),
            });
        match best {
            Some((r, _)) => {
                log::debug!("{}: header row {r}", self.format);
                (r, true)
            }
            None => {
                log::warn!(
                    "{}: header row not found, using row {fallback}",
                    self.format
                );
                (fallback, false)
            }
        }
    }

    /// The data table under `header`, without forward fill.
    ///
    /// A detected header is followed directly by data; otherwise rows up to the configured
    /// data start are skipped.
    pub(crate) fn data_table(&self, grid: &Grid, header: usize, detected: bool) -> Table {
        let mut table = grid.table(&LoadOptions::raw().with_header_row(header));
        if !detected {
            table.skip(self.config.data_start_row.saturating_sub(header + 1));
        }
        table
    }

    /// Header row assumed when detection fails, right above the data start.
    pub(crate) fn default_header(&self) -> usize {
        self.config.data_start_row - 1
    }

    /// Detects the header row and loads the table beneath it.
    pub(crate) fn load_table(&self, grid: &Grid, keywords: &[&str], fallback: usize) -> Table {
        let (header, detected) = self.header_row(grid, keywords, fallback);
        self.data_table(grid, header, detected)
    }

    /// Records structural errors, `true` when the table is usable.
    pub(crate) fn accept_structure(&mut self, errors: Vec<String>) -> bool {
        let ok = errors.is_empty();
        for e in errors {
            self.result.push_error(e);
        }
        ok
    }

    /// Drops a row with a warning.
    pub(crate) fn skip(&mut self, row: &Row, message: String) {
        self.skipped_rows += 1;
        self.result
            .warn(WarningKind::RowSkipped, Some(row.number()), message);
    }

    /// Counts a row that produced records.
    pub(crate) fn accept(&mut self) {
        self.valid_rows += 1;
    }

    /// `true` for blank rows, which are ignored
    pub(crate) fn is_blank(row: &Row) -> bool {
        is_empty_row(row.cells())
    }

    /// A header repeated inside the data: its key cell holds a header word.
    pub(crate) fn is_repeated_header(row: &Row, key: Option<usize>, keywords: &[&str]) -> bool {
        is_header_row(&[row.get_opt(key)], keywords)
    }

    /// Canonical classifier code in `col`, or `None` after skipping the row.
    pub(crate) fn classifier(&mut self, row: &Row, col: Option<usize>) -> Option<String> {
        let raw = clean_str(row.get_opt(col));
        let code = normalize_classifier_code(&raw);
        if is_valid_classifier(&code) {
            return Some(code);
        }
        let message = if raw.is_empty() {
            "código clasificador vacío; fila omitida.".to_string()
        } else {
            format!("código clasificador inválido ('{raw}'); fila omitida.")
        };
        self.skip(row, message);
        None
    }

    /// Clamps a negative amount to zero, with one warning, and rounds to cents.
    pub(crate) fn non_negative(&mut self, row: usize, field: &str, value: f64) -> f64 {
        if value < 0.0 {
            self.result.warn(
                WarningKind::ValueCorrected,
                Some(row),
                format!("{field} negativo ({value}) corregido a 0."),
            );
            0.0
        } else {
            round2(value)
        }
    }

    /// Amount in `col` of `row`, `0` when absent, never negative.
    pub(crate) fn amount(&mut self, row: &Row, col: Option<usize>, field: &str) -> f64 {
        let value = to_decimal(row.get_opt(col), 0.0);
        self.non_negative(row.number(), field, value)
    }

    /// Amount in `col` of `row`, `None` when the cell holds no number.
    pub(crate) fn optional_amount(&mut self, row: &Row, col: Option<usize>, field: &str) -> Option<f64> {
        parse_decimal(row.get_opt(col)).map(|v| self.non_negative(row.number(), field, v))
    }

    /// ISO date in `col` of `row`; unknown layouts are kept as written, with a warning.
    pub(crate) fn date(&mut self, row: &Row, col: Option<usize>, field: &str) -> Option<String> {
        match normalize_date(row.get_opt(col)) {
            DateValue::Raw(raw) => {
                self.result.warn(
                    WarningKind::ValueCorrected,
                    Some(row.number()),
                    format!("{field} '{raw}' no reconocida; se conserva el texto."),
                );
                Some(raw)
            }
            date => date.into_option(),
        }
    }

    /// Compares a declared value to the computed one, returning the one to keep.
    pub(crate) fn reconcile(&mut self, row: usize, field: &str, declared: f64, computed: f64) -> f64 {
        if (declared - computed).abs() > self.config.tolerance {
            self.result.warn(
                WarningKind::ReconciliationMismatch,
                Some(row),
                format!(
                    "{field} declarado {declared:.2} difiere del calculado {computed:.2}; \
                     se usa el calculado."
                ),
            );
            round2(computed)
        } else {
            round2(declared)
        }
    }

    /// Warns when the twelve months do not add up to `total`.
    pub(crate) fn check_monthly_total(&mut self, row: usize, what: &str, months: &[f64; 12], total: f64) {
        let sum: f64 = months.iter().sum();
        if (sum - total).abs() > self.config.tolerance {
            self.result.warn(
                WarningKind::ReconciliationMismatch,
                Some(row),
                format!("suma mensual {sum:.2} difiere de {what} {total:.2}."),
            );
        }
    }

    /// Monthly amounts of `row`, `0` for unresolved months.
    pub(crate) fn monthly(&mut self, row: &Row, months: &MonthColumns, field: &str) -> [f64; 12] {
        let mut values = [0.0; 12];
        for (m, value) in values.iter_mut().enumerate() {
            let col = months.get(m as u32 + 1);
            *value = self.amount(row, col, &format!("{field} {}", MONTH_NAMES[m]));
        }
        values
    }

    /// Notes months that could not be resolved.
    pub(crate) fn note_months(&mut self, months: &MonthColumns) {
        let resolved = months.resolved();
        if months.is_positional() {
            self.result.warn(
                WarningKind::Notice,
                None,
                format!(
                    "{}: columnas de meses tomadas por posición.",
                    self.format.label()
                ),
            );
        } else if resolved < 12 {
            self.result.warn(
                WarningKind::Notice,
                None,
                format!(
                    "{}: solo {resolved} de 12 columnas de meses encontradas.",
                    self.format.label()
                ),
            );
        }
    }

    /// Closes the parse with the row counters.
    pub(crate) fn finish(mut self) -> ParseResult {
        if self.result.is_ok() {
            self.result.set_meta("valid_rows", self.valid_rows);
            self.result.set_meta("skipped_rows", self.skipped_rows);
        }
        log::debug!("{}", self.result.summary());
        self.result
    }
}

#[cfg(test)]
pub(crate) mod testing {
    /// An in-memory xlsx workbook, every non-empty cell written as text.
    pub(crate) fn workbook(sheets: &[(&str, Vec<Vec<&str>>)]) -> crate::Workbook {
        let mut book = rust_xlsxwriter::Workbook::new();
        for (name, rows) in sheets {
            let sheet = book.add_worksheet();
            sheet.set_name(*name).unwrap();
            for (r, row) in rows.iter().enumerate() {
                for (c, cell) in row.iter().enumerate() {
                    if !cell.is_empty() {
                        sheet.write_string(r as u32, c as u16, *cell).unwrap();
                    }
                }
            }
        }
        crate::Workbook::from_bytes(book.save_to_buffer().unwrap())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(format: Format) -> Session {
        Session::new(format, Workbook::from_bytes(Vec::new()), ParserConfig::for_format(format))
            .unwrap()
    }

    #[test]
    fn unreadable_workbook() {
        let mut s = session(Format::Formato1);
        assert!(s.read_grid(None).is_none());
        let result = s.finish();
        assert_eq!(result.errors().len(), 1);
        assert!(result.errors()[0].starts_with("No se pudo cargar la hoja"));
        assert!(result.records().is_empty());
    }

    #[test]
    fn unknown_format() {
        let result = parse_as(
            Format::Unknown,
            Workbook::from_bytes(Vec::new()),
            ParserConfig::for_format(Format::Unknown),
        );
        assert!(!result.is_ok());
        assert_eq!(result.format(), Format::Unknown);
    }

    #[test]
    fn illegal_config_is_an_error() {
        let config = ParserConfig::for_format(Format::Formato1).with_tolerance(-2.0);
        let result = parse_as(Format::Formato1, Workbook::from_bytes(Vec::new()), config);
        assert_eq!(result.errors().len(), 1);
        assert!(result.errors()[0].contains("tolerance"));
    }

    #[test]
    fn header_best_score() {
        let grid = Grid::from_rows(
            "F1",
            &[
                vec!["PROGRAMACION PIM 2026", ""],
                vec!["", ""],
                vec!["Clasificador", "PIM"],
                vec!["2.3.1", "10"],
            ],
        );
        let s = session(Format::Formato1);
        assert_eq!(s.header_row(&grid, &["clasificador", "pim"], 6), (2, true));
        assert_eq!(s.header_row(&grid, &["dni"], 6), (6, false));
        let table = s.data_table(&grid, 2, true);
        assert_eq!(table.rows().len(), 1);
        // fallback header: rows up to the data start are skipped
        let table = s.data_table(&grid, 1, false);
        assert!(table.rows().is_empty());
    }

    #[test]
    fn clamp_and_reconcile() {
        let mut s = session(Format::Formato3);
        assert_eq!(s.non_negative(9, "ejecutado", -500.0), 0.0);
        assert_eq!(s.non_negative(9, "ejecutado", 10.004), 10.0);
        assert_eq!(s.reconcile(9, "saldo", 100.0, 100.9), 100.0);
        assert_eq!(s.reconcile(9, "saldo", 100.0, 150.0), 150.0);
        let result = s.finish();
        assert_eq!(result.warning_count(WarningKind::ValueCorrected), 1);
        assert_eq!(result.warning_count(WarningKind::ReconciliationMismatch), 1);
        assert_eq!(result.warnings()[0].row(), Some(9));
    }
}
