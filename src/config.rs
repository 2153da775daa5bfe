//! Per-parse configuration.

use crate::errors::{Error, ImportResult};
use crate::formats::Format;
use crate::table::SheetSelector;

/// Amounts closer than this, in currency units, reconcile.
pub const RECONCILIATION_TOLERANCE: f64 = 1.0;

/// Where the header row is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HeaderRow {
    /// Scan the rows above the data for the format keywords
    #[default]
    Detect,
    /// Fixed 0-based sheet row; for the two-row header, the row of the month labels
    Row(usize),
}

/// Validated settings of one parser.
///
/// # Examples
///
/// ```
/// use presupuesto_import::{Format, HeaderRow, ParserConfig, SheetSelector};
///
/// let config = ParserConfig::for_format(Format::Formato1)
///     .with_sheet(SheetSelector::Name("F1".to_string()))
///     .with_header_row(HeaderRow::Row(5));
/// assert_eq!(config.data_start_row, 7);
/// assert!(config.validate(Format::Formato1).is_ok());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ParserConfig {
    /// Sheet to read
    pub sheet: SheetSelector,
    /// Header row
    pub header_row: HeaderRow,
    /// 0-based sheet row where data starts in the reference template
    pub data_start_row: usize,
    /// Reconciliation tolerance, in currency units
    pub tolerance: f64,
    /// Fiscal year, overriding the one printed in the workbook
    pub anio: Option<i32>,
}

impl ParserConfig {
    /// The documented defaults of `format`.
    pub fn for_format(format: Format) -> Self {
        ParserConfig {
            sheet: SheetSelector::Auto,
            header_row: HeaderRow::Detect,
            data_start_row: default_data_start_row(format),
            tolerance: RECONCILIATION_TOLERANCE,
            anio: None,
        }
    }

    /// Sets the sheet
    pub fn with_sheet(mut self, sheet: SheetSelector) -> Self {
        self.sheet = sheet;
        self
    }

    /// Sets the header row
    pub fn with_header_row(mut self, header_row: HeaderRow) -> Self {
        self.header_row = header_row;
        self
    }

    /// Sets the data start row
    pub fn with_data_start_row(mut self, row: usize) -> Self {
        self.data_start_row = row;
        self
    }

    /// Sets the reconciliation tolerance
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Sets the fiscal year
    pub fn with_anio(mut self, anio: i32) -> Self {
        self.anio = Some(anio);
        self
    }

    /// Checks the settings against `format`.
    pub fn validate(&self, format: Format) -> ImportResult<()> {
        if format == Format::Unknown {
            return Err(Error::Config("no parser for an unknown format".to_string()));
        }
        if !self.tolerance.is_finite() || self.tolerance < 0.0 {
            return Err(Error::Config(format!(
                "tolerance must be a non-negative number, got {}",
                self.tolerance
            )));
        }
        if let SheetSelector::Name(name) = &self.sheet {
            if name.trim().is_empty() {
                return Err(Error::Config("empty sheet name".to_string()));
            }
        }
        if self.data_start_row == 0 {
            return Err(Error::Config(
                "data_start_row must leave room for a header row".to_string(),
            ));
        }
        if let HeaderRow::Row(h) = self.header_row {
            if h >= self.data_start_row {
                return Err(Error::Config(format!(
                    "header row {h} must be above data_start_row {}",
                    self.data_start_row
                )));
            }
        }
        if let Some(anio) = self.anio {
            if !(1900..=2100).contains(&anio) {
                return Err(Error::Config(format!("fiscal year out of range: {anio}")));
            }
        }
        Ok(())
    }
}

/// 0-based data start row of the reference template of `format`.
pub fn default_data_start_row(format: Format) -> usize {
    match format {
        Format::CuadroAoMeta | Format::Tablas | Format::Unknown => 1,
        Format::Formato1
        | Format::Formato2
        | Format::Formato3
        | Format::Formato04
        | Format::Anexo01 => 7,
        Format::Formato5A | Format::Formato5B => 11,
        Format::Formato5Resumen => 6,
        Format::Siaf => 4,
        Format::Siga => 3,
    }
}

/// Rows scanned when looking for the header.
pub(crate) fn header_scan_rows(format: Format) -> usize {
    match format {
        Format::CuadroAoMeta | Format::Tablas | Format::Siga => 8,
        Format::Formato5A | Format::Formato5Resumen => 12,
        _ => 10,
    }
}
