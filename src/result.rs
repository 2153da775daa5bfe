//! The value object returned by every parse.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Serialize, Serializer};

use crate::formats::Format;
use crate::records::Record;

/// Category of a non-fatal finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WarningKind {
    /// A row failed a required-field check and was dropped
    RowSkipped,
    /// A value was coerced or clamped, e.g. a negative amount forced to zero
    ValueCorrected,
    /// A declared total or balance disagrees with the computed one
    ReconciliationMismatch,
    /// Informational, nothing was changed
    Notice,
}

/// A non-fatal finding, kept for review next to the imported data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Warning {
    kind: WarningKind,
    row: Option<usize>,
    message: String,
}

impl Warning {
    /// Creates a warning about 1-based sheet row `row`
    pub fn new(kind: WarningKind, row: Option<usize>, message: String) -> Self {
        Warning { kind, row, message }
    }

    /// Category
    pub fn kind(&self) -> WarningKind {
        self.kind
    }

    /// 1-based sheet row, if the finding concerns a row
    pub fn row(&self) -> Option<usize> {
        self.row
    }

    /// Message without the row prefix
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.row {
            Some(row) => write!(f, "Fila {row}: {}", self.message),
            None => f.write_str(&self.message),
        }
    }
}

impl Serialize for Warning {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Outcome of one parse.
///
/// `errors` are structural: when any is present, no record was extracted. Row-level problems
/// are `warnings` and never stop the parse.
#[derive(Debug, Clone, Serialize)]
pub struct ParseResult {
    records: Vec<Record>,
    errors: Vec<String>,
    warnings: Vec<Warning>,
    metadata: BTreeMap<String, String>,
    #[serde(rename = "format_name")]
    format: Format,
}

impl ParseResult {
    /// An empty result for `format`
    pub fn new(format: Format) -> Self {
        ParseResult {
            records: Vec::new(),
            errors: Vec::new(),
            warnings: Vec::new(),
            metadata: BTreeMap::new(),
            format,
        }
    }

    /// `true` when there is no structural error
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }

    /// Number of records
    pub fn record_count(&self) -> usize {
        self.records.len()
    }

    /// Extracted records, in sheet order
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// Records with the `_type` tag `tag`
    pub fn records_of<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = &'a Record> + 'a {
        self.records.iter().filter(move |r| r.tag() == tag)
    }

    /// Consumes the result, keeping only the records
    pub fn into_records(self) -> Vec<Record> {
        self.records
    }

    /// Structural errors
    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    /// Row-level warnings
    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    /// Number of warnings of `kind`
    pub fn warning_count(&self, kind: WarningKind) -> usize {
        self.warnings.iter().filter(|w| w.kind == kind).count()
    }

    /// Extracted context and counters
    pub fn metadata(&self) -> &BTreeMap<String, String> {
        &self.metadata
    }

    /// Format the workbook was parsed as
    pub fn format(&self) -> Format {
        self.format
    }

    /// One-line summary, `[OK] format=TABLAS records=2 errors=0 warnings=0`
    pub fn summary(&self) -> String {
        format!(
            "[{}] format={} records={} errors={} warnings={}",
            if self.is_ok() { "OK" } else { "ERROR" },
            self.format,
            self.records.len(),
            self.errors.len(),
            self.warnings.len()
        )
    }

    pub(crate) fn push_record<R: Into<Record>>(&mut self, record: R) {
        debug_assert!(self.errors.is_empty(), "records after a structural error");
        self.records.push(record.into());
    }

    pub(crate) fn push_error(&mut self, error: String) {
        log::warn!("{}: {}", self.format, error);
        self.errors.push(error);
    }

    pub(crate) fn warn(&mut self, kind: WarningKind, row: Option<usize>, message: String) {
        self.warnings.push(Warning::new(kind, row, message));
    }

    pub(crate) fn set_meta<V: ToString>(&mut self, key: &str, value: V) {
        self.metadata.insert(key.to_string(), value.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_and_warnings() {
        let mut r = ParseResult::new(Format::Tablas);
        assert!(r.is_ok());
        r.warn(WarningKind::RowSkipped, Some(4), "código inválido".to_string());
        r.warn(WarningKind::Notice, None, "sin año".to_string());
        assert_eq!(r.summary(), "[OK] format=TABLAS records=0 errors=0 warnings=2");
        assert_eq!(r.warnings()[0].to_string(), "Fila 4: código inválido");
        assert_eq!(r.warnings()[1].to_string(), "sin año");
        assert_eq!(r.warning_count(WarningKind::RowSkipped), 1);
        r.push_error("hoja vacía".to_string());
        assert!(r.summary().starts_with("[ERROR]"));
    }
}
