//! `Error` management module
//!
//! Provides the crate error type and `ImportResult` as an alias of `Result<_, Error>`.
//! Only workbook-level and configuration failures are errors; problems found in rows end up
//! as warnings in a [`ParseResult`](crate::ParseResult).

/// An error raised while opening a workbook or configuring a parser.
#[derive(Debug)]
pub enum Error {
    /// I/O error while reading the source
    Io(std::io::Error),
    /// The workbook could not be decoded
    Workbook(calamine::Error),
    /// The workbook has no sheet at all
    EmptyWorkbook,
    /// Sheet index out of range
    SheetIndex {
        /// requested index
        idx: usize,
        /// number of sheets in the workbook
        count: usize,
    },
    /// No sheet with this name
    SheetName(String),
    /// Illegal parser configuration
    Config(String),
    /// No two-row month header could be reconstructed
    CompoundHeader(String),
}

/// Result type
pub type ImportResult<T> = std::result::Result<T, Error>;

from_err!(std::io::Error, Error, Io);
from_err!(calamine::Error, Error, Workbook);

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Io(e) => write!(f, "I/O error: {e}"),
            Error::Workbook(e) => write!(f, "Workbook error: {e}"),
            Error::EmptyWorkbook => write!(f, "Workbook has no sheets"),
            Error::SheetIndex { idx, count } => {
                write!(f, "Invalid sheet index {idx}, workbook has {count} sheet(s)")
            }
            Error::SheetName(name) => write!(f, "Sheet '{name}' not found"),
            Error::Config(e) => write!(f, "Invalid parser configuration: {e}"),
            Error::CompoundHeader(e) => write!(f, "Compound header error: {e}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            Error::Workbook(e) => Some(e),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_messages() {
        let e = Error::SheetIndex { idx: 3, count: 1 };
        assert_eq!(e.to_string(), "Invalid sheet index 3, workbook has 1 sheet(s)");
        let e: Error = std::io::Error::new(std::io::ErrorKind::Other, "boom").into();
        assert!(std::error::Error::source(&e).is_some());
        assert!(Error::SheetName("x".into()).to_string().contains("'x'"));
    }
}
