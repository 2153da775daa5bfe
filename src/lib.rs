//! Budget spreadsheet importer
//!
//! # Status
//!
//! **presupuesto-import** reads the Excel workbooks exchanged by the INEI budget office
//! (programming formats, SIAF execution exports, SIGA requirements, staff registers),
//! recognizes their layout and normalizes their rows into typed records.
//!
//! Decoding is left to [`calamine`]; this crate deals with what comes after: finding the
//! header row, resolving column aliases, reading the unit context above the table, cleaning
//! codes and amounts, and cross-checking monthly figures against annual totals.
//!
//! Parsing never panics nor fails on bad rows. Structural problems are collected as errors,
//! row level corrections as warnings, both in the returned [`ParseResult`].
//!
//! # Examples
//! ```no_run
//! use presupuesto_import::{parse_workbook, Record, Workbook};
//!
//! let workbook = Workbook::from_path("FORMATO_5B_2026.xlsx").expect("cannot open file");
//! let result = parse_workbook(workbook);
//! println!("{}", result.summary());
//!
//! for warning in result.warnings() {
//!     println!("{warning}");
//! }
//! let monthly = result
//!     .records()
//!     .iter()
//!     .filter(|r| matches!(r, Record::ProgramacionMensual(_)))
//!     .count();
//! println!("{monthly} monthly records");
//! ```
//!
//! A known layout can be forced, with its own configuration:
//! ```no_run
//! use presupuesto_import::{parse_as, Format, ParserConfig, Workbook};
//!
//! let workbook = Workbook::from_path("siaf.xlsx").expect("cannot open file");
//! let config = ParserConfig::for_format(Format::Siaf).with_anio(2025);
//! let result = parse_as(Format::Siaf, workbook, config);
//! assert!(result.is_ok(), "{:?}", result.errors());
//! ```
#![warn(missing_docs)]

#[macro_use]
mod utils;

pub mod columns;
pub mod compound;
mod config;
pub mod context;
mod detector;
pub mod errors;
mod formats;
pub mod months;
pub mod normalize;
mod parsers;
pub mod records;
mod result;
mod table;

pub use crate::config::{default_data_start_row, HeaderRow, ParserConfig, RECONCILIATION_TOLERANCE};
pub use crate::detector::{
    detect_by_column_count, detect_by_keywords, detect_by_sheet_names, detect_format,
};
pub use crate::errors::{Error, ImportResult};
pub use crate::formats::Format;
pub use crate::parsers::{
    missing_columns, parse_as, parse_workbook, Anexo01Parser, CuadroAoMetaParser,
    FormatParser, Formato04Parser, Formato1Parser, Formato2Parser, Formato3Parser,
    Formato5AParser, Formato5BParser, Formato5ResumenParser, SiafParser, SigaParser,
    TablasParser,
};
pub use crate::records::{
    ActividadOperativa, AoResumen, ClasificadorGasto, MetaPresupuestal, ModificacionPresupuestal,
    PersonalRrhh, ProgramacionMensual, ProgramacionPresupuestal, Record, SigaRequerimiento,
    TipoModificacion, TipoUe, UnidadEjecutora,
};
pub use crate::result::{ParseResult, Warning, WarningKind};
pub use crate::table::{
    cell_text, Grid, LoadOptions, Row, SheetSelector, Table, Workbook, DEFAULT_FORWARD_FILL,
};
