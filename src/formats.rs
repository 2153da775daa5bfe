//! The closed set of workbook layouts.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

/// A budget workbook layout.
///
/// # Examples
///
/// ```
/// use presupuesto_import::Format;
///
/// let f: Format = "FORMATO_5B".parse().unwrap();
/// assert_eq!(f, Format::Formato5B);
/// assert_eq!(f.to_string(), "FORMATO_5B");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Format {
    /// UE, meta and operational activity master hierarchy
    #[serde(rename = "CUADRO_AO_META")]
    CuadroAoMeta,
    /// Expenditure classifier reference table
    #[serde(rename = "TABLAS")]
    Tablas,
    /// Annual programming by classifier (PIA, PIM, months)
    #[serde(rename = "FORMATO_1")]
    Formato1,
    /// Programming by meta, AO and task
    #[serde(rename = "FORMATO_2")]
    Formato2,
    /// Execution with justification
    #[serde(rename = "FORMATO_3")]
    Formato3,
    /// Budget modification note
    #[serde(rename = "FORMATO_04")]
    Formato04,
    /// Monthly programming by AO
    #[serde(rename = "FORMATO_5A")]
    Formato5A,
    /// Monthly programmed / executed / balance by AO, two-row header
    #[serde(rename = "FORMATO_5B")]
    Formato5B,
    /// Execution summary by AO with traffic light
    #[serde(rename = "FORMATO_5_RESUMEN")]
    Formato5Resumen,
    /// Staff annex
    #[serde(rename = "ANEXO_01")]
    Anexo01,
    /// SIAF execution export
    #[serde(rename = "SIAF")]
    Siaf,
    /// SIGA requirements export
    #[serde(rename = "SIGA")]
    Siga,
    /// Not recognized
    #[serde(rename = "DESCONOCIDO")]
    Unknown,
}

impl Format {
    /// Every known format, detection order aside.
    pub const ALL: [Format; 12] = [
        Format::CuadroAoMeta,
        Format::Tablas,
        Format::Formato1,
        Format::Formato2,
        Format::Formato3,
        Format::Formato04,
        Format::Formato5A,
        Format::Formato5B,
        Format::Formato5Resumen,
        Format::Anexo01,
        Format::Siaf,
        Format::Siga,
    ];

    /// Tag of the format
    pub fn as_str(&self) -> &'static str {
        match self {
            Format::CuadroAoMeta => "CUADRO_AO_META",
            Format::Tablas => "TABLAS",
            Format::Formato1 => "FORMATO_1",
            Format::Formato2 => "FORMATO_2",
            Format::Formato3 => "FORMATO_3",
            Format::Formato04 => "FORMATO_04",
            Format::Formato5A => "FORMATO_5A",
            Format::Formato5B => "FORMATO_5B",
            Format::Formato5Resumen => "FORMATO_5_RESUMEN",
            Format::Anexo01 => "ANEXO_01",
            Format::Siaf => "SIAF",
            Format::Siga => "SIGA",
            Format::Unknown => "DESCONOCIDO",
        }
    }

    /// Short name used as a message prefix
    pub fn label(&self) -> &'static str {
        match self {
            Format::CuadroAoMeta => "CuadroAOMeta",
            Format::Tablas => "Tablas",
            Format::Formato1 => "Formato1",
            Format::Formato2 => "Formato2",
            Format::Formato3 => "Formato3",
            Format::Formato04 => "Formato04",
            Format::Formato5A => "Formato5A",
            Format::Formato5B => "Formato5B",
            Format::Formato5Resumen => "Formato5Resumen",
            Format::Anexo01 => "Anexo01",
            Format::Siaf => "SIAF",
            Format::Siga => "SIGA",
            Format::Unknown => "Desconocido",
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Format {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Format::ALL
            .iter()
            .chain(std::iter::once(&Format::Unknown))
            .find(|f| f.as_str().eq_ignore_ascii_case(s))
            .copied()
            .ok_or_else(|| format!("unknown format tag '{s}'"))
    }
}
