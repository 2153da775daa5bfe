//! Stateless value normalizers shared by every parser.

use std::sync::LazyLock;

use chrono::{Datelike, NaiveDate};
use regex::Regex;

use crate::utils::fold;

static CLASSIFIER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+(\.\d+){1,5}$").unwrap());
static DNI_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d{8}$").unwrap());
static YEAR_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b(20\d{2})\b").unwrap());

/// Placeholders used in the source files for "no amount".
const DASHES: [&str; 3] = ["-", "—", "–"];

/// Date layouts found in the source files, tried in order.
const DATE_FORMATS: [&str; 4] = ["%d/%m/%Y", "%d-%m-%Y", "%Y-%m-%d", "%d/%m/%y"];

/// Trimmed text of a cell.
pub fn clean_str(s: &str) -> String {
    s.trim().to_string()
}

/// Parses an amount, `None` when the text holds no number.
///
/// Whitespace and thousands separators are removed and leading currency markers
/// (`S`, `/`, `.`, `$`, spaces) are stripped, so `"S/. 1,234.50"` reads as `1234.5`.
pub fn parse_decimal(s: &str) -> Option<f64> {
    let s = s.trim();
    if s.is_empty() || DASHES.contains(&s) {
        return None;
    }
    let s = s.trim_start_matches(['S', '/', '.', '$', ' ']);
    let digits: String = s
        .chars()
        .filter(|c| *c != ',' && !c.is_whitespace())
        .collect();
    if digits.is_empty() {
        return None;
    }
    fast_float2::parse::<f64, _>(digits.as_bytes())
        .ok()
        .filter(|v| v.is_finite())
}

/// Parses an amount, `default` when the text holds no number.
pub fn to_decimal(s: &str, default: f64) -> f64 {
    parse_decimal(s).unwrap_or(default)
}

/// Parses a ratio: `"85%"` gives `0.85`, plain numbers are kept as written.
pub fn parse_percentage(s: &str) -> Option<f64> {
    let s = s.trim();
    match s.strip_suffix('%') {
        Some(pct) => parse_decimal(pct).map(|v| v / 100.0),
        None => parse_decimal(s),
    }
}

/// Best-effort integer parse: float first, then truncated.
pub fn to_int(s: &str, default: i64) -> i64 {
    let s = s.trim();
    if s.is_empty() {
        return default;
    }
    fast_float2::parse::<f64, _>(s.as_bytes())
        .ok()
        .filter(|v| v.is_finite())
        .map_or(default, |v| v.trunc() as i64)
}

/// Fiscal year held in `s`: a plain number (`2026`, `2026.0`) or the first `20xx` token
/// of a longer text such as `"AF 2026"`.
pub fn parse_year(s: &str) -> Option<i32> {
    let n = to_int(s, 0);
    if (1900..=2100).contains(&n) {
        return Some(n as i32);
    }
    YEAR_RE
        .captures(s)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Removes every whitespace character from a classifier code.
pub fn normalize_classifier_code(s: &str) -> String {
    s.chars().filter(|c| !c.is_whitespace()).collect()
}

/// Checks a normalized code against `\d+(\.\d+){1,5}`.
pub fn is_valid_classifier(code: &str) -> bool {
    CLASSIFIER_RE.is_match(code)
}

/// Normalizes a national ID: spaces, dots and dashes are dropped and exactly 8 digits
/// must remain.
pub fn normalize_dni(s: &str) -> Option<String> {
    let dni: String = s
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '.' && *c != '-')
        .collect();
    DNI_RE.is_match(&dni).then_some(dni)
}

/// CEPLAN activity codes such as `AOI00000500001`: at least six characters, one a digit.
pub fn is_valid_ao_code(code: &str) -> bool {
    let code: Vec<char> = code.chars().filter(|c| !c.is_whitespace()).collect();
    code.len() >= 6 && code.iter().any(|c| c.is_ascii_digit())
}

/// Outcome of date normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DateValue {
    /// No date in the cell
    Empty,
    /// ISO `YYYY-MM-DD`
    Iso(String),
    /// Text that is not a known date layout, kept for manual review
    Raw(String),
}

impl DateValue {
    /// The text to store, `None` when empty.
    pub fn into_option(self) -> Option<String> {
        match self {
            DateValue::Empty => None,
            DateValue::Iso(s) | DateValue::Raw(s) => Some(s),
        }
    }
}

/// Normalizes a date cell to ISO.
pub fn normalize_date(s: &str) -> DateValue {
    let s = s.trim();
    if s.is_empty() {
        return DateValue::Empty;
    }
    // datetimes carry a time part after a space
    let day = s.split_whitespace().next().unwrap_or(s);
    DATE_FORMATS
        .iter()
        .filter_map(|fmt| NaiveDate::parse_from_str(day, fmt).ok())
        .find(|d| d.year() >= 1900)
        .map_or_else(
            || DateValue::Raw(s.to_string()),
            |d| DateValue::Iso(d.format("%Y-%m-%d").to_string()),
        )
}

/// `true` iff every cell is blank.
pub fn is_empty_row<S: AsRef<str>>(cells: &[S]) -> bool {
    cells.iter().all(|c| c.as_ref().trim().is_empty())
}

/// `true` iff a cell contains one of `keywords`, ignoring case and accents.
///
/// Keywords are expected lowercase and unaccented.
pub fn is_header_row<S: AsRef<str>>(cells: &[S], keywords: &[&str]) -> bool {
    cells.iter().any(|c| {
        let c = fold(c.as_ref());
        keywords.iter().any(|k| c.contains(k))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("1,234.50", 1234.5)]
    #[case("S/. 1,234.50", 1234.5)]
    #[case("$ 10", 10.0)]
    #[case(" 120000 ", 120000.0)]
    #[case("-500", -500.0)]
    #[case("-", 0.0)]
    #[case("—", 0.0)]
    #[case("abc", 0.0)]
    #[case("", 0.0)]
    fn decimals(#[case] input: &str, #[case] expected: f64) {
        assert_eq!(to_decimal(input, 0.0), expected);
    }

    #[test]
    fn decimal_default() {
        assert_eq!(to_decimal("n/a", -1.0), -1.0);
        assert_eq!(parse_decimal("—"), None);
    }

    #[rstest]
    #[case("2026", 2026)]
    #[case("2026.0", 2026)]
    #[case(" 7.9 ", 7)]
    #[case("x", -1)]
    fn ints(#[case] input: &str, #[case] expected: i64) {
        assert_eq!(to_int(input, -1), expected);
    }

    #[test]
    fn years() {
        assert_eq!(parse_year("2026"), Some(2026));
        assert_eq!(parse_year("AF 2025"), Some(2025));
        assert_eq!(parse_year("sin año"), None);
        assert_eq!(parse_year(""), None);
    }

    #[rstest]
    #[case("2.3.1.5.1.2")]
    #[case("2.1")]
    #[case("2.6.3.2.3.1")]
    fn classifier_idempotent(#[case] code: &str) {
        let once = normalize_classifier_code(code);
        assert!(is_valid_classifier(&once));
        assert_eq!(normalize_classifier_code(&once), once);
    }

    #[rstest]
    #[case("2. 3. 1", true)]
    #[case("2", false)]
    #[case("2.3.1.5.1.2.9", false)]
    #[case("2.3.a", false)]
    #[case("TOTAL", false)]
    fn classifier_validity(#[case] raw: &str, #[case] valid: bool) {
        assert_eq!(is_valid_classifier(&normalize_classifier_code(raw)), valid);
    }

    #[rstest]
    #[case("12345678", Some("12345678"))]
    #[case(" 1234-5678 ", Some("12345678"))]
    #[case("123", None)]
    #[case("123456789", None)]
    #[case("12AB5678", None)]
    fn dnis(#[case] raw: &str, #[case] expected: Option<&str>) {
        assert_eq!(normalize_dni(raw).as_deref(), expected);
    }

    #[rstest]
    #[case("15/01/2026", DateValue::Iso("2026-01-15".into()))]
    #[case("15-01-2026", DateValue::Iso("2026-01-15".into()))]
    #[case("2026-01-15", DateValue::Iso("2026-01-15".into()))]
    #[case("2026-01-15 00:00:00", DateValue::Iso("2026-01-15".into()))]
    #[case("15/01/26", DateValue::Iso("2026-01-15".into()))]
    #[case("enero", DateValue::Raw("enero".into()))]
    #[case(" ", DateValue::Empty)]
    fn dates(#[case] raw: &str, #[case] expected: DateValue) {
        assert_eq!(normalize_date(raw), expected);
    }

    #[test]
    fn rows() {
        assert!(is_empty_row(&["", "  "]));
        assert!(!is_empty_row(&["", "x"]));
        assert!(is_header_row(&["", "Clasificador"], &["clasificador"]));
        assert!(is_header_row(&["DESCRIPCIÓN"], &["descripcion"]));
        assert!(!is_header_row(&["2.3.1"], &["pim"]));
    }

    #[rstest]
    #[case("AOI00000500001", true)]
    #[case("AO 0001", true)]
    #[case("AO-1", false)]
    #[case("ABCDEFGH", false)]
    #[case("", false)]
    fn ao_codes(#[case] code: &str, #[case] valid: bool) {
        assert_eq!(is_valid_ao_code(code), valid);
    }

    #[test]
    fn percentages() {
        assert_eq!(parse_percentage("85%"), Some(0.85));
        assert_eq!(parse_percentage(" 12.5 % "), Some(0.125));
        assert_eq!(parse_percentage("0.4321"), Some(0.4321));
        assert_eq!(parse_percentage("-"), None);
        assert_eq!(parse_percentage(""), None);
    }
}
