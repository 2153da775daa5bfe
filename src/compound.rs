//! Two-row month header reconstruction.
//!
//! Row A carries the month groups, each spanning several physical columns, and row B repeats
//! the sub-labels (`Programado`, `Ejecutado`, `Saldo`) under every group:
//!
//! ```text
//! | Codigo AO | Nombre AO | Enero      |           |       | Febrero    | ...
//! |           |           | Programado | Ejecutado | Saldo | Programado | ...
//! ```
//!
//! The pair is folded into one composite name per column (`Enero_programado`, ...) and the
//! composites that decompose into a month and a sub-label give the month map.

use std::collections::BTreeMap;
use std::ops::Range;

use crate::errors::{Error, ImportResult};
use crate::months::month_number;
use crate::normalize::clean_str;
use crate::table::Grid;
use crate::utils::fold;

/// Repeating sub-column of a month group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SubLabel {
    /// Programmed amount
    Programado,
    /// Executed amount
    Ejecutado,
    /// Balance
    Saldo,
}

impl SubLabel {
    /// Recognizes `Programado`, `Prog.`, `Ejecutado`, `Ejec.`, `Saldo`, ...
    pub fn parse(label: &str) -> Option<SubLabel> {
        let label = fold(label.trim());
        if label.starts_with("prog") {
            Some(SubLabel::Programado)
        } else if label.starts_with("ejec") {
            Some(SubLabel::Ejecutado)
        } else if label.starts_with("sald") {
            Some(SubLabel::Saldo)
        } else {
            None
        }
    }

    /// Canonical lowercase name, used in composite names
    pub fn as_str(&self) -> &'static str {
        match self {
            SubLabel::Programado => "programado",
            SubLabel::Ejecutado => "ejecutado",
            SubLabel::Saldo => "saldo",
        }
    }
}

/// Columns of one month.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MonthTriple {
    /// Programmed column
    pub programado: Option<usize>,
    /// Executed column
    pub ejecutado: Option<usize>,
    /// Balance column
    pub saldo: Option<usize>,
}

impl MonthTriple {
    /// Column of `sub`
    pub fn get(&self, sub: SubLabel) -> Option<usize> {
        match sub {
            SubLabel::Programado => self.programado,
            SubLabel::Ejecutado => self.ejecutado,
            SubLabel::Saldo => self.saldo,
        }
    }

    fn slot(&mut self, sub: SubLabel) -> &mut Option<usize> {
        match sub {
            SubLabel::Programado => &mut self.programado,
            SubLabel::Ejecutado => &mut self.ejecutado,
            SubLabel::Saldo => &mut self.saldo,
        }
    }
}

/// A reconstructed header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompoundHeader {
    row_a: usize,
    columns: Vec<String>,
    months: BTreeMap<u32, MonthTriple>,
}

impl CompoundHeader {
    /// Builds the header from an explicit row pair.
    pub fn from_rows<S: AsRef<str>>(row_a: &[S], row_b: &[S]) -> ImportResult<CompoundHeader> {
        let columns = composite_names(row_a, row_b);
        let months = month_triples(&columns);
        if months.is_empty() {
            return Err(Error::CompoundHeader(
                "no column decomposes into a month and a sub-label".to_string(),
            ));
        }
        Ok(CompoundHeader {
            row_a: 0,
            columns,
            months,
        })
    }

    /// 0-based sheet row of the group labels
    pub fn row_a(&self) -> usize {
        self.row_a
    }

    /// 0-based sheet row of the sub-labels
    pub fn row_b(&self) -> usize {
        self.row_a + 1
    }

    /// One composite name per physical column
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Month number to its columns
    pub fn months(&self) -> &BTreeMap<u32, MonthTriple> {
        &self.months
    }

    /// Composite name of the `sub` column of `month`.
    pub fn column_name(&self, month: u32, sub: SubLabel) -> Option<&str> {
        let idx = self.months.get(&month)?.get(sub)?;
        self.columns.get(idx).map(String::as_str)
    }
}

fn cell<S: AsRef<str>>(row: &[S], c: usize) -> String {
    row.get(c).map_or_else(String::new, |s| clean_str(s.as_ref()))
}

/// `true` when row B holds a sub-label and row A a month name.
pub fn is_header_pair<S: AsRef<str>>(row_a: &[S], row_b: &[S]) -> bool {
    row_b.iter().any(|c| SubLabel::parse(c.as_ref()).is_some())
        && row_a.iter().any(|c| month_number(c.as_ref()).is_some())
}

/// First row `r` in `window` such that `(r, r + 1)` is a header pair.
pub fn find_header_pair(grid: &Grid, window: Range<usize>) -> Option<usize> {
    let end = window.end.min(grid.height());
    (window.start..end.saturating_sub(1)).find(|&r| is_header_pair(grid.row(r), grid.row(r + 1)))
}

/// Folds the row pair, left to right, into one composite name per column.
///
/// The group label of row A carries over blank cells. A recognized sub-label under a group
/// gives `group_sublabel`; otherwise the name is row B's text, the carried group, or
/// `col_{i}`.
pub fn composite_names<S: AsRef<str>>(row_a: &[S], row_b: &[S]) -> Vec<String> {
    let width = row_a.len().max(row_b.len());
    let (names, _) = (0..width).fold(
        (Vec::with_capacity(width), None::<String>),
        |(mut names, group), i| {
            let a = cell(row_a, i);
            let b = cell(row_b, i);
            let group = if a.is_empty() { group } else { Some(a) };
            let name = match (SubLabel::parse(&b), &group) {
                (Some(sub), Some(g)) => format!("{g}_{}", sub.as_str()),
                _ if !b.is_empty() => b,
                (_, Some(g)) => g.clone(),
                _ => format!("col_{i}"),
            };
            names.push(name);
            (names, group)
        },
    );
    names
}

/// Month map of composite names shaped `month_sublabel`; the first column wins on repeats.
pub fn month_triples(names: &[String]) -> BTreeMap<u32, MonthTriple> {
    let mut months: BTreeMap<u32, MonthTriple> = BTreeMap::new();
    for (i, name) in names.iter().enumerate() {
        let mut parts = name.split('_');
        let (Some(prefix), Some(suffix)) = (parts.next(), parts.last()) else {
            continue;
        };
        let (Some(month), Some(sub)) = (month_number(prefix), SubLabel::parse(suffix)) else {
            continue;
        };
        months.entry(month).or_default().slot(sub).get_or_insert(i);
    }
    months
}

/// Locates the header pair of `grid` and reconstructs it.
///
/// With a `hint`, only the pair starting at that row is considered; otherwise the first
/// qualifying pair in `window` is used.
pub fn reconstruct(
    grid: &Grid,
    window: Range<usize>,
    hint: Option<usize>,
) -> ImportResult<CompoundHeader> {
    let row_a = match hint {
        Some(r) => Some(r).filter(|&r| is_header_pair(grid.row(r), grid.row(r + 1))),
        None => find_header_pair(grid, window.clone()),
    }
    .ok_or_else(|| {
        Error::CompoundHeader(format!(
            "no month / sub-label row pair in rows {}..{}",
            window.start + 1,
            window.end
        ))
    })?;
    let mut header = CompoundHeader::from_rows(grid.row(row_a), grid.row(row_a + 1))?;
    header.row_a = row_a;
    log::debug!(
        "compound header at rows {}-{}: {} month(s)",
        row_a,
        row_a + 1,
        header.months.len()
    );
    Ok(header)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::months::MONTH_NAMES;

    fn header_pair() -> (Vec<String>, Vec<String>) {
        let mut a = vec!["Codigo AO".to_string(), "Nombre AO".to_string()];
        let mut b = vec![String::new(), String::new()];
        for m in MONTH_NAMES.iter().chain(["Total"].iter()) {
            a.extend([capitalize(m), String::new(), String::new()]);
            b.extend(["Programado", "Ejecutado", "Saldo"].map(String::from));
        }
        (a, b)
    }

    fn capitalize(s: &str) -> String {
        let mut c = s.chars();
        c.next()
            .map(|f| f.to_uppercase().chain(c).collect())
            .unwrap_or_default()
    }

    #[test]
    fn full_year_with_total() {
        let (a, b) = header_pair();
        let header = CompoundHeader::from_rows(&a, &b).unwrap();
        assert_eq!(header.months().keys().copied().collect::<Vec<_>>(), (1..=12u32).collect::<Vec<_>>());
        assert_eq!(header.column_name(1, SubLabel::Programado), Some("Enero_programado"));
        assert_eq!(header.column_name(1, SubLabel::Ejecutado), Some("Enero_ejecutado"));
        assert_eq!(header.column_name(2, SubLabel::Saldo), Some("Febrero_saldo"));
        assert_eq!(header.column_name(12, SubLabel::Saldo), Some("Diciembre_saldo"));
        let jan = header.months()[&1];
        assert_eq!((jan.programado, jan.ejecutado, jan.saldo), (Some(2), Some(3), Some(4)));
        assert_eq!(header.columns()[0], "Codigo AO");
        assert_eq!(header.columns()[38], "Total_programado");
    }

    #[test]
    fn abbreviations_and_carried_groups() {
        let a = ["", "Ene", "", "Feb.", "", "", "Obs"];
        let b = ["Cod", "Prog.", "Ejec.", "Programado", "Ejecutado", "Saldo", ""];
        let names = composite_names(&a, &b);
        assert_eq!(
            names,
            [
                "Cod",
                "Ene_programado",
                "Ene_ejecutado",
                "Feb._programado",
                "Feb._ejecutado",
                "Feb._saldo",
                "Obs"
            ]
        );
        let months = month_triples(&names);
        assert_eq!(months.len(), 2);
        assert_eq!(months[&1].saldo, None);
        assert_eq!(months[&2].saldo, Some(5));
    }

    #[test]
    fn placeholder_names() {
        assert_eq!(composite_names(&["", "X"], &["", ""]), ["col_0", "X"]);
    }

    #[test]
    fn no_month_map() {
        let err = CompoundHeader::from_rows(&["Total", ""], &["Programado", "Saldo"]);
        assert!(matches!(err, Err(Error::CompoundHeader(_))));
    }

    #[test]
    fn locate_pair() {
        let (a, b) = header_pair();
        let mut rows = vec![vec!["FORMATO 5B".to_string()], vec![], vec![]];
        rows.push(a);
        rows.push(b);
        rows.push(vec!["AOI0001".to_string()]);
        let grid = Grid::from_rows("5B", &rows);
        assert_eq!(find_header_pair(&grid, 0..13), Some(3));
        let header = reconstruct(&grid, 0..13, None).unwrap();
        assert_eq!((header.row_a(), header.row_b()), (3, 4));
        assert!(reconstruct(&grid, 0..13, Some(2)).is_err());
        assert!(reconstruct(&grid, 0..3, None).is_err());
    }
}
