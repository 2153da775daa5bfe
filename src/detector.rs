//! Format detection.
//!
//! Three passes, the first hit wins:
//! 1. sheet names against known name fragments,
//! 2. the first rows of the first sheet against keyword sets (every keyword must appear),
//! 3. the width of the widest row of the first sheet.

use crate::formats::Format;
use crate::table::{Grid, SheetSelector, Workbook};
use crate::utils::fold;

/// Rows of the first sheet searched for keywords.
const KEYWORD_ROWS: usize = 15;

/// Sheet-name fragments, lowercase and unaccented, in priority order.
const NAME_FRAGMENTS: &[(&str, Format)] = &[
    ("cuadro ao-meta", Format::CuadroAoMeta),
    ("cuadro ao meta", Format::CuadroAoMeta),
    ("ao-meta", Format::CuadroAoMeta),
    ("tabla", Format::Tablas),
    ("formato 1", Format::Formato1),
    ("formato1", Format::Formato1),
    ("formato 2", Format::Formato2),
    ("formato2", Format::Formato2),
    ("formato 3", Format::Formato3),
    ("formato3", Format::Formato3),
    ("formato 04", Format::Formato04),
    ("formato04", Format::Formato04),
    ("formato 4", Format::Formato04),
    ("formato4", Format::Formato04),
    ("formato 5.a", Format::Formato5A),
    ("formato5a", Format::Formato5A),
    ("formato 5a", Format::Formato5A),
    ("f5a", Format::Formato5A),
    ("formato 5.b", Format::Formato5B),
    ("formato5b", Format::Formato5B),
    ("formato 5b", Format::Formato5B),
    ("f5b", Format::Formato5B),
    ("formato 5 resumen", Format::Formato5Resumen),
    ("5 resumen", Format::Formato5Resumen),
    ("resumen 5", Format::Formato5Resumen),
    ("5-resumen", Format::Formato5Resumen),
    ("5resumen", Format::Formato5Resumen),
    ("5_resumen", Format::Formato5Resumen),
    ("anexo 01", Format::Anexo01),
    ("anexo01", Format::Anexo01),
    ("anexo_01", Format::Anexo01),
    ("siaf", Format::Siaf),
    ("siga", Format::Siga),
];

/// Header keyword sets, lowercase and unaccented, most specific first.
const KEYWORD_SETS: &[(&[&str], Format)] = &[
    (&["ceplan", "aei", "oei"], Format::CuadroAoMeta),
    (&["clasificador", "tipo generico"], Format::Tablas),
    (&["habilitadora", "habilitada", "clasificador"], Format::Formato04),
    (&["asignado", "habilitadora", "habilitada"], Format::Formato04),
    (&["justificacion", "clasificador"], Format::Formato3),
    (&["cod tarea", "clasificador", "pim"], Format::Formato2),
    (&["tarea", "clasificador", "cod ao"], Format::Formato2),
    (&["codigo ao", "devengado", "semaforo"], Format::Formato5Resumen),
    (&["codigo ao", "devengado", "% avance pim"], Format::Formato5Resumen),
    (&["devengado", "girado", "compromiso"], Format::Siaf),
    (&["pia", "pim", "clasificador"], Format::Formato1),
    (&["programado", "ejecutado", "saldo"], Format::Formato5B),
    (&["programado", "codigo ao"], Format::Formato5A),
    (&["dni", "remuneracion"], Format::Anexo01),
    (&["anexo", "certificacion"], Format::Anexo01),
    (&["siga", "requerimiento"], Format::Siga),
];

/// Inclusive ranges of non-empty cells in the widest row.
const COLUMN_COUNTS: &[(usize, usize, Format)] = &[
    (40, 50, Format::Formato5B),
    (20, 26, Format::Formato5A),
    (4, 8, Format::Formato04),
];

/// Classifies `workbook`, [`Format::Unknown`] when nothing matches or it cannot be read.
pub fn detect_format(workbook: &Workbook) -> Format {
    let names = match workbook.sheet_names() {
        Ok(names) => names,
        Err(e) => {
            log::warn!("cannot list sheets: {e}");
            return Format::Unknown;
        }
    };
    if let Some(f) = detect_by_sheet_names(&names) {
        log::debug!("format {f} detected from sheet names");
        return f;
    }
    let grid = match workbook.read_sheet(&SheetSelector::Index(0)) {
        Ok(grid) => grid,
        Err(e) => {
            log::warn!("cannot read first sheet: {e}");
            return Format::Unknown;
        }
    };
    if let Some(f) = detect_by_keywords(&grid) {
        log::debug!("format {f} detected from header keywords");
        return f;
    }
    if let Some(f) = detect_by_column_count(&grid) {
        log::debug!("format {f} detected from column count");
        return f;
    }
    log::debug!("format not detected");
    Format::Unknown
}

/// Pass 1: every sheet in order, name fragments then the `ao` + `meta` token rule.
pub fn detect_by_sheet_names<S: AsRef<str>>(names: &[S]) -> Option<Format> {
    names.iter().find_map(|name| {
        let name = fold(name.as_ref().trim());
        NAME_FRAGMENTS
            .iter()
            .find(|(fragment, _)| name.contains(fragment))
            .map(|(_, f)| *f)
            .or_else(|| {
                let tokens: Vec<&str> = name
                    .split(|c: char| !c.is_alphanumeric())
                    .filter(|t| !t.is_empty())
                    .collect();
                (tokens.contains(&"ao") && tokens.contains(&"meta")).then_some(Format::CuadroAoMeta)
            })
    })
}

/// Pass 2: the first rows, joined, must contain every keyword of a set.
pub fn detect_by_keywords(grid: &Grid) -> Option<Format> {
    let text = grid
        .rows()
        .take(KEYWORD_ROWS)
        .flat_map(|r| r.iter())
        .map(|c| fold(c.trim()))
        .filter(|c| !c.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    KEYWORD_SETS
        .iter()
        .find(|(keywords, _)| keywords.iter().all(|k| text.contains(k)))
        .map(|(_, f)| *f)
}

/// Pass 3: number of non-empty cells of the widest row.
pub fn detect_by_column_count(grid: &Grid) -> Option<Format> {
    let width = grid
        .rows()
        .map(|r| r.iter().filter(|c| !c.trim().is_empty()).count())
        .max()?;
    COLUMN_COUNTS
        .iter()
        .find(|(lo, hi, _)| (*lo..=*hi).contains(&width))
        .map(|(_, _, f)| *f)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sheet_names() {
        assert_eq!(detect_by_sheet_names(&["Hoja1", "TABLAS"]), Some(Format::Tablas));
        assert_eq!(detect_by_sheet_names(&["Cuadro AO-META 2026"]), Some(Format::CuadroAoMeta));
        assert_eq!(detect_by_sheet_names(&["AO y Meta"]), Some(Format::CuadroAoMeta));
        assert_eq!(detect_by_sheet_names(&["Formato 5 Resumen"]), Some(Format::Formato5Resumen));
        assert_eq!(detect_by_sheet_names(&["Formato 5.B"]), Some(Format::Formato5B));
        assert_eq!(detect_by_sheet_names(&["FORMATO 04"]), Some(Format::Formato04));
        assert_eq!(detect_by_sheet_names(&["Anexo 01"]), Some(Format::Anexo01));
        assert_eq!(detect_by_sheet_names(&["Metas"]), None);
        assert_eq!(detect_by_sheet_names(&["Hoja1"]), None);
    }

    #[test]
    fn keywords() {
        let grid = Grid::from_rows(
            "Hoja1",
            &[
                vec!["FORMATO DE PROGRAMACION", "", ""],
                vec!["Clasificador", "Descripción", "PIA", "PIM", "Ene"],
            ],
        );
        assert_eq!(detect_by_keywords(&grid), Some(Format::Formato1));

        let grid = Grid::from_rows(
            "Hoja1",
            &[vec!["Código AO", "Nombre", "Devengado", "% Avance PIM", "Semáforo"]],
        );
        assert_eq!(detect_by_keywords(&grid), Some(Format::Formato5Resumen));

        let grid = Grid::from_rows("Hoja1", &[vec!["DNI", "Apellidos y Nombres", "Remuneración"]]);
        assert_eq!(detect_by_keywords(&grid), Some(Format::Anexo01));

        let grid = Grid::from_rows("Hoja1", &[vec!["a", "b"]]);
        assert_eq!(detect_by_keywords(&grid), None);
    }

    #[test]
    fn column_counts() {
        let row = |n: usize| (0..n).map(|i| format!("c{i}")).collect::<Vec<_>>();
        assert_eq!(
            detect_by_column_count(&Grid::from_rows("x", &[row(3), row(44)])),
            Some(Format::Formato5B)
        );
        assert_eq!(detect_by_column_count(&Grid::from_rows("x", &[row(22)])), Some(Format::Formato5A));
        assert_eq!(detect_by_column_count(&Grid::from_rows("x", &[row(6)])), Some(Format::Formato04));
        assert_eq!(detect_by_column_count(&Grid::from_rows("x", &[row(12)])), None);
        assert_eq!(detect_by_column_count(&Grid::default()), None);
    }
}
