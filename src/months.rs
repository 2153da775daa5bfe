//! Month tokens and twelve-month column resolution.

use crate::utils::fold;

/// Month number and the prefixes its headers start with.
///
/// A prefix covers both spellings, `"ene"` matches `Ene` and `Enero`; September is spelled
/// `setiembre` in Peru.
const MONTH_PREFIXES: [(u32, &[&str]); 12] = [
    (1, &["ene"]),
    (2, &["feb"]),
    (3, &["mar"]),
    (4, &["abr"]),
    (5, &["may"]),
    (6, &["jun"]),
    (7, &["jul"]),
    (8, &["ago"]),
    (9, &["sep", "set"]),
    (10, &["oct"]),
    (11, &["nov"]),
    (12, &["dic"]),
];

/// Month names, as used in messages.
pub const MONTH_NAMES: [&str; 12] = [
    "enero",
    "febrero",
    "marzo",
    "abril",
    "mayo",
    "junio",
    "julio",
    "agosto",
    "setiembre",
    "octubre",
    "noviembre",
    "diciembre",
];

/// Month number (1-12) of a header label, ignoring case and accents.
pub fn month_number(label: &str) -> Option<u32> {
    let label = fold(label.trim());
    if label.is_empty() {
        return None;
    }
    MONTH_PREFIXES
        .iter()
        .find(|(_, prefixes)| prefixes.iter().any(|p| label.starts_with(p)))
        .map(|(n, _)| *n)
}

/// Quarter (1-4) of a month.
pub fn quarter(month: u32) -> u32 {
    (month + 2) / 3
}

/// Column of each month, January first.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MonthColumns {
    columns: [Option<usize>; 12],
    positional: bool,
}

impl MonthColumns {
    /// Column of `month` (1-12)
    pub fn get(&self, month: u32) -> Option<usize> {
        let idx = (month as usize).checked_sub(1)?;
        self.columns.get(idx).copied().flatten()
    }

    /// Number of months with a column
    pub fn resolved(&self) -> usize {
        self.columns.iter().flatten().count()
    }

    /// `true` if the columns came from the positional fallback
    pub fn is_positional(&self) -> bool {
        self.positional
    }

    /// `(month, column)` pairs of resolved months
    pub fn iter(&self) -> impl Iterator<Item = (u32, usize)> + '_ {
        self.columns
            .iter()
            .enumerate()
            .filter_map(|(i, c)| c.map(|c| (i as u32 + 1, c)))
    }
}

/// Resolves the twelve month columns of a single-row header.
///
/// Headers are matched by name first. When fewer than twelve months match and `anchor` is
/// known, the twelve columns right after the anchor are taken instead, if they exist.
pub fn resolve_months(columns: &[String], anchor: Option<usize>) -> MonthColumns {
    let mut by_name = [None; 12];
    for (i, col) in columns.iter().enumerate() {
        if let Some(m) = month_number(col) {
            by_name[m as usize - 1].get_or_insert(i);
        }
    }
    let by_name = MonthColumns {
        columns: by_name,
        positional: false,
    };
    if by_name.resolved() == 12 {
        return by_name;
    }
    match anchor {
        Some(a) if a + 12 < columns.len() => {
            log::warn!(
                "{} month column(s) matched by name, using the 12 columns after column {a}",
                by_name.resolved()
            );
            let mut positional = [None; 12];
            for (m, slot) in positional.iter_mut().enumerate() {
                *slot = Some(a + 1 + m);
            }
            MonthColumns {
                columns: positional,
                positional: true,
            }
        }
        _ => by_name,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cols(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn month_tokens() {
        assert_eq!(month_number("Enero"), Some(1));
        assert_eq!(month_number(" ENE "), Some(1));
        assert_eq!(month_number("Setiembre"), Some(9));
        assert_eq!(month_number("Septiembre"), Some(9));
        assert_eq!(month_number("Dic."), Some(12));
        assert_eq!(month_number("Total"), None);
        assert_eq!(month_number("Saldo"), None);
        assert_eq!(month_number(""), None);
    }

    #[test]
    fn quarters() {
        assert_eq!(quarter(1), 1);
        assert_eq!(quarter(3), 1);
        assert_eq!(quarter(4), 2);
        assert_eq!(quarter(12), 4);
    }

    #[test]
    fn by_name() {
        let mut names = vec!["Clasificador", "PIM"];
        names.extend(MONTH_NAMES);
        names.push("Total");
        let months = resolve_months(&cols(&names), Some(1));
        assert_eq!(months.resolved(), 12);
        assert!(!months.is_positional());
        assert_eq!(months.get(1), Some(2));
        assert_eq!(months.get(12), Some(13));
        assert_eq!(months.get(13), None);
        assert_eq!(months.get(0), None);
    }

    #[test]
    fn positional_fallback() {
        let mut names = vec!["Clasificador", "PIM"];
        names.extend(["M1", "M2", "M3", "M4", "M5", "M6", "M7", "M8", "M9", "M10", "M11", "M12"]);
        let months = resolve_months(&cols(&names), Some(1));
        assert!(months.is_positional());
        assert_eq!(months.get(1), Some(2));
        assert_eq!(months.get(12), Some(13));

        // not enough columns after the anchor keeps the partial name match
        let months = resolve_months(&cols(&["PIM", "Ene", "Feb"]), Some(0));
        assert!(!months.is_positional());
        assert_eq!(months.resolved(), 2);
        assert_eq!(months.iter().collect::<Vec<_>>(), [(1, 1), (2, 2)]);
    }
}
