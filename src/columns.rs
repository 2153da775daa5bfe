//! Column alias resolution.
//!
//! Every parser owns an [`AliasTable`]: an ordered list of logical fields, each with an
//! ordered list of lowercase header spellings. Resolution is deterministic: an exact
//! (case-insensitive) match of any alias wins over a substring match, and within each pass
//! the alias order decides, then the column order.

use std::collections::BTreeMap;

/// A logical field and the header spellings it is known by.
#[derive(Debug, Clone, Copy)]
pub struct Field {
    /// Logical name
    pub name: &'static str,
    /// Lowercase aliases, most specific first
    pub aliases: &'static [&'static str],
}

/// Shorthand to build a [`Field`] in `const` tables.
pub const fn field(name: &'static str, aliases: &'static [&'static str]) -> Field {
    Field { name, aliases }
}

/// Immutable ordered alias data for one format.
#[derive(Debug, Clone, Copy)]
pub struct AliasTable {
    fields: &'static [Field],
}

impl AliasTable {
    /// Wraps a static field list
    pub const fn new(fields: &'static [Field]) -> Self {
        AliasTable { fields }
    }

    /// All fields, in table order
    pub fn fields(&self) -> &'static [Field] {
        self.fields
    }

    /// Aliases of `name`, empty for an unknown field.
    pub fn aliases(&self, name: &str) -> &'static [&'static str] {
        self.fields
            .iter()
            .find(|f| f.name == name)
            .map_or(&[], |f| f.aliases)
    }

    /// Resolves every field of the table against `columns`.
    pub fn resolve(&self, columns: &[String]) -> ColumnMap {
        let lowered = lower(columns);
        let map = self
            .fields
            .iter()
            .filter_map(|f| match_lowered(&lowered, f.aliases).map(|c| (f.name, c)))
            .collect();
        ColumnMap { map }
    }
}

fn lower(columns: &[String]) -> Vec<String> {
    columns.iter().map(|c| c.trim().to_lowercase()).collect()
}

fn match_lowered(columns: &[String], aliases: &[&str]) -> Option<usize> {
    let named = || columns.iter().enumerate().filter(|(_, c)| !c.is_empty());
    aliases
        .iter()
        .find_map(|a| named().find(|(_, c)| c.as_str() == *a).map(|(i, _)| i))
        .or_else(|| {
            aliases
                .iter()
                .find_map(|a| named().find(|(_, c)| c.contains(a)).map(|(i, _)| i))
        })
}

/// Index of the column best matching `aliases`, `None` when nothing matches.
pub fn match_column(columns: &[String], aliases: &[&str]) -> Option<usize> {
    match_lowered(&lower(columns), aliases)
}

/// Resolved field positions of one table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnMap {
    map: BTreeMap<&'static str, usize>,
}

impl ColumnMap {
    /// Column of `field`, if resolved
    pub fn get(&self, field: &str) -> Option<usize> {
        self.map.get(field).copied()
    }

    /// `true` if `field` was resolved
    pub fn has(&self, field: &str) -> bool {
        self.map.contains_key(field)
    }

    /// Fields of `required` that did not resolve, in the given order.
    pub fn missing<'a>(&self, required: &[&'a str]) -> Vec<&'a str> {
        required
            .iter()
            .filter(|f| !self.has(f))
            .copied()
            .collect()
    }
}
