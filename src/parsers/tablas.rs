//! `TABLAS`: the expenditure classifier reference table.

use std::collections::{BTreeSet, HashSet};
use std::sync::LazyLock;

use regex::Regex;

use super::{FormatParser, Session};
use crate::columns::{field, AliasTable};
use crate::config::ParserConfig;
use crate::errors::ImportResult;
use crate::formats::Format;
use crate::normalize::{clean_str, is_valid_classifier, normalize_classifier_code};
use crate::records::ClasificadorGasto;
use crate::result::ParseResult;
use crate::table::Workbook;
use crate::utils::fold;

static TIPO_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b(2\.[1356])\b").unwrap());

const GENERIC_GROUPS: [&str; 4] = ["2.1", "2.3", "2.5", "2.6"];

const HEADER_KEYWORDS: &[&str] = &["codigo", "descripcion", "clasificador"];

/// Parser of the classifier table.
pub struct TablasParser {
    session: Session,
}

impl FormatParser for TablasParser {
    const FORMAT: Format = Format::Tablas;

    const COLUMNS: AliasTable = AliasTable::new(&[
        field(
            "codigo",
            &["codigo", "código", "cod.", "clasificador", "cod. gasto", "codigo de gasto"],
        ),
        field(
            "descripcion",
            &[
                "descripcion",
                "descripción",
                "nombre",
                "denominacion",
                "descripcion del clasificador",
            ],
        ),
        field(
            "tipo_generico",
            &[
                "tipo generico",
                "tipo genérico",
                "tipo",
                "generico",
                "genérico",
                "grupo generico",
                "grupo genérico",
            ],
        ),
    ]);

    const REQUIRED: &'static [&'static str] = &["codigo", "descripcion"];

    fn new(workbook: Workbook, config: ParserConfig) -> ImportResult<Self> {
        Ok(TablasParser {
            session: Session::new(Self::FORMAT, workbook, config)?,
        })
    }

    fn parse(mut self) -> ParseResult {
        let s = &mut self.session;
        let Some(grid) = s.read_grid(Some(|name: &str| name.contains("tabla"))) else {
            return self.session.finish();
        };
        let table = s.load_table(&grid, HEADER_KEYWORDS, s.default_header());
        if table.is_empty() {
            s.result().push_error("Tablas: la hoja está vacía.".to_string());
            return self.session.finish();
        }
        let errors = self.validate_structure(&table);
        let s = &mut self.session;
        if !s.accept_structure(errors) {
            return self.session.finish();
        }
        let cols = Self::COLUMNS.resolve(table.columns());
        let (col_codigo, col_desc, col_tipo) = (
            cols.get("codigo"),
            cols.get("descripcion"),
            cols.get("tipo_generico"),
        );

        let mut seen = HashSet::new();
        let mut tipos = BTreeSet::new();
        for row in table.rows() {
            if Session::is_blank(row) {
                continue;
            }
            let raw_code = clean_str(row.get_opt(col_codigo));
            let codigo = normalize_classifier_code(&raw_code);
            if !is_valid_classifier(&codigo) {
                if Session::is_repeated_header(row, col_codigo, &["codigo", "clasificador"]) {
                    log::debug!("repeated header at row {}", row.number());
                } else if is_section_header(&raw_code) {
                    s.skip(row, format!("sección de grupo genérico '{raw_code}' omitida."));
                } else {
                    s.skip(row, format!("código clasificador inválido ('{raw_code}'); fila omitida."));
                }
                continue;
            }
            let descripcion = clean_str(row.get_opt(col_desc));
            if descripcion.is_empty() {
                s.skip(row, format!("descripción vacía para el código '{codigo}'; fila omitida."));
                continue;
            }
            if !seen.insert(codigo.clone()) {
                s.skip(row, format!("código duplicado '{codigo}'; segunda ocurrencia omitida."));
                continue;
            }
            let tipo_generico = tipo_from_text(row.get_opt(col_tipo))
                .or_else(|| tipo_from_code(&codigo))
                .unwrap_or_default();
            if !tipo_generico.is_empty() {
                tipos.insert(tipo_generico.clone());
            }
            s.result().push_record(ClasificadorGasto {
                codigo,
                descripcion,
                tipo_generico,
            });
            s.accept();
        }

        s.result().set_meta("total_clasificadores", seen.len());
        s.result()
            .set_meta("tipos_genericos", tipos.into_iter().collect::<Vec<_>>().join(","));
        self.session.finish()
    }
}

fn is_section_header(raw: &str) -> bool {
    let text = fold(raw);
    ["grupo", "generico", "tipo"].iter().any(|k| text.contains(k))
}

/// Generic group printed in the tipo column, e.g. `"2.3 Bienes y servicios"`.
fn tipo_from_text(raw: &str) -> Option<String> {
    TIPO_RE
        .captures(raw)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
        .filter(|t| GENERIC_GROUPS.contains(t))
        .map(str::to_string)
}

/// Generic group from the first two code segments.
fn tipo_from_code(codigo: &str) -> Option<String> {
    let mut parts = codigo.split('.');
    let candidate = format!("{}.{}", parts.next()?, parts.next()?);
    GENERIC_GROUPS.contains(&candidate.as_str()).then_some(candidate)
}
