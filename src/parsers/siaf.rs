//! SIAF execution export: one budget line per classifier with its execution stages.

use std::sync::LazyLock;

use regex::Regex;

use super::{FormatParser, Session};
use crate::columns::{field, AliasTable};
use crate::config::ParserConfig;
use crate::context::ContextLayout;
use crate::errors::ImportResult;
use crate::formats::Format;
use crate::normalize::{clean_str, parse_year, to_int};
use crate::records::ProgramacionPresupuestal;
use crate::result::ParseResult;
use crate::table::{Grid, Workbook};

static YEAR_TOKEN_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(20[2-3]\d)").unwrap());

const CONTEXT: ContextLayout = ContextLayout {
    positions: &[],
    labels: &[
        ("anio", &["año", "ejercicio"]),
        ("ue_nombre", &["entidad", "unidad ejecutora"]),
    ],
    scan_rows: 3,
};

const HEADER_KEYWORDS: &[&str] = &["clasificador", "devengado", "girado", "certificado"];

/// Parser of the SIAF execution export.
pub struct SiafParser {
    session: Session,
}

/// First `20[2-3]x` token in the rows above the header, as in `"Ejercicio 2026"`.
fn year_token(grid: &Grid, rows: usize) -> String {
    grid.rows()
        .take(rows)
        .flatten()
        .find_map(|cell| YEAR_TOKEN_RE.captures(cell))
        .and_then(|c| c.get(1))
        .map_or_else(String::new, |m| m.as_str().to_string())
}

impl FormatParser for SiafParser {
    const FORMAT: Format = Format::Siaf;

    const COLUMNS: AliasTable = AliasTable::new(&[
        field("anio", &["año", "anio", "ano", "ejercicio", "year"]),
        field(
            "clasificador",
            &["clasificador", "código", "codigo", "cod. gasto", "clasificador de gasto"],
        ),
        field("descripcion", &["descripcion", "descripción", "nombre", "denominacion"]),
        field("pia", &["pia", "presupuesto inicial"]),
        field(
            "pim",
            &["pim", "presupuesto modificado", "presupuesto institucional modificado"],
        ),
        field("certificado", &["certificado", "certificacion", "certificación", "ccp"]),
        field("compromiso_anual", &["compromiso", "compromiso anual", "comp. anual"]),
        field("devengado", &["devengado", "deveng.", "deveng"]),
        field("girado", &["girado", "giro", "pagado"]),
    ]);

    const REQUIRED: &'static [&'static str] = &["clasificador", "devengado"];

    fn new(workbook: Workbook, config: ParserConfig) -> ImportResult<Self> {
        Ok(SiafParser {
            session: Session::new(Self::FORMAT, workbook, config)?,
        })
    }

    fn parse(mut self) -> ParseResult {
        let s = &mut self.session;
        let Some(grid) = s.read_grid(None) else {
            return self.session.finish();
        };
        let (header, detected) = s.header_row(&grid, HEADER_KEYWORDS, s.default_header());
        let ctx = s.context(&grid, &CONTEXT);
        let mut raw_year = ctx.get("anio").cloned().unwrap_or_default();
        if parse_year(&raw_year).is_none() {
            raw_year = year_token(&grid, header);
        }
        let default_anio = s.fiscal_year(&raw_year);
        let ue_codigo = ctx.get("ue_codigo").cloned().unwrap_or_default();

        let table = s.data_table(&grid, header, detected);
        if table.is_empty() {
            s.result().push_error("SIAF: la hoja está vacía.".to_string());
            return self.session.finish();
        }
        let errors = self.validate_structure(&table);
        let s = &mut self.session;
        if !s.accept_structure(errors) {
            return self.session.finish();
        }
        let cols = Self::COLUMNS.resolve(table.columns());
        // a configured year wins over the per-row one
        let year_col = cols.get("anio").filter(|_| s.config().anio.is_none());

        for row in table.rows() {
            if Session::is_blank(row)
                || Session::is_repeated_header(row, cols.get("clasificador"), HEADER_KEYWORDS)
            {
                continue;
            }
            let Some(clasificador) = s.classifier(row, cols.get("clasificador")) else {
                continue;
            };
            let anio = match to_int(row.get_opt(year_col), 0) {
                y @ 1900..=2100 => y as i32,
                _ => default_anio,
            };
            let pia = s.amount(row, cols.get("pia"), "pia");
            let pim = s.amount(row, cols.get("pim"), "pim");
            let certificado = s.amount(row, cols.get("certificado"), "certificado");
            let compromiso_anual = s.amount(row, cols.get("compromiso_anual"), "compromiso_anual");
            let devengado = s.amount(row, cols.get("devengado"), "devengado");
            let girado = s.amount(row, cols.get("girado"), "girado");
            let saldo = s.non_negative(row.number(), "saldo", pim - devengado);

            s.result().push_record(ProgramacionPresupuestal {
                anio,
                ue_codigo: ue_codigo.clone(),
                clasificador_codigo: clasificador,
                descripcion: clean_str(row.get_opt(cols.get("descripcion"))),
                pia,
                pim,
                certificado,
                compromiso_anual,
                devengado,
                girado,
                saldo,
                ..Default::default()
            });
            s.accept();
        }
        self.session.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsers::testing::workbook;
    use crate::records::Record;
    use crate::result::WarningKind;

    const HEADER: [&str; 10] = [
        "Año", "Mes", "Clasificador", "Descripción", "PIA", "PIM", "Certificado",
        "Compromiso Anual", "Devengado", "Girado",
    ];

    fn lines(result: &ParseResult) -> Vec<ProgramacionPresupuestal> {
        result
            .records()
            .iter()
            .filter_map(|r| match r {
                Record::ProgramacionPresupuestal(p) => Some(p.clone()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn execution_lines() {
        let wb = workbook(&[(
            "Reporte",
            vec![
                vec!["SIAF - EJECUCION PRESUPUESTAL"],
                vec!["Entidad:", "001 - INEI"],
                vec!["Ejercicio 2026"],
                HEADER.to_vec(),
                vec![
                    "2025", "12", "2.3.1.5.1.2", "Papelería", "1000", "1200", "900", "800", "700",
                    "600",
                ],
                vec!["", "12", "2.3.2.7.11.99", "Servicios", "0", "500", "", "", "600", ""],
                vec!["", "", "TOTAL", "", "1000", "1700"],
            ],
        )]);
        let result = SiafParser::with_defaults(wb).unwrap().parse();
        assert!(result.is_ok(), "{:?}", result.errors());
        assert_eq!(result.metadata()["anio"], "2026");
        assert_eq!(result.metadata()["ue_codigo"], "001");
        let lines = lines(&result);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].anio, 2025);
        assert_eq!(lines[0].saldo, 500.0);
        assert_eq!(lines[0].certificado, 900.0);
        assert_eq!(lines[0].compromiso_anual, 800.0);
        assert_eq!(lines[0].girado, 600.0);
        assert_eq!(lines[0].ue_codigo, "001");
        assert_eq!(lines[1].anio, 2026);
        assert_eq!(lines[1].saldo, 0.0);
        assert_eq!(result.warning_count(WarningKind::ValueCorrected), 1);
        assert_eq!(result.warning_count(WarningKind::RowSkipped), 1);
    }

    #[test]
    fn year_from_label() {
        let wb = workbook(&[(
            "Reporte",
            vec![
                vec!["Año:", "2024"],
                vec![],
                vec![],
                vec!["Clasificador", "Devengado"],
                vec!["2.3.1", "10"],
            ],
        )]);
        let result = SiafParser::with_defaults(wb).unwrap().parse();
        assert_eq!(lines(&result)[0].anio, 2024);
        assert_eq!(lines(&result)[0].pim, 0.0);
    }

    #[test]
    fn configured_year_wins_over_rows() {
        let wb = workbook(&[(
            "Reporte",
            vec![HEADER.to_vec(), vec!["2024", "1", "2.3.1", "Bienes", "0", "0", "", "", "10", ""]],
        )]);
        let config = ParserConfig::for_format(Format::Siaf).with_anio(2025);
        let result = SiafParser::new(wb, config).unwrap().parse();
        assert!(result.is_ok(), "{:?}", result.errors());
        assert_eq!(lines(&result)[0].anio, 2025);
    }

    #[test]
    fn devengado_is_required() {
        let wb = workbook(&[("Reporte", vec![vec!["Clasificador", "PIM"], vec!["2.3.1", "10"]])]);
        let result = SiafParser::with_defaults(wb).unwrap().parse();
        assert_eq!(result.errors().len(), 1);
        assert!(result.errors()[0].contains("'devengado'"));
    }
}
