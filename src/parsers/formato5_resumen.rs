//! `FORMATO_5_RESUMEN`: one execution summary row per activity, with the accrued amount of
//! every month.

use std::collections::BTreeMap;

use super::formato5a::{AO_CONTEXT, CODIGO_AO, NOMBRE_AO};
use super::{FormatParser, Session};
use crate::columns::{field, AliasTable};
use crate::config::ParserConfig;
use crate::errors::ImportResult;
use crate::formats::Format;
use crate::months::resolve_months;
use crate::normalize::{clean_str, is_valid_ao_code, parse_decimal, parse_percentage};
use crate::records::AoResumen;
use crate::result::ParseResult;
use crate::table::Workbook;
use crate::utils::round4;

const HEADER_KEYWORDS: &[&str] = &["codigo ao", "devengado", "semaforo", "pim"];

/// Parser of the activity execution summary.
pub struct Formato5ResumenParser {
    session: Session,
}

impl FormatParser for Formato5ResumenParser {
    const FORMAT: Format = Format::Formato5Resumen;

    const COLUMNS: AliasTable = AliasTable::new(&[
        CODIGO_AO,
        NOMBRE_AO,
        field("pim", &["pim", "presupuesto institucional modificado"]),
        field(
            "ccp",
            &[
                "ccp",
                "certificado credito presupuestario",
                "certificado de crédito presupuestario",
                "certificado crédito",
                "certificacion",
            ],
        ),
        field(
            "compromiso_anual",
            &["compromiso anual", "compromiso", "comp. anual", "compromiso anu.", "c. anual"],
        ),
        field("devengado", &["devengado", "devengados", "devengado anual", "monto devengado"]),
        field("girado", &["girado", "girados", "pagado", "pagados"]),
        field("saldo", &["saldo", "saldo disponible", "saldo por ejecutar", "saldo pim"]),
        field(
            "pct_avance_pim",
            &["% avance pim", "% ejec pim", "avance pim", "porcentaje pim", "% pim"],
        ),
        field(
            "pct_avance_ccp",
            &["% avance ccp", "% ejec ccp", "avance ccp", "porcentaje ccp", "% ccp"],
        ),
        field("semaforo", &["semaforo", "semáforo", "estado", "color", "semaf."]),
        field(
            "total",
            &["total devengado", "total anual devengado", "total", "total año"],
        ),
    ]);

    const REQUIRED: &'static [&'static str] = &["codigo_ao", "devengado"];

    fn new(workbook: Workbook, config: ParserConfig) -> ImportResult<Self> {
        Ok(Formato5ResumenParser {
            session: Session::new(Self::FORMAT, workbook, config)?,
        })
    }

    fn parse(mut self) -> ParseResult {
        let s = &mut self.session;
        let Some(grid) = s.read_grid(None) else {
            return self.session.finish();
        };
        let ctx = s.context(&grid, &AO_CONTEXT);
        let anio = s.fiscal_year(&ctx["anio"]);
        let ue_codigo = ctx["ue_codigo"].clone();
        let meta_codigo = ctx["meta_codigo"].clone();

        let table = s.load_table(&grid, HEADER_KEYWORDS, s.default_header());
        if table.is_empty() {
            s.result()
                .push_error("Formato5Resumen: la hoja está vacía.".to_string());
            return self.session.finish();
        }
        let errors = self.validate_structure(&table);
        let s = &mut self.session;
        if !s.accept_structure(errors) {
            return self.session.finish();
        }
        let cols = Self::COLUMNS.resolve(table.columns());
        let anchor = cols
            .get("semaforo")
            .or(cols.get("nombre_ao"))
            .or(cols.get("codigo_ao"));
        let months = resolve_months(table.columns(), anchor);
        s.note_months(&months);

        for row in table.rows() {
            if Session::is_blank(row)
                || Session::is_repeated_header(row, cols.get("codigo_ao"), &["codigo", "ceplan"])
            {
                continue;
            }
            let codigo_ao = clean_str(row.get_opt(cols.get("codigo_ao"))).to_uppercase();
            if !is_valid_ao_code(&codigo_ao) {
                s.skip(row, format!("codigo_ao inválido o vacío ('{codigo_ao}'); fila omitida."));
                continue;
            }
            let n = row.number();
            let pim = s.amount(row, cols.get("pim"), "pim");
            let ccp = s.amount(row, cols.get("ccp"), "ccp");
            let compromiso_anual = s.amount(row, cols.get("compromiso_anual"), "compromiso_anual");
            let devengado = s.amount(row, cols.get("devengado"), "devengado");
            let girado = s.amount(row, cols.get("girado"), "girado");
            let computed = pim - devengado;
            let saldo = match parse_decimal(row.get_opt(cols.get("saldo"))) {
                Some(declared) => s.reconcile(n, "saldo", declared, computed),
                None => computed,
            };
            let saldo = s.non_negative(n, "saldo", saldo);
            let pct = |f: &str| parse_percentage(row.get_opt(cols.get(f))).map(round4);

            let monthly = s.monthly(row, &months, "devengado");
            if months.resolved() > 0 {
                let reference = s
                    .optional_amount(row, cols.get("total"), "total")
                    .unwrap_or(devengado);
                s.check_monthly_total(n, "el devengado anual", &monthly, reference);
            }
            let devengado_mensual: BTreeMap<u32, f64> = months
                .iter()
                .map(|(mes, _)| (mes, monthly[mes as usize - 1]))
                .collect();

            s.result().push_record(AoResumen {
                anio,
                ue_codigo: ue_codigo.clone(),
                meta_codigo: meta_codigo.clone(),
                codigo_ao,
                nombre_ao: clean_str(row.get_opt(cols.get("nombre_ao"))),
                pim,
                ccp,
                compromiso_anual,
                devengado,
                girado,
                saldo,
                pct_avance_pim: pct("pct_avance_pim"),
                pct_avance_ccp: pct("pct_avance_ccp"),
                semaforo: clean_str(row.get_opt(cols.get("semaforo"))).to_uppercase(),
                devengado_mensual,
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

    const HEADER: [&str; 23] = [
        "Código AO", "Nombre AO", "PIM", "CCP", "Compromiso Anual", "Devengado", "Girado",
        "Saldo", "% Avance PIM", "% Avance CCP", "Semáforo", "Ene", "Feb", "Mar", "Abr", "May",
        "Jun", "Jul", "Ago", "Set", "Oct", "Nov", "Dic",
    ];

    fn sheet(data: Vec<Vec<&'static str>>) -> Vec<Vec<&'static str>> {
        let mut rows = vec![
            vec!["FORMATO 5: RESUMEN DE EJECUCION"],
            vec![],
            vec!["", "UE:", "INEI", "", "Código UE:", "001"],
            vec!["", "", "", "", "Meta:", "0005"],
            vec!["", "", "", "", "Año:", "2026"],
            HEADER.to_vec(),
        ];
        rows.extend(data);
        rows
    }

    fn summaries(result: &ParseResult) -> Vec<AoResumen> {
        result
            .records()
            .iter()
            .filter_map(|r| match r {
                Record::AoResumen(a) => Some(a.clone()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn summary_rows() {
        let wb = workbook(&[(
            "Resumen",
            sheet(vec![
                vec![
                    "AOI00000500001", "Encuesta", "1200", "1000", "900", "600", "500", "600",
                    "50%", "0.6", "verde", "50", "50", "50", "50", "50", "50", "50", "50", "50",
                    "50", "50", "50",
                ],
                vec![
                    "AOI00000500002", "Censo", "100", "100", "100", "90", "0", "", "", "", "rojo",
                    "90",
                ],
                vec!["Sub total", "", "1300"],
            ]),
        )]);
        let result = Formato5ResumenParser::with_defaults(wb).unwrap().parse();
        assert!(result.is_ok(), "{:?}", result.errors());
        let rows = summaries(&result);
        assert_eq!(rows.len(), 2);
        let a = &rows[0];
        assert_eq!(a.codigo_ao, "AOI00000500001");
        assert_eq!((a.pim, a.ccp, a.devengado, a.saldo), (1200.0, 1000.0, 600.0, 600.0));
        assert_eq!(a.pct_avance_pim, Some(0.5));
        assert_eq!(a.pct_avance_ccp, Some(0.6));
        assert_eq!(a.semaforo, "VERDE");
        assert_eq!(a.devengado_mensual.len(), 12);
        assert_eq!(a.devengado_mensual[&9], 50.0);
        assert_eq!(a.meta_codigo, "0005");

        let b = &rows[1];
        assert_eq!(b.saldo, 10.0);
        assert_eq!(b.pct_avance_pim, None);
        assert_eq!(b.devengado_mensual[&1], 90.0);
        assert_eq!(b.devengado_mensual[&12], 0.0);

        assert_eq!(result.warning_count(WarningKind::ReconciliationMismatch), 0);
        assert_eq!(result.warning_count(WarningKind::RowSkipped), 1);
    }

    #[test]
    fn monthly_against_annual() {
        let wb = workbook(&[(
            "Resumen",
            sheet(vec![vec![
                "AOI00000500001", "Encuesta", "1200", "1000", "900", "600", "-1", "", "", "",
                "ambar", "100",
            ]]),
        )]);
        let result = Formato5ResumenParser::with_defaults(wb).unwrap().parse();
        let rows = summaries(&result);
        assert_eq!(rows[0].girado, 0.0);
        assert_eq!(result.warning_count(WarningKind::ValueCorrected), 1);
        // 100 accrued by month against 600 for the year
        assert_eq!(result.warning_count(WarningKind::ReconciliationMismatch), 1);
    }

    #[test]
    fn compromiso_anual_is_not_the_annual_total() {
        let wb = workbook(&[(
            "Resumen",
            sheet(vec![vec![
                "AOI00000500001", "Encuesta", "1200", "1000", "900", "300", "0", "900", "", "",
                "", "100", "100", "100",
            ]]),
        )]);
        let result = Formato5ResumenParser::with_defaults(wb).unwrap().parse();
        assert!(result.is_ok(), "{:?}", result.errors());
        assert_eq!(summaries(&result)[0].compromiso_anual, 900.0);
        assert_eq!(result.warning_count(WarningKind::ReconciliationMismatch), 0);
    }

    #[test]
    fn negative_balance_clamped_once() {
        let wb = workbook(&[(
            "Resumen",
            sheet(vec![vec![
                "AOI00000500001", "Encuesta", "100", "100", "100", "150", "0", "-50", "", "", "",
                "150",
            ]]),
        )]);
        let result = Formato5ResumenParser::with_defaults(wb).unwrap().parse();
        assert_eq!(summaries(&result)[0].saldo, 0.0);
        assert_eq!(result.warning_count(WarningKind::ReconciliationMismatch), 0);
        assert_eq!(result.warning_count(WarningKind::ValueCorrected), 1);
    }

    #[test]
    fn declared_balance_checked_against_pim() {
        let wb = workbook(&[(
            "Resumen",
            sheet(vec![vec![
                "AOI00000500001", "Encuesta", "1000", "1000", "400", "400", "0", "700", "", "",
                "", "400",
            ]]),
        )]);
        let result = Formato5ResumenParser::with_defaults(wb).unwrap().parse();
        assert_eq!(summaries(&result)[0].saldo, 600.0);
        assert_eq!(result.warning_count(WarningKind::ReconciliationMismatch), 1);
    }

    #[test]
    fn empty_sheet() {
        let wb = workbook(&[("Resumen", vec![vec![]])]);
        let result = Formato5ResumenParser::with_defaults(wb).unwrap().parse();
        assert_eq!(result.errors().len(), 1);
    }
}
