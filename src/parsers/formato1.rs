//! `FORMATO_1`: annual programming, PIA and PIM with a twelve-month breakdown.

use super::{FormatParser, Session};
use crate::columns::{field, AliasTable};
use crate::config::ParserConfig;
use crate::context::ContextLayout;
use crate::errors::ImportResult;
use crate::formats::Format;
use crate::months::resolve_months;
use crate::normalize::clean_str;
use crate::records::{ProgramacionMensual, ProgramacionPresupuestal};
use crate::result::ParseResult;
use crate::table::Workbook;

const CONTEXT: ContextLayout = ContextLayout {
    positions: &[
        ("ue_nombre", (1, 1)),
        ("meta_codigo", (2, 1)),
        ("anio", (3, 1)),
    ],
    labels: &[
        ("anio", &["año"]),
        ("meta_codigo", &["meta presupuestal", "meta"]),
        ("ue_nombre", &["unidad ejecutora"]),
        ("ue_codigo", &["codigo ue"]),
    ],
    scan_rows: 7,
};

const HEADER_KEYWORDS: &[&str] = &["clasificador", "pia", "pim", "descripcion"];

/// Parser of the annual programming sheet.
pub struct Formato1Parser {
    session: Session,
}

impl FormatParser for Formato1Parser {
    const FORMAT: Format = Format::Formato1;

    const COLUMNS: AliasTable = AliasTable::new(&[
        field(
            "clasificador",
            &[
                "clasificador",
                "código",
                "codigo",
                "cod. gasto",
                "cod gasto",
                "clasificador de gasto",
            ],
        ),
        field(
            "descripcion",
            &["descripcion", "descripción", "nombre", "denominacion", "descripcion del gasto"],
        ),
        field("pia", &["pia", "presupuesto institucional de apertura"]),
        field("pim", &["pim", "presupuesto institucional modificado"]),
        field("total", &["total", "total año", "total anual"]),
    ]);

    const REQUIRED: &'static [&'static str] = &["clasificador", "descripcion", "pia", "pim"];

    fn new(workbook: Workbook, config: ParserConfig) -> ImportResult<Self> {
        Ok(Formato1Parser {
            session: Session::new(Self::FORMAT, workbook, config)?,
        })
    }

    fn parse(mut self) -> ParseResult {
        let s = &mut self.session;
        let Some(grid) = s.read_grid(None) else {
            return self.session.finish();
        };
        let ctx = s.context(&grid, &CONTEXT);
        let anio = s.fiscal_year(&ctx["anio"]);
        let ue_codigo = ctx.get("ue_codigo").cloned().unwrap_or_default();
        let meta_codigo = ctx["meta_codigo"].clone();

        let table = s.load_table(&grid, HEADER_KEYWORDS, s.default_header());
        let errors = self.validate_structure(&table);
        let s = &mut self.session;
        if !s.accept_structure(errors) {
            return self.session.finish();
        }
        let cols = Self::COLUMNS.resolve(table.columns());
        let months = resolve_months(table.columns(), cols.get("pim"));
        s.note_months(&months);

        for row in table.rows() {
            if Session::is_blank(row)
                || Session::is_repeated_header(row, cols.get("clasificador"), HEADER_KEYWORDS)
            {
                continue;
            }
            let Some(clasificador) = s.classifier(row, cols.get("clasificador")) else {
                continue;
            };
            let pia = s.amount(row, cols.get("pia"), "pia");
            let pim = s.amount(row, cols.get("pim"), "pim");
            let monthly = s.monthly(row, &months, "programado");
            let total = s
                .optional_amount(row, cols.get("total"), "total")
                .unwrap_or(pim);
            s.check_monthly_total(row.number(), "total", &monthly, total);

            s.result().push_record(ProgramacionPresupuestal {
                anio,
                ue_codigo: ue_codigo.clone(),
                meta_codigo: meta_codigo.clone(),
                clasificador_codigo: clasificador.clone(),
                descripcion: clean_str(row.get_opt(cols.get("descripcion"))),
                pia,
                pim,
                saldo: pim,
                ..Default::default()
            });
            for (mes, programado) in (1..).zip(monthly) {
                s.result().push_record(ProgramacionMensual {
                    clasificador_codigo: Some(clasificador.clone()),
                    anio,
                    ue_codigo: ue_codigo.clone(),
                    meta_codigo: meta_codigo.clone(),
                    mes,
                    programado,
                    ejecutado: 0.0,
                    saldo: programado,
                    ..Default::default()
                });
            }
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

    const HEADER: [&str; 17] = [
        "Clasificador", "Descripción", "PIA", "PIM", "Ene", "Feb", "Mar", "Abr", "May", "Jun",
        "Jul", "Ago", "Set", "Oct", "Nov", "Dic", "Total",
    ];

    fn sheet(data: Vec<Vec<&'static str>>) -> Vec<Vec<&'static str>> {
        let mut rows = vec![
            vec!["FORMATO 1: PROGRAMACION ANUAL"],
            vec!["Unidad Ejecutora:", "001 - INEI SEDE CENTRAL"],
            vec!["Meta:", "0012"],
            vec!["Año:", "2026"],
            vec![],
            vec![],
            HEADER.to_vec(),
        ];
        rows.extend(data);
        rows
    }

    #[test]
    fn monthly_sum_within_tolerance() {
        let wb = workbook(&[(
            "F1",
            sheet(vec![vec![
                "2.3.1.5.1.2", "Papelería", "100000", "120000", "10000", "10000", "10000",
                "10000", "10000", "10000", "10000", "10000", "10000", "10000", "10000",
                "9999.50", "",
            ]]),
        )]);
        let result = Formato1Parser::with_defaults(wb).unwrap().parse();
        assert!(result.is_ok(), "{:?}", result.errors());
        assert_eq!(result.record_count(), 13);
        assert!(result.warnings().is_empty(), "{:?}", result.warnings());
        assert_eq!(result.metadata()["ue_codigo"], "001");
        assert_eq!(result.metadata()["anio"], "2026");
        match &result.records()[0] {
            Record::ProgramacionPresupuestal(p) => {
                assert_eq!(p.pim, 120000.0);
                assert_eq!(p.pia, 100000.0);
                assert_eq!(p.saldo, 120000.0);
                assert_eq!(p.meta_codigo, "0012");
                assert_eq!(p.anio, 2026);
            }
            r => panic!("unexpected record {r:?}"),
        }
        match &result.records()[12] {
            Record::ProgramacionMensual(m) => {
                assert_eq!(m.mes, 12);
                assert_eq!(m.programado, 9999.5);
                assert_eq!(m.saldo, 9999.5);
            }
            r => panic!("unexpected record {r:?}"),
        }
    }

    #[test]
    fn mismatch_negative_and_invalid_rows() {
        let wb = workbook(&[(
            "F1",
            sheet(vec![
                vec![
                    "2.3.1", "Bienes", "100", "-5", "10", "", "", "", "", "", "", "", "", "", "",
                    "", "500",
                ],
                vec!["TOTAL", "", "100", "100"],
                vec!["", "", "", ""],
            ]),
        )]);
        let result = Formato1Parser::with_defaults(wb).unwrap().parse();
        assert_eq!(result.records_of("programacion_presupuestal").count(), 1);
        assert_eq!(result.warning_count(WarningKind::ValueCorrected), 1);
        assert_eq!(result.warning_count(WarningKind::ReconciliationMismatch), 1);
        assert_eq!(result.warning_count(WarningKind::RowSkipped), 1);
        assert_eq!(result.warnings()[0].row(), Some(8));
    }

    #[test]
    fn missing_pim_is_structural() {
        let wb = workbook(&[(
            "F1",
            vec![vec!["Clasificador", "Descripción", "PIA"], vec!["2.3.1", "x", "1"]],
        )]);
        let result = Formato1Parser::with_defaults(wb).unwrap().parse();
        assert_eq!(result.errors().len(), 1);
        assert_eq!(result.record_count(), 0);
    }
}
