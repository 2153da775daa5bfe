//! `FORMATO_2`: programming by task, meta > AO > task > classifier, with months.
//!
//! Formato 3 shares the title block and the task hierarchy columns defined here.

use super::{FormatParser, Session};
use crate::columns::{field, AliasTable, ColumnMap, Field};
use crate::config::ParserConfig;
use crate::context::ContextLayout;
use crate::errors::ImportResult;
use crate::formats::Format;
use crate::months::resolve_months;
use crate::normalize::clean_str;
use crate::records::{ProgramacionMensual, ProgramacionPresupuestal};
use crate::result::ParseResult;
use crate::table::{Row, Workbook};

pub(super) const TASK_CONTEXT: ContextLayout = ContextLayout {
    positions: &[
        ("ue_nombre", (2, 1)),
        ("ue_codigo", (2, 3)),
        ("meta_codigo", (3, 3)),
        ("anio", (4, 3)),
    ],
    labels: &[
        ("anio", &["año"]),
        ("meta_codigo", &["meta"]),
        ("ue_nombre", &["unidad ejecutora"]),
        ("ue_codigo", &["codigo ue"]),
    ],
    scan_rows: 7,
};

pub(super) const COD_META: Field = field(
    "cod_meta",
    &["cod meta", "código meta", "codigo meta", "cod. meta", "meta codigo", "meta código"],
);
pub(super) const DESC_META: Field = field(
    "desc_meta",
    &["desc meta", "descripcion meta", "descripción meta", "denominacion meta", "nombre meta"],
);
pub(super) const COD_AO: Field = field(
    "cod_ao",
    &["cod ao", "código ao", "codigo ao", "cod. ao", "codigo ceplan", "ceplan"],
);
pub(super) const DESC_AO: Field = field(
    "desc_ao",
    &[
        "desc ao",
        "descripcion ao",
        "descripción ao",
        "nombre ao",
        "actividad operativa",
        "denominacion ao",
    ],
);
pub(super) const COD_TAREA: Field = field(
    "cod_tarea",
    &["cod tarea", "código tarea", "codigo tarea", "cod. tarea", "tarea codigo", "tarea código"],
);
pub(super) const DESC_TAREA: Field = field(
    "desc_tarea",
    &[
        "desc tarea",
        "descripcion tarea",
        "descripción tarea",
        "denominacion tarea",
        "nombre tarea",
        "tarea",
    ],
);
pub(super) const CLASIFICADOR: Field = field(
    "clasificador",
    &["clasificador", "código", "codigo", "cod. gasto", "cod gasto", "clasificador de gasto"],
);
pub(super) const DESC_CLASIFICADOR: Field = field(
    "desc_clasificador",
    &[
        "desc clasificador",
        "descripcion clasificador",
        "descripción clasificador",
        "descripcion del gasto",
        "denominacion clasificador",
    ],
);
pub(super) const PIM: Field = field("pim", &["pim", "presupuesto institucional modificado"]);

/// Merged hierarchy columns, carried down.
pub(super) const HIERARCHY: [&str; 6] =
    ["cod_meta", "desc_meta", "cod_ao", "desc_ao", "cod_tarea", "desc_tarea"];

/// Meta, AO and task of one row.
pub(super) struct Task {
    pub(super) meta_codigo: String,
    pub(super) meta_descripcion: Option<String>,
    pub(super) ao_codigo: Option<String>,
    pub(super) ao_descripcion: Option<String>,
    pub(super) tarea_codigo: Option<String>,
    pub(super) tarea_descripcion: Option<String>,
}

impl Task {
    /// Reads the hierarchy cells; the row meta code overrides `context_meta`.
    pub(super) fn read(row: &Row, cols: &ColumnMap, context_meta: &str) -> Task {
        let get = |f: &str| Some(clean_str(row.get_opt(cols.get(f)))).filter(|v| !v.is_empty());
        Task {
            meta_codigo: get("cod_meta").unwrap_or_else(|| context_meta.to_string()),
            meta_descripcion: get("desc_meta"),
            ao_codigo: get("cod_ao"),
            ao_descripcion: get("desc_ao"),
            tarea_codigo: get("cod_tarea"),
            tarea_descripcion: get("desc_tarea"),
        }
    }
}

const HEADER_KEYWORDS: &[&str] = &["clasificador", "pim", "tarea", "meta"];

/// Parser of the task programming sheet.
pub struct Formato2Parser {
    session: Session,
}

impl FormatParser for Formato2Parser {
    const FORMAT: Format = Format::Formato2;

    const COLUMNS: AliasTable = AliasTable::new(&[
        COD_META,
        DESC_META,
        COD_AO,
        DESC_AO,
        COD_TAREA,
        DESC_TAREA,
        CLASIFICADOR,
        DESC_CLASIFICADOR,
        PIM,
        field("total", &["total", "total año", "total anual"]),
    ]);

    const REQUIRED: &'static [&'static str] = &["clasificador", "pim", "cod_tarea"];

    fn new(workbook: Workbook, config: ParserConfig) -> ImportResult<Self> {
        Ok(Formato2Parser {
            session: Session::new(Self::FORMAT, workbook, config)?,
        })
    }

    fn parse(mut self) -> ParseResult {
        let s = &mut self.session;
        let Some(grid) = s.read_grid(None) else {
            return self.session.finish();
        };
        let ctx = s.context(&grid, &TASK_CONTEXT);
        let anio = s.fiscal_year(&ctx["anio"]);
        let ue_codigo = ctx["ue_codigo"].clone();
        let meta_codigo = ctx["meta_codigo"].clone();

        let mut table = s.load_table(&grid, HEADER_KEYWORDS, s.default_header());
        let errors = self.validate_structure(&table);
        let s = &mut self.session;
        if !s.accept_structure(errors) {
            return self.session.finish();
        }
        let cols = Self::COLUMNS.resolve(table.columns());
        let hierarchy: Vec<usize> = HIERARCHY.iter().filter_map(|f| cols.get(f)).collect();
        table.forward_fill(&hierarchy);
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
            let task = Task::read(row, &cols, &meta_codigo);
            let pim = s.amount(row, cols.get("pim"), "pim");
            let monthly = s.monthly(row, &months, "programado");
            let reference = s
                .optional_amount(row, cols.get("total"), "total")
                .unwrap_or(pim);
            s.check_monthly_total(row.number(), "la referencia", &monthly, reference);

            for (mes, programado) in (1..).zip(monthly) {
                s.result().push_record(ProgramacionMensual {
                    clasificador_codigo: Some(clasificador.clone()),
                    ao_codigo: task.ao_codigo.clone(),
                    tarea_codigo: task.tarea_codigo.clone(),
                    anio,
                    ue_codigo: ue_codigo.clone(),
                    meta_codigo: task.meta_codigo.clone(),
                    mes,
                    programado,
                    ejecutado: 0.0,
                    saldo: programado,
                    ..Default::default()
                });
            }
            s.result().push_record(ProgramacionPresupuestal {
                anio,
                ue_codigo: ue_codigo.clone(),
                meta_codigo: task.meta_codigo,
                clasificador_codigo: clasificador,
                descripcion: clean_str(row.get_opt(cols.get("desc_clasificador"))),
                pim,
                saldo: pim,
                ao_codigo: task.ao_codigo,
                tarea_codigo: task.tarea_codigo,
                meta_descripcion: task.meta_descripcion,
                ao_descripcion: task.ao_descripcion,
                tarea_descripcion: task.tarea_descripcion,
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
    use crate::records::Record;
    use crate::parsers::testing::workbook;
    use crate::result::WarningKind;

    fn sheet() -> Vec<Vec<&'static str>> {
        let mut header = vec![
            "Cod Meta", "Desc Meta", "Cod AO", "Desc AO", "Cod Tarea", "Desc Tarea",
            "Clasificador", "Desc Clasificador", "PIM",
        ];
        header.extend(["Ene", "Feb", "Mar", "Abr", "May", "Jun"]);
        header.extend(["Jul", "Ago", "Set", "Oct", "Nov", "Dic"]);
        vec![
            vec!["FORMATO 2"],
            vec![],
            vec!["Unidad Ejecutora:", "INEI", "Código UE:", "001"],
            vec!["", "", "Meta:", "0005"],
            vec!["", "", "Año:", "2026"],
            vec![],
            header,
            vec![
                "0007", "Encuestas", "AOI001", "ENAHO", "T01", "Campo", "2.3.2.7.11.99",
                "Servicios", "1200", "100", "100", "100", "100", "100", "100", "100", "100",
                "100", "100", "100", "100",
            ],
            vec![
                "", "", "", "", "T02", "Gabinete", "2.3.1.5.1.2", "Papelería", "600", "600",
            ],
        ]
    }

    #[test]
    fn task_rows() {
        let wb = workbook(&[("F2", sheet())]);
        let result = Formato2Parser::with_defaults(wb).unwrap().parse();
        assert!(result.is_ok(), "{:?}", result.errors());
        assert_eq!(result.records_of("programacion_presupuestal").count(), 2);
        assert_eq!(result.records_of("programacion_mensual").count(), 24);
        assert!(result.warnings().is_empty(), "{:?}", result.warnings());
        let lines: Vec<_> = result
            .records_of("programacion_presupuestal")
            .filter_map(|r| match r {
                Record::ProgramacionPresupuestal(p) => Some(p.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(lines[0].meta_codigo, "0007");
        assert_eq!(lines[0].ue_codigo, "001");
        assert_eq!(lines[0].anio, 2026);
        assert_eq!(lines[0].ao_descripcion.as_deref(), Some("ENAHO"));
        // merged hierarchy cells carried down
        assert_eq!(lines[1].meta_codigo, "0007");
        assert_eq!(lines[1].ao_codigo.as_deref(), Some("AOI001"));
        assert_eq!(lines[1].tarea_codigo.as_deref(), Some("T02"));
        assert_eq!(lines[1].pim, 600.0);
    }

    #[test]
    fn task_code_is_required() {
        let mut rows = sheet();
        rows[6][4] = "Actividad";
        rows[6][5] = "Detalle";
        let result = Formato2Parser::with_defaults(workbook(&[("F2", rows)]))
            .unwrap()
            .parse();
        assert_eq!(result.errors().len(), 1);
        assert!(result.errors()[0].contains("'cod_tarea'"));
        assert_eq!(result.warning_count(WarningKind::RowSkipped), 0);
    }
}
