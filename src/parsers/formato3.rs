//! `FORMATO_3`: task execution summary with justification text.

use super::formato2::{
    Task, CLASIFICADOR, COD_AO, COD_META, COD_TAREA, DESC_AO, DESC_CLASIFICADOR, DESC_META,
    DESC_TAREA, HIERARCHY, PIM, TASK_CONTEXT,
};
use super::{FormatParser, Session};
use crate::columns::{field, AliasTable};
use crate::config::ParserConfig;
use crate::errors::ImportResult;
use crate::formats::Format;
use crate::normalize::{clean_str, parse_decimal, parse_percentage};
use crate::records::ProgramacionPresupuestal;
use crate::result::ParseResult;
use crate::table::Workbook;
use crate::utils::round4;

const HEADER_KEYWORDS: &[&str] = &["justificacion", "tarea", "clasificador", "pim"];

/// Parser of the execution and justification sheet.
pub struct Formato3Parser {
    session: Session,
}

impl FormatParser for Formato3Parser {
    const FORMAT: Format = Format::Formato3;

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
        field("programado", &["programado", "programación", "programacion"]),
        field("ejecutado", &["ejecutado", "ejecucion", "ejecución", "devengado"]),
        field("saldo", &["saldo", "saldo disponible", "saldo por ejecutar"]),
        field(
            "pct_avance",
            &[
                "% avance",
                "% de avance",
                "avance",
                "porcentaje avance",
                "porcentaje de avance",
                "% ejec",
                "% ejecucion",
            ],
        ),
        field(
            "justificacion",
            &["justificacion", "justificación", "justif.", "motivo", "sustento"],
        ),
        field(
            "observaciones",
            &["observaciones", "observacion", "observación", "obs.", "comentarios", "comentario"],
        ),
    ]);

    const REQUIRED: &'static [&'static str] = &["clasificador", "pim", "justificacion"];

    fn new(workbook: Workbook, config: ParserConfig) -> ImportResult<Self> {
        Ok(Formato3Parser {
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
            let n = row.number();
            let pim = s.amount(row, cols.get("pim"), "pim");
            let programado = s.amount(row, cols.get("programado"), "programado");
            let ejecutado = s.amount(row, cols.get("ejecutado"), "ejecutado");
            let computed = pim - ejecutado;
            let saldo = match parse_decimal(row.get_opt(cols.get("saldo"))) {
                Some(declared) => s.reconcile(n, "saldo", declared, computed),
                None => computed,
            };
            let saldo = s.non_negative(n, "saldo", saldo);
            let text = |f: &str| Some(clean_str(row.get_opt(cols.get(f)))).filter(|v| !v.is_empty());

            s.result().push_record(ProgramacionPresupuestal {
                anio,
                ue_codigo: ue_codigo.clone(),
                meta_codigo: task.meta_codigo,
                clasificador_codigo: clasificador,
                descripcion: clean_str(row.get_opt(cols.get("desc_clasificador"))),
                pim,
                saldo,
                ao_codigo: task.ao_codigo,
                tarea_codigo: task.tarea_codigo,
                meta_descripcion: task.meta_descripcion,
                ao_descripcion: task.ao_descripcion,
                tarea_descripcion: task.tarea_descripcion,
                programado: Some(programado),
                ejecutado: Some(ejecutado),
                pct_avance: parse_percentage(row.get_opt(cols.get("pct_avance"))).map(round4),
                justificacion: text("justificacion"),
                observaciones: text("observaciones"),
                ..Default::default()
            });
            s.accept();
        }
        self.session.finish()
    }
}
