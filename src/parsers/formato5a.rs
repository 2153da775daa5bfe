//! `FORMATO_5A`: monthly programming of each operational activity.

use super::{FormatParser, Session};
use crate::columns::{field, AliasTable, Field};
use crate::config::ParserConfig;
use crate::context::ContextLayout;
use crate::errors::ImportResult;
use crate::formats::Format;
use crate::months::resolve_months;
use crate::normalize::{clean_str, is_valid_ao_code};
use crate::records::ProgramacionMensual;
use crate::result::ParseResult;
use crate::table::Workbook;

/// Title block of the three activity formats, 5A, 5B and the summary.
pub(super) const AO_CONTEXT: ContextLayout = ContextLayout {
    positions: &[
        ("ue_nombre", (2, 2)),
        ("ue_codigo", (2, 5)),
        ("meta_codigo", (3, 5)),
        ("anio", (4, 5)),
    ],
    labels: &[
        ("anio", &["año"]),
        ("meta_codigo", &["meta"]),
        ("ue_codigo", &["codigo ue"]),
    ],
    scan_rows: 11,
};

pub(super) const CODIGO_AO: Field = field(
    "codigo_ao",
    &[
        "codigo ao",
        "código ao",
        "cod ao",
        "cod. ao",
        "codigo ceplan",
        "código ceplan",
        "ceplan",
    ],
);
pub(super) const NOMBRE_AO: Field = field(
    "nombre_ao",
    &["nombre ao", "nombre actividad", "actividad operativa", "denominacion", "denominación"],
);

const HEADER_KEYWORDS: &[&str] = &["codigo ao", "ceplan", "nombre ao", "programado"];

/// Parser of the activity programming sheet.
pub struct Formato5AParser {
    session: Session,
}

impl FormatParser for Formato5AParser {
    const FORMAT: Format = Format::Formato5A;

    const COLUMNS: AliasTable = AliasTable::new(&[
        CODIGO_AO,
        NOMBRE_AO,
        field(
            "total",
            &["total programado", "total anual programado", "total", "total año"],
        ),
    ]);

    const REQUIRED: &'static [&'static str] = &["codigo_ao"];

    fn new(workbook: Workbook, config: ParserConfig) -> ImportResult<Self> {
        Ok(Formato5AParser {
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

        // the header may span two rows, the month names sit in the upper one
        let fallback = s.default_header().saturating_sub(1);
        let table = s.load_table(&grid, HEADER_KEYWORDS, fallback);
        let errors = self.validate_structure(&table);
        let s = &mut self.session;
        if !s.accept_structure(errors) {
            return self.session.finish();
        }
        let cols = Self::COLUMNS.resolve(table.columns());
        let anchor = cols.get("nombre_ao").or(cols.get("codigo_ao"));
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
            let nombre_ao = clean_str(row.get_opt(cols.get("nombre_ao")));
            let monthly = s.monthly(row, &months, "programado");
            if let Some(total) = s.optional_amount(row, cols.get("total"), "total") {
                s.check_monthly_total(row.number(), "el total programado", &monthly, total);
            }
            for (mes, programado) in (1..).zip(monthly) {
                s.result().push_record(ProgramacionMensual {
                    codigo_ao: Some(codigo_ao.clone()),
                    nombre_ao: Some(nombre_ao.clone()),
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
