//! `FORMATO_04`: budget modifications between classifiers.
//!
//! Each row balances as `pim_resultante = asignado + habilitadora - habilitada`.

use super::{FormatParser, Session};
use crate::columns::{field, AliasTable};
use crate::config::ParserConfig;
use crate::context::ContextLayout;
use crate::errors::ImportResult;
use crate::formats::Format;
use crate::normalize::{clean_str, normalize_date, parse_decimal, DateValue};
use crate::records::{ModificacionPresupuestal, TipoModificacion};
use crate::result::{ParseResult, WarningKind};
use crate::table::Workbook;

const CONTEXT: ContextLayout = ContextLayout {
    positions: &[
        ("ue_nombre", (1, 2)),
        ("ue_codigo", (1, 5)),
        ("nota_numero", (2, 2)),
        ("fecha", (2, 5)),
        ("anio", (3, 5)),
    ],
    labels: &[
        ("anio", &["año"]),
        ("ue_codigo", &["codigo ue"]),
        ("nota_numero", &["nota"]),
        ("fecha", &["fecha"]),
    ],
    scan_rows: 7,
};

const HEADER_KEYWORDS: &[&str] = &["habilitadora", "habilitada", "clasificador", "asignado"];

/// Parser of the budget modification note.
pub struct Formato04Parser {
    session: Session,
}

/// The side that moves more money; credits win ties.
fn modification_kind(habilitadora: f64, habilitada: f64) -> TipoModificacion {
    if habilitada > habilitadora {
        TipoModificacion::Habilitada
    } else {
        TipoModificacion::Habilitacion
    }
}

impl FormatParser for Formato04Parser {
    const FORMAT: Format = Format::Formato04;

    const COLUMNS: AliasTable = AliasTable::new(&[
        field(
            "clasificador",
            &["clasificador", "código", "codigo", "cod. gasto", "cod gasto", "clasificador de gasto"],
        ),
        field(
            "descripcion",
            &["descripcion", "descripción", "nombre", "denominacion", "descripcion del gasto"],
        ),
        field(
            "asignado",
            &["asignado", "pia", "presupuesto asignado", "monto asignado", "inicial"],
        ),
        field(
            "habilitadora",
            &[
                "habilitadora",
                "habilitación",
                "habilitacion",
                "credito",
                "crédito",
                "+ habilitadora",
            ],
        ),
        field("habilitada", &["habilitada", "débito", "debito", "- habilitada"]),
        field(
            "pim_resultante",
            &[
                "pim resultante",
                "pim",
                "presupuesto institucional modificado",
                "resultante",
                "pim final",
            ],
        ),
    ]);

    const REQUIRED: &'static [&'static str] =
        &["clasificador", "habilitadora", "habilitada", "pim_resultante"];

    fn new(workbook: Workbook, config: ParserConfig) -> ImportResult<Self> {
        Ok(Formato04Parser {
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
        let ue_codigo = ctx["ue_codigo"].clone();
        let nota = ctx["nota_numero"].clone();
        let fecha = match normalize_date(&ctx["fecha"]) {
            DateValue::Raw(raw) => {
                s.result().warn(
                    WarningKind::ValueCorrected,
                    None,
                    format!("fecha de la nota '{raw}' no reconocida; se conserva el texto."),
                );
                Some(raw)
            }
            date => date.into_option(),
        };

        let table = s.load_table(&grid, HEADER_KEYWORDS, s.default_header());
        let errors = self.validate_structure(&table);
        let s = &mut self.session;
        if !s.accept_structure(errors) {
            return self.session.finish();
        }
        let cols = Self::COLUMNS.resolve(table.columns());

        for row in table.rows() {
            if Session::is_blank(row)
                || Session::is_repeated_header(row, cols.get("clasificador"), HEADER_KEYWORDS)
            {
                continue;
            }
            let Some(clasificador) = s.classifier(row, cols.get("clasificador")) else {
                continue;
            };
            let n = row.number();
            let asignado = s.amount(row, cols.get("asignado"), "asignado");
            let habilitadora = s.amount(row, cols.get("habilitadora"), "habilitadora");
            let habilitada = s.amount(row, cols.get("habilitada"), "habilitada");
            let computed = asignado + habilitadora - habilitada;
            let pim = match parse_decimal(row.get_opt(cols.get("pim_resultante"))) {
                Some(declared) => s.reconcile(n, "pim_resultante", declared, computed),
                None => computed,
            };
            let pim_resultante = s.non_negative(n, "pim_resultante", pim);

            s.result().push_record(ModificacionPresupuestal {
                anio,
                ue_codigo: ue_codigo.clone(),
                clasificador_codigo: clasificador,
                descripcion: clean_str(row.get_opt(cols.get("descripcion"))),
                tipo: modification_kind(habilitadora, habilitada),
                monto: habilitadora.max(habilitada),
                nota_modificacion: nota.clone(),
                fecha: fecha.clone(),
                asignado,
                habilitadora,
                habilitada,
                pim_resultante,
            });
            s.accept();
        }
        self.session.finish()
    }
}
