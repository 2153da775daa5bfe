//! `ANEXO_01`: staff register of an executing unit.

use super::{FormatParser, Session};
use crate::columns::{field, AliasTable};
use crate::config::ParserConfig;
use crate::context::ContextLayout;
use crate::errors::ImportResult;
use crate::formats::Format;
use crate::normalize::{clean_str, normalize_dni};
use crate::records::PersonalRrhh;
use crate::result::ParseResult;
use crate::table::Workbook;

const CONTEXT: ContextLayout = ContextLayout {
    positions: &[
        ("ue_nombre", (2, 1)),
        ("ue_codigo", (2, 3)),
        ("anio", (3, 3)),
    ],
    labels: &[
        ("anio", &["año"]),
        ("ue_nombre", &["unidad ejecutora"]),
        ("ue_codigo", &["codigo ue"]),
    ],
    scan_rows: 7,
};

const HEADER_KEYWORDS: &[&str] = &["dni", "apellidos", "cargo", "remuneracion", "regimen"];

const DEFAULT_ESTADO: &str = "ACTIVO";

/// Parser of the staff register.
pub struct Anexo01Parser {
    session: Session,
}

impl FormatParser for Anexo01Parser {
    const FORMAT: Format = Format::Anexo01;

    const COLUMNS: AliasTable = AliasTable::new(&[
        field(
            "dni",
            &[
                "dni",
                "d.n.i",
                "d.n.i.",
                "documento",
                "doc. identidad",
                "numero dni",
                "número dni",
            ],
        ),
        field(
            "nombre_completo",
            &[
                "apellidos y nombres",
                "nombres y apellidos",
                "nombre completo",
                "apellidos nombres",
                "nombre",
                "trabajador",
                "personal",
                "servidor",
            ],
        ),
        field(
            "cargo",
            &["cargo", "puesto", "función", "funcion", "denominacion cargo", "denominación cargo"],
        ),
        field(
            "area",
            &[
                "area",
                "área",
                "unidad",
                "oficina",
                "dependencia",
                "unidad organica",
                "unidad orgánica",
            ],
        ),
        field(
            "regimen_laboral",
            &[
                "regimen laboral",
                "régimen laboral",
                "regimen",
                "régimen",
                "reg. laboral",
                "modalidad laboral",
            ],
        ),
        field(
            "tipo_contrato",
            &[
                "tipo contrato",
                "tipo de contrato",
                "modalidad contrato",
                "modalidad de contrato",
                "modalidad",
                "condicion",
                "condición laboral",
            ],
        ),
        field(
            "fecha_inicio",
            &["fecha inicio", "fecha de inicio", "fecha ingreso", "inicio contrato", "f. inicio"],
        ),
        field(
            "fecha_fin",
            &[
                "fecha fin",
                "fecha de fin",
                "fecha termino",
                "fecha término",
                "vencimiento",
                "fin contrato",
                "f. fin",
            ],
        ),
        field(
            "remuneracion",
            &[
                "remuneracion mensual",
                "remuneración mensual",
                "remuneracion",
                "remuneración",
                "sueldo",
                "haber mensual",
                "haber",
                "monto mensual",
            ],
        ),
        field(
            "observaciones",
            &["observaciones", "observacion", "observación", "obs.", "comentarios", "comentario"],
        ),
        field(
            "estado",
            &["estado", "condicion", "condición", "situacion", "situación", "activo", "vigente"],
        ),
    ]);

    const REQUIRED: &'static [&'static str] = &["dni", "nombre_completo"];

    fn new(workbook: Workbook, config: ParserConfig) -> ImportResult<Self> {
        Ok(Anexo01Parser {
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

        let table = s.load_table(&grid, HEADER_KEYWORDS, s.default_header());
        if table.is_empty() {
            s.result().push_error("Anexo01: la hoja está vacía.".to_string());
            return self.session.finish();
        }
        let errors = self.validate_structure(&table);
        let s = &mut self.session;
        if !s.accept_structure(errors) {
            return self.session.finish();
        }
        let cols = Self::COLUMNS.resolve(table.columns());

        for row in table.rows() {
            if Session::is_blank(row)
                || Session::is_repeated_header(row, cols.get("dni"), &["dni", "documento"])
            {
                continue;
            }
            let raw_dni = clean_str(row.get_opt(cols.get("dni")));
            let Some(dni) = normalize_dni(&raw_dni) else {
                s.skip(
                    row,
                    format!("DNI inválido ('{raw_dni}'), debe tener exactamente 8 dígitos; fila omitida."),
                );
                continue;
            };
            let nombre_completo = clean_str(row.get_opt(cols.get("nombre_completo")));
            if nombre_completo.is_empty() {
                s.skip(row, format!("nombre_completo vacío para DNI '{dni}'; fila omitida."));
                continue;
            }
            let text = |f: &str| clean_str(row.get_opt(cols.get(f)));
            let estado = match text("estado").to_uppercase() {
                e if e.is_empty() => DEFAULT_ESTADO.to_string(),
                e => e,
            };
            let observaciones = Some(text("observaciones")).filter(|o| !o.is_empty());
            let fecha_inicio = s.date(row, cols.get("fecha_inicio"), "fecha_inicio");
            let fecha_fin = s.date(row, cols.get("fecha_fin"), "fecha_fin");
            let remuneracion = s.amount(row, cols.get("remuneracion"), "remuneracion");

            s.result().push_record(PersonalRrhh {
                anio,
                ue_codigo: ue_codigo.clone(),
                dni,
                nombre_completo,
                cargo: text("cargo"),
                area: text("area"),
                regimen_laboral: text("regimen_laboral"),
                tipo_contrato: text("tipo_contrato"),
                fecha_inicio,
                fecha_fin,
                remuneracion,
                estado,
                observaciones,
            });
            s.accept();
        }
        self.session.finish()
    }
}
