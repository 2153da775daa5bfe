//! SIGA logistics export: purchase requirements with quantities and amounts.

use super::{FormatParser, Session};
use crate::columns::{field, AliasTable};
use crate::config::ParserConfig;
use crate::errors::ImportResult;
use crate::formats::Format;
use crate::normalize::{clean_str, to_decimal};
use crate::records::SigaRequerimiento;
use crate::result::ParseResult;
use crate::table::{Table, Workbook};
use crate::utils::round2;

const HEADER_KEYWORDS: &[&str] = &[
    "requerimiento",
    "descripcion",
    "monto",
    "cantidad",
    "estado",
    "proveedor",
];

/// Parser of the SIGA requirements export.
pub struct SigaParser {
    session: Session,
}

impl FormatParser for SigaParser {
    const FORMAT: Format = Format::Siga;

    const COLUMNS: AliasTable = AliasTable::new(&[
        field(
            "numero_requerimiento",
            &[
                "nro. requerimiento",
                "nro requerimiento",
                "n° requerimiento",
                "requerimiento",
                "nro",
                "numero",
                "número",
            ],
        ),
        field(
            "descripcion",
            &[
                "descripcion",
                "descripción",
                "detalle",
                "bien/servicio",
                "descripcion del bien",
                "item",
            ],
        ),
        field("unidad_medida", &["unidad medida", "unidad", "u.m.", "um", "unid"]),
        field("cantidad", &["cantidad", "cant", "qty"]),
        field(
            "precio_unitario",
            &["precio unitario", "p.u.", "costo unitario", "precio"],
        ),
        field(
            "monto_total",
            &["monto total", "valor total", "importe", "total", "monto"],
        ),
        field("estado", &["estado", "situacion", "situación", "status"]),
        field("proveedor", &["proveedor", "razón social", "razon social", "empresa"]),
        field("fecha", &["fecha", "fecha requerimiento", "date"]),
    ]);

    /// Either a description or an amount column is enough.
    const REQUIRED: &'static [&'static str] = &[];

    fn new(workbook: Workbook, config: ParserConfig) -> ImportResult<Self> {
        Ok(SigaParser {
            session: Session::new(Self::FORMAT, workbook, config)?,
        })
    }

    fn validate_structure(&self, table: &Table) -> Vec<String> {
        let cols = Self::COLUMNS.resolve(table.columns());
        if cols.has("descripcion") || cols.has("monto_total") {
            return Vec::new();
        }
        vec![format!(
            "SIGA: no se encontró columna 'descripcion' ni 'monto_total'. Columnas detectadas: {:?}",
            table.columns()
        )]
    }

    fn parse(mut self) -> ParseResult {
        let s = &mut self.session;
        let Some(grid) = s.read_grid(None) else {
            return self.session.finish();
        };
        let table = s.load_table(&grid, HEADER_KEYWORDS, s.default_header());
        if table.is_empty() {
            s.result().push_error("SIGA: la hoja está vacía.".to_string());
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
                || Session::is_repeated_header(row, cols.get("descripcion"), &["descripcion"])
            {
                continue;
            }
            let text = |f: &str| clean_str(row.get_opt(cols.get(f)));
            let descripcion = text("descripcion");
            if descripcion.is_empty() {
                s.skip(row, "descripcion vacía; fila omitida.".to_string());
                continue;
            }
            let cantidad = s.amount(row, cols.get("cantidad"), "cantidad");
            let precio_unitario = s.amount(row, cols.get("precio_unitario"), "precio_unitario");
            let mut monto_total = s.amount(row, cols.get("monto_total"), "monto_total");
            if monto_total == 0.0 {
                // unrounded operands, only the product is rounded
                let raw = |f: &str| to_decimal(row.get_opt(cols.get(f)), 0.0).max(0.0);
                monto_total = round2(raw("cantidad") * raw("precio_unitario"));
            }
            let fecha = s.date(row, cols.get("fecha"), "fecha");

            s.result().push_record(SigaRequerimiento {
                numero_requerimiento: text("numero_requerimiento"),
                descripcion,
                unidad_medida: text("unidad_medida"),
                cantidad,
                precio_unitario,
                monto_total,
                estado: text("estado"),
                proveedor: text("proveedor"),
                fecha,
            });
            s.accept();
        }
        self.session.finish()
    }
}
