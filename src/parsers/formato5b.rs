//! `FORMATO_5B`: programmed against executed amounts of each activity, month by month.
//!
//! The header spans two rows, months above and `Programado | Ejecutado | Saldo` below; see
//! [`compound`](crate::compound) for its reconstruction. Quarter and annual subtotal columns
//! do not decompose into a month and are left out.

use super::formato5a::{AO_CONTEXT, CODIGO_AO, NOMBRE_AO};
use super::{missing_columns, FormatParser, Session};
use crate::columns::AliasTable;
use crate::compound::{reconstruct, CompoundHeader, SubLabel};
use crate::config::{HeaderRow, ParserConfig};
use crate::errors::ImportResult;
use crate::formats::Format;
use crate::months::{quarter, MONTH_NAMES};
use crate::normalize::{clean_str, is_valid_ao_code, parse_decimal};
use crate::records::ProgramacionMensual;
use crate::result::{ParseResult, WarningKind};
use crate::table::{Grid, LoadOptions, Row, Table, Workbook};
use crate::utils::round2;

/// Parser of the activity execution sheet.
pub struct Formato5BParser {
    session: Session,
}

impl Formato5BParser {
    /// Reconstructs the two-row header, recording a structural error on failure.
    fn header(&mut self, grid: &Grid) -> Option<CompoundHeader> {
        let config = self.session.config();
        let window = 0..config.data_start_row + 2;
        let hint = match config.header_row {
            HeaderRow::Row(h) => Some(h),
            HeaderRow::Detect => None,
        };
        match reconstruct(grid, window, hint) {
            Ok(header) => Some(header),
            Err(e) => {
                self.session.result().push_error(format!(
                    "Formato5B: no se pudo construir el encabezado compuesto ({e}). \
                     Verificar que el archivo tenga el formato correcto."
                ));
                None
            }
        }
    }

    /// Data rows under the header, named by the composite columns.
    ///
    /// With an explicit header row the rows up to the configured data start are skipped.
    fn data_table(&self, grid: &Grid, header: &CompoundHeader) -> Table {
        let first = header.row_b() + 1;
        let first = match self.session.config().header_row {
            HeaderRow::Row(_) => first.max(self.session.config().data_start_row),
            HeaderRow::Detect => first,
        };
        let rows = grid.table(&LoadOptions::raw().with_skip_rows(first)).into_rows();
        Table::new(header.columns().to_vec(), rows)
    }

    fn note_quarters(&mut self, header: &CompoundHeader) {
        for q in 1..=4 {
            let n = header.months().keys().filter(|m| quarter(**m) == q).count();
            if n < 3 {
                self.session.result().warn(
                    WarningKind::Notice,
                    None,
                    format!("Formato5B: trimestre {q} tiene solo {n} de 3 meses detectados."),
                );
            }
        }
    }
}

/// One month of one activity: executed is checked against programmed and the balance is
/// recomputed.
fn month_amounts(
    s: &mut Session,
    row: &Row,
    header: &CompoundHeader,
    mes: u32,
    codigo_ao: &str,
) -> (f64, f64, f64) {
    let name = MONTH_NAMES[mes as usize - 1];
    let triple = header.months()[&mes];
    let n = row.number();
    let programado = s.amount(row, triple.get(SubLabel::Programado), &format!("programado {name}"));
    let ejecutado = s.amount(row, triple.get(SubLabel::Ejecutado), &format!("ejecutado {name}"));
    if ejecutado > programado + 0.01 {
        s.result().warn(
            WarningKind::Notice,
            Some(n),
            format!(
                "AO '{codigo_ao}' mes {mes}: ejecutado ({ejecutado:.2}) > programado ({programado:.2})."
            ),
        );
    }
    let computed = round2(programado - ejecutado);
    let saldo = match parse_decimal(row.get_opt(triple.get(SubLabel::Saldo))) {
        Some(declared) => s.reconcile(n, &format!("saldo {name}"), declared, computed),
        None => computed,
    };
    let saldo = s.non_negative(n, &format!("saldo {name}"), saldo);
    (programado, ejecutado, saldo)
}

impl FormatParser for Formato5BParser {
    const FORMAT: Format = Format::Formato5B;

    const COLUMNS: AliasTable = AliasTable::new(&[CODIGO_AO, NOMBRE_AO]);

    const REQUIRED: &'static [&'static str] = &["codigo_ao"];

    fn new(workbook: Workbook, config: ParserConfig) -> ImportResult<Self> {
        Ok(Formato5BParser {
            session: Session::new(Self::FORMAT, workbook, config)?,
        })
    }

    /// Also requires at least one programmed column among the composite names.
    fn validate_structure(&self, table: &Table) -> Vec<String> {
        let mut errors = missing_columns(Self::FORMAT, table, &Self::COLUMNS, Self::REQUIRED);
        if !table
            .columns()
            .iter()
            .any(|c| c.to_lowercase().contains(SubLabel::Programado.as_str()))
        {
            errors.push(
                "Formato5B: ninguna columna 'Programado' encontrada. El encabezado de dos filas \
                 puede no haberse detectado correctamente."
                    .to_string(),
            );
        }
        errors
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

        let Some(header) = self.header(&grid) else {
            return self.session.finish();
        };
        let table = self.data_table(&grid, &header);
        let errors = self.validate_structure(&table);
        if !self.session.accept_structure(errors) {
            return self.session.finish();
        }
        self.note_quarters(&header);

        let s = &mut self.session;
        let months: Vec<u32> = header.months().keys().copied().collect();
        let detected: Vec<String> = months.iter().map(u32::to_string).collect();
        s.result().set_meta("months_detected", detected.join(","));
        s.result()
            .set_meta("header_rows", format!("{},{}", header.row_a(), header.row_b()));

        let cols = Self::COLUMNS.resolve(table.columns());
        for row in table.rows() {
            if Session::is_blank(row)
                || Session::is_repeated_header(
                    row,
                    cols.get("codigo_ao"),
                    &["codigo", "ceplan", "programado"],
                )
            {
                continue;
            }
            let codigo_ao = clean_str(row.get_opt(cols.get("codigo_ao"))).to_uppercase();
            if !is_valid_ao_code(&codigo_ao) {
                s.skip(row, format!("codigo_ao inválido o vacío ('{codigo_ao}'); fila omitida."));
                continue;
            }
            let nombre_ao = clean_str(row.get_opt(cols.get("nombre_ao")));
            for &mes in &months {
                let (programado, ejecutado, saldo) =
                    month_amounts(s, row, &header, mes, &codigo_ao);
                s.result().push_record(ProgramacionMensual {
                    codigo_ao: Some(codigo_ao.clone()),
                    nombre_ao: Some(nombre_ao.clone()),
                    anio,
                    ue_codigo: ue_codigo.clone(),
                    meta_codigo: meta_codigo.clone(),
                    mes,
                    programado,
                    ejecutado,
                    saldo,
                    ..Default::default()
                });
            }
            s.accept();
        }
        self.session.finish()
    }
}
