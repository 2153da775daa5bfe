//! `CUADRO_AO_META`: the UE, meta and operational activity hierarchy.

use std::collections::HashSet;

use super::{FormatParser, Session};
use crate::columns::{field, AliasTable};
use crate::config::ParserConfig;
use crate::errors::ImportResult;
use crate::formats::Format;
use crate::normalize::{clean_str, is_valid_ao_code};
use crate::records::{ActividadOperativa, MetaPresupuestal, TipoUe, UnidadEjecutora};
use crate::result::ParseResult;
use crate::table::Workbook;

const HEADER_KEYWORDS: &[&str] = &["codigo", "nombre", "ceplan", "meta"];

/// Columns carried down over merged cells.
const HIERARCHY: [&str; 6] = [
    "codigo_ue",
    "nombre_ue",
    "sigla",
    "codigo_meta",
    "sec_funcional",
    "descripcion_meta",
];

/// Parser of the master hierarchy sheet.
///
/// The sheet prints no fiscal year: it comes from [`ParserConfig::anio`].
pub struct CuadroAoMetaParser {
    session: Session,
}

/// A sheet named like `"CUADRO AO-META"` or `"AO y Meta"`.
fn is_hierarchy_sheet(name: &str) -> bool {
    let tokens: Vec<&str> = name
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .collect();
    (tokens.contains(&"ao") && tokens.contains(&"meta")) || name.contains("cuadro")
}

impl FormatParser for CuadroAoMetaParser {
    const FORMAT: Format = Format::CuadroAoMeta;

    const COLUMNS: AliasTable = AliasTable::new(&[
        field(
            "codigo_ue",
            &["codigo ue", "código ue", "cod. ue", "cod ue", "codigo unidad", "código unidad"],
        ),
        field(
            "nombre_ue",
            &[
                "nombre ue",
                "nombre unidad ejecutora",
                "unidad ejecutora",
                "descripcion ue",
                "nombre de la unidad",
            ],
        ),
        field("sigla", &["sigla", "siglas", "abreviatura"]),
        field(
            "codigo_meta",
            &[
                "codigo meta",
                "código meta",
                "cod. meta",
                "meta",
                "num. meta",
                "numero meta",
                "número meta",
            ],
        ),
        field(
            "sec_funcional",
            &["sec. funcional", "sec funcional", "secuencia funcional", "sec.func", "secuencia", "sec"],
        ),
        field(
            "descripcion_meta",
            &["descripcion meta", "descripción meta", "nombre meta", "descripcion de la meta"],
        ),
        field(
            "codigo_ceplan",
            &["codigo ao", "código ao", "codigo ceplan", "código ceplan", "cod. ao", "cod ao", "ceplan"],
        ),
        field(
            "nombre_ao",
            &[
                "nombre ao",
                "nombre actividad",
                "actividad operativa",
                "denominacion ao",
                "denominación ao",
            ],
        ),
        field("oei", &["oei", "objetivo estrategico", "objetivo estratégico"]),
        field("aei", &["aei", "accion estrategica", "acción estratégica"]),
    ]);

    const REQUIRED: &'static [&'static str] = &["codigo_ceplan", "nombre_ao"];

    fn new(workbook: Workbook, config: ParserConfig) -> ImportResult<Self> {
        Ok(CuadroAoMetaParser {
            session: Session::new(Self::FORMAT, workbook, config)?,
        })
    }

    fn parse(mut self) -> ParseResult {
        let s = &mut self.session;
        let Some(grid) = s.read_grid(Some(is_hierarchy_sheet)) else {
            return self.session.finish();
        };
        let mut table = s.load_table(&grid, HEADER_KEYWORDS, s.default_header());
        if table.is_empty() {
            s.result()
                .push_error("CUADRO AO-META: la hoja está vacía.".to_string());
            return self.session.finish();
        }
        let errors = self.validate_structure(&table);
        let s = &mut self.session;
        if !s.accept_structure(errors) {
            return self.session.finish();
        }
        let cols = Self::COLUMNS.resolve(table.columns());
        let hierarchy: Vec<usize> = HIERARCHY.iter().filter_map(|f| cols.get(f)).collect();
        table.forward_fill(&hierarchy);
        let anio = s.fiscal_year("");

        let mut seen_ues = HashSet::new();
        let mut seen_metas = HashSet::new();
        let mut seen_aos = HashSet::new();
        for row in table.rows() {
            if Session::is_blank(row)
                || Session::is_repeated_header(row, cols.get("codigo_ceplan"), &["codigo", "ceplan"])
            {
                continue;
            }
            let get = |f: &str| clean_str(row.get_opt(cols.get(f)));
            let codigo_ceplan = get("codigo_ceplan").to_uppercase();
            if !is_valid_ao_code(&codigo_ceplan) {
                s.skip(
                    row,
                    format!("codigo_ceplan inválido o vacío ('{codigo_ceplan}'); fila omitida."),
                );
                continue;
            }
            let nombre_ao = get("nombre_ao");
            if nombre_ao.is_empty() {
                s.skip(
                    row,
                    format!("nombre_ao vacío para codigo_ceplan '{codigo_ceplan}'; fila omitida."),
                );
                continue;
            }
            let codigo_ue = get("codigo_ue");
            let codigo_meta = get("codigo_meta");

            if !codigo_ue.is_empty() && seen_ues.insert(codigo_ue.clone()) {
                let nombre = get("nombre_ue");
                let sigla = get("sigla");
                let tipo = TipoUe::infer(&format!("{sigla} {nombre}"));
                s.result().push_record(UnidadEjecutora {
                    codigo: codigo_ue.clone(),
                    nombre,
                    sigla,
                    tipo,
                    activo: true,
                });
            }
            if !codigo_meta.is_empty() && seen_metas.insert((codigo_ue.clone(), codigo_meta.clone())) {
                s.result().push_record(MetaPresupuestal {
                    codigo: codigo_meta.clone(),
                    descripcion: get("descripcion_meta"),
                    sec_funcional: get("sec_funcional"),
                    ue_codigo: codigo_ue.clone(),
                    anio,
                    activo: true,
                });
            }
            if seen_aos.insert(codigo_ceplan.clone()) {
                s.result().push_record(ActividadOperativa {
                    codigo_ceplan,
                    nombre: nombre_ao,
                    oei: get("oei"),
                    aei: get("aei"),
                    meta_codigo: codigo_meta,
                    ue_codigo: codigo_ue,
                    anio,
                    activo: true,
                });
            }
            s.accept();
        }

        log::debug!(
            "hierarchy: {} UEs, {} metas, {} AOs",
            seen_ues.len(),
            seen_metas.len(),
            seen_aos.len()
        );
        s.result().set_meta("total_ues", seen_ues.len());
        s.result().set_meta("total_metas", seen_metas.len());
        s.result().set_meta("total_aos", seen_aos.len());
        self.session.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsers::testing::workbook;
    use crate::records::Record;
    use crate::result::WarningKind;

    fn sheet() -> Vec<Vec<&'static str>> {
        vec![
            vec!["CUADRO AO - META 2026"],
            vec![
                "Codigo UE", "Nombre UE", "Sigla", "Codigo Meta", "Sec. Funcional",
                "Descripcion Meta", "Codigo AO", "Nombre AO", "OEI", "AEI",
            ],
            vec![
                "001", "INEI SEDE CENTRAL", "INEI", "0001", "0001", "Censos",
                "AOI00000500001", "Censo piloto", "OEI.01", "AEI.01.01",
            ],
            vec!["", "", "", "", "", "", "aoi00000500002", "Encuesta", "OEI.01", "AEI.01.02"],
            vec!["", "", "", "0002", "0002", "Encuestas", "AOI00000500002", "Repetida", "", ""],
            vec!["", "", "", "", "", "", "AO-1", "Corto", "", ""],
            vec![
                "002", "ODEI CUSCO", "ODEI-CUS", "0010", "0010", "Operativo",
                "AOI00000600001", "", "", "",
            ],
        ]
    }

    #[test]
    fn hierarchy_is_deduplicated() {
        let wb = workbook(&[("CUADRO AO-META", sheet())]);
        let config = ParserConfig::for_format(Format::CuadroAoMeta).with_anio(2026);
        let result = CuadroAoMetaParser::new(wb, config).unwrap().parse();
        assert!(result.is_ok(), "{:?}", result.errors());
        assert_eq!(result.metadata()["total_ues"], "1");
        assert_eq!(result.metadata()["total_metas"], "2");
        assert_eq!(result.metadata()["total_aos"], "2");
        assert_eq!(result.metadata()["anio"], "2026");
        assert_eq!(result.records_of("unidad_ejecutora").count(), 1);
        assert_eq!(result.records_of("actividad_operativa").count(), 2);
        // merged UE cells are carried down to the second activity
        let ao = result
            .records_of("actividad_operativa")
            .nth(1)
            .and_then(|r| match r {
                Record::ActividadOperativa(a) => Some(a.clone()),
                _ => None,
            })
            .unwrap();
        assert_eq!(ao.codigo_ceplan, "AOI00000500002");
        assert_eq!(ao.ue_codigo, "001");
        assert_eq!(ao.meta_codigo, "0001");
        assert_eq!(ao.anio, 2026);
        match &result.records()[0] {
            Record::UnidadEjecutora(ue) => assert_eq!(ue.tipo, TipoUe::Central),
            r => panic!("unexpected record {r:?}"),
        }
        // short code and missing activity name
        assert_eq!(result.warning_count(WarningKind::RowSkipped), 2);
    }

    #[test]
    fn year_defaults_to_zero() {
        let wb = workbook(&[("Hoja1", vec![]), ("AO y Meta", sheet())]);
        let result = CuadroAoMetaParser::with_defaults(wb).unwrap().parse();
        assert_eq!(result.metadata()["hoja"], "AO y Meta");
        assert_eq!(result.metadata()["anio"], "0");
        assert_eq!(result.warning_count(WarningKind::Notice), 1);
    }

    #[test]
    fn sheet_names() {
        assert!(is_hierarchy_sheet("cuadro 2026"));
        assert!(!is_hierarchy_sheet("metas"));
    }
}
