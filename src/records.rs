//! Typed domain records emitted by the parsers.
//!
//! Every record serializes with a `_type` discriminator, the tag consumers route on.

#![allow(missing_docs)]

use std::collections::BTreeMap;

use serde::Serialize;

/// A normalized record.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "_type", rename_all = "snake_case")]
pub enum Record {
    /// Executing unit
    UnidadEjecutora(UnidadEjecutora),
    /// Budget target
    MetaPresupuestal(MetaPresupuestal),
    /// CEPLAN operational activity
    ActividadOperativa(ActividadOperativa),
    /// Expenditure classifier
    ClasificadorGasto(ClasificadorGasto),
    /// Annual budget line
    ProgramacionPresupuestal(ProgramacionPresupuestal),
    /// One month of a budget line or activity
    ProgramacionMensual(ProgramacionMensual),
    /// Budget modification
    ModificacionPresupuestal(ModificacionPresupuestal),
    /// Staff member
    PersonalRrhh(PersonalRrhh),
    /// Execution summary of an activity
    AoResumen(AoResumen),
    /// SIGA requirement
    SigaRequerimiento(SigaRequerimiento),
}

impl Record {
    /// The `_type` tag
    pub fn tag(&self) -> &'static str {
        match self {
            Record::UnidadEjecutora(_) => "unidad_ejecutora",
            Record::MetaPresupuestal(_) => "meta_presupuestal",
            Record::ActividadOperativa(_) => "actividad_operativa",
            Record::ClasificadorGasto(_) => "clasificador_gasto",
            Record::ProgramacionPresupuestal(_) => "programacion_presupuestal",
            Record::ProgramacionMensual(_) => "programacion_mensual",
            Record::ModificacionPresupuestal(_) => "modificacion_presupuestal",
            Record::PersonalRrhh(_) => "personal_rrhh",
            Record::AoResumen(_) => "ao_resumen",
            Record::SigaRequerimiento(_) => "siga_requerimiento",
        }
    }
}

macro_rules! from_record {
    ($($ty:ident),*) => {
        $(
            impl From<$ty> for Record {
                fn from(r: $ty) -> Record {
                    Record::$ty(r)
                }
            }
        )*
    };
}

from_record!(
    UnidadEjecutora,
    MetaPresupuestal,
    ActividadOperativa,
    ClasificadorGasto,
    ProgramacionPresupuestal,
    ProgramacionMensual,
    ModificacionPresupuestal,
    PersonalRrhh,
    AoResumen,
    SigaRequerimiento
);

/// Kind of executing unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TipoUe {
    /// Headquarters in Lima
    Central,
    /// Departmental office
    Odei,
}

impl TipoUe {
    /// Headquarters are named `INEI` without any departmental marker.
    pub fn infer(nombre: &str) -> TipoUe {
        let n = nombre.to_uppercase();
        let departmental = ["ODEI", "OFICINA DEPARTAMENTAL", "REGIONAL"]
            .iter()
            .any(|k| n.contains(k));
        if n.contains("INEI") && !departmental {
            TipoUe::Central
        } else {
            TipoUe::Odei
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnidadEjecutora {
    pub codigo: String,
    pub nombre: String,
    pub sigla: String,
    pub tipo: TipoUe,
    pub activo: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetaPresupuestal {
    pub codigo: String,
    pub descripcion: String,
    pub sec_funcional: String,
    pub ue_codigo: String,
    pub anio: i32,
    pub activo: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActividadOperativa {
    pub codigo_ceplan: String,
    pub nombre: String,
    pub oei: String,
    pub aei: String,
    pub meta_codigo: String,
    pub ue_codigo: String,
    pub anio: i32,
    pub activo: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClasificadorGasto {
    pub codigo: String,
    pub descripcion: String,
    /// Generic group, `2.1`, `2.3`, `2.5` or `2.6`
    pub tipo_generico: String,
}

/// Annual budget line. Formats 2 and 3 fill the optional activity and execution fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProgramacionPresupuestal {
    pub anio: i32,
    pub ue_codigo: String,
    pub meta_codigo: String,
    pub clasificador_codigo: String,
    pub descripcion: String,
    pub pia: f64,
    pub pim: f64,
    pub certificado: f64,
    pub compromiso_anual: f64,
    pub devengado: f64,
    pub girado: f64,
    pub saldo: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ao_codigo: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tarea_codigo: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta_descripcion: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ao_descripcion: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tarea_descripcion: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub programado: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ejecutado: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pct_avance: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub justificacion: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub observaciones: Option<String>,
}

/// One month of a classifier line (formats 1 and 2) or of an activity (formats 5A and 5B).
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProgramacionMensual {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clasificador_codigo: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub codigo_ao: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nombre_ao: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ao_codigo: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tarea_codigo: Option<String>,
    pub anio: i32,
    pub ue_codigo: String,
    pub meta_codigo: String,
    pub mes: u32,
    pub programado: f64,
    pub ejecutado: f64,
    pub saldo: f64,
}

/// Direction of a budget modification
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TipoModificacion {
    /// Inbound credit
    #[default]
    Habilitacion,
    /// Outbound debit
    Habilitada,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModificacionPresupuestal {
    pub anio: i32,
    pub ue_codigo: String,
    pub clasificador_codigo: String,
    pub descripcion: String,
    pub tipo: TipoModificacion,
    pub monto: f64,
    pub nota_modificacion: String,
    pub fecha: Option<String>,
    pub asignado: f64,
    pub habilitadora: f64,
    pub habilitada: f64,
    pub pim_resultante: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PersonalRrhh {
    pub anio: i32,
    pub ue_codigo: String,
    pub dni: String,
    pub nombre_completo: String,
    pub cargo: String,
    pub area: String,
    pub regimen_laboral: String,
    pub tipo_contrato: String,
    pub fecha_inicio: Option<String>,
    pub fecha_fin: Option<String>,
    pub remuneracion: f64,
    pub estado: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub observaciones: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AoResumen {
    pub anio: i32,
    pub ue_codigo: String,
    pub meta_codigo: String,
    pub codigo_ao: String,
    pub nombre_ao: String,
    pub pim: f64,
    pub ccp: f64,
    pub compromiso_anual: f64,
    pub devengado: f64,
    pub girado: f64,
    pub saldo: f64,
    /// Ratio, `0.85` for 85 %
    pub pct_avance_pim: Option<f64>,
    pub pct_avance_ccp: Option<f64>,
    pub semaforo: String,
    /// Month (1-12) to accrued amount
    pub devengado_mensual: BTreeMap<u32, f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SigaRequerimiento {
    pub numero_requerimiento: String,
    pub descripcion: String,
    pub unidad_medida: String,
    pub cantidad: f64,
    pub precio_unitario: f64,
    pub monto_total: f64,
    pub estado: String,
    pub proveedor: String,
    pub fecha: Option<String>,
}
