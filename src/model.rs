//! Typed record model for reception inspection reports
//!
//! One `Report` per document: header fields, three grading sections with a
//! fixed column vocabulary each, two end-of-process dates, and free-text
//! observations.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Grading tallies for hardboard sheets ("CHAPADUR HARDBOARD" section)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChapadurHardboard {
    pub apto_s_film: i64,
    pub second: i64,
    pub third: i64,
    pub plastificado: i64,
    pub no_apto: i64,
    pub total: i64,
    /// Quantity declared on the remito, as printed
    pub informado: i64,
    /// Difference as printed in the document, not recomputed
    pub diferencia: i64,
    pub no_apto_percentage: f64,
    /// Free-text discard reason from the section label cell
    pub motivo_descartes: String,
}

/// Grading tallies for ARLOG pallets ("PALLETS ARLOG" section)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PalletsArlog {
    pub oi: i64,
    pub branca: i64,
    pub reparacion: i64,
    pub no_apto: i64,
    pub total: i64,
    pub informado: i64,
    pub diferencia: i64,
    pub no_apto_percentage: f64,
    pub motivo_descartes: String,
}

/// Grading tallies for wooden frames ("MARCOS DE MADERA" section)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarcosDeMadera {
    pub apto: i64,
    pub no_apto_mnpncr: i64,
    pub no_apto: i64,
    pub total: i64,
    pub informado: i64,
    pub diferencia: i64,
    pub no_apto_percentage: f64,
    pub motivo_descartes: String,
}

/// A fully parsed inspection report
///
/// Built in one pass over the cell matrix and returned as an immutable value;
/// every field except `observaciones` is required, and a document missing any
/// of them fails the whole parse.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub num_informe: i64,
    pub cliente: String,
    /// Remito number as printed; may contain non-numeric characters
    pub num_remito: String,
    pub fecha_recepcion: NaiveDate,
    pub chapadur_hardboard: ChapadurHardboard,
    pub pallets_arlog: PalletsArlog,
    pub marcos_de_madera: MarcosDeMadera,
    pub fecha_fin_proceso_chapadur: NaiveDate,
    /// Pallets and frames share one end-of-process date
    pub fecha_fin_proceso_pallet_marco: NaiveDate,
    /// One entry per OBSERVACIONES block, in document order; empty when none
    pub observaciones: Vec<String>,
}
