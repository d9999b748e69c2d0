//! Matrix-to-record report parser
//!
//! Consumes the flat cell matrix produced by the row extractor (tables
//! concatenated in document order), recognizes anchor rows by keyword,
//! reads data at fixed offsets below them, coerces cell text into typed
//! fields, and assembles the final `Report` in a single pass.

use crate::coerce::{parse_date, parse_int, parse_motivo_descartes, parse_percentage, CoerceError};
use crate::model::{ChapadurHardboard, MarcosDeMadera, PalletsArlog, Report};
use crate::ReportError;
use chrono::NaiveDate;

pub const NUM_INFORME_KEYWORD: &str = "Nº INFORME";
pub const CLIENTE_KEYWORD: &str = "CLIENTE";
pub const NUM_REMITO_KEYWORD: &str = "Nº REMITO";
pub const FECHA_RECEPCION_KEYWORD: &str = "FECHA RECEPCIÓN";
pub const CHAPADUR_KEYWORD: &str = "CHAPADUR HARDBOARD";
pub const PALLETS_KEYWORD: &str = "PALLETS ARLOG";
pub const MARCOS_KEYWORD: &str = "MARCOS DE MADERA";
pub const FIN_PROCESO_KEYWORD: &str = "FECHA FIN PROCESO";
pub const OBSERVACIONES_KEYWORD: &str = "OBSERVACIONES";

/// Family label next to the pallet/frame completion date (singular in the
/// source document, unlike the section header)
pub const PALLET_FAMILY_KEYWORD: &str = "PALLET ARLOG";

/// A hardboard header only parses when its data row (two below) has more
/// cells than this; shorter rows are header repetitions without data columns.
pub const CHAPADUR_MIN_DATA_CELLS: usize = 8;

/// Rows between a section header and its data row (the intervening row is a
/// column sub-header and is skipped unconditionally)
const DATA_ROW_OFFSET: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Anchor {
    NumInforme,
    Cliente,
    NumRemito,
    FechaRecepcion,
    Chapadur,
    Pallets,
    Marcos,
    FinProceso,
    Observaciones,
}

/// Keyword dispatch table, in match priority order. A row is classified by
/// the first keyword any of its cells contains.
const ANCHORS: &[(&str, Anchor)] = &[
    (NUM_INFORME_KEYWORD, Anchor::NumInforme),
    (CLIENTE_KEYWORD, Anchor::Cliente),
    (NUM_REMITO_KEYWORD, Anchor::NumRemito),
    (FECHA_RECEPCION_KEYWORD, Anchor::FechaRecepcion),
    (CHAPADUR_KEYWORD, Anchor::Chapadur),
    (PALLETS_KEYWORD, Anchor::Pallets),
    (MARCOS_KEYWORD, Anchor::Marcos),
    (FIN_PROCESO_KEYWORD, Anchor::FinProceso),
    (OBSERVACIONES_KEYWORD, Anchor::Observaciones),
];

/// Classify row `i`. An anchor that is not ready (hardboard header whose data
/// row is missing or short) does not claim the row; lower-priority keywords
/// still get their chance.
///
/// Multi-line cells never anchor: section data rows repeat the section name
/// on the first line of their label cell, and matching those would misread a
/// data row as a fresh header.
fn match_anchor(i: usize, matrix: &[Vec<String>]) -> Option<Anchor> {
    let row = &matrix[i];
    ANCHORS.iter().copied().find_map(|(keyword, anchor)| {
        let hit = row
            .iter()
            .any(|cell| !cell.contains('\n') && cell.contains(keyword));
        (hit && anchor_ready(anchor, i, matrix)).then_some(anchor)
    })
}

fn anchor_ready(anchor: Anchor, i: usize, matrix: &[Vec<String>]) -> bool {
    match anchor {
        Anchor::Chapadur => matrix
            .get(i + DATA_ROW_OFFSET)
            .is_some_and(|row| row.len() > CHAPADUR_MIN_DATA_CELLS),
        _ => true,
    }
}

/// Parse a cell matrix into a `Report`
///
/// Single pass; any missing required anchor, short data row, or cell that
/// fails coercion aborts the whole parse. No partial report is ever returned.
pub fn parse_matrix(matrix: &[Vec<String>]) -> Result<Report, ReportError> {
    let mut draft = DraftReport::default();

    for i in 0..matrix.len() {
        let Some(anchor) = match_anchor(i, matrix) else {
            continue;
        };
        log::debug!("anchor {:?} at row {}", anchor, i);

        let row = &matrix[i];
        match anchor {
            Anchor::NumInforme => {
                let cell = header_cell(row, i, NUM_INFORME_KEYWORD)?;
                draft.num_informe = Some(coerced(parse_int(cell), "num_informe", cell, i, 1)?);
            }
            Anchor::Cliente => {
                draft.cliente = Some(header_cell(row, i, CLIENTE_KEYWORD)?.to_string());
            }
            Anchor::NumRemito => {
                draft.num_remito = Some(header_cell(row, i, NUM_REMITO_KEYWORD)?.to_string());
            }
            Anchor::FechaRecepcion => {
                let cell = header_cell(row, i, FECHA_RECEPCION_KEYWORD)?;
                draft.fecha_recepcion =
                    Some(coerced(parse_date(cell), "fecha_recepcion", cell, i, 1)?);
            }
            Anchor::Chapadur => {
                // readiness guard already proved the data row exists
                let data_row = i + DATA_ROW_OFFSET;
                draft.chapadur_hardboard =
                    Some(parse_chapadur_row(&matrix[data_row], data_row)?);
            }
            Anchor::Pallets => {
                let data_row = i + DATA_ROW_OFFSET;
                let row = matrix.get(data_row).ok_or(ReportError::MalformedDataRow {
                    section: PALLETS_KEYWORD,
                    row: data_row,
                })?;
                draft.pallets_arlog = Some(parse_pallets_row(row, data_row)?);
            }
            Anchor::Marcos => {
                let data_row = i + DATA_ROW_OFFSET;
                let row = matrix.get(data_row).ok_or(ReportError::MalformedDataRow {
                    section: MARCOS_KEYWORD,
                    row: data_row,
                })?;
                draft.marcos_de_madera = Some(parse_marcos_row(row, data_row)?);
            }
            Anchor::FinProceso => {
                draft.resolve_end_dates(i, matrix);
            }
            Anchor::Observaciones => {
                let obs_row = i + 1;
                let cell = matrix
                    .get(obs_row)
                    .and_then(|row| row.get(1))
                    .ok_or(ReportError::MalformedDataRow {
                        section: OBSERVACIONES_KEYWORD,
                        row: obs_row,
                    })?;
                draft.observaciones.push(cell.trim().to_string());
            }
        }
    }

    draft.finish()
}

/// Second cell of a top-level anchor row (the value sits right of the label)
fn header_cell<'m>(
    row: &'m [String],
    row_idx: usize,
    section: &'static str,
) -> Result<&'m str, ReportError> {
    row.get(1)
        .map(String::as_str)
        .ok_or(ReportError::MalformedDataRow {
            section,
            row: row_idx,
        })
}

/// Attach field name and cell location to a primitive coercion failure
fn coerced<T>(
    result: Result<T, CoerceError>,
    field: &'static str,
    value: &str,
    row: usize,
    col: usize,
) -> Result<T, ReportError> {
    result.map_err(|source| ReportError::Coercion {
        field,
        value: value.to_string(),
        row,
        col,
        source,
    })
}

/// All fields optional until the scan completes; finalized once into the
/// immutable `Report` so "which fields are still missing" stays inspectable.
#[derive(Debug, Default)]
struct DraftReport {
    num_informe: Option<i64>,
    cliente: Option<String>,
    num_remito: Option<String>,
    fecha_recepcion: Option<NaiveDate>,
    chapadur_hardboard: Option<ChapadurHardboard>,
    pallets_arlog: Option<PalletsArlog>,
    marcos_de_madera: Option<MarcosDeMadera>,
    fecha_fin_proceso_chapadur: Option<NaiveDate>,
    fecha_fin_proceso_pallet_marco: Option<NaiveDate>,
    observaciones: Vec<String>,
}

impl DraftReport {
    /// Resolve the two end-of-process dates by brute-force scan from the
    /// marker row to the end of the matrix.
    ///
    /// The document places these dates in unpredictable cells, so every cell
    /// from here on is tried as a date (failures silently skipped — only
    /// here; every other coercion fails loudly) and its left neighbor decides
    /// which process family the date closes. Later matches overwrite earlier
    /// ones. A date in column 0 has no left neighbor and is skipped.
    fn resolve_end_dates(&mut self, start: usize, matrix: &[Vec<String>]) {
        for row in &matrix[start..] {
            for (col, cell) in row.iter().enumerate() {
                let Ok(date) = parse_date(cell) else {
                    continue;
                };
                if col == 0 {
                    continue;
                }
                let label = &row[col - 1];
                if label.contains(CHAPADUR_KEYWORD) {
                    self.fecha_fin_proceso_chapadur = Some(date);
                } else if label.contains(PALLET_FAMILY_KEYWORD) {
                    self.fecha_fin_proceso_pallet_marco = Some(date);
                }
            }
        }
    }

    fn finish(self) -> Result<Report, ReportError> {
        Ok(Report {
            num_informe: self
                .num_informe
                .ok_or(ReportError::MissingField(NUM_INFORME_KEYWORD))?,
            cliente: self
                .cliente
                .ok_or(ReportError::MissingField(CLIENTE_KEYWORD))?,
            num_remito: self
                .num_remito
                .ok_or(ReportError::MissingField(NUM_REMITO_KEYWORD))?,
            fecha_recepcion: self
                .fecha_recepcion
                .ok_or(ReportError::MissingField(FECHA_RECEPCION_KEYWORD))?,
            chapadur_hardboard: self
                .chapadur_hardboard
                .ok_or(ReportError::MissingField(CHAPADUR_KEYWORD))?,
            pallets_arlog: self
                .pallets_arlog
                .ok_or(ReportError::MissingField(PALLETS_KEYWORD))?,
            marcos_de_madera: self
                .marcos_de_madera
                .ok_or(ReportError::MissingField(MARCOS_KEYWORD))?,
            fecha_fin_proceso_chapadur: self
                .fecha_fin_proceso_chapadur
                .ok_or(ReportError::MissingField("FECHA FIN PROCESO CHAPADUR"))?,
            fecha_fin_proceso_pallet_marco: self
                .fecha_fin_proceso_pallet_marco
                .ok_or(ReportError::MissingField("FECHA FIN PROCESO PALLET/MARCO"))?,
            observaciones: self.observaciones,
        })
    }
}

/// Fetch a data-row cell by fixed column index
fn data_cell<'r>(
    row: &'r [String],
    row_idx: usize,
    col: usize,
    section: &'static str,
) -> Result<&'r str, ReportError> {
    row.get(col)
        .map(String::as_str)
        .ok_or(ReportError::MalformedDataRow {
            section,
            row: row_idx,
        })
}

/// Warn (never fail) when the printed diferencia disagrees with
/// total - informado; the printed value is what lands in the record either way.
fn check_diferencia(section: &str, total: i64, informado: i64, diferencia: i64) {
    if total - informado != diferencia {
        log::warn!(
            "{}: printed diferencia {} != total - informado = {}",
            section,
            diferencia,
            total - informado
        );
    }
}

fn parse_chapadur_row(row: &[String], row_idx: usize) -> Result<ChapadurHardboard, ReportError> {
    let int_at = |col: usize, field: &'static str| -> Result<i64, ReportError> {
        let cell = data_cell(row, row_idx, col, CHAPADUR_KEYWORD)?;
        coerced(parse_int(cell), field, cell, row_idx, col)
    };
    let label = data_cell(row, row_idx, 0, CHAPADUR_KEYWORD)?;
    let pct = data_cell(row, row_idx, 9, CHAPADUR_KEYWORD)?;

    let record = ChapadurHardboard {
        apto_s_film: int_at(1, "apto_s_film")?,
        second: int_at(2, "second")?,
        third: int_at(3, "third")?,
        plastificado: int_at(4, "plastificado")?,
        no_apto: int_at(5, "no_apto")?,
        total: int_at(6, "total")?,
        informado: int_at(7, "informado")?,
        diferencia: int_at(8, "diferencia")?,
        no_apto_percentage: coerced(
            parse_percentage(pct),
            "no_apto_percentage",
            pct,
            row_idx,
            9,
        )?,
        motivo_descartes: coerced(
            parse_motivo_descartes(label),
            "motivo_descartes",
            label,
            row_idx,
            0,
        )?,
    };
    check_diferencia(
        CHAPADUR_KEYWORD,
        record.total,
        record.informado,
        record.diferencia,
    );
    Ok(record)
}

fn parse_pallets_row(row: &[String], row_idx: usize) -> Result<PalletsArlog, ReportError> {
    let int_at = |col: usize, field: &'static str| -> Result<i64, ReportError> {
        let cell = data_cell(row, row_idx, col, PALLETS_KEYWORD)?;
        coerced(parse_int(cell), field, cell, row_idx, col)
    };
    let label = data_cell(row, row_idx, 0, PALLETS_KEYWORD)?;
    let pct = data_cell(row, row_idx, 8, PALLETS_KEYWORD)?;

    let record = PalletsArlog {
        oi: int_at(1, "oi")?,
        branca: int_at(2, "branca")?,
        reparacion: int_at(3, "reparacion")?,
        no_apto: int_at(4, "no_apto")?,
        total: int_at(5, "total")?,
        informado: int_at(6, "informado")?,
        diferencia: int_at(7, "diferencia")?,
        no_apto_percentage: coerced(
            parse_percentage(pct),
            "no_apto_percentage",
            pct,
            row_idx,
            8,
        )?,
        motivo_descartes: coerced(
            parse_motivo_descartes(label),
            "motivo_descartes",
            label,
            row_idx,
            0,
        )?,
    };
    check_diferencia(
        PALLETS_KEYWORD,
        record.total,
        record.informado,
        record.diferencia,
    );
    Ok(record)
}

fn parse_marcos_row(row: &[String], row_idx: usize) -> Result<MarcosDeMadera, ReportError> {
    let int_at = |col: usize, field: &'static str| -> Result<i64, ReportError> {
        let cell = data_cell(row, row_idx, col, MARCOS_KEYWORD)?;
        coerced(parse_int(cell), field, cell, row_idx, col)
    };
    let label = data_cell(row, row_idx, 0, MARCOS_KEYWORD)?;
    let pct = data_cell(row, row_idx, 7, MARCOS_KEYWORD)?;

    let record = MarcosDeMadera {
        apto: int_at(1, "apto")?,
        no_apto_mnpncr: int_at(2, "no_apto_mnpncr")?,
        no_apto: int_at(3, "no_apto")?,
        total: int_at(4, "total")?,
        informado: int_at(5, "informado")?,
        diferencia: int_at(6, "diferencia")?,
        no_apto_percentage: coerced(
            parse_percentage(pct),
            "no_apto_percentage",
            pct,
            row_idx,
            7,
        )?,
        motivo_descartes: coerced(
            parse_motivo_descartes(label),
            "motivo_descartes",
            label,
            row_idx,
            0,
        )?,
    };
    check_diferencia(
        MARCOS_KEYWORD,
        record.total,
        record.informado,
        record.diferencia,
    );
    Ok(record)
}
