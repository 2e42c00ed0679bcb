//! Porkchop grid CSV export, one row per (departure, arrival) cell.

use std::io::{Read, Write};

use astrochop_core::time::format_julian_date;
use astrochop_lambert::FailureReason;
use astrochop_transfer::{GridCell, PorkchopGrid};
use serde::{Deserialize, Serialize};

use crate::ExportError;

/// CSV row emitted by the porkchop exporter. Invalid cells leave the
/// numeric columns empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridRecord {
    pub departure_jd: f64,
    pub arrival_jd: f64,
    pub departure_date: String,
    pub arrival_date: String,
    pub tof_days: Option<f64>,
    pub c3_km2_s2: Option<f64>,
    pub vinf_dep_km_s: Option<f64>,
    pub vinf_arr_km_s: Option<f64>,
    pub feasible: bool,
    #[serde(default)]
    pub failure: String,
}

impl From<&GridCell> for GridRecord {
    fn from(cell: &GridCell) -> Self {
        Self {
            departure_jd: cell.departure_jd,
            arrival_jd: cell.arrival_jd,
            departure_date: format_julian_date(cell.departure_jd),
            arrival_date: format_julian_date(cell.arrival_jd),
            tof_days: cell.tof_days,
            c3_km2_s2: cell.c3_km2_s2,
            vinf_dep_km_s: cell.vinf_departure_km_s,
            vinf_arr_km_s: cell.vinf_arrival_km_s,
            feasible: cell.is_valid(),
            failure: failure_label(cell.failure).to_string(),
        }
    }
}

/// Short machine-readable label for a cell failure.
pub fn failure_label(failure: Option<FailureReason>) -> &'static str {
    match failure {
        None => "",
        Some(FailureReason::DegenerateGeometry) => "degenerate_geometry",
        Some(FailureReason::MaxIterationsExceeded) => "max_iterations_exceeded",
    }
}

/// Write the grid in row-major order and return the number of rows written.
pub fn write_grid_csv(writer: &mut dyn Write, grid: &PorkchopGrid) -> Result<usize, ExportError> {
    let mut csv = csv::Writer::from_writer(writer);
    let mut rows = 0;
    for cell in grid.cells() {
        csv.serialize(GridRecord::from(&cell))?;
        rows += 1;
    }
    csv.flush()?;
    Ok(rows)
}

/// Read records back from a CSV written by [`write_grid_csv`].
pub fn read_grid_records<R: Read>(reader: R) -> Result<Vec<GridRecord>, ExportError> {
    csv::Reader::from_reader(reader)
        .deserialize()
        .map(|record| record.map_err(ExportError::from))
        .collect()
}
