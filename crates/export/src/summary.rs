use std::io::Write;

use astrochop_core::time::format_julian_date;
use astrochop_transfer::{GridSummary, OptimumResult, PorkchopOutcome};
use serde::Serialize;

use crate::ExportError;

/// JSON sidecar describing one porkchop run.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary<'a> {
    pub departure_body: &'a str,
    pub arrival_body: &'a str,
    pub departure_window: WindowSummary,
    pub arrival_window: WindowSummary,
    pub cells: GridSummary,
    pub optimum: Option<OptimumSummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct WindowSummary {
    pub start_date: String,
    pub end_date: String,
    pub epochs: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct OptimumSummary {
    pub departure_date: String,
    pub arrival_date: String,
    #[serde(flatten)]
    pub result: OptimumResult,
}

impl<'a> RunSummary<'a> {
    pub fn new(departure_body: &'a str, arrival_body: &'a str, outcome: &PorkchopOutcome) -> Self {
        let grid = &outcome.grid;
        Self {
            departure_body,
            arrival_body,
            departure_window: WindowSummary::of(grid.departure_epochs()),
            arrival_window: WindowSummary::of(grid.arrival_epochs()),
            cells: grid.summary(),
            optimum: outcome.optimum.map(|result| OptimumSummary {
                departure_date: format_julian_date(result.departure_jd),
                arrival_date: format_julian_date(result.arrival_jd),
                result,
            }),
        }
    }
}

impl WindowSummary {
    fn of(epochs: &[f64]) -> Self {
        let label = |jd: Option<&f64>| jd.map(|&jd| format_julian_date(jd)).unwrap_or_default();
        Self {
            start_date: label(epochs.first()),
            end_date: label(epochs.last()),
            epochs: epochs.len(),
        }
    }
}

/// Pretty-printed JSON, followed by a newline.
pub fn write_summary(writer: &mut dyn Write, summary: &RunSummary<'_>) -> Result<(), ExportError> {
    serde_json::to_writer_pretty(&mut *writer, summary)?;
    writeln!(writer)?;
    Ok(())
}
