//! Dense porkchop fields and the quantities derived from them.

use astrochop_lambert::FailureReason;
use serde::Serialize;

/// Row-major `(departure i, arrival j)` fields produced by one engine run.
///
/// Invalid cells hold NaN in `c3` and `vinf_arrival`; the accessors turn
/// that into `None`.
#[derive(Debug, Clone, PartialEq)]
pub struct PorkchopGrid {
    departure_epochs: Vec<f64>,
    arrival_epochs: Vec<f64>,
    c3: Vec<f64>,
    tof_days: Vec<f64>,
    vinf_arrival: Vec<f64>,
    validity: Vec<bool>,
    failures: Vec<Option<FailureReason>>,
}

/// One cell of the grid, as handed to writers and plotters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridCell {
    pub departure_index: usize,
    pub arrival_index: usize,
    pub departure_jd: f64,
    pub arrival_jd: f64,
    pub tof_days: Option<f64>,
    pub c3_km2_s2: Option<f64>,
    pub vinf_departure_km_s: Option<f64>,
    pub vinf_arrival_km_s: Option<f64>,
    pub failure: Option<FailureReason>,
}

impl GridCell {
    pub fn is_valid(&self) -> bool {
        self.c3_km2_s2.is_some()
    }
}

/// Minimum-C3 transfer of a grid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct OptimumResult {
    pub departure_index: usize,
    pub arrival_index: usize,
    pub departure_jd: f64,
    pub arrival_jd: f64,
    pub c3_km2_s2: f64,
    pub tof_days: f64,
    pub vinf_departure_km_s: f64,
    pub vinf_arrival_km_s: f64,
}

/// Cell tallies by outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct GridSummary {
    pub total: usize,
    pub valid: usize,
    pub rejected: usize,
    pub diverged: usize,
}

impl GridSummary {
    pub fn infeasible(&self) -> usize {
        self.total - self.valid
    }
}

impl PorkchopGrid {
    /// Assemble a grid from per-cell fields already laid out row-major.
    pub(crate) fn from_fields(
        departure_epochs: Vec<f64>,
        arrival_epochs: Vec<f64>,
        c3: Vec<f64>,
        tof_days: Vec<f64>,
        vinf_arrival: Vec<f64>,
        failures: Vec<Option<FailureReason>>,
    ) -> Self {
        let validity = failures.iter().map(Option::is_none).collect();
        Self {
            departure_epochs,
            arrival_epochs,
            c3,
            tof_days,
            vinf_arrival,
            validity,
            failures,
        }
    }

    /// Number of departure epochs (rows).
    pub fn rows(&self) -> usize {
        self.departure_epochs.len()
    }

    /// Number of arrival epochs (columns).
    pub fn cols(&self) -> usize {
        self.arrival_epochs.len()
    }

    pub fn len(&self) -> usize {
        self.c3.len()
    }

    pub fn is_empty(&self) -> bool {
        self.c3.is_empty()
    }

    pub fn departure_epochs(&self) -> &[f64] {
        &self.departure_epochs
    }

    pub fn arrival_epochs(&self) -> &[f64] {
        &self.arrival_epochs
    }

    /// Flat row-major index of `(i, j)`, if in range.
    pub fn index(&self, i: usize, j: usize) -> Option<usize> {
        (i < self.rows() && j < self.cols()).then(|| i * self.cols() + j)
    }

    pub fn is_valid(&self, i: usize, j: usize) -> bool {
        self.index(i, j).is_some_and(|k| self.validity[k])
    }

    pub fn c3(&self, i: usize, j: usize) -> Option<f64> {
        self.valid_value(&self.c3, i, j)
    }

    /// Arrival minus departure epoch, for any cell where it is positive.
    pub fn tof_days(&self, i: usize, j: usize) -> Option<f64> {
        let k = self.index(i, j)?;
        let tof = self.tof_days[k];
        tof.is_finite().then_some(tof)
    }

    pub fn vinf_departure(&self, i: usize, j: usize) -> Option<f64> {
        self.c3(i, j).map(f64::sqrt)
    }

    pub fn vinf_arrival(&self, i: usize, j: usize) -> Option<f64> {
        self.valid_value(&self.vinf_arrival, i, j)
    }

    pub fn failure(&self, i: usize, j: usize) -> Option<FailureReason> {
        self.index(i, j).and_then(|k| self.failures[k])
    }

    /// Raw C3 field, NaN where invalid.
    pub fn c3_values(&self) -> &[f64] {
        &self.c3
    }

    /// Raw time-of-flight field, NaN where arrival does not follow departure.
    pub fn tof_values(&self) -> &[f64] {
        &self.tof_days
    }

    pub fn vinf_arrival_values(&self) -> &[f64] {
        &self.vinf_arrival
    }

    pub fn validity(&self) -> &[bool] {
        &self.validity
    }

    pub fn cell(&self, i: usize, j: usize) -> Option<GridCell> {
        let k = self.index(i, j)?;
        Some(GridCell {
            departure_index: i,
            arrival_index: j,
            departure_jd: self.departure_epochs[i],
            arrival_jd: self.arrival_epochs[j],
            tof_days: self.tof_days(i, j),
            c3_km2_s2: self.c3(i, j),
            vinf_departure_km_s: self.vinf_departure(i, j),
            vinf_arrival_km_s: self.vinf_arrival(i, j),
            failure: self.failures[k],
        })
    }

    /// All cells in row-major order.
    pub fn cells(&self) -> impl Iterator<Item = GridCell> + '_ {
        (0..self.rows())
            .flat_map(move |i| (0..self.cols()).map(move |j| (i, j)))
            .filter_map(|(i, j)| self.cell(i, j))
    }

    pub fn summary(&self) -> GridSummary {
        let mut summary = GridSummary {
            total: self.len(),
            ..GridSummary::default()
        };
        for failure in &self.failures {
            match failure {
                None => summary.valid += 1,
                Some(FailureReason::DegenerateGeometry) => summary.rejected += 1,
                Some(FailureReason::MaxIterationsExceeded) => summary.diverged += 1,
            }
        }
        summary
    }

    /// Minimum C3 over valid cells. Ties go to the shorter flight, then the
    /// lower departure index, then the lower arrival index.
    pub fn optimum(&self) -> Option<OptimumResult> {
        let mut best: Option<(usize, f64, f64)> = None;
        for (k, &valid) in self.validity.iter().enumerate() {
            if !valid {
                continue;
            }
            let (c3, tof) = (self.c3[k], self.tof_days[k]);
            let better = match best {
                None => true,
                Some((_, best_c3, best_tof)) => c3
                    .total_cmp(&best_c3)
                    .then(tof.total_cmp(&best_tof))
                    .is_lt(),
            };
            if better {
                best = Some((k, c3, tof));
            }
        }
        let (k, c3, tof) = best?;
        let (i, j) = (k / self.cols(), k % self.cols());
        Some(OptimumResult {
            departure_index: i,
            arrival_index: j,
            departure_jd: self.departure_epochs[i],
            arrival_jd: self.arrival_epochs[j],
            c3_km2_s2: c3,
            tof_days: tof,
            vinf_departure_km_s: c3.sqrt(),
            vinf_arrival_km_s: self.vinf_arrival[k],
        })
    }

    fn valid_value(&self, field: &[f64], i: usize, j: usize) -> Option<f64> {
        let k = self.index(i, j)?;
        self.validity[k].then_some(field[k])
    }
}
