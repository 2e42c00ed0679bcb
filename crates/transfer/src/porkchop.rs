//! Porkchop grid generation: one batched Lambert solve over every
//! (departure, arrival) pair of two epoch axes.

use astrochop_config::{DEFAULT_MAX_CELLS, RunConfig};
use astrochop_core::constants::MU_SUN;
use astrochop_core::time::days_to_seconds;
use astrochop_core::vector::{self, Vector3};
use astrochop_ephem::{Ephemeris, EphemerisError, StateVector};
use astrochop_lambert::{
    FailureReason, LambertProblem, LambertSolver, ProblemError, SettingsError, SolverSettings,
    TransferDirection,
};
use thiserror::Error;
use tracing::debug;

use crate::grid::{GridSummary, OptimumResult, PorkchopGrid};

/// Caps on the work one grid may request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridLimits {
    pub max_cells: usize,
}

impl Default for GridLimits {
    fn default() -> Self {
        Self {
            max_cells: DEFAULT_MAX_CELLS,
        }
    }
}

/// Solver and limit settings for one engine.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PorkchopSettings {
    pub solver: SolverSettings,
    pub limits: GridLimits,
}

impl PorkchopSettings {
    pub fn from_config(config: &RunConfig) -> Self {
        Self {
            solver: SolverSettings {
                tolerance: config.solver.tolerance,
                max_iterations: config.solver.max_iterations,
                small_z_threshold: config.solver.small_z_threshold,
            },
            limits: GridLimits {
                max_cells: config.limits.max_cells,
            },
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PorkchopRequest<'a> {
    pub departure_body: &'a str,
    pub arrival_body: &'a str,
    /// Departure epochs (JD), one grid row each.
    pub departure_epochs: &'a [f64],
    /// Arrival epochs (JD), one grid column each.
    pub arrival_epochs: &'a [f64],
}

#[derive(Debug, Error)]
pub enum PorkchopError {
    #[error("grid of {requested} cells exceeds the limit of {limit}")]
    GridSizeExceeded { requested: u128, limit: usize },
    #[error("ephemeris error: {0}")]
    Ephemeris(#[from] EphemerisError),
    #[error(transparent)]
    Problem(#[from] ProblemError),
    #[error(transparent)]
    Settings(#[from] SettingsError),
    #[error("no feasible transfer found in the requested windows")]
    NoFeasibleTransfer,
}

/// A finished grid and its best cell, if any cell is valid.
#[derive(Debug, Clone, PartialEq)]
pub struct PorkchopOutcome {
    pub grid: PorkchopGrid,
    pub optimum: Option<OptimumResult>,
}

impl PorkchopOutcome {
    pub fn require_optimum(&self) -> Result<&OptimumResult, PorkchopError> {
        self.optimum.as_ref().ok_or(PorkchopError::NoFeasibleTransfer)
    }

    pub fn summary(&self) -> GridSummary {
        self.grid.summary()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PorkchopGridEngine {
    solver: LambertSolver,
    limits: GridLimits,
}

impl PorkchopGridEngine {
    pub fn new(solver: LambertSolver, limits: GridLimits) -> Self {
        Self { solver, limits }
    }

    /// Heliocentric engine built from settings.
    pub fn heliocentric(settings: &PorkchopSettings) -> Result<Self, PorkchopError> {
        let solver = LambertSolver::new(MU_SUN, settings.solver)?;
        Ok(Self::new(solver, settings.limits))
    }

    pub fn limits(&self) -> GridLimits {
        self.limits
    }

    /// Reject a `departures × arrivals` grid that would exceed the cell cap.
    pub fn check_size(&self, departures: usize, arrivals: usize) -> Result<usize, PorkchopError> {
        departures
            .checked_mul(arrivals)
            .filter(|&cells| cells <= self.limits.max_cells)
            .ok_or(PorkchopError::GridSizeExceeded {
                requested: departures as u128 * arrivals as u128,
                limit: self.limits.max_cells,
            })
    }

    pub fn generate(
        &self,
        request: &PorkchopRequest<'_>,
        ephemeris: &dyn Ephemeris,
    ) -> Result<PorkchopOutcome, PorkchopError> {
        let rows = request.departure_epochs.len();
        let cols = request.arrival_epochs.len();
        let cells = self.check_size(rows, cols)?;

        let departure_states =
            sample_axis(ephemeris, request.departure_body, request.departure_epochs)?;
        let arrival_states =
            sample_axis(ephemeris, request.arrival_body, request.arrival_epochs)?;

        let mut r1 = Vec::with_capacity(cells);
        let mut r2 = Vec::with_capacity(cells);
        let mut flight_times = Vec::with_capacity(cells);
        let mut tof_days = Vec::with_capacity(cells);
        for (dep_state, &dep_jd) in departure_states.iter().zip(request.departure_epochs) {
            for (arr_state, &arr_jd) in arrival_states.iter().zip(request.arrival_epochs) {
                let days = arr_jd - dep_jd;
                r1.push(dep_state.position_km);
                r2.push(arr_state.position_km);
                flight_times.push(days_to_seconds(days));
                tof_days.push(if days > 0.0 { days } else { f64::NAN });
            }
        }
        let problem = LambertProblem::uniform(r1, r2, flight_times, TransferDirection::Prograde)?;
        let batch = self.solver.solve(&problem);

        let mut c3 = vec![f64::NAN; cells];
        let mut vinf_arrival = vec![f64::NAN; cells];
        let mut failures = Vec::with_capacity(cells);
        for (k, solution) in batch.iter().enumerate() {
            let dep_state = &departure_states[k / cols];
            let arr_state = &arrival_states[k % cols];
            let failure = match solution.velocities() {
                Some((v1, v2)) => {
                    let (cell_c3, cell_vinf) = excess_energy(dep_state, arr_state, &v1, &v2);
                    if cell_c3.is_finite() && cell_vinf.is_finite() {
                        c3[k] = cell_c3;
                        vinf_arrival[k] = cell_vinf;
                        None
                    } else {
                        Some(FailureReason::DegenerateGeometry)
                    }
                }
                None => solution.failure(),
            };
            failures.push(failure);
        }

        let grid = PorkchopGrid::from_fields(
            request.departure_epochs.to_vec(),
            request.arrival_epochs.to_vec(),
            c3,
            tof_days,
            vinf_arrival,
            failures,
        );
        let optimum = grid.optimum();
        let summary = grid.summary();
        debug!(
            departure_body = request.departure_body,
            arrival_body = request.arrival_body,
            rows,
            cols,
            valid = summary.valid,
            rejected = summary.rejected,
            diverged = summary.diverged,
            solver_iterations = batch.iterations_used(),
            "porkchop grid generated"
        );
        Ok(PorkchopOutcome { grid, optimum })
    }
}

fn sample_axis(
    ephemeris: &dyn Ephemeris,
    body: &str,
    epochs: &[f64],
) -> Result<Vec<StateVector>, EphemerisError> {
    epochs
        .iter()
        .map(|&epoch| ephemeris.state(body, epoch))
        .collect()
}

/// `(C3, |v∞ at arrival|)` for one converged transfer.
fn excess_energy(
    departure: &StateVector,
    arrival: &StateVector,
    v1: &Vector3,
    v2: &Vector3,
) -> (f64, f64) {
    let vinf_departure = vector::sub(v1, &departure.velocity_km_s);
    let vinf_arrival = vector::sub(v2, &arrival.velocity_km_s);
    (
        vector::dot(&vinf_departure, &vinf_departure),
        vector::norm(&vinf_arrival),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use astrochop_config::{LimitsConfig, SolverConfig};

    #[test]
    fn size_check_uses_checked_multiplication() {
        let engine = PorkchopGridEngine::heliocentric(&PorkchopSettings::default()).unwrap();
        assert_eq!(engine.check_size(1_000, 1_000).unwrap(), 1_000_000);
        assert!(matches!(
            engine.check_size(1_001, 1_000),
            Err(PorkchopError::GridSizeExceeded {
                requested: 1_001_000,
                limit: 1_000_000
            })
        ));
        match engine.check_size(usize::MAX, 3) {
            Err(PorkchopError::GridSizeExceeded { requested, .. }) => {
                assert_eq!(requested, usize::MAX as u128 * 3);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn settings_follow_run_config() {
        let config = RunConfig {
            solver: SolverConfig {
                tolerance: 1e-8,
                max_iterations: 25,
                small_z_threshold: 0.05,
            },
            limits: LimitsConfig { max_cells: 64 },
        };
        let settings = PorkchopSettings::from_config(&config);
        assert_eq!(settings.solver.max_iterations, 25);
        assert_eq!(settings.limits.max_cells, 64);
    }
}
