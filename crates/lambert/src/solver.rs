//! Safeguarded secant iteration on the universal variable z, run over a
//! whole batch of cells at once.

use std::f64::consts::{PI, SQRT_2, TAU};

use astrochop_core::vector::{self, Vector3};
use thiserror::Error;
use tracing::{debug, trace};

use crate::problem::{LambertProblem, TransferDirection};
use crate::solution::{CellStatus, FailureReason, LambertBatch, LambertSolution, Outcome};
use crate::term_ratio::{DEFAULT_SMALL_Z_THRESHOLD, RatioScratch, TermRatioEngine};

/// Default relative flight-time tolerance.
pub const DEFAULT_TOLERANCE: f64 = 1e-10;
/// Default cap on batch sweeps.
pub const DEFAULT_MAX_ITERATIONS: u32 = 100;

/// Below this |sin Δν| the transfer plane is undefined.
const MIN_SIN_TRANSFER_ANGLE: f64 = 1e-10;
/// Single-revolution upper limit on z, where the flight time diverges.
const Z_UPPER: f64 = 4.0 * PI * PI;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolverSettings {
    /// Convergence when `|T − Δt| ≤ tolerance · Δt`.
    pub tolerance: f64,
    pub max_iterations: u32,
    /// `|z|` below which the series ratio terms are used.
    pub small_z_threshold: f64,
}

impl Default for SolverSettings {
    fn default() -> Self {
        Self {
            tolerance: DEFAULT_TOLERANCE,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            small_z_threshold: DEFAULT_SMALL_Z_THRESHOLD,
        }
    }
}

impl SolverSettings {
    pub fn validate(&self) -> Result<(), SettingsError> {
        if !(self.tolerance.is_finite() && self.tolerance > 0.0) {
            return Err(SettingsError::Tolerance(self.tolerance));
        }
        if self.max_iterations == 0 {
            return Err(SettingsError::MaxIterations);
        }
        if !(self.small_z_threshold.is_finite() && self.small_z_threshold > 0.0) {
            return Err(SettingsError::SmallZThreshold(self.small_z_threshold));
        }
        Ok(())
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum SettingsError {
    #[error("tolerance must be positive and finite, got {0}")]
    Tolerance(f64),
    #[error("max_iterations must be at least 1")]
    MaxIterations,
    #[error("small-z threshold must be positive and finite, got {0}")]
    SmallZThreshold(f64),
    #[error("gravitational parameter must be positive and finite, got {0}")]
    GravitationalParameter(f64),
}

/// Errors from the single-cell convenience entry points.
#[derive(Debug, Error, PartialEq)]
pub enum LambertSolverError {
    #[error("degenerate transfer geometry")]
    Degenerate,
    #[error("no convergence after {iterations} iterations")]
    MaxIterations { iterations: u32 },
    #[error(transparent)]
    Settings(#[from] SettingsError),
}

/// Batch Lambert solver for a fixed central body.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LambertSolver {
    mu: f64,
    sqrt_mu: f64,
    settings: SolverSettings,
    engine: TermRatioEngine,
}

impl LambertSolver {
    pub fn new(mu_km3_s2: f64, settings: SolverSettings) -> Result<Self, SettingsError> {
        if !(mu_km3_s2.is_finite() && mu_km3_s2 > 0.0) {
            return Err(SettingsError::GravitationalParameter(mu_km3_s2));
        }
        settings.validate()?;
        Ok(Self {
            mu: mu_km3_s2,
            sqrt_mu: mu_km3_s2.sqrt(),
            settings,
            engine: TermRatioEngine::new(settings.small_z_threshold),
        })
    }

    pub fn mu(&self) -> f64 {
        self.mu
    }

    pub fn settings(&self) -> &SolverSettings {
        &self.settings
    }

    /// Solve every cell of `problem`. Always returns one solution per cell.
    pub fn solve(&self, problem: &LambertProblem) -> LambertBatch {
        let mut state = IterationState::new(problem);
        let mut active = state.count(CellStatus::Iterating);
        let mut sweeps = 0;

        while active > 0 && sweeps < self.settings.max_iterations {
            sweeps += 1;
            self.engine.evaluate(&state.z, &mut state.scratch);
            for cell in 0..state.len() {
                if state.status[cell] == CellStatus::Iterating {
                    state.advance(cell, sweeps, self.settings.tolerance, self.mu, self.sqrt_mu);
                }
            }
            active = state.count(CellStatus::Iterating);
            trace!(iteration = sweeps, active, "lambert sweep");
        }

        let batch = LambertBatch::new(state.finish(), sweeps);
        let counts = batch.counts();
        debug!(
            cells = batch.len(),
            converged = counts.converged,
            diverged = counts.diverged,
            rejected = counts.rejected,
            iterations = sweeps,
            "lambert batch solved"
        );
        batch
    }

    /// Solve one transfer, returning `(v1, v2)` in km/s.
    pub fn solve_one(
        &self,
        r1: Vector3,
        r2: Vector3,
        time_of_flight_s: f64,
        direction: TransferDirection,
    ) -> Result<(Vector3, Vector3), LambertSolverError> {
        let batch = self.solve(&LambertProblem::single(r1, r2, time_of_flight_s, direction));
        let solution = batch.solutions()[0];
        match solution.outcome {
            Outcome::Converged { .. } => Ok((
                solution.departure_velocity_km_s,
                solution.arrival_velocity_km_s,
            )),
            Outcome::Failed(FailureReason::DegenerateGeometry) => {
                Err(LambertSolverError::Degenerate)
            }
            Outcome::Failed(FailureReason::MaxIterationsExceeded) => {
                Err(LambertSolverError::MaxIterations {
                    iterations: self.settings.max_iterations,
                })
            }
        }
    }
}

/// One-off solve with default settings.
pub fn solve_single(
    r1_km: Vector3,
    r2_km: Vector3,
    time_of_flight_s: f64,
    mu_km3_s2: f64,
    direction: TransferDirection,
) -> Result<(Vector3, Vector3), LambertSolverError> {
    LambertSolver::new(mu_km3_s2, SolverSettings::default())?.solve_one(
        r1_km,
        r2_km,
        time_of_flight_s,
        direction,
    )
}

/// Loop invariants of one cell.
#[derive(Debug, Clone, Copy)]
struct CellGeometry {
    r1: Vector3,
    r2: Vector3,
    r1_mag: f64,
    r2_mag: f64,
    radius_sum: f64,
    transfer_angle: f64,
    /// A = sin Δν · √(r1 r2 / (1 − cos Δν)).
    a: f64,
    flight_time: f64,
}

impl CellGeometry {
    fn new(r1: Vector3, r2: Vector3, flight_time: f64, direction: TransferDirection) -> Option<Self> {
        if !(flight_time.is_finite() && flight_time > 0.0) {
            return None;
        }
        let r1_mag = vector::norm(&r1);
        let r2_mag = vector::norm(&r2);
        if !(r1_mag.is_finite() && r2_mag.is_finite() && r1_mag > 0.0 && r2_mag > 0.0) {
            return None;
        }
        let radius_sum = r1_mag + r2_mag;
        let chord = vector::norm(&vector::sub(&r2, &r1));
        if chord <= f64::EPSILON * radius_sum {
            return None;
        }

        let cross = vector::cross(&r1, &r2);
        let radius_product = r1_mag * r2_mag;
        let cos_dnu = (vector::dot(&r1, &r2) / radius_product).clamp(-1.0, 1.0);
        let short_way = match direction {
            TransferDirection::Prograde => cross[2] >= 0.0,
            TransferDirection::Retrograde => cross[2] < 0.0,
        };
        let sin_magnitude = vector::norm(&cross) / radius_product;
        let sin_dnu = if short_way { sin_magnitude } else { -sin_magnitude };
        if sin_dnu.abs() < MIN_SIN_TRANSFER_ANGLE || 1.0 - cos_dnu <= 0.0 {
            return None;
        }

        Some(Self {
            r1,
            r2,
            r1_mag,
            r2_mag,
            radius_sum,
            transfer_angle: sin_dnu.atan2(cos_dnu).rem_euclid(TAU),
            a: sin_dnu * (radius_product / (1.0 - cos_dnu)).sqrt(),
            flight_time,
        })
    }

    /// Initial `(lower, upper)` bracket on z.
    ///
    /// With A > 0 the flight time reaches zero where y vanishes, which has a
    /// closed form. With A < 0 the lower end is unbounded.
    fn bracket(&self) -> (f64, f64) {
        if self.a > 0.0 {
            let c = self.radius_sum / (SQRT_2 * self.a);
            let lower = if c < 1.0 {
                (2.0 * c.acos()).powi(2)
            } else {
                -(2.0 * c.acosh()).powi(2)
            };
            (lower, Z_UPPER)
        } else {
            (f64::NEG_INFINITY, Z_UPPER)
        }
    }
}

/// Scratch owned by one `solve` call, indexed by cell.
struct IterationState {
    geometry: Vec<Option<CellGeometry>>,
    z: Vec<f64>,
    z_prev: Vec<f64>,
    residual_prev: Vec<f64>,
    lower: Vec<f64>,
    upper: Vec<f64>,
    scratch: RatioScratch,
    flight_time: Vec<f64>,
    status: Vec<CellStatus>,
    iterations: Vec<u32>,
    departure_velocity: Vec<Vector3>,
    arrival_velocity: Vec<Vector3>,
}

impl IterationState {
    fn new(problem: &LambertProblem) -> Self {
        let n = problem.len();
        let mut state = Self {
            geometry: Vec::with_capacity(n),
            z: vec![f64::NAN; n],
            z_prev: vec![f64::NAN; n],
            residual_prev: vec![f64::NAN; n],
            lower: vec![f64::NEG_INFINITY; n],
            upper: vec![Z_UPPER; n],
            scratch: RatioScratch::with_len(n),
            flight_time: vec![f64::NAN; n],
            status: vec![CellStatus::Initializing; n],
            iterations: vec![0; n],
            departure_velocity: vec![[f64::NAN; 3]; n],
            arrival_velocity: vec![[f64::NAN; 3]; n],
        };

        let cells = problem
            .departure_positions()
            .iter()
            .zip(problem.arrival_positions())
            .zip(problem.flight_times_s())
            .zip(problem.directions());
        for (cell, (((r1, r2), &dt), &direction)) in cells.enumerate() {
            let geometry = CellGeometry::new(*r1, *r2, dt, direction);
            match geometry {
                Some(geom) => {
                    let (lower, upper) = geom.bracket();
                    state.lower[cell] = lower;
                    state.upper[cell] = upper;
                    state.z[cell] = if lower < 0.0 {
                        0.0
                    } else {
                        0.5 * (lower + upper)
                    };
                    state.status[cell] = CellStatus::Iterating;
                }
                None => state.status[cell] = CellStatus::Rejected,
            }
            state.geometry.push(geometry);
        }
        state
    }

    fn len(&self) -> usize {
        self.status.len()
    }

    fn count(&self, status: CellStatus) -> usize {
        self.status.iter().filter(|s| **s == status).count()
    }

    /// One secant/bisection step for an iterating cell. Reads the ratio
    /// terms the engine just wrote for this cell.
    fn advance(&mut self, cell: usize, iteration: u32, tolerance: f64, mu: f64, sqrt_mu: f64) {
        let Some(geom) = self.geometry[cell] else {
            self.status[cell] = CellStatus::Rejected;
            return;
        };
        let z = self.z[cell];
        let y = geom.radius_sum + geom.a * self.scratch.term[cell];
        let flight_time = if y > 0.0 {
            y.sqrt() * (self.scratch.ratio[cell] * y + geom.a) / sqrt_mu
        } else {
            0.0
        };
        self.flight_time[cell] = flight_time;
        self.iterations[cell] = iteration;

        let mut residual = flight_time - geom.flight_time;
        if !residual.is_finite() {
            residual = f64::INFINITY;
        }
        if y > 0.0 && residual.abs() <= tolerance * geom.flight_time {
            self.converge(cell, &geom, y, mu);
            return;
        }

        if residual < 0.0 {
            self.lower[cell] = z;
        } else {
            self.upper[cell] = z;
        }
        let (lower, upper) = (self.lower[cell], self.upper[cell]);
        if y > 0.0 && upper - lower <= 4.0 * f64::EPSILON * z.abs().max(1.0) {
            self.converge(cell, &geom, y, mu);
            return;
        }

        let secant =
            z - residual * (z - self.z_prev[cell]) / (residual - self.residual_prev[cell]);
        let floor = if lower.is_finite() {
            lower
        } else {
            2.0 * upper.min(0.0) - 1.0
        };
        let next = if secant > floor && secant < upper {
            secant
        } else if lower.is_finite() {
            0.5 * (lower + upper)
        } else {
            floor
        };

        self.z_prev[cell] = z;
        self.residual_prev[cell] = residual;
        self.z[cell] = next;
    }

    /// Freeze the cell and recover its velocities from the Lagrange coefficients.
    fn converge(&mut self, cell: usize, geom: &CellGeometry, y: f64, mu: f64) {
        let f = 1.0 - y / geom.r1_mag;
        let g = geom.a * (y / mu).sqrt();
        let g_dot = 1.0 - y / geom.r2_mag;
        self.departure_velocity[cell] =
            vector::scale(&vector::sub(&geom.r2, &vector::scale(&geom.r1, f)), 1.0 / g);
        self.arrival_velocity[cell] =
            vector::scale(&vector::sub(&vector::scale(&geom.r2, g_dot), &geom.r1), 1.0 / g);
        self.status[cell] = CellStatus::Converged;
    }

    fn finish(mut self) -> Vec<LambertSolution> {
        for status in &mut self.status {
            if !status.is_terminal() {
                *status = CellStatus::Diverged;
            }
        }
        (0..self.len())
            .map(|cell| {
                let angle = self.geometry[cell].map_or(f64::NAN, |g| g.transfer_angle);
                match self.status[cell] {
                    CellStatus::Converged => LambertSolution {
                        departure_velocity_km_s: self.departure_velocity[cell],
                        arrival_velocity_km_s: self.arrival_velocity[cell],
                        z: self.z[cell],
                        transfer_angle_rad: angle,
                        outcome: Outcome::Converged {
                            iterations: self.iterations[cell],
                        },
                    },
                    CellStatus::Rejected => LambertSolution::failed(
                        f64::NAN,
                        f64::NAN,
                        FailureReason::DegenerateGeometry,
                    ),
                    _ => LambertSolution::failed(
                        self.z_prev[cell],
                        angle,
                        FailureReason::MaxIterationsExceeded,
                    ),
                }
            })
            .collect()
    }
}
