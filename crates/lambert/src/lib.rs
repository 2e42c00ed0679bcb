//! Vectorised universal-variable Lambert solver.
//!
//! A [`LambertProblem`] holds an aligned batch of cells (departure position,
//! arrival position, flight time, direction). [`LambertSolver::solve`] runs
//! one safeguarded secant iteration over the whole batch, evaluating the
//! Stumpff ratio terms for every cell at once through [`TermRatioEngine`].
//! Cells that cannot be solved come back as tagged failures and never abort
//! the batch.

pub mod problem;
pub mod solution;
pub mod solver;
pub mod term_ratio;

pub use problem::{LambertProblem, ProblemError, TransferDirection};
pub use solution::{
    BatchCounts, CellStatus, FailureReason, LambertBatch, LambertSolution, Outcome,
};
pub use solver::{
    DEFAULT_MAX_ITERATIONS, DEFAULT_TOLERANCE, LambertSolver, LambertSolverError, SettingsError,
    SolverSettings, solve_single,
};
pub use term_ratio::{DEFAULT_SMALL_Z_THRESHOLD, RatioScratch, Regime, TermRatioEngine, term_ratio};
