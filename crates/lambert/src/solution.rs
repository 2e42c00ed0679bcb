use astrochop_core::vector::Vector3;
use thiserror::Error;

/// Why a cell produced no transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum FailureReason {
    /// Non-positive flight time, zero radius, or collinear position vectors.
    #[error("degenerate transfer geometry")]
    DegenerateGeometry,
    #[error("iteration cap reached before convergence")]
    MaxIterationsExceeded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Converged { iterations: u32 },
    Failed(FailureReason),
}

/// Lifecycle of one cell inside a solver call.
///
/// `Initializing` → `Iterating` → `Converged` | `Diverged`, or
/// `Initializing` → `Rejected` when the geometry is unusable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellStatus {
    Initializing,
    Iterating,
    Converged,
    Diverged,
    Rejected,
}

impl CellStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Converged | Self::Diverged | Self::Rejected)
    }
}

/// Result for one cell. Failed cells carry NaN velocities.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LambertSolution {
    pub departure_velocity_km_s: Vector3,
    pub arrival_velocity_km_s: Vector3,
    /// Universal variable at the last evaluated iterate.
    pub z: f64,
    /// Transfer angle Δν in `[0, 2π)`; NaN when the geometry was rejected.
    pub transfer_angle_rad: f64,
    pub outcome: Outcome,
}

impl LambertSolution {
    pub(crate) fn failed(z: f64, transfer_angle_rad: f64, reason: FailureReason) -> Self {
        Self {
            departure_velocity_km_s: [f64::NAN; 3],
            arrival_velocity_km_s: [f64::NAN; 3],
            z,
            transfer_angle_rad,
            outcome: Outcome::Failed(reason),
        }
    }

    pub fn is_converged(&self) -> bool {
        matches!(self.outcome, Outcome::Converged { .. })
    }

    pub fn failure(&self) -> Option<FailureReason> {
        match self.outcome {
            Outcome::Failed(reason) => Some(reason),
            Outcome::Converged { .. } => None,
        }
    }

    /// `(v1, v2)` for converged cells.
    pub fn velocities(&self) -> Option<(Vector3, Vector3)> {
        self.is_converged()
            .then_some((self.departure_velocity_km_s, self.arrival_velocity_km_s))
    }
}

/// Per-outcome tallies over a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BatchCounts {
    pub converged: usize,
    pub diverged: usize,
    pub rejected: usize,
}

/// Solver output, aligned with the input problem.
#[derive(Debug, Clone, PartialEq)]
pub struct LambertBatch {
    solutions: Vec<LambertSolution>,
    iterations_used: u32,
}

impl LambertBatch {
    pub(crate) fn new(solutions: Vec<LambertSolution>, iterations_used: u32) -> Self {
        Self {
            solutions,
            iterations_used,
        }
    }

    pub fn len(&self) -> usize {
        self.solutions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.solutions.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&LambertSolution> {
        self.solutions.get(index)
    }

    pub fn solutions(&self) -> &[LambertSolution] {
        &self.solutions
    }

    pub fn iter(&self) -> std::slice::Iter<'_, LambertSolution> {
        self.solutions.iter()
    }

    pub fn into_solutions(self) -> Vec<LambertSolution> {
        self.solutions
    }

    /// Sweeps the batch loop ran before every cell settled or the cap hit.
    pub fn iterations_used(&self) -> u32 {
        self.iterations_used
    }

    pub fn counts(&self) -> BatchCounts {
        self.solutions
            .iter()
            .fold(BatchCounts::default(), |mut counts, solution| {
                match solution.outcome {
                    Outcome::Converged { .. } => counts.converged += 1,
                    Outcome::Failed(FailureReason::MaxIterationsExceeded) => counts.diverged += 1,
                    Outcome::Failed(FailureReason::DegenerateGeometry) => counts.rejected += 1,
                }
                counts
            })
    }
}

impl<'a> IntoIterator for &'a LambertBatch {
    type Item = &'a LambertSolution;
    type IntoIter = std::slice::Iter<'a, LambertSolution>;

    fn into_iter(self) -> Self::IntoIter {
        self.solutions.iter()
    }
}
