use astrochop_core::vector::Vector3;
use thiserror::Error;

/// Sense of motion about the reference pole (+Z).
///
/// Together with the sign of `(r1 × r2)·ẑ` this picks the short-way or
/// long-way transfer angle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransferDirection {
    #[default]
    Prograde,
    Retrograde,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProblemError {
    #[error(
        "per-cell arrays differ in length: {departures} departures, {arrivals} arrivals, \
         {flight_times} flight times, {directions} directions"
    )]
    LengthMismatch {
        departures: usize,
        arrivals: usize,
        flight_times: usize,
        directions: usize,
    },
}

/// Aligned batch of Lambert boundary-value problems, one per cell.
#[derive(Debug, Clone, PartialEq)]
pub struct LambertProblem {
    departure_positions: Vec<Vector3>,
    arrival_positions: Vec<Vector3>,
    flight_times_s: Vec<f64>,
    directions: Vec<TransferDirection>,
}

impl LambertProblem {
    pub fn new(
        departure_positions: Vec<Vector3>,
        arrival_positions: Vec<Vector3>,
        flight_times_s: Vec<f64>,
        directions: Vec<TransferDirection>,
    ) -> Result<Self, ProblemError> {
        let n = departure_positions.len();
        if arrival_positions.len() != n || flight_times_s.len() != n || directions.len() != n {
            return Err(ProblemError::LengthMismatch {
                departures: n,
                arrivals: arrival_positions.len(),
                flight_times: flight_times_s.len(),
                directions: directions.len(),
            });
        }
        Ok(Self {
            departure_positions,
            arrival_positions,
            flight_times_s,
            directions,
        })
    }

    /// Batch where every cell shares one transfer direction.
    pub fn uniform(
        departure_positions: Vec<Vector3>,
        arrival_positions: Vec<Vector3>,
        flight_times_s: Vec<f64>,
        direction: TransferDirection,
    ) -> Result<Self, ProblemError> {
        let directions = vec![direction; departure_positions.len()];
        Self::new(
            departure_positions,
            arrival_positions,
            flight_times_s,
            directions,
        )
    }

    pub fn single(
        r1: Vector3,
        r2: Vector3,
        flight_time_s: f64,
        direction: TransferDirection,
    ) -> Self {
        Self {
            departure_positions: vec![r1],
            arrival_positions: vec![r2],
            flight_times_s: vec![flight_time_s],
            directions: vec![direction],
        }
    }

    pub fn len(&self) -> usize {
        self.flight_times_s.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flight_times_s.is_empty()
    }

    pub fn departure_positions(&self) -> &[Vector3] {
        &self.departure_positions
    }

    pub fn arrival_positions(&self) -> &[Vector3] {
        &self.arrival_positions
    }

    pub fn flight_times_s(&self) -> &[f64] {
        &self.flight_times_s
    }

    pub fn directions(&self) -> &[TransferDirection] {
        &self.directions
    }
}
