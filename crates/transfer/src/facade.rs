//! Re-exported APIs for consumers of the transfer crate.

pub use crate::grid::{GridCell, GridSummary, OptimumResult, PorkchopGrid};
pub use crate::porkchop::{
    GridLimits, PorkchopError, PorkchopGridEngine, PorkchopOutcome, PorkchopRequest,
    PorkchopSettings,
};
pub use crate::window::{TimeWindow, WindowError};
