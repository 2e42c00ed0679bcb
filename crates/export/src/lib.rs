//! Export helpers for CSV, JSON and VTK artifacts.
//!
//! Every file goes through [`OutputGuard`], which confines writes to one
//! output directory and replaces targets atomically.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

pub mod guard;
pub mod mesh;
pub mod porkchop;
pub mod summary;
pub mod vtp;

pub use guard::OutputGuard;
pub use mesh::{DataGrid, MeshBounds, Morph, PorkchopMesh, RayHit, UnknownMorph};
pub use porkchop::{GridRecord, read_grid_records, write_grid_csv};
pub use summary::{RunSummary, write_summary};
pub use vtp::{write_vtp, write_vtp_to};

/// Errors raised while writing artifacts.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("failed to encode JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("failed to move artifact into place: {0}")]
    Persist(#[from] tempfile::PersistError),
    #[error("`{}` resolves outside the output directory `{}`", path.display(), allowed.display())]
    OutsideOutputDir { path: PathBuf, allowed: PathBuf },
    #[error("refusing to write through symlink `{}`", .0.display())]
    SymlinkTarget(PathBuf),
    #[error("`{}` must have the `.{expected}` extension", path.display())]
    InvalidExtension { path: PathBuf, expected: String },
    #[error("`{}` contains a parent-directory component", .0.display())]
    ParentTraversal(PathBuf),
    #[error("grid of {rows}×{cols} does not match {len} values")]
    ShapeMismatch { rows: usize, cols: usize, len: usize },
}
