//! Porkchop-plot generation for heliocentric transfers.
//!
//! The workspace crates are re-exported under short names so front-ends can
//! depend on this crate alone. PNG rendering lives here because it is the
//! only part that pulls in `plotters`.

pub use astrochop_config as config;
pub use astrochop_core as core;
pub use astrochop_ephem as ephemeris;
pub use astrochop_export as export;
pub use astrochop_lambert as lambert;
pub use astrochop_orbits as orbits;
pub use astrochop_transfer as transfer;

pub mod plot;

/// Returns the version of the library.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
