//! Porkchop grid generation over departure and arrival epoch windows.

pub mod grid;
pub mod porkchop;
pub mod window;

pub use facade::*;

mod facade;
