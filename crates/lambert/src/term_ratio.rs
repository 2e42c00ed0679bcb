//! Stumpff-equivalent ratio terms of the universal variable z.
//!
//! The solver needs two combinations of the Stumpff functions C(z) and S(z):
//!
//! * `term  = (z·S − 1) / √C`
//! * `ratio = S / C^{3/2}`
//!
//! Forming C and S directly loses precision near z = 0 and overflows for
//! large negative z. Away from zero the engine uses the half-angle forms,
//! with `s = √|z|` and `a = s/2`:
//!
//! * z > 0: `term = −√2·cos a`, `ratio = (s − 2 sin a cos a) / (2√2 sin³ a)`
//! * z < 0: `term = −√2·cosh a`, `ratio = (2 sinh a cosh a − s) / (2√2 sinh³ a)`
//!
//! Inside `|z| < threshold` a Horner polynomial valid for either sign takes over.

use std::f64::consts::SQRT_2;

/// Default `|z|` below which the series is used.
pub const DEFAULT_SMALL_Z_THRESHOLD: f64 = 0.1;

/// `term(z)` coefficients in ascending powers of z.
const TERM_SERIES: [f64; 7] = [
    -SQRT_2,
    SQRT_2 / 8.0,
    -SQRT_2 / 384.0,
    SQRT_2 / 46_080.0,
    -SQRT_2 / 10_321_920.0,
    SQRT_2 / 3_715_891_200.0,
    -SQRT_2 / 1_961_990_553_600.0,
];

/// `ratio(z)` coefficients in ascending powers of z.
const RATIO_SERIES: [f64; 8] = [
    SQRT_2 / 3.0,
    SQRT_2 / 40.0,
    17.0 * SQRT_2 / 13_440.0,
    29.0 * SQRT_2 / 537_600.0,
    1_181.0 * SQRT_2 / 567_705_600.0,
    1_393_481.0 * SQRT_2 / 18_598_035_456_000.0,
    763_967.0 * SQRT_2 / 297_568_567_296_000.0,
    133_541.0 * SQRT_2 / 1_576_726_953_984_000.0,
];

/// Which formula a cell's z falls under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Regime {
    /// `|z| < threshold`: polynomial in z.
    Series,
    /// `z ≥ threshold`: trigonometric half-angle form.
    Elliptic,
    /// `z ≤ −threshold`: hyperbolic half-angle form.
    Hyperbolic,
}

impl Regime {
    pub fn classify(z: f64, threshold: f64) -> Self {
        if z.abs() < threshold {
            Self::Series
        } else if z > 0.0 {
            Self::Elliptic
        } else {
            Self::Hyperbolic
        }
    }
}

/// Caller-owned output buffers for [`TermRatioEngine::evaluate`].
#[derive(Debug, Clone, Default)]
pub struct RatioScratch {
    pub term: Vec<f64>,
    pub ratio: Vec<f64>,
    /// `true` where the series path was selected.
    pub small: Vec<bool>,
}

impl RatioScratch {
    pub fn with_len(len: usize) -> Self {
        Self {
            term: vec![0.0; len],
            ratio: vec![0.0; len],
            small: vec![false; len],
        }
    }

    pub fn len(&self) -> usize {
        self.term.len()
    }

    pub fn is_empty(&self) -> bool {
        self.term.is_empty()
    }
}

/// Batch evaluator of `term` and `ratio` over an array of z values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TermRatioEngine {
    threshold: f64,
}

impl Default for TermRatioEngine {
    fn default() -> Self {
        Self::new(DEFAULT_SMALL_Z_THRESHOLD)
    }
}

impl TermRatioEngine {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Fill `scratch` for every element of `z`.
    ///
    /// One pass writes the small-|z| mask, a second evaluates both the
    /// series and the half-angle form for each cell and stores the one the
    /// mask selects. Every output element is written exactly once.
    ///
    /// # Panics
    ///
    /// Panics if the scratch buffers are shorter than `z`.
    pub fn evaluate(&self, z: &[f64], scratch: &mut RatioScratch) {
        let n = z.len();
        let small = &mut scratch.small[..n];
        for (flag, &zi) in small.iter_mut().zip(z) {
            *flag = zi.abs() < self.threshold;
        }

        let term = &mut scratch.term[..n];
        let ratio = &mut scratch.ratio[..n];
        for i in 0..n {
            let (series_term, series_ratio) = series(z[i]);
            let (closed_term, closed_ratio) = half_angle(z[i]);
            let use_series = scratch.small[i];
            term[i] = if use_series { series_term } else { closed_term };
            ratio[i] = if use_series { series_ratio } else { closed_ratio };
        }
    }
}

/// `(term, ratio)` for a single z.
pub fn term_ratio(z: f64, threshold: f64) -> (f64, f64) {
    match Regime::classify(z, threshold) {
        Regime::Series => series(z),
        Regime::Elliptic | Regime::Hyperbolic => half_angle(z),
    }
}

#[inline]
fn horner(coefficients: &[f64], z: f64) -> f64 {
    coefficients.iter().rev().fold(0.0, |acc, &c| acc * z + c)
}

#[inline]
fn series(z: f64) -> (f64, f64) {
    (horner(&TERM_SERIES, z), horner(&RATIO_SERIES, z))
}

#[inline]
fn half_angle(z: f64) -> (f64, f64) {
    let s = z.abs().sqrt();
    let a = 0.5 * s;
    let (sin_a, cos_a, sign) = if z >= 0.0 {
        let (sin_a, cos_a) = a.sin_cos();
        (sin_a, cos_a, 1.0)
    } else {
        (a.sinh(), a.cosh(), -1.0)
    };
    let term = -SQRT_2 * cos_a;
    let ratio = sign * (s - 2.0 * sin_a * cos_a) / (2.0 * SQRT_2 * sin_a * sin_a * sin_a);
    (term, ratio)
}
