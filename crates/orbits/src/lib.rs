//! Two-body orbit helpers: Kepler's equation and universal-variable propagation.
use astrochop_core::vector::{self, Vector3};
use thiserror::Error;

const KEPLER_MAX_ITERATIONS: usize = 50;
const STUMPFF_SERIES_BAND: f64 = 1e-6;
const MAX_SPLIT_DEPTH: usize = 10;
const BRACKET_EXPANSIONS: usize = 200;
const UNIVERSAL_MAX_ITERATIONS: usize = 200;

/// Failures of the iterative two-body routines.
#[derive(Debug, Error, PartialEq)]
pub enum OrbitError {
    #[error("{routine} did not converge after {iterations} iterations")]
    NonConvergence {
        routine: &'static str,
        iterations: usize,
    },
    #[error("invalid state: {0}")]
    InvalidState(&'static str),
}

/// Solve Kepler's equation `M = E - e sin E` for the eccentric anomaly (radians).
pub fn eccentric_anomaly(mean_anomaly: f64, e: f64) -> Result<f64, OrbitError> {
    if !(0.0..1.0).contains(&e) || !mean_anomaly.is_finite() {
        return Err(OrbitError::InvalidState(
            "Kepler's equation needs 0 <= e < 1 and a finite mean anomaly",
        ));
    }
    let m = mean_anomaly.rem_euclid(std::f64::consts::TAU);
    let mut ecc = if e < 0.8 { m } else { std::f64::consts::PI };
    for _ in 0..KEPLER_MAX_ITERATIONS {
        let delta = (ecc - e * ecc.sin() - m) / (1.0 - e * ecc.cos());
        ecc -= delta;
        if delta.abs() < 1e-14 {
            return Ok(ecc);
        }
    }
    Err(OrbitError::NonConvergence {
        routine: "Kepler's equation",
        iterations: KEPLER_MAX_ITERATIONS,
    })
}

/// Propagate `(r0, v0)` by `dt` seconds under two-body gravity with parameter `mu`.
///
/// Newton iteration on the universal anomaly χ, followed by the Lagrange
/// coefficients. Works for elliptic, parabolic and hyperbolic states and
/// for negative `dt`. When the iteration fails the interval is split in
/// half and each half is propagated in turn.
pub fn propagate(
    r0: &Vector3,
    v0: &Vector3,
    dt: f64,
    mu: f64,
) -> Result<(Vector3, Vector3), OrbitError> {
    propagate_split(r0, v0, dt, mu, 0)
}

fn propagate_split(
    r0: &Vector3,
    v0: &Vector3,
    dt: f64,
    mu: f64,
    depth: usize,
) -> Result<(Vector3, Vector3), OrbitError> {
    if depth >= MAX_SPLIT_DEPTH {
        return Err(OrbitError::NonConvergence {
            routine: "universal Kepler propagation",
            iterations: KEPLER_MAX_ITERATIONS,
        });
    }
    let r0_mag = vector::norm(r0);
    if !(r0_mag > 0.0 && mu > 0.0 && dt.is_finite()) {
        return Err(OrbitError::InvalidState(
            "propagation needs a non-zero position, positive mu and finite dt",
        ));
    }
    if dt == 0.0 {
        return Ok((*r0, *v0));
    }

    let sqrt_mu = mu.sqrt();
    let rdotv = vector::dot(r0, v0);
    let alpha = 2.0 / r0_mag - vector::dot(v0, v0) / mu;
    let dt = if alpha > 1e-12 {
        let period = std::f64::consts::TAU / (sqrt_mu * alpha.powf(1.5));
        dt % period
    } else {
        dt
    };

    let Some(chi) = universal_anomaly(r0_mag, rdotv, alpha, dt, mu) else {
        let (r_mid, v_mid) = propagate_split(r0, v0, 0.5 * dt, mu, depth + 1)?;
        return propagate_split(&r_mid, &v_mid, 0.5 * dt, mu, depth + 1);
    };

    let chi2 = chi * chi;
    let psi = alpha * chi2;
    let (c2, c3) = stumpff_c2c3(psi);
    let r_mag = chi2 * c2 + rdotv / sqrt_mu * chi * (1.0 - psi * c3) + r0_mag * (1.0 - psi * c2);

    let f = 1.0 - chi2 / r0_mag * c2;
    let g = dt - chi2 * chi / sqrt_mu * c3;
    let g_dot = 1.0 - chi2 / r_mag * c2;
    let f_dot = sqrt_mu / (r_mag * r0_mag) * chi * (psi * c3 - 1.0);

    let r = vector::add(&vector::scale(r0, f), &vector::scale(v0, g));
    let v = vector::add(&vector::scale(r0, f_dot), &vector::scale(v0, g_dot));
    Ok((r, v))
}

/// Safeguarded Newton iteration on the universal Kepler equation.
///
/// The residual is increasing in χ, so the root is first bracketed between
/// zero and a doubled guess, and any Newton step leaving the bracket is
/// replaced by bisection. `None` if it does not settle.
fn universal_anomaly(r0_mag: f64, rdotv: f64, alpha: f64, dt: f64, mu: f64) -> Option<f64> {
    let sqrt_mu = mu.sqrt();
    // (residual, dresidual/dχ = r)
    let evaluate = |chi: f64| {
        let chi2 = chi * chi;
        let psi = alpha * chi2;
        let (c2, c3) = stumpff_c2c3(psi);
        let r = chi2 * c2 + rdotv / sqrt_mu * chi * (1.0 - psi * c3) + r0_mag * (1.0 - psi * c2);
        let residual = r0_mag * chi * (1.0 - psi * c3)
            + rdotv / sqrt_mu * chi2 * c2
            + chi2 * chi * c3
            - sqrt_mu * dt;
        (residual, r)
    };

    let guess = initial_chi(r0_mag, rdotv, alpha, dt, mu);
    let mut far = if guess.is_finite() && guess * dt > 0.0 {
        guess
    } else {
        sqrt_mu * dt / r0_mag
    };
    let mut near = 0.0;
    let mut bracketed = false;
    for _ in 0..BRACKET_EXPANSIONS {
        // NaN only shows up once cosh overflows, far past the root.
        if !(evaluate(far).0 * dt.signum() < 0.0) {
            bracketed = true;
            break;
        }
        near = far;
        far *= 2.0;
    }
    if !bracketed {
        return None;
    }

    let (mut lo, mut hi) = (near.min(far), near.max(far));
    let mut chi = far;
    for _ in 0..UNIVERSAL_MAX_ITERATIONS {
        let (residual, r) = evaluate(chi);
        if residual.is_nan() || residual > 0.0 {
            hi = chi;
        } else {
            lo = chi;
        }
        let newton = chi - residual / r;
        let next = if newton.is_finite() && newton > lo && newton < hi {
            newton
        } else {
            0.5 * (lo + hi)
        };
        if (next - chi).abs() <= 1e-10 * next.abs().max(1.0) {
            return Some(next);
        }
        chi = next;
    }
    None
}

/// Specific orbital energy `v²/2 - mu/r`.
pub fn specific_energy(r: &Vector3, v: &Vector3, mu: f64) -> f64 {
    0.5 * vector::dot(v, v) - mu / vector::norm(r)
}

fn initial_chi(r0_mag: f64, rdotv: f64, alpha: f64, dt: f64, mu: f64) -> f64 {
    let sqrt_mu = mu.sqrt();
    if alpha > 1e-12 {
        sqrt_mu * dt * alpha
    } else if alpha < -1e-12 {
        let a = 1.0 / alpha;
        let sign = dt.signum();
        let guess = sign
            * (-a).sqrt()
            * ((-2.0 * mu * alpha * dt * dt)
                / (rdotv + sign * (-mu * a).sqrt() * (1.0 - r0_mag * alpha)))
                .ln();
        if guess.is_finite() {
            guess
        } else {
            sqrt_mu * dt / r0_mag
        }
    } else {
        sqrt_mu * dt / r0_mag
    }
}

/// Stumpff functions c2(ψ) and c3(ψ), with a series near ψ = 0.
fn stumpff_c2c3(psi: f64) -> (f64, f64) {
    if psi > STUMPFF_SERIES_BAND {
        let sqrt_psi = psi.sqrt();
        (
            (1.0 - sqrt_psi.cos()) / psi,
            (sqrt_psi - sqrt_psi.sin()) / (psi * sqrt_psi),
        )
    } else if psi < -STUMPFF_SERIES_BAND {
        let sqrt_neg = (-psi).sqrt();
        (
            (1.0 - sqrt_neg.cosh()) / psi,
            (sqrt_neg.sinh() - sqrt_neg) / (-psi * sqrt_neg),
        )
    } else {
        (
            0.5 - psi / 24.0 + psi * psi / 720.0,
            1.0 / 6.0 - psi / 120.0 + psi * psi / 5040.0,
        )
    }
}
