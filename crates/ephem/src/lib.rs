//! Heliocentric ephemeris built on analytic mean orbital elements.
//!
//! Positions and velocities are returned in kilometres and km/s, in the
//! ecliptic frame and equinox of J2000.

use astrochop_config::BodyConfig;
use astrochop_core::constants::{AU_KM, J2000_JD, MU_SUN};
use astrochop_core::vector::Vector3;
use astrochop_orbits::{OrbitError, eccentric_anomaly};
use thiserror::Error;

/// Heliocentric position and velocity at one epoch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StateVector {
    pub position_km: Vector3,
    pub velocity_km_s: Vector3,
}

/// Errors surfaced while evaluating an ephemeris.
#[derive(Debug, Error, PartialEq)]
pub enum EphemerisError {
    #[error("unknown body `{0}`")]
    UnknownBody(String),
    #[error("invalid elements for `{body}`: {reason}")]
    InvalidElements { body: String, reason: String },
    #[error("Kepler's equation failed for `{body}` at JD {epoch_jd}: {source}")]
    KeplerNonConvergence {
        body: String,
        epoch_jd: f64,
        #[source]
        source: OrbitError,
    },
}

/// Source of heliocentric body states.
///
/// The porkchop engine only needs this one query, so test doubles and
/// tabulated ephemerides can stand in for the analytic model.
pub trait Ephemeris {
    fn state(&self, body: &str, epoch_jd: f64) -> Result<StateVector, EphemerisError>;
}

/// Mean Keplerian elements at J2000, angles in degrees.
#[derive(Debug, Clone, PartialEq)]
pub struct MeanElements {
    pub name: String,
    pub semi_major_axis_au: f64,
    pub eccentricity: f64,
    pub inclination_deg: f64,
    pub ascending_node_deg: f64,
    /// Longitude of perihelion, ϖ = Ω + ω.
    pub perihelion_longitude_deg: f64,
    /// Mean longitude at J2000, L₀ = ϖ + M₀.
    pub mean_longitude_deg: f64,
    pub mean_motion_deg_per_day: f64,
}

impl MeanElements {
    fn validate(&self) -> Result<(), EphemerisError> {
        let invalid = |reason: &str| EphemerisError::InvalidElements {
            body: self.name.clone(),
            reason: reason.to_string(),
        };
        if !(self.semi_major_axis_au.is_finite() && self.semi_major_axis_au > 0.0) {
            return Err(invalid("semi-major axis must be positive"));
        }
        if !(0.0..1.0).contains(&self.eccentricity) {
            return Err(invalid("eccentricity must be in [0, 1)"));
        }
        let angles = [
            self.inclination_deg,
            self.ascending_node_deg,
            self.perihelion_longitude_deg,
            self.mean_longitude_deg,
            self.mean_motion_deg_per_day,
        ];
        if angles.iter().any(|value| !value.is_finite()) {
            return Err(invalid("angles and mean motion must be finite"));
        }
        Ok(())
    }

    /// Heliocentric state at `epoch_jd`.
    pub fn state_at(&self, epoch_jd: f64) -> Result<StateVector, EphemerisError> {
        self.validate()?;
        let days = epoch_jd - J2000_JD;
        let a = self.semi_major_axis_au * AU_KM;
        let e = self.eccentricity;
        let node = self.ascending_node_deg.to_radians();
        let arg_peri = (self.perihelion_longitude_deg - self.ascending_node_deg).to_radians();
        let incl = self.inclination_deg.to_radians();
        let mean_anomaly = (self.mean_longitude_deg + self.mean_motion_deg_per_day * days
            - self.perihelion_longitude_deg)
            .to_radians();

        let ecc_anomaly = eccentric_anomaly(mean_anomaly, e).map_err(|source| {
            EphemerisError::KeplerNonConvergence {
                body: self.name.clone(),
                epoch_jd,
                source,
            }
        })?;
        let (sin_e, cos_e) = ecc_anomaly.sin_cos();
        let root = (1.0 - e * e).sqrt();
        let radius = a * (1.0 - e * cos_e);
        let speed_factor = (MU_SUN * a).sqrt() / radius;

        let position = [a * (cos_e - e), a * root * sin_e, 0.0];
        let velocity = [-speed_factor * sin_e, speed_factor * root * cos_e, 0.0];
        let rotation = perifocal_to_ecliptic(node, incl, arg_peri);
        Ok(StateVector {
            position_km: rotate(&rotation, &position),
            velocity_km_s: rotate(&rotation, &velocity),
        })
    }
}

impl From<&BodyConfig> for MeanElements {
    fn from(config: &BodyConfig) -> Self {
        Self {
            name: config.name.clone(),
            semi_major_axis_au: config.a_au,
            eccentricity: config.e,
            inclination_deg: config.i_deg,
            ascending_node_deg: config.node_deg,
            perihelion_longitude_deg: config.peri_long_deg,
            mean_longitude_deg: config.mean_long_deg,
            mean_motion_deg_per_day: config.mean_motion_deg_per_day,
        }
    }
}

/// Catalog of bodies evaluated from their mean elements.
#[derive(Debug, Clone)]
pub struct MeanElementEphemeris {
    bodies: Vec<MeanElements>,
}

impl MeanElementEphemeris {
    pub fn new(bodies: Vec<MeanElements>) -> Self {
        Self { bodies }
    }

    /// Venus, Earth, Mars and Jupiter.
    pub fn builtin() -> Self {
        Self::new(builtin_elements())
    }

    /// Build a catalog from loaded body configurations.
    pub fn from_configs(configs: &[BodyConfig]) -> Self {
        Self::new(configs.iter().map(MeanElements::from).collect())
    }

    pub fn bodies(&self) -> &[MeanElements] {
        &self.bodies
    }

    /// Look up a body by case-insensitive name.
    pub fn elements(&self, body: &str) -> Option<&MeanElements> {
        self.bodies
            .iter()
            .find(|elements| elements.name.eq_ignore_ascii_case(body.trim()))
    }
}

impl Default for MeanElementEphemeris {
    fn default() -> Self {
        Self::builtin()
    }
}

impl Ephemeris for MeanElementEphemeris {
    fn state(&self, body: &str, epoch_jd: f64) -> Result<StateVector, EphemerisError> {
        self.elements(body)
            .ok_or_else(|| EphemerisError::UnknownBody(body.to_string()))?
            .state_at(epoch_jd)
    }
}

fn builtin_elements() -> Vec<MeanElements> {
    let body = |name: &str, a: f64, e: f64, i: f64, node: f64, peri: f64, mean_long: f64, n: f64| {
        MeanElements {
            name: name.to_string(),
            semi_major_axis_au: a,
            eccentricity: e,
            inclination_deg: i,
            ascending_node_deg: node,
            perihelion_longitude_deg: peri,
            mean_longitude_deg: mean_long,
            mean_motion_deg_per_day: n,
        }
    };
    vec![
        body(
            "venus",
            0.72333566,
            0.00677672,
            3.39467605,
            76.67984255,
            131.60246718,
            181.9790995,
            1.60213034,
        ),
        body(
            "earth",
            1.00000011,
            0.01671022,
            0.00005,
            -11.26064,
            102.94719,
            100.46435,
            0.985609,
        ),
        body(
            "mars",
            1.52366231,
            0.09341233,
            1.85061,
            49.57854,
            336.04084,
            355.45284,
            0.524039,
        ),
        body(
            "jupiter",
            5.20288700,
            0.04838624,
            1.30439695,
            100.47390909,
            14.72847983,
            34.39644051,
            0.0830853,
        ),
    ]
}

type Matrix3 = [[f64; 3]; 3];

/// R3(Ω) · R1(i) · R3(ω).
fn perifocal_to_ecliptic(node: f64, incl: f64, arg_peri: f64) -> Matrix3 {
    let (so, co) = node.sin_cos();
    let (si, ci) = incl.sin_cos();
    let (sw, cw) = arg_peri.sin_cos();
    [
        [co * cw - so * ci * sw, -co * sw - so * ci * cw, so * si],
        [so * cw + co * ci * sw, -so * sw + co * ci * cw, -co * si],
        [si * sw, si * cw, ci],
    ]
}

fn rotate(m: &Matrix3, v: &Vector3) -> Vector3 {
    [
        m[0][0] * v[0] + m[0][1] * v[1] + m[0][2] * v[2],
        m[1][0] * v[0] + m[1][1] * v[1] + m[1][2] * v[2],
        m[2][0] * v[0] + m[2][1] * v[1] + m[2][2] * v[2],
    ]
}
