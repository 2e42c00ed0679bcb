//! Configuration models and loaders for astrochop.

use std::fs::File;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

pub use astrochop_lambert::{DEFAULT_MAX_ITERATIONS, DEFAULT_SMALL_Z_THRESHOLD, DEFAULT_TOLERANCE};

/// Default upper bound on departure × arrival cells in one grid.
pub const DEFAULT_MAX_CELLS: usize = 1_000_000;

/// Mean orbital elements of a body, referred to the ecliptic and equinox of J2000.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct BodyConfig {
    pub name: String,
    pub a_au: f64,
    pub e: f64,
    pub i_deg: f64,
    /// Longitude of the ascending node.
    pub node_deg: f64,
    /// Longitude of perihelion (node + argument of perihelion).
    pub peri_long_deg: f64,
    /// Mean longitude at J2000.
    pub mean_long_deg: f64,
    pub mean_motion_deg_per_day: f64,
}

/// Solver knobs; every field falls back to its default when omitted.
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct SolverConfig {
    pub tolerance: f64,
    pub max_iterations: u32,
    pub small_z_threshold: f64,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            tolerance: DEFAULT_TOLERANCE,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            small_z_threshold: DEFAULT_SMALL_Z_THRESHOLD,
        }
    }
}

/// Process-wide resource limits.
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct LimitsConfig {
    pub max_cells: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_cells: DEFAULT_MAX_CELLS,
        }
    }
}

/// Top-level run configuration (`configs/astrochop.toml`).
#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct RunConfig {
    pub solver: SolverConfig,
    pub limits: LimitsConfig,
}

impl RunConfig {
    /// Reject values the solver cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let solver = &self.solver;
        if !(solver.tolerance.is_finite() && solver.tolerance > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "solver.tolerance must be positive, got {}",
                solver.tolerance
            )));
        }
        if solver.max_iterations == 0 {
            return Err(ConfigError::Invalid(
                "solver.max_iterations must be at least 1".to_string(),
            ));
        }
        if !(solver.small_z_threshold.is_finite() && solver.small_z_threshold > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "solver.small_z_threshold must be positive, got {}",
                solver.small_z_threshold
            )));
        }
        if self.limits.max_cells == 0 {
            return Err(ConfigError::Invalid(
                "limits.max_cells must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Errors that can occur while loading configuration files.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse YAML: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("failed to parse TOML: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Load body element sets from a TOML file, a YAML list, or a directory of TOML files.
pub fn load_bodies<P: AsRef<Path>>(path: P) -> Result<Vec<BodyConfig>, ConfigError> {
    let bodies: Vec<BodyConfig> = load_records(path)?;
    for body in &bodies {
        validate_body(body)?;
    }
    Ok(bodies)
}

/// Load and validate a run configuration from TOML or YAML.
pub fn load_run_config<P: AsRef<Path>>(path: P) -> Result<RunConfig, ConfigError> {
    let path = path.as_ref();
    let config: RunConfig = if is_toml(path) {
        toml::from_str(&std::fs::read_to_string(path)?)?
    } else {
        serde_yaml::from_reader(File::open(path)?)?
    };
    config.validate()?;
    Ok(config)
}

fn validate_body(body: &BodyConfig) -> Result<(), ConfigError> {
    if !(body.a_au.is_finite() && body.a_au > 0.0) {
        return Err(ConfigError::Invalid(format!(
            "body `{}`: semi-major axis must be positive",
            body.name
        )));
    }
    if !(0.0..1.0).contains(&body.e) {
        return Err(ConfigError::Invalid(format!(
            "body `{}`: eccentricity must be in [0, 1), got {}",
            body.name, body.e
        )));
    }
    Ok(())
}

fn load_records<T, P>(path: P) -> Result<Vec<T>, ConfigError>
where
    T: for<'de> Deserialize<'de>,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    if path.is_dir() {
        read_dir_records(path)
    } else if is_toml(path) {
        let contents = std::fs::read_to_string(path)?;
        let record: T = toml::from_str(&contents)?;
        Ok(vec![record])
    } else {
        let reader = File::open(path)?;
        Ok(serde_yaml::from_reader(reader)?)
    }
}

fn read_dir_records<T>(dir: &Path) -> Result<Vec<T>, ConfigError>
where
    T: for<'de> Deserialize<'de>,
{
    let mut records = Vec::new();
    let mut entries: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| is_toml(path))
        .collect();
    entries.sort();
    for path in entries {
        let contents = std::fs::read_to_string(&path)?;
        let record: T = toml::from_str(&contents)?;
        records.push(record);
    }
    Ok(records)
}

fn is_toml(path: &Path) -> bool {
    path.extension().map(|ext| ext == "toml").unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const MARS_TOML: &str = r#"
name = "mars"
a_au = 1.52366231
e = 0.09341233
i_deg = 1.85061
node_deg = 49.57854
peri_long_deg = 336.04084
mean_long_deg = 355.45284
mean_motion_deg_per_day = 0.524039
"#;

    #[test]
    fn run_config_defaults_fill_missing_fields() {
        let config: RunConfig = toml::from_str("[solver]\nmax_iterations = 40\n").unwrap();
        assert_eq!(config.solver.max_iterations, 40);
        assert_eq!(config.solver.tolerance, DEFAULT_TOLERANCE);
        assert_eq!(config.limits.max_cells, DEFAULT_MAX_CELLS);
        config.validate().unwrap();
    }

    #[test]
    fn solver_defaults_match_lambert_settings() {
        let solver = SolverConfig::default();
        let settings = astrochop_lambert::SolverSettings::default();
        assert_eq!(solver.tolerance, settings.tolerance);
        assert_eq!(solver.max_iterations, settings.max_iterations);
        assert_eq!(solver.small_z_threshold, settings.small_z_threshold);
    }

    #[test]
    fn run_config_rejects_zero_cap() {
        let config: RunConfig = toml::from_str("[solver]\nmax_iterations = 0\n").unwrap();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn bodies_load_from_toml_directory_and_yaml() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("mars.toml"), MARS_TOML).unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();
        let bodies = load_bodies(dir.path()).unwrap();
        assert_eq!(bodies.len(), 1);
        assert_eq!(bodies[0].name, "mars");

        let yaml_path = dir.path().join("bodies.yaml");
        let mut file = File::create(&yaml_path).unwrap();
        writeln!(
            file,
            "- {{name: venus, a_au: 0.72333566, e: 0.00677672, i_deg: 3.39467605, node_deg: 76.67984255, peri_long_deg: 131.60246718, mean_long_deg: 181.9790995, mean_motion_deg_per_day: 1.60213034}}"
        )
        .unwrap();
        let bodies = load_bodies(&yaml_path).unwrap();
        assert_eq!(bodies[0].name, "venus");
    }

    #[test]
    fn hyperbolic_body_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("comet.toml");
        std::fs::write(&path, MARS_TOML.replace("e = 0.09341233", "e = 1.2")).unwrap();
        assert!(matches!(load_bodies(&path), Err(ConfigError::Invalid(_))));
    }
}
