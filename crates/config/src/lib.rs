//! Configuration models and loaders for the flight optimizer.

use std::fs::File;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

/// Aircraft performance parameters parsed from catalog files.
///
/// Speeds are given in the units pilots quote (knots, feet per minute) and
/// converted by the performance crate.
#[derive(Debug, Deserialize, Clone)]
pub struct AircraftConfig {
    pub name: String,
    pub type_code: String,
    pub mtow_kg: f64,
    pub oew_kg: f64,
    pub max_fuel_kg: f64,
    pub wing_area_m2: f64,
    pub drag: DragPolarConfig,
    pub engine: EngineConfig,
    pub envelope: EnvelopeConfig,
    #[serde(default)]
    pub cruise: CruiseConfig,
}

/// Parabolic drag polar `CD = cd0 + k·CL²`.
#[derive(Debug, Deserialize, Clone)]
pub struct DragPolarConfig {
    pub cd0: f64,
    pub k: f64,
}

/// Engine model coefficients (all engines combined).
#[derive(Debug, Deserialize, Clone)]
pub struct EngineConfig {
    pub max_static_thrust_n: f64,
    #[serde(default = "default_thrust_lapse")]
    pub density_lapse_exponent: f64,
    #[serde(default = "default_mach_lapse")]
    pub mach_lapse: f64,
    #[serde(default = "default_idle_fraction")]
    pub idle_fraction: f64,
    /// Thrust specific fuel consumption at Mach 0 (kg/(N·s)).
    pub tsfc_kg_per_n_s: f64,
    #[serde(default = "default_tsfc_mach")]
    pub tsfc_mach_slope: f64,
    /// NOx emission index (g per kg of fuel).
    #[serde(default = "default_ei_nox")]
    pub ei_nox_g_per_kg: f64,
}

/// Certified flight envelope.
#[derive(Debug, Deserialize, Clone)]
pub struct EnvelopeConfig {
    pub mmo: f64,
    pub vmo_kt: f64,
    pub min_cas_kt: f64,
    pub ceiling_ft: f64,
    pub max_climb_fpm: f64,
    pub max_descent_fpm: f64,
}

/// Preferred cruise band used as the default altitude floor/ceiling for cruise segments.
#[derive(Debug, Deserialize, Clone)]
pub struct CruiseConfig {
    pub min_altitude_ft: f64,
    pub max_altitude_ft: f64,
    pub mach: f64,
    pub max_vertical_rate_fpm: f64,
}

impl Default for CruiseConfig {
    fn default() -> Self {
        Self {
            min_altitude_ft: 25_000.0,
            max_altitude_ft: 39_000.0,
            mach: 0.78,
            max_vertical_rate_fpm: 500.0,
        }
    }
}

fn default_thrust_lapse() -> f64 {
    0.7
}

fn default_mach_lapse() -> f64 {
    0.3
}

fn default_idle_fraction() -> f64 {
    0.07
}

fn default_tsfc_mach() -> f64 {
    0.3
}

fn default_ei_nox() -> f64 {
    14.0
}

/// Airport reference data used to resolve origin/destination identifiers.
#[derive(Debug, Deserialize, Clone)]
pub struct AirportConfig {
    pub icao: String,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub elevation_ft: f64,
}

/// Solver and discretization defaults.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct OptimizerConfig {
    pub climb_nodes: usize,
    pub cruise_nodes: usize,
    pub descent_nodes: usize,
    pub max_iterations: usize,
    pub max_outer_iterations: usize,
    pub tolerance: f64,
    pub max_wall_time_s: Option<f64>,
    pub return_failed: bool,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            climb_nodes: 10,
            cruise_nodes: 14,
            descent_nodes: 10,
            max_iterations: 4_000,
            max_outer_iterations: 25,
            tolerance: 1e-3,
            max_wall_time_s: None,
            return_failed: false,
        }
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
    #[error("invalid aircraft `{name}`: {reason}")]
    InvalidAircraft { name: String, reason: String },
}

/// Load aircraft configurations from a YAML file, a TOML file, or a directory of TOML files.
pub fn load_aircraft<P: AsRef<Path>>(path: P) -> Result<Vec<AircraftConfig>, ConfigError> {
    let aircraft: Vec<AircraftConfig> = load_records(path)?;
    for entry in &aircraft {
        validate_aircraft(entry)?;
    }
    Ok(aircraft)
}

/// Load airport records from a YAML file, a TOML file, or a directory of TOML files.
pub fn load_airports<P: AsRef<Path>>(path: P) -> Result<Vec<AirportConfig>, ConfigError> {
    load_records(path)
}

/// Load optimizer defaults from a single TOML or YAML document.
pub fn load_optimizer<P: AsRef<Path>>(path: P) -> Result<OptimizerConfig, ConfigError> {
    let path = path.as_ref();
    let contents = std::fs::read_to_string(path)?;
    if is_toml(path) {
        Ok(toml::from_str(&contents)?)
    } else {
        Ok(serde_yaml::from_str(&contents)?)
    }
}

fn validate_aircraft(config: &AircraftConfig) -> Result<(), ConfigError> {
    let invalid = |reason: &str| ConfigError::InvalidAircraft {
        name: config.name.clone(),
        reason: reason.to_string(),
    };
    if config.oew_kg <= 0.0 || config.mtow_kg <= config.oew_kg {
        return Err(invalid("mtow_kg must exceed a positive oew_kg"));
    }
    if config.wing_area_m2 <= 0.0 {
        return Err(invalid("wing_area_m2 must be positive"));
    }
    if config.engine.max_static_thrust_n <= 0.0 || config.engine.tsfc_kg_per_n_s <= 0.0 {
        return Err(invalid("engine thrust and tsfc must be positive"));
    }
    if config.envelope.mmo <= 0.0 || config.envelope.vmo_kt <= config.envelope.min_cas_kt {
        return Err(invalid("envelope speeds are inconsistent"));
    }
    if config.cruise.min_altitude_ft > config.cruise.max_altitude_ft {
        return Err(invalid("cruise band is inverted"));
    }
    Ok(())
}

fn is_toml(path: &Path) -> bool {
    path.extension().map(|ext| ext == "toml").unwrap_or(false)
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
