//! Aircraft performance models and envelope checks.
//!
//! The optimizer treats performance as a collaborator: every method on
//! [`PerformanceModel`] is a pure function of the [`FlightCondition`].

pub mod emission;
mod parametric;

use std::fmt;
use std::sync::Arc;

use flight_config::AircraftConfig;
use flight_core::constants::G0;
use flight_core::units::{fpm_to_ms, ft_to_m, kt_to_ms};
use thiserror::Error;

pub use parametric::ParametricPerformance;

/// Instantaneous condition at which performance quantities are evaluated.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlightCondition {
    pub mass_kg: f64,
    pub tas_m_s: f64,
    pub altitude_m: f64,
    pub vertical_rate_m_s: f64,
    pub isa_deviation_k: f64,
}

impl FlightCondition {
    /// Flight-path angle (rad) implied by TAS and vertical rate.
    pub fn flight_path_angle(&self) -> f64 {
        let tas = self.tas_m_s.max(1.0);
        (self.vertical_rate_m_s / tas).clamp(-0.999, 0.999).asin()
    }
}

/// Performance collaborator contract.
pub trait PerformanceModel: fmt::Debug + Send + Sync {
    fn envelope(&self) -> &Envelope;

    /// Aerodynamic drag (N).
    fn drag(&self, condition: &FlightCondition) -> f64;

    /// Maximum available thrust (N).
    fn max_thrust(&self, condition: &FlightCondition) -> f64;

    /// Idle thrust (N).
    fn idle_thrust(&self, condition: &FlightCondition) -> f64;

    /// Fuel flow (kg/s) for the thrust needed to hold `condition`.
    fn fuel_flow(&self, condition: &FlightCondition) -> f64;

    /// NOx emission index (kg NOx per kg fuel).
    fn nox_emission_index(&self) -> f64 {
        0.014
    }

    /// Thrust (N) balancing drag and the climb component of weight.
    fn required_thrust(&self, condition: &FlightCondition) -> f64 {
        let gamma = condition.flight_path_angle();
        self.drag(condition) + condition.mass_kg * G0 * gamma.sin()
    }
}

/// Certified limits, all in SI units.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    pub mmo: f64,
    pub vmo_m_s: f64,
    pub min_cas_m_s: f64,
    pub ceiling_m: f64,
    pub max_climb_m_s: f64,
    pub max_descent_m_s: f64,
    pub oew_kg: f64,
    pub mtow_kg: f64,
}

/// Reason a condition sits outside the envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvelopeFlag {
    MachAboveMmo,
    CasAboveVmo,
    CasBelowMinimum,
    AboveCeiling,
    MassBelowOew,
    ThrustLimited,
}

impl EnvelopeFlag {
    pub fn as_str(self) -> &'static str {
        match self {
            EnvelopeFlag::MachAboveMmo => "mach_above_mmo",
            EnvelopeFlag::CasAboveVmo => "cas_above_vmo",
            EnvelopeFlag::CasBelowMinimum => "cas_below_min",
            EnvelopeFlag::AboveCeiling => "above_ceiling",
            EnvelopeFlag::MassBelowOew => "mass_below_oew",
            EnvelopeFlag::ThrustLimited => "thrust_limited",
        }
    }
}

impl fmt::Display for EnvelopeFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Airspeeds and thrust figures of a node, used for envelope checks.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnvelopeSample {
    pub mach: f64,
    pub cas_m_s: f64,
    pub altitude_m: f64,
    pub mass_kg: f64,
    pub thrust_required_n: f64,
    pub thrust_max_n: f64,
}

const MACH_TOLERANCE: f64 = 1e-3;
const CAS_TOLERANCE_M_S: f64 = 0.5;
const ALTITUDE_TOLERANCE_M: f64 = 1.0;
const MASS_TOLERANCE_KG: f64 = 1.0;
const THRUST_TOLERANCE: f64 = 0.005;

impl Envelope {
    /// Every limit the sample exceeds beyond small numerical tolerances.
    pub fn violations(&self, sample: &EnvelopeSample) -> Vec<EnvelopeFlag> {
        let mut flags = Vec::new();
        if sample.mach > self.mmo + MACH_TOLERANCE {
            flags.push(EnvelopeFlag::MachAboveMmo);
        }
        if sample.cas_m_s > self.vmo_m_s + CAS_TOLERANCE_M_S {
            flags.push(EnvelopeFlag::CasAboveVmo);
        }
        if sample.cas_m_s < self.min_cas_m_s - CAS_TOLERANCE_M_S {
            flags.push(EnvelopeFlag::CasBelowMinimum);
        }
        if sample.altitude_m > self.ceiling_m + ALTITUDE_TOLERANCE_M {
            flags.push(EnvelopeFlag::AboveCeiling);
        }
        if sample.mass_kg < self.oew_kg - MASS_TOLERANCE_KG {
            flags.push(EnvelopeFlag::MassBelowOew);
        }
        if sample.thrust_required_n > sample.thrust_max_n * (1.0 + THRUST_TOLERANCE) {
            flags.push(EnvelopeFlag::ThrustLimited);
        }
        flags
    }
}

/// Preferred cruise band and speed.
#[derive(Debug, Clone, PartialEq)]
pub struct CruiseBand {
    pub min_altitude_m: f64,
    pub max_altitude_m: f64,
    pub mach: f64,
    pub max_vertical_rate_m_s: f64,
}

/// Runtime aircraft: identification, masses, and its performance model.
#[derive(Debug, Clone)]
pub struct Aircraft {
    pub name: String,
    pub type_code: String,
    pub max_fuel_kg: f64,
    pub cruise: CruiseBand,
    pub performance: Arc<dyn PerformanceModel>,
}

impl Aircraft {
    pub fn envelope(&self) -> &Envelope {
        self.performance.envelope()
    }

    pub fn mtow_kg(&self) -> f64 {
        self.envelope().mtow_kg
    }

    pub fn oew_kg(&self) -> f64 {
        self.envelope().oew_kg
    }
}

/// Errors surfaced when selecting or converting aircraft.
#[derive(Debug, Error)]
pub enum AircraftError {
    #[error("aircraft '{0}' not found in catalog")]
    NotFound(String),
    #[error("aircraft catalog is empty")]
    EmptyCatalog,
}

/// Convert an `AircraftConfig` into a runtime [`Aircraft`] backed by [`ParametricPerformance`].
pub fn from_config(config: &AircraftConfig) -> Aircraft {
    let envelope = Envelope {
        mmo: config.envelope.mmo,
        vmo_m_s: kt_to_ms(config.envelope.vmo_kt),
        min_cas_m_s: kt_to_ms(config.envelope.min_cas_kt),
        ceiling_m: ft_to_m(config.envelope.ceiling_ft),
        max_climb_m_s: fpm_to_ms(config.envelope.max_climb_fpm),
        max_descent_m_s: fpm_to_ms(config.envelope.max_descent_fpm),
        oew_kg: config.oew_kg,
        mtow_kg: config.mtow_kg,
    };
    let cruise = CruiseBand {
        min_altitude_m: ft_to_m(config.cruise.min_altitude_ft),
        max_altitude_m: ft_to_m(config.cruise.max_altitude_ft).min(envelope.ceiling_m),
        mach: config.cruise.mach,
        max_vertical_rate_m_s: fpm_to_ms(config.cruise.max_vertical_rate_fpm),
    };
    Aircraft {
        name: config.name.clone(),
        type_code: config.type_code.clone(),
        max_fuel_kg: config.max_fuel_kg,
        cruise,
        performance: Arc::new(ParametricPerformance::new(config, envelope)),
    }
}

/// Select an aircraft by type code or name (case-insensitive); defaults to the first entry.
pub fn select(configs: &[AircraftConfig], requested: Option<&str>) -> Result<Aircraft, AircraftError> {
    if configs.is_empty() {
        return Err(AircraftError::EmptyCatalog);
    }
    let chosen = match requested {
        Some(name) => {
            let upper = name.to_uppercase();
            configs
                .iter()
                .find(|cfg| cfg.type_code.to_uppercase() == upper || cfg.name.to_uppercase() == upper)
                .ok_or_else(|| AircraftError::NotFound(name.to_string()))?
        }
        None => &configs[0],
    };
    Ok(from_config(chosen))
}
