use flight_config::AircraftConfig;
use flight_core::atmosphere;
use flight_core::constants::G0;
use flight_core::math::smooth_max;

use crate::{Envelope, FlightCondition, PerformanceModel};

/// Blend width (N) of the smooth idle floor on required thrust.
const IDLE_BLEND_N: f64 = 1_000.0;
/// Lowest TAS (m/s) used in dynamic-pressure terms.
const MIN_TAS_M_S: f64 = 1.0;

/// Drag-polar airframe with a density/Mach-lapsed turbofan.
///
/// * `CD = cd0 + k·CL²`, with lift balancing the weight component normal to the path.
/// * `T_max = T0·σ^n·(1 − a·M)`, idle is a fixed fraction of `T_max`.
/// * `TSFC = c0·(1 + c1·M)`, fuel flow uses `max(T_req, T_idle)` smoothed.
#[derive(Debug, Clone)]
pub struct ParametricPerformance {
    wing_area_m2: f64,
    cd0: f64,
    k: f64,
    max_static_thrust_n: f64,
    density_lapse_exponent: f64,
    mach_lapse: f64,
    idle_fraction: f64,
    tsfc_kg_per_n_s: f64,
    tsfc_mach_slope: f64,
    ei_nox: f64,
    envelope: Envelope,
}

impl ParametricPerformance {
    pub fn new(config: &AircraftConfig, envelope: Envelope) -> Self {
        Self {
            wing_area_m2: config.wing_area_m2,
            cd0: config.drag.cd0,
            k: config.drag.k,
            max_static_thrust_n: config.engine.max_static_thrust_n,
            density_lapse_exponent: config.engine.density_lapse_exponent,
            mach_lapse: config.engine.mach_lapse,
            idle_fraction: config.engine.idle_fraction,
            tsfc_kg_per_n_s: config.engine.tsfc_kg_per_n_s,
            tsfc_mach_slope: config.engine.tsfc_mach_slope,
            ei_nox: config.engine.ei_nox_g_per_kg / 1_000.0,
            envelope,
        }
    }

    fn mach(&self, condition: &FlightCondition) -> f64 {
        atmosphere::tas_to_mach(condition.tas_m_s, condition.altitude_m, condition.isa_deviation_k)
    }

    /// Thrust specific fuel consumption (kg/(N·s)) at the condition's Mach number.
    pub fn tsfc(&self, condition: &FlightCondition) -> f64 {
        self.tsfc_kg_per_n_s * (1.0 + self.tsfc_mach_slope * self.mach(condition))
    }

    /// Lift coefficient needed to hold the flight path.
    pub fn lift_coefficient(&self, condition: &FlightCondition) -> f64 {
        let rho = atmosphere::density(condition.altitude_m, condition.isa_deviation_k);
        let tas = condition.tas_m_s.max(MIN_TAS_M_S);
        let dynamic_pressure = 0.5 * rho * tas * tas;
        let lift = condition.mass_kg * G0 * condition.flight_path_angle().cos();
        lift / (dynamic_pressure * self.wing_area_m2)
    }
}

impl PerformanceModel for ParametricPerformance {
    fn envelope(&self) -> &Envelope {
        &self.envelope
    }

    fn drag(&self, condition: &FlightCondition) -> f64 {
        let rho = atmosphere::density(condition.altitude_m, condition.isa_deviation_k);
        let tas = condition.tas_m_s.max(MIN_TAS_M_S);
        let dynamic_pressure = 0.5 * rho * tas * tas;
        let cl = self.lift_coefficient(condition);
        dynamic_pressure * self.wing_area_m2 * (self.cd0 + self.k * cl * cl)
    }

    fn max_thrust(&self, condition: &FlightCondition) -> f64 {
        let sigma = atmosphere::density_ratio(condition.altitude_m, condition.isa_deviation_k);
        let mach_factor = (1.0 - self.mach_lapse * self.mach(condition)).max(0.05);
        self.max_static_thrust_n * sigma.powf(self.density_lapse_exponent) * mach_factor
    }

    fn idle_thrust(&self, condition: &FlightCondition) -> f64 {
        self.idle_fraction * self.max_thrust(condition)
    }

    fn fuel_flow(&self, condition: &FlightCondition) -> f64 {
        let thrust = smooth_max(
            self.required_thrust(condition),
            self.idle_thrust(condition),
            IDLE_BLEND_N,
        );
        self.tsfc(condition) * thrust
    }

    fn nox_emission_index(&self) -> f64 {
        self.ei_nox
    }
}
