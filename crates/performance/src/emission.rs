//! Fuel-proportional emission indices.
//!
//! Species other than NOx scale linearly with fuel burn; the NOx index comes
//! from the engine model.

/// kg CO2 per kg fuel.
pub const CO2_PER_KG_FUEL: f64 = 3.16;
/// kg H2O per kg fuel.
pub const H2O_PER_KG_FUEL: f64 = 1.23;
/// kg soot per kg fuel.
pub const SOOT_PER_KG_FUEL: f64 = 3.0e-5;
/// kg SO2 per kg fuel.
pub const SULFUR_PER_KG_FUEL: f64 = 1.2e-3;

/// Emission mass rates (kg/s).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct EmissionRates {
    pub co2: f64,
    pub h2o: f64,
    pub nox: f64,
    pub soot: f64,
    pub sulfur: f64,
}

/// Emission rates for a fuel flow (kg/s) and NOx index (kg/kg).
pub fn rates(fuel_flow_kg_s: f64, nox_index: f64) -> EmissionRates {
    EmissionRates {
        co2: CO2_PER_KG_FUEL * fuel_flow_kg_s,
        h2o: H2O_PER_KG_FUEL * fuel_flow_kg_s,
        nox: nox_index * fuel_flow_kg_s,
        soot: SOOT_PER_KG_FUEL * fuel_flow_kg_s,
        sulfur: SULFUR_PER_KG_FUEL * fuel_flow_kg_s,
    }
}
