//! International Standard Atmosphere and airspeed conversions.
//!
//! All functions take geopotential altitude in metres and an optional
//! temperature deviation from ISA in kelvin. Pressure is kept on the ISA
//! profile; the deviation only shifts temperature (and therefore density and
//! the speed of sound).

use crate::constants::{
    G0, GAMMA_AIR, LAPSE_RATE_K_M, P0_PA, R_AIR, RHO0_KG_M3, T0_K, TROPOPAUSE_M,
};

const T_TROPOPAUSE_K: f64 = T0_K + LAPSE_RATE_K_M * TROPOPAUSE_M;

/// Air temperature (K).
pub fn temperature(altitude_m: f64, isa_deviation_k: f64) -> f64 {
    let h = altitude_m.min(TROPOPAUSE_M);
    T0_K + LAPSE_RATE_K_M * h + isa_deviation_k
}

/// Static pressure (Pa).
pub fn pressure(altitude_m: f64) -> f64 {
    let exponent = -G0 / (LAPSE_RATE_K_M * R_AIR);
    if altitude_m <= TROPOPAUSE_M {
        let t = T0_K + LAPSE_RATE_K_M * altitude_m;
        P0_PA * (t / T0_K).powf(exponent)
    } else {
        let p11 = P0_PA * (T_TROPOPAUSE_K / T0_K).powf(exponent);
        p11 * (-G0 * (altitude_m - TROPOPAUSE_M) / (R_AIR * T_TROPOPAUSE_K)).exp()
    }
}

/// Air density (kg/m³).
pub fn density(altitude_m: f64, isa_deviation_k: f64) -> f64 {
    pressure(altitude_m) / (R_AIR * temperature(altitude_m, isa_deviation_k))
}

/// Density ratio relative to ISA sea level.
pub fn density_ratio(altitude_m: f64, isa_deviation_k: f64) -> f64 {
    density(altitude_m, isa_deviation_k) / RHO0_KG_M3
}

/// Speed of sound (m/s).
pub fn speed_of_sound(altitude_m: f64, isa_deviation_k: f64) -> f64 {
    (GAMMA_AIR * R_AIR * temperature(altitude_m, isa_deviation_k)).sqrt()
}

/// True airspeed (m/s) from Mach number.
pub fn mach_to_tas(mach: f64, altitude_m: f64, isa_deviation_k: f64) -> f64 {
    mach * speed_of_sound(altitude_m, isa_deviation_k)
}

/// Mach number from true airspeed (m/s).
pub fn tas_to_mach(tas_m_s: f64, altitude_m: f64, isa_deviation_k: f64) -> f64 {
    tas_m_s / speed_of_sound(altitude_m, isa_deviation_k)
}

/// Calibrated airspeed (m/s) from true airspeed using the compressible pitot relation.
pub fn tas_to_cas(tas_m_s: f64, altitude_m: f64, isa_deviation_k: f64) -> f64 {
    let mu = (GAMMA_AIR - 1.0) / GAMMA_AIR;
    let p = pressure(altitude_m);
    let rho = density(altitude_m, isa_deviation_k);
    let impact = p * ((1.0 + mu / 2.0 * rho / p * tas_m_s * tas_m_s).powf(1.0 / mu) - 1.0);
    let ratio = (1.0 + impact / P0_PA).powf(mu) - 1.0;
    (2.0 / mu * P0_PA / RHO0_KG_M3 * ratio).max(0.0).sqrt()
}

/// True airspeed (m/s) from calibrated airspeed.
pub fn cas_to_tas(cas_m_s: f64, altitude_m: f64, isa_deviation_k: f64) -> f64 {
    let mu = (GAMMA_AIR - 1.0) / GAMMA_AIR;
    let p = pressure(altitude_m);
    let rho = density(altitude_m, isa_deviation_k);
    let impact =
        P0_PA * ((1.0 + mu / 2.0 * RHO0_KG_M3 / P0_PA * cas_m_s * cas_m_s).powf(1.0 / mu) - 1.0);
    let ratio = (1.0 + impact / p).powf(mu) - 1.0;
    (2.0 / mu * p / rho * ratio).max(0.0).sqrt()
}
