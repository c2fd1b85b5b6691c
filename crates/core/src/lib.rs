//! Core units, constants, and shared primitives for the flight optimizer workspace.

pub mod atmosphere;
pub mod geo;

/// Physical constants expressed in SI units (unless stated otherwise).
pub mod constants {
    /// Standard gravity at Earth's surface (m/s²).
    pub const G0: f64 = 9.80665;
    /// Mean Earth radius used for great-circle and projection math (m).
    pub const EARTH_RADIUS_M: f64 = 6_371_000.0;
    /// Specific gas constant of dry air (J/(kg·K)).
    pub const R_AIR: f64 = 287.052_87;
    /// Ratio of specific heats for air.
    pub const GAMMA_AIR: f64 = 1.4;
    /// ISA sea-level temperature (K).
    pub const T0_K: f64 = 288.15;
    /// ISA sea-level pressure (Pa).
    pub const P0_PA: f64 = 101_325.0;
    /// ISA sea-level density (kg/m³).
    pub const RHO0_KG_M3: f64 = 1.225;
    /// ISA troposphere temperature lapse rate (K/m).
    pub const LAPSE_RATE_K_M: f64 = -0.0065;
    /// Geopotential altitude of the tropopause (m).
    pub const TROPOPAUSE_M: f64 = 11_000.0;
    /// Seconds per hour.
    pub const SECONDS_PER_HOUR: f64 = 3_600.0;
}

/// Basic unit conversion helpers.
pub mod units {
    const FT_M: f64 = 0.3048;
    const KT_MS: f64 = 0.514_444;
    const NM_M: f64 = 1_852.0;

    /// Convert feet to metres.
    #[inline]
    pub fn ft_to_m(v: f64) -> f64 {
        v * FT_M
    }

    /// Convert metres to feet.
    #[inline]
    pub fn m_to_ft(v: f64) -> f64 {
        v / FT_M
    }

    /// Convert knots to metres per second.
    #[inline]
    pub fn kt_to_ms(v: f64) -> f64 {
        v * KT_MS
    }

    /// Convert metres per second to knots.
    #[inline]
    pub fn ms_to_kt(v: f64) -> f64 {
        v / KT_MS
    }

    /// Convert feet per minute to metres per second.
    #[inline]
    pub fn fpm_to_ms(v: f64) -> f64 {
        v * FT_M / 60.0
    }

    /// Convert metres per second to feet per minute.
    #[inline]
    pub fn ms_to_fpm(v: f64) -> f64 {
        v * 60.0 / FT_M
    }

    /// Convert nautical miles to metres.
    #[inline]
    pub fn nm_to_m(v: f64) -> f64 {
        v * NM_M
    }

    /// Convert metres to kilometres.
    #[inline]
    pub fn m_to_km(v: f64) -> f64 {
        v / 1_000.0
    }
}

/// Small numeric helpers shared by the model crates.
pub mod math {
    /// Differentiable approximation of `max(a, b)`; `eps` controls the blend width.
    #[inline]
    pub fn smooth_max(a: f64, b: f64, eps: f64) -> f64 {
        0.5 * (a + b + ((a - b) * (a - b) + eps * eps).sqrt())
    }

    /// Linear interpolation between `a` and `b`.
    #[inline]
    pub fn lerp(a: f64, b: f64, t: f64) -> f64 {
        a + (b - a) * t
    }
}
