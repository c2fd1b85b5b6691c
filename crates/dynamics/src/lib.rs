//! Point-mass equations of motion over a local projection.
//!
//! Positions live in metres east/north of the projection reference; the
//! wind field is still sampled in geographic coordinates.

use std::sync::Arc;

use flight_core::atmosphere;
use flight_core::geo::{GeoPoint, LocalProjection};
use flight_field::{FieldPoint, WindField};
use flight_performance::{Envelope, EnvelopeFlag, EnvelopeSample, FlightCondition, PerformanceModel};
use thiserror::Error;

/// State at a collocation node.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct State {
    pub x_m: f64,
    pub y_m: f64,
    pub altitude_m: f64,
    pub mass_kg: f64,
    pub time_s: f64,
}

/// Control held over an interval.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Control {
    pub mach: f64,
    pub vertical_rate_m_s: f64,
    /// Clockwise from north.
    pub heading_rad: f64,
}

/// Time derivative of [`State`].
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct StateRate {
    pub x_m_s: f64,
    pub y_m_s: f64,
    pub altitude_m_s: f64,
    pub mass_kg_s: f64,
    pub time: f64,
}

impl StateRate {
    pub fn as_array(&self) -> [f64; 5] {
        [
            self.x_m_s,
            self.y_m_s,
            self.altitude_m_s,
            self.mass_kg_s,
            self.time,
        ]
    }
}

/// Everything computed while evaluating the dynamics at one node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NodeEvaluation {
    pub rate: StateRate,
    pub position: GeoPoint,
    pub tas_m_s: f64,
    pub cas_m_s: f64,
    pub ground_speed_m_s: f64,
    pub fuel_flow_kg_s: f64,
    pub drag_n: f64,
    pub thrust_required_n: f64,
    pub thrust_max_n: f64,
    pub wind_m_s: (f64, f64),
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum InfeasibleInputError {
    #[error("{quantity} is not finite")]
    NonFinite { quantity: &'static str },
    #[error("vertical rate {vertical_rate_m_s:.1} m/s exceeds true airspeed {tas_m_s:.1} m/s")]
    VerticalRateExceedsAirspeed { vertical_rate_m_s: f64, tas_m_s: f64 },
    #[error("outside flight envelope: {}", format_flags(.flags))]
    OutsideEnvelope { flags: Vec<EnvelopeFlag> },
}

fn format_flags(flags: &[EnvelopeFlag]) -> String {
    flags
        .iter()
        .map(|f| f.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

/// State-transition law built on a performance collaborator and an optional wind field.
///
/// Pure: evaluation never mutates the model, so one instance may be shared
/// across concurrent solves.
#[derive(Debug, Clone)]
pub struct DynamicsModel {
    performance: Arc<dyn PerformanceModel>,
    wind: Option<Arc<WindField>>,
    projection: LocalProjection,
    isa_deviation_k: f64,
}

impl DynamicsModel {
    pub fn new(performance: Arc<dyn PerformanceModel>, projection: LocalProjection) -> Self {
        Self {
            performance,
            wind: None,
            projection,
            isa_deviation_k: 0.0,
        }
    }

    pub fn with_wind(mut self, wind: Option<Arc<WindField>>) -> Self {
        self.wind = wind;
        self
    }

    pub fn with_isa_deviation(mut self, isa_deviation_k: f64) -> Self {
        self.isa_deviation_k = isa_deviation_k;
        self
    }

    pub fn performance(&self) -> &dyn PerformanceModel {
        self.performance.as_ref()
    }

    pub fn envelope(&self) -> &Envelope {
        self.performance.envelope()
    }

    pub fn projection(&self) -> &LocalProjection {
        &self.projection
    }

    pub fn isa_deviation_k(&self) -> f64 {
        self.isa_deviation_k
    }

    /// True airspeed (m/s) for a Mach number at the state's altitude.
    pub fn tas(&self, state: &State, control: &Control) -> f64 {
        atmosphere::mach_to_tas(control.mach, state.altitude_m, self.isa_deviation_k)
    }

    /// `(u, v)` wind at the state; calm when no field is attached.
    pub fn wind_at(&self, state: &State) -> (f64, f64) {
        match &self.wind {
            Some(field) => {
                let position = self.projection.unproject(state.x_m, state.y_m);
                field.at(&FieldPoint::new(
                    position.longitude,
                    position.latitude,
                    state.altitude_m,
                    state.time_s,
                ))
            }
            None => (0.0, 0.0),
        }
    }

    pub fn condition(&self, state: &State, control: &Control) -> FlightCondition {
        FlightCondition {
            mass_kg: state.mass_kg,
            tas_m_s: self.tas(state, control),
            altitude_m: state.altitude_m,
            vertical_rate_m_s: control.vertical_rate_m_s,
            isa_deviation_k: self.isa_deviation_k,
        }
    }

    pub fn evaluate(&self, state: &State, control: &Control) -> NodeEvaluation {
        let condition = self.condition(state, control);
        let tas = condition.tas_m_s;
        let vs = control.vertical_rate_m_s;
        let horizontal = (tas * tas - vs * vs).max(0.0).sqrt();
        let (u, v) = self.wind_at(state);
        let (sin_psi, cos_psi) = control.heading_rad.sin_cos();
        let x_rate = horizontal * sin_psi + u;
        let y_rate = horizontal * cos_psi + v;
        let fuel_flow = self.performance.fuel_flow(&condition);

        NodeEvaluation {
            rate: StateRate {
                x_m_s: x_rate,
                y_m_s: y_rate,
                altitude_m_s: vs,
                mass_kg_s: -fuel_flow,
                time: 1.0,
            },
            position: self.projection.unproject(state.x_m, state.y_m),
            tas_m_s: tas,
            cas_m_s: atmosphere::tas_to_cas(tas, state.altitude_m, self.isa_deviation_k),
            ground_speed_m_s: x_rate.hypot(y_rate),
            fuel_flow_kg_s: fuel_flow,
            drag_n: self.performance.drag(&condition),
            thrust_required_n: self.performance.required_thrust(&condition),
            thrust_max_n: self.performance.max_thrust(&condition),
            wind_m_s: (u, v),
        }
    }

    pub fn derivative(&self, state: &State, control: &Control) -> StateRate {
        self.evaluate(state, control).rate
    }

    /// Like [`derivative`](Self::derivative) but rejects inputs outside the envelope.
    pub fn checked_derivative(
        &self,
        state: &State,
        control: &Control,
    ) -> Result<StateRate, InfeasibleInputError> {
        let inputs = [
            ("x", state.x_m),
            ("y", state.y_m),
            ("altitude", state.altitude_m),
            ("mass", state.mass_kg),
            ("time", state.time_s),
            ("mach", control.mach),
            ("vertical rate", control.vertical_rate_m_s),
            ("heading", control.heading_rad),
        ];
        if let Some((quantity, _)) = inputs.iter().find(|(_, v)| !v.is_finite()) {
            return Err(InfeasibleInputError::NonFinite { quantity });
        }

        let evaluation = self.evaluate(state, control);
        if control.vertical_rate_m_s.abs() >= evaluation.tas_m_s {
            return Err(InfeasibleInputError::VerticalRateExceedsAirspeed {
                vertical_rate_m_s: control.vertical_rate_m_s,
                tas_m_s: evaluation.tas_m_s,
            });
        }
        let flags = self.envelope_flags(state, control, &evaluation);
        if !flags.is_empty() {
            return Err(InfeasibleInputError::OutsideEnvelope { flags });
        }
        Ok(evaluation.rate)
    }

    /// Envelope limits exceeded by an already evaluated node.
    pub fn envelope_flags(
        &self,
        state: &State,
        control: &Control,
        evaluation: &NodeEvaluation,
    ) -> Vec<EnvelopeFlag> {
        self.envelope().violations(&EnvelopeSample {
            mach: control.mach,
            cas_m_s: evaluation.cas_m_s,
            altitude_m: state.altitude_m,
            mass_kg: state.mass_kg,
            thrust_required_n: evaluation.thrust_required_n,
            thrust_max_n: evaluation.thrust_max_n,
        })
    }
}
