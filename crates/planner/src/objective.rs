//! Objective terms evaluated per collocation interval.
//!
//! Every term yields a *rate* at a node; the interval cost is the
//! trapezoidal average of the two node rates times the interval duration.
//! Terms are plain data (plus `Arc`-shared grids), so an objective can be
//! cloned into many concurrent solves.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use flight_dynamics::{Control, NodeEvaluation, State};
use flight_field::{AxisKind, FieldPoint, Interpolant};
use flight_performance::emission;
use thiserror::Error;

use crate::phase::PhaseKind;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ObjectiveError {
    #[error("objective has no terms")]
    Empty,
    #[error("cost index {0} outside 0..=100")]
    CostIndexOutOfRange(f64),
    #[error("{name} must be finite and non-negative, got {value}")]
    InvalidParameter { name: &'static str, value: f64 },
    #[error("scaling factor `{name}` must be finite and non-negative, got {value}")]
    InvalidScaling { name: &'static str, value: f64 },
    #[error("cost grid lacks a {0} axis")]
    MissingGridAxis(&'static str),
    #[error("unknown climate metric '{0}'")]
    UnknownMetric(String),
}

fn non_negative(name: &'static str, value: f64) -> Result<f64, ObjectiveError> {
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(ObjectiveError::InvalidParameter { name, value })
    }
}

/// Named multipliers passed to every evaluation (contrail and CO2 contributions).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScalingFactors {
    contrail: f64,
    co2: f64,
}

impl ScalingFactors {
    pub fn new(contrail: f64, co2: f64) -> Result<Self, ObjectiveError> {
        for (name, value) in [("contrail", contrail), ("co2", co2)] {
            if !value.is_finite() || value < 0.0 {
                return Err(ObjectiveError::InvalidScaling { name, value });
            }
        }
        Ok(Self { contrail, co2 })
    }

    pub fn contrail(&self) -> f64 {
        self.contrail
    }

    pub fn co2(&self) -> f64 {
        self.co2
    }

    /// Multiplier applied to a term tagged with `channel`.
    pub fn factor(&self, channel: ScaleChannel) -> f64 {
        match channel {
            ScaleChannel::Contrail => self.contrail,
            ScaleChannel::Co2 => self.co2,
            ScaleChannel::Fixed => 1.0,
        }
    }
}

impl Default for ScalingFactors {
    fn default() -> Self {
        Self {
            contrail: 1.0,
            co2: 1.0,
        }
    }
}

/// Which scaling factor multiplies a grid term.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScaleChannel {
    Contrail,
    Co2,
    /// Not scaled.
    Fixed,
}

/// Unit of the values stored in a cost grid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CostNormalization {
    /// Cost per second of flight.
    PerSecond,
    /// Cost per unit distance; converted to a rate with `TAS · unit_factor`.
    PerMeter { unit_factor: f64 },
}

/// Emission metric converting species masses into CO2-equivalent mass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClimateMetric {
    Gwp20,
    Gwp50,
    Gwp100,
    Gtp20,
    Gtp50,
    Gtp100,
}

/// CO2-equivalent kg per kg of each non-CO2 species.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpeciesFactors {
    pub h2o: f64,
    pub nox: f64,
    pub soot: f64,
    pub sulfur: f64,
}

impl ClimateMetric {
    pub fn factors(self) -> SpeciesFactors {
        let (h2o, nox, soot, sulfur) = match self {
            ClimateMetric::Gwp20 => (0.22, 619.0, 4288.0, -832.0),
            ClimateMetric::Gwp50 => (0.10, 205.0, 2018.0, -392.0),
            ClimateMetric::Gwp100 => (0.06, 114.0, 1166.0, -226.0),
            ClimateMetric::Gtp20 => (0.07, -222.0, 1245.0, -241.0),
            ClimateMetric::Gtp50 => (0.01, -69.0, 195.0, -38.0),
            ClimateMetric::Gtp100 => (0.008, 13.0, 161.0, -31.0),
        };
        SpeciesFactors {
            h2o,
            nox,
            soot,
            sulfur,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ClimateMetric::Gwp20 => "gwp20",
            ClimateMetric::Gwp50 => "gwp50",
            ClimateMetric::Gwp100 => "gwp100",
            ClimateMetric::Gtp20 => "gtp20",
            ClimateMetric::Gtp50 => "gtp50",
            ClimateMetric::Gtp100 => "gtp100",
        }
    }
}

impl FromStr for ClimateMetric {
    type Err = ObjectiveError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "gwp20" => Ok(ClimateMetric::Gwp20),
            "gwp50" => Ok(ClimateMetric::Gwp50),
            "gwp100" => Ok(ClimateMetric::Gwp100),
            "gtp20" => Ok(ClimateMetric::Gtp20),
            "gtp50" => Ok(ClimateMetric::Gtp50),
            "gtp100" => Ok(ClimateMetric::Gtp100),
            other => Err(ObjectiveError::UnknownMetric(other.to_string())),
        }
    }
}

/// Everything an objective may look at for one node.
#[derive(Debug, Clone, Copy)]
pub struct NodeContext<'a> {
    pub phase: PhaseKind,
    pub state: &'a State,
    pub control: &'a Control,
    pub evaluation: &'a NodeEvaluation,
    /// kg NOx per kg fuel.
    pub nox_index: f64,
}

/// Caller-supplied per-node cost.
pub trait NodeCost: fmt::Debug + Send + Sync {
    /// Cost rate (per second) at a node.
    fn rate(&self, node: &NodeContext<'_>, scaling: &ScalingFactors) -> f64;

    /// Cost of one interval; trapezoidal in the node rates unless overridden.
    fn interval_cost(
        &self,
        start: &NodeContext<'_>,
        end: &NodeContext<'_>,
        duration_s: f64,
        scaling: &ScalingFactors,
    ) -> f64 {
        0.5 * (self.rate(start, scaling) + self.rate(end, scaling)) * duration_s
    }
}

/// Cost sampled from a 3D/4D grid at the node's position (and time).
#[derive(Debug, Clone)]
pub struct GridCostTerm {
    field: Arc<Interpolant>,
    normalization: CostNormalization,
    channel: ScaleChannel,
}

impl GridCostTerm {
    pub fn new(
        field: Arc<Interpolant>,
        normalization: CostNormalization,
        channel: ScaleChannel,
    ) -> Result<Self, ObjectiveError> {
        for kind in [AxisKind::Longitude, AxisKind::Latitude, AxisKind::Height] {
            if field.grid().axis(kind).is_none() {
                return Err(ObjectiveError::MissingGridAxis(kind.label()));
            }
        }
        if let CostNormalization::PerMeter { unit_factor } = normalization {
            non_negative("unit_factor", unit_factor)?;
        }
        Ok(Self {
            field,
            normalization,
            channel,
        })
    }

    pub fn field(&self) -> &Interpolant {
        &self.field
    }

    pub fn normalization(&self) -> CostNormalization {
        self.normalization
    }

    pub fn channel(&self) -> ScaleChannel {
        self.channel
    }

    fn rate(&self, node: &NodeContext<'_>, scaling: &ScalingFactors) -> f64 {
        let scale = scaling.factor(self.channel);
        if scale == 0.0 {
            return 0.0;
        }
        let position = node.evaluation.position;
        let value = self.field.sample(&FieldPoint::new(
            position.longitude,
            position.latitude,
            node.state.altitude_m,
            node.state.time_s,
        ));
        let rate = match self.normalization {
            CostNormalization::PerSecond => value,
            CostNormalization::PerMeter { unit_factor } => {
                value * node.evaluation.tas_m_s * unit_factor
            }
        };
        scale * rate
    }
}

/// Objective strategy. Build with [`ObjectiveBuilder`].
#[derive(Debug, Clone)]
pub enum ObjectiveTerm {
    /// Fuel mass burned.
    Fuel,
    /// Blend of fuel and time cost; `index` in 0..=100 moves weight from fuel to time.
    CostIndex {
        index: f64,
        fuel_price_per_kg: f64,
        time_price_per_s: f64,
    },
    /// CO2-equivalent emissions under a climate metric.
    ClimateMetric(ClimateMetric),
    GridCost(GridCostTerm),
    Custom(Arc<dyn NodeCost>),
    /// Weighted sum of child terms.
    Composite(Vec<(ObjectiveTerm, f64)>),
}

impl ObjectiveTerm {
    /// Cost rate at a node.
    pub fn rate(&self, node: &NodeContext<'_>, scaling: &ScalingFactors) -> f64 {
        let fuel_flow = node.evaluation.fuel_flow_kg_s;
        match self {
            ObjectiveTerm::Fuel => fuel_flow,
            ObjectiveTerm::CostIndex {
                index,
                fuel_price_per_kg,
                time_price_per_s,
            } => {
                let time_weight = index / 100.0;
                (1.0 - time_weight) * fuel_flow * fuel_price_per_kg
                    + time_weight * time_price_per_s
            }
            ObjectiveTerm::ClimateMetric(metric) => {
                let rates = emission::rates(fuel_flow, node.nox_index);
                let factors = metric.factors();
                scaling.co2() * rates.co2
                    + factors.h2o * rates.h2o
                    + factors.nox * rates.nox
                    + factors.soot * rates.soot
                    + factors.sulfur * rates.sulfur
            }
            ObjectiveTerm::GridCost(term) => term.rate(node, scaling),
            ObjectiveTerm::Custom(cost) => cost.rate(node, scaling),
            ObjectiveTerm::Composite(children) => children
                .iter()
                .map(|(term, weight)| weight * term.rate(node, scaling))
                .sum(),
        }
    }

    /// Cost accumulated over one interval of `duration_s` seconds.
    pub fn interval_cost(
        &self,
        start: &NodeContext<'_>,
        end: &NodeContext<'_>,
        duration_s: f64,
        scaling: &ScalingFactors,
    ) -> f64 {
        match self {
            ObjectiveTerm::Custom(cost) => cost.interval_cost(start, end, duration_s, scaling),
            ObjectiveTerm::Composite(children) => children
                .iter()
                .map(|(term, weight)| weight * term.interval_cost(start, end, duration_s, scaling))
                .sum(),
            _ => 0.5 * (self.rate(start, scaling) + self.rate(end, scaling)) * duration_s,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ObjectiveTerm::Fuel => "fuel",
            ObjectiveTerm::CostIndex { .. } => "cost_index",
            ObjectiveTerm::ClimateMetric(metric) => metric.label(),
            ObjectiveTerm::GridCost(_) => "grid_cost",
            ObjectiveTerm::Custom(_) => "custom",
            ObjectiveTerm::Composite(_) => "composite",
        }
    }
}

/// Collects weighted terms and validates them into one [`ObjectiveTerm`].
#[derive(Debug, Default)]
pub struct ObjectiveBuilder {
    terms: Vec<(ObjectiveTerm, f64)>,
    error: Option<ObjectiveError>,
}

impl ObjectiveBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(mut self, term: Result<ObjectiveTerm, ObjectiveError>, weight: f64) -> Self {
        if self.error.is_some() {
            return self;
        }
        match term.and_then(|t| non_negative("weight", weight).map(|w| (t, w))) {
            Ok(entry) => self.terms.push(entry),
            Err(err) => self.error = Some(err),
        }
        self
    }

    pub fn fuel(self, weight: f64) -> Self {
        self.push(Ok(ObjectiveTerm::Fuel), weight)
    }

    pub fn cost_index(
        self,
        index: f64,
        fuel_price_per_kg: f64,
        time_price_per_s: f64,
        weight: f64,
    ) -> Self {
        let term = (|| {
            if !(0.0..=100.0).contains(&index) {
                return Err(ObjectiveError::CostIndexOutOfRange(index));
            }
            Ok(ObjectiveTerm::CostIndex {
                index,
                fuel_price_per_kg: non_negative("fuel_price_per_kg", fuel_price_per_kg)?,
                time_price_per_s: non_negative("time_price_per_s", time_price_per_s)?,
            })
        })();
        self.push(term, weight)
    }

    pub fn climate(self, metric: ClimateMetric, weight: f64) -> Self {
        self.push(Ok(ObjectiveTerm::ClimateMetric(metric)), weight)
    }

    /// Grid-cost term; the grid's cost unit must be stated explicitly.
    pub fn grid_cost(
        self,
        field: Arc<Interpolant>,
        normalization: CostNormalization,
        channel: ScaleChannel,
        weight: f64,
    ) -> Self {
        let term = GridCostTerm::new(field, normalization, channel).map(ObjectiveTerm::GridCost);
        self.push(term, weight)
    }

    pub fn custom(self, cost: Arc<dyn NodeCost>, weight: f64) -> Self {
        self.push(Ok(ObjectiveTerm::Custom(cost)), weight)
    }

    /// A single unit-weight term is returned as is; anything else becomes a composite.
    pub fn build(mut self) -> Result<ObjectiveTerm, ObjectiveError> {
        if let Some(err) = self.error {
            return Err(err);
        }
        match self.terms.len() {
            0 => Err(ObjectiveError::Empty),
            1 if self.terms[0].1 == 1.0 => Ok(self.terms.remove(0).0),
            _ => Ok(ObjectiveTerm::Composite(self.terms)),
        }
    }
}
