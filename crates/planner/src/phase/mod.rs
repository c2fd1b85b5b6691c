//! Flight phases and their expansion into boundary-constrained segments.
//!
//! A [`FlightPhase`] is what the caller asks for; a list of [`PhaseSegment`]s
//! is what the transcription works with. Consecutive segments are linked
//! (position, altitude, mass, time, Mach), so their shared boundary
//! conditions have to agree; [`validate_continuity`] checks that before any
//! solve is attempted.

mod climb;
mod cruise;
mod descent;

use std::fmt;
use std::str::FromStr;

use flight_core::geo::GeoPoint;
use flight_performance::{Aircraft, CruiseBand};
use thiserror::Error;

use crate::navigation::Airport;

pub use cruise::altitude_floor;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PhaseKind {
    Climb,
    Cruise,
    Descent,
}

impl PhaseKind {
    pub fn label(self) -> &'static str {
        match self {
            PhaseKind::Climb => "climb",
            PhaseKind::Cruise => "cruise",
            PhaseKind::Descent => "descent",
        }
    }

    /// Admissible vertical-rate range (m/s) for this phase.
    pub fn vertical_rate_bounds(self, aircraft: &Aircraft) -> (f64, f64) {
        match self {
            PhaseKind::Climb => climb::vertical_rate_bounds(aircraft),
            PhaseKind::Cruise => cruise::vertical_rate_bounds(aircraft),
            PhaseKind::Descent => descent::vertical_rate_bounds(aircraft),
        }
    }
}

impl fmt::Display for PhaseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Altitude condition at a segment boundary (metres).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum AltitudeBoundary {
    #[default]
    Free,
    Fixed(f64),
    AtLeast(f64),
    Between(f64, f64),
}

impl AltitudeBoundary {
    /// Closed interval of admissible altitudes.
    pub fn interval(&self) -> (f64, f64) {
        match *self {
            AltitudeBoundary::Free => (f64::NEG_INFINITY, f64::INFINITY),
            AltitudeBoundary::Fixed(h) => (h, h),
            AltitudeBoundary::AtLeast(h) => (h, f64::INFINITY),
            AltitudeBoundary::Between(lo, hi) => (lo, hi),
        }
    }

    /// Closest admissible altitude to `preferred`.
    pub fn resolve(&self, preferred: f64) -> f64 {
        let (lo, hi) = self.interval();
        if lo > hi { lo } else { preferred.clamp(lo, hi) }
    }
}

/// Conditions imposed on the first or last node of a segment. `None` leaves a quantity free.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Boundary {
    pub position: Option<GeoPoint>,
    pub altitude: AltitudeBoundary,
    pub mass_kg: Option<f64>,
    pub time_s: Option<f64>,
    pub mach: Option<f64>,
}

impl Boundary {
    pub fn free() -> Self {
        Self::default()
    }

    /// On the ground at an airport.
    pub fn ground(airport: &Airport) -> Self {
        Self {
            position: Some(airport.position),
            altitude: AltitudeBoundary::Fixed(airport.elevation_m),
            ..Self::default()
        }
    }

    pub fn at(position: GeoPoint) -> Self {
        Self {
            position: Some(position),
            ..Self::default()
        }
    }

    pub fn with_altitude(mut self, altitude: AltitudeBoundary) -> Self {
        self.altitude = altitude;
        self
    }

    pub fn with_mass(mut self, mass_kg: f64) -> Self {
        self.mass_kg = Some(mass_kg);
        self
    }

    pub fn with_time(mut self, time_s: f64) -> Self {
        self.time_s = Some(time_s);
        self
    }

    pub fn with_mach(mut self, mach: f64) -> Self {
        self.mach = Some(mach);
        self
    }
}

/// One contiguous portion of the flight solved with phase-specific constraints.
#[derive(Debug, Clone, PartialEq)]
pub struct PhaseSegment {
    pub kind: PhaseKind,
    pub nodes: usize,
    pub start: Boundary,
    pub end: Boundary,
}

impl PhaseSegment {
    pub fn new(kind: PhaseKind, nodes: usize) -> Self {
        Self {
            kind,
            nodes,
            start: Boundary::free(),
            end: Boundary::free(),
        }
    }

    pub fn with_start(mut self, start: Boundary) -> Self {
        self.start = start;
        self
    }

    pub fn with_end(mut self, end: Boundary) -> Self {
        self.end = end;
        self
    }
}

/// Collocation node count per phase kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeCounts {
    pub climb: usize,
    pub cruise: usize,
    pub descent: usize,
}

impl Default for NodeCounts {
    fn default() -> Self {
        Self {
            climb: 10,
            cruise: 14,
            descent: 10,
        }
    }
}

impl NodeCounts {
    pub fn for_kind(&self, kind: PhaseKind) -> usize {
        match kind {
            PhaseKind::Climb => self.climb,
            PhaseKind::Cruise => self.cruise,
            PhaseKind::Descent => self.descent,
        }
    }
}

/// Route and aircraft facts needed to expand a [`FlightPhase`].
#[derive(Debug, Clone)]
pub struct PhaseContext {
    pub origin: Airport,
    pub destination: Airport,
    pub initial_mass_kg: f64,
    pub cruise: CruiseBand,
    /// Caller's altitude floor; replaces the band minimum where a phase ends at the floor.
    pub min_altitude_m: Option<f64>,
    pub nodes: NodeCounts,
}

impl PhaseContext {
    fn cruise_band(&self) -> AltitudeBoundary {
        AltitudeBoundary::Between(self.cruise.min_altitude_m, self.cruise.max_altitude_m)
    }

    fn floor_m(&self) -> f64 {
        self.min_altitude_m.unwrap_or(self.cruise.min_altitude_m)
    }

    fn departure(&self) -> Boundary {
        Boundary::ground(&self.origin)
            .with_mass(self.initial_mass_kg)
            .with_time(0.0)
    }
}

/// Requested flight phase(s).
#[derive(Debug, Clone, PartialEq, Default)]
pub enum FlightPhase {
    Climb,
    Cruise,
    Descent,
    /// Climb, cruise and descent chained and linked.
    #[default]
    Complete,
    Custom(Vec<PhaseSegment>),
}

impl FlightPhase {
    /// Segments to transcribe, in flight order.
    pub fn segments(&self, context: &PhaseContext) -> Vec<PhaseSegment> {
        match self {
            FlightPhase::Climb => vec![climb::standalone(context)],
            FlightPhase::Cruise => vec![cruise::standalone(context)],
            FlightPhase::Descent => vec![descent::standalone(context)],
            FlightPhase::Complete => vec![
                climb::leading(context),
                cruise::chained(context),
                descent::trailing(context),
            ],
            FlightPhase::Custom(segments) => segments.clone(),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            FlightPhase::Climb => "climb",
            FlightPhase::Cruise => "cruise",
            FlightPhase::Descent => "descent",
            FlightPhase::Complete => "complete",
            FlightPhase::Custom(_) => "custom",
        }
    }
}

impl FromStr for FlightPhase {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "climb" => Ok(FlightPhase::Climb),
            "cruise" => Ok(FlightPhase::Cruise),
            "descent" => Ok(FlightPhase::Descent),
            "complete" => Ok(FlightPhase::Complete),
            other => Err(format!(
                "unknown phase '{other}' (expected climb, cruise, descent or complete)"
            )),
        }
    }
}

/// How multi-segment flights are handed to the solver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SolveMode {
    /// One NLP over every segment.
    #[default]
    Joint,
    /// One NLP per segment, each starting from the previous end state.
    Sequential,
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum SegmentContinuityError {
    #[error("no phase segments to solve")]
    Empty,
    #[error("segment {segment} has {nodes} nodes; at least 2 are required")]
    TooFewNodes { segment: usize, nodes: usize },
    #[error("segment {segment} has an empty altitude interval at its {side}")]
    EmptyAltitudeInterval { segment: usize, side: &'static str },
    #[error(
        "segment {segment} starts in [{start_min:.0}, {start_max:.0}] m but the previous segment ends in [{end_min:.0}, {end_max:.0}] m"
    )]
    AltitudeMismatch {
        segment: usize,
        end_min: f64,
        end_max: f64,
        start_min: f64,
        start_max: f64,
    },
    #[error("segment {segment} start position differs from the previous end position")]
    PositionMismatch { segment: usize },
    #[error("segment {segment} start mass differs from the previous end mass")]
    MassMismatch { segment: usize },
    #[error("segment {segment} start time differs from the previous end time")]
    TimeMismatch { segment: usize },
    #[error("segment {segment} start Mach differs from the previous end Mach")]
    MachMismatch { segment: usize },
    #[error("climb segment {segment} must not end below its start altitude")]
    ClimbEndsBelowStart { segment: usize },
    #[error("descent segment {segment} must not end above its start altitude")]
    DescentEndsAboveStart { segment: usize },
}

const POSITION_TOLERANCE_DEG: f64 = 1e-6;
const VALUE_TOLERANCE: f64 = 1e-6;

fn differs(a: Option<f64>, b: Option<f64>) -> bool {
    matches!((a, b), (Some(a), Some(b)) if (a - b).abs() > VALUE_TOLERANCE)
}

/// Check segment-local and shared-boundary consistency.
pub fn validate_continuity(segments: &[PhaseSegment]) -> Result<(), SegmentContinuityError> {
    if segments.is_empty() {
        return Err(SegmentContinuityError::Empty);
    }

    for (segment, phase) in segments.iter().enumerate() {
        if phase.nodes < 2 {
            return Err(SegmentContinuityError::TooFewNodes {
                segment,
                nodes: phase.nodes,
            });
        }
        let (start_lo, start_hi) = phase.start.altitude.interval();
        let (end_lo, end_hi) = phase.end.altitude.interval();
        if start_lo > start_hi {
            return Err(SegmentContinuityError::EmptyAltitudeInterval {
                segment,
                side: "start",
            });
        }
        if end_lo > end_hi {
            return Err(SegmentContinuityError::EmptyAltitudeInterval { segment, side: "end" });
        }
        match phase.kind {
            PhaseKind::Climb if end_hi < start_lo => {
                return Err(SegmentContinuityError::ClimbEndsBelowStart { segment });
            }
            PhaseKind::Descent if end_lo > start_hi => {
                return Err(SegmentContinuityError::DescentEndsAboveStart { segment });
            }
            _ => {}
        }
    }

    for (index, pair) in segments.windows(2).enumerate() {
        let segment = index + 1;
        let (previous, next) = (&pair[0].end, &pair[1].start);

        let (end_min, end_max) = previous.altitude.interval();
        let (start_min, start_max) = next.altitude.interval();
        if end_max < start_min || start_max < end_min {
            return Err(SegmentContinuityError::AltitudeMismatch {
                segment,
                end_min,
                end_max,
                start_min,
                start_max,
            });
        }
        if let (Some(a), Some(b)) = (previous.position, next.position) {
            if (a.longitude - b.longitude).abs() > POSITION_TOLERANCE_DEG
                || (a.latitude - b.latitude).abs() > POSITION_TOLERANCE_DEG
            {
                return Err(SegmentContinuityError::PositionMismatch { segment });
            }
        }
        if differs(previous.mass_kg, next.mass_kg) {
            return Err(SegmentContinuityError::MassMismatch { segment });
        }
        if differs(previous.time_s, next.time_s) {
            return Err(SegmentContinuityError::TimeMismatch { segment });
        }
        if differs(previous.mach, next.mach) {
            return Err(SegmentContinuityError::MachMismatch { segment });
        }
    }
    Ok(())
}
