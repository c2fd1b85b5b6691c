//! Catalog loading and problem construction shared by the binaries.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use flight_config::{AircraftConfig, ConfigError, OptimizerConfig};
use flight_core::units::ft_to_m;
use flight_field::{Interpolant, MalformedGridError, Smoothing};
use flight_importer::ImportError;
use flight_planner::options::{node_counts, solver_options};
use flight_planner::performance::{self, AircraftError};
use flight_planner::{
    AirportCatalog, AltitudeBounds, ClimateMetric, CostNormalization, FlightPhase, InitialMass,
    NodeCounts, ObjectiveBuilder, ObjectiveError, ObjectiveTerm, PlannerError, ProblemSpec,
    Route, ScaleChannel, ScalingFactors, SolveMode,
};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("malformed grid: {0}")]
    Grid(#[from] MalformedGridError),
    #[error("import error: {0}")]
    Import(#[from] ImportError),
    #[error("aircraft selection failed: {0}")]
    Aircraft(#[from] AircraftError),
    #[error("objective error: {0}")]
    Objective(#[from] ObjectiveError),
    #[error(transparent)]
    Planner(#[from] PlannerError),
}

/// Aircraft, airport and optimizer catalogs from a configuration directory.
#[derive(Debug, Clone)]
pub struct Catalogs {
    pub aircraft: Vec<AircraftConfig>,
    pub airports: AirportCatalog,
    pub optimizer: OptimizerConfig,
}

/// Load `aircraft/`, `airports.yaml` and (optionally) `optimizer.toml` from `dir`.
pub fn load_catalogs<P: AsRef<Path>>(dir: P) -> Result<Catalogs, ScenarioError> {
    let dir = dir.as_ref();
    let aircraft = flight_config::load_aircraft(dir.join("aircraft"))?;
    let airports = flight_config::load_airports(dir.join("airports.yaml"))?;
    let optimizer_path = dir.join("optimizer.toml");
    let optimizer = if optimizer_path.exists() {
        flight_config::load_optimizer(&optimizer_path)?
    } else {
        OptimizerConfig::default()
    };
    debug!(
        dir = %dir.display(),
        aircraft = aircraft.len(),
        airports = airports.len(),
        "loaded catalogs"
    );
    Ok(Catalogs {
        aircraft,
        airports: AirportCatalog::from_configs(&airports),
        optimizer,
    })
}

/// Objective requested on the command line.
#[derive(Debug, Clone)]
pub enum ObjectiveRequest {
    Fuel,
    CostIndex {
        index: f64,
        fuel_price_per_kg: f64,
        time_price_per_s: f64,
    },
    Climate(ClimateMetric),
    /// Grid cost from a CSV file, optionally blended with fuel burn.
    Grid {
        path: PathBuf,
        normalization: CostNormalization,
        smoothing_sigma: Option<f64>,
        fuel_weight: f64,
    },
}

impl ObjectiveRequest {
    pub fn build(&self) -> Result<ObjectiveTerm, ScenarioError> {
        let builder = ObjectiveBuilder::new();
        let term = match self {
            ObjectiveRequest::Fuel => builder.fuel(1.0).build()?,
            ObjectiveRequest::CostIndex {
                index,
                fuel_price_per_kg,
                time_price_per_s,
            } => builder
                .cost_index(*index, *fuel_price_per_kg, *time_price_per_s, 1.0)
                .build()?,
            ObjectiveRequest::Climate(metric) => builder.climate(*metric, 1.0).build()?,
            ObjectiveRequest::Grid {
                path,
                normalization,
                smoothing_sigma,
                fuel_weight,
            } => {
                let mut field = flight_importer::load_cost_grid(path, None)?;
                if let Some(sigma) = smoothing_sigma {
                    let smoothing = Smoothing::uniform(field.dimension(), *sigma);
                    field = Interpolant::smoothed(field.grid().clone(), &smoothing)?;
                }
                let builder = if *fuel_weight > 0.0 {
                    builder.fuel(*fuel_weight)
                } else {
                    builder
                };
                builder
                    .grid_cost(Arc::new(field), *normalization, ScaleChannel::Contrail, 1.0)
                    .build()?
            }
        };
        Ok(term)
    }
}

/// Everything a front-end collects before a solve.
#[derive(Debug, Clone)]
pub struct ScenarioRequest {
    pub aircraft: Option<String>,
    pub origin: String,
    pub destination: String,
    pub phase: FlightPhase,
    pub mode: SolveMode,
    pub initial_mass: InitialMass,
    pub min_altitude_ft: Option<f64>,
    pub max_altitude_ft: Option<f64>,
    pub max_iterations: Option<u64>,
    /// Overrides the node count of every phase.
    pub nodes: Option<usize>,
    pub wind: Option<PathBuf>,
    pub objective: ObjectiveRequest,
    pub scaling: ScalingFactors,
    pub return_failed: bool,
    pub isa_deviation_k: f64,
}

impl ScenarioRequest {
    pub fn new(origin: impl Into<String>, destination: impl Into<String>) -> Self {
        Self {
            aircraft: None,
            origin: origin.into(),
            destination: destination.into(),
            phase: FlightPhase::default(),
            mode: SolveMode::default(),
            initial_mass: InitialMass::default(),
            min_altitude_ft: None,
            max_altitude_ft: None,
            max_iterations: None,
            nodes: None,
            wind: None,
            objective: ObjectiveRequest::Fuel,
            scaling: ScalingFactors::default(),
            return_failed: false,
            isa_deviation_k: 0.0,
        }
    }
}

/// Resolve catalogs and files into an immutable [`ProblemSpec`].
pub fn build_problem(catalogs: &Catalogs, request: &ScenarioRequest) -> Result<ProblemSpec, ScenarioError> {
    let aircraft = performance::select(&catalogs.aircraft, request.aircraft.as_deref())?;
    let route = Route::resolve(&catalogs.airports, &request.origin, &request.destination)?;
    let altitude = AltitudeBounds::new(
        request.min_altitude_ft.map(ft_to_m),
        request.max_altitude_ft.map(ft_to_m),
    )?;

    let mut options = solver_options(&catalogs.optimizer);
    if let Some(max_iterations) = request.max_iterations {
        options.max_iterations = max_iterations;
    }
    options.return_failed |= request.return_failed;
    let nodes = match request.nodes {
        Some(n) => NodeCounts {
            climb: n,
            cruise: n,
            descent: n,
        },
        None => node_counts(&catalogs.optimizer),
    };
    let wind = match &request.wind {
        Some(path) => Some(Arc::new(flight_importer::load_wind(path)?)),
        None => None,
    };

    info!(
        aircraft = %aircraft.type_code,
        origin = %route.origin.code,
        destination = %route.destination.code,
        distance_km = route.distance_m() / 1000.0,
        "scenario resolved"
    );
    Ok(ProblemSpec::builder(aircraft, route)
        .initial_mass(request.initial_mass)
        .phase(request.phase.clone())
        .mode(request.mode)
        .objective(request.objective.build()?)
        .scaling(request.scaling)
        .wind(wind)
        .altitude(altitude)
        .nodes(nodes)
        .options(options)
        .isa_deviation(request.isa_deviation_k)
        .build()?)
}
