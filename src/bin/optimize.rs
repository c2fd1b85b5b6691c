use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Args, Parser, ValueEnum};
use flight_optimizer::export::{summary, writer_for_path};
use flight_optimizer::planner::{
    ClimateMetric, CostNormalization, FlightPhase, InitialMass, ScalingFactors, SolveMode, solve,
};
use flight_optimizer::report::{summarize, write_trajectory};
use flight_optimizer::scenario::{ObjectiveRequest, ScenarioRequest, build_problem, load_catalogs};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(author, version, about = "Optimize a single flight trajectory")]
struct Cli {
    /// Origin airport ICAO code
    #[arg(long)]
    from: String,

    /// Destination airport ICAO code
    #[arg(long)]
    to: String,

    /// Aircraft type code or name (defaults to the first catalog entry)
    #[arg(long)]
    aircraft: Option<String>,

    /// Directory holding aircraft/, airports.yaml and optimizer.toml
    #[arg(long, default_value = "configs")]
    config_dir: PathBuf,

    /// Flight phase: climb, cruise, descent or complete
    #[arg(long, default_value = "complete")]
    phase: FlightPhase,

    #[arg(long, value_enum, default_value_t = Mode::Joint)]
    mode: Mode,

    #[command(flatten)]
    mass: MassArgs,

    /// Lowest cruise altitude in ft
    #[arg(long)]
    min_altitude_ft: Option<f64>,

    /// Highest altitude in ft for every phase
    #[arg(long)]
    max_altitude_ft: Option<f64>,

    /// Inner solver iteration budget (overrides optimizer.toml)
    #[arg(long)]
    max_iterations: Option<u64>,

    /// Collocation nodes per phase (overrides optimizer.toml)
    #[arg(long)]
    nodes: Option<usize>,

    /// Wind table CSV (ts, latitude, longitude, h, u, v)
    #[arg(long)]
    wind: Option<PathBuf>,

    /// Temperature offset from ISA in kelvin
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    isa_deviation: f64,

    #[command(flatten)]
    objective: ObjectiveArgs,

    /// Multiplier on the grid (contrail) cost channel
    #[arg(long, default_value_t = 1.0)]
    contrail_scale: f64,

    /// Multiplier on CO2 in climate objectives
    #[arg(long, default_value_t = 1.0)]
    co2_scale: f64,

    /// Return the best iterate when the solver does not converge
    #[arg(long)]
    return_failed: bool,

    /// Resample the output every N seconds
    #[arg(long)]
    cadence: Option<f64>,

    /// Output CSV path, `-` for stdout
    #[arg(long, default_value = "-")]
    output: PathBuf,

    /// Skip the JSON summary written next to the output CSV
    #[arg(long)]
    no_summary: bool,
}

#[derive(Args)]
#[group(multiple = false)]
struct MassArgs {
    /// Take-off mass in kg
    #[arg(long)]
    mass_kg: Option<f64>,

    /// Take-off mass as a fraction of MTOW
    #[arg(long)]
    mass_fraction: Option<f64>,
}

#[derive(Args)]
struct ObjectiveArgs {
    #[arg(long, value_enum, default_value_t = ObjectiveKind::Fuel)]
    objective: ObjectiveKind,

    /// Cost index 0..=100 (cost-index objective)
    #[arg(long, default_value_t = 30.0)]
    cost_index: f64,

    #[arg(long, default_value_t = 0.8)]
    fuel_price: f64,

    /// Time cost per second (cost-index objective)
    #[arg(long, default_value_t = 1.5)]
    time_price: f64,

    /// Climate metric: gwp20, gwp50, gwp100, gtp20, gtp50, gtp100
    #[arg(long, default_value = "gwp100")]
    metric: ClimateMetric,

    /// Cost grid CSV (longitude, latitude, height, cost[, ts])
    #[arg(long, required_if_eq("objective", "grid"))]
    grid: Option<PathBuf>,

    /// Unit of the grid values; required for the grid objective
    #[arg(long, value_enum, required_if_eq("objective", "grid"))]
    grid_unit: Option<GridUnit>,

    /// Conversion applied to per-metre grid values
    #[arg(long, default_value_t = 1.0)]
    unit_factor: f64,

    /// Gaussian pre-smoothing of the grid, in grid cells
    #[arg(long)]
    smoothing: Option<f64>,

    /// Weight of fuel burn added to the grid cost
    #[arg(long, default_value_t = 0.0)]
    fuel_weight: f64,
}

#[derive(Copy, Clone, ValueEnum, Debug)]
enum Mode {
    Joint,
    Sequential,
}

#[derive(Copy, Clone, ValueEnum, Debug)]
enum ObjectiveKind {
    Fuel,
    CostIndex,
    Climate,
    Grid,
}

#[derive(Copy, Clone, ValueEnum, Debug)]
enum GridUnit {
    PerSecond,
    PerMeter,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let cli = Cli::parse();
    let catalogs = load_catalogs(&cli.config_dir)
        .with_context(|| format!("loading catalogs from {}", cli.config_dir.display()))?;

    let mut request = ScenarioRequest::new(&cli.from, &cli.to);
    request.aircraft = cli.aircraft.clone();
    request.phase = cli.phase.clone();
    request.mode = match cli.mode {
        Mode::Joint => SolveMode::Joint,
        Mode::Sequential => SolveMode::Sequential,
    };
    request.initial_mass = match (cli.mass.mass_kg, cli.mass.mass_fraction) {
        (Some(kg), _) => InitialMass::Absolute(kg),
        (None, Some(fraction)) => InitialMass::FractionOfMtow(fraction),
        (None, None) => InitialMass::default(),
    };
    request.min_altitude_ft = cli.min_altitude_ft;
    request.max_altitude_ft = cli.max_altitude_ft;
    request.max_iterations = cli.max_iterations;
    request.nodes = cli.nodes;
    request.wind = cli.wind.clone();
    request.isa_deviation_k = cli.isa_deviation;
    request.objective = objective_request(&cli.objective)?;
    request.scaling = ScalingFactors::new(cli.contrail_scale, cli.co2_scale)?;
    request.return_failed = cli.return_failed;

    let spec = build_problem(&catalogs, &request)?;
    let mut trajectory = solve(&spec)?;
    if let Some(cadence) = cli.cadence {
        trajectory = trajectory.resample(cadence);
    }

    let mut writer = writer_for_path(&cli.output)
        .with_context(|| format!("opening {}", cli.output.display()))?;
    write_trajectory(&trajectory, writer.as_mut())?;

    let run = summarize(&trajectory);
    let to_stdout = cli.output == Path::new("-");
    if !to_stdout && !cli.no_summary {
        let meta = summary::Metadata {
            aircraft: &spec.aircraft().type_code,
            origin: &spec.route().origin.code,
            destination: &spec.route().destination.code,
            objective: spec.objective().label(),
            contrail_scale: spec.scaling().contrail(),
            co2_scale: spec.scaling().co2(),
        };
        summary::write_sidecar(&cli.output, &meta, &run)?;
    }

    let report = format!(
        "status={} fuel={:.1} kg time={:.1} min distance={:.1} km max_alt={:.0} m flagged={}",
        run.status,
        run.fuel_burned_kg,
        run.flight_time_s / 60.0,
        run.distance_m / 1000.0,
        run.max_altitude_m,
        run.flagged_points
    );
    if to_stdout {
        eprintln!("{report}");
    } else {
        println!("{report}");
    }
    Ok(())
}

fn objective_request(args: &ObjectiveArgs) -> anyhow::Result<ObjectiveRequest> {
    Ok(match args.objective {
        ObjectiveKind::Fuel => ObjectiveRequest::Fuel,
        ObjectiveKind::CostIndex => ObjectiveRequest::CostIndex {
            index: args.cost_index,
            fuel_price_per_kg: args.fuel_price,
            time_price_per_s: args.time_price,
        },
        ObjectiveKind::Climate => ObjectiveRequest::Climate(args.metric),
        ObjectiveKind::Grid => {
            let path = args
                .grid
                .clone()
                .ok_or_else(|| anyhow::anyhow!("--grid is required for the grid objective"))?;
            let normalization = match args.grid_unit {
                Some(GridUnit::PerSecond) => CostNormalization::PerSecond,
                Some(GridUnit::PerMeter) => CostNormalization::PerMeter {
                    unit_factor: args.unit_factor,
                },
                None => anyhow::bail!("--grid-unit is required for the grid objective"),
            };
            ObjectiveRequest::Grid {
                path,
                normalization,
                smoothing_sigma: args.smoothing,
                fuel_weight: args.fuel_weight,
            }
        }
    })
}
