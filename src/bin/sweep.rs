use std::fs;
use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use flight_optimizer::export::writer_for_path;
use flight_optimizer::planner::sweep::{self, SweepOutcome};
use flight_optimizer::planner::{ClimateMetric, CostNormalization, FlightPhase};
use flight_optimizer::report::{summarize, write_trajectory};
use flight_optimizer::scenario::{ObjectiveRequest, ScenarioRequest, build_problem, load_catalogs};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Solve one route under a grid of contrail/CO2 scaling factors"
)]
struct Cli {
    #[arg(long)]
    from: String,

    #[arg(long)]
    to: String,

    #[arg(long)]
    aircraft: Option<String>,

    #[arg(long, default_value = "configs")]
    config_dir: PathBuf,

    #[arg(long, default_value = "complete")]
    phase: FlightPhase,

    /// Contrail scaling factors (comma separated)
    #[arg(long, value_delimiter = ',', default_value = "0,1")]
    contrail: Vec<f64>,

    /// CO2 scaling factors (comma separated)
    #[arg(long, value_delimiter = ',', default_value = "1")]
    co2: Vec<f64>,

    /// Cost grid CSV; without it the climate metric alone is optimized
    #[arg(long)]
    grid: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = GridUnit::PerSecond)]
    grid_unit: GridUnit,

    #[arg(long, default_value_t = 1.0)]
    unit_factor: f64,

    /// Weight of fuel burn added to the grid cost
    #[arg(long, default_value_t = 1.0)]
    fuel_weight: f64,

    #[arg(long, default_value = "gwp100")]
    metric: ClimateMetric,

    #[arg(long)]
    nodes: Option<usize>,

    #[arg(long)]
    max_iterations: Option<u64>,

    /// Start every case after the first from the first case's solution
    #[arg(long)]
    warm_start: bool,

    /// Keep non-converged trajectories
    #[arg(long)]
    return_failed: bool,

    /// Directory for per-case trajectory CSVs
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Summary table path, `-` for stdout
    #[arg(long, default_value = "-")]
    summary: PathBuf,
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
    request.nodes = cli.nodes;
    request.max_iterations = cli.max_iterations;
    request.return_failed = cli.return_failed;
    request.objective = match &cli.grid {
        Some(path) => ObjectiveRequest::Grid {
            path: path.clone(),
            normalization: match cli.grid_unit {
                GridUnit::PerSecond => CostNormalization::PerSecond,
                GridUnit::PerMeter => CostNormalization::PerMeter {
                    unit_factor: cli.unit_factor,
                },
            },
            smoothing_sigma: None,
            fuel_weight: cli.fuel_weight,
        },
        None => ObjectiveRequest::Climate(cli.metric),
    };

    let spec = build_problem(&catalogs, &request)?;
    let cases = sweep::scaling_grid(&cli.contrail, &cli.co2)?;
    let outcomes = if cli.warm_start {
        sweep::run_warm_started(&spec, &cases)
    } else {
        sweep::run(&spec, &cases)
    };

    if let Some(dir) = &cli.output_dir {
        fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
        for outcome in &outcomes {
            if let Ok(trajectory) = &outcome.result {
                let path = dir.join(case_file_name(outcome));
                let mut writer = writer_for_path(&path)?;
                write_trajectory(trajectory, writer.as_mut())?;
            }
        }
    }

    let mut table = csv::Writer::from_writer(writer_for_path(&cli.summary)?);
    table.write_record([
        "contrail_scale",
        "co2_scale",
        "status",
        "objective",
        "fuel_burned_kg",
        "flight_time_s",
        "distance_m",
        "max_altitude_m",
        "error",
    ])?;
    for outcome in &outcomes {
        let scale = [
            outcome.scaling.contrail().to_string(),
            outcome.scaling.co2().to_string(),
        ];
        match &outcome.result {
            Ok(trajectory) => {
                let run = summarize(trajectory);
                table.write_record([
                    scale[0].clone(),
                    scale[1].clone(),
                    run.status,
                    format!("{:.6}", run.objective),
                    format!("{:.3}", run.fuel_burned_kg),
                    format!("{:.1}", run.flight_time_s),
                    format!("{:.1}", run.distance_m),
                    format!("{:.1}", run.max_altitude_m),
                    String::new(),
                ])?;
            }
            Err(err) => {
                table.write_record([
                    scale[0].clone(),
                    scale[1].clone(),
                    "failed".to_string(),
                    String::new(),
                    String::new(),
                    String::new(),
                    String::new(),
                    String::new(),
                    err.to_string(),
                ])?;
            }
        }
    }
    table.flush()?;
    Ok(())
}

fn case_file_name(outcome: &SweepOutcome) -> String {
    format!(
        "case_contrail{}_co2{}.csv",
        outcome.scaling.contrail(),
        outcome.scaling.co2()
    )
}
