use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use astrochop::config::{RunConfig, load_bodies, load_run_config};
use astrochop::core::time::format_julian_date;
use astrochop::ephemeris::MeanElementEphemeris;
use astrochop::export::{
    DataGrid, Morph, OutputGuard, PorkchopMesh, RunSummary, write_grid_csv, write_summary,
    write_vtp,
};
use astrochop::plot::{PlotField, PlotOptions, render_porkchop};
use astrochop::transfer::{
    PorkchopError, PorkchopGridEngine, PorkchopOutcome, PorkchopRequest, PorkchopSettings,
    TimeWindow,
};
use clap::{ArgAction, Parser};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Sweep departure and arrival dates and report the minimum-C3 Lambert transfer.
#[derive(Parser, Debug)]
#[command(author, version, about = "Porkchop grid generator (heliocentric Lambert)")]
struct Cli {
    /// Departure body name (case-insensitive)
    #[arg(long)]
    from: String,

    /// Arrival body name (case-insensitive)
    #[arg(long)]
    to: String,

    /// Departure window start (YYYY-MM-DD)
    #[arg(long)]
    depart_start: String,

    /// Departure window end (YYYY-MM-DD)
    #[arg(long)]
    depart_end: String,

    /// Arrival window start (YYYY-MM-DD)
    #[arg(long)]
    arrive_start: String,

    /// Arrival window end (YYYY-MM-DD)
    #[arg(long)]
    arrive_end: String,

    /// Departure grid step in days
    #[arg(long, default_value_t = 5.0)]
    step_days: f64,

    /// Arrival grid step in days (defaults to --step-days)
    #[arg(long)]
    arrive_step_days: Option<f64>,

    /// Body catalog: a TOML file, a YAML list, or a directory of TOML files
    #[arg(long)]
    bodies: Option<PathBuf>,

    /// Run configuration (solver settings and grid limits), TOML or YAML
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory every artifact is written into
    #[arg(long, default_value = "artifacts")]
    output_dir: PathBuf,

    /// Write the grid as CSV
    #[arg(long, num_args = 0..=1, default_missing_value = "porkchop.csv")]
    csv: Option<PathBuf>,

    /// Write a JSON run summary
    #[arg(long, num_args = 0..=1, default_missing_value = "porkchop.json")]
    json: Option<PathBuf>,

    /// Render a PNG porkchop plot
    #[arg(long, num_args = 0..=1, default_missing_value = "porkchop.png")]
    plot: Option<PathBuf>,

    /// Write the C3 surface as a VTK PolyData mesh
    #[arg(long, num_args = 0..=1, default_missing_value = "porkchop.vtp")]
    mesh: Option<PathBuf>,

    /// Height transform for the mesh: linear, log_e or log_10
    #[arg(long, default_value = "linear")]
    morph: Morph,

    /// Vertical scale applied to morphed mesh heights
    #[arg(long, default_value_t = 1.0)]
    z_scale: f64,

    /// Raise log verbosity (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::from(exit_code(&err))
        }
    }
}

fn init_tracing(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        _ => EnvFilter::new("debug"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn exit_code(err: &anyhow::Error) -> u8 {
    match err.downcast_ref::<PorkchopError>() {
        Some(PorkchopError::NoFeasibleTransfer) => 2,
        Some(PorkchopError::GridSizeExceeded { .. }) => 3,
        _ => 1,
    }
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    let config = match &cli.config {
        Some(path) => load_run_config(path)
            .with_context(|| format!("loading run config {}", path.display()))?,
        None => RunConfig::default(),
    };
    let ephemeris = match &cli.bodies {
        Some(path) => MeanElementEphemeris::from_configs(
            &load_bodies(path).with_context(|| format!("loading bodies {}", path.display()))?,
        ),
        None => MeanElementEphemeris::builtin(),
    };

    let departure_window =
        TimeWindow::from_dates(&cli.depart_start, &cli.depart_end, cli.step_days)
            .context("departure window")?;
    let arrival_window = TimeWindow::from_dates(
        &cli.arrive_start,
        &cli.arrive_end,
        cli.arrive_step_days.unwrap_or(cli.step_days),
    )
    .context("arrival window")?;

    let engine = PorkchopGridEngine::heliocentric(&PorkchopSettings::from_config(&config))?;
    engine.check_size(departure_window.len(), arrival_window.len())?;

    let departures = departure_window.epochs();
    let arrivals = arrival_window.epochs();
    let outcome = engine.generate(
        &PorkchopRequest {
            departure_body: &cli.from,
            arrival_body: &cli.to,
            departure_epochs: &departures,
            arrival_epochs: &arrivals,
        },
        &ephemeris,
    )?;

    let summary = outcome.summary();
    println!(
        "Evaluated {} transfers ({} departures x {} arrivals)",
        summary.total,
        departures.len(),
        arrivals.len()
    );
    if summary.infeasible() > 0 {
        println!(
            "{} of {} transfers infeasible",
            summary.infeasible(),
            summary.total
        );
    }

    write_tabular_artifacts(cli, &outcome)?;
    let best = outcome.require_optimum()?;
    println!(
        "Minimum C3 {:.3} km^2/s^2: depart {} arrive {} ({:.1} days)",
        best.c3_km2_s2,
        format_julian_date(best.departure_jd),
        format_julian_date(best.arrival_jd),
        best.tof_days
    );
    println!(
        "  v-inf departure {:.3} km/s, arrival {:.3} km/s",
        best.vinf_departure_km_s, best.vinf_arrival_km_s
    );
    write_surface_artifacts(cli, &outcome)?;
    Ok(())
}

/// CSV and JSON are written even when no cell converged.
fn write_tabular_artifacts(cli: &Cli, outcome: &PorkchopOutcome) -> anyhow::Result<()> {
    if cli.csv.is_none() && cli.json.is_none() {
        return Ok(());
    }
    let guard = OutputGuard::new(&cli.output_dir)?;
    if let Some(path) = &cli.csv {
        let written = guard.write_atomic(path, "csv", |writer| {
            write_grid_csv(writer, &outcome.grid).map(|rows| info!(rows, "grid rows written"))
        })?;
        println!("CSV written to {}", written.display());
    }
    if let Some(path) = &cli.json {
        let summary = RunSummary::new(&cli.from, &cli.to, outcome);
        let written = guard.write_atomic(path, "json", |writer| write_summary(writer, &summary))?;
        println!("Summary written to {}", written.display());
    }
    Ok(())
}

fn write_surface_artifacts(cli: &Cli, outcome: &PorkchopOutcome) -> anyhow::Result<()> {
    if cli.plot.is_none() && cli.mesh.is_none() {
        return Ok(());
    }
    let guard = OutputGuard::new(&cli.output_dir)?;
    if let Some(path) = &cli.plot {
        let options = PlotOptions {
            title: format!("{} to {} C3", cli.from, cli.to),
            ..PlotOptions::default()
        };
        let written =
            render_porkchop(&PlotField::from_grid(&outcome.grid), path, &options, &guard)?;
        println!("Plot written to {}", written.display());
    }
    if let Some(path) = &cli.mesh {
        let surface = DataGrid::c3_surface(&outcome.grid);
        let mesh = PorkchopMesh::generate(&surface, cli.z_scale, cli.morph);
        let written = write_vtp(path, &mesh, &guard)?;
        println!("Mesh written to {}", written.display());
    }
    Ok(())
}
