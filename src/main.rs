//! `precip-report`: resolves the GFS window around a point, downloads it and
//! writes it as CSV, either step by step or as accumulated totals per cell.

use std::path::PathBuf;

use clap::Parser;
use gfs_window::{
    bucket_steps, CsvRenderer, ForecastError, GfsWindowError, LatLon, Lattice, ModelRun,
    NomadsClient, Renderer, WindowHalfWidths, DEFAULT_SAMPLING_INTERVAL_HOURS,
    GFS_PRECIP_BUCKET_HOURS,
};
use log::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "precip-report")]
#[command(about = "Accumulated GFS precipitation around a point of interest")]
struct Args {
    /// Latitude of the point of interest
    #[arg(long, env = "GFS_WINDOW_LAT", default_value_t = -19.78753, allow_hyphen_values = true)]
    lat: f64,

    /// Longitude of the point of interest, either -180..180 or 0..360
    #[arg(long, env = "GFS_WINDOW_LON", default_value_t = -51.98899, allow_hyphen_values = true)]
    lon: f64,

    /// Model id on the data server
    #[arg(long, env = "GFS_WINDOW_MODEL", default_value = "gfs_0p50")]
    model: String,

    /// Forecast variable
    #[arg(long, env = "GFS_WINDOW_VARIABLE", default_value = "apcpsfc")]
    variable: String,

    /// Hours ahead of the run start (default: last available step)
    #[arg(long, env = "GFS_WINDOW_HOURS")]
    hours: Option<f64>,

    /// Model run id such as gfs20240115/gfs_0p50_06z (default: latest run)
    #[arg(long, env = "GFS_WINDOW_RUN")]
    run: Option<String>,

    /// Lattice resolution in degrees
    #[arg(long, env = "GFS_WINDOW_RESOLUTION", default_value_t = 0.5)]
    resolution: f64,

    /// Window half-width in longitude cells
    #[arg(long, default_value_t = 12)]
    half_width_lon: u32,

    /// Window half-width in latitude cells
    #[arg(long, default_value_t = 14)]
    half_width_lat: u32,

    /// CSV output path
    #[arg(short, long, env = "GFS_WINDOW_OUTPUT", default_value = "precip.csv")]
    output: PathBuf,

    /// Directory for cached subsets
    #[arg(long, env = "GFS_WINDOW_CACHE_DIR")]
    cache_dir: Option<PathBuf>,

    /// Write one accumulated total per cell instead of every forecast step
    #[arg(long)]
    accumulate: bool,

    /// Length of the model's precipitation accumulation buckets in hours
    #[arg(long, env = "GFS_WINDOW_BUCKET_HOURS", default_value_t = GFS_PRECIP_BUCKET_HOURS)]
    bucket_hours: f64,

    /// Do not read or write the subset cache
    #[arg(long)]
    no_cache: bool,

    /// Print the resolved request as JSON and exit without downloading
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> Result<(), GfsWindowError> {
    pretty_env_logger::formatted_builder()
        .parse_filters(&std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()))
        .init();
    let args = Args::parse();

    let lattice = Lattice::new(args.resolution)?;
    let model_run = args
        .run
        .as_deref()
        .map(|run_id| {
            ModelRun::parse_run_id(&args.model, run_id).ok_or_else(|| {
                ForecastError::InvalidRequest(format!(
                    "'{}' is not a run id of {}",
                    run_id, args.model
                ))
            })
        })
        .transpose()?;

    let client = NomadsClient::nomads()
        .lattice(lattice)
        .maybe_cache_folder(args.cache_dir)
        .disable_cache(args.no_cache)
        .call()
        .await?;

    let request = client
        .request()
        .poi(LatLon(args.lat, args.lon))
        .model_id(&args.model)
        .variable(&args.variable)
        .maybe_model_run(model_run)
        .maybe_hours(args.hours)
        .half_widths(WindowHalfWidths::new(args.half_width_lon, args.half_width_lat))
        .call()
        .await?;

    if args.dry_run {
        match serde_json::to_string_pretty(&request) {
            Ok(json) => println!("{}", json),
            Err(e) => warn!("Could not serialize request: {}", e),
        }
        return Ok(());
    }

    let grid = client.fetch(&request).await?;
    let steps_per_bucket = bucket_steps(args.bucket_hours, DEFAULT_SAMPLING_INTERVAL_HOURS);
    match grid.accumulated(steps_per_bucket).stats() {
        Some(stats) => info!(
            "Accumulated {} over {} cells: min {:.2}, max {:.2}, mean {:.2}",
            grid.variable, stats.valid_count, stats.min, stats.max, stats.mean
        ),
        None => warn!("No valid {} values in the fetched window", grid.variable),
    }

    let renderer = CsvRenderer::builder()
        .path(args.output)
        .maybe_bucket_steps(args.accumulate.then_some(steps_per_bucket))
        .build();
    let path = renderer.render(&grid)?;
    println!("{}", path.display());
    Ok(())
}
