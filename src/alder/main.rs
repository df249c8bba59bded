// Batch driver: repair and attribute a sewer network exported as GeoJSON.
//
// Reads a line layer and a point layer, runs the topology engine once, and
// writes a JSON report plus (optionally) the modified lines so they can be
// written back to the feature store.

mod geojson_io;

use anyhow::{Result, anyhow};
use chrono::Utc;
use clap::Parser;
use cloaca::snapping::SnapMode;
use cloaca::{Engine, EngineConfig};
use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;
use tracing::{info, warn};

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Line layer (GeoJSON FeatureCollection of LineStrings).
    #[arg(long, env = "SEWER_LINES")]
    lines: PathBuf,

    /// Point layer (GeoJSON FeatureCollection of Points).
    #[arg(long, env = "SEWER_POINTS")]
    points: Option<PathBuf>,

    /// Where to write the JSON report.
    #[arg(long, env = "REPORT_OUTPUT", default_value = "topology_report.json")]
    output: PathBuf,

    /// Where to write modified lines as GeoJSON.
    #[arg(long, env = "UPDATED_LINES_OUTPUT")]
    updated_lines: Option<PathBuf>,

    /// JSON file with engine settings. Flags below override it.
    #[arg(long, env = "TOPOLOGY_CONFIG")]
    config: Option<PathBuf>,

    #[arg(long, env = "XY_TOLERANCE")]
    xy_tolerance: Option<f64>,

    #[arg(long, env = "SNAP_TOLERANCE")]
    snap_tolerance: Option<f64>,

    #[arg(long, env = "POINT_TOLERANCE")]
    point_tolerance: Option<f64>,

    #[arg(long, env = "CONNECTION_TOLERANCE")]
    connection_tolerance: Option<f64>,

    /// disabled, point-features or line-endpoints
    #[arg(long, env = "SNAP_MODE")]
    snap_mode: Option<String>,

    #[arg(long, env = "PIPE_TYPE_FIELD")]
    pipe_type_field: Option<String>,

    /// Line attribute rolled up onto connected points.
    #[arg(long, env = "POINT_VALUE_FIELD")]
    point_value_field: Option<String>,

    #[arg(long, env = "ID_FIELD", default_value = "FACILITYID")]
    id_field: String,

    #[arg(long, env = "POINT_TYPE_FIELD", default_value = "FEATURE_DE")]
    point_type_field: String,
}

impl Args {
    fn engine_config(&self) -> Result<EngineConfig> {
        let mut config = match &self.config {
            Some(path) => EngineConfig::from_json_file(path)?,
            None => EngineConfig::default(),
        };

        if let Some(v) = self.xy_tolerance {
            config.xy_tolerance = v;
        }
        if let Some(v) = self.snap_tolerance {
            config.search_tolerance = v;
        }
        if let Some(v) = self.point_tolerance {
            config.point_tolerance = v;
        }
        if let Some(v) = self.connection_tolerance {
            config.connection_tolerance = v;
        }
        if let Some(mode) = &self.snap_mode {
            config.snap_mode = mode.parse::<SnapMode>().map_err(|e| anyhow!(e))?;
        }
        if let Some(field) = &self.pipe_type_field {
            config.pipe_type_field = field.clone();
        }
        if let Some(field) = &self.point_value_field {
            config.point_value_field = Some(field.clone());
        }
        Ok(config)
    }
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let args = Args::parse();
    let started = Utc::now();
    info!("Script started at: {}", started.format("%Y-%m-%d %H:%M:%S"));

    let config = args.engine_config()?;
    info!(
        "Snap mode {}, xy tolerance {}, snap tolerance {}, point tolerance {}",
        config.snap_mode, config.xy_tolerance, config.search_tolerance, config.point_tolerance
    );
    let engine = Engine::new(config)?;

    let lines = geojson_io::load_lines(
        &geojson_io::read_collection(&args.lines)?,
        &args.id_field,
    );
    let points = match &args.points {
        Some(path) => {
            geojson_io::load_points(
                &geojson_io::read_collection(path)?,
                &args.id_field,
                &args.point_type_field,
            )
        }
        None => {
            warn!("No point layer given; junction fields will be empty.");
            geojson_io::Layer {
                features: Vec::new(),
                skipped: Vec::new(),
            }
        }
    };
    for skipped in lines.skipped.iter().chain(&points.skipped) {
        warn!("Skipping feature {}: {}", skipped.id, skipped.reason);
    }

    let mut report = engine.run(lines.features.clone(), &points.features);
    // Features rejected by the loader come first in the skipped lists.
    let mut skipped_segments = lines.skipped;
    skipped_segments.append(&mut report.skipped_segments);
    report.skipped_segments = skipped_segments;
    let mut skipped_points = points.skipped;
    skipped_points.append(&mut report.skipped_points);
    report.skipped_points = skipped_points;

    let writer = BufWriter::new(File::create(&args.output)?);
    serde_json::to_writer_pretty(writer, &report)?;
    info!("Wrote report to {}", args.output.display());

    if let Some(path) = &args.updated_lines {
        let collection = geojson_io::updated_lines(&lines.features, &report)?;
        info!(
            "Writing {} modified lines to {}",
            collection.features.len(),
            path.display()
        );
        let writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer(writer, &geojson::GeoJson::FeatureCollection(collection))?;
    }

    let finished = Utc::now();
    info!("Script completed at: {}", finished.format("%Y-%m-%d %H:%M:%S"));
    info!(
        "Total runtime: {:.2} seconds",
        (finished - started).num_milliseconds() as f64 / 1000.0
    );

    Ok(())
}
