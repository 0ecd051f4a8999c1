//! Command line front end for the curve linearizer
//!
//! Reads features as JSON Lines (one `{"id", "geometry", "properties"}`
//! object per line, geometry as base64 WKB), linearizes every geometry and
//! writes the surviving features in the same format.
//!
//! Usage:
//!   linearize <input.jsonl|-> <output.jsonl|-> [options]
//!
//! Examples:
//!   linearize parcels.jsonl parcels_linear.jsonl --tolerance 0.5
//!   cat curves.jsonl | linearize - - -v

use anyhow::{Context, Result};
use clap::Parser;
use curve_linearizer::{
    linearize_features, read_features, write_features, BatchOptions, ChildTolerance, LinearizeOptions,
    Linearizer, WkbByteOrder, DEFAULT_TOLERANCE,
};
use std::fs::File;
use std::io::{self, BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "linearize")]
#[command(author, version, about = "Convert curved geometries to linear equivalents", long_about = None)]
struct Cli {
    /// Input features (JSON Lines), `-` for stdin
    input: PathBuf,

    /// Output features (JSON Lines), `-` for stdout
    output: PathBuf,

    /// Maximum deviation between an arc and its chords
    #[arg(short, long, default_value_t = DEFAULT_TOLERANCE)]
    tolerance: f64,

    /// Tolerance for nested geometries (defaults to --tolerance)
    #[arg(long)]
    child_tolerance: Option<f64>,

    /// Angular step of the best-effort flatten passes, in degrees
    #[arg(long, default_value_t = curve_linearizer::linearize::DEFAULT_FLATTEN_STEP_DEGREES)]
    flatten_step: f64,

    /// Write big endian WKB instead of little endian
    #[arg(long)]
    big_endian: bool,

    /// Process features one at a time
    #[arg(long)]
    sequential: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn init_logging(verbose: bool) -> Result<()> {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(io::stderr)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

fn is_stdio(path: &Path) -> bool {
    path.as_os_str() == "-"
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose)?;

    let options = LinearizeOptions {
        tolerance: cli.tolerance,
        child_tolerance: cli.child_tolerance.map_or(ChildTolerance::Inherit, ChildTolerance::Fixed),
        flatten_step_degrees: cli.flatten_step,
    };
    let linearizer = Linearizer::with_options(options).context("invalid linearization options")?;
    debug!(
        "Tolerance {} (children: {:?}, flatten step {} degrees)",
        linearizer.tolerance(),
        linearizer.options().child_tolerance,
        linearizer.options().flatten_step_degrees
    );

    let start = Instant::now();
    let features = if is_stdio(&cli.input) {
        read_features(io::stdin().lock())?
    } else {
        let file = File::open(&cli.input).with_context(|| format!("failed to open {}", cli.input.display()))?;
        read_features(BufReader::new(file)).with_context(|| format!("failed to read {}", cli.input.display()))?
    };
    info!("Read {} features in {:.2}ms", features.len(), start.elapsed().as_secs_f64() * 1000.0);

    let batch_options = BatchOptions {
        byte_order: if cli.big_endian { WkbByteOrder::BigEndian } else { WkbByteOrder::LittleEndian },
        parallel: !cli.sequential,
        ..BatchOptions::default()
    };
    let start = Instant::now();
    let output = linearize_features(features, &linearizer, &batch_options);
    info!("Linearized in {:.2}ms", start.elapsed().as_secs_f64() * 1000.0);

    if is_stdio(&cli.output) {
        write_features(io::stdout().lock(), &output.features)?;
    } else {
        let file = File::create(&cli.output).with_context(|| format!("failed to create {}", cli.output.display()))?;
        write_features(BufWriter::new(file), &output.features)
            .with_context(|| format!("failed to write {}", cli.output.display()))?;
    }

    eprintln!("{}", output.report);
    Ok(())
}
