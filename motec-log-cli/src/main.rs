//! MoTeC Log Generator CLI
//!
//! Command-line boundary for the motec-log-core conversion pipeline. This
//! layer only parses arguments, initializes logging, assembles session
//! metadata, and surfaces the core's error messages verbatim; all
//! conversion logic lives in the library.

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use motec_log_core::{generate, GenerateRequest, LogType, SessionMetadata};
use std::path::PathBuf;

mod config;

/// MoTeC Log Generator - Convert telemetry logs to MoTeC .ld files
#[derive(Parser, Debug)]
#[command(name = "motec-log-cli")]
#[command(about = "Convert CAN/CSV/Accessport/MCAP telemetry logs to MoTeC .ld files", long_about = None)]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Verbosity level (can be repeated: -v, -vv, -vvv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Convert a telemetry log into a MoTeC .ld file
    Convert(ConvertArgs),
    /// Convert a CAN trace into a candump log replayable with canplayer
    Candump(CandumpArgs),
}

#[derive(clap::Args, Debug)]
struct ConvertArgs {
    /// Path to the input log file
    log: PathBuf,

    /// Input format: CAN, CSV, ACCESSPORT or MCAP
    log_type: LogType,

    /// Path to the DBC file (required for CAN logs)
    #[arg(long, value_name = "FILE")]
    dbc: Option<PathBuf>,

    /// Output file (default: the log path with an .ld extension)
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Output sample frequency in Hz
    #[arg(short, long, default_value_t = 20.0)]
    frequency: f64,

    /// Metadata TOML file; explicit flags below win over its values
    #[arg(long, value_name = "FILE")]
    metadata: Option<PathBuf>,

    #[arg(long)]
    driver: Option<String>,
    #[arg(long)]
    vehicle_id: Option<String>,
    #[arg(long)]
    vehicle_weight: Option<u32>,
    #[arg(long)]
    vehicle_type: Option<String>,
    #[arg(long)]
    vehicle_comment: Option<String>,
    #[arg(long)]
    venue_name: Option<String>,
    #[arg(long)]
    event_name: Option<String>,
    #[arg(long)]
    event_session: Option<String>,
    #[arg(long)]
    long_comment: Option<String>,
    #[arg(long)]
    short_comment: Option<String>,
}

#[derive(clap::Args, Debug)]
struct CandumpArgs {
    /// Path to the input CAN trace
    log: PathBuf,

    /// Output file (default: the log path with a .log extension)
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Input is a human-readable candump (-ta flavor) instead of a
    /// comma-separated trace
    #[arg(long)]
    normalize: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose, args.quiet);

    log::info!("MoTeC Log Generator CLI v{}", env!("CARGO_PKG_VERSION"));
    log::info!("Using core library v{}", motec_log_core::VERSION);

    match args.command {
        Command::Convert(convert) => run_convert(convert),
        Command::Candump(candump) => run_candump(candump),
    }
}

/// Run the full conversion pipeline
fn run_convert(args: ConvertArgs) -> Result<()> {
    if args.log_type == LogType::Can && args.dbc.is_none() {
        bail!("a DBC file is required for CAN logs (use --dbc)");
    }

    let mut metadata = SessionMetadata {
        driver: args.driver,
        vehicle_id: args.vehicle_id,
        vehicle_weight: args.vehicle_weight,
        vehicle_type: args.vehicle_type,
        vehicle_comment: args.vehicle_comment,
        venue_name: args.venue_name,
        event_name: args.event_name,
        event_session: args.event_session,
        long_comment: args.long_comment,
        short_comment: args.short_comment,
    };
    if let Some(metadata_path) = &args.metadata {
        metadata = config::merge(metadata, config::load_metadata_file(metadata_path)?);
    }

    let output_path = args
        .output
        .unwrap_or_else(|| default_output(&args.log, "ld"));

    let request = GenerateRequest {
        log_path: args.log,
        log_type: args.log_type,
        dbc_path: args.dbc,
        output_path,
        frequency_hz: args.frequency,
        metadata,
    };

    let written = generate(&request)?;
    println!("Done! Output: {}", written.display());
    Ok(())
}

/// Run the candump trace conversion
fn run_candump(args: CandumpArgs) -> Result<()> {
    let output = args
        .output
        .unwrap_or_else(|| default_output(&args.log, "log"));

    let frames = if args.normalize {
        motec_log_core::trace::normalize_candump(&args.log, &output)?
    } else {
        motec_log_core::trace::trace_to_candump(&args.log, &output)?
    };

    println!("Wrote {} frames to {}", frames, output.display());
    Ok(())
}

/// Default output path: same directory and stem as the input
fn default_output(log_path: &PathBuf, extension: &str) -> PathBuf {
    log_path.with_extension(extension)
}

/// Initialize logging based on verbosity level
fn init_logging(verbose: u8, quiet: bool) {
    use env_logger::Builder;
    use log::LevelFilter;
    use std::io::Write;

    let level = if quiet {
        LevelFilter::Error
    } else {
        match verbose {
            0 => LevelFilter::Warn,
            1 => LevelFilter::Info,
            2 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    };

    Builder::new()
        .filter_level(level)
        .format(|buf, record| {
            writeln!(
                buf,
                "[{} {}] {}",
                record.level(),
                record.target(),
                record.args()
            )
        })
        .init();
}
