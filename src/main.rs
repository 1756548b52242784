use clap::Parser;
use color_eyre::eyre::WrapErr;
use color_eyre::Result;
use env_logger::Env;
use log::info;
use std::fs;
use std::path::PathBuf;

use nodewatch::config::{self, AggregatorConfig};
use nodewatch::events::read_event_log;
use nodewatch::replay::replay;
use nodewatch::report::{build_report, generate_json_report, generate_text_report};

/// Telemetry aggregation core for blockchain node networks
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the captured telemetry event log (one JSON event per line)
    #[arg(short, long)]
    events: PathBuf,

    /// Output directory for replay reports
    #[arg(short, long, default_value = "telemetry_output")]
    output: PathBuf,

    /// Optional aggregator configuration YAML file
    #[arg(short, long)]
    config: Option<PathBuf>,
}

fn main() -> Result<()> {
    // Initialize error handling
    color_eyre::install()?;

    // Parse command-line arguments
    let args = Args::parse();

    // Initialize logging with default filter level of "info"
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    info!("Starting nodewatch telemetry replay");
    info!("Event log: {:?}", args.events);
    info!("Output directory: {:?}", args.output);

    let config = match &args.config {
        Some(path) => config::load_config(path)?,
        None => {
            info!("No configuration file given, using defaults");
            AggregatorConfig::default()
        }
    };
    info!(
        "Staleness threshold: {:?}, sweep cadence: {:?}",
        config.staleness_threshold, config.sweep_interval
    );

    let events = read_event_log(&args.events)
        .wrap_err_with(|| format!("Failed to read event log '{}'", args.events.display()))?;
    info!("Loaded {} events", events.len());

    let outcome = replay(config, &events);
    info!(
        "Replay complete: {} applied, {} rejected, best height {}, {} node(s) live, {} swept",
        outcome.events_applied,
        outcome.events_rejected,
        outcome.aggregator.height(),
        outcome.aggregator.node_count(),
        outcome.swept.len()
    );

    fs::create_dir_all(&args.output)
        .wrap_err_with(|| format!("Failed to create output directory '{}'", args.output.display()))?;

    let report = build_report(&outcome, &args.events.display().to_string());
    generate_json_report(&report, &args.output.join("report.json"))?;
    generate_text_report(&report, &args.output.join("report.txt"))?;

    info!("Replay reports written to {:?}", args.output);
    Ok(())
}
