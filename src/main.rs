use std::{fs, path::PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use menagerie::{
    events::{Fanout, LogFileSink, TracingSink},
    rng::SeededRandom,
    ScenarioLoader, Simulation, SimulationConfig,
};

#[derive(Debug, Parser)]
#[command(author, version, about = "Predator, prey and hunter simulation")]
struct Cli {
    /// Scenario YAML file (built-in zoo when omitted)
    #[arg(long)]
    scenario: Option<PathBuf>,

    /// Override step count
    #[arg(long)]
    steps: Option<u64>,

    /// Override random seed
    #[arg(long)]
    seed: Option<u64>,

    /// Event log path (overrides the scenario's logging.event_log)
    #[arg(long, conflicts_with = "no_event_log")]
    event_log: Option<PathBuf>,

    /// Do not write an event log file
    #[arg(long)]
    no_event_log: bool,

    /// Also write the final report as JSON
    #[arg(long)]
    report_json: Option<PathBuf>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = match &cli.scenario {
        Some(path) => ScenarioLoader::new(".").load(path)?,
        None => SimulationConfig::zoo(),
    };
    config.steps = config.steps(cli.steps);
    if let Some(seed) = cli.seed {
        config.seed = seed;
    }
    init_tracing(&config.logging.level);

    let mut sink = Fanout::new().with_sink(TracingSink);
    let event_log = if cli.no_event_log {
        None
    } else {
        cli.event_log.clone().or_else(|| config.logging.event_log.clone())
    };
    if let Some(path) = &event_log {
        sink = sink.with_sink(LogFileSink::create(path, config.logging.level()?)?);
    }

    info!(
        scenario = %config.name,
        seed = config.seed,
        steps = config.steps,
        "starting simulation"
    );
    let mut simulation = Simulation::from_config(&config, SeededRandom::new(config.seed), sink)?;
    let report = simulation.run()?;

    print!("{report}");
    if let Some(path) = &cli.report_json {
        let json = serde_json::to_string_pretty(&report)?;
        fs::write(path, json)
            .with_context(|| format!("Failed to write report {}", path.display()))?;
    }
    Ok(())
}

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
