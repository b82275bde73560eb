use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

use isobenefit::{Engine, ScenarioLoader, SnapshotWriter};

#[derive(Debug, Parser)]
#[command(author, version, about = "Isobenefit urban-growth simulator")]
struct Cli {
    /// Path to the scenario YAML file
    #[arg(long, default_value = "scenarios/small_city.yaml")]
    scenario: PathBuf,

    /// Override step count (uses scenario default when omitted)
    #[arg(long)]
    steps: Option<u64>,

    /// Override the random seed
    #[arg(long)]
    seed: Option<u64>,

    /// Override snapshot interval in steps
    #[arg(long)]
    snapshot_interval: Option<u64>,

    /// Directory for snapshots
    #[arg(long, default_value = "snapshots")]
    snapshot_dir: PathBuf,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let loader = ScenarioLoader::new(".");
    let mut scenario = loader.load(&cli.scenario)?;
    if let Some(steps) = cli.steps {
        scenario.n_steps = steps;
    }
    if let Some(seed) = cli.seed {
        scenario.random_seed = seed;
    }
    if let Some(interval) = cli.snapshot_interval {
        scenario.snapshot_interval_steps = interval;
    }

    let mut grid = scenario.build_grid();
    let writer = SnapshotWriter::new(&cli.snapshot_dir, scenario.snapshot_interval_steps);
    let name = scenario.name.clone();
    let mut engine = Engine::from_scenario(scenario).with_snapshot_writer(writer);
    let report = engine.run(&mut grid)?;

    println!(
        "Scenario '{}' completed after {} steps. Final population: {:.0}",
        name, report.steps_completed, report.final_population
    );
    Ok(())
}
