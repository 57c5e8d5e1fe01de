use gravsim::simulation::diagnostics::{total_energy, total_momentum};
use gravsim::{Scenario, ScenarioConfig};

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;

#[derive(Parser, Debug)]
struct Args {
    /// Scenario file, looked up under `scenarios/` unless the path exists as given
    #[arg(short, default_value = "kepler.yaml")]
    file_name: String,

    /// Write the recorded history as JSON to this (new) file
    #[arg(short, long)]
    output: Option<PathBuf>,
}

// load here to keep main clean
fn load_scenario_from_yaml(file_name: &str) -> Result<ScenarioConfig> {
    let direct = PathBuf::from(file_name);
    let config_path = if direct.is_file() {
        direct
    } else {
        PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("scenarios")
            .join(file_name)
    };
    let file = File::open(&config_path)?;
    let reader = BufReader::new(file);
    Ok(ScenarioConfig::from_reader(reader)?)
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let scenario_cfg = load_scenario_from_yaml(&args.file_name)?;

    let Scenario {
        mut simulation,
        follow,
        report,
    } = Scenario::build_scenario(scenario_cfg)?;
    if !report.is_clean() {
        info!(rejected = report.rejected.len(), "some bodies were skipped");
    }

    simulation.run()?;

    let g = simulation.gravitational_constant();
    let history = simulation.history();
    if let (Some(first), Some(last)) = (history.first(), history.last()) {
        let p0 = total_momentum(&first.states);
        let p1 = total_momentum(&last.states);
        let e0 = total_energy(&first.states, g);
        let e1 = total_energy(&last.states, g);
        info!(
            momentum_drift = (p1 - p0).norm(),
            energy_drift = e1 - e0,
            "conservation check"
        );

        for (body, state) in simulation.bodies().iter().zip(&last.states) {
            info!(
                body = %body.id(),
                label = body.label().unwrap_or("-"),
                x = state.x.x,
                y = state.x.y,
                "final recorded position"
            );
        }
    }
    if let Some(index) = follow {
        info!(index, "camera follows body");
    }

    if let Some(path) = args.output {
        simulation.save_to_file(&path)?;
    }

    Ok(())
}
