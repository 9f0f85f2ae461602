//! EcoSync headless demo
//!
//! Runs both engines for a few seconds and prints their final snapshots as JSON.

use std::process::ExitCode;
use std::time::Duration;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use ecosync::steps::SCAN_BONUS_POINTS;
use ecosync::{EcoResult, EnergyEngine, EnergyEngineConfig, StepEngine, StepEngineConfig};

/// Demo options
struct Options {
    /// How long the tickers run
    seconds: u64,
    /// Seed shared by both engines
    seed: Option<u64>,
    /// Goal to track
    goal: String,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            seconds: 5,
            seed: None,
            goal: "Mars".to_string(),
        }
    }
}

fn parse_args() -> Options {
    let args: Vec<String> = std::env::args().collect();
    let mut options = Options::default();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--seconds" | "-s" => {
                let Some(value) = args.get(i + 1) else {
                    eprintln!("error: --seconds requires a value");
                    std::process::exit(1);
                };
                options.seconds = value.parse().unwrap_or_else(|_| {
                    eprintln!("error: invalid number of seconds: {value}");
                    std::process::exit(1);
                });
                i += 2;
            }
            "--seed" => {
                let Some(value) = args.get(i + 1) else {
                    eprintln!("error: --seed requires a value");
                    std::process::exit(1);
                };
                options.seed = Some(value.parse().unwrap_or_else(|_| {
                    eprintln!("error: invalid seed: {value}");
                    std::process::exit(1);
                }));
                i += 2;
            }
            "--goal" | "-g" => {
                let Some(value) = args.get(i + 1) else {
                    eprintln!("error: --goal requires a value");
                    std::process::exit(1);
                };
                options.goal.clone_from(value);
                i += 2;
            }
            "--help" | "-h" => {
                println!("ecosync-demo - EcoSync headless demo");
                println!();
                println!("USAGE:");
                println!("    ecosync-demo [OPTIONS]");
                println!();
                println!("OPTIONS:");
                println!("    -s, --seconds <N>      How long to run the tickers [default: 5]");
                println!("        --seed <SEED>      Seed both engines for a reproducible run");
                println!("    -g, --goal <NAME>      Destination to track [default: Mars]");
                println!("    -h, --help             Print help information");
                std::process::exit(0);
            }
            other => {
                eprintln!("error: unknown argument: {other}");
                eprintln!("Run with --help for usage information");
                std::process::exit(1);
            }
        }
    }

    options
}

fn run(options: &Options) -> EcoResult<()> {
    let steps = StepEngine::new(StepEngineConfig {
        seed: options.seed,
        ..StepEngineConfig::default()
    })?;
    let energy = EnergyEngine::new(EnergyEngineConfig {
        seed: options.seed,
        ..EnergyEngineConfig::default()
    })?;

    steps.add_or_select_goal_by_name(&options.goal);
    steps.add_bonus_points(SCAN_BONUS_POINTS);
    steps.setup_demo_communities();

    steps.toggle_auto()?;
    energy.connect()?;
    info!(seconds = options.seconds, "engines running");

    let updates = energy.subscribe();
    std::thread::sleep(Duration::from_secs(options.seconds));
    energy.toggle("ev");
    let latest = updates.latest()?;
    info!(revision = latest.revision, net_watts = latest.net_watts(), "latest energy update");

    steps.toggle_auto()?;
    energy.disconnect();

    let step_json = serde_json::to_string_pretty(&*steps.snapshot()).unwrap_or_default();
    let energy_json = serde_json::to_string_pretty(&*energy.snapshot()).unwrap_or_default();
    println!("{step_json}");
    println!("{energy_json}");
    Ok(())
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let options = parse_args();
    match run(&options) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "demo failed");
            ExitCode::FAILURE
        }
    }
}
