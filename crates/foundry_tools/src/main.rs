//! Foundry - Development Tools

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use foundry_core::prelude::BlueprintRegistry;
use foundry_tools::scenario::{self, Scenario};
use foundry_tools::validate;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "foundry-tools")]
#[command(about = "Development tools for the Foundry building queue")]
struct Cli {
    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a queue config and optionally a blueprint list
    Validate {
        /// Path to the queue config
        #[arg(default_value = "data/queue.ron")]
        config: PathBuf,
        /// Path to a blueprint list
        #[arg(long)]
        blueprints: Option<PathBuf>,
        /// Game speed to load the blueprints with
        #[arg(long, default_value_t = 1)]
        game_speed: u32,
    },
    /// Replay a scenario and print its report as JSON
    Run {
        /// Path to the scenario
        scenario: PathBuf,
        /// Blueprint list to use instead of the standard one
        #[arg(long)]
        blueprints: Option<PathBuf>,
        /// Write the report here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() {
    let cli = Cli::parse();

    // Initialize tracing
    let default_level = if cli.verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            tracing_subscriber::EnvFilter::builder()
                .with_default_directive(default_level.into())
                .from_env_lossy(),
        )
        .init();

    match cli.command {
        Commands::Validate {
            config,
            blueprints,
            game_speed,
        } => {
            tracing::info!("Validating config: {}", config.display());
            if let Err(e) = validate::validate_config_file(&config) {
                tracing::error!("Validation failed: {e}");
                std::process::exit(1);
            }
            if let Some(path) = blueprints {
                tracing::info!("Validating blueprints: {}", path.display());
                if let Err(e) = validate::validate_blueprints_file(&path, game_speed) {
                    tracing::error!("Validation failed: {e}");
                    std::process::exit(1);
                }
            }
            tracing::info!("Validation passed");
        }
        Commands::Run {
            scenario,
            blueprints,
            output,
        } => {
            if let Err(e) = run(&scenario, blueprints.as_deref(), output.as_deref()) {
                tracing::error!("Scenario failed: {e}");
                std::process::exit(1);
            }
        }
    }
}

fn run(
    path: &Path,
    blueprints: Option<&Path>,
    output: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let scenario = Scenario::load(path)?;
    let registry = match blueprints {
        Some(blueprints) => validate::validate_blueprints_file(blueprints, scenario.game_speed)?,
        None => BlueprintRegistry::standard(),
    };
    let report = scenario::run_with(&scenario, registry)?;
    tracing::info!(
        steps = report.steps.len(),
        rejected = report.rejected(),
        "Scenario finished"
    );

    let json = report.to_json()?;
    match output {
        Some(output) => std::fs::write(output, json)?,
        None => println!("{json}"),
    }
    Ok(())
}
