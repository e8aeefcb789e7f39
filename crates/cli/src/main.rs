use crate::{env::EnvManager, error::CliError};
use clap::Parser;
use commands::Commands;
use engine_core::registry::Registry;
use engine_runtime::{PipelineEngine, builtin_registry, load_config};
use model::execution::pipeline::PipelineConfig;
use std::process::ExitCode;
use tracing::{error, info};

mod commands;
mod env;
mod error;
mod logging;
mod output;

#[derive(Parser)]
#[command(
    name = "ferry",
    version,
    about = "Configuration-driven batch ETL pipelines"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err}");
            eprintln!("Error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    // The environment must be complete before any thread is spawned.
    let mut env = EnvManager::new();
    env.load_optional(".env")?;
    env.apply();

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(CliError::Runtime)?;

    match cli.command {
        Commands::Run {
            config,
            full_refresh,
        } => runtime.block_on(async {
            let config = load_config(&config).await?;
            logging::init(&config.settings.log_level)?;

            let engine = PipelineEngine::new(builtin_registry()?);
            let summary = engine.run(&config, full_refresh).await?;
            info!("{summary}");
            Ok::<(), CliError>(())
        }),
        Commands::List => {
            let registry = builtin_registry()?;
            output::print_registry(&registry);
            Ok(())
        }
        Commands::Validate { config } => runtime.block_on(async {
            logging::init("INFO")?;
            let config = load_config(&config).await?;
            let registry = builtin_registry()?;
            check_references(&config, &registry)?;
            println!("{}: OK", config.name());
            Ok::<(), CliError>(())
        }),
    }
}

/// Resolves every plugin key and step configuration the definition references.
fn check_references(config: &PipelineConfig, registry: &Registry) -> Result<(), CliError> {
    let pipeline = &config.pipeline;

    registry.resolve_source(&pipeline.extract.source)?;
    pipeline.extract.config.merged()?;

    for step in &pipeline.transform {
        registry.resolve_transform(&step.name)?;
        step.config.merged()?;
    }

    registry.resolve_sink(&pipeline.load.destination)?;
    pipeline.load.config.merged()?;

    info!(
        pipeline = config.name(),
        transforms = pipeline.transform.len(),
        "Pipeline definition is valid"
    );
    Ok(())
}
