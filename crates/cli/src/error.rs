use engine_core::error::RegistryError;
use engine_runtime::error::PipelineError;
use model::execution::errors::ConfigError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("Invalid pipeline configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("Pipeline run failed: {0}")]
    Pipeline(#[from] PipelineError),

    #[error("Invalid env file: {0}")]
    Env(String),

    #[error("Failed to start the async runtime: {0}")]
    Runtime(#[source] std::io::Error),

    #[error("Failed to initialize logging: {0}")]
    Logging(String),
}
