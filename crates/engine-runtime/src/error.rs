use engine_core::{
    error::{PluginError, RegistryError, StateError, ValidationError},
    registry::Category,
};
use model::execution::errors::ConfigError;
use thiserror::Error;

/// Why a pipeline run stopped. Every variant names the stage and plugin key it came from.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("Failed to construct {category} '{key}': {source}")]
    Construct {
        category: Category,
        key: String,
        #[source]
        source: PluginError,
    },

    #[error("Extract from source '{key}' failed: {source}")]
    Extract {
        key: String,
        #[source]
        source: PluginError,
    },

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Transform '{key}' failed: {source}")]
    Transform {
        key: String,
        #[source]
        source: PluginError,
    },

    #[error("Load into sink '{key}' failed: {source}")]
    Load {
        key: String,
        #[source]
        source: PluginError,
    },

    #[error("Failed to commit cursor: {0}")]
    State(#[from] StateError),
}
