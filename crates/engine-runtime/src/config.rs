use model::execution::{errors::ConfigError, pipeline::PipelineConfig};
use std::path::Path;
use tracing::debug;

/// Reads, parses and validates a pipeline definition file.
pub async fn load_config(path: impl AsRef<Path>) -> Result<PipelineConfig, ConfigError> {
    let path = path.as_ref();
    let source = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

    let config: PipelineConfig =
        serde_yaml::from_str(&source).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
    config.validate()?;

    debug!(path = %path.display(), pipeline = config.name(), "Loaded pipeline definition");
    Ok(config)
}
