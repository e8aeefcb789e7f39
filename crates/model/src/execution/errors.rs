use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Invalid pipeline definition: {0}")]
    Definition(#[from] serde_yaml::Error),

    #[error("{0} must contain a mapping at the top level")]
    NotAMapping(PathBuf),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Missing required property: {0}")]
    MissingProperty(String),
}
