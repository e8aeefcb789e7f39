use engine_core::error::PluginError;
use model::records::error::DatasetError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConnectorError {
    /// The step configuration does not fit the plugin.
    #[error("Invalid configuration for {plugin}: {message}")]
    InvalidConfig { plugin: String, message: String },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// An API that reports failures inside a successful response body.
    #[error("{service} API error: {message}")]
    Api { service: String, message: String },

    #[error("Postgres error: {0}")]
    Postgres(#[from] tokio_postgres::Error),

    #[error("TLS error: {0}")]
    Tls(#[from] native_tls::Error),

    #[error("Dataset error: {0}")]
    Dataset(#[from] DatasetError),

    /// Data that cannot be written or interpreted as requested.
    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("{0} used before connect")]
    NotConnected(String),
}

impl ConnectorError {
    pub fn invalid_config(plugin: &str, message: impl Into<String>) -> Self {
        ConnectorError::InvalidConfig {
            plugin: plugin.to_string(),
            message: message.into(),
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ConnectorError::Io {
            path: path.into(),
            source,
        }
    }
}

impl From<ConnectorError> for PluginError {
    fn from(err: ConnectorError) -> Self {
        PluginError::External(Box::new(err))
    }
}
