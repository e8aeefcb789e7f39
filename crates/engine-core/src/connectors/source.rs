use crate::error::PluginError;
use async_trait::async_trait;
use model::{execution::step::ConfigMap, records::dataset::Dataset};
use tracing::warn;

/// Reads one full dataset from an external system.
///
/// An instance lives for exactly one extract attempt. `connect` and `disconnect` default to
/// no-ops for sources that hold no resources.
#[async_trait]
pub trait Source: Send {
    fn name(&self) -> &str;

    async fn connect(&mut self) -> Result<(), PluginError> {
        Ok(())
    }

    async fn extract(&mut self) -> Result<Dataset, PluginError>;

    async fn disconnect(&mut self) -> Result<(), PluginError> {
        Ok(())
    }
}

pub trait SourceFactory: Send + Sync {
    /// Human readable description shown by `ferry list`.
    fn label(&self) -> &str;

    fn create(&self, config: ConfigMap) -> Result<Box<dyn Source>, PluginError>;
}

/// Runs connect, extract and disconnect. Disconnect runs even when connect or extract failed;
/// its own error only surfaces when extraction succeeded.
pub async fn scoped_extract(source: &mut dyn Source) -> Result<Dataset, PluginError> {
    let result = match source.connect().await {
        Ok(()) => source.extract().await,
        Err(err) => Err(err),
    };

    match (result, source.disconnect().await) {
        (Ok(dataset), Ok(())) => Ok(dataset),
        (Ok(_), Err(teardown)) => Err(teardown),
        (Err(err), Ok(())) => Err(err),
        (Err(err), Err(teardown)) => {
            warn!(source = source.name(), error = %teardown, "Disconnect failed after extract error");
            Err(err)
        }
    }
}
