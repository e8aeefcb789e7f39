use crate::error::PluginError;
use async_trait::async_trait;
use model::{execution::step::ConfigMap, records::dataset::Dataset};
use tracing::warn;

#[async_trait]
pub trait Sink: Send {
    fn name(&self) -> &str;

    async fn connect(&mut self) -> Result<(), PluginError> {
        Ok(())
    }

    async fn load(&mut self, dataset: &Dataset) -> Result<(), PluginError>;

    async fn disconnect(&mut self) -> Result<(), PluginError> {
        Ok(())
    }
}

pub trait SinkFactory: Send + Sync {
    fn label(&self) -> &str;

    fn create(&self, config: ConfigMap) -> Result<Box<dyn Sink>, PluginError>;
}

/// Same teardown contract as [`scoped_extract`](super::source::scoped_extract).
pub async fn scoped_load(sink: &mut dyn Sink, dataset: &Dataset) -> Result<(), PluginError> {
    let result = match sink.connect().await {
        Ok(()) => sink.load(dataset).await,
        Err(err) => Err(err),
    };

    match (result, sink.disconnect().await) {
        (Ok(()), teardown) => teardown,
        (Err(err), Ok(())) => Err(err),
        (Err(err), Err(teardown)) => {
            warn!(sink = sink.name(), error = %teardown, "Disconnect failed after load error");
            Err(err)
        }
    }
}
