use crate::{
    error::{PluginError, ValidationError},
    registry::Registry,
};
use model::{execution::step::ConfigMap, records::dataset::Dataset};

/// A synchronous, pure step over a materialized dataset.
pub trait Transform: Send + Sync {
    fn name(&self) -> &str;

    /// Checks preconditions on the input. Never retried; a failure aborts the run.
    fn validate(&self, _dataset: &Dataset) -> Result<(), ValidationError> {
        Ok(())
    }

    fn transform(&self, dataset: &Dataset) -> Result<Dataset, PluginError>;
}

pub trait TransformFactory: Send + Sync {
    fn label(&self) -> &str;

    /// Transforms receive the registry so they can resolve collaborators such as schemas.
    fn create(
        &self,
        config: ConfigMap,
        registry: &Registry,
    ) -> Result<Box<dyn Transform>, PluginError>;
}
