use engine_core::{
    connectors::{Transform, TransformFactory},
    error::PluginError,
    registry::Registry,
};
use model::{execution::step::ConfigMap, records::dataset::Dataset};
use tracing::debug;

pub const KEY: &str = "pass_through";

pub struct PassThrough;

impl Transform for PassThrough {
    fn name(&self) -> &str {
        KEY
    }

    fn transform(&self, dataset: &Dataset) -> Result<Dataset, PluginError> {
        debug!(rows = dataset.len(), "pass_through");
        Ok(dataset.clone())
    }
}

pub struct PassThroughFactory;

impl TransformFactory for PassThroughFactory {
    fn label(&self) -> &str {
        "PassThroughTransform"
    }

    fn create(
        &self,
        _config: ConfigMap,
        _registry: &Registry,
    ) -> Result<Box<dyn Transform>, PluginError> {
        Ok(Box::new(PassThrough))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn returns_equal_copy() {
        let input = Dataset::from_json(json!([{"a": 1}, {"a": null}])).unwrap();
        let transform = PassThroughFactory
            .create(ConfigMap::new(), &Registry::new())
            .unwrap();
        assert_eq!(transform.transform(&input).unwrap(), input);
    }
}
