use crate::{config::settings, error::ConnectorError};
use engine_core::{
    connectors::{RecordSchema, Transform, TransformFactory},
    error::PluginError,
    registry::Registry,
};
use model::{execution::step::ConfigMap, records::dataset::Dataset};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, warn};

pub const KEY: &str = "schema_validation";

#[derive(Debug, Clone, Deserialize)]
pub struct ValidationSettings {
    pub model: String,
    #[serde(default)]
    pub strict: bool,
}

/// Drops rows that do not satisfy a registered [`RecordSchema`]. Never fails on bad rows.
pub struct SchemaValidation {
    model: String,
    schema: Arc<dyn RecordSchema>,
    strict: bool,
}

impl SchemaValidation {
    pub fn new(settings: ValidationSettings, registry: &Registry) -> Result<Self, ConnectorError> {
        let schema = registry
            .resolve_schema(&settings.model)
            .map_err(|err| ConnectorError::invalid_config(KEY, err.to_string()))?;
        Ok(SchemaValidation {
            model: settings.model,
            schema,
            strict: settings.strict,
        })
    }
}

impl Transform for SchemaValidation {
    fn name(&self) -> &str {
        KEY
    }

    fn transform(&self, dataset: &Dataset) -> Result<Dataset, PluginError> {
        if dataset.is_empty() {
            info!(transform = KEY, "Input dataset is empty, nothing to validate");
            return Ok(dataset.clone());
        }

        let total = dataset.len();
        let mut valid = Dataset::new(dataset.columns().to_vec(), Vec::new());
        for (idx, row) in dataset.rows().iter().enumerate() {
            match self.schema.check(row, self.strict) {
                Ok(()) => valid.push(row.clone()),
                Err(violations) => warn!(
                    transform = KEY,
                    model = %self.model,
                    row = idx,
                    "Row failed validation: {}",
                    violations.join("; ")
                ),
            }
        }

        info!(
            transform = KEY,
            model = %self.model,
            passed = valid.len(),
            total,
            dropped = total - valid.len(),
            "Validation complete"
        );
        Ok(valid)
    }
}

pub struct SchemaValidationFactory;

impl TransformFactory for SchemaValidationFactory {
    fn label(&self) -> &str {
        "SchemaValidationTransform"
    }

    fn create(
        &self,
        config: ConfigMap,
        registry: &Registry,
    ) -> Result<Box<dyn Transform>, PluginError> {
        let settings: ValidationSettings = settings(KEY, config)?;
        Ok(Box::new(SchemaValidation::new(settings, registry)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::config_map, schema::builtin};
    use serde_json::json;
    use tracing_test::traced_test;

    fn registry() -> Registry {
        let mut registry = Registry::new();
        registry.register_schema("user", builtin::user()).unwrap();
        registry
    }

    fn validator(config: serde_json::Value) -> Box<dyn Transform> {
        SchemaValidationFactory
            .create(config_map(config), &registry())
            .unwrap()
    }

    #[test]
    #[traced_test]
    fn drops_invalid_rows_and_keeps_columns() {
        let input = Dataset::from_json(json!([
            {"id": 1, "name": "Alice", "email": "alice@example.com", "extra": "x"},
            {"id": 2, "name": "", "email": "bob@example.com", "extra": "y"},
            {"id": "3", "name": "Carol", "email": "carol@example.com", "extra": null},
        ]))
        .unwrap();

        let out = validator(json!({"model": "user"})).transform(&input).unwrap();
        assert_eq!(out.columns(), input.columns());
        assert_eq!(out.len(), 2);
        assert!(logs_contain("Row failed validation"));

        let strict = validator(json!({"model": "user", "strict": true}))
            .transform(&input)
            .unwrap();
        assert_eq!(strict.len(), 1);
    }

    #[test]
    fn empty_input_is_returned_as_is() {
        let input = Dataset::new(vec!["id".to_string()], Vec::new());
        let out = validator(json!({"model": "user"})).transform(&input).unwrap();
        assert_eq!(out, input);
    }

    #[test]
    fn unknown_model_fails_at_construction() {
        let err = SchemaValidationFactory
            .create(config_map(json!({"model": "invoice"})), &registry())
            .err()
            .unwrap();
        let msg = err.to_string();
        assert!(msg.contains("invoice"), "{msg}");
        assert!(msg.contains("user"), "{msg}");
    }

    #[test]
    fn all_rows_invalid_yields_empty_dataset_with_columns() {
        let input = Dataset::from_json(json!([{"id": 0, "name": "x", "email": "nope"}])).unwrap();
        let out = validator(json!({"model": "user"})).transform(&input).unwrap();
        assert!(out.is_empty());
        assert_eq!(out.columns(), &["id", "name", "email"]);
    }
}
