use connectors::{
    file::{
        csv::source::{self as csv_source, CsvFileSourceFactory},
        json::{
            sink::{self as json_sink, JsonLocalSinkFactory},
            source::{self as json_source, JsonFileSourceFactory},
        },
    },
    http::{
        alpha_vantage::{self, AlphaVantageSourceFactory},
        rest::{self, RestApiSourceFactory},
    },
    schema::builtin::builtin_schemas,
    sql::postgres::sink::{self as postgres_sink, PostgresSinkFactory},
    transform::{
        cleaning::{self, DataCleaningFactory},
        indicators::{self, TechnicalIndicatorsFactory},
        pass_through::{self, PassThroughFactory},
        validation::{self, SchemaValidationFactory},
    },
};
use engine_core::{error::RegistryError, registry::Registry};
use std::sync::Arc;
use tracing::debug;

/// Builds the registry holding every built-in plugin, frozen behind an `Arc`.
pub fn builtin_registry() -> Result<Arc<Registry>, RegistryError> {
    let mut registry = Registry::new();
    register_builtins(&mut registry)?;
    Ok(Arc::new(registry))
}

/// Registers the built-in plugins into an existing registry, so callers can add their own
/// before freezing it.
pub fn register_builtins(registry: &mut Registry) -> Result<(), RegistryError> {
    registry.register_source(json_source::KEY, JsonFileSourceFactory)?;
    registry.register_source(csv_source::KEY, CsvFileSourceFactory)?;
    registry.register_source(rest::KEY, RestApiSourceFactory)?;
    registry.register_source(alpha_vantage::KEY, AlphaVantageSourceFactory)?;

    registry.register_transform(pass_through::KEY, PassThroughFactory)?;
    registry.register_transform(cleaning::KEY, DataCleaningFactory)?;
    registry.register_transform(validation::KEY, SchemaValidationFactory)?;
    registry.register_transform(indicators::KEY, TechnicalIndicatorsFactory)?;

    registry.register_sink(json_sink::KEY, JsonLocalSinkFactory)?;
    registry.register_sink(postgres_sink::KEY, PostgresSinkFactory)?;

    for (key, schema) in builtin_schemas() {
        registry.register_schema(key, schema)?;
    }

    debug!("Registered built-in plugins");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use engine_core::registry::Category;

    #[test]
    fn registers_every_builtin() {
        let registry = builtin_registry().unwrap();
        assert_eq!(
            registry.keys(Category::Source),
            vec!["alpha_vantage", "csv_file", "json_file", "rest_api"]
        );
        assert_eq!(
            registry.keys(Category::Transform),
            vec![
                "data_cleaning",
                "pass_through",
                "schema_validation",
                "technical_indicators"
            ]
        );
        assert_eq!(registry.keys(Category::Sink), vec!["json_local", "postgres"]);
        assert_eq!(registry.keys(Category::Schema), vec!["ohlcv", "todo", "user"]);
    }

    #[test]
    fn registering_twice_fails() {
        let mut registry = Registry::new();
        register_builtins(&mut registry).unwrap();
        let err = register_builtins(&mut registry).unwrap_err();
        assert!(matches!(err, RegistryError::Duplicate { .. }));
    }
}
