use crate::error::ConnectorError;
use model::execution::step::ConfigMap;
use serde::de::DeserializeOwned;

/// Deserializes a merged step configuration into the plugin's typed settings.
pub fn settings<T: DeserializeOwned>(plugin: &str, config: ConfigMap) -> Result<T, ConnectorError> {
    serde_json::from_value(serde_json::Value::Object(config))
        .map_err(|err| ConnectorError::invalid_config(plugin, err.to_string()))
}

/// Renders a scalar config value the way it appears in a URL or a query string.
pub fn scalar_to_string(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::Null => None,
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Bool(b) => Some(b.to_string()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
pub(crate) fn config_map(value: serde_json::Value) -> ConfigMap {
    match value {
        serde_json::Value::Object(map) => map,
        other => panic!("expected a JSON object, got {other}"),
    }
}
