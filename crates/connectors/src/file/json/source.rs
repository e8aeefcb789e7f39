use crate::{config::settings, error::ConnectorError, file::json::Orient};
use async_trait::async_trait;
use engine_core::{
    connectors::{Source, SourceFactory},
    error::PluginError,
};
use model::{execution::step::ConfigMap, records::dataset::Dataset};
use serde::Deserialize;
use std::path::PathBuf;
use tracing::info;

pub const KEY: &str = "json_file";

#[derive(Debug, Clone, Deserialize)]
pub struct JsonFileSettings {
    pub file_path: PathBuf,
    #[serde(default)]
    pub orient: Orient,
}

pub struct JsonFileSource {
    settings: JsonFileSettings,
}

impl JsonFileSource {
    pub fn new(settings: JsonFileSettings) -> Self {
        JsonFileSource { settings }
    }

    async fn read(&self) -> Result<Dataset, ConnectorError> {
        let path = &self.settings.file_path;
        let text = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| ConnectorError::io(path, e))?;
        let document: serde_json::Value = serde_json::from_str(&text)?;

        let dataset = match self.settings.orient {
            Orient::Records => Dataset::from_json(document)?,
            Orient::Columns => Dataset::from_json_columns(document)?,
        };
        Ok(dataset)
    }
}

#[async_trait]
impl Source for JsonFileSource {
    fn name(&self) -> &str {
        KEY
    }

    async fn extract(&mut self) -> Result<Dataset, PluginError> {
        info!(path = %self.settings.file_path.display(), orient = ?self.settings.orient, "Reading JSON file");
        let dataset = self.read().await?;
        info!(
            rows = dataset.len(),
            columns = dataset.columns().len(),
            path = %self.settings.file_path.display(),
            "Loaded JSON file"
        );
        Ok(dataset)
    }
}

pub struct JsonFileSourceFactory;

impl SourceFactory for JsonFileSourceFactory {
    fn label(&self) -> &str {
        "JsonFileSource"
    }

    fn create(&self, config: ConfigMap) -> Result<Box<dyn Source>, PluginError> {
        Ok(Box::new(JsonFileSource::new(settings(KEY, config)?)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::config_map;
    use engine_core::connectors::scoped_extract;
    use serde_json::json;
    use std::fs;

    #[tokio::test]
    async fn reads_records_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("todos.json");
        fs::write(&path, r#"[{"id": 1, "title": "a"}, {"id": 2, "title": "b"}]"#).unwrap();

        let mut source = JsonFileSourceFactory
            .create(config_map(json!({"file_path": path})))
            .unwrap();
        let dataset = scoped_extract(source.as_mut()).await.unwrap();

        assert_eq!(dataset.len(), 2);
        assert_eq!(dataset.columns(), &["id", "title"]);
    }

    #[tokio::test]
    async fn reads_columns_orient() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cols.json");
        fs::write(&path, r#"{"id": {"0": 1, "1": 2}}"#).unwrap();

        let mut source = JsonFileSourceFactory
            .create(config_map(json!({"file_path": path, "orient": "columns"})))
            .unwrap();
        let dataset = source.extract().await.unwrap();
        assert_eq!(dataset.to_records(), vec![json!({"id": 1}), json!({"id": 2})]);
    }

    #[tokio::test]
    async fn missing_file_is_an_error() {
        let mut source = JsonFileSourceFactory
            .create(config_map(json!({"file_path": "/nonexistent/ferry.json"})))
            .unwrap();
        assert!(source.extract().await.is_err());
    }

    #[test]
    fn requires_file_path() {
        assert!(JsonFileSourceFactory.create(config_map(json!({}))).is_err());
    }
}
