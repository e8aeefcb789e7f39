use crate::{config::settings, error::ConnectorError, file::json::Orient};
use async_trait::async_trait;
use engine_core::{
    connectors::{Sink, SinkFactory},
    error::PluginError,
};
use model::{execution::step::ConfigMap, records::dataset::Dataset};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::info;

pub const KEY: &str = "json_local";

#[derive(Debug, Clone, Deserialize)]
pub struct JsonLocalSettings {
    pub output_path: PathBuf,
    #[serde(default)]
    pub orient: Orient,
    #[serde(default = "default_indent")]
    pub indent: usize,
}

fn default_indent() -> usize {
    2
}

pub struct JsonLocalSink {
    settings: JsonLocalSettings,
    ready: bool,
}

impl JsonLocalSink {
    pub fn new(settings: JsonLocalSettings) -> Self {
        JsonLocalSink {
            settings,
            ready: false,
        }
    }

    async fn prepare_dir(&mut self) -> Result<(), ConnectorError> {
        if let Some(parent) = self.settings.output_path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|e| ConnectorError::io(parent, e))?;
                info!(dir = %parent.display(), "Output directory ready");
            }
        }
        self.ready = true;
        Ok(())
    }

    fn render(&self, dataset: &Dataset) -> Result<Vec<u8>, ConnectorError> {
        let document = match self.settings.orient {
            Orient::Records => serde_json::Value::Array(dataset.to_records()),
            Orient::Columns => dataset.to_columns(),
        };

        if self.settings.indent == 0 {
            return Ok(serde_json::to_vec(&document)?);
        }

        let indent = vec![b' '; self.settings.indent];
        let formatter = serde_json::ser::PrettyFormatter::with_indent(&indent);
        let mut out = Vec::new();
        let mut serializer = serde_json::Serializer::with_formatter(&mut out, formatter);
        document.serialize(&mut serializer)?;
        Ok(out)
    }
}

#[async_trait]
impl Sink for JsonLocalSink {
    fn name(&self) -> &str {
        KEY
    }

    async fn connect(&mut self) -> Result<(), PluginError> {
        Ok(self.prepare_dir().await?)
    }

    async fn load(&mut self, dataset: &Dataset) -> Result<(), PluginError> {
        if !self.ready {
            self.prepare_dir().await?;
        }

        let body = self.render(dataset)?;
        let path = &self.settings.output_path;
        tokio::fs::write(path, body)
            .await
            .map_err(|e| ConnectorError::io(path, e))?;

        info!(
            rows = dataset.len(),
            path = %path.display(),
            orient = ?self.settings.orient,
            "Wrote JSON file"
        );
        Ok(())
    }
}

pub struct JsonLocalSinkFactory;

impl SinkFactory for JsonLocalSinkFactory {
    fn label(&self) -> &str {
        "JsonLocalSink"
    }

    fn create(&self, config: ConfigMap) -> Result<Box<dyn Sink>, PluginError> {
        Ok(Box::new(JsonLocalSink::new(settings(KEY, config)?)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::config_map;
    use engine_core::connectors::scoped_load;
    use serde_json::json;
    use std::fs;

    fn sample() -> Dataset {
        Dataset::from_json(json!([{"id": 1, "name": "a"}, {"id": 2, "name": null}])).unwrap()
    }

    #[tokio::test]
    async fn writes_records_into_new_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out/nested/users.json");

        let mut sink = JsonLocalSinkFactory
            .create(config_map(json!({"output_path": path})))
            .unwrap();
        scoped_load(sink.as_mut(), &sample()).await.unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("[\n  {"), "{text}");
        let written: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(
            written,
            json!([{"id": 1, "name": "a"}, {"id": 2, "name": null}])
        );
    }

    #[tokio::test]
    async fn honours_orient_and_indent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cols.json");

        let mut sink = JsonLocalSinkFactory
            .create(config_map(
                json!({"output_path": path, "orient": "columns", "indent": 0}),
            ))
            .unwrap();
        scoped_load(sink.as_mut(), &sample()).await.unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert!(!text.contains('\n'));
        let written: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(written["id"], json!({"0": 1, "1": 2}));
    }

    #[tokio::test]
    async fn load_without_connect_still_prepares_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("late/out.json");
        let mut sink = JsonLocalSinkFactory
            .create(config_map(json!({"output_path": path})))
            .unwrap();
        sink.load(&Dataset::default()).await.unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "[]");
    }
}
