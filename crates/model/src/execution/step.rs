use crate::execution::errors::ConfigError;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf};

pub type ConfigMap = serde_json::Map<String, serde_json::Value>;

/// Where a step's plugin configuration comes from: a YAML/JSON file, an inline mapping, or both.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StepConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config_file: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inline_config: Option<ConfigMap>,
}

impl StepConfig {
    pub fn is_empty(&self) -> bool {
        self.config_file.is_none() && self.inline_config.is_none()
    }

    /// Resolves the effective configuration. Inline keys override keys read from the file.
    pub fn merged(&self) -> Result<ConfigMap, ConfigError> {
        let from_file = match &self.config_file {
            Some(path) => read_config_file(path)?,
            None => ConfigMap::new(),
        };
        Ok(merge(from_file, self.inline_config.as_ref()))
    }
}

pub fn merge(mut base: ConfigMap, overlay: Option<&ConfigMap>) -> ConfigMap {
    if let Some(overlay) = overlay {
        for (key, value) in overlay {
            base.insert(key.clone(), value.clone());
        }
    }
    base
}

fn read_config_file(path: &PathBuf) -> Result<ConfigMap, ConfigError> {
    let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.clone(),
        source,
    })?;
    if text.trim().is_empty() {
        return Ok(ConfigMap::new());
    }

    // YAML is a superset of JSON, so one parser covers both file kinds.
    let parsed: serde_json::Value =
        serde_yaml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.clone(),
            source,
        })?;

    match parsed {
        serde_json::Value::Null => Ok(ConfigMap::new()),
        serde_json::Value::Object(map) => Ok(map),
        _ => Err(ConfigError::NotAMapping(path.clone())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;

    fn map(value: serde_json::Value) -> ConfigMap {
        match value {
            serde_json::Value::Object(m) => m,
            _ => unreachable!(),
        }
    }

    #[test]
    fn inline_overrides_file() {
        let merged = merge(map(json!({"x": 1, "y": 2})), Some(&map(json!({"y": 3}))));
        assert_eq!(serde_json::Value::Object(merged), json!({"x": 1, "y": 3}));
    }

    #[test]
    fn reads_yaml_file_and_overlays_inline() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "file_path: data.json\norient: records").unwrap();

        let step = StepConfig {
            config_file: Some(file.path().to_path_buf()),
            inline_config: Some(map(json!({"orient": "columns"}))),
        };

        let merged = step.merged().unwrap();
        assert_eq!(merged["file_path"], json!("data.json"));
        assert_eq!(merged["orient"], json!("columns"));
    }

    #[test]
    fn empty_file_is_empty_config() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let step = StepConfig {
            config_file: Some(file.path().to_path_buf()),
            inline_config: None,
        };
        assert!(step.merged().unwrap().is_empty());
    }

    #[test]
    fn list_file_is_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "- 1\n- 2").unwrap();
        let step = StepConfig {
            config_file: Some(file.path().to_path_buf()),
            inline_config: None,
        };
        assert!(matches!(step.merged(), Err(ConfigError::NotAMapping(_))));
    }

    #[test]
    fn missing_file_is_read_error() {
        let step = StepConfig {
            config_file: Some(PathBuf::from("/nonexistent/ferry/config.yaml")),
            inline_config: None,
        };
        assert!(matches!(step.merged(), Err(ConfigError::Read { .. })));
    }
}
