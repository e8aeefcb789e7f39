use crate::{
    execution::{errors::ConfigError, step::StepConfig},
    state::cursor::CursorValue,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Top-level document of a pipeline definition file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default = "default_version")]
    pub version: String,
    pub pipeline: PipelineDefinition,
    #[serde(default)]
    pub settings: PipelineSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineDefinition {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub extract: ExtractStep,
    #[serde(default)]
    pub transform: Vec<TransformStep>,
    pub load: LoadStep,
    #[serde(default)]
    pub incremental: Option<IncrementalConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractStep {
    pub source: String,
    #[serde(flatten)]
    pub config: StepConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformStep {
    pub name: String,
    #[serde(flatten)]
    pub config: StepConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadStep {
    pub destination: String,
    #[serde(flatten)]
    pub config: StepConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncrementalConfig {
    pub cursor_field: String,
    pub cursor_param: String,
    #[serde(default)]
    pub initial_value: Option<CursorValue>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineSettings {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub retry: RetrySettings,
    #[serde(default = "default_state_file")]
    pub state_file: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrySettings {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_backoff_seconds")]
    pub backoff_seconds: f64,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        PipelineSettings {
            log_level: default_log_level(),
            retry: RetrySettings::default(),
            state_file: default_state_file(),
        }
    }
}

impl Default for RetrySettings {
    fn default() -> Self {
        RetrySettings {
            max_attempts: default_max_attempts(),
            backoff_seconds: default_backoff_seconds(),
        }
    }
}

fn default_version() -> String {
    "1.0".to_string()
}

fn default_log_level() -> String {
    "INFO".to_string()
}

fn default_state_file() -> PathBuf {
    PathBuf::from("state.json")
}

fn default_max_attempts() -> u32 {
    3
}

fn default_backoff_seconds() -> f64 {
    2.0
}

impl PipelineConfig {
    /// Parses and validates a YAML definition.
    pub fn from_yaml_str(source: &str) -> Result<Self, ConfigError> {
        let config: PipelineConfig = serde_yaml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let pipeline = &self.pipeline;
        if pipeline.name.trim().is_empty() {
            return Err(ConfigError::MissingProperty("pipeline.name".to_string()));
        }

        if pipeline.extract.source.trim().is_empty() {
            return Err(ConfigError::MissingProperty(
                "pipeline.extract.source".to_string(),
            ));
        }
        if pipeline.extract.config.is_empty() {
            return Err(ConfigError::Invalid(
                "extract step needs config_file or inline_config".to_string(),
            ));
        }

        for (idx, step) in pipeline.transform.iter().enumerate() {
            if step.name.trim().is_empty() {
                return Err(ConfigError::MissingProperty(format!(
                    "pipeline.transform[{idx}].name"
                )));
            }
        }

        if pipeline.load.destination.trim().is_empty() {
            return Err(ConfigError::MissingProperty(
                "pipeline.load.destination".to_string(),
            ));
        }
        if pipeline.load.config.is_empty() {
            return Err(ConfigError::Invalid(
                "load step needs config_file or inline_config".to_string(),
            ));
        }

        if let Some(incremental) = &pipeline.incremental {
            if incremental.cursor_field.trim().is_empty() {
                return Err(ConfigError::MissingProperty(
                    "pipeline.incremental.cursor_field".to_string(),
                ));
            }
            if incremental.cursor_param.trim().is_empty() {
                return Err(ConfigError::MissingProperty(
                    "pipeline.incremental.cursor_param".to_string(),
                ));
            }
        }

        let retry = &self.settings.retry;
        if retry.max_attempts < 1 {
            return Err(ConfigError::Invalid(
                "settings.retry.max_attempts must be at least 1".to_string(),
            ));
        }
        if !retry.backoff_seconds.is_finite() || retry.backoff_seconds < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "settings.retry.backoff_seconds must be a non-negative number, got {}",
                retry.backoff_seconds
            )));
        }

        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.pipeline.name
    }
}
