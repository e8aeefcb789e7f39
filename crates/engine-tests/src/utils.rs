use async_trait::async_trait;
use engine_core::{
    connectors::{Sink, SinkFactory, Source, SourceFactory, Transform, TransformFactory},
    error::{PluginError, ValidationError},
    registry::Registry,
};
use model::{
    core::value::Value,
    execution::step::ConfigMap,
    records::dataset::Dataset,
};
use std::sync::{
    Arc, Mutex,
    atomic::{AtomicUsize, Ordering},
};

/// Shared record of everything the fixture plugins saw during a run.
#[derive(Default, Clone)]
pub struct Probe {
    events: Arc<Mutex<Vec<String>>>,
    source_configs: Arc<Mutex<Vec<ConfigMap>>>,
    loaded: Arc<Mutex<Vec<Dataset>>>,
    extract_attempts: Arc<AtomicUsize>,
    transform_calls: Arc<AtomicUsize>,
}

impl Probe {
    pub fn new() -> Self {
        Self::default()
    }

    fn event(&self, event: impl Into<String>) {
        self.events.lock().unwrap().push(event.into());
    }

    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    pub fn count(&self, event: &str) -> usize {
        self.events().iter().filter(|e| *e == event).count()
    }

    /// Configurations handed to the memory source factory, one per constructed instance.
    pub fn source_configs(&self) -> Vec<ConfigMap> {
        self.source_configs.lock().unwrap().clone()
    }

    pub fn last_query_param(&self, name: &str) -> Option<serde_json::Value> {
        self.source_configs()
            .last()
            .and_then(|c| c.get("query_params"))
            .and_then(|q| q.get(name))
            .cloned()
    }

    pub fn loaded(&self) -> Vec<Dataset> {
        self.loaded.lock().unwrap().clone()
    }

    pub fn transform_calls(&self) -> usize {
        self.transform_calls.load(Ordering::SeqCst)
    }
}

fn flag(config: &ConfigMap, key: &str) -> bool {
    config.get(key).and_then(|v| v.as_bool()).unwrap_or(false)
}

/// Emits the `rows` array from its config. `fail_times` failing extracts come first,
/// counted across instances; `fail_always` never succeeds.
pub struct MemorySource {
    probe: Probe,
    rows: serde_json::Value,
    fail_times: usize,
    fail_always: bool,
}

#[async_trait]
impl Source for MemorySource {
    fn name(&self) -> &str {
        "memory"
    }

    async fn connect(&mut self) -> Result<(), PluginError> {
        self.probe.event("source.connect");
        Ok(())
    }

    async fn extract(&mut self) -> Result<Dataset, PluginError> {
        self.probe.event("source.extract");
        let attempt = self.probe.extract_attempts.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_always || attempt <= self.fail_times {
            return Err(PluginError::Other(format!("extract attempt {attempt} failed")));
        }
        Dataset::from_json(self.rows.clone()).map_err(|e| PluginError::Other(e.to_string()))
    }

    async fn disconnect(&mut self) -> Result<(), PluginError> {
        self.probe.event("source.disconnect");
        Ok(())
    }
}

pub struct MemorySourceFactory {
    probe: Probe,
}

impl MemorySourceFactory {
    pub fn new(probe: &Probe) -> Self {
        Self {
            probe: probe.clone(),
        }
    }
}

impl SourceFactory for MemorySourceFactory {
    fn label(&self) -> &str {
        "MemorySource"
    }

    fn create(&self, config: ConfigMap) -> Result<Box<dyn Source>, PluginError> {
        self.probe.source_configs.lock().unwrap().push(config.clone());
        Ok(Box::new(MemorySource {
            probe: self.probe.clone(),
            rows: config
                .get("rows")
                .cloned()
                .unwrap_or(serde_json::Value::Array(Vec::new())),
            fail_times: config
                .get("fail_times")
                .and_then(|v| v.as_u64())
                .unwrap_or(0) as usize,
            fail_always: flag(&config, "fail_always"),
        }))
    }
}

/// Appends its `tag` to the `trail` column of every row.
pub struct TagTransform {
    probe: Probe,
    tag: String,
}

impl Transform for TagTransform {
    fn name(&self) -> &str {
        "tag"
    }

    fn transform(&self, dataset: &Dataset) -> Result<Dataset, PluginError> {
        self.probe.event(format!("transform:{}", self.tag));
        self.probe.transform_calls.fetch_add(1, Ordering::SeqCst);
        let mut out = dataset.clone();
        out.add_column("trail");
        out.map_column("trail", |value| {
            let prefix = value.as_str().unwrap_or_default();
            Value::String(format!("{prefix}{}", self.tag))
        });
        Ok(out)
    }
}

pub struct TagTransformFactory {
    probe: Probe,
}

impl TagTransformFactory {
    pub fn new(probe: &Probe) -> Self {
        Self {
            probe: probe.clone(),
        }
    }
}

impl TransformFactory for TagTransformFactory {
    fn label(&self) -> &str {
        "TagTransform"
    }

    fn create(
        &self,
        config: ConfigMap,
        _registry: &Registry,
    ) -> Result<Box<dyn Transform>, PluginError> {
        let tag = config
            .get("tag")
            .and_then(|v| v.as_str())
            .ok_or_else(|| PluginError::Other("tag is required".to_string()))?;
        Ok(Box::new(TagTransform {
            probe: self.probe.clone(),
            tag: tag.to_string(),
        }))
    }
}

/// Always fails validation.
pub struct RejectingTransform {
    probe: Probe,
}

impl Transform for RejectingTransform {
    fn name(&self) -> &str {
        "rejecting"
    }

    fn validate(&self, _dataset: &Dataset) -> Result<(), ValidationError> {
        self.probe.event("rejecting.validate");
        Err(ValidationError::new("rejecting", "input is never good enough"))
    }

    fn transform(&self, dataset: &Dataset) -> Result<Dataset, PluginError> {
        self.probe.transform_calls.fetch_add(1, Ordering::SeqCst);
        Ok(dataset.clone())
    }
}

pub struct RejectingTransformFactory {
    probe: Probe,
}

impl RejectingTransformFactory {
    pub fn new(probe: &Probe) -> Self {
        Self {
            probe: probe.clone(),
        }
    }
}

impl TransformFactory for RejectingTransformFactory {
    fn label(&self) -> &str {
        "RejectingTransform"
    }

    fn create(
        &self,
        _config: ConfigMap,
        _registry: &Registry,
    ) -> Result<Box<dyn Transform>, PluginError> {
        Ok(Box::new(RejectingTransform {
            probe: self.probe.clone(),
        }))
    }
}

/// Keeps every loaded dataset in the probe, or fails every load with `fail_always`.
pub struct RecordingSink {
    probe: Probe,
    fail_always: bool,
}

#[async_trait]
impl Sink for RecordingSink {
    fn name(&self) -> &str {
        "recording"
    }

    async fn connect(&mut self) -> Result<(), PluginError> {
        self.probe.event("sink.connect");
        Ok(())
    }

    async fn load(&mut self, dataset: &Dataset) -> Result<(), PluginError> {
        self.probe.event("sink.load");
        if self.fail_always {
            return Err(PluginError::Other("sink unavailable".to_string()));
        }
        self.probe.loaded.lock().unwrap().push(dataset.clone());
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<(), PluginError> {
        self.probe.event("sink.disconnect");
        Ok(())
    }
}

pub struct RecordingSinkFactory {
    probe: Probe,
}

impl RecordingSinkFactory {
    pub fn new(probe: &Probe) -> Self {
        Self {
            probe: probe.clone(),
        }
    }
}

impl SinkFactory for RecordingSinkFactory {
    fn label(&self) -> &str {
        "RecordingSink"
    }

    fn create(&self, config: ConfigMap) -> Result<Box<dyn Sink>, PluginError> {
        Ok(Box::new(RecordingSink {
            probe: self.probe.clone(),
            fail_always: flag(&config, "fail_always"),
        }))
    }
}
