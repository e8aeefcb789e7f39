use crate::{
    error::PipelineError,
    execution::{
        cursor::{inject_cursor, next_cursor, resolve_cursor},
        summary::RunSummary,
    },
};
use engine_core::{
    connectors::{scoped_extract, scoped_load},
    registry::{Category, Registry},
    retry::RetryPolicy,
    state::{CursorStore, JsonCursorStore},
};
use model::{
    execution::pipeline::{PipelineConfig, TransformStep},
    records::dataset::Dataset,
    state::cursor::CursorValue,
};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};

/// Drives one pipeline definition through extract, transform and load.
///
/// The engine only reaches plugins through its registry. Each run is a linear sequence of
/// awaited steps; the cursor is committed after, and only after, a successful load.
#[derive(Debug, Clone)]
pub struct PipelineEngine {
    registry: Arc<Registry>,
}

impl PipelineEngine {
    pub fn new(registry: Arc<Registry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Runs with cursor state kept in `settings.state_file`.
    pub async fn run(
        &self,
        config: &PipelineConfig,
        full_refresh: bool,
    ) -> Result<RunSummary, PipelineError> {
        let store = JsonCursorStore::new(&config.settings.state_file);
        self.run_with_store(config, &store, full_refresh).await
    }

    pub async fn run_with_store(
        &self,
        config: &PipelineConfig,
        store: &dyn CursorStore,
        full_refresh: bool,
    ) -> Result<RunSummary, PipelineError> {
        let definition = &config.pipeline;
        let name = definition.name.as_str();
        let policy = RetryPolicy::from(&config.settings.retry);

        info!(
            pipeline = name,
            source = %definition.extract.source,
            transforms = definition.transform.len(),
            sink = %definition.load.destination,
            full_refresh,
            "Starting pipeline run"
        );

        let cursor_used = definition
            .incremental
            .as_ref()
            .and_then(|inc| resolve_cursor(name, inc, store, full_refresh));

        // Extract
        let dataset = self
            .extract(config, cursor_used.as_ref(), &policy)
            .await?;
        let rows_extracted = dataset.len();
        info!(pipeline = name, rows = rows_extracted, "Extracted dataset");

        let next = definition
            .incremental
            .as_ref()
            .and_then(|inc| next_cursor(name, &dataset, &inc.cursor_field));

        // Transform
        let mut dataset = dataset;
        for step in &definition.transform {
            dataset = self.apply_transform(step, dataset)?;
        }

        // Load
        self.load(config, &dataset, &policy).await?;
        let rows_loaded = dataset.len();
        info!(pipeline = name, rows = rows_loaded, "Loaded dataset");

        // Commit
        if let Some(cursor) = &next {
            store.save(name, cursor)?;
            info!(pipeline = name, cursor = %cursor, "Committed cursor");
        } else if definition.incremental.is_some() {
            warn!(pipeline = name, "No new cursor to commit");
        }

        let summary = RunSummary {
            pipeline: name.to_string(),
            rows_extracted,
            rows_loaded,
            cursor_used,
            committed_cursor: next,
        };
        info!("Pipeline run complete: {summary}");
        Ok(summary)
    }

    async fn extract(
        &self,
        config: &PipelineConfig,
        cursor: Option<&CursorValue>,
        policy: &RetryPolicy,
    ) -> Result<Dataset, PipelineError> {
        let step = &config.pipeline.extract;
        let key = step.source.as_str();
        let factory = self.registry.resolve_source(key)?;

        let mut source_config = step.config.merged()?;
        if let (Some(inc), Some(cursor)) = (&config.pipeline.incremental, cursor) {
            inject_cursor(&mut source_config, &inc.cursor_param, cursor)?;
            info!(source = key, param = %inc.cursor_param, cursor = %cursor, "Injected cursor");
        }

        // The first instance is built up front so configuration errors surface without retries.
        let first = factory
            .create(source_config.clone())
            .map_err(|source| PipelineError::Construct {
                category: Category::Source,
                key: key.to_string(),
                source,
            })?;
        let slot = Mutex::new(Some(first));

        let (slot, factory, source_config) = (&slot, &factory, &source_config);
        let label = format!("extract:{key}");
        policy
            .run(&label, || async move {
                let taken = slot.lock().await.take();
                let mut source = match taken {
                    Some(source) => source,
                    None => factory.create(source_config.clone())?,
                };
                scoped_extract(source.as_mut()).await
            })
            .await
            .map_err(|source| PipelineError::Extract {
                key: key.to_string(),
                source,
            })
    }

    fn apply_transform(
        &self,
        step: &TransformStep,
        dataset: Dataset,
    ) -> Result<Dataset, PipelineError> {
        let key = step.name.as_str();
        let factory = self.registry.resolve_transform(key)?;
        let transform_config = step.config.merged()?;
        let transform = factory
            .create(transform_config, &self.registry)
            .map_err(|source| PipelineError::Construct {
                category: Category::Transform,
                key: key.to_string(),
                source,
            })?;

        transform.validate(&dataset)?;

        let rows_in = dataset.len();
        let output = transform
            .transform(&dataset)
            .map_err(|source| PipelineError::Transform {
                key: key.to_string(),
                source,
            })?;
        info!(transform = key, rows_in, rows_out = output.len(), "Applied transform");
        Ok(output)
    }

    async fn load(
        &self,
        config: &PipelineConfig,
        dataset: &Dataset,
        policy: &RetryPolicy,
    ) -> Result<(), PipelineError> {
        let step = &config.pipeline.load;
        let key = step.destination.as_str();
        let factory = self.registry.resolve_sink(key)?;
        let sink_config = step.config.merged()?;

        let first = factory
            .create(sink_config.clone())
            .map_err(|source| PipelineError::Construct {
                category: Category::Sink,
                key: key.to_string(),
                source,
            })?;
        let slot = Mutex::new(Some(first));

        let (slot, factory, sink_config) = (&slot, &factory, &sink_config);
        let label = format!("load:{key}");
        policy
            .run(&label, || async move {
                let taken = slot.lock().await.take();
                let mut sink = match taken {
                    Some(sink) => sink,
                    None => factory.create(sink_config.clone())?,
                };
                scoped_load(sink.as_mut(), dataset).await
            })
            .await
            .map_err(|source| PipelineError::Load {
                key: key.to_string(),
                source,
            })
    }
}
