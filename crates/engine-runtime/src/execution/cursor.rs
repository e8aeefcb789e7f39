use engine_core::state::CursorStore;
use model::{
    execution::{errors::ConfigError, pipeline::IncrementalConfig, step::ConfigMap},
    records::dataset::Dataset,
    state::cursor::CursorValue,
};
use std::cmp::Ordering;
use tracing::{info, warn};

/// Cursor to extract from: the stored one, else `initial_value`. Full refresh ignores the store.
pub fn resolve_cursor(
    pipeline: &str,
    incremental: &IncrementalConfig,
    store: &dyn CursorStore,
    full_refresh: bool,
) -> Option<CursorValue> {
    if full_refresh {
        info!(pipeline, "Full refresh requested, ignoring stored cursor");
        return incremental.initial_value.clone();
    }
    match store.get(pipeline) {
        Some(stored) => {
            info!(pipeline, cursor = %stored, "Resuming from stored cursor");
            Some(stored)
        }
        None => incremental.initial_value.clone(),
    }
}

/// Sets `query_params.<param>` in a merged source configuration.
pub fn inject_cursor(
    config: &mut ConfigMap,
    param: &str,
    cursor: &CursorValue,
) -> Result<(), ConfigError> {
    let params = config
        .entry("query_params")
        .or_insert_with(|| serde_json::Value::Object(ConfigMap::new()));
    if params.is_null() {
        *params = serde_json::Value::Object(ConfigMap::new());
    }
    match params {
        serde_json::Value::Object(map) => {
            map.insert(param.to_string(), cursor.to_json());
            Ok(())
        }
        other => Err(ConfigError::Invalid(format!(
            "query_params must be a mapping to receive the cursor, got {other}"
        ))),
    }
}

/// Maximum non-missing value of `field`, or `None` (with a warning) when no cursor can be taken.
pub fn next_cursor(pipeline: &str, dataset: &Dataset, field: &str) -> Option<CursorValue> {
    if dataset.is_empty() {
        warn!(pipeline, "Extracted dataset is empty, cursor not updated");
        return None;
    }
    if !dataset.has_column(field) {
        warn!(pipeline, cursor_field = field, "Cursor field not found in dataset, cursor not updated");
        return None;
    }

    let mut best: Option<CursorValue> = None;
    for value in dataset.column(field) {
        let Some(candidate) = CursorValue::from_value(value) else {
            continue;
        };
        best = match best {
            None => Some(candidate),
            Some(current) => match candidate.compare(&current) {
                Some(Ordering::Greater) => Some(candidate),
                Some(_) => Some(current),
                None => {
                    warn!(
                        pipeline,
                        cursor_field = field,
                        left = %current,
                        right = %candidate,
                        "Cursor values are not comparable, cursor not updated"
                    );
                    return None;
                }
            },
        };
    }

    if best.is_none() {
        warn!(pipeline, cursor_field = field, "Cursor field holds only nulls, cursor not updated");
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use engine_core::error::StateError;
    use serde_json::json;
    use std::{collections::HashMap, sync::Mutex};
    use tracing_test::traced_test;

    #[derive(Default)]
    struct MemoryStore(Mutex<HashMap<String, CursorValue>>);

    impl CursorStore for MemoryStore {
        fn get(&self, pipeline: &str) -> Option<CursorValue> {
            self.0.lock().unwrap().get(pipeline).cloned()
        }

        fn save(&self, pipeline: &str, value: &CursorValue) -> Result<(), StateError> {
            self.0.lock().unwrap().insert(pipeline.to_string(), value.clone());
            Ok(())
        }
    }

    fn incremental(initial: Option<CursorValue>) -> IncrementalConfig {
        IncrementalConfig {
            cursor_field: "id".to_string(),
            cursor_param: "since_id".to_string(),
            initial_value: initial,
        }
    }

    #[test]
    fn stored_cursor_wins_unless_full_refresh() {
        let store = MemoryStore::default();
        store.save("p", &CursorValue::Int(999)).unwrap();
        let inc = incremental(Some(CursorValue::Int(0)));

        assert_eq!(resolve_cursor("p", &inc, &store, false), Some(CursorValue::Int(999)));
        assert_eq!(resolve_cursor("p", &inc, &store, true), Some(CursorValue::Int(0)));
        assert_eq!(resolve_cursor("other", &inc, &store, false), Some(CursorValue::Int(0)));
        assert_eq!(resolve_cursor("other", &incremental(None), &store, false), None);
    }

    #[test]
    fn injects_into_existing_or_new_query_params() {
        let mut config = ConfigMap::new();
        inject_cursor(&mut config, "since_id", &CursorValue::Int(5)).unwrap();
        assert_eq!(config["query_params"], json!({"since_id": 5}));

        let mut config = match json!({"query_params": {"limit": 10}}) {
            serde_json::Value::Object(map) => map,
            _ => unreachable!(),
        };
        inject_cursor(&mut config, "since_id", &CursorValue::from("a")).unwrap();
        assert_eq!(config["query_params"], json!({"limit": 10, "since_id": "a"}));
    }

    #[test]
    fn non_map_query_params_is_a_config_error() {
        let mut config = ConfigMap::new();
        config.insert("query_params".to_string(), json!("page=1"));
        let err = inject_cursor(&mut config, "since_id", &CursorValue::Int(1)).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn takes_maximum_ignoring_nulls() {
        let ds = Dataset::from_json(json!([{"id": 3}, {"id": null}, {"id": 20}, {"id": 7}])).unwrap();
        assert_eq!(next_cursor("p", &ds, "id"), Some(CursorValue::Int(20)));

        let ds = Dataset::from_json(json!([{"ts": "2024-01-02"}, {"ts": "2024-03-01"}])).unwrap();
        assert_eq!(next_cursor("p", &ds, "ts"), Some(CursorValue::from("2024-03-01")));
    }

    #[test]
    #[traced_test]
    fn skips_with_warning() {
        let ds = Dataset::from_json(json!([{"id": 1}])).unwrap();
        assert_eq!(next_cursor("p", &ds, "missing"), None);
        assert!(logs_contain("Cursor field not found"));

        let nulls = Dataset::from_json(json!([{"id": null}])).unwrap();
        assert_eq!(next_cursor("p", &nulls, "id"), None);
        assert!(logs_contain("only nulls"));

        let mixed = Dataset::from_json(json!([{"id": 1}, {"id": "x"}])).unwrap();
        assert_eq!(next_cursor("p", &mixed, "id"), None);
        assert!(logs_contain("not comparable"));

        assert_eq!(next_cursor("p", &Dataset::default(), "id"), None);
        assert!(logs_contain("dataset is empty"));
    }
}
