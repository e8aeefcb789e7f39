#[cfg(test)]
mod tests {
    use crate::{fixture_registry, parse_pipeline, state_store, utils::Probe};
    use engine_core::{
        error::RegistryError,
        state::CursorStore,
    };
    use engine_runtime::{PipelineEngine, error::PipelineError};
    use model::state::cursor::CursorValue;
    use serde_json::json;
    use tempfile::tempdir;
    use tracing_test::traced_test;

    /// Incremental memory -> recording pipeline; `rows` and flags are spliced in as JSON.
    fn incremental_pipeline(source: serde_json::Value, sink: serde_json::Value) -> String {
        format!(
            r#"
pipeline:
  name: users_sync
  extract:
    source: memory
    inline_config: {source}
  load:
    destination: recording
    inline_config: {sink}
  incremental:
    cursor_field: id
    cursor_param: since_id
    initial_value: 0
settings:
  retry:
    max_attempts: 3
    backoff_seconds: 0
"#
        )
    }

    fn rows(ids: &[i64]) -> serde_json::Value {
        json!(ids.iter().map(|id| json!({"id": id, "name": format!("user-{id}")})).collect::<Vec<_>>())
    }

    #[tokio::test]
    async fn full_refresh_uses_initial_value_and_commits_max() {
        let dir = tempdir().unwrap();
        let store = state_store(dir.path());
        store.save("users_sync", &CursorValue::Int(999)).unwrap();

        let probe = Probe::new();
        let engine = PipelineEngine::new(fixture_registry(&probe));
        let config = parse_pipeline(&incremental_pipeline(
            json!({"rows": rows(&[3, 20, 7])}),
            json!({}),
        ));

        let summary = engine.run_with_store(&config, &store, true).await.unwrap();

        assert_eq!(probe.last_query_param("since_id"), Some(json!(0)));
        assert_eq!(summary.cursor_used, Some(CursorValue::Int(0)));
        assert_eq!(summary.committed_cursor, Some(CursorValue::Int(20)));
        assert_eq!(store.get("users_sync"), Some(CursorValue::Int(20)));
    }

    #[tokio::test]
    async fn failing_load_leaves_cursor_untouched() {
        let dir = tempdir().unwrap();
        let store = state_store(dir.path());
        store.save("users_sync", &CursorValue::Int(5)).unwrap();

        let probe = Probe::new();
        let engine = PipelineEngine::new(fixture_registry(&probe));
        let config = parse_pipeline(&incremental_pipeline(
            json!({"rows": rows(&[6, 9])}),
            json!({"fail_always": true}),
        ));

        let err = engine.run_with_store(&config, &store, false).await.unwrap_err();

        assert!(matches!(err, PipelineError::Load { ref key, .. } if key == "recording"));
        assert_eq!(probe.count("sink.load"), 3);
        assert_eq!(probe.count("sink.disconnect"), 3);
        assert_eq!(store.get("users_sync"), Some(CursorValue::Int(5)));
    }

    #[tokio::test]
    async fn transforms_run_in_declared_order() {
        let dir = tempdir().unwrap();
        let probe = Probe::new();
        let engine = PipelineEngine::new(fixture_registry(&probe));
        let config = parse_pipeline(
            r#"
pipeline:
  name: ordered
  extract:
    source: memory
    inline_config: { rows: [{ id: 1 }, { id: 2 }] }
  transform:
    - { name: tag, inline_config: { tag: A } }
    - { name: tag, inline_config: { tag: B } }
    - { name: tag, inline_config: { tag: C } }
  load:
    destination: recording
    inline_config: {}
"#,
        );

        engine
            .run_with_store(&config, &state_store(dir.path()), false)
            .await
            .unwrap();

        let transforms: Vec<String> = probe
            .events()
            .into_iter()
            .filter(|e| e.starts_with("transform:"))
            .collect();
        assert_eq!(transforms, vec!["transform:A", "transform:B", "transform:C"]);

        let loaded = probe.loaded();
        assert_eq!(loaded.len(), 1);
        assert_eq!(
            loaded[0].to_records(),
            vec![json!({"id": 1, "trail": "ABC"}), json!({"id": 2, "trail": "ABC"})]
        );
    }

    #[tokio::test]
    async fn second_run_resumes_from_committed_cursor() {
        let dir = tempdir().unwrap();
        let store = state_store(dir.path());
        let probe = Probe::new();
        let engine = PipelineEngine::new(fixture_registry(&probe));

        let first = parse_pipeline(&incremental_pipeline(json!({"rows": rows(&[1, 2, 3])}), json!({})));
        let summary = engine.run_with_store(&first, &store, false).await.unwrap();
        assert_eq!(probe.last_query_param("since_id"), Some(json!(0)));
        assert_eq!(summary.committed_cursor, Some(CursorValue::Int(3)));

        let second = parse_pipeline(&incremental_pipeline(json!({"rows": rows(&[4, 5])}), json!({})));
        let summary = engine.run_with_store(&second, &store, false).await.unwrap();
        assert_eq!(probe.last_query_param("since_id"), Some(json!(3)));
        assert_eq!(summary.cursor_used, Some(CursorValue::Int(3)));
        assert_eq!(store.get("users_sync"), Some(CursorValue::Int(5)));
    }

    #[tokio::test]
    async fn teardown_runs_after_every_failed_extract() {
        let dir = tempdir().unwrap();
        let probe = Probe::new();
        let engine = PipelineEngine::new(fixture_registry(&probe));
        let config = parse_pipeline(&incremental_pipeline(
            json!({"fail_always": true}),
            json!({}),
        ));

        let err = engine
            .run_with_store(&config, &state_store(dir.path()), false)
            .await
            .unwrap_err();

        assert!(matches!(err, PipelineError::Extract { .. }));
        assert!(err.to_string().contains("extract attempt 3 failed"));
        assert_eq!(probe.count("source.connect"), 3);
        assert_eq!(probe.count("source.disconnect"), 3);
        // One fresh instance per attempt.
        assert_eq!(probe.source_configs().len(), 3);
        assert_eq!(probe.count("sink.connect"), 0);
    }

    #[tokio::test]
    async fn transient_extract_failures_are_retried() {
        let dir = tempdir().unwrap();
        let probe = Probe::new();
        let engine = PipelineEngine::new(fixture_registry(&probe));
        let config = parse_pipeline(&incremental_pipeline(
            json!({"rows": rows(&[1]), "fail_times": 2}),
            json!({}),
        ));

        let summary = engine
            .run_with_store(&config, &state_store(dir.path()), false)
            .await
            .unwrap();

        assert_eq!(summary.rows_extracted, 1);
        assert_eq!(probe.count("source.extract"), 3);
        assert_eq!(probe.count("source.disconnect"), 3);
    }

    #[tokio::test]
    async fn validation_failure_is_not_retried() {
        let dir = tempdir().unwrap();
        let store = state_store(dir.path());
        let probe = Probe::new();
        let engine = PipelineEngine::new(fixture_registry(&probe));
        let config = parse_pipeline(
            r#"
pipeline:
  name: rejected
  extract:
    source: memory
    inline_config: { rows: [{ id: 1 }] }
  transform:
    - { name: rejecting, inline_config: {} }
  load:
    destination: recording
    inline_config: {}
  incremental: { cursor_field: id, cursor_param: since_id }
settings:
  retry: { max_attempts: 3, backoff_seconds: 0 }
"#,
        );

        let err = engine.run_with_store(&config, &store, false).await.unwrap_err();

        assert!(matches!(err, PipelineError::Validation(_)));
        assert_eq!(probe.count("rejecting.validate"), 1);
        assert_eq!(probe.transform_calls(), 0);
        assert!(probe.loaded().is_empty());
        assert_eq!(store.get("rejected"), None);
    }

    #[tokio::test]
    #[traced_test]
    async fn missing_cursor_field_skips_commit_with_warning() {
        let dir = tempdir().unwrap();
        let store = state_store(dir.path());
        let probe = Probe::new();
        let engine = PipelineEngine::new(fixture_registry(&probe));
        let config = parse_pipeline(&incremental_pipeline(
            json!({"rows": [{"name": "no id here"}]}),
            json!({}),
        ));

        let summary = engine.run_with_store(&config, &store, false).await.unwrap();

        assert_eq!(summary.rows_loaded, 1);
        assert_eq!(summary.committed_cursor, None);
        assert_eq!(store.get("users_sync"), None);
        assert!(logs_contain("Cursor field not found"));
    }

    #[tokio::test]
    async fn unknown_plugin_lists_available_keys() {
        let dir = tempdir().unwrap();
        let probe = Probe::new();
        let engine = PipelineEngine::new(fixture_registry(&probe));
        let config = parse_pipeline(
            r#"
pipeline:
  name: typo
  extract: { source: memroy, inline_config: {} }
  load: { destination: recording, inline_config: {} }
"#,
        );

        let err = engine
            .run_with_store(&config, &state_store(dir.path()), false)
            .await
            .unwrap_err();

        match err {
            PipelineError::Registry(RegistryError::NotFound { key, available, .. }) => {
                assert_eq!(key, "memroy");
                assert_eq!(
                    available,
                    vec!["alpha_vantage", "csv_file", "json_file", "memory", "rest_api"]
                );
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn empty_extract_still_loads_without_cursor() {
        let dir = tempdir().unwrap();
        let store = state_store(dir.path());
        store.save("users_sync", &CursorValue::Int(10)).unwrap();
        let probe = Probe::new();
        let engine = PipelineEngine::new(fixture_registry(&probe));
        let config = parse_pipeline(&incremental_pipeline(json!({"rows": []}), json!({})));

        let summary = engine.run_with_store(&config, &store, false).await.unwrap();

        assert_eq!(summary.rows_loaded, 0);
        assert_eq!(probe.loaded().len(), 1);
        assert_eq!(store.get("users_sync"), Some(CursorValue::Int(10)));
    }
}
