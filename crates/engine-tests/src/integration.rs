#[cfg(test)]
mod tests {
    use crate::{pg_client, TEST_PG_URL};
    use engine_runtime::{PipelineEngine, builtin_registry, load_config};
    use model::execution::pipeline::PipelineConfig;
    use serde_json::json;
    use std::{fmt::Write as _, fs, path::Path};
    use tempfile::tempdir;

    fn read_json(path: &Path) -> serde_json::Value {
        serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
    }

    async fn write_and_load(dir: &Path, yaml: &str) -> PipelineConfig {
        let path = dir.join("pipeline.yaml");
        fs::write(&path, yaml).unwrap();
        load_config(&path).await.unwrap()
    }

    #[tokio::test]
    async fn json_file_validate_clean_to_json_local() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("users.json");
        let output = dir.path().join("out/users_clean.json");
        let state = dir.path().join("state/state.json");
        fs::write(
            &input,
            json!([
                {"id": 1, "name": " Alice ", "email": "alice@example.com"},
                {"id": 2, "name": "Bob", "email": "not-an-email"},
                {"id": 3, "name": "Carol", "email": "carol@example.com"},
                {"id": 3, "name": "Carol", "email": "carol@example.com"},
            ])
            .to_string(),
        )
        .unwrap();

        let config = write_and_load(
            dir.path(),
            &format!(
                r#"
pipeline:
  name: users
  extract:
    source: json_file
    inline_config:
      file_path: {input}
  transform:
    - name: schema_validation
      inline_config: {{ model: user }}
    - name: data_cleaning
      inline_config:
        strip_whitespace: true
        deduplicate: true
  load:
    destination: json_local
    inline_config:
      output_path: {output}
  incremental:
    cursor_field: id
    cursor_param: since_id
settings:
  state_file: {state}
  retry: {{ max_attempts: 1, backoff_seconds: 0 }}
"#,
                input = input.display(),
                output = output.display(),
                state = state.display(),
            ),
        )
        .await;

        let engine = PipelineEngine::new(builtin_registry().unwrap());
        let summary = engine.run(&config, false).await.unwrap();

        assert_eq!(summary.rows_extracted, 4);
        assert_eq!(summary.rows_loaded, 2);
        assert_eq!(
            read_json(&output),
            json!([
                {"id": 1, "name": "Alice", "email": "alice@example.com"},
                {"id": 3, "name": "Carol", "email": "carol@example.com"},
            ])
        );
        assert_eq!(read_json(&state), json!({"users": 3}));
    }

    #[tokio::test]
    async fn csv_file_indicators_to_json_local_columns() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("prices.csv");
        let output = dir.path().join("indicators.json");

        let mut csv = String::from("Date,Open,High,Low,Close,Volume\n");
        for day in 1..=30 {
            let close = 100.0 + day as f64 + if day % 2 == 0 { 1.5 } else { -1.5 };
            writeln!(
                csv,
                "2024-01-{day:02},{},{},{},{close},{}",
                close - 0.5,
                close + 1.0,
                close - 1.0,
                1000 + day
            )
            .unwrap();
        }
        fs::write(&input, csv).unwrap();

        let config = write_and_load(
            dir.path(),
            &format!(
                r#"
pipeline:
  name: prices
  extract:
    source: csv_file
    inline_config: {{ file_path: "{input}" }}
  transform:
    - name: technical_indicators
      inline_config: {{ sma_period: 5, bb_period: 5, rsi_period: 5 }}
  load:
    destination: json_local
    inline_config: {{ output_path: "{output}", orient: columns }}
settings:
  state_file: "{state}"
"#,
                input = input.display(),
                output = output.display(),
                state = dir.path().join("state.json").display(),
            ),
        )
        .await;

        let engine = PipelineEngine::new(builtin_registry().unwrap());
        let summary = engine.run(&config, false).await.unwrap();

        // RSI needs five deltas, so rows 5..30 remain.
        assert_eq!(summary.rows_loaded, 25);
        let document = read_json(&output);
        let dates = document["date"].as_object().unwrap();
        assert_eq!(dates.len(), 25);
        assert_eq!(dates["0"], json!("2024-01-06T00:00:00Z"));
        assert!(document["rsi_14"].as_object().is_some());
        assert!(!dir.path().join("state.json").exists());
    }

    #[tokio::test]
    async fn inline_config_overrides_config_file() {
        let dir = tempdir().unwrap();
        let real = dir.path().join("real.json");
        let output = dir.path().join("out.json");
        fs::write(&real, r#"[{"n": 1}, {"n": 2}]"#).unwrap();

        let step_file = dir.path().join("source.yaml");
        fs::write(&step_file, "file_path: /does/not/exist.json\norient: records\n").unwrap();

        let config = write_and_load(
            dir.path(),
            &format!(
                r#"
pipeline:
  name: merged
  extract:
    source: json_file
    config_file: "{step_file}"
    inline_config: {{ file_path: "{real}" }}
  load:
    destination: json_local
    inline_config: {{ output_path: "{output}", indent: 0 }}
settings:
  state_file: "{state}"
"#,
                step_file = step_file.display(),
                real = real.display(),
                output = output.display(),
                state = dir.path().join("state.json").display(),
            ),
        )
        .await;

        let engine = PipelineEngine::new(builtin_registry().unwrap());
        engine.run(&config, false).await.unwrap();

        assert_eq!(fs::read_to_string(&output).unwrap(), r#"[{"n":1},{"n":2}]"#);
    }

    #[ignore = "requires a running Postgres at TEST_PG_URL"]
    #[tokio::test]
    async fn postgres_upsert_is_idempotent() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("todos.json");
        fs::write(
            &input,
            json!([
                {"userId": 1, "id": 1, "title": "a", "completed": false},
                {"userId": 1, "id": 2, "title": "b", "completed": true},
            ])
            .to_string(),
        )
        .unwrap();

        let client = pg_client().await;
        client
            .batch_execute("DROP TABLE IF EXISTS ferry_todos")
            .await
            .unwrap();

        let config = write_and_load(
            dir.path(),
            &format!(
                r#"
pipeline:
  name: todos
  extract:
    source: json_file
    inline_config: {{ file_path: "{input}" }}
  transform:
    - {{ name: schema_validation, inline_config: {{ model: todo }} }}
  load:
    destination: postgres
    inline_config:
      connection_string: "{url}"
      table_name: ferry_todos
      if_exists: upsert
      primary_keys: [id]
settings:
  state_file: "{state}"
"#,
                input = input.display(),
                url = TEST_PG_URL,
                state = dir.path().join("state.json").display(),
            ),
        )
        .await;

        let engine = PipelineEngine::new(builtin_registry().unwrap());
        engine.run(&config, false).await.unwrap();
        engine.run(&config, false).await.unwrap();

        let row = client
            .query_one("SELECT COUNT(*) FROM ferry_todos", &[])
            .await
            .unwrap();
        let count: i64 = row.get(0);
        assert_eq!(count, 2);
    }
}
