use crate::{config::settings, error::ConnectorError};
use async_trait::async_trait;
use engine_core::{
    connectors::{Source, SourceFactory},
    error::PluginError,
};
use model::{
    core::value::Value,
    execution::step::ConfigMap,
    records::{dataset::Dataset, row::RowData},
};
use serde::Deserialize;
use std::path::PathBuf;
use tracing::{info, warn};

pub const KEY: &str = "csv_file";

#[derive(Debug, Clone, Deserialize)]
pub struct CsvFileSettings {
    pub file_path: PathBuf,
    #[serde(default = "default_delimiter")]
    pub delimiter: char,
}

fn default_delimiter() -> char {
    ','
}

pub struct CsvFileSource {
    settings: CsvFileSettings,
}

impl CsvFileSource {
    pub fn new(settings: CsvFileSettings) -> Result<Self, ConnectorError> {
        if !settings.delimiter.is_ascii() {
            return Err(ConnectorError::invalid_config(
                KEY,
                format!("delimiter must be a single ASCII character, got {:?}", settings.delimiter),
            ));
        }
        Ok(CsvFileSource { settings })
    }

    fn parse(&self, bytes: &[u8]) -> Result<Dataset, ConnectorError> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(self.settings.delimiter as u8)
            .has_headers(true)
            .flexible(true)
            .from_reader(bytes);

        let headers: Vec<String> = reader
            .headers()?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();

        let mut dataset = Dataset::new(headers.clone(), Vec::new());
        for (line, record) in reader.records().enumerate() {
            let record = record?;
            if record.len() != headers.len() {
                warn!(
                    line = line + 2,
                    expected = headers.len(),
                    found = record.len(),
                    "CSV row width differs from header"
                );
            }
            let row = RowData::from_pairs(
                headers
                    .iter()
                    .zip(record.iter())
                    .map(|(name, cell)| (name.clone(), infer_cell(cell))),
            );
            dataset.push(row);
        }
        Ok(dataset)
    }
}

/// Types a raw cell: integer, float, boolean, empty as null, anything else as a string.
pub fn infer_cell(raw: &str) -> Value {
    let cell = raw.trim();
    if cell.is_empty() {
        return Value::Null;
    }
    if let Ok(v) = cell.parse::<i64>() {
        return Value::Int(v);
    }
    if let Ok(v) = cell.parse::<f64>() {
        return Value::Float(v);
    }
    match cell.to_ascii_lowercase().as_str() {
        "true" => Value::Boolean(true),
        "false" => Value::Boolean(false),
        _ => Value::String(raw.to_string()),
    }
}

#[async_trait]
impl Source for CsvFileSource {
    fn name(&self) -> &str {
        KEY
    }

    async fn extract(&mut self) -> Result<Dataset, PluginError> {
        let path = &self.settings.file_path;
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| ConnectorError::io(path, e))?;
        let dataset = self.parse(&bytes)?;
        info!(
            rows = dataset.len(),
            columns = dataset.columns().len(),
            path = %path.display(),
            "Loaded CSV file"
        );
        Ok(dataset)
    }
}

pub struct CsvFileSourceFactory;

impl SourceFactory for CsvFileSourceFactory {
    fn label(&self) -> &str {
        "CsvFileSource"
    }

    fn create(&self, config: ConfigMap) -> Result<Box<dyn Source>, PluginError> {
        Ok(Box::new(CsvFileSource::new(settings(KEY, config)?)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::config_map;
    use serde_json::json;
    use std::fs;

    #[test]
    fn infers_cell_types() {
        assert_eq!(infer_cell("42"), Value::Int(42));
        assert_eq!(infer_cell("4.5"), Value::Float(4.5));
        assert_eq!(infer_cell("TRUE"), Value::Boolean(true));
        assert_eq!(infer_cell(""), Value::Null);
        assert_eq!(infer_cell("2024-01-15"), Value::from("2024-01-15"));
    }

    #[tokio::test]
    async fn reads_semicolon_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prices.csv");
        fs::write(&path, "date;close;note\n2024-01-15;101.5;\n2024-01-16;99;dip\n").unwrap();

        let mut source = CsvFileSourceFactory
            .create(config_map(json!({"file_path": path, "delimiter": ";"})))
            .unwrap();
        let dataset = source.extract().await.unwrap();

        assert_eq!(dataset.columns(), &["date", "close", "note"]);
        assert_eq!(
            dataset.to_records(),
            vec![
                json!({"date": "2024-01-15", "close": 101.5, "note": null}),
                json!({"date": "2024-01-16", "close": 99, "note": "dip"}),
            ]
        );
    }

    #[test]
    fn rejects_multibyte_delimiter() {
        let config = config_map(json!({"file_path": "x.csv", "delimiter": "é"}));
        assert!(CsvFileSourceFactory.create(config).is_err());
    }
}
