use crate::{
    config::{scalar_to_string, settings},
    error::ConnectorError,
    http::rest::query_pairs,
};
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
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{info, warn};

pub const KEY: &str = "alpha_vantage";

const SERVICE: &str = "Alpha Vantage";
const META_KEY: &str = "Meta Data";

/// Response fields mapped to dataset columns, in output order.
const BAR_FIELDS: [(&str, &str); 5] = [
    ("1. open", "open"),
    ("2. high", "high"),
    ("3. low", "low"),
    ("4. close", "close"),
    ("5. volume", "volume"),
];

/// Body fields the API uses to report failures with a 200 status.
const FAILURE_FIELDS: [(&str, &str); 3] = [
    ("Error Message", "invalid request"),
    ("Note", "rate limit"),
    ("Information", "info"),
];

#[derive(Debug, Clone, Deserialize)]
pub struct AlphaVantageSettings {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default)]
    pub query_params: ConfigMap,
    #[serde(default)]
    pub api_key_env: Option<String>,
    /// Name of the time series object; detected from the response when absent.
    #[serde(default)]
    pub series_key: Option<String>,
    #[serde(default = "default_timeout")]
    pub timeout: f64,
}

fn default_base_url() -> String {
    "https://www.alphavantage.co".to_string()
}

fn default_endpoint() -> String {
    "/query".to_string()
}

fn default_timeout() -> f64 {
    30.0
}

/// Fetches a daily (or weekly, monthly) OHLCV series and flattens it into one row per bar.
pub struct AlphaVantageSource {
    settings: AlphaVantageSettings,
    client: Option<Client>,
    api_key: Option<String>,
}

impl AlphaVantageSource {
    pub fn new(settings: AlphaVantageSettings) -> Result<Self, ConnectorError> {
        if !settings.timeout.is_finite() || settings.timeout <= 0.0 {
            return Err(ConnectorError::invalid_config(
                KEY,
                "timeout must be a positive number of seconds",
            ));
        }
        Ok(AlphaVantageSource {
            settings,
            client: None,
            api_key: None,
        })
    }

    fn open(&mut self) -> Result<Client, ConnectorError> {
        if let Some(var) = &self.settings.api_key_env {
            match std::env::var(var) {
                Ok(key) if !key.is_empty() => self.api_key = Some(key),
                _ => warn!(
                    api_key_env = %var,
                    "api_key_env is configured but the variable is empty or unset"
                ),
            }
        }

        let client = Client::builder()
            .timeout(Duration::from_secs_f64(self.settings.timeout))
            .build()?;
        self.client = Some(client.clone());
        Ok(client)
    }

    fn url(&self) -> String {
        let endpoint = &self.settings.endpoint;
        if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
            return endpoint.clone();
        }
        format!(
            "{}/{}",
            self.settings.base_url.trim_end_matches('/'),
            endpoint.trim_start_matches('/')
        )
    }

    fn query(&self) -> Vec<(String, String)> {
        let mut query = query_pairs(&self.settings.query_params);
        if let Some(key) = &self.api_key {
            query.retain(|(name, _)| name != "apikey");
            query.push(("apikey".to_string(), key.clone()));
        }
        query
    }
}

/// Flattens an API response into `date, open, high, low, close, volume` rows sorted by date.
pub fn parse_series(
    body: serde_json::Value,
    series_key: Option<&str>,
) -> Result<Dataset, ConnectorError> {
    let serde_json::Value::Object(mut body) = body else {
        return Err(ConnectorError::InvalidData(format!(
            "{SERVICE} response is not a JSON object"
        )));
    };

    for (field, kind) in FAILURE_FIELDS {
        if let Some(message) = body.get(field) {
            return Err(ConnectorError::Api {
                service: SERVICE.to_string(),
                message: format!("{kind}: {}", scalar_to_string(message).unwrap_or_default()),
            });
        }
    }

    let key = match series_key {
        Some(key) => key.to_string(),
        None => body
            .keys()
            .find(|key| key.as_str() != META_KEY)
            .cloned()
            .ok_or_else(|| {
                let keys: Vec<&str> = body.keys().map(String::as_str).collect();
                ConnectorError::InvalidData(format!(
                    "no time series in {SERVICE} response; keys found: {keys:?}"
                ))
            })?,
    };
    let Some(serde_json::Value::Object(series)) = body.remove(&key) else {
        return Err(ConnectorError::InvalidData(format!(
            "{SERVICE} response has no time series object under {key:?}"
        )));
    };

    let mut bars = Vec::with_capacity(series.len());
    for (date, bar) in series {
        let mut row = RowData::from_pairs([("date", Value::String(date.clone()))]);
        for (field, column) in BAR_FIELDS {
            let cell = bar.get(field).ok_or_else(|| {
                ConnectorError::InvalidData(format!("bar {date} has no {field:?} field"))
            })?;
            row.set(column, numeric(cell));
        }
        bars.push((date, row));
    }
    bars.sort_by(|a, b| a.0.cmp(&b.0));

    let mut columns = vec!["date".to_string()];
    columns.extend(BAR_FIELDS.iter().map(|(_, column)| column.to_string()));
    Ok(Dataset::new(
        columns,
        bars.into_iter().map(|(_, row)| row).collect(),
    ))
}

/// Prices and volumes arrive as strings; anything unparseable becomes null.
fn numeric(cell: &serde_json::Value) -> Value {
    match cell {
        serde_json::Value::Number(_) => Value::from(cell),
        serde_json::Value::String(text) => {
            let text = text.trim();
            if let Ok(v) = text.parse::<i64>() {
                Value::Int(v)
            } else {
                text.parse::<f64>().map(Value::Float).unwrap_or(Value::Null)
            }
        }
        _ => Value::Null,
    }
}

#[async_trait]
impl Source for AlphaVantageSource {
    fn name(&self) -> &str {
        KEY
    }

    async fn connect(&mut self) -> Result<(), PluginError> {
        self.open()?;
        info!(base_url = %self.settings.base_url, "HTTP client ready");
        Ok(())
    }

    async fn extract(&mut self) -> Result<Dataset, PluginError> {
        let client = match self.client.clone() {
            Some(client) => client,
            None => self.open()?,
        };

        let url = self.url();
        info!(url = %url, "Requesting time series");
        let body = client
            .get(&url)
            .query(&self.query())
            .send()
            .await
            .map_err(ConnectorError::from)?
            .error_for_status()
            .map_err(ConnectorError::from)?
            .json::<serde_json::Value>()
            .await
            .map_err(ConnectorError::from)?;

        let dataset = parse_series(body, self.settings.series_key.as_deref())?;
        if dataset.is_empty() {
            warn!("{SERVICE} returned an empty time series");
        }
        info!(rows = dataset.len(), "Time series extraction complete");
        Ok(dataset)
    }

    async fn disconnect(&mut self) -> Result<(), PluginError> {
        if self.client.take().is_some() {
            info!("HTTP client closed");
        }
        Ok(())
    }
}

pub struct AlphaVantageSourceFactory;

impl SourceFactory for AlphaVantageSourceFactory {
    fn label(&self) -> &str {
        "AlphaVantageSource"
    }

    fn create(&self, config: ConfigMap) -> Result<Box<dyn Source>, PluginError> {
        Ok(Box::new(AlphaVantageSource::new(settings(KEY, config)?)?))
    }
}
