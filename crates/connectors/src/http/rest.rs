use crate::{
    config::{scalar_to_string, settings},
    error::ConnectorError,
    http::pagination::{Pagination, parse_next_link, record_count},
};
use async_trait::async_trait;
use engine_core::{
    connectors::{Source, SourceFactory},
    error::PluginError,
};
use model::{execution::step::ConfigMap, records::dataset::Dataset};
use reqwest::{
    Client,
    header::{AUTHORIZATION, HeaderMap, HeaderName, HeaderValue, LINK},
};
use serde::Deserialize;
use std::{collections::BTreeMap, time::Duration};
use tracing::{info, warn};

pub const KEY: &str = "rest_api";

#[derive(Debug, Clone, Deserialize)]
pub struct RestApiSettings {
    #[serde(default)]
    pub base_url: String,
    pub endpoint: String,
    #[serde(default)]
    pub path_params: ConfigMap,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    #[serde(default)]
    pub auth_token_env: Option<String>,
    #[serde(default = "default_timeout")]
    pub timeout: f64,
    #[serde(default)]
    pub query_params: ConfigMap,
    #[serde(default)]
    pub pagination: Pagination,
    #[serde(default = "default_page_param")]
    pub page_param_name: String,
    #[serde(default = "default_per_page_param")]
    pub per_page_param_name: String,
    #[serde(default = "default_per_page")]
    pub per_page: usize,
    #[serde(default = "default_max_pages")]
    pub max_pages: usize,
}

fn default_timeout() -> f64 {
    30.0
}

fn default_page_param() -> String {
    "page".to_string()
}

fn default_per_page_param() -> String {
    "per_page".to_string()
}

fn default_per_page() -> usize {
    100
}

fn default_max_pages() -> usize {
    10
}

/// Pulls JSON records from an HTTP endpoint, optionally across several pages.
pub struct RestApiSource {
    settings: RestApiSettings,
    client: Option<Client>,
}

impl RestApiSource {
    pub fn new(settings: RestApiSettings) -> Result<Self, ConnectorError> {
        if !settings.timeout.is_finite() || settings.timeout <= 0.0 {
            return Err(ConnectorError::invalid_config(
                KEY,
                "timeout must be a positive number of seconds",
            ));
        }
        if settings.pagination == Pagination::PageParam && settings.per_page == 0 {
            return Err(ConnectorError::invalid_config(KEY, "per_page must be at least 1"));
        }
        Ok(RestApiSource {
            settings,
            client: None,
        })
    }

    fn build_client(&self) -> Result<Client, ConnectorError> {
        let mut headers = HeaderMap::new();
        for (name, value) in &self.settings.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| ConnectorError::invalid_config(KEY, format!("header {name:?}: {e}")))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| ConnectorError::invalid_config(KEY, format!("header {name}: {e}")))?;
            headers.insert(name, value);
        }

        if let Some(var) = &self.settings.auth_token_env {
            match std::env::var(var) {
                Ok(token) if !token.is_empty() => {
                    let value = HeaderValue::from_str(&format!("Bearer {token}")).map_err(|e| {
                        ConnectorError::invalid_config(KEY, format!("token in {var}: {e}"))
                    })?;
                    headers.insert(AUTHORIZATION, value);
                }
                _ => warn!(
                    auth_token_env = %var,
                    "auth_token_env is configured but the variable is empty or unset"
                ),
            }
        }

        Ok(Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs_f64(self.settings.timeout))
            .build()?)
    }

    /// Absolute URL of the configured endpoint with `{name}` placeholders filled in.
    pub fn endpoint_url(&self) -> Result<String, ConnectorError> {
        let mut endpoint = self.settings.endpoint.clone();
        for (name, value) in &self.settings.path_params {
            if let Some(value) = scalar_to_string(value) {
                endpoint = endpoint.replace(&format!("{{{name}}}"), &value);
            }
        }
        let unresolved = endpoint
            .find('{')
            .is_some_and(|start| endpoint[start..].contains('}'));
        if unresolved {
            return Err(ConnectorError::invalid_config(
                KEY,
                format!("endpoint {endpoint:?} has a placeholder without a path_params entry"),
            ));
        }

        if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
            return Ok(endpoint);
        }
        let base = self.settings.base_url.trim_end_matches('/');
        if base.is_empty() {
            return Ok(endpoint);
        }
        Ok(format!("{base}/{}", endpoint.trim_start_matches('/')))
    }

    fn query_pairs(&self) -> Vec<(String, String)> {
        query_pairs(&self.settings.query_params)
    }

    async fn fetch(
        client: &Client,
        url: &str,
        query: Option<&[(String, String)]>,
    ) -> Result<(serde_json::Value, Option<String>), ConnectorError> {
        let mut request = client.get(url);
        if let Some(query) = query {
            request = request.query(query);
        }
        let response = request.send().await?.error_for_status()?;
        let next = response
            .headers()
            .get(LINK)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_next_link);
        let body = response.json::<serde_json::Value>().await?;
        Ok((body, next))
    }

    async fn single_request(&self, client: &Client, url: &str) -> Result<Dataset, ConnectorError> {
        let query = self.query_pairs();
        let (body, _) = Self::fetch(client, url, Some(query.as_slice())).await?;
        body_to_dataset(body)
    }

    async fn paginate_page_param(
        &self,
        client: &Client,
        url: &str,
    ) -> Result<Dataset, ConnectorError> {
        let s = &self.settings;
        let base_query: Vec<(String, String)> = self
            .query_pairs()
            .into_iter()
            .filter(|(k, _)| k != &s.page_param_name && k != &s.per_page_param_name)
            .collect();

        let mut dataset = Dataset::default();
        let mut pages = 0;
        for page in 1..=s.max_pages {
            let mut query = base_query.clone();
            query.push((s.page_param_name.clone(), page.to_string()));
            query.push((s.per_page_param_name.clone(), s.per_page.to_string()));

            let (body, _) = Self::fetch(client, url, Some(query.as_slice())).await?;
            let count = record_count(&body);
            if count == 0 {
                break;
            }
            dataset.append(body_to_dataset(body)?);
            pages += 1;
            if count < s.per_page {
                break;
            }
            info!(page, records = count, "Fetched page");
        }

        info!(records = dataset.len(), pages, "page_param pagination complete");
        Ok(dataset)
    }

    async fn paginate_link_header(
        &self,
        client: &Client,
        url: &str,
    ) -> Result<Dataset, ConnectorError> {
        let first_query = self.query_pairs();
        let mut dataset = Dataset::default();
        let mut next_url = Some(url.to_string());

        for page in 1..=self.settings.max_pages {
            let Some(url) = next_url.take() else {
                break;
            };
            // Next links already carry their own query string.
            let query = (page == 1).then_some(first_query.as_slice());
            let (body, next) = Self::fetch(client, &url, query).await?;
            let count = record_count(&body);
            if count == 0 {
                break;
            }
            dataset.append(body_to_dataset(body)?);
            info!(page, records = count, "Fetched page");
            next_url = next;
        }

        Ok(dataset)
    }
}

/// Flattens configured query parameters; list values repeat the key once per item.
pub(crate) fn query_pairs(params: &ConfigMap) -> Vec<(String, String)> {
    let mut pairs = Vec::new();
    for (key, value) in params {
        match value {
            serde_json::Value::Array(items) => {
                pairs.extend(
                    items
                        .iter()
                        .filter_map(scalar_to_string)
                        .map(|v| (key.clone(), v)),
                );
            }
            other => {
                if let Some(v) = scalar_to_string(other) {
                    pairs.push((key.clone(), v));
                }
            }
        }
    }
    pairs
}

fn body_to_dataset(body: serde_json::Value) -> Result<Dataset, ConnectorError> {
    match body {
        serde_json::Value::Null => Ok(Dataset::default()),
        other => Ok(Dataset::from_json(other)?),
    }
}

#[async_trait]
impl Source for RestApiSource {
    fn name(&self) -> &str {
        KEY
    }

    async fn connect(&mut self) -> Result<(), PluginError> {
        self.client = Some(self.build_client()?);
        let base = if self.settings.base_url.is_empty() {
            "(no base_url)"
        } else {
            self.settings.base_url.as_str()
        };
        info!(base_url = base, "HTTP client ready");
        Ok(())
    }

    async fn extract(&mut self) -> Result<Dataset, PluginError> {
        let client = match &self.client {
            Some(client) => client.clone(),
            None => {
                let client = self.build_client()?;
                self.client = Some(client.clone());
                client
            }
        };

        let url = self.endpoint_url()?;
        info!(url = %url, pagination = ?self.settings.pagination, "Extracting from REST endpoint");

        let dataset = match self.settings.pagination {
            Pagination::None => self.single_request(&client, &url).await?,
            Pagination::PageParam => self.paginate_page_param(&client, &url).await?,
            Pagination::LinkHeader => self.paginate_link_header(&client, &url).await?,
        };
        info!(rows = dataset.len(), "REST extraction complete");
        Ok(dataset)
    }

    async fn disconnect(&mut self) -> Result<(), PluginError> {
        if self.client.take().is_some() {
            info!("HTTP client closed");
        }
        Ok(())
    }
}

pub struct RestApiSourceFactory;

impl SourceFactory for RestApiSourceFactory {
    fn label(&self) -> &str {
        "RestApiSource"
    }

    fn create(&self, config: ConfigMap) -> Result<Box<dyn Source>, PluginError> {
        Ok(Box::new(RestApiSource::new(settings(KEY, config)?)?))
    }
}
