use crate::{
    config::settings,
    error::ConnectorError,
    sql::postgres::{
        data_type::PgColumnType,
        params::{PgParam, PgParamStore},
        utils::{connect_client, quote_ident},
    },
};
use async_trait::async_trait;
use engine_core::{
    connectors::{Sink, SinkFactory},
    error::PluginError,
};
use model::{execution::step::ConfigMap, records::dataset::Dataset};
use serde::Deserialize;
use std::collections::HashMap;
use tokio_postgres::Client;
use tracing::info;

pub const KEY: &str = "postgres";

const QUERY_TABLE_EXISTS_SQL: &str = "SELECT EXISTS (SELECT 1 FROM information_schema.tables \
     WHERE table_schema = current_schema() AND table_name = $1)";
const QUERY_TABLE_COLUMNS_SQL: &str = "SELECT column_name, data_type FROM information_schema.columns \
     WHERE table_schema = current_schema() AND table_name = $1";

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IfExists {
    #[default]
    Append,
    Replace,
    Fail,
    Upsert,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PostgresSettings {
    pub connection_string: String,
    pub table_name: String,
    #[serde(default)]
    pub if_exists: IfExists,
    #[serde(default)]
    pub primary_keys: Vec<String>,
}

/// Writes a dataset into one Postgres table inside a single transaction.
pub struct PostgresSink {
    settings: PostgresSettings,
    client: Option<Client>,
}

impl PostgresSink {
    pub fn new(settings: PostgresSettings) -> Result<Self, ConnectorError> {
        if settings.table_name.trim().is_empty() {
            return Err(ConnectorError::invalid_config(KEY, "table_name must not be empty"));
        }
        if settings.if_exists == IfExists::Upsert && settings.primary_keys.is_empty() {
            return Err(ConnectorError::invalid_config(
                KEY,
                "primary_keys must be specified when if_exists is upsert",
            ));
        }
        Ok(PostgresSink {
            settings,
            client: None,
        })
    }

    async fn write(&mut self, dataset: &Dataset) -> Result<(), ConnectorError> {
        if self.client.is_none() {
            self.client = Some(connect_client(&self.settings.connection_string).await?);
        }
        let settings = &self.settings;
        let client = self
            .client
            .as_mut()
            .ok_or_else(|| ConnectorError::NotConnected(KEY.to_string()))?;
        let table = settings.table_name.as_str();

        if dataset.is_empty() {
            info!(table, "Empty dataset, nothing to write");
            return Ok(());
        }
        if settings.if_exists == IfExists::Upsert {
            for key in &settings.primary_keys {
                if !dataset.has_column(key) {
                    return Err(ConnectorError::InvalidData(format!(
                        "primary key column '{key}' is missing from the dataset"
                    )));
                }
            }
        }

        let tx = client.transaction().await?;

        let exists: bool = tx.query_one(QUERY_TABLE_EXISTS_SQL, &[&table]).await?.get(0);
        let mut existing_types = HashMap::new();
        match (exists, settings.if_exists) {
            (true, IfExists::Fail) => {
                return Err(ConnectorError::InvalidData(format!(
                    "table '{table}' already exists"
                )));
            }
            (true, IfExists::Replace) => {
                tx.batch_execute(&format!("DROP TABLE {}", quote_ident(table)))
                    .await?;
                info!(table, "Dropped existing table");
            }
            (true, _) => {
                for row in tx.query(QUERY_TABLE_COLUMNS_SQL, &[&table]).await? {
                    let name: String = row.get(0);
                    let data_type: String = row.get(1);
                    if let Some(ty) = PgColumnType::from_information_schema(&data_type) {
                        existing_types.insert(name, ty);
                    }
                }
            }
            (false, _) => {}
        }

        let columns: Vec<(String, PgColumnType)> = dataset
            .columns()
            .iter()
            .map(|name| {
                let ty = existing_types
                    .get(name)
                    .copied()
                    .unwrap_or_else(|| PgColumnType::infer(dataset.column(name)));
                (name.clone(), ty)
            })
            .collect();

        let create_table = !exists || settings.if_exists == IfExists::Replace;
        if create_table {
            tx.batch_execute(&create_table_sql(table, &columns)).await?;
            if settings.if_exists == IfExists::Upsert {
                tx.batch_execute(&unique_index_sql(table, &settings.primary_keys))
                    .await?;
            }
            info!(table, columns = columns.len(), "Created table");
        }

        let upsert_keys = (settings.if_exists == IfExists::Upsert)
            .then_some(settings.primary_keys.as_slice());
        let statement = tx.prepare(&insert_sql(table, &columns, upsert_keys)).await?;

        for row in dataset.rows() {
            let params = columns
                .iter()
                .map(|(name, ty)| PgParam::coerce(&row.get_value(name), *ty))
                .collect::<Result<Vec<_>, _>>()?;
            let store = PgParamStore::new(params);
            tx.execute(&statement, &store.as_refs()).await?;
        }

        tx.commit().await?;
        info!(
            table,
            rows = dataset.len(),
            mode = ?settings.if_exists,
            "Wrote rows"
        );
        Ok(())
    }
}

pub fn create_table_sql(table: &str, columns: &[(String, PgColumnType)]) -> String {
    let defs: Vec<String> = columns
        .iter()
        .map(|(name, ty)| format!("{} {}", quote_ident(name), ty.sql()))
        .collect();
    format!("CREATE TABLE {} ({})", quote_ident(table), defs.join(", "))
}

pub fn unique_index_sql(table: &str, keys: &[String]) -> String {
    let index = format!("uq_{}_{}", table, keys.join("_"));
    let cols: Vec<String> = keys.iter().map(|k| quote_ident(k)).collect();
    format!(
        "CREATE UNIQUE INDEX {} ON {} ({})",
        quote_ident(&index),
        quote_ident(table),
        cols.join(", ")
    )
}

/// `INSERT` with one typed placeholder per column; with `upsert_keys` conflicting rows are
/// updated in place, or skipped when every column is part of the key.
pub fn insert_sql(
    table: &str,
    columns: &[(String, PgColumnType)],
    upsert_keys: Option<&[String]>,
) -> String {
    let names: Vec<String> = columns.iter().map(|(n, _)| quote_ident(n)).collect();
    let placeholders: Vec<String> = columns
        .iter()
        .enumerate()
        .map(|(i, (_, ty))| format!("${}::{}", i + 1, ty.sql()))
        .collect();

    let mut sql = format!(
        "INSERT INTO {} ({}) VALUES ({})",
        quote_ident(table),
        names.join(", "),
        placeholders.join(", ")
    );

    if let Some(keys) = upsert_keys {
        let conflict: Vec<String> = keys.iter().map(|k| quote_ident(k)).collect();
        let updates: Vec<String> = columns
            .iter()
            .filter(|(n, _)| !keys.contains(n))
            .map(|(n, _)| format!("{0} = EXCLUDED.{0}", quote_ident(n)))
            .collect();
        if updates.is_empty() {
            sql.push_str(&format!(" ON CONFLICT ({}) DO NOTHING", conflict.join(", ")));
        } else {
            sql.push_str(&format!(
                " ON CONFLICT ({}) DO UPDATE SET {}",
                conflict.join(", "),
                updates.join(", ")
            ));
        }
    }
    sql
}

#[async_trait]
impl Sink for PostgresSink {
    fn name(&self) -> &str {
        KEY
    }

    async fn connect(&mut self) -> Result<(), PluginError> {
        let client = connect_client(&self.settings.connection_string).await?;
        self.client = Some(client);
        info!(table = %self.settings.table_name, "Connected to Postgres");
        Ok(())
    }

    async fn load(&mut self, dataset: &Dataset) -> Result<(), PluginError> {
        Ok(self.write(dataset).await?)
    }

    async fn disconnect(&mut self) -> Result<(), PluginError> {
        // Dropping the client ends the spawned connection task.
        if self.client.take().is_some() {
            info!("Postgres connection closed");
        }
        Ok(())
    }
}

pub struct PostgresSinkFactory;

impl SinkFactory for PostgresSinkFactory {
    fn label(&self) -> &str {
        "PostgresSink"
    }

    fn create(&self, config: ConfigMap) -> Result<Box<dyn Sink>, PluginError> {
        Ok(Box::new(PostgresSink::new(settings(KEY, config)?)?))
    }
}
