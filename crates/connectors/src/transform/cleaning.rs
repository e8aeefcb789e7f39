use crate::{config::settings, error::ConnectorError, transform::rename_all};
use engine_core::{
    connectors::{Transform, TransformFactory},
    error::PluginError,
    registry::Registry,
};
use model::{
    core::{utils::parse_timestamp, value::Value},
    execution::step::ConfigMap,
    records::{dataset::Dataset, row::RowData},
};
use chrono::DateTime;
use serde::Deserialize;
use std::collections::HashSet;
use tracing::{info, warn};

pub const KEY: &str = "data_cleaning";

#[derive(Debug, Default, Clone, Deserialize)]
pub struct CleaningSettings {
    #[serde(default)]
    pub drop_columns: Option<Vec<String>>,
    #[serde(default)]
    pub rename_columns: Option<ConfigMap>,
    #[serde(default)]
    pub lowercase_columns: bool,
    #[serde(default)]
    pub strip_whitespace: bool,
    #[serde(default)]
    pub fill_nulls: Option<ConfigMap>,
    #[serde(default)]
    pub drop_nulls: bool,
    #[serde(default)]
    pub drop_null_columns: Option<Vec<String>>,
    #[serde(default)]
    pub deduplicate: bool,
    #[serde(default)]
    pub deduplicate_columns: Option<Vec<String>>,
    #[serde(default)]
    pub standardize_dates: Option<Vec<String>>,
    #[serde(default)]
    pub cast_types: Option<ConfigMap>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CastType {
    Int,
    Float,
    Str,
    Bool,
}

impl CastType {
    fn parse(raw: &str) -> Option<Self> {
        match raw.to_ascii_lowercase().as_str() {
            "int" | "int32" | "int64" | "integer" => Some(CastType::Int),
            "float" | "float32" | "float64" | "double" => Some(CastType::Float),
            "str" | "string" | "object" => Some(CastType::Str),
            "bool" | "boolean" => Some(CastType::Bool),
            _ => None,
        }
    }

    fn cast(&self, value: &Value) -> Option<Value> {
        match self {
            // Integer columns cannot hold nulls.
            CastType::Int => match value {
                Value::Int(v) => Some(Value::Int(*v)),
                Value::Float(v) if v.is_finite() => Some(Value::Int(v.trunc() as i64)),
                Value::Boolean(v) => Some(Value::Int(i64::from(*v))),
                Value::String(s) => s.trim().parse::<i64>().ok().map(Value::Int),
                _ => None,
            },
            CastType::Float => match value {
                v if v.is_missing() => Some(Value::Null),
                Value::Date(_) | Value::Timestamp(_) | Value::Json(_) => None,
                other => other.as_f64().map(Value::Float),
            },
            CastType::Str => match value {
                Value::Null => Some(Value::Null),
                Value::String(s) => Some(Value::String(s.clone())),
                other => Some(Value::String(other.to_string())),
            },
            CastType::Bool => match value {
                Value::Null => Some(Value::Null),
                other => other.as_bool().map(Value::Boolean),
            },
        }
    }
}

/// Cleaning rules resolved from the step configuration.
///
/// Rules always run in the order of the fields below, whatever order the configuration
/// lists them in.
#[derive(Debug, Default, Clone)]
pub struct DataCleaning {
    drop_columns: Option<Vec<String>>,
    rename_columns: Option<Vec<(String, String)>>,
    lowercase_columns: bool,
    strip_whitespace: bool,
    fill_nulls: Option<Vec<(String, Value)>>,
    drop_nulls: bool,
    drop_null_columns: Option<Vec<String>>,
    deduplicate: bool,
    deduplicate_columns: Option<Vec<String>>,
    standardize_dates: Option<Vec<String>>,
    cast_types: Option<Vec<(String, CastType)>>,
}

impl DataCleaning {
    pub fn new(settings: CleaningSettings) -> Result<Self, ConnectorError> {
        let rename_columns = settings
            .rename_columns
            .map(|map| {
                map.into_iter()
                    .map(|(from, to)| match to {
                        serde_json::Value::String(to) => Ok((from, to)),
                        other => Err(ConnectorError::invalid_config(
                            KEY,
                            format!("rename_columns.{from} must be a string, got {other}"),
                        )),
                    })
                    .collect::<Result<Vec<_>, _>>()
            })
            .transpose()?;

        let cast_types = settings
            .cast_types
            .map(|map| {
                map.into_iter()
                    .map(|(column, target)| {
                        target
                            .as_str()
                            .and_then(CastType::parse)
                            .map(|ty| (column.clone(), ty))
                            .ok_or_else(|| {
                                ConnectorError::invalid_config(
                                    KEY,
                                    format!("cast_types.{column}: unsupported type {target}"),
                                )
                            })
                    })
                    .collect::<Result<Vec<_>, _>>()
            })
            .transpose()?;

        let fill_nulls = settings
            .fill_nulls
            .map(|map| map.into_iter().map(|(k, v)| (k, Value::from(v))).collect());

        Ok(DataCleaning {
            drop_columns: settings.drop_columns,
            rename_columns,
            lowercase_columns: settings.lowercase_columns,
            strip_whitespace: settings.strip_whitespace,
            fill_nulls,
            drop_nulls: settings.drop_nulls,
            drop_null_columns: settings.drop_null_columns,
            deduplicate: settings.deduplicate,
            deduplicate_columns: settings.deduplicate_columns,
            standardize_dates: settings.standardize_dates,
            cast_types,
        })
    }

    pub fn apply(&self, input: &Dataset) -> Dataset {
        let mut ds = input.clone();

        if let Some(columns) = &self.drop_columns {
            let missing = missing_columns(&ds, columns);
            if !missing.is_empty() {
                warn!(rule = "drop_columns", ?missing, "Columns not found, skipping");
            }
            for column in columns {
                ds.drop_column(column);
            }
        }

        if let Some(mapping) = &self.rename_columns {
            let missing: Vec<&String> = mapping
                .iter()
                .map(|(from, _)| from)
                .filter(|from| !ds.has_column(from))
                .collect();
            if !missing.is_empty() {
                warn!(rule = "rename_columns", ?missing, "Columns not found, skipping");
            }
            ds = rename_all(&ds, |name| {
                mapping
                    .iter()
                    .find(|(from, _)| from == name)
                    .map(|(_, to)| to.clone())
                    .unwrap_or_else(|| name.to_string())
            });
        }

        if self.lowercase_columns {
            ds = rename_all(&ds, |name| name.to_lowercase());
        }

        if self.strip_whitespace {
            for column in ds.columns().to_vec() {
                ds.map_column(&column, |value| match value {
                    Value::String(s) => Value::String(s.trim().to_string()),
                    other => other.clone(),
                });
            }
        }

        if let Some(fills) = &self.fill_nulls {
            for (column, fill) in fills {
                if !ds.has_column(column) {
                    warn!(rule = "fill_nulls", column = %column, "Column not found, skipping");
                    continue;
                }
                ds.map_column(column, |value| {
                    if value.is_missing() {
                        fill.clone()
                    } else {
                        value.clone()
                    }
                });
            }
        }

        if self.drop_nulls {
            let columns = ds.columns().to_vec();
            ds.retain_rows(|row| !any_missing(row, &columns));
        }

        if let Some(columns) = &self.drop_null_columns {
            let existing = self.existing_or_warn(&ds, "drop_null_columns", columns);
            if !existing.is_empty() {
                ds.retain_rows(|row| !any_missing(row, &existing));
            }
        }

        if self.deduplicate {
            let columns = ds.columns().to_vec();
            dedupe_on(&mut ds, &columns);
        }

        if let Some(columns) = &self.deduplicate_columns {
            let existing = self.existing_or_warn(&ds, "deduplicate_columns", columns);
            if !existing.is_empty() {
                dedupe_on(&mut ds, &existing);
            }
        }

        if let Some(columns) = &self.standardize_dates {
            for column in columns {
                if !ds.has_column(column) {
                    warn!(rule = "standardize_dates", column = %column, "Column not found, skipping");
                    continue;
                }
                ds.map_column(column, to_timestamp);
            }
        }

        if let Some(casts) = &self.cast_types {
            for (column, ty) in casts {
                if !ds.has_column(column) {
                    warn!(rule = "cast_types", column = %column, "Column not found, skipping");
                    continue;
                }
                let cast: Option<Vec<Value>> = ds.column(column).map(|v| ty.cast(v)).collect();
                match cast {
                    Some(values) => {
                        let mut values = values.into_iter();
                        ds.map_column(column, |_| values.next().unwrap_or(Value::Null));
                    }
                    None => warn!(
                        rule = "cast_types",
                        column = %column,
                        target = ?ty,
                        "Failed to cast column, keeping original values"
                    ),
                }
            }
        }

        ds
    }

    fn existing_or_warn(&self, ds: &Dataset, rule: &str, columns: &[String]) -> Vec<String> {
        let missing = missing_columns(ds, columns);
        if !missing.is_empty() {
            warn!(rule, ?missing, "Columns not found, skipping");
        }
        columns
            .iter()
            .filter(|c| ds.has_column(c))
            .cloned()
            .collect()
    }
}

fn missing_columns<'a>(ds: &Dataset, columns: &'a [String]) -> Vec<&'a String> {
    columns.iter().filter(|c| !ds.has_column(c)).collect()
}

fn any_missing(row: &RowData, columns: &[String]) -> bool {
    columns
        .iter()
        .any(|c| row.get(c).is_none_or(|v| v.is_missing()))
}

/// Keeps the first row of every distinct combination of `columns`. Missing values compare equal.
fn dedupe_on(ds: &mut Dataset, columns: &[String]) {
    let mut seen: HashSet<Vec<Value>> = HashSet::new();
    ds.retain_rows(|row| {
        let key: Vec<Value> = columns
            .iter()
            .map(|c| {
                let v = row.get_value(c);
                if v.is_missing() { Value::Null } else { v }
            })
            .collect();
        seen.insert(key)
    });
}

fn to_timestamp(value: &Value) -> Value {
    match value {
        Value::Timestamp(ts) => Value::Timestamp(*ts),
        Value::Date(d) => d
            .and_hms_opt(0, 0, 0)
            .map(|ts| Value::Timestamp(ts.and_utc()))
            .unwrap_or(Value::Null),
        Value::String(s) => parse_timestamp(s).map(Value::Timestamp).unwrap_or(Value::Null),
        // Compact dates such as 20240115 first, then epoch seconds.
        Value::Int(v) => parse_timestamp(&v.to_string())
            .or_else(|| DateTime::from_timestamp(*v, 0))
            .map(Value::Timestamp)
            .unwrap_or(Value::Null),
        _ => Value::Null,
    }
}

impl Transform for DataCleaning {
    fn name(&self) -> &str {
        KEY
    }

    fn transform(&self, dataset: &Dataset) -> Result<Dataset, PluginError> {
        let before = dataset.len();
        let result = self.apply(dataset);
        info!(
            transform = KEY,
            rows_before = before,
            rows_after = result.len(),
            removed = before - result.len(),
            "Cleaning complete"
        );
        Ok(result)
    }
}

pub struct DataCleaningFactory;

impl TransformFactory for DataCleaningFactory {
    fn label(&self) -> &str {
        "DataCleaningTransform"
    }

    fn create(
        &self,
        config: ConfigMap,
        _registry: &Registry,
    ) -> Result<Box<dyn Transform>, PluginError> {
        Ok(Box::new(DataCleaning::new(settings(KEY, config)?)?))
    }
}
