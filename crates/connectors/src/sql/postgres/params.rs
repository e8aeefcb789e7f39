use crate::{error::ConnectorError, sql::postgres::data_type::PgColumnType};
use chrono::{DateTime, NaiveDate, Utc};
use model::core::{utils::parse_timestamp, value::Value};
use tokio_postgres::types::{Json as PgJson, ToSql};

pub struct PgParam(Box<dyn ToSql + Sync + Send>);

impl PgParam {
    /// Binds `value` as `ty`. Missing values bind as SQL NULL of that type.
    pub fn coerce(value: &Value, ty: PgColumnType) -> Result<Self, ConnectorError> {
        let mismatch = || {
            ConnectorError::InvalidData(format!("cannot write {value:?} into a {} column", ty.sql()))
        };
        let missing = value.is_missing();

        let param = match ty {
            PgColumnType::BigInt => {
                let v: Option<i64> = if missing {
                    None
                } else {
                    Some(value.as_i64().ok_or_else(mismatch)?)
                };
                PgParam(Box::new(v))
            }
            PgColumnType::Double => {
                let v: Option<f64> = if missing {
                    None
                } else {
                    Some(value.as_f64().ok_or_else(mismatch)?)
                };
                PgParam(Box::new(v))
            }
            PgColumnType::Boolean => {
                let v: Option<bool> = if missing {
                    None
                } else {
                    Some(value.as_bool().ok_or_else(mismatch)?)
                };
                PgParam(Box::new(v))
            }
            PgColumnType::Text => {
                let v: Option<String> = match value {
                    _ if missing => None,
                    Value::String(s) => Some(s.clone()),
                    other => Some(other.to_string()),
                };
                PgParam(Box::new(v))
            }
            PgColumnType::Date => {
                let v: Option<NaiveDate> = match value {
                    _ if missing => None,
                    Value::Date(d) => Some(*d),
                    Value::Timestamp(ts) => Some(ts.date_naive()),
                    Value::String(s) => Some(parse_timestamp(s).ok_or_else(mismatch)?.date_naive()),
                    _ => return Err(mismatch()),
                };
                PgParam(Box::new(v))
            }
            PgColumnType::Timestamptz => {
                let v: Option<DateTime<Utc>> = match value {
                    _ if missing => None,
                    Value::Timestamp(ts) => Some(*ts),
                    Value::Date(d) => d.and_hms_opt(0, 0, 0).map(|ts| ts.and_utc()),
                    Value::String(s) => Some(parse_timestamp(s).ok_or_else(mismatch)?),
                    _ => return Err(mismatch()),
                };
                PgParam(Box::new(v))
            }
            PgColumnType::Jsonb => {
                let v: Option<PgJson<serde_json::Value>> =
                    if missing { None } else { Some(PgJson(value.to_json())) };
                PgParam(Box::new(v))
            }
        };
        Ok(param)
    }
}

impl AsRef<dyn ToSql + Sync> for PgParam {
    fn as_ref(&self) -> &(dyn ToSql + Sync + 'static) {
        &*self.0
    }
}

pub struct PgParamStore {
    pub params: Vec<PgParam>,
}

impl PgParamStore {
    pub fn new(params: Vec<PgParam>) -> Self {
        Self { params }
    }

    pub fn as_refs(&self) -> Vec<&(dyn ToSql + Sync)> {
        self.params.iter().map(|param| param.as_ref()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_text_in_numeric_column() {
        assert!(PgParam::coerce(&Value::from("abc"), PgColumnType::BigInt).is_err());
        assert!(PgParam::coerce(&Value::from("12"), PgColumnType::BigInt).is_ok());
        assert!(PgParam::coerce(&Value::Null, PgColumnType::BigInt).is_ok());
    }

    #[test]
    fn parses_date_strings() {
        assert!(PgParam::coerce(&Value::from("2024-01-15"), PgColumnType::Date).is_ok());
        assert!(PgParam::coerce(&Value::from("soon"), PgColumnType::Timestamptz).is_err());
    }
}
