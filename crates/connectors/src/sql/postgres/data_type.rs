use model::core::value::Value;

/// Column types the sink creates and knows how to bind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PgColumnType {
    BigInt,
    Double,
    Boolean,
    Text,
    Date,
    Timestamptz,
    Jsonb,
}

impl PgColumnType {
    pub fn sql(&self) -> &'static str {
        match self {
            PgColumnType::BigInt => "BIGINT",
            PgColumnType::Double => "DOUBLE PRECISION",
            PgColumnType::Boolean => "BOOLEAN",
            PgColumnType::Text => "TEXT",
            PgColumnType::Date => "DATE",
            PgColumnType::Timestamptz => "TIMESTAMPTZ",
            PgColumnType::Jsonb => "JSONB",
        }
    }

    /// Maps `information_schema.columns.data_type` onto a bindable type.
    pub fn from_information_schema(data_type: &str) -> Option<Self> {
        match data_type.to_ascii_lowercase().as_str() {
            "bigint" | "integer" | "smallint" => Some(PgColumnType::BigInt),
            "double precision" | "real" | "numeric" => Some(PgColumnType::Double),
            "boolean" => Some(PgColumnType::Boolean),
            "text" | "character varying" | "character" => Some(PgColumnType::Text),
            "date" => Some(PgColumnType::Date),
            "timestamp with time zone" => Some(PgColumnType::Timestamptz),
            "json" | "jsonb" => Some(PgColumnType::Jsonb),
            _ => None,
        }
    }

    /// Narrowest type that holds every non-missing value of a column.
    pub fn infer<'a>(values: impl Iterator<Item = &'a Value>) -> Self {
        let mut inferred: Option<PgColumnType> = None;
        for value in values.filter(|v| !v.is_missing()) {
            let kind = match value {
                Value::Int(_) => PgColumnType::BigInt,
                Value::Float(_) => PgColumnType::Double,
                Value::Boolean(_) => PgColumnType::Boolean,
                Value::Date(_) => PgColumnType::Date,
                Value::Timestamp(_) => PgColumnType::Timestamptz,
                Value::Json(_) => PgColumnType::Jsonb,
                Value::String(_) | Value::Null => PgColumnType::Text,
            };
            inferred = Some(match (inferred, kind) {
                (None, k) => k,
                (Some(a), b) if a == b => a,
                (Some(PgColumnType::BigInt), PgColumnType::Double)
                | (Some(PgColumnType::Double), PgColumnType::BigInt) => PgColumnType::Double,
                (Some(PgColumnType::Date), PgColumnType::Timestamptz)
                | (Some(PgColumnType::Timestamptz), PgColumnType::Date) => {
                    PgColumnType::Timestamptz
                }
                _ => PgColumnType::Text,
            });
        }
        inferred.unwrap_or(PgColumnType::Text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn infer(values: &[Value]) -> PgColumnType {
        PgColumnType::infer(values.iter())
    }

    #[test]
    fn widens_numeric_and_falls_back_to_text() {
        assert_eq!(infer(&[Value::Int(1), Value::Null]), PgColumnType::BigInt);
        assert_eq!(infer(&[Value::Int(1), Value::Float(2.5)]), PgColumnType::Double);
        assert_eq!(infer(&[Value::Int(1), Value::from("x")]), PgColumnType::Text);
        assert_eq!(infer(&[Value::Null]), PgColumnType::Text);
        assert_eq!(infer(&[Value::Boolean(true)]), PgColumnType::Boolean);
    }

    #[test]
    fn reads_information_schema_names() {
        assert_eq!(
            PgColumnType::from_information_schema("timestamp with time zone"),
            Some(PgColumnType::Timestamptz)
        );
        assert_eq!(PgColumnType::from_information_schema("uuid"), None);
    }
}
