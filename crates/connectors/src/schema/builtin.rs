use crate::schema::{DeclaredSchema, FieldKind};

pub fn todo() -> DeclaredSchema {
    DeclaredSchema::new("TodoItem")
        .field("userId", FieldKind::Int { min: Some(1) })
        .field("id", FieldKind::Int { min: Some(1) })
        .field("title", FieldKind::Str { min_len: 1 })
        .field("completed", FieldKind::Bool)
}

pub fn user() -> DeclaredSchema {
    DeclaredSchema::new("User")
        .field("id", FieldKind::Int { min: Some(1) })
        .field("name", FieldKind::Str { min_len: 1 })
        .field("email", FieldKind::Email)
}

/// Raw daily price bar: positive prices, non-negative volume.
pub fn ohlcv() -> DeclaredSchema {
    let price = FieldKind::Float {
        min: None,
        exclusive_min: Some(0.0),
    };
    DeclaredSchema::new("OHLCVRecord")
        .field("date", FieldKind::Str { min_len: 0 })
        .field("open", price.clone())
        .field("high", price.clone())
        .field("low", price.clone())
        .field("close", price)
        .field(
            "volume",
            FieldKind::Float {
                min: Some(0.0),
                exclusive_min: None,
            },
        )
}

/// Every schema shipped with the crate, keyed the way pipelines reference them.
pub fn builtin_schemas() -> Vec<(&'static str, DeclaredSchema)> {
    vec![("todo", todo()), ("user", user()), ("ohlcv", ohlcv())]
}
