pub mod builtin;

use engine_core::connectors::RecordSchema;
use model::{core::value::Value, records::row::RowData};

#[derive(Debug, Clone, PartialEq)]
pub enum FieldKind {
    Int { min: Option<i64> },
    Float { min: Option<f64>, exclusive_min: Option<f64> },
    Str { min_len: usize },
    Bool,
    Email,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldRule {
    pub name: String,
    pub kind: FieldKind,
}

/// A record model declared as a list of required fields. Fields not declared are ignored.
#[derive(Debug, Clone, PartialEq)]
pub struct DeclaredSchema {
    label: String,
    fields: Vec<FieldRule>,
}

impl DeclaredSchema {
    pub fn new(label: impl Into<String>) -> Self {
        DeclaredSchema {
            label: label.into(),
            fields: Vec::new(),
        }
    }

    pub fn field(mut self, name: impl Into<String>, kind: FieldKind) -> Self {
        self.fields.push(FieldRule {
            name: name.into(),
            kind,
        });
        self
    }

    pub fn fields(&self) -> &[FieldRule] {
        &self.fields
    }
}

impl RecordSchema for DeclaredSchema {
    fn label(&self) -> &str {
        &self.label
    }

    fn check(&self, row: &RowData, strict: bool) -> Result<(), Vec<String>> {
        let violations: Vec<String> = self
            .fields
            .iter()
            .filter_map(|rule| {
                let outcome = match row.get(&rule.name) {
                    None => Err("field required".to_string()),
                    Some(value) => check_value(&rule.kind, value, strict),
                };
                outcome.err().map(|msg| format!("{}: {msg}", rule.name))
            })
            .collect();

        if violations.is_empty() {
            Ok(())
        } else {
            Err(violations)
        }
    }
}

fn check_value(kind: &FieldKind, value: &Value, strict: bool) -> Result<(), String> {
    match kind {
        FieldKind::Int { min } => {
            let v = as_int(value, strict).ok_or("input should be a valid integer")?;
            match min {
                Some(min) if v < *min => {
                    Err(format!("input should be greater than or equal to {min}"))
                }
                _ => Ok(()),
            }
        }
        FieldKind::Float { min, exclusive_min } => {
            let v = as_float(value, strict).ok_or("input should be a valid number")?;
            if let Some(bound) = exclusive_min.filter(|b| v <= *b) {
                return Err(format!("input should be greater than {bound}"));
            }
            if let Some(bound) = min.filter(|b| v < *b) {
                return Err(format!("input should be greater than or equal to {bound}"));
            }
            Ok(())
        }
        FieldKind::Str { min_len } => match value {
            Value::String(s) if s.chars().count() >= *min_len => Ok(()),
            Value::String(_) => Err(format!(
                "string should have at least {min_len} character{}",
                if *min_len == 1 { "" } else { "s" }
            )),
            _ => Err("input should be a valid string".to_string()),
        },
        FieldKind::Bool => match value {
            Value::Boolean(_) => Ok(()),
            other if !strict && lax_bool(other).is_some() => Ok(()),
            _ => Err("input should be a valid boolean".to_string()),
        },
        FieldKind::Email => match value {
            Value::String(s) if is_email(s) => Ok(()),
            _ => Err("value is not a valid email address".to_string()),
        },
    }
}

fn as_int(value: &Value, strict: bool) -> Option<i64> {
    match value {
        Value::Int(v) => Some(*v),
        _ if strict => None,
        Value::Float(v) if v.is_finite() && v.fract() == 0.0 => Some(*v as i64),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn as_float(value: &Value, strict: bool) -> Option<f64> {
    match value {
        Value::Float(v) if v.is_nan() => None,
        Value::Int(_) | Value::Float(_) => value.as_f64(),
        _ if strict => None,
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|v| !v.is_nan()),
        _ => None,
    }
}

fn lax_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Int(0) => Some(false),
        Value::Int(1) => Some(true),
        Value::String(s) => match s.trim().to_lowercase().as_str() {
            "true" | "yes" | "on" | "1" => Some(true),
            "false" | "no" | "off" | "0" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

/// `local@domain.tld` with no whitespace and non-empty dot-separated domain labels.
fn is_email(raw: &str) -> bool {
    if raw.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = raw.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && domain.split('.').all(|label| !label.is_empty())
}
