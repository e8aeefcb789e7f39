use crate::core::value::Value;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FieldValue {
    pub name: String,
    pub value: Value,
}

/// One record of a dataset, with fields kept in insertion order.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RowData {
    pub field_values: Vec<FieldValue>,
}

impl RowData {
    pub fn new(field_values: Vec<FieldValue>) -> Self {
        RowData { field_values }
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let mut row = RowData::default();
        for (name, value) in pairs {
            row.set(name, value.into());
        }
        row
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.field_values
            .iter()
            .find(|f| f.name == field)
            .map(|f| &f.value)
    }

    /// Returns the value of `field`, or `Null` if the row does not carry it.
    pub fn get_value(&self, field: &str) -> Value {
        self.get(field).cloned().unwrap_or(Value::Null)
    }

    pub fn set(&mut self, field: impl Into<String>, value: Value) {
        let field = field.into();
        match self.field_values.iter_mut().find(|f| f.name == field) {
            Some(existing) => existing.value = value,
            None => self.field_values.push(FieldValue { name: field, value }),
        }
    }

    pub fn remove(&mut self, field: &str) -> Option<Value> {
        let idx = self.field_values.iter().position(|f| f.name == field)?;
        Some(self.field_values.remove(idx).value)
    }

    pub fn rename(&mut self, from: &str, to: &str) {
        if from == to {
            return;
        }
        let Some(idx) = self.field_values.iter().position(|f| f.name == from) else {
            return;
        };
        let moved = self.field_values.remove(idx);
        self.set(to, moved.value);
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.field_values.iter().map(|f| f.name.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.field_values.is_empty()
    }
}
