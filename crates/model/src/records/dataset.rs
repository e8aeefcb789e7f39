use crate::{
    core::value::Value,
    records::{error::DatasetError, row::RowData},
};

/// A fully materialized table: an ordered column list plus the rows extracted for one run.
///
/// Rows may omit columns; a missing field reads as `Null`. The column list is what decides
/// whether a column "exists", independent of the values it holds.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    columns: Vec<String>,
    rows: Vec<RowData>,
}

impl Dataset {
    pub fn new(columns: Vec<String>, rows: Vec<RowData>) -> Self {
        let mut dataset = Dataset {
            columns: Vec::with_capacity(columns.len()),
            rows: Vec::new(),
        };
        for column in columns {
            dataset.add_column(column);
        }
        for row in rows {
            dataset.push(row);
        }
        dataset
    }

    /// Builds a dataset whose columns are the union of the row fields, in first-seen order.
    pub fn from_rows(rows: Vec<RowData>) -> Self {
        Dataset::new(Vec::new(), rows)
    }

    /// Accepts a JSON array of objects, or a single object which becomes one row.
    pub fn from_json(value: serde_json::Value) -> Result<Self, DatasetError> {
        match value {
            serde_json::Value::Array(items) => {
                let mut rows = Vec::with_capacity(items.len());
                for item in items {
                    rows.push(Self::record_to_row(item)?);
                }
                Ok(Dataset::from_rows(rows))
            }
            obj @ serde_json::Value::Object(_) => {
                Ok(Dataset::from_rows(vec![Self::record_to_row(obj)?]))
            }
            other => Err(DatasetError::UnsupportedShape(json_kind(&other).to_string())),
        }
    }

    /// Accepts the column-oriented layout `{"col": {"0": v, "1": v}, ...}`.
    pub fn from_json_columns(value: serde_json::Value) -> Result<Self, DatasetError> {
        let serde_json::Value::Object(columns) = value else {
            return Err(DatasetError::UnsupportedShape(json_kind(&value).to_string()));
        };

        let mut index: Vec<String> = Vec::new();
        for cells in columns.values() {
            let serde_json::Value::Object(cells) = cells else {
                return Err(DatasetError::NotARecord(json_kind(cells).to_string()));
            };
            for key in cells.keys() {
                if !index.contains(key) {
                    index.push(key.clone());
                }
            }
        }

        let names: Vec<String> = columns.keys().cloned().collect();
        let rows = index
            .iter()
            .map(|idx| {
                let mut row = RowData::default();
                for (name, cells) in &columns {
                    let value = cells.get(idx).map(Value::from).unwrap_or(Value::Null);
                    row.set(name.clone(), value);
                }
                row
            })
            .collect();

        Ok(Dataset::new(names, rows))
    }

    fn record_to_row(item: serde_json::Value) -> Result<RowData, DatasetError> {
        match item {
            serde_json::Value::Object(map) => Ok(RowData::from_pairs(
                map.into_iter().map(|(k, v)| (k, Value::from(v))),
            )),
            other => Err(DatasetError::NotARecord(json_kind(&other).to_string())),
        }
    }

    /// Renders every row as a JSON object carrying every column, in column order.
    pub fn to_records(&self) -> Vec<serde_json::Value> {
        self.rows
            .iter()
            .map(|row| {
                let mut obj = serde_json::Map::with_capacity(self.columns.len());
                for column in &self.columns {
                    obj.insert(column.clone(), row.get_value(column).to_json());
                }
                serde_json::Value::Object(obj)
            })
            .collect()
    }

    /// Renders the column-oriented layout accepted by [`Dataset::from_json_columns`].
    pub fn to_columns(&self) -> serde_json::Value {
        let mut out = serde_json::Map::with_capacity(self.columns.len());
        for column in &self.columns {
            let cells = self
                .rows
                .iter()
                .enumerate()
                .map(|(idx, row)| (idx.to_string(), row.get_value(column).to_json()))
                .collect();
            out.insert(column.clone(), serde_json::Value::Object(cells));
        }
        serde_json::Value::Object(out)
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[RowData] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<RowData> {
        self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name)
    }

    /// Values of one column, `Null` where a row lacks the field.
    pub fn column(&self, name: &str) -> impl Iterator<Item = &Value> {
        const NULL: &Value = &Value::Null;
        self.rows.iter().map(move |row| row.get(name).unwrap_or(NULL))
    }

    pub fn add_column(&mut self, name: impl Into<String>) {
        let name = name.into();
        if !self.has_column(&name) {
            self.columns.push(name);
        }
    }

    pub fn push(&mut self, row: RowData) {
        for name in row.names() {
            if !self.has_column(name) {
                self.columns.push(name.to_string());
            }
        }
        self.rows.push(row);
    }

    /// Appends the rows of `other`, extending the column list with any new columns.
    pub fn append(&mut self, other: Dataset) {
        for column in other.columns {
            self.add_column(column);
        }
        for row in other.rows {
            self.push(row);
        }
    }

    pub fn drop_column(&mut self, name: &str) -> bool {
        let Some(idx) = self.columns.iter().position(|c| c == name) else {
            return false;
        };
        self.columns.remove(idx);
        for row in &mut self.rows {
            row.remove(name);
        }
        true
    }

    /// Renames a column in the column list and in every row. Returns false if absent.
    pub fn rename_column(&mut self, from: &str, to: &str) -> bool {
        let Some(idx) = self.columns.iter().position(|c| c == from) else {
            return false;
        };
        if from == to {
            return true;
        }
        if let Some(existing) = self.columns.iter().position(|c| c == to) {
            self.columns.remove(existing);
        }
        let idx = self.columns.iter().position(|c| c == from).unwrap_or(idx);
        self.columns[idx] = to.to_string();
        for row in &mut self.rows {
            row.rename(from, to);
        }
        true
    }

    /// Applies `f` to every cell of `name`, materializing `Null` for rows lacking the field.
    pub fn map_column<F>(&mut self, name: &str, mut f: F)
    where
        F: FnMut(&Value) -> Value,
    {
        for row in &mut self.rows {
            let next = f(&row.get_value(name));
            row.set(name, next);
        }
    }

    pub fn retain_rows<F>(&mut self, mut keep: F)
    where
        F: FnMut(&RowData) -> bool,
    {
        self.rows.retain(|row| keep(row));
    }
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn columns_follow_first_seen_order() {
        let ds = Dataset::from_json(json!([
            {"id": 1, "name": "a"},
            {"id": 2, "extra": true},
        ]))
        .unwrap();

        assert_eq!(ds.columns(), &["id", "name", "extra"]);
        assert_eq!(
            ds.to_records()[1],
            json!({"id": 2, "name": null, "extra": true})
        );
    }

    #[test]
    fn single_object_becomes_one_row() {
        let ds = Dataset::from_json(json!({"x": 1})).unwrap();
        assert_eq!(ds.len(), 1);
    }

    #[test]
    fn rejects_scalars_and_non_record_items() {
        assert!(Dataset::from_json(json!(3)).is_err());
        assert!(Dataset::from_json(json!([1, 2])).is_err());
    }

    #[test]
    fn column_layout_round_trip() {
        let ds = Dataset::from_json_columns(json!({
            "a": {"0": 1, "1": 2},
            "b": {"0": "x", "1": "y"},
        }))
        .unwrap();

        assert_eq!(ds.to_records(), vec![json!({"a": 1, "b": "x"}), json!({"a": 2, "b": "y"})]);
        assert_eq!(Dataset::from_json_columns(ds.to_columns()).unwrap(), ds);
    }

    #[test]
    fn rename_and_drop_update_rows() {
        let mut ds = Dataset::from_json(json!([{"A": 1, "B": 2}])).unwrap();
        assert!(ds.rename_column("A", "a"));
        assert!(ds.drop_column("B"));
        assert!(!ds.drop_column("B"));
        assert_eq!(ds.to_records(), vec![json!({"a": 1})]);
    }
}
