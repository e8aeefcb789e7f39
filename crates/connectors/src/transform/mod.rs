pub mod cleaning;
pub mod indicators;
pub mod pass_through;
pub mod validation;

use model::records::{dataset::Dataset, row::RowData};

/// Renames every column through `rename` at once, so `a -> b, b -> c` never chains.
pub(crate) fn rename_all<F>(dataset: &Dataset, rename: F) -> Dataset
where
    F: Fn(&str) -> String,
{
    let columns = dataset.columns().iter().map(|c| rename(c.as_str())).collect();
    let rows = dataset
        .rows()
        .iter()
        .map(|row| {
            RowData::from_pairs(
                row.field_values
                    .iter()
                    .map(|f| (rename(f.name.as_str()), f.value.clone())),
            )
        })
        .collect();
    Dataset::new(columns, rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn renames_simultaneously() {
        let ds = Dataset::from_json(json!([{"a": 1, "b": 2}])).unwrap();
        let renamed = rename_all(&ds, |c| match c {
            "a" => "b".to_string(),
            "b" => "c".to_string(),
            other => other.to_string(),
        });
        assert_eq!(renamed.to_records(), vec![json!({"b": 1, "c": 2})]);
    }
}
