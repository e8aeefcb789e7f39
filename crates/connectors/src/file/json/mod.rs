use serde::Deserialize;

pub mod sink;
pub mod source;

/// Layout of a JSON document holding a dataset.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orient {
    /// `[{"col": value, ...}, ...]`
    #[default]
    Records,
    /// `{"col": {"0": value, ...}, ...}`
    Columns,
}
