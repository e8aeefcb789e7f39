use thiserror::Error;

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("Expected a JSON object for every record, found {0}")]
    NotARecord(String),

    #[error("Expected a JSON array of records or a single object, found {0}")]
    UnsupportedShape(String),
}
