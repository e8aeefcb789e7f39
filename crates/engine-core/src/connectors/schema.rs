use model::records::row::RowData;

/// A named record model that rows can be checked against.
pub trait RecordSchema: Send + Sync {
    fn label(&self) -> &str;

    /// Returns every violation found in `row`. Non-strict checking accepts lossless coercions
    /// such as `"3"` for an integer field.
    fn check(&self, row: &RowData, strict: bool) -> Result<(), Vec<String>>;
}
