use model::state::cursor::CursorValue;
use std::fmt;

/// Outcome of one successful pipeline run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub pipeline: String,
    pub rows_extracted: usize,
    pub rows_loaded: usize,
    /// Cursor passed to the source, if the run was incremental and one was known.
    pub cursor_used: Option<CursorValue>,
    /// Cursor persisted after the load, if any.
    pub committed_cursor: Option<CursorValue>,
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} rows extracted, {} rows loaded",
            self.pipeline, self.rows_extracted, self.rows_loaded
        )?;
        if let Some(cursor) = &self.committed_cursor {
            write!(f, ", cursor -> {cursor}")?;
        }
        Ok(())
    }
}
