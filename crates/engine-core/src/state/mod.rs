use crate::error::StateError;
use model::state::cursor::CursorValue;

pub mod json_store;

pub use json_store::JsonCursorStore;

/// Persistence of the last committed cursor per pipeline name.
///
/// Reads never fail: unreadable state is reported as "no cursor known". Writes replace the
/// stored state atomically or leave it untouched.
pub trait CursorStore: Send + Sync {
    fn get(&self, pipeline: &str) -> Option<CursorValue>;

    fn save(&self, pipeline: &str, value: &CursorValue) -> Result<(), StateError>;
}
