use crate::{error::StateError, state::CursorStore};
use model::state::cursor::CursorValue;
use std::{
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
};
use tempfile::NamedTempFile;
use tracing::{debug, warn};

type StateMap = serde_json::Map<String, serde_json::Value>;

/// Cursor store backed by a single JSON object file, `{"pipeline": cursor, ...}`.
///
/// `save` is a read-modify-write without locking; concurrent writers against the same file can
/// lose updates.
#[derive(Debug, Clone)]
pub struct JsonCursorStore {
    path: PathBuf,
}

impl JsonCursorStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the whole state map, degrading to empty on any problem.
    pub fn read_all(&self) -> StateMap {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return StateMap::new(),
            Err(err) => {
                warn!(path = %self.path.display(), error = %err, "State file unreadable, ignoring");
                return StateMap::new();
            }
        };

        if text.trim().is_empty() {
            warn!(path = %self.path.display(), "State file is empty, ignoring");
            return StateMap::new();
        }

        match serde_json::from_str::<serde_json::Value>(&text) {
            Ok(serde_json::Value::Object(map)) => map,
            Ok(_) => {
                warn!(path = %self.path.display(), "State file is not a JSON object, ignoring");
                StateMap::new()
            }
            Err(err) => {
                warn!(path = %self.path.display(), error = %err, "State file is not valid JSON, ignoring");
                StateMap::new()
            }
        }
    }

    fn write_all(&self, state: &StateMap) -> Result<(), StateError> {
        let body = serde_json::to_string_pretty(state)?;
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };

        let write_err = |source: io::Error| StateError::Write {
            path: self.path.clone(),
            source,
        };

        fs::create_dir_all(&dir).map_err(write_err)?;

        // The temp file lives next to the target so the rename stays on one filesystem.
        // Dropping it on an early return deletes it.
        let mut tmp = NamedTempFile::new_in(&dir).map_err(write_err)?;
        tmp.write_all(body.as_bytes()).map_err(write_err)?;
        tmp.as_file().sync_all().map_err(write_err)?;
        tmp.persist(&self.path).map_err(|e| write_err(e.error))?;
        Ok(())
    }
}

impl CursorStore for JsonCursorStore {
    fn get(&self, pipeline: &str) -> Option<CursorValue> {
        let state = self.read_all();
        let raw = state.get(pipeline)?;
        let cursor = CursorValue::from_json(raw);
        if cursor.is_none() && !raw.is_null() {
            warn!(pipeline, path = %self.path.display(), "Stored cursor is not a scalar, ignoring");
        }
        cursor
    }

    fn save(&self, pipeline: &str, value: &CursorValue) -> Result<(), StateError> {
        let mut state = self.read_all();
        state.insert(pipeline.to_string(), value.to_json());
        self.write_all(&state)?;
        debug!(pipeline, cursor = %value, path = %self.path.display(), "Cursor saved");
        Ok(())
    }
}
