use crate::error::CliError;
use std::{collections::BTreeMap, fs, io, path::Path};

/// Variables read from a `.env` file, applied to the process environment before the runtime
/// starts. Variables already present in the environment are never overwritten.
#[derive(Debug, Clone, Default)]
pub struct EnvManager {
    vars: BTreeMap<String, String>,
}

impl EnvManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads `path` if it exists. A missing file is not an error.
    pub fn load_optional<P: AsRef<Path>>(&mut self, path: P) -> Result<bool, CliError> {
        let path = path.as_ref();
        match fs::read_to_string(path) {
            Ok(content) => {
                self.parse_env_content(&content)?;
                Ok(true)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(CliError::Env(format!(
                "failed to read {}: {e}",
                path.display()
            ))),
        }
    }

    pub fn all(&self) -> &BTreeMap<String, String> {
        &self.vars
    }

    /// Exports the loaded variables. Must run before any other thread exists.
    pub fn apply(&self) {
        for (key, value) in &self.vars {
            if std::env::var_os(key).is_none() {
                // SAFETY: called from `main` before the tokio runtime or any other thread starts.
                unsafe { std::env::set_var(key, value) };
            }
        }
    }

    fn parse_env_content(&mut self, content: &str) -> Result<(), CliError> {
        for (line_num, line) in content.lines().enumerate() {
            let line = line.trim();

            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let line = line.strip_prefix("export ").unwrap_or(line);
            let Some((key, value)) = line.split_once('=') else {
                return Err(CliError::Env(format!(
                    "malformed line {} (expected KEY=VALUE)",
                    line_num + 1
                )));
            };

            let key = key.trim();
            if key.is_empty() {
                return Err(CliError::Env(format!("empty key at line {}", line_num + 1)));
            }

            self.vars.insert(key.to_string(), Self::unquote_value(value));
        }

        Ok(())
    }

    fn unquote_value(value: &str) -> String {
        let value = value.trim();
        for quote in ['"', '\''] {
            if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
                return value[1..value.len() - 1].to_string();
            }
        }
        value.to_string()
    }
}
