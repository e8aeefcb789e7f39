use crate::registry::Category;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("Duplicate {category} '{key}': already registered to {existing}")]
    Duplicate {
        category: Category,
        key: String,
        existing: String,
    },

    #[error("Unknown {category} '{key}'. Available: {}", format_available(.available))]
    NotFound {
        category: Category,
        key: String,
        available: Vec<String>,
    },

    #[error("Cannot register {found} plugin '{key}' under category {category}")]
    CategoryMismatch {
        category: Category,
        found: Category,
        key: String,
    },
}

fn format_available(available: &[String]) -> String {
    if available.is_empty() {
        "(none)".to_string()
    } else {
        available.join(", ")
    }
}

/// Failure raised by a plugin during connect, extract, transform, load or disconnect.
#[derive(Error, Debug)]
pub enum PluginError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),

    #[error(transparent)]
    External(#[from] Box<dyn std::error::Error + Send + Sync>),
}

/// A transform rejected its input before doing any work.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("Validation failed in transform '{transform}': {message}")]
pub struct ValidationError {
    pub transform: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(transform: impl Into<String>, message: impl Into<String>) -> Self {
        ValidationError {
            transform: transform.into(),
            message: message.into(),
        }
    }
}

#[derive(Error, Debug)]
pub enum StateError {
    #[error("Failed to write state file {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize state: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_lists_keys() {
        let err = RegistryError::NotFound {
            category: Category::Source,
            key: "ftp".into(),
            available: vec!["csv_file".into(), "rest_api".into()],
        };
        assert_eq!(
            err.to_string(),
            "Unknown source 'ftp'. Available: csv_file, rest_api"
        );

        let empty = RegistryError::NotFound {
            category: Category::Sink,
            key: "s3".into(),
            available: vec![],
        };
        assert_eq!(empty.to_string(), "Unknown sink 's3'. Available: (none)");
    }
}
