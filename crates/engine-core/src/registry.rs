use crate::{
    connectors::{RecordSchema, SinkFactory, SourceFactory, TransformFactory},
    error::RegistryError,
};
use std::{collections::BTreeMap, fmt, sync::Arc};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Category {
    Source,
    Transform,
    Sink,
    Schema,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::Source,
        Category::Transform,
        Category::Sink,
        Category::Schema,
    ];
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Category::Source => write!(f, "source"),
            Category::Transform => write!(f, "transform"),
            Category::Sink => write!(f, "sink"),
            Category::Schema => write!(f, "schema"),
        }
    }
}

#[derive(Clone)]
pub enum Plugin {
    Source(Arc<dyn SourceFactory>),
    Transform(Arc<dyn TransformFactory>),
    Sink(Arc<dyn SinkFactory>),
    Schema(Arc<dyn RecordSchema>),
}

impl Plugin {
    pub fn category(&self) -> Category {
        match self {
            Plugin::Source(_) => Category::Source,
            Plugin::Transform(_) => Category::Transform,
            Plugin::Sink(_) => Category::Sink,
            Plugin::Schema(_) => Category::Schema,
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Plugin::Source(f) => f.label(),
            Plugin::Transform(f) => f.label(),
            Plugin::Sink(f) => f.label(),
            Plugin::Schema(s) => s.label(),
        }
    }
}

impl fmt::Debug for Plugin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.category(), self.label())
    }
}

/// Key to factory table, one namespace per [`Category`].
///
/// Populated once at bootstrap and then shared read-only behind an `Arc`.
#[derive(Default, Clone, Debug)]
pub struct Registry {
    entries: BTreeMap<Category, BTreeMap<String, Plugin>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `plugin` under `key`. A duplicate key leaves the first registration in place.
    pub fn register(
        &mut self,
        category: Category,
        key: impl Into<String>,
        plugin: Plugin,
    ) -> Result<(), RegistryError> {
        let key = key.into();
        if plugin.category() != category {
            return Err(RegistryError::CategoryMismatch {
                category,
                found: plugin.category(),
                key,
            });
        }

        let slot = self.entries.entry(category).or_default();
        if let Some(existing) = slot.get(&key) {
            return Err(RegistryError::Duplicate {
                category,
                key,
                existing: existing.label().to_string(),
            });
        }
        slot.insert(key, plugin);
        Ok(())
    }

    pub fn register_source(
        &mut self,
        key: impl Into<String>,
        factory: impl SourceFactory + 'static,
    ) -> Result<(), RegistryError> {
        self.register(Category::Source, key, Plugin::Source(Arc::new(factory)))
    }

    pub fn register_transform(
        &mut self,
        key: impl Into<String>,
        factory: impl TransformFactory + 'static,
    ) -> Result<(), RegistryError> {
        self.register(
            Category::Transform,
            key,
            Plugin::Transform(Arc::new(factory)),
        )
    }

    pub fn register_sink(
        &mut self,
        key: impl Into<String>,
        factory: impl SinkFactory + 'static,
    ) -> Result<(), RegistryError> {
        self.register(Category::Sink, key, Plugin::Sink(Arc::new(factory)))
    }

    pub fn register_schema(
        &mut self,
        key: impl Into<String>,
        schema: impl RecordSchema + 'static,
    ) -> Result<(), RegistryError> {
        self.register(Category::Schema, key, Plugin::Schema(Arc::new(schema)))
    }

    pub fn resolve(&self, category: Category, key: &str) -> Result<&Plugin, RegistryError> {
        self.entries
            .get(&category)
            .and_then(|slot| slot.get(key))
            .ok_or_else(|| RegistryError::NotFound {
                category,
                key: key.to_string(),
                available: self.keys(category),
            })
    }

    pub fn resolve_source(&self, key: &str) -> Result<Arc<dyn SourceFactory>, RegistryError> {
        match self.resolve(Category::Source, key)? {
            Plugin::Source(f) => Ok(Arc::clone(f)),
            other => Err(self.mismatch(Category::Source, other, key)),
        }
    }

    pub fn resolve_transform(
        &self,
        key: &str,
    ) -> Result<Arc<dyn TransformFactory>, RegistryError> {
        match self.resolve(Category::Transform, key)? {
            Plugin::Transform(f) => Ok(Arc::clone(f)),
            other => Err(self.mismatch(Category::Transform, other, key)),
        }
    }

    pub fn resolve_sink(&self, key: &str) -> Result<Arc<dyn SinkFactory>, RegistryError> {
        match self.resolve(Category::Sink, key)? {
            Plugin::Sink(f) => Ok(Arc::clone(f)),
            other => Err(self.mismatch(Category::Sink, other, key)),
        }
    }

    pub fn resolve_schema(&self, key: &str) -> Result<Arc<dyn RecordSchema>, RegistryError> {
        match self.resolve(Category::Schema, key)? {
            Plugin::Schema(s) => Ok(Arc::clone(s)),
            other => Err(self.mismatch(Category::Schema, other, key)),
        }
    }

    fn mismatch(&self, category: Category, found: &Plugin, key: &str) -> RegistryError {
        RegistryError::CategoryMismatch {
            category,
            found: found.category(),
            key: key.to_string(),
        }
    }

    /// Sorted keys registered in `category`.
    pub fn keys(&self, category: Category) -> Vec<String> {
        self.entries
            .get(&category)
            .map(|slot| slot.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Every category with its sorted `(key, label)` pairs, including empty categories.
    pub fn list(&self) -> BTreeMap<Category, Vec<(String, String)>> {
        Category::ALL
            .iter()
            .map(|category| {
                let entries = self
                    .entries
                    .get(category)
                    .map(|slot| {
                        slot.iter()
                            .map(|(key, plugin)| (key.clone(), plugin.label().to_string()))
                            .collect()
                    })
                    .unwrap_or_default();
                (*category, entries)
            })
            .collect()
    }
}
