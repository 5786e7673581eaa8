//! Named collection of indexes.
//!
//! The registry hands out [`Index`] handles by name. Dropping an index
//! through the registry both unregisters it and marks every outstanding
//! handle as dropped.

use std::sync::Arc;

use ahash::AHashMap;
use log::info;
use parking_lot::RwLock;

use crate::error::{QuarryError, Result};
use crate::index::config::IndexConfig;
use crate::index::index::Index;
use crate::index::resolver::ValueResolver;

/// Indexes keyed by name.
#[derive(Debug, Default)]
pub struct IndexRegistry {
    indexes: RwLock<AHashMap<String, Index>>,
}

impl IndexRegistry {
    pub fn new() -> Self {
        IndexRegistry::default()
    }

    /// Create and register an index. Fails if the name is taken.
    pub fn create<S: Into<String>>(
        &self,
        name: S,
        resolver: Option<Arc<dyn ValueResolver>>,
        config: IndexConfig,
    ) -> Result<Index> {
        let name = name.into();
        let mut indexes = self.indexes.write();
        if indexes.contains_key(&name) {
            return Err(QuarryError::invalid_argument(format!(
                "Index '{name}' already exists"
            )));
        }
        let index = Index::with_config(name.clone(), resolver, config)?;
        indexes.insert(name, index.clone());
        Ok(index)
    }

    /// A new handle to a registered index.
    pub fn get(&self, name: &str) -> Result<Index> {
        self.indexes
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| QuarryError::index_not_found(name))
    }

    /// Unregister an index and drop its contents.
    pub fn drop_index(&self, name: &str) -> Result<()> {
        let index = self
            .indexes
            .write()
            .remove(name)
            .ok_or_else(|| QuarryError::index_not_found(name))?;
        index.drop_index();
        info!("Unregistered index '{name}'");
        Ok(())
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.indexes.read().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.indexes.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.indexes.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_create_get_drop() {
        let registry = IndexRegistry::new();
        assert!(registry.is_empty());

        let index = registry
            .create("b", None, IndexConfig::default())
            .unwrap();
        registry.create("a", None, IndexConfig::default()).unwrap();
        assert_eq!(registry.names(), vec!["a".to_string(), "b".to_string()]);

        let err = registry
            .create("a", None, IndexConfig::default())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);

        let again = registry.get("b").unwrap();
        assert_eq!(again.name(), "b");

        registry.drop_index("b").unwrap();
        assert!(index.is_dropped());
        assert!(again.is_dropped());
        assert_eq!(registry.get("b").unwrap_err().kind(), ErrorKind::IndexNotFound);
        assert_eq!(
            registry.drop_index("b").unwrap_err().kind(),
            ErrorKind::IndexNotFound
        );
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_invalid_config_is_not_registered() {
        let registry = IndexRegistry::new();
        let config = IndexConfig {
            page_size: 0,
            ..IndexConfig::default()
        };
        assert!(registry.create("x", None, config).is_err());
        assert!(registry.is_empty());
    }
}
