use std::collections::BTreeMap;
use std::sync::Arc;

use crate::data::model::Table;
use crate::error::{Error, Result};

use super::source::TabularSource;

/// Append-only registry of named sources.
///
/// Sources are handed out as `Arc`s so feature stores built on them keep
/// them alive independently of the registry.
#[derive(Debug, Default)]
pub struct DataStore {
    sources: BTreeMap<String, Arc<TabularSource>>,
}

impl DataStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `source` under `name`. A name can only be registered once.
    pub fn register(&mut self, name: impl Into<String>, source: TabularSource) -> Result<Arc<TabularSource>> {
        let name = name.into();
        if self.sources.contains_key(&name) {
            return Err(Error::DuplicateName(name));
        }
        log::info!(
            "ingested data source {name}: {} entities, {} features",
            source.entities().len(),
            source.features().len()
        );
        let source = Arc::new(source);
        self.sources.insert(name, Arc::clone(&source));
        Ok(source)
    }

    /// Wrap a loaded table and register it.
    pub fn ingest(&mut self, name: impl Into<String>, table: Table) -> Result<Arc<TabularSource>> {
        self.register(name, TabularSource::new(table))
    }

    pub fn get(&self, name: &str) -> Result<Arc<TabularSource>> {
        self.sources
            .get(name)
            .cloned()
            .ok_or_else(|| Error::dataset_not_found(name))
    }

    /// Registered names, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.sources.keys().map(|k| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::Value;
    use pretty_assertions::assert_eq;

    fn table(value: i64) -> Table {
        Table::new(
            vec!["s1".into()],
            vec!["f".into()],
            vec![vec![Value::Integer(value)]],
        )
        .unwrap()
    }

    #[test]
    fn test_register_and_get() {
        let mut store = DataStore::new();
        assert!(store.is_empty());
        store.ingest("meta", table(1)).unwrap();
        let src = store.get("meta").unwrap();
        assert_eq!(src.features(), &["f".to_string()][..]);
        assert_eq!(store.names().collect::<Vec<_>>(), vec!["meta"]);
    }

    #[test]
    fn test_duplicate_name_leaves_store_unchanged() {
        let mut store = DataStore::new();
        store.ingest("meta", table(1)).unwrap();
        let err = store.ingest("meta", table(2)).unwrap_err();
        assert_eq!(err, Error::DuplicateName("meta".into()));
        assert_eq!(store.len(), 1);
        assert_eq!(
            store.get("meta").unwrap().table().get("s1", "f"),
            Some(&Value::Integer(1))
        );
    }

    #[test]
    fn test_get_unknown() {
        let store = DataStore::new();
        assert_eq!(store.get("genus").unwrap_err(), Error::dataset_not_found("genus"));
    }
}
