use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use crate::data::model::{Series, Table};
use crate::error::{Error, KeyKind, Result};

use super::source::TabularSource;

/// A named view over a [`TabularSource`] restricted to a fixed feature list.
///
/// Entities are always those of the underlying source.
#[derive(Debug)]
pub struct FeatureStore {
    name: String,
    features: Vec<String>,
    owned: HashSet<String>,
    source: Arc<TabularSource>,
}

impl FeatureStore {
    /// View over every feature of `source`.
    pub fn new(name: impl Into<String>, source: Arc<TabularSource>) -> Self {
        let features = source.features().to_vec();
        let owned = features.iter().cloned().collect();
        Self {
            name: name.into(),
            features,
            owned,
            source,
        }
    }

    /// View over `features` of `source`, in the given order.
    pub fn with_features<I, S>(name: impl Into<String>, source: Arc<TabularSource>, features: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let features: Vec<String> = features.into_iter().map(Into::into).collect();
        let mut owned = HashSet::with_capacity(features.len());
        for feature in &features {
            if !source.has_feature(feature) {
                return Err(Error::feature_not_found(feature.clone()));
            }
            if !owned.insert(feature.clone()) {
                return Err(Error::DuplicateKey {
                    kind: KeyKind::Feature,
                    key: feature.clone(),
                });
            }
        }
        Ok(Self {
            name: name.into(),
            features,
            owned,
            source,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn features(&self) -> &[String] {
        &self.features
    }

    pub fn entities(&self) -> &[String] {
        self.source.entities()
    }

    pub fn owns(&self, feature: &str) -> bool {
        self.owned.contains(feature)
    }

    /// Fails with `KeyNotFound` on the first feature this store does not expose.
    pub fn check_features(&self, features: &[String]) -> Result<()> {
        match features.iter().find(|f| !self.owns(f)) {
            Some(missing) => Err(Error::feature_not_found(missing.clone())),
            None => Ok(()),
        }
    }

    pub fn rows_at(&self, entities: &[String], features: &[String]) -> Result<Table> {
        self.check_features(features)?;
        self.source.rows_at(entities, features)
    }

    pub fn column_at(&self, entities: &[String], feature: &str) -> Result<Series> {
        if !self.owns(feature) {
            return Err(Error::feature_not_found(feature));
        }
        self.source.column_at(entities, feature)
    }
}

impl fmt::Display for FeatureStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [feature store]", self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::Value;
    use pretty_assertions::assert_eq;

    fn genus() -> Arc<TabularSource> {
        Arc::new(
            Table::new(
                vec!["s1".into(), "s2".into()],
                vec!["g__A".into(), "g__B".into(), "g__C".into()],
                vec![
                    vec![Value::Float(0.1), Value::Float(0.2), Value::Float(0.7)],
                    vec![Value::Float(0.5), Value::Float(0.5), Value::Float(0.0)],
                ],
            )
            .unwrap()
            .into(),
        )
    }

    #[test]
    fn test_default_uses_every_feature() {
        let store = FeatureStore::new("genus", genus());
        assert_eq!(store.features(), genus().features());
        assert_eq!(store.entities(), genus().entities());
        assert_eq!(store.to_string(), "genus [feature store]");
    }

    #[test]
    fn test_subset_is_exact() {
        let store = FeatureStore::with_features("genus", genus(), ["g__C", "g__A"]).unwrap();
        assert_eq!(store.features(), &["g__C".to_string(), "g__A".to_string()][..]);
        let rows = store.rows_at(&["s1".into()], &["g__A".into()]).unwrap();
        assert_eq!(rows.get("s1", "g__A"), Some(&Value::Float(0.1)));
    }

    #[test]
    fn test_request_outside_subset_fails() {
        let store = FeatureStore::with_features("genus", genus(), ["g__A"]).unwrap();
        // g__B exists in the source but not in this view
        assert_eq!(
            store.rows_at(&["s1".into()], &["g__B".into()]).unwrap_err(),
            Error::feature_not_found("g__B")
        );
        assert!(store.column_at(&["s1".into()], "g__B").is_err());
    }

    #[test]
    fn test_subset_must_exist_in_source() {
        let err = FeatureStore::with_features("genus", genus(), ["g__Z"]).unwrap_err();
        assert_eq!(err, Error::feature_not_found("g__Z"));
    }

    #[test]
    fn test_subset_rejects_repeats() {
        let err = FeatureStore::with_features("genus", genus(), ["g__A", "g__A"]).unwrap_err();
        assert!(matches!(err, Error::DuplicateKey { .. }));
    }
}
