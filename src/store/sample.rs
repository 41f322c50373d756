use std::collections::BTreeSet;
use std::sync::Arc;

use crate::data::filter::FilterRule;
use crate::data::model::{Mask, Series, Table};
use crate::error::{Error, Result};

use super::context::{unique_features, FeatureContext};
use super::feature::FeatureStore;

/// A working selection of entities plus the features visible to it.
///
/// The entity set and the feature context change independently: binding
/// features never adds entities, and filtering never touches bindings.
/// Entities are kept sorted, so every returned table is indexed in sorted
/// entity order.
#[derive(Debug, Default)]
pub struct SampleStore {
    entities: BTreeSet<String>,
    context: FeatureContext,
}

impl SampleStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entities<I, S>(entities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut store = Self::new();
        store.add_entities(entities);
        store
    }

    pub fn entities(&self) -> &BTreeSet<String> {
        &self.entities
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn context(&self) -> &FeatureContext {
        &self.context
    }

    /// Union `entities` into the selection.
    pub fn add_entities<I, S>(&mut self, entities: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.entities.extend(entities.into_iter().map(Into::into));
    }

    /// Drop every entity for which `mask` is true. Returns how many were dropped.
    ///
    /// Mask entries for entities outside the selection are ignored.
    pub fn filter(&mut self, mask: &Mask) -> usize {
        let before = self.entities.len();
        self.entities
            .retain(|entity| !mask.get(entity).copied().unwrap_or(false));
        let removed = before - self.entities.len();
        log::debug!("filter removed {removed} of {before} entities");
        removed
    }

    /// Drop every entity whose value for `rule.feature` satisfies the rule.
    pub fn exclude(&mut self, rule: &FilterRule) -> Result<usize> {
        let column = self.get_feature(&rule.feature)?;
        Ok(self.filter(&rule.mask(&column)))
    }

    pub fn bind_features(&mut self, store: &Arc<FeatureStore>, features: Option<&[String]>) -> Result<()> {
        self.context.push(store, features)
    }

    /// Returns how many features were released; mismatched pops are skipped.
    pub fn unbind_features(&mut self, store: &Arc<FeatureStore>, features: Option<&[String]>) -> usize {
        self.context.pop(store, features)
    }

    /// Combined table over the current selection.
    ///
    /// `features` defaults to every active feature. Features are grouped by
    /// the store they resolve to; stores appear in first-occurrence order of
    /// the request and each store's columns keep their request order. A
    /// feature requested twice appears once, at its first position.
    pub fn get_data(&self, features: Option<&[String]>) -> Result<Table> {
        let features = features.unwrap_or(self.context.active_features());

        let mut groups: Vec<(&Arc<FeatureStore>, Vec<String>)> = Vec::new();
        for feature in unique_features(features) {
            let store = self
                .context
                .resolve(feature)
                .ok_or_else(|| Error::UnboundFeature(feature.clone()))?;
            match groups.iter_mut().find(|(s, _)| Arc::ptr_eq(s, store)) {
                Some((_, group)) => group.push(feature.clone()),
                None => groups.push((store, vec![feature.clone()])),
            }
        }

        let entities = self.entity_list();
        let mut data = Table::empty(entities.clone())?;
        for (store, group) in &groups {
            data = data.hstack(&store.rows_at(&entities, group)?)?;
        }
        Ok(data)
    }

    /// One feature over the current selection.
    pub fn get_feature(&self, feature: &str) -> Result<Series> {
        let store = self
            .context
            .resolve(feature)
            .ok_or_else(|| Error::UnboundFeature(feature.to_string()))?;
        store.column_at(&self.entity_list(), feature)
    }

    fn entity_list(&self) -> Vec<String> {
        self.entities.iter().cloned().collect()
    }
}
