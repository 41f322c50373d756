use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use crate::error::Result;

use super::context::unique_features;
use super::feature::FeatureStore;
use super::sample::SampleStore;

/// Binds a feature store into a sample store for as long as the guard lives.
///
/// The guard derefs to the sample store, so the bound features are used
/// through it. Nested bindings borrow the outer guard mutably, which makes
/// the borrow checker enforce release in reverse order of acquisition:
///
/// ```
/// # use std::sync::Arc;
/// # use octobus::data::model::{Table, Value};
/// # use octobus::store::{FeatureStore, SampleStore, ScopedFeatureBinding, TabularSource};
/// # fn main() -> octobus::Result<()> {
/// # let table = Table::new(vec!["S1".into()], vec!["Age".into()], vec![vec![Value::Integer(40)]])?;
/// # let meta = Arc::new(FeatureStore::new("meta", Arc::new(TabularSource::new(table))));
/// let mut samples = SampleStore::with_entities(["S1"]);
/// {
///     let bound = ScopedFeatureBinding::bind(&mut samples, &meta, None)?;
///     assert_eq!(bound.get_data(None)?.shape(), (1, 1));
/// }
/// assert!(samples.context().is_empty());
/// # Ok(())
/// # }
/// ```
pub struct ScopedFeatureBinding<'a> {
    samples: &'a mut SampleStore,
    store: Arc<FeatureStore>,
    features: Vec<String>,
    active: bool,
}

impl<'a> ScopedFeatureBinding<'a> {
    /// Push `features` of `store` (all of them when `None`) onto `samples`.
    /// Repeated names are bound once.
    pub fn bind(
        samples: &'a mut SampleStore,
        store: &Arc<FeatureStore>,
        features: Option<&[String]>,
    ) -> Result<Self> {
        let features: Vec<String> = unique_features(features.unwrap_or(store.features()))
            .into_iter()
            .cloned()
            .collect();
        samples.bind_features(store, Some(features.as_slice()))?;
        log::info!(">>> {} features are added with {store}", features.len());
        Ok(Self {
            samples,
            store: Arc::clone(store),
            features,
            active: true,
        })
    }

    pub fn store(&self) -> &Arc<FeatureStore> {
        &self.store
    }

    pub fn features(&self) -> &[String] {
        &self.features
    }

    /// Release now instead of at end of scope. Returns how many features
    /// were actually unbound.
    pub fn release(mut self) -> usize {
        self.unbind()
    }

    fn unbind(&mut self) -> usize {
        if !self.active {
            return 0;
        }
        self.active = false;
        let released = self.samples.unbind_features(&self.store, Some(self.features.as_slice()));
        log::info!("<<< {released} features are removed with {}", self.store);
        if released < self.features.len() {
            log::debug!(
                "{} of {} features of {} were shadowed and stay bound",
                self.features.len() - released,
                self.features.len(),
                self.store
            );
        }
        released
    }
}

impl Deref for ScopedFeatureBinding<'_> {
    type Target = SampleStore;

    fn deref(&self) -> &SampleStore {
        &*self.samples
    }
}

impl DerefMut for ScopedFeatureBinding<'_> {
    fn deref_mut(&mut self) -> &mut SampleStore {
        &mut *self.samples
    }
}

impl Drop for ScopedFeatureBinding<'_> {
    fn drop(&mut self) {
        self.unbind();
    }
}
