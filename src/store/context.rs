use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::error::Result;

use super::feature::FeatureStore;

/// Per-feature visibility stacks.
///
/// Every feature name maps to the stores that currently expose it, in push
/// order. Reads see the top of the stack, so a later push shadows an earlier
/// one until it is popped again.
///
/// `pop` only removes a store that is on top for that feature. A pop that
/// does not match the top is skipped without error; pushes and pops must
/// therefore nest, or a stale store stays visible.
#[derive(Debug, Default)]
pub struct FeatureContext {
    stacks: HashMap<String, Vec<Arc<FeatureStore>>>,
    /// Feature names with a non-empty stack, in first-push order.
    order: Vec<String>,
}

impl FeatureContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Push `store` for `features` (all of its features when `None`).
    ///
    /// Every named feature must belong to the store; nothing is pushed
    /// otherwise. A name listed twice is pushed once.
    pub fn push(&mut self, store: &Arc<FeatureStore>, features: Option<&[String]>) -> Result<()> {
        let features = features.unwrap_or(store.features());
        store.check_features(features)?;
        for feature in unique_features(features) {
            if !self.stacks.contains_key(feature) {
                self.order.push(feature.clone());
            }
            self.stacks
                .entry(feature.clone())
                .or_default()
                .push(Arc::clone(store));
        }
        Ok(())
    }

    /// Pop `store` for `features` (all of its features when `None`).
    ///
    /// Returns how many features were actually released.
    pub fn pop(&mut self, store: &Arc<FeatureStore>, features: Option<&[String]>) -> usize {
        let features = features.unwrap_or(store.features());
        let mut released = 0;
        for feature in unique_features(features) {
            let Some(stack) = self.stacks.get_mut(feature) else {
                log::debug!("pop of {feature} from {store} skipped: not bound");
                continue;
            };
            match stack.last() {
                Some(top) if Arc::ptr_eq(top, store) => {
                    stack.pop();
                    released += 1;
                }
                _ => {
                    log::debug!("pop of {feature} from {store} skipped: not top of stack");
                    continue;
                }
            }
            if stack.is_empty() {
                self.stacks.remove(feature);
                self.order.retain(|f| f != feature);
            }
        }
        released
    }

    /// The store currently visible for `feature`.
    pub fn resolve(&self, feature: &str) -> Option<&Arc<FeatureStore>> {
        self.stacks.get(feature).and_then(|stack| stack.last())
    }

    /// Features with at least one store bound.
    pub fn active_features(&self) -> &[String] {
        &self.order
    }

    /// Number of stores stacked on `feature`.
    pub fn depth(&self, feature: &str) -> usize {
        self.stacks.get(feature).map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

/// `features` without repeats, in first-occurrence order.
pub(crate) fn unique_features(features: &[String]) -> Vec<&String> {
    let mut seen = HashSet::with_capacity(features.len());
    features.iter().filter(|f| seen.insert(f.as_str())).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::{Table, Value};
    use crate::error::Error;
    use crate::store::source::TabularSource;
    use pretty_assertions::assert_eq;

    fn store(name: &str, features: &[&str]) -> Arc<FeatureStore> {
        let columns: Vec<String> = features.iter().map(|f| f.to_string()).collect();
        let row = vec![Value::Integer(1); columns.len()];
        let table = Table::new(vec!["s1".into()], columns, vec![row]).unwrap();
        Arc::new(FeatureStore::new(name, Arc::new(TabularSource::new(table))))
    }

    fn names(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_push_then_pop_restores_empty_context() {
        let mut ctx = FeatureContext::new();
        let a = store("a", &["f", "g"]);
        ctx.push(&a, None).unwrap();
        assert!(Arc::ptr_eq(ctx.resolve("f").unwrap(), &a));
        assert_eq!(ctx.active_features(), &names(&["f", "g"])[..]);

        assert_eq!(ctx.pop(&a, None), 2);
        assert!(ctx.resolve("f").is_none());
        assert!(ctx.resolve("g").is_none());
        assert!(ctx.is_empty());
    }

    #[test]
    fn test_later_push_shadows_earlier() {
        let mut ctx = FeatureContext::new();
        let a = store("a", &["f"]);
        let b = store("b", &["f"]);
        ctx.push(&a, None).unwrap();
        ctx.push(&b, None).unwrap();
        assert!(Arc::ptr_eq(ctx.resolve("f").unwrap(), &b));
        assert_eq!(ctx.active_features(), &names(&["f"])[..]);

        // a is not on top, so this is a silent no-op
        assert_eq!(ctx.pop(&a, None), 0);
        assert_eq!(ctx.depth("f"), 2);
        assert!(Arc::ptr_eq(ctx.resolve("f").unwrap(), &b));

        assert_eq!(ctx.pop(&b, None), 1);
        assert!(Arc::ptr_eq(ctx.resolve("f").unwrap(), &a));
        assert_eq!(ctx.pop(&a, None), 1);
        assert!(ctx.resolve("f").is_none());
        assert_eq!(ctx.depth("f"), 0);
    }

    #[test]
    fn test_out_of_order_pop_leaves_stale_entry() {
        let mut ctx = FeatureContext::new();
        let a = store("a", &["f"]);
        let b = store("b", &["f"]);
        ctx.push(&a, None).unwrap();
        ctx.push(&b, None).unwrap();
        ctx.pop(&a, None);
        ctx.pop(&b, None);
        // a was never removed
        assert!(Arc::ptr_eq(ctx.resolve("f").unwrap(), &a));
    }

    #[test]
    fn test_partial_push_and_pop() {
        let mut ctx = FeatureContext::new();
        let a = store("a", &["f", "g", "h"]);
        ctx.push(&a, Some(names(&["g"]).as_slice())).unwrap();
        assert_eq!(ctx.active_features(), &names(&["g"])[..]);
        assert!(ctx.resolve("f").is_none());

        // popping features that were never pushed is skipped
        assert_eq!(ctx.pop(&a, None), 1);
        assert!(ctx.is_empty());
    }

    #[test]
    fn test_push_foreign_feature_fails_without_side_effects() {
        let mut ctx = FeatureContext::new();
        let a = store("a", &["f"]);
        let err = ctx.push(&a, Some(names(&["f", "zz"]).as_slice())).unwrap_err();
        assert_eq!(err, Error::feature_not_found("zz"));
        assert!(ctx.is_empty());
    }

    #[test]
    fn test_active_features_in_first_push_order() {
        let mut ctx = FeatureContext::new();
        let a = store("a", &["x", "y"]);
        let b = store("b", &["z", "x"]);
        ctx.push(&a, None).unwrap();
        ctx.push(&b, None).unwrap();
        assert_eq!(ctx.active_features(), &names(&["x", "y", "z"])[..]);
    }

    #[test]
    fn test_repeated_feature_pushed_once() {
        let mut ctx = FeatureContext::new();
        let a = store("a", &["f", "g"]);
        ctx.push(&a, Some(names(&["f", "g", "f"]).as_slice())).unwrap();
        assert_eq!(ctx.depth("f"), 1);
        assert_eq!(ctx.active_features(), &names(&["f", "g"])[..]);

        assert_eq!(ctx.pop(&a, Some(names(&["f", "f"]).as_slice())), 1);
        assert_eq!(ctx.depth("f"), 0);
        assert_eq!(ctx.active_features(), &names(&["g"])[..]);
    }
}
