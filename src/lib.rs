//! In-memory bookkeeping over entity × feature tables.
//!
//! Raw tables are registered in a [`DataStore`], sliced into named
//! [`FeatureStore`] views, bound into a [`SampleStore`] (directly or through a
//! [`ScopedFeatureBinding`]) and finally assembled into a [`LabeledDataset`].

pub mod config;
pub mod data;
pub mod error;
pub mod store;

pub use data::filter::{Comparison, FilterRule};
pub use data::model::{Mask, Series, Table, Value};
pub use error::{Error, KeyKind, Result};
pub use store::{
    DataStore, FeatureContext, FeatureStore, LabeledDataset, SampleStore, ScopedFeatureBinding,
    TabularSource,
};
