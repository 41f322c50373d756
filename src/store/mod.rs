/// Store layer: registries, feature views and sample bindings.
///
/// ```text
///   Table ──▶ DataStore (name → TabularSource)
///                 │
///                 ▼
///           FeatureStore (named feature slice, shared via Arc)
///                 │  bind / ScopedFeatureBinding
///                 ▼
///           SampleStore (entity set + FeatureContext stacks)
///                 │  get_data / get_feature
///                 ▼
///           LabeledDataset (X + optional y)
/// ```

pub mod binding;
pub mod context;
pub mod dataset;
pub mod feature;
pub mod registry;
pub mod sample;
pub mod source;

pub use binding::ScopedFeatureBinding;
pub use context::FeatureContext;
pub use dataset::LabeledDataset;
pub use feature::FeatureStore;
pub use registry::DataStore;
pub use sample::SampleStore;
pub use source::TabularSource;
