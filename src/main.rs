use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};

use octobus::config::{FeatureStoreConfig, PipelineConfig};
use octobus::data::loader::{load_table, write_csv};
use octobus::{DataStore, FeatureStore, LabeledDataset, SampleStore, ScopedFeatureBinding};

fn main() -> Result<()> {
    env_logger::init();

    let path: PathBuf = std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .context("usage: octobus <pipeline.json>")?;
    let config = PipelineConfig::load(&path)?;

    // 1. Load and register every table
    let mut data_store = DataStore::new();
    for table in &config.tables {
        let loaded = load_table(&table.path, &table.load_options()?)
            .with_context(|| format!("loading table {} from {}", table.name, table.path.display()))?;
        data_store.ingest(&table.name, loaded)?;
    }

    // 2. Slice feature stores out of the registered tables
    let stores = config
        .feature_stores
        .iter()
        .map(|fs| build_feature_store(&data_store, fs))
        .collect::<Result<Vec<_>>>()?;
    for store in &stores {
        println!(
            "{store}: {} entities, {} features",
            store.entities().len(),
            store.features().len()
        );
    }

    // 3. Seed the sample selection and assemble the dataset inside nested bindings
    let seed = stores
        .iter()
        .find(|s| s.name() == config.samples_from)
        .context("samples_from store is not defined")?;
    let mut samples = SampleStore::with_entities(seed.entities().iter().cloned());
    let dataset = assemble_bound(&mut samples, &stores, &config)?;

    println!(
        "features out of context: {:?}",
        samples.context().active_features()
    );

    // 4. Report
    let combined = dataset.combined(config.label.is_some())?;
    match &config.output {
        Some(output) => {
            write_csv(&combined, output, &config.index_label)?;
            println!(
                "wrote {} entities x {} columns to {}",
                combined.shape().0,
                combined.shape().1,
                output.display()
            );
        }
        None => println!("data set:\n{combined}"),
    }
    Ok(())
}

fn build_feature_store(data_store: &DataStore, config: &FeatureStoreConfig) -> Result<Arc<FeatureStore>> {
    let source = data_store.get(&config.table)?;
    let mut features = config
        .features
        .clone()
        .unwrap_or_else(|| source.features().to_vec());
    if let Some(limit) = config.limit {
        features.truncate(limit);
    }
    let store = FeatureStore::with_features(&config.name, source, features)
        .with_context(|| format!("building feature store {}", config.name))?;
    Ok(Arc::new(store))
}

/// Bind `stores` one scope inside the other, then assemble the dataset from
/// the innermost scope. Bindings are released on the way out.
fn assemble_bound(
    samples: &mut SampleStore,
    stores: &[Arc<FeatureStore>],
    config: &PipelineConfig,
) -> Result<LabeledDataset> {
    match stores.split_first() {
        Some((store, rest)) => {
            let mut bound = ScopedFeatureBinding::bind(samples, store, None)?;
            assemble_bound(&mut bound, rest, config)
        }
        None => assemble(samples, config),
    }
}

fn assemble(samples: &mut SampleStore, config: &PipelineConfig) -> Result<LabeledDataset> {
    for rule in &config.filters {
        let removed = samples.exclude(rule)?;
        println!(
            "filter {} {:?} {}: removed {removed}, {} entities left",
            rule.feature,
            rule.op,
            rule.value,
            samples.len()
        );
    }

    let features: Vec<String> = match &config.features {
        Some(features) => features.clone(),
        None => samples
            .context()
            .active_features()
            .iter()
            .filter(|f| Some(*f) != config.label.as_ref())
            .cloned()
            .collect(),
    };
    let x = samples.get_data(Some(features.as_slice()))?;

    let dataset = match &config.label {
        Some(label) => LabeledDataset::with_label(x, samples.get_feature(label)?)?,
        None => LabeledDataset::new(x),
    };
    Ok(dataset)
}
