use std::sync::Arc;

use octobus::data::loader::{load_table, LoadOptions};
use octobus::{
    Comparison, DataStore, Error, FeatureStore, FilterRule, LabeledDataset, SampleStore,
    ScopedFeatureBinding, Table, Value,
};
use pretty_assertions::assert_eq;

fn names(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn table(columns: &[&str], base: i64) -> Table {
    let entities = names(&["s1", "s2", "s3"]);
    let rows = (0..entities.len() as i64)
        .map(|r| {
            (0..columns.len() as i64)
                .map(|c| Value::Integer(base + 10 * r + c))
                .collect()
        })
        .collect();
    Table::new(entities, names(columns), rows).unwrap()
}

#[test]
fn test_register_slice_bind_filter() {
    let mut data_store = DataStore::new();
    data_store.ingest("meta", table(&["Age", "BMI"], 0)).unwrap();
    data_store.ingest("genus", table(&["g__A", "g__B"], 100)).unwrap();
    assert!(matches!(
        data_store.ingest("genus", table(&["g__C"], 0)),
        Err(Error::DuplicateName(_))
    ));

    let meta = Arc::new(FeatureStore::new("meta", data_store.get("meta").unwrap()));
    let genus = Arc::new(FeatureStore::new("genus", data_store.get("genus").unwrap()));

    let mut samples = SampleStore::with_entities(meta.entities().iter().cloned());
    samples.bind_features(&meta, None).unwrap();
    samples.bind_features(&genus, None).unwrap();

    let data = samples.get_data(None).unwrap();
    assert_eq!(data.shape(), (3, 4));
    assert_eq!(data.columns(), &names(&["Age", "BMI", "g__A", "g__B"])[..]);

    samples.filter(&[("s2".to_string(), true)].into());
    let data = samples.get_data(None).unwrap();
    assert_eq!(data.shape(), (2, 4));
    assert_eq!(data.entities(), &names(&["s1", "s3"])[..]);
    assert_eq!(data.get("s3", "g__B"), Some(&Value::Integer(121)));
}

#[test]
fn test_scoped_pipeline_from_files() {
    let dir = tempfile::tempdir().unwrap();
    let meta_path = dir.path().join("metadata.tsv");
    std::fs::write(
        &meta_path,
        "SampleID\tAge\tAntibiotics Usage\n\
         001\t34\tyes\n\
         002\t71\tno\n\
         003\t45\tno\n\
         004\t59\tyes\n",
    )
    .unwrap();
    let genus_path = dir.path().join("genus.csv");
    std::fs::write(
        &genus_path,
        "SampleID,g__Streptococcus,g__Prevotella,g__Bacteroides\n\
         004,0.4,0.1,0.5\n\
         003,0.2,0.3,0.5\n\
         002,0.0,0.9,0.1\n\
         001,0.6,0.2,0.2\n",
    )
    .unwrap();

    let mut data_store = DataStore::new();
    let options = LoadOptions::new("SampleID");
    data_store
        .ingest("meta", load_table(&meta_path, &options).unwrap())
        .unwrap();
    data_store
        .ingest("genus", load_table(&genus_path, &options).unwrap())
        .unwrap();

    let meta = Arc::new(FeatureStore::new("meta", data_store.get("meta").unwrap()));
    let genus = Arc::new(
        FeatureStore::with_features(
            "genus",
            data_store.get("genus").unwrap(),
            ["g__Streptococcus", "g__Prevotella"],
        )
        .unwrap(),
    );

    let mut samples = SampleStore::with_entities(meta.entities().iter().cloned());
    let dataset = {
        let mut with_meta = ScopedFeatureBinding::bind(&mut samples, &meta, None).unwrap();
        let mut with_genus = ScopedFeatureBinding::bind(&mut with_meta, &genus, None).unwrap();

        let removed = with_genus
            .exclude(&FilterRule::new("Age", Comparison::Ge, 60_i64))
            .unwrap();
        assert_eq!(removed, 1);

        let x = with_genus.get_data(Some(genus.features())).unwrap();
        let y = with_genus.get_feature("Antibiotics Usage").unwrap();
        LabeledDataset::with_label(x, y).unwrap()
    };

    assert!(samples.context().is_empty());
    assert_eq!(samples.len(), 3);

    let combined = dataset.combined(true).unwrap();
    assert_eq!(
        combined.columns(),
        &names(&["g__Streptococcus", "g__Prevotella", "Antibiotics Usage"])[..]
    );
    assert_eq!(combined.entities(), &names(&["001", "003", "004"])[..]);
    assert_eq!(combined.get("004", "g__Streptococcus"), Some(&Value::Float(0.4)));
    assert_eq!(combined.get("001", "Antibiotics Usage"), Some(&Value::from("yes")));
}

#[test]
fn test_shadowing_across_scopes() {
    let mut data_store = DataStore::new();
    let baseline = data_store.ingest("baseline", table(&["Age"], 30)).unwrap();
    let followup = data_store.ingest("followup", table(&["Age"], 40)).unwrap();
    let baseline = Arc::new(FeatureStore::new("baseline", baseline));
    let followup = Arc::new(FeatureStore::new("followup", followup));

    let mut samples = SampleStore::with_entities(["s1"]);
    let mut outer = ScopedFeatureBinding::bind(&mut samples, &baseline, None).unwrap();
    assert_eq!(outer.get_feature("Age").unwrap().values(), &[Value::Integer(30)]);
    {
        let inner = ScopedFeatureBinding::bind(&mut outer, &followup, None).unwrap();
        assert_eq!(inner.get_feature("Age").unwrap().values(), &[Value::Integer(40)]);
        assert_eq!(inner.context().depth("Age"), 2);
    }
    assert_eq!(outer.get_feature("Age").unwrap().values(), &[Value::Integer(30)]);
    assert_eq!(outer.release(), 1);
    assert!(matches!(
        samples.get_feature("Age"),
        Err(Error::UnboundFeature(_))
    ));
}
