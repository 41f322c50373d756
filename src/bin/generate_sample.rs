use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{ArrayRef, Float64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;

use octobus::config::{FeatureStoreConfig, PipelineConfig, TableConfig};
use octobus::{Comparison, FilterRule};

const N_SAMPLES: usize = 40;
const N_GENERA: usize = 80;

const PHYLA: [&str; 4] = ["Firmicutes", "Bacteroidetes", "Proteobacteria", "Actinobacteria"];

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Box-Muller transform for normal distribution
    fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(1e-15);
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std_dev * z
    }

    fn pick<'a>(&mut self, items: &[&'a str]) -> &'a str {
        items[(self.next_u64() % items.len() as u64) as usize]
    }
}

/// Greengenes-style taxonomy string for a synthetic genus.
fn genus_name(i: usize) -> String {
    let phylum = PHYLA[i % PHYLA.len()];
    format!("k__Bacteria;p__{phylum};c__C{};o__O{};f__F{};g__G{i:03}", i % 7, i % 11, i % 23)
}

/// Relative abundances for one sample: log-normal weights normalised to 1.
/// Antibiotic exposure depletes the Firmicutes genera.
fn abundances(rng: &mut SimpleRng, antibiotics: bool) -> Vec<f64> {
    let weights: Vec<f64> = (0..N_GENERA)
        .map(|i| {
            let shift = if antibiotics && i % PHYLA.len() == 0 { -1.5 } else { 0.0 };
            rng.gauss(-(i as f64) / 20.0 + shift, 1.0).exp()
        })
        .collect();
    let total: f64 = weights.iter().sum();
    weights.iter().map(|w| w / total).collect()
}

fn main() -> Result<()> {
    env_logger::init();

    let out_dir = std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("sample_data"));
    std::fs::create_dir_all(&out_dir)
        .with_context(|| format!("creating {}", out_dir.display()))?;

    let mut rng = SimpleRng::new(42);

    let ids: Vec<String> = (1..=N_SAMPLES).map(|i| format!("{i:05}")).collect();
    let mut meta_rows = Vec::with_capacity(N_SAMPLES);
    let mut genus_columns: Vec<Vec<f64>> = vec![Vec::with_capacity(N_SAMPLES); N_GENERA];

    for id in &ids {
        let age = rng.gauss(52.0, 15.0).clamp(18.0, 90.0).round() as i64;
        let sex = rng.pick(&["female", "male"]);
        let antibiotics = rng.next_f64() < 0.35;
        let bmi = (rng.gauss(25.0, 4.0) * 10.0).round() / 10.0;
        meta_rows.push([
            id.clone(),
            age.to_string(),
            sex.to_string(),
            if antibiotics { "yes" } else { "no" }.to_string(),
            bmi.to_string(),
        ]);

        for (column, value) in genus_columns.iter_mut().zip(abundances(&mut rng, antibiotics)) {
            column.push(value);
        }
    }

    let meta_path = out_dir.join("metadata.tsv");
    write_metadata(&meta_path, &meta_rows)?;
    let genus_path = out_dir.join("genus.parquet");
    write_genus(&genus_path, &ids, genus_columns)?;

    let pipeline = PipelineConfig {
        tables: vec![
            TableConfig {
                name: "meta".into(),
                path: "metadata.tsv".into(),
                entity_column: "SampleID".into(),
                delimiter: None,
            },
            TableConfig {
                name: "genus".into(),
                path: "genus.parquet".into(),
                entity_column: "SampleID".into(),
                delimiter: None,
            },
        ],
        feature_stores: vec![
            FeatureStoreConfig {
                name: "meta".into(),
                table: "meta".into(),
                features: None,
                limit: None,
            },
            FeatureStoreConfig {
                name: "genus".into(),
                table: "genus".into(),
                features: None,
                limit: Some(50),
            },
        ],
        samples_from: "meta".into(),
        filters: vec![FilterRule::new("Age", Comparison::Lt, 60_i64)],
        features: None,
        label: Some("Antibiotics Usage".into()),
        output: Some("dataset.csv".into()),
        index_label: "SampleID".into(),
    };
    let pipeline_path = out_dir.join("pipeline.json");
    let text = serde_json::to_string_pretty(&pipeline).context("serialising pipeline")?;
    std::fs::write(&pipeline_path, text)
        .with_context(|| format!("writing {}", pipeline_path.display()))?;

    println!(
        "Wrote {N_SAMPLES} samples ({N_GENERA} genera each) to {}",
        out_dir.display()
    );
    println!("Run: octobus {}", pipeline_path.display());
    Ok(())
}

fn write_metadata(path: &Path, rows: &[[String; 5]]) -> Result<()> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .from_path(path)
        .with_context(|| format!("creating {}", path.display()))?;
    writer.write_record(["SampleID", "Age", "Sex", "Antibiotics Usage", "BMI"])?;
    for row in rows {
        writer.write_record(row)?;
    }
    writer.flush()?;
    Ok(())
}

fn write_genus(path: &Path, ids: &[String], columns: Vec<Vec<f64>>) -> Result<()> {
    let mut fields = vec![Field::new("SampleID", DataType::Utf8, false)];
    let mut arrays: Vec<ArrayRef> = vec![Arc::new(StringArray::from(ids.to_vec()))];
    for (i, values) in columns.into_iter().enumerate() {
        fields.push(Field::new(genus_name(i), DataType::Float64, false));
        arrays.push(Arc::new(Float64Array::from(values)));
    }
    let schema = Arc::new(Schema::new(fields));
    let batch = RecordBatch::try_new(schema.clone(), arrays).context("building record batch")?;

    let file = std::fs::File::create(path)
        .with_context(|| format!("creating {}", path.display()))?;
    let mut writer = ArrowWriter::try_new(file, schema, None).context("creating parquet writer")?;
    writer.write(&batch).context("writing parquet batch")?;
    writer.close().context("closing parquet writer")?;
    Ok(())
}
