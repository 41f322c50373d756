//! Pipeline description consumed by the `octobus` binary.
//!
//! ```json
//! {
//!   "tables": [
//!     { "name": "meta",  "path": "metadata.tsv",  "entity_column": "SampleID" },
//!     { "name": "genus", "path": "genus.parquet", "entity_column": "SampleID" }
//!   ],
//!   "feature_stores": [
//!     { "name": "meta",  "table": "meta" },
//!     { "name": "genus", "table": "genus", "limit": 50 }
//!   ],
//!   "samples_from": "meta",
//!   "filters": [ { "feature": "Age", "op": "lt", "value": 60 } ],
//!   "label": "Antibiotics Usage",
//!   "output": "dataset.csv"
//! }
//! ```
//!
//! Relative paths are resolved against the directory of the pipeline file.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::data::filter::FilterRule;
use crate::data::loader::LoadOptions;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TableConfig {
    pub name: String,
    pub path: PathBuf,
    pub entity_column: String,
    /// Single-character field delimiter; sniffed when omitted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delimiter: Option<char>,
}

impl TableConfig {
    pub fn load_options(&self) -> Result<LoadOptions> {
        let options = LoadOptions::new(&self.entity_column);
        match self.delimiter {
            None => Ok(options),
            Some(c) if c.is_ascii() => Ok(options.with_delimiter(c as u8)),
            Some(c) => bail!("table {}: delimiter {c:?} is not a single-byte character", self.name),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FeatureStoreConfig {
    pub name: String,
    /// Registered table the view is cut from.
    pub table: String,
    /// Explicit feature list. All features of the table when omitted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub features: Option<Vec<String>>,
    /// Keep only the first `limit` features of the selection.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PipelineConfig {
    pub tables: Vec<TableConfig>,
    pub feature_stores: Vec<FeatureStoreConfig>,
    /// Feature store whose entities seed the sample selection.
    pub samples_from: String,
    /// Entities matching any rule are removed, in order.
    #[serde(default)]
    pub filters: Vec<FilterRule>,
    /// Features for X. Every bound feature except the label when omitted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub features: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<PathBuf>,
    /// Header of the entity column in the written CSV.
    #[serde(default = "default_index_label")]
    pub index_label: String,
}

fn default_index_label() -> String {
    "entity".to_string()
}

impl PipelineConfig {
    pub fn from_json(text: &str) -> Result<Self> {
        let config: PipelineConfig = serde_json::from_str(text).context("parsing pipeline config")?;
        config.check()?;
        Ok(config)
    }

    /// Read a pipeline file and resolve its relative paths.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let mut config = Self::from_json(&text)?;
        if let Some(base) = path.parent() {
            config.resolve_paths(base);
        }
        Ok(config)
    }

    fn resolve_paths(&mut self, base: &Path) {
        for table in &mut self.tables {
            if table.path.is_relative() {
                table.path = base.join(&table.path);
            }
        }
        if let Some(output) = &mut self.output {
            if output.is_relative() {
                *output = base.join(&*output);
            }
        }
    }

    /// Cross-references between sections. Everything else is checked by the
    /// stores when the pipeline runs.
    fn check(&self) -> Result<()> {
        for store in &self.feature_stores {
            if !self.tables.iter().any(|t| t.name == store.table) {
                bail!("feature store {} refers to unknown table {}", store.name, store.table);
            }
        }
        if !self.feature_stores.iter().any(|s| s.name == self.samples_from) {
            bail!("samples_from refers to unknown feature store {}", self.samples_from);
        }
        Ok(())
    }
}
