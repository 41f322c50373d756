use crate::data::model::{Series, Table};
use crate::error::{Error, Result};

/// Read-only wrapper around one entity-indexed table.
///
/// Slicing never mutates; [`TabularSource::select`] returns a new source.
#[derive(Debug, Clone, PartialEq)]
pub struct TabularSource {
    table: Table,
}

impl TabularSource {
    pub fn new(table: Table) -> Self {
        Self { table }
    }

    pub fn entities(&self) -> &[String] {
        self.table.entities()
    }

    pub fn features(&self) -> &[String] {
        self.table.columns()
    }

    pub fn table(&self) -> &Table {
        &self.table
    }

    pub fn has_feature(&self, feature: &str) -> bool {
        self.table.has_column(feature)
    }

    /// A new source restricted to `features`, in the given order.
    pub fn select(&self, features: &[String]) -> Result<TabularSource> {
        let table = self.table.take(self.table.entities(), features)?;
        Ok(TabularSource { table })
    }

    /// Copy exactly `entities` × `features`. Fails on the first missing key.
    pub fn rows_at(&self, entities: &[String], features: &[String]) -> Result<Table> {
        self.table.take(entities, features)
    }

    /// One feature column over `entities`.
    pub fn column_at(&self, entities: &[String], feature: &str) -> Result<Series> {
        if !self.has_feature(feature) {
            return Err(Error::feature_not_found(feature));
        }
        self.table
            .take(entities, &[feature.to_string()])?
            .column(feature)
    }
}

impl From<Table> for TabularSource {
    fn from(table: Table) -> Self {
        Self::new(table)
    }
}
