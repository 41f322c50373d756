use std::collections::HashSet;

use crate::data::model::{Series, Table, Value};
use crate::error::{Error, Result};

/// Column name used for the label when none was set.
pub const DEFAULT_LABEL: &str = "label";

/// A feature matrix `x` with an optional label `y` aligned to it.
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledDataset {
    x: Table,
    y: Option<Series>,
}

impl LabeledDataset {
    pub fn new(x: Table) -> Self {
        Self { x, y: None }
    }

    /// `y` must cover exactly the entities of `x`, in any order. It is stored
    /// reindexed to `x`'s entity order.
    pub fn with_label(x: Table, y: Series) -> Result<Self> {
        let y = align_label(&x, &y)?;
        Ok(Self { x, y: Some(y) })
    }

    /// Take the label from a single-column table, e.g. the result of
    /// `get_data` for one feature.
    pub fn with_label_table(x: Table, y: &Table) -> Result<Self> {
        let [name] = y.columns() else {
            return Err(Error::index_mismatch(format!(
                "label table must have exactly one column, got {}",
                y.columns().len()
            )));
        };
        let series = y.column(name)?;
        Self::with_label(x, series)
    }

    pub fn x(&self) -> &Table {
        &self.x
    }

    pub fn y(&self) -> Option<&Series> {
        self.y.as_ref()
    }

    pub fn entities(&self) -> &[String] {
        self.x.entities()
    }

    pub fn features(&self) -> &[String] {
        self.x.columns()
    }

    /// `x` alone, or `x` with the label appended as the last column. Without
    /// a label every entity gets `Null` under [`DEFAULT_LABEL`]. Fails with
    /// `DuplicateKey` when `x` already has a column of that name.
    pub fn combined(&self, with_label: bool) -> Result<Table> {
        if !with_label {
            return Ok(self.x.clone());
        }
        let label = match &self.y {
            Some(y) => y.clone(),
            None => Series::new(
                DEFAULT_LABEL,
                self.x.entities().to_vec(),
                vec![Value::Null; self.x.entities().len()],
            )?,
        };
        self.x.clone().with_column(&label)
    }
}

fn align_label(x: &Table, y: &Series) -> Result<Series> {
    let expected: HashSet<&str> = x.entities().iter().map(|e| e.as_str()).collect();
    let actual: HashSet<&str> = y.index().iter().map(|e| e.as_str()).collect();
    if y.len() != x.entities().len() || expected != actual {
        let missing = expected.difference(&actual).count();
        let extra = actual.difference(&expected).count();
        return Err(Error::index_mismatch(format!(
            "label '{}' has {} entries for {} entities ({missing} missing, {extra} unexpected)",
            y.name(),
            y.len(),
            x.entities().len()
        )));
    }
    y.reindex(x.entities())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::KeyKind;
    use pretty_assertions::assert_eq;

    fn x() -> Table {
        Table::new(
            vec!["s1".into(), "s2".into(), "s3".into()],
            vec!["g__A".into()],
            vec![
                vec![Value::Float(0.1)],
                vec![Value::Float(0.2)],
                vec![Value::Float(0.3)],
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_permuted_label_is_reindexed() {
        let y = Series::from_pairs("Antibiotics Usage", [("s3", "no"), ("s1", "yes"), ("s2", "no")]);
        let ds = LabeledDataset::with_label(x(), y).unwrap();
        let y = ds.y().unwrap();
        assert_eq!(y.index(), x().entities());
        assert_eq!(
            y.values(),
            &[Value::from("yes"), Value::from("no"), Value::from("no")]
        );
    }

    #[test]
    fn test_label_missing_one_entity() {
        let y = Series::from_pairs("y", [("s1", 1_i64), ("s2", 0)]);
        assert!(matches!(
            LabeledDataset::with_label(x(), y).unwrap_err(),
            Error::IndexMismatch(_)
        ));
    }

    #[test]
    fn test_label_with_foreign_entity() {
        let y = Series::from_pairs("y", [("s1", 1_i64), ("s2", 0), ("s9", 1)]);
        assert!(LabeledDataset::with_label(x(), y).is_err());
    }

    #[test]
    fn test_label_with_repeated_entity() {
        let y = Series::from_pairs("y", [("s1", 1_i64), ("s2", 0), ("s3", 1), ("s3", 0)]);
        assert!(LabeledDataset::with_label(x(), y).is_err());
    }

    #[test]
    fn test_combined_without_label_is_x() {
        let ds = LabeledDataset::new(x());
        assert_eq!(ds.combined(false).unwrap(), x());
    }

    #[test]
    fn test_combined_fills_missing_label() {
        let ds = LabeledDataset::new(x());
        let t = ds.combined(true).unwrap();
        assert_eq!(t.columns(), &["g__A".to_string(), DEFAULT_LABEL.to_string()][..]);
        assert!(t.column(DEFAULT_LABEL).unwrap().values().iter().all(Value::is_null));
    }

    #[test]
    fn test_combined_default_label_collides_with_feature() {
        let x = x()
            .with_column(&Series::from_pairs(DEFAULT_LABEL, [("s1", 1_i64), ("s2", 0), ("s3", 1)]))
            .unwrap();
        let ds = LabeledDataset::new(x.clone());
        assert_eq!(
            ds.combined(true).unwrap_err(),
            Error::DuplicateKey {
                kind: KeyKind::Feature,
                key: DEFAULT_LABEL.to_string(),
            }
        );
        assert_eq!(ds.combined(false).unwrap(), x);
    }

    #[test]
    fn test_combined_appends_label() {
        let y = Series::from_pairs("y", [("s2", 0_i64), ("s1", 1), ("s3", 1)]);
        let ds = LabeledDataset::with_label(x(), y).unwrap();
        let t = ds.combined(true).unwrap();
        assert_eq!(t.shape(), (3, 2));
        assert_eq!(t.get("s2", "y"), Some(&Value::Integer(0)));
    }

    #[test]
    fn test_label_from_single_column_table() {
        let y = Table::new(
            vec!["s2".into(), "s3".into(), "s1".into()],
            vec!["Age".into()],
            vec![
                vec![Value::Integer(40)],
                vec![Value::Integer(50)],
                vec![Value::Integer(60)],
            ],
        )
        .unwrap();
        let ds = LabeledDataset::with_label_table(x(), &y).unwrap();
        assert_eq!(ds.y().unwrap().name(), "Age");
        assert_eq!(ds.y().unwrap().get("s1"), Some(&Value::Integer(60)));

        let two = x().hstack(&y.take(x().entities(), y.columns()).unwrap()).unwrap();
        assert!(LabeledDataset::with_label_table(x(), &two).is_err());
    }
}
