use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;

use crate::error::{Error, KeyKind, Result};

// ---------------------------------------------------------------------------
// Value – a single cell of an entity table
// ---------------------------------------------------------------------------

/// A dynamically-typed cell value mirroring common Pandas dtypes.
/// `Null` is the missing marker. Totally ordered so filter rules can compare
/// any two cells.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    String(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    Null,
}

// -- Manual Eq/Ord: floats compare by total_cmp --

impl Eq for Value {}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        use Value::*;
        fn discriminant(v: &Value) -> u8 {
            match v {
                Null => 0,
                Bool(_) => 1,
                Integer(_) => 2,
                Float(_) => 3,
                String(_) => 4,
            }
        }
        let da = discriminant(self);
        let db = discriminant(other);
        if da != db {
            return da.cmp(&db);
        }
        match (self, other) {
            (Null, Null) => std::cmp::Ordering::Equal,
            (Bool(a), Bool(b)) => a.cmp(b),
            (Integer(a), Integer(b)) => a.cmp(b),
            (Float(a), Float(b)) => a.total_cmp(b),
            (String(a), String(b)) => a.cmp(b),
            _ => std::cmp::Ordering::Equal,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) => write!(f, "{s}"),
            Value::Integer(i) => write!(f, "{i}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Null => write!(f, "NaN"),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl Value {
    /// Guess the type of a text cell.
    pub fn parse(s: &str) -> Value {
        let s = s.trim();
        if s.is_empty() || s.eq_ignore_ascii_case("nan") || s.eq_ignore_ascii_case("na") {
            return Value::Null;
        }
        if let Ok(i) = s.parse::<i64>() {
            return Value::Integer(i);
        }
        if let Ok(f) = s.parse::<f64>() {
            return Value::Float(f);
        }
        match s {
            "true" | "True" | "TRUE" => Value::Bool(true),
            "false" | "False" | "FALSE" => Value::Bool(false),
            _ => Value::String(s.to_string()),
        }
    }

    /// Numeric view of the value, if it has one.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(v) => Some(*v),
            Value::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Boolean-like interpretation used when a column acts as a mask.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Bool(b) => *b,
            Value::Integer(i) => *i != 0,
            Value::Float(v) => *v != 0.0 && !v.is_nan(),
            Value::String(s) => !s.is_empty(),
            Value::Null => false,
        }
    }
}

// ---------------------------------------------------------------------------
// Mask – entity → bool, the typed replacement for boolean-series indexing
// ---------------------------------------------------------------------------

/// Per-entity predicate result. Entities absent from the mask count as false.
pub type Mask = BTreeMap<String, bool>;

// ---------------------------------------------------------------------------
// Series – one named column with its own entity index
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    name: String,
    index: Vec<String>,
    values: Vec<Value>,
}

impl Series {
    pub fn new(name: impl Into<String>, index: Vec<String>, values: Vec<Value>) -> Result<Self> {
        if index.len() != values.len() {
            return Err(Error::InvalidTable(format!(
                "series has {} index entries but {} values",
                index.len(),
                values.len()
            )));
        }
        Ok(Self::from_parts(name.into(), index, values))
    }

    /// Callers guarantee `index` and `values` have the same length.
    fn from_parts(name: String, index: Vec<String>, values: Vec<Value>) -> Self {
        debug_assert_eq!(index.len(), values.len());
        Self { name, index, values }
    }

    /// Build a series from `(entity, value)` pairs.
    pub fn from_pairs<K, V>(name: impl Into<String>, pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
    {
        let (index, values): (Vec<String>, Vec<Value>) = pairs
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .unzip();
        Self::from_parts(name.into(), index, values)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn index(&self) -> &[String] {
        &self.index
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, entity: &str) -> Option<&Value> {
        self.index
            .iter()
            .position(|e| e == entity)
            .map(|i| &self.values[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.index.iter().zip(self.values.iter())
    }

    /// Evaluate `predicate` on every cell.
    pub fn mask(&self, predicate: impl Fn(&Value) -> bool) -> Mask {
        self.iter()
            .map(|(entity, value)| (entity.clone(), predicate(value)))
            .collect()
    }

    /// Read a boolean-like column as a mask. `Null` is false.
    pub fn truthy_mask(&self) -> Mask {
        self.mask(Value::is_truthy)
    }

    /// Reorder to exactly `entities`. Every requested entity must be present.
    pub fn reindex(&self, entities: &[String]) -> Result<Series> {
        let lookup: HashMap<&str, usize> = self
            .index
            .iter()
            .enumerate()
            .map(|(i, e)| (e.as_str(), i))
            .collect();
        let values = entities
            .iter()
            .map(|e| {
                lookup
                    .get(e.as_str())
                    .map(|&i| self.values[i].clone())
                    .ok_or_else(|| Error::entity_not_found(e.clone()))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::from_parts(self.name.clone(), entities.to_vec(), values))
    }
}

// ---------------------------------------------------------------------------
// Table – entity-indexed 2D grid
// ---------------------------------------------------------------------------

/// Rows keyed by entity id, columns keyed by feature name. Both unique.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    entities: Vec<String>,
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
    entity_pos: HashMap<String, usize>,
    column_pos: HashMap<String, usize>,
}

impl Table {
    pub fn new(entities: Vec<String>, columns: Vec<String>, rows: Vec<Vec<Value>>) -> Result<Self> {
        if rows.len() != entities.len() {
            return Err(Error::InvalidTable(format!(
                "{} entities but {} rows",
                entities.len(),
                rows.len()
            )));
        }
        if let Some((i, row)) = rows
            .iter()
            .enumerate()
            .find(|(_, row)| row.len() != columns.len())
        {
            return Err(Error::InvalidTable(format!(
                "row {} ({}) has {} values, expected {}",
                i,
                entities[i],
                row.len(),
                columns.len()
            )));
        }
        let entity_pos = index_positions(&entities, KeyKind::Entity)?;
        let column_pos = index_positions(&columns, KeyKind::Feature)?;
        Ok(Self {
            entities,
            columns,
            rows,
            entity_pos,
            column_pos,
        })
    }

    /// A table with the given index and no columns.
    pub fn empty(entities: Vec<String>) -> Result<Self> {
        let rows = vec![Vec::new(); entities.len()];
        Self::new(entities, Vec::new(), rows)
    }

    pub fn entities(&self) -> &[String] {
        &self.entities
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    /// `(n_entities, n_columns)`
    pub fn shape(&self) -> (usize, usize) {
        (self.entities.len(), self.columns.len())
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.column_pos.contains_key(column)
    }

    pub fn get(&self, entity: &str, column: &str) -> Option<&Value> {
        let r = *self.entity_pos.get(entity)?;
        let c = *self.column_pos.get(column)?;
        Some(&self.rows[r][c])
    }

    pub fn column(&self, name: &str) -> Result<Series> {
        let c = self.column_position(name)?;
        Ok(Series::from_parts(
            name.to_string(),
            self.entities.clone(),
            self.rows.iter().map(|row| row[c].clone()).collect(),
        ))
    }

    /// Copy exactly `entities` × `columns`, in the requested order.
    pub fn take(&self, entities: &[String], columns: &[String]) -> Result<Table> {
        let col_idx = columns
            .iter()
            .map(|c| self.column_position(c))
            .collect::<Result<Vec<_>>>()?;
        let rows = entities
            .iter()
            .map(|e| -> Result<Vec<Value>> {
                let r = self
                    .entity_pos
                    .get(e.as_str())
                    .ok_or_else(|| Error::entity_not_found(e.clone()))?;
                Ok(col_idx.iter().map(|&c| self.rows[*r][c].clone()).collect())
            })
            .collect::<Result<Vec<_>>>()?;
        Table::new(entities.to_vec(), columns.to_vec(), rows)
    }

    /// Concatenate columns of `other` onto `self`. Both must share the same
    /// entity index in the same order.
    pub fn hstack(mut self, other: &Table) -> Result<Table> {
        if self.entities != other.entities {
            return Err(Error::index_mismatch(format!(
                "cannot concatenate tables over different entity indices ({} vs {} entities)",
                self.entities.len(),
                other.entities.len()
            )));
        }
        for col in &other.columns {
            if self.column_pos.contains_key(col) {
                return Err(Error::DuplicateKey {
                    kind: KeyKind::Feature,
                    key: col.clone(),
                });
            }
            self.column_pos.insert(col.clone(), self.columns.len());
            self.columns.push(col.clone());
        }
        for (row, extra) in self.rows.iter_mut().zip(&other.rows) {
            row.extend(extra.iter().cloned());
        }
        Ok(self)
    }

    /// Append `series` as a new column, aligned to this table's entities.
    pub fn with_column(mut self, series: &Series) -> Result<Table> {
        if self.column_pos.contains_key(series.name()) {
            return Err(Error::DuplicateKey {
                kind: KeyKind::Feature,
                key: series.name().to_string(),
            });
        }
        let aligned = series.reindex(&self.entities)?;
        self.column_pos
            .insert(series.name().to_string(), self.columns.len());
        self.columns.push(series.name().to_string());
        for (row, value) in self.rows.iter_mut().zip(aligned.values) {
            row.push(value);
        }
        Ok(self)
    }

    fn column_position(&self, name: &str) -> Result<usize> {
        self.column_pos
            .get(name)
            .copied()
            .ok_or_else(|| Error::feature_not_found(name))
    }
}

fn index_positions(keys: &[String], kind: KeyKind) -> Result<HashMap<String, usize>> {
    let mut seen = HashSet::with_capacity(keys.len());
    let mut positions = HashMap::with_capacity(keys.len());
    for (i, key) in keys.iter().enumerate() {
        if !seen.insert(key.as_str()) {
            return Err(Error::DuplicateKey {
                kind,
                key: key.clone(),
            });
        }
        positions.insert(key.clone(), i);
    }
    Ok(positions)
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "entity")?;
        for col in &self.columns {
            write!(f, "\t{col}")?;
        }
        writeln!(f)?;
        for (entity, row) in self.entities.iter().zip(&self.rows) {
            write!(f, "{entity}")?;
            for value in row {
                write!(f, "\t{value}")?;
            }
            writeln!(f)?;
        }
        write!(f, "[{} rows x {} columns]", self.entities.len(), self.columns.len())
    }
}
