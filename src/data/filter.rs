use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use super::model::{Mask, Series, Value};

// ---------------------------------------------------------------------------
// Filter rule: compare one feature column against a constant
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Comparison {
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
}

impl Comparison {
    fn holds(self, ord: Ordering) -> bool {
        match self {
            Comparison::Lt => ord == Ordering::Less,
            Comparison::Le => ord != Ordering::Greater,
            Comparison::Gt => ord == Ordering::Greater,
            Comparison::Ge => ord != Ordering::Less,
            Comparison::Eq => ord == Ordering::Equal,
            Comparison::Ne => ord != Ordering::Equal,
        }
    }
}

/// `feature <op> value`, e.g. `Age < 60`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterRule {
    pub feature: String,
    pub op: Comparison,
    #[serde(with = "value_serde")]
    pub value: Value,
}

impl FilterRule {
    pub fn new(feature: impl Into<String>, op: Comparison, value: impl Into<Value>) -> Self {
        Self {
            feature: feature.into(),
            op,
            value: value.into(),
        }
    }

    /// Whether a single cell satisfies the rule.
    ///
    /// * Null cells never match.
    /// * Two numeric values compare numerically (integers and floats mix).
    /// * Anything else uses the total `Value` ordering, so a string only
    ///   equals a string.
    pub fn matches(&self, cell: &Value) -> bool {
        if cell.is_null() || self.value.is_null() {
            return false;
        }
        let ord = match (cell.as_f64(), self.value.as_f64()) {
            (Some(a), Some(b)) => match a.partial_cmp(&b) {
                Some(ord) => ord,
                None => return false,
            },
            _ => cell.cmp(&self.value),
        };
        self.op.holds(ord)
    }

    /// Evaluate the rule over a column. The mask is true where the rule holds.
    pub fn mask(&self, column: &Series) -> Mask {
        column.mask(|cell| self.matches(cell))
    }
}

/// Rule constants are written as plain JSON scalars in pipeline files.
mod value_serde {
    use serde::{Deserialize, Deserializer, Serializer};

    use crate::data::model::Value;

    pub fn serialize<S: Serializer>(value: &Value, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            Value::String(s) => serializer.serialize_str(s),
            Value::Integer(i) => serializer.serialize_i64(*i),
            Value::Float(f) => serializer.serialize_f64(*f),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Null => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Value, D::Error> {
        let json = serde_json::Value::deserialize(deserializer)?;
        Ok(crate::data::loader::json_to_value(&json))
    }
}
