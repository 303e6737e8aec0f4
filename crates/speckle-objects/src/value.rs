//! Dynamic field values.

use indexmap::IndexMap;
use speckle_types::Units;

use crate::base::Base;

/// A field value: a JSON-like sum type that can also hold records.
///
/// Sets and tuples are represented as [`Value::List`]; mapping keys are
/// always strings.
#[derive(Clone, Debug, PartialEq, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    List(Vec<Value>),
    Map(IndexMap<String, Value>),
    Record(Box<Base>),
}

impl Value {
    /// Returns `true` for `Null`.
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Returns `true` for booleans, integers, floats and strings.
    pub fn is_primitive(&self) -> bool {
        matches!(
            self,
            Self::Bool(_) | Self::Int(_) | Self::Float(_) | Self::String(_)
        )
    }

    /// Short name of the variant, used in diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::String(_) => "str",
            Self::List(_) => "list",
            Self::Map(_) => "map",
            Self::Record(_) => "record",
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Numeric view of the value; integers widen to `f64`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(i) => Some(*i as f64),
            Self::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&IndexMap<String, Value>> {
        match self {
            Self::Map(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_record(&self) -> Option<&Base> {
        match self {
            Self::Record(base) => Some(base),
            _ => None,
        }
    }

    pub fn as_record_mut(&mut self) -> Option<&mut Base> {
        match self {
            Self::Record(base) => Some(base),
            _ => None,
        }
    }

    /// Count records reachable from this value, the records themselves included.
    pub(crate) fn count_records(&self) -> usize {
        match self {
            Self::Record(base) => 1 + base.descendants_count(),
            Self::List(items) => items.iter().map(Value::count_records).sum(),
            Self::Map(map) => map.values().map(Value::count_records).sum(),
            _ => 0,
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<Units> for Value {
    fn from(v: Units) -> Self {
        Self::String(v.token().to_string())
    }
}

impl From<Base> for Value {
    fn from(v: Base) -> Self {
        Self::Record(Box::new(v))
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Self::List(v.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Null, Into::into)
    }
}

impl From<IndexMap<String, Value>> for Value {
    fn from(v: IndexMap<String, Value>) -> Self {
        Self::Map(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primitive_classification() {
        assert!(Value::from(1).is_primitive());
        assert!(Value::from(1.5).is_primitive());
        assert!(Value::from("s").is_primitive());
        assert!(Value::from(true).is_primitive());
        assert!(!Value::Null.is_primitive());
        assert!(!Value::from(vec![1, 2]).is_primitive());
        assert!(!Value::from(Base::new()).is_primitive());
    }

    #[test]
    fn option_conversion() {
        assert_eq!(Value::from(None::<i64>), Value::Null);
        assert_eq!(Value::from(Some("x")), Value::String("x".into()));
    }

    #[test]
    fn units_convert_to_token() {
        assert_eq!(Value::from(Units::Feet), Value::String("ft".into()));
    }

    #[test]
    fn numeric_view_widens_ints() {
        assert_eq!(Value::Int(3).as_f64(), Some(3.0));
        assert_eq!(Value::Float(2.5).as_f64(), Some(2.5));
        assert_eq!(Value::String("3".into()).as_f64(), None);
    }

    #[test]
    fn counts_nested_records() {
        let mut inner = Base::new();
        inner.set_field("leaf", Base::new()).unwrap();
        let value = Value::from(vec![Value::from(inner), Value::from(1)]);
        assert_eq!(value.count_records(), 2);
    }
}
