//! Declared field types and assignment-time coercion.
//!
//! A typed field carries a [`FieldType`]. Every assignment runs
//! [`FieldType::coerce`], which either accepts the value (possibly converted,
//! e.g. an integer stored into a float field) or hands it back unchanged so
//! the caller can report a mismatch. `Null` is accepted by every type.

use std::fmt;

use crate::value::Value;

/// An enumeration type: named members, each with an underlying value.
///
/// Members are stored and serialized as their underlying value. Assigning a
/// member's name coerces it to that value.
#[derive(Clone, Debug, PartialEq)]
pub struct EnumType {
    pub name: String,
    pub members: Vec<(String, Value)>,
}

impl EnumType {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            members: Vec::new(),
        }
    }

    /// Add a member.
    pub fn member(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.members.push((name.into(), value.into()));
        self
    }

    fn coerce(&self, value: Value) -> Result<Value, Value> {
        if let Value::String(s) = &value {
            if let Some((_, underlying)) = self.members.iter().find(|(name, _)| name == s) {
                return Ok(underlying.clone());
            }
        }
        if self.members.iter().any(|(_, underlying)| *underlying == value) {
            return Ok(value);
        }
        Err(value)
    }
}

/// The declared type of a typed field.
#[derive(Clone, Debug, PartialEq)]
pub enum FieldType {
    /// Accepts anything unchanged.
    Any,
    Bool,
    Int,
    /// Accepts anything numeric-coercible and stores its float value.
    Float,
    /// Accepts any non-container value and stores its textual form.
    String,
    Enum(EnumType),
    /// Alternatives tried in declaration order; the first success wins.
    Union(Vec<FieldType>),
    /// Mapping with string keys. One entry is checked; the map is kept as is.
    Map(Box<FieldType>, Box<FieldType>),
    /// Homogeneous sequence. The first element is checked; the list is kept as is.
    List(Box<FieldType>),
    /// Fixed-arity sequence, coerced element-wise.
    Tuple(Vec<FieldType>),
    /// Set of values, carried as a list. One element is checked.
    Set(Box<FieldType>),
    /// A record whose type is, or descends from, the given `speckle_type`.
    Record(String),
}

impl FieldType {
    pub fn list(item: FieldType) -> Self {
        Self::List(Box::new(item))
    }

    pub fn set(item: FieldType) -> Self {
        Self::Set(Box::new(item))
    }

    pub fn map(key: FieldType, value: FieldType) -> Self {
        Self::Map(Box::new(key), Box::new(value))
    }

    pub fn record(speckle_type: impl Into<String>) -> Self {
        Self::Record(speckle_type.into())
    }

    /// `Union([t, Null])`-style optional; `Null` is always accepted, so this
    /// is the type itself.
    pub fn optional(inner: FieldType) -> Self {
        inner
    }

    /// Validate `value` against this type.
    ///
    /// Returns the (possibly coerced) value on success, or the original
    /// value on failure.
    pub fn coerce(&self, value: Value) -> Result<Value, Value> {
        if value.is_null() {
            return Ok(value);
        }
        match self {
            Self::Any => Ok(value),
            Self::Bool => match value {
                Value::Bool(_) => Ok(value),
                other => Err(other),
            },
            Self::Int => match value {
                Value::Int(_) => Ok(value),
                other => Err(other),
            },
            Self::Float => coerce_float(value),
            Self::String => coerce_string(value),
            Self::Enum(enum_type) => enum_type.coerce(value),
            Self::Union(alternatives) => {
                let mut value = value;
                for alternative in alternatives {
                    match alternative.coerce(value) {
                        Ok(coerced) => return Ok(coerced),
                        Err(original) => value = original,
                    }
                }
                Err(value)
            }
            Self::Map(key_type, value_type) => {
                let ok = match &value {
                    Value::Map(map) => match map.first() {
                        None => true,
                        Some((k, v)) => {
                            key_type.accepts(&Value::String(k.clone())) && value_type.accepts(v)
                        }
                    },
                    _ => false,
                };
                if ok {
                    Ok(value)
                } else {
                    Err(value)
                }
            }
            Self::List(item_type) | Self::Set(item_type) => {
                let ok = match &value {
                    Value::List(items) => items.first().map_or(true, |v| item_type.accepts(v)),
                    _ => false,
                };
                if ok {
                    Ok(value)
                } else {
                    Err(value)
                }
            }
            Self::Tuple(item_types) => coerce_tuple(item_types, value),
            Self::Record(speckle_type) => match &value {
                Value::Record(base) if base.is_instance_of(speckle_type) => Ok(value),
                _ => Err(value),
            },
        }
    }

    /// Returns `true` if `value` would be accepted.
    pub fn accepts(&self, value: &Value) -> bool {
        self.coerce(value.clone()).is_ok()
    }
}

fn coerce_float(value: Value) -> Result<Value, Value> {
    match value {
        Value::Float(_) => Ok(value),
        Value::Int(i) => Ok(Value::Float(i as f64)),
        Value::Bool(b) => Ok(Value::Float(if b { 1.0 } else { 0.0 })),
        Value::String(s) => match s.trim().parse::<f64>() {
            Ok(f) => Ok(Value::Float(f)),
            Err(_) => Err(Value::String(s)),
        },
        other => Err(other),
    }
}

fn coerce_string(value: Value) -> Result<Value, Value> {
    match value {
        Value::String(_) => Ok(value),
        Value::Bool(b) => Ok(Value::String(b.to_string())),
        Value::Int(i) => Ok(Value::String(i.to_string())),
        Value::Float(f) => Ok(Value::String(f.to_string())),
        other => Err(other),
    }
}

fn coerce_tuple(item_types: &[FieldType], value: Value) -> Result<Value, Value> {
    let items = match value {
        Value::List(items) if items.len() == item_types.len() => items,
        other => return Err(other),
    };
    // Validate against clones first so a failure hands back the original list.
    let mut coerced = Vec::with_capacity(items.len());
    for (item_type, item) in item_types.iter().zip(&items) {
        match item_type.coerce(item.clone()) {
            Ok(v) => coerced.push(v),
            Err(_) => return Err(Value::List(items)),
        }
    }
    Ok(Value::List(coerced))
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => write!(f, "any"),
            Self::Bool => write!(f, "bool"),
            Self::Int => write!(f, "int"),
            Self::Float => write!(f, "float"),
            Self::String => write!(f, "str"),
            Self::Enum(e) => write!(f, "enum {}", e.name),
            Self::Union(alternatives) => {
                write!(f, "union[")?;
                for (i, alt) in alternatives.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{alt}")?;
                }
                write!(f, "]")
            }
            Self::Map(k, v) => write!(f, "map[{k}, {v}]"),
            Self::List(item) => write!(f, "list[{item}]"),
            Self::Tuple(items) => {
                write!(f, "tuple[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
            Self::Set(item) => write!(f, "set[{item}]"),
            Self::Record(t) => write!(f, "{t}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base::Base;
    use indexmap::IndexMap;

    #[test]
    fn null_is_always_accepted() {
        for ty in [
            FieldType::Int,
            FieldType::list(FieldType::Float),
            FieldType::record("Objects.Geometry.Point"),
        ] {
            assert_eq!(ty.coerce(Value::Null), Ok(Value::Null));
        }
    }

    #[test]
    fn float_coerces_numbers_and_numeric_strings() {
        assert_eq!(FieldType::Float.coerce(Value::Int(2)), Ok(Value::Float(2.0)));
        assert_eq!(
            FieldType::Float.coerce(Value::String("1.5".into())),
            Ok(Value::Float(1.5))
        );
        assert!(FieldType::Float.coerce(Value::String("abc".into())).is_err());
        assert!(FieldType::Float.coerce(Value::from(vec![1.0])).is_err());
    }

    #[test]
    fn string_takes_textual_form_of_scalars() {
        assert_eq!(
            FieldType::String.coerce(Value::Int(7)),
            Ok(Value::String("7".into()))
        );
        assert!(FieldType::String.coerce(Value::from(vec!["a"])).is_err());
    }

    #[test]
    fn int_is_strict() {
        assert!(FieldType::Int.coerce(Value::Float(1.0)).is_err());
        assert_eq!(FieldType::Int.coerce(Value::Int(1)), Ok(Value::Int(1)));
    }

    #[test]
    fn enum_accepts_member_name_or_value() {
        let ty = FieldType::Enum(
            EnumType::new("Direction")
                .member("Forward", 1)
                .member("Reverse", -1),
        );
        assert_eq!(ty.coerce(Value::String("Reverse".into())), Ok(Value::Int(-1)));
        assert_eq!(ty.coerce(Value::Int(1)), Ok(Value::Int(1)));
        assert!(ty.coerce(Value::Int(0)).is_err());
    }

    #[test]
    fn union_tries_alternatives_in_order() {
        let ty = FieldType::Union(vec![FieldType::Int, FieldType::String]);
        assert_eq!(ty.coerce(Value::Int(3)), Ok(Value::Int(3)));
        // Float fails `Int`, then succeeds as `String`.
        assert_eq!(
            ty.coerce(Value::Float(1.5)),
            Ok(Value::String("1.5".into()))
        );
        assert!(ty.coerce(Value::from(vec![1])).is_err());
    }

    #[test]
    fn list_checks_first_element_only() {
        let ty = FieldType::list(FieldType::Float);
        assert!(ty.accepts(&Value::List(vec![])));
        let mixed = Value::List(vec![Value::Int(1), Value::String("x".into())]);
        // Kept as is: not rewritten element-wise.
        assert_eq!(ty.coerce(mixed.clone()), Ok(mixed));
        assert!(ty.coerce(Value::from(vec!["x"])).is_err());
        assert!(ty.coerce(Value::Int(1)).is_err());
    }

    #[test]
    fn tuple_coerces_element_wise() {
        let ty = FieldType::Tuple(vec![FieldType::Float, FieldType::String]);
        assert_eq!(
            ty.coerce(Value::List(vec![Value::Int(1), Value::Int(2)])),
            Ok(Value::List(vec![Value::Float(1.0), Value::String("2".into())]))
        );
        let wrong_len = Value::List(vec![Value::Int(1)]);
        assert_eq!(ty.coerce(wrong_len.clone()), Err(wrong_len));
    }

    #[test]
    fn map_checks_one_entry() {
        let ty = FieldType::map(FieldType::String, FieldType::Int);
        let mut map = IndexMap::new();
        assert!(ty.accepts(&Value::Map(map.clone())));
        map.insert("a".to_string(), Value::Int(1));
        assert!(ty.accepts(&Value::Map(map.clone())));
        let mut bad = IndexMap::new();
        bad.insert("a".to_string(), Value::String("x".into()));
        assert!(!ty.accepts(&Value::Map(bad)));
        assert!(!ty.accepts(&Value::Int(1)));
    }

    #[test]
    fn record_requires_matching_ancestry() {
        let ty = FieldType::record("Objects.Geometry.Point");
        let point = Base::of_type("Objects.Geometry.Point");
        let sub = Base::of_type("Objects.Geometry.Point:Vendor.Point");
        let other = Base::of_type("Objects.Geometry.Line");
        assert!(ty.accepts(&Value::from(point)));
        assert!(ty.accepts(&Value::from(sub)));
        assert!(!ty.accepts(&Value::from(other)));
        assert!(FieldType::record("Base").accepts(&Value::from(Base::new())));
    }

    #[test]
    fn display_is_readable() {
        let ty = FieldType::map(FieldType::String, FieldType::list(FieldType::Float));
        assert_eq!(ty.to_string(), "map[str, list[float]]");
    }
}
