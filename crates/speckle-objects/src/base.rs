//! The record model.
//!
//! A [`Base`] is a typed, content-addressable data holder. Its fields come in
//! two kinds that share one namespace:
//!
//! - **typed** fields, declared on the record's [`TypeDescriptor`] and
//!   coerced on every assignment;
//! - **dynamic** fields, any other valid name, kept in insertion order.
//!
//! On top of those, every record carries a small header (`id`,
//! `speckle_type`, `applicationId`, `totalChildrenCount`, `units`) exposed
//! through dedicated accessors.
//!
//! Records own their children, so a record graph is always a tree and can
//! never contain a cycle. Sharing a child between two parents means cloning
//! it; the codec de-duplicates the copies by fingerprint.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use speckle_types::{TypeError, Units};

use crate::descriptor::{type_chain_contains, TypeDescriptor, BASE_TYPE};
use crate::error::{ObjectError, ObjectResult};
use crate::names::{is_detach_marked, validate_field_name};
use crate::value::Value;
use crate::wire;

/// A record: header, typed fields and dynamic fields.
#[derive(Clone)]
pub struct Base {
    pub(crate) descriptor: Arc<TypeDescriptor>,
    pub(crate) speckle_type: String,
    pub(crate) id: Option<String>,
    pub(crate) application_id: Option<String>,
    pub(crate) total_children_count: Option<u64>,
    pub(crate) units: Option<Units>,
    pub(crate) typed: HashMap<String, Value>,
    pub(crate) dynamic: IndexMap<String, Value>,
}

impl Base {
    /// Create an empty plain record (`speckle_type = "Base"`).
    pub fn new() -> Self {
        Self::from_descriptor(TypeDescriptor::base())
    }

    /// Create an empty record of the described type.
    pub fn from_descriptor(descriptor: Arc<TypeDescriptor>) -> Self {
        let speckle_type = descriptor.speckle_type().to_string();
        Self::stamped(descriptor, speckle_type)
    }

    /// Create a plain record stamped with an arbitrary `speckle_type`.
    ///
    /// Used for types the local registry does not know, so that they keep
    /// their original discriminator through a round trip.
    pub fn of_type(speckle_type: impl Into<String>) -> Self {
        Self::stamped(TypeDescriptor::base(), speckle_type.into())
    }

    /// Create an empty record using `descriptor` for its fields and policies
    /// but reporting `speckle_type` as its discriminator.
    pub fn stamped(descriptor: Arc<TypeDescriptor>, speckle_type: String) -> Self {
        Self {
            descriptor,
            speckle_type,
            id: None,
            application_id: None,
            total_children_count: None,
            units: None,
            typed: HashMap::new(),
            dynamic: IndexMap::new(),
        }
    }

    // ---- Header ----

    pub fn speckle_type(&self) -> &str {
        &self.speckle_type
    }

    pub fn descriptor(&self) -> &Arc<TypeDescriptor> {
        &self.descriptor
    }

    /// Fingerprint recorded on this record, if any.
    ///
    /// Only populated on records read back from a transport; serializing a
    /// record never writes its fingerprint back into it.
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn set_id(&mut self, id: Option<String>) {
        self.id = id;
    }

    pub fn application_id(&self) -> Option<&str> {
        self.application_id.as_deref()
    }

    pub fn set_application_id(&mut self, application_id: Option<String>) {
        self.application_id = application_id;
    }

    pub fn total_children_count(&self) -> Option<u64> {
        self.total_children_count
    }

    pub fn set_total_children_count(&mut self, count: Option<u64>) {
        self.total_children_count = count;
    }

    pub fn units(&self) -> Option<Units> {
        self.units
    }

    pub fn set_units(&mut self, units: Option<Units>) {
        self.units = units;
    }

    /// Set units from any recognised alias.
    pub fn set_units_str(&mut self, units: &str) -> ObjectResult<()> {
        self.units = Some(Units::parse(units)?);
        Ok(())
    }

    /// Returns `true` if this record's type is `speckle_type` or descends from it.
    pub fn is_instance_of(&self, speckle_type: &str) -> bool {
        speckle_type == BASE_TYPE || type_chain_contains(&self.speckle_type, speckle_type)
    }

    // ---- Fields ----

    /// Builder-style [`Base::set_field`].
    pub fn with_field(mut self, name: &str, value: impl Into<Value>) -> ObjectResult<Self> {
        self.set_field(name, value)?;
        Ok(self)
    }

    /// Assign a field.
    ///
    /// The name is validated first, then header keys are routed to the
    /// header, declared names are coerced to their declared type, and any
    /// other name becomes a dynamic field. Assigning `Null` removes the
    /// field. Assigning `speckle_type` is silently ignored. On error the
    /// record is unchanged.
    pub fn set_field(&mut self, name: &str, value: impl Into<Value>) -> ObjectResult<()> {
        let value = value.into();
        validate_field_name(name)?;

        if wire::is_header_key(name) {
            return self.set_header(name, value);
        }

        if let Some(decl) = self.descriptor.field(name) {
            if value.is_null() {
                self.typed.remove(name);
                return Ok(());
            }
            let coerced = decl.ty.coerce(value).map_err(|v| ObjectError::TypeMismatch {
                field: name.to_string(),
                expected: decl.ty.to_string(),
                found: v.type_name().to_string(),
            })?;
            self.typed.insert(name.to_string(), coerced);
            return Ok(());
        }

        if value.is_null() {
            self.dynamic.shift_remove(name);
        } else {
            self.dynamic.insert(name.to_string(), value);
        }
        Ok(())
    }

    fn set_header(&mut self, name: &str, value: Value) -> ObjectResult<()> {
        let mismatch = |expected: &str, v: &Value| ObjectError::TypeMismatch {
            field: name.to_string(),
            expected: expected.to_string(),
            found: v.type_name().to_string(),
        };
        match name {
            wire::SPECKLE_TYPE_KEY => Ok(()),
            wire::ID_KEY => match value {
                Value::Null => {
                    self.id = None;
                    Ok(())
                }
                Value::String(s) => {
                    self.id = Some(s);
                    Ok(())
                }
                other => Err(mismatch("str", &other)),
            },
            wire::APPLICATION_ID_KEY => match value {
                Value::Null => {
                    self.application_id = None;
                    Ok(())
                }
                Value::String(s) => {
                    self.application_id = Some(s);
                    Ok(())
                }
                other => Err(mismatch("str", &other)),
            },
            wire::TOTAL_CHILDREN_COUNT_KEY => match value {
                Value::Null => {
                    self.total_children_count = None;
                    Ok(())
                }
                Value::Int(n) if n >= 0 => {
                    self.total_children_count = Some(n as u64);
                    Ok(())
                }
                other => Err(mismatch("non-negative int", &other)),
            },
            wire::UNITS_KEY => match value {
                Value::Null => {
                    self.units = None;
                    Ok(())
                }
                Value::String(s) => self.set_units_str(&s),
                other => Err(ObjectError::Units(TypeError::InvalidUnit(format!(
                    "<{}>",
                    other.type_name()
                )))),
            },
            _ => Err(ObjectError::ReservedField(name.to_string())),
        }
    }

    /// Read a typed or dynamic field. Typed fields take precedence.
    pub fn get_field(&self, name: &str) -> Option<&Value> {
        if self.descriptor.field(name).is_some() {
            return self.typed.get(name);
        }
        self.dynamic.get(name)
    }

    pub fn get_field_mut(&mut self, name: &str) -> Option<&mut Value> {
        if self.descriptor.field(name).is_some() {
            return self.typed.get_mut(name);
        }
        self.dynamic.get_mut(name)
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.get_field(name).is_some()
    }

    /// Remove a typed or dynamic field, returning its value.
    pub fn remove_field(&mut self, name: &str) -> Option<Value> {
        if self.descriptor.field(name).is_some() {
            return self.typed.remove(name);
        }
        self.dynamic.shift_remove(name)
    }

    /// Declared field names, inherited first, in declaration order.
    pub fn typed_names(&self) -> Vec<&str> {
        self.descriptor
            .fields()
            .iter()
            .map(|f| f.name.as_str())
            .collect()
    }

    /// Dynamic field names in insertion order.
    pub fn dynamic_names(&self) -> Vec<&str> {
        self.dynamic.keys().map(String::as_str).collect()
    }

    /// Typed then dynamic names, minus the type's ignore set.
    pub fn member_names(&self) -> Vec<&str> {
        self.typed_names()
            .into_iter()
            .chain(self.dynamic_names())
            .filter(|name| !self.descriptor.is_ignored(name))
            .collect()
    }

    /// Set fields in member order, minus the type's ignore set.
    pub fn members(&self) -> Vec<(&str, &Value)> {
        self.member_names()
            .into_iter()
            .filter_map(|name| self.get_field(name).map(|value| (name, value)))
            .collect()
    }

    /// Number of records reachable through this record's fields.
    ///
    /// Fields carrying a detach marker (`@...`) are not followed.
    pub fn descendants_count(&self) -> usize {
        self.members()
            .into_iter()
            .filter(|(name, _)| !is_detach_marked(name))
            .map(|(_, value)| value.count_records())
            .sum()
    }
}

impl Default for Base {
    fn default() -> Self {
        Self::new()
    }
}

/// Records compare by type, header metadata and field values. The computed
/// `id` and `totalChildrenCount` are not part of equality.
impl PartialEq for Base {
    fn eq(&self, other: &Self) -> bool {
        self.speckle_type == other.speckle_type
            && self.application_id == other.application_id
            && self.units == other.units
            && self.members_map() == other.members_map()
    }
}

impl Base {
    fn members_map(&self) -> HashMap<&str, &Value> {
        self.members().into_iter().collect()
    }
}

impl fmt::Debug for Base {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("Base");
        s.field("speckle_type", &self.speckle_type);
        if let Some(id) = &self.id {
            s.field("id", id);
        }
        if let Some(units) = &self.units {
            s.field("units", units);
        }
        for (name, value) in self.members() {
            s.field(name, value);
        }
        s.finish()
    }
}
