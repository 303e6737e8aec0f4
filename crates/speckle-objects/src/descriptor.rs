//! Per-type metadata consulted by the codec.
//!
//! A [`TypeDescriptor`] is computed once when a type is defined and carries
//! everything the serializer needs to know about the type: its effective
//! `speckle_type`, its declared fields in declaration order (inherited
//! fields first), and its field policies (chunkable, detachable, ignored).
//! Policies merge down the inheritance chain.

use std::sync::{Arc, LazyLock};

use indexmap::{IndexMap, IndexSet};

use crate::error::{ObjectError, ObjectResult};
use crate::field_type::FieldType;
use crate::names::validate_field_name;
use crate::wire;

/// `speckle_type` of the root record type.
pub const BASE_TYPE: &str = "Base";
/// `speckle_type` of synthesized chunk records.
pub const DATA_CHUNK_TYPE: &str = "Speckle.Core.Models.DataChunk";

static BASE: LazyLock<Arc<TypeDescriptor>> = LazyLock::new(|| {
    Arc::new(TypeDescriptor {
        speckle_type: BASE_TYPE.to_string(),
        name: BASE_TYPE.to_string(),
        parent: None,
        fields: Vec::new(),
        chunkable: IndexMap::new(),
        detachable: IndexSet::new(),
        serialize_ignore: IndexSet::new(),
    })
});

static DATA_CHUNK: LazyLock<Arc<TypeDescriptor>> = LazyLock::new(|| {
    Arc::new(TypeDescriptor {
        speckle_type: DATA_CHUNK_TYPE.to_string(),
        name: DATA_CHUNK_TYPE.to_string(),
        parent: Some(TypeDescriptor::base()),
        fields: vec![FieldDecl {
            name: "data".to_string(),
            ty: FieldType::list(FieldType::Any),
        }],
        chunkable: IndexMap::new(),
        detachable: IndexSet::new(),
        serialize_ignore: IndexSet::new(),
    })
});

/// A statically declared field.
#[derive(Clone, Debug, PartialEq)]
pub struct FieldDecl {
    pub name: String,
    pub ty: FieldType,
}

/// Metadata for one record type.
#[derive(Debug)]
pub struct TypeDescriptor {
    speckle_type: String,
    name: String,
    parent: Option<Arc<TypeDescriptor>>,
    fields: Vec<FieldDecl>,
    chunkable: IndexMap<String, usize>,
    detachable: IndexSet<String>,
    serialize_ignore: IndexSet<String>,
}

impl TypeDescriptor {
    /// The root record type.
    pub fn base() -> Arc<TypeDescriptor> {
        Arc::clone(&BASE)
    }

    /// The chunk record type (`data: list`).
    pub fn data_chunk() -> Arc<TypeDescriptor> {
        Arc::clone(&DATA_CHUNK)
    }

    /// Start defining a type directly below the root record type.
    ///
    /// `name` is the type's qualified name; it becomes the type's segment of
    /// the `speckle_type` unless overridden with
    /// [`TypeBuilder::speckle_type`].
    pub fn builder(name: impl Into<String>) -> TypeBuilder {
        TypeBuilder {
            name: name.into(),
            parent: Self::base(),
            segment: None,
            fields: Vec::new(),
            chunkable: IndexMap::new(),
            detachable: IndexSet::new(),
            serialize_ignore: IndexSet::new(),
        }
    }

    /// Effective `speckle_type`: the colon-joined ancestry (root excluded).
    pub fn speckle_type(&self) -> &str {
        &self.speckle_type
    }

    /// The type's own qualified name.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parent(&self) -> Option<&Arc<TypeDescriptor>> {
        self.parent.as_ref()
    }

    /// Declared fields, inherited first, each in declaration order.
    pub fn fields(&self) -> &[FieldDecl] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldDecl> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    /// Chunk size for a chunkable field.
    pub fn chunk_size(&self, field: &str) -> Option<usize> {
        self.chunkable.get(field).copied()
    }

    pub fn chunkable(&self) -> &IndexMap<String, usize> {
        &self.chunkable
    }

    pub fn is_detachable(&self, field: &str) -> bool {
        self.detachable.contains(field)
    }

    pub fn detachable(&self) -> &IndexSet<String> {
        &self.detachable
    }

    pub fn is_ignored(&self, field: &str) -> bool {
        self.serialize_ignore.contains(field)
    }

    pub fn serialize_ignore(&self) -> &IndexSet<String> {
        &self.serialize_ignore
    }

    /// Returns `true` if this type is `speckle_type` or descends from it.
    pub fn is_subtype_of(&self, speckle_type: &str) -> bool {
        speckle_type == BASE_TYPE || type_chain_contains(&self.speckle_type, speckle_type)
    }
}

/// Returns `true` if `chain` equals `ancestor` or starts with `ancestor:`.
pub(crate) fn type_chain_contains(chain: &str, ancestor: &str) -> bool {
    chain == ancestor
        || chain
            .strip_prefix(ancestor)
            .is_some_and(|rest| rest.starts_with(':'))
}

/// Builder for a [`TypeDescriptor`].
#[derive(Debug)]
pub struct TypeBuilder {
    name: String,
    parent: Arc<TypeDescriptor>,
    segment: Option<String>,
    fields: Vec<FieldDecl>,
    chunkable: IndexMap<String, usize>,
    detachable: IndexSet<String>,
    serialize_ignore: IndexSet<String>,
}

impl TypeBuilder {
    /// Derive from `parent` instead of the root record type.
    pub fn extends(mut self, parent: &Arc<TypeDescriptor>) -> Self {
        self.parent = Arc::clone(parent);
        self
    }

    /// Override this type's segment of the `speckle_type`.
    pub fn speckle_type(mut self, segment: impl Into<String>) -> Self {
        self.segment = Some(segment.into());
        self
    }

    /// Declare a typed field.
    pub fn field(mut self, name: impl Into<String>, ty: FieldType) -> Self {
        self.fields.push(FieldDecl {
            name: name.into(),
            ty,
        });
        self
    }

    /// Mark a field as chunkable with the given chunk size.
    pub fn chunkable(mut self, name: impl Into<String>, chunk_size: usize) -> Self {
        self.chunkable.insert(name.into(), chunk_size);
        self
    }

    /// Mark a field as detachable.
    pub fn detachable(mut self, name: impl Into<String>) -> Self {
        self.detachable.insert(name.into());
        self
    }

    /// Exclude a field from serialization.
    pub fn ignore(mut self, name: impl Into<String>) -> Self {
        self.serialize_ignore.insert(name.into());
        self
    }

    /// Validate and compute the descriptor.
    pub fn build(self) -> ObjectResult<TypeDescriptor> {
        let segment = self.segment.unwrap_or_else(|| self.name.clone());
        if segment.is_empty() {
            return Err(ObjectError::InvalidFieldName {
                name: segment,
                reason: "speckle_type segments must not be empty".into(),
            });
        }

        let speckle_type = if self.parent.is_root() {
            segment
        } else {
            format!("{}:{}", self.parent.speckle_type, segment)
        };

        let mut fields = self.parent.fields.clone();
        for decl in self.fields {
            validate_field_name(&decl.name)?;
            if wire::is_header_key(&decl.name) {
                return Err(ObjectError::ReservedField(decl.name));
            }
            match fields.iter_mut().find(|f| f.name == decl.name) {
                // Redeclaring an inherited field narrows its type in place.
                Some(existing) => existing.ty = decl.ty,
                None => fields.push(decl),
            }
        }

        let mut chunkable = self.parent.chunkable.clone();
        for (name, size) in self.chunkable {
            if size == 0 {
                return Err(ObjectError::InvalidFieldName {
                    name,
                    reason: "chunk size must be positive".into(),
                });
            }
            chunkable.insert(name, size);
        }
        let mut detachable = self.parent.detachable.clone();
        detachable.extend(self.detachable);
        let mut serialize_ignore = self.parent.serialize_ignore.clone();
        serialize_ignore.extend(self.serialize_ignore);

        Ok(TypeDescriptor {
            speckle_type,
            name: self.name,
            parent: Some(self.parent),
            fields,
            chunkable,
            detachable,
            serialize_ignore,
        })
    }
}
