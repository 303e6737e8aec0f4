//! Record model for the Speckle object codec.
//!
//! This crate defines the in-memory side of the codec: records ([`Base`]),
//! the values their fields hold ([`Value`]), the per-type metadata the
//! serializer consults ([`TypeDescriptor`]), and the registry that maps a
//! `speckle_type` back to a descriptor when records are read.
//!
//! # Design Rules
//!
//! 1. Field names are validated on every assignment; a rejected assignment
//!    leaves the record untouched.
//! 2. Typed fields are coerced to their declared type on assignment.
//! 3. Field policies (chunkable, detachable, ignored) live on the type
//!    descriptor, never on instances.
//! 4. A record's `speckle_type` cannot be changed after construction.
//! 5. Records own their children, so record graphs are always acyclic.

pub mod base;
pub mod chunk;
pub mod descriptor;
pub mod error;
pub mod field_type;
pub mod names;
pub mod registry;
pub mod value;
pub mod wire;

pub use base::Base;
pub use chunk::{flatten_chunks, split_into_chunks};
pub use descriptor::{FieldDecl, TypeBuilder, TypeDescriptor, BASE_TYPE, DATA_CHUNK_TYPE};
pub use error::{ObjectError, ObjectResult, RegistryError, RegistryResult};
pub use field_type::{EnumType, FieldType};
pub use names::{parse_chunk_prefix, validate_field_name, DEFAULT_CHUNK_SIZE};
pub use registry::{Resolved, TypeRegistry};
pub use value::Value;

pub use speckle_types::{ObjectId, Units};
