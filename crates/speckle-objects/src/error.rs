use speckle_types::TypeError;
use thiserror::Error;

/// Errors raised while building or mutating records.
///
/// Every variant is fatal for the assignment that raised it: the record is
/// left exactly as it was before the call.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ObjectError {
    /// The field name breaks the naming rules.
    #[error("invalid field name {name:?}: {reason}")]
    InvalidFieldName { name: String, reason: String },

    /// A typed field received a value that cannot be coerced to its type.
    #[error("type mismatch for field {field:?}: expected {expected}, found {found}")]
    TypeMismatch {
        field: String,
        expected: String,
        found: String,
    },

    /// The field name is reserved for the record header.
    #[error("field name {0:?} is reserved")]
    ReservedField(String),

    /// A units assignment was not a recognised unit.
    #[error("units error: {0}")]
    Units(#[from] TypeError),
}

/// Result alias for record operations.
pub type ObjectResult<T> = Result<T, ObjectError>;

/// Errors from the type registry.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    /// A descriptor with this `speckle_type` is already registered.
    #[error("speckle_type {0:?} is already registered")]
    AlreadyRegistered(String),

    /// The descriptor itself is malformed.
    #[error("invalid type definition: {0}")]
    InvalidDefinition(#[from] ObjectError),
}

/// Result alias for registry operations.
pub type RegistryResult<T> = Result<T, RegistryError>;
