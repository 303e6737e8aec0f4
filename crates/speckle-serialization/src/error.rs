use speckle_crypto::HasherError;
use speckle_objects::ObjectError;
use speckle_transports::TransportError;
use speckle_types::TypeError;

/// Errors from serializing or deserializing a record graph.
///
/// Any error aborts the whole call. Records already written to a transport
/// stay there; they are content-addressed, so a retry rewrites the same ids.
#[derive(Debug, thiserror::Error)]
pub enum SerializationError {
    /// No transport was available where one is required.
    #[error("missing transport: {0}")]
    MissingTransport(String),

    /// A value has no JSON form.
    #[error("cannot serialize value: {0}")]
    Unserializable(String),

    /// Malformed JSON input.
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// JSON that is not a record object.
    #[error("not a record: {0}")]
    NotARecord(String),

    /// A record the caller asked for does not exist in the read transport.
    #[error("object not found: {0}")]
    ObjectNotFound(String),

    #[error("invalid object id: {0}")]
    InvalidId(#[from] TypeError),

    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("object error: {0}")]
    Object(#[from] ObjectError),

    #[error("hashing error: {0}")]
    Hasher(#[from] HasherError),
}

/// Result alias for codec operations.
pub type SerializationResult<T> = Result<T, SerializationError>;
