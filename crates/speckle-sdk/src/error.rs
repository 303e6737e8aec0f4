use thiserror::Error;

#[derive(Debug, Error)]
pub enum SdkError {
    #[error("missing transport: {0}")]
    MissingTransport(String),

    #[error("object not found: {0}")]
    ObjectNotFound(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("invalid object id: {0}")]
    InvalidId(#[from] speckle_types::TypeError),

    #[error("serialization error: {0}")]
    Serialization(#[from] speckle_serialization::SerializationError),

    #[error("transport error: {0}")]
    Transport(#[from] speckle_transports::TransportError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type SdkResult<T> = Result<T, SdkError>;
