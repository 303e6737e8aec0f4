use speckle_types::ObjectId;

/// Errors from transport operations.
///
/// Transport errors are fatal for the codec call that triggered them; the
/// codec never retries. Retrying is the transport's own business.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The requested object was not found.
    #[error("object not found: {0}")]
    NotFound(ObjectId),

    /// The transport does not implement this operation.
    #[error("{transport} does not support {operation}")]
    Unsupported {
        transport: String,
        operation: &'static str,
    },

    /// Error from the local SQLite store.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Error from the HTTP client.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a non-success status.
    #[error("server returned {status} for {url}: {body}")]
    Status {
        status: u16,
        url: String,
        body: String,
    },

    /// The server's response could not be understood.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Invalid or unresolvable transport configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// I/O error from the underlying storage backend.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result alias for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;
