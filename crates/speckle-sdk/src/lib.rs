//! High-level Speckle SDK.
//!
//! Sends record graphs to, and receives them from, any combination of
//! transports. The free functions in [`operations`] mirror the codec's
//! primitive operations; [`SpeckleClient`] binds them to a configured local
//! cache and server.

pub mod client;
pub mod config;
pub mod error;
pub mod operations;

pub use client::SpeckleClient;
pub use config::SdkConfig;
pub use error::{SdkError, SdkResult};
pub use operations::{
    deserialize, object_id, receive, receive_into, send, send_with_cache, serialize,
};

// Re-export key types
pub use speckle_objects::{Base, FieldType, TypeDescriptor, TypeRegistry, Value};
pub use speckle_serialization::{Deserializer, Serializer};
pub use speckle_transports::{
    LocalTransportConfig, MemoryTransport, ServerTransport, ServerTransportConfig,
    SqliteTransport, Transport,
};
pub use speckle_types::{ObjectId, Units};
