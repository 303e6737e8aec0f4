//! Transports: where serialized records live.
//!
//! A transport is a content-addressed key/value store from a record's
//! fingerprint to its JSON. The codec writes detached records through every
//! configured write transport and reads them back through one read
//! transport.
//!
//! - [`MemoryTransport`]: process-local map, for tests and fingerprinting.
//! - [`SqliteTransport`]: the local on-disk cache.
//! - [`ServerTransport`]: a remote Speckle server stream.

pub mod config;
pub mod error;
pub mod memory;
pub mod server;
pub mod sqlite;
pub mod traits;

pub use config::{LocalTransportConfig, ServerTransportConfig};
pub use error::{TransportError, TransportResult};
pub use memory::MemoryTransport;
pub use server::ServerTransport;
pub use sqlite::{default_base_path, SqliteTransport};
pub use traits::{closure_ids, copy_closure, Transport};
