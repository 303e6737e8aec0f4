//! The Speckle object codec.
//!
//! [`Serializer`] decomposes a record graph into content-addressed JSON
//! records, writing every detached record to its write transports, and
//! [`Deserializer`] recomposes a graph from those records.
//!
//! # Wire rules
//!
//! 1. A record's id is the fingerprint of its JSON with `id` set to `""`
//!    and without `__closure`.
//! 2. A detached child is replaced in its parent by a reference placeholder
//!    and stored as its own record.
//! 3. A chunkable sequence is split into `DataChunk` records, each detached.
//! 4. `__closure` maps every detached descendant to its minimum depth.

pub mod deserializer;
pub mod error;
pub mod serializer;

pub use deserializer::Deserializer;
pub use error::{SerializationError, SerializationResult};
pub use serializer::{Closure, Serializer};
