//! Content fingerprinting for the Speckle object codec.
//!
//! Provides the canonical JSON encoding records are hashed in and the
//! truncated SHA-256 that turns that encoding into an [`ObjectId`].
//!
//! All crypto operations wrap established libraries; no custom cryptography.
//!
//! [`ObjectId`]: speckle_types::ObjectId

pub mod hasher;

pub use hasher::{ContentHasher, HasherError, CLOSURE_KEY, ID_KEY};
