//! Foundation types for the Speckle object codec.
//!
//! This crate provides the small vocabulary shared by every other crate in
//! the workspace: the content fingerprint that names a serialized record, and
//! the canonical length-unit table records use to tag geometric quantities.
//!
//! # Key Types
//!
//! - [`ObjectId`]: Content fingerprint (first 16 bytes of a SHA-256, rendered as 32 hex chars)
//! - [`Units`]: Canonical length units with string aliases, integer encodings and scale factors

pub mod error;
pub mod object;
pub mod units;

pub use error::TypeError;
pub use object::ObjectId;
pub use units::{scale_factor_from_strings, Units};
