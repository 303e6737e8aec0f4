//! Field name validation and prefix markers.
//!
//! Valid field names:
//! - Must be non-empty
//! - Must not be a bare `@`
//! - Must not start with more than one `@`
//! - Must not contain `.` or `/`
//!
//! A single leading `@` marks the field as detached: a record held in it is
//! emitted as its own content-addressed record. A leading `@(N)` marks the
//! field as chunked with chunk size `N` (or [`DEFAULT_CHUNK_SIZE`] when `N`
//! is missing or zero). Names starting with `_` are private and never
//! serialized.

use crate::error::{ObjectError, ObjectResult};

/// Chunk size used by the `@()` marker and by a `@(0)` marker.
pub const DEFAULT_CHUNK_SIZE: usize = 1000;

/// Characters that are forbidden anywhere in a field name.
const FORBIDDEN_CHARS: &[char] = &['.', '/'];

/// Validate a field name, returning `Ok(())` if valid.
///
/// # Examples
///
/// ```
/// use speckle_objects::names::validate_field_name;
///
/// assert!(validate_field_name("vertices").is_ok());
/// assert!(validate_field_name("@(100)vertices").is_ok());
/// assert!(validate_field_name("").is_err());
/// assert!(validate_field_name("a.b").is_err());
/// ```
pub fn validate_field_name(name: &str) -> ObjectResult<()> {
    if name.is_empty() || name == "@" {
        return Err(ObjectError::InvalidFieldName {
            name: name.to_string(),
            reason: "field names must not be empty".into(),
        });
    }

    if name.starts_with("@@") {
        return Err(ObjectError::InvalidFieldName {
            name: name.to_string(),
            reason: "field names must not start with more than one '@'".into(),
        });
    }

    for ch in FORBIDDEN_CHARS {
        if name.contains(*ch) {
            return Err(ObjectError::InvalidFieldName {
                name: name.to_string(),
                reason: format!("contains forbidden character: {ch:?}"),
            });
        }
    }

    Ok(())
}

/// Returns `true` if the name carries a detach marker (`@...` or `@(N)...`).
pub fn is_detach_marked(name: &str) -> bool {
    name.starts_with('@')
}

/// Returns `true` for private names, which are never serialized.
pub fn is_private(name: &str) -> bool {
    name.starts_with('_')
}

/// Parse a dynamic chunk marker.
///
/// Returns the chunk size for names of the form `@(N)rest`, substituting
/// [`DEFAULT_CHUNK_SIZE`] when `N` is empty or zero. Returns `None` when the
/// name has no well-formed marker.
pub fn parse_chunk_prefix(name: &str) -> Option<usize> {
    let rest = name.strip_prefix("@(")?;
    let close = rest.find(')')?;
    let digits = &rest[..close];
    if digits.is_empty() {
        return Some(DEFAULT_CHUNK_SIZE);
    }
    if !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    match digits.parse::<usize>() {
        Ok(0) => Some(DEFAULT_CHUNK_SIZE),
        Ok(size) => Some(size),
        Err(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn rejects_invalid_names() {
        for name in ["", "@", "@@foo", "a.b", "a/b"] {
            assert!(
                validate_field_name(name).is_err(),
                "expected {name:?} to be rejected"
            );
        }
    }

    #[test]
    fn accepts_valid_names() {
        for name in ["foo", "@foo", "@(100)foo", "@()foo", "_private", "__closure"] {
            assert!(
                validate_field_name(name).is_ok(),
                "expected {name:?} to be accepted"
            );
        }
    }

    #[test]
    fn error_carries_reason() {
        let err = validate_field_name("@@x").unwrap_err();
        match err {
            ObjectError::InvalidFieldName { name, reason } => {
                assert_eq!(name, "@@x");
                assert!(reason.contains("more than one"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn chunk_prefix_sizes() {
        assert_eq!(parse_chunk_prefix("@(100)vertices"), Some(100));
        assert_eq!(parse_chunk_prefix("@(2)data"), Some(2));
        assert_eq!(parse_chunk_prefix("@()data"), Some(DEFAULT_CHUNK_SIZE));
        assert_eq!(parse_chunk_prefix("@(0)data"), Some(DEFAULT_CHUNK_SIZE));
    }

    #[test]
    fn chunk_prefix_rejects_malformed_markers() {
        assert_eq!(parse_chunk_prefix("@data"), None);
        assert_eq!(parse_chunk_prefix("data"), None);
        assert_eq!(parse_chunk_prefix("@(abc)data"), None);
        assert_eq!(parse_chunk_prefix("@(12data"), None);
    }

    #[test]
    fn markers() {
        assert!(is_detach_marked("@child"));
        assert!(is_detach_marked("@(10)child"));
        assert!(!is_detach_marked("child"));
        assert!(is_private("_cache"));
        assert!(!is_private("cache"));
    }

    proptest! {
        #[test]
        fn plain_identifiers_are_valid(name in "[A-Za-z][A-Za-z0-9_]{0,30}") {
            prop_assert!(validate_field_name(&name).is_ok());
            let detached = format!("@{name}");
            prop_assert!(validate_field_name(&detached).is_ok());
        }

        #[test]
        fn names_with_dots_or_slashes_are_invalid(
            head in "[a-z]{0,8}",
            sep in prop::sample::select(vec!['.', '/']),
            tail in "[a-z]{0,8}",
        ) {
            let name = format!("{head}{sep}{tail}");
            prop_assert!(validate_field_name(&name).is_err());
        }

        #[test]
        fn chunk_marker_roundtrips_size(size in 1usize..100_000) {
            let name = format!("@({size})field");
            prop_assert_eq!(parse_chunk_prefix(&name), Some(size));
        }
    }
}
