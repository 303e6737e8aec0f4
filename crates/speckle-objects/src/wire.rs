//! Reserved keys of the on-wire record format and reference placeholders.
//!
//! A record is a JSON object whose header keys are `id`, `speckle_type`,
//! `totalChildrenCount`, the optional `__closure`, `applicationId` and
//! `units`. Every other key is a user field. A child emitted as its own
//! record is replaced in its parent by a placeholder:
//!
//! ```json
//! {"referencedId": "<32 hex chars>", "speckle_type": "reference"}
//! ```

use serde_json::{Map, Value as Json};
use speckle_types::ObjectId;

pub const ID_KEY: &str = "id";
pub const SPECKLE_TYPE_KEY: &str = "speckle_type";
pub const TOTAL_CHILDREN_COUNT_KEY: &str = "totalChildrenCount";
pub const CLOSURE_KEY: &str = "__closure";
pub const APPLICATION_ID_KEY: &str = "applicationId";
pub const UNITS_KEY: &str = "units";

pub const REFERENCE_TYPE: &str = "reference";
pub const REFERENCED_ID_KEY: &str = "referencedId";

const HEADER_KEYS: [&str; 6] = [
    ID_KEY,
    SPECKLE_TYPE_KEY,
    TOTAL_CHILDREN_COUNT_KEY,
    CLOSURE_KEY,
    APPLICATION_ID_KEY,
    UNITS_KEY,
];

/// Returns `true` for keys the record header owns.
pub fn is_header_key(key: &str) -> bool {
    HEADER_KEYS.contains(&key)
}

/// Build a reference placeholder pointing at `id`.
pub fn reference_placeholder(id: &ObjectId) -> Map<String, Json> {
    let mut placeholder = Map::new();
    placeholder.insert(REFERENCED_ID_KEY.to_string(), Json::String(id.to_hex()));
    placeholder.insert(
        SPECKLE_TYPE_KEY.to_string(),
        Json::String(REFERENCE_TYPE.to_string()),
    );
    placeholder
}

/// If `object` is a reference placeholder, return the id it points at.
pub fn referenced_id(object: &Map<String, Json>) -> Option<&str> {
    match object.get(SPECKLE_TYPE_KEY) {
        Some(Json::String(t)) if t == REFERENCE_TYPE => {}
        _ => return None,
    }
    object.get(REFERENCED_ID_KEY).and_then(Json::as_str)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholder_shape() {
        let id = ObjectId::from_digest([0xab; 16]);
        let placeholder = reference_placeholder(&id);
        let text = serde_json::to_string(&placeholder).unwrap();
        assert_eq!(
            text,
            format!(r#"{{"referencedId":"{}","speckle_type":"reference"}}"#, "ab".repeat(16))
        );
        assert_eq!(referenced_id(&placeholder), Some("ab".repeat(16).as_str()));
    }

    #[test]
    fn plain_objects_are_not_references() {
        let mut object = Map::new();
        object.insert(REFERENCED_ID_KEY.into(), Json::String("x".into()));
        assert_eq!(referenced_id(&object), None);
        object.insert(SPECKLE_TYPE_KEY.into(), Json::String("Base".into()));
        assert_eq!(referenced_id(&object), None);
    }

    #[test]
    fn header_keys() {
        assert!(is_header_key("id"));
        assert!(is_header_key("__closure"));
        assert!(!is_header_key("vertices"));
    }
}
