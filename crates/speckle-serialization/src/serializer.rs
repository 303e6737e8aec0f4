//! Record graph decomposition.
//!
//! [`Serializer`] walks a record tree depth-first, turning every record into
//! a JSON object and every detached child into a reference placeholder.
//! Detached records are written to each write transport in post-order, so a
//! record is only saved after all of its own detached children.
//!
//! Alongside the JSON, the walk builds each record's closure: the set of
//! detached descendants reachable from it, each mapped to the smallest
//! detachment depth at which it was reached.

use std::collections::HashMap;

use indexmap::IndexMap;
use serde_json::{Map, Number, Value as Json};
use speckle_crypto::ContentHasher;
use speckle_objects::names::{is_detach_marked, is_private, parse_chunk_prefix};
use speckle_objects::wire::{
    self, APPLICATION_ID_KEY, CLOSURE_KEY, ID_KEY, SPECKLE_TYPE_KEY, TOTAL_CHILDREN_COUNT_KEY,
    UNITS_KEY,
};
use speckle_objects::{split_into_chunks, Base, Value};
use speckle_transports::Transport;
use speckle_types::ObjectId;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{SerializationError, SerializationResult};

/// Closure of one record: descendant id to depth.
pub type Closure = IndexMap<ObjectId, usize>;

/// Decomposes record graphs into content-addressed JSON records.
///
/// Traversal state is reset at the start of every [`Serializer::traverse_root`]
/// call; the closure table of the last run stays readable afterwards.
pub struct Serializer<'a> {
    write_transports: Vec<&'a dyn Transport>,
    /// One frame per record on the stack; `true` when it is emitted detached.
    detach_lineage: Vec<bool>,
    /// Ephemeral ids of the records on the stack.
    lineage: Vec<Uuid>,
    family_tree: HashMap<Uuid, Closure>,
    closure_table: HashMap<ObjectId, Closure>,
}

impl<'a> Serializer<'a> {
    /// Serializer writing detached records to every transport in `write_transports`.
    pub fn new(write_transports: Vec<&'a dyn Transport>) -> Self {
        Self {
            write_transports,
            detach_lineage: Vec::new(),
            lineage: Vec::new(),
            family_tree: HashMap::new(),
            closure_table: HashMap::new(),
        }
    }

    /// Serializer with no write transports. Every child is inlined; useful
    /// for computing fingerprints.
    pub fn without_transports() -> Self {
        Self::new(Vec::new())
    }

    pub fn write_transports(&self) -> &[&'a dyn Transport] {
        &self.write_transports
    }

    /// Closure tables of every record produced by the last run.
    pub fn closure_table(&self) -> &HashMap<ObjectId, Closure> {
        &self.closure_table
    }

    /// Serialize `root`, returning its id and its JSON object.
    ///
    /// Brackets the run with `begin_write` / `end_write` on every write
    /// transport. The root is always emitted as a detached record.
    pub fn traverse_root(&mut self, root: &Base) -> SerializationResult<(ObjectId, Json)> {
        self.reset();
        for transport in &self.write_transports {
            transport.begin_write()?;
        }

        self.detach_lineage.push(true);
        let (id, object) = self.traverse_base(root)?;

        for transport in &self.write_transports {
            transport.end_write()?;
        }
        info!(
            root = %id.short_hex(),
            speckle_type = root.speckle_type(),
            records = self.closure_table.len(),
            transports = self.write_transports.len(),
            "serialized record graph"
        );
        Ok((id, Json::Object(object)))
    }

    /// Serialize `root` to a JSON string.
    pub fn write_json(&mut self, root: &Base) -> SerializationResult<(ObjectId, String)> {
        let (id, object) = self.traverse_root(root)?;
        Ok((id, serde_json::to_string(&object)?))
    }

    fn reset(&mut self) {
        self.detach_lineage.clear();
        self.lineage.clear();
        self.family_tree.clear();
        self.closure_table.clear();
    }

    fn has_writers(&self) -> bool {
        !self.write_transports.is_empty()
    }

    /// Serialize one record. The caller has already pushed its frame onto
    /// `detach_lineage`.
    fn traverse_base(&mut self, base: &Base) -> SerializationResult<(ObjectId, Map<String, Json>)> {
        let lineage_id = Uuid::new_v4();
        self.lineage.push(lineage_id);
        self.family_tree.insert(lineage_id, Closure::new());

        let mut object = Map::new();
        object.insert(ID_KEY.to_string(), Json::String(String::new()));
        object.insert(
            SPECKLE_TYPE_KEY.to_string(),
            Json::String(base.speckle_type().to_string()),
        );
        object.insert(TOTAL_CHILDREN_COUNT_KEY.to_string(), Json::from(0u64));
        if let Some(application_id) = base.application_id() {
            object.insert(
                APPLICATION_ID_KEY.to_string(),
                Json::String(application_id.to_string()),
            );
        }

        for (name, value) in base.members() {
            if value.is_null() || is_private(name) || name == ID_KEY {
                continue;
            }
            let chunk_size = base
                .descriptor()
                .chunk_size(name)
                .or_else(|| parse_chunk_prefix(name));
            let chunkable = chunk_size.is_some() && self.has_writers();
            let detach =
                is_detach_marked(name) || base.descriptor().is_detachable(name) || chunkable;

            let json = match (value, chunk_size) {
                (Value::List(items), Some(size)) if chunkable => self.traverse_chunks(items, size)?,
                _ => self.traverse_value(value, detach)?,
            };
            object.insert(name.to_string(), json);
        }

        if let Some(units) = base.units() {
            object.insert(UNITS_KEY.to_string(), Json::String(units.token().to_string()));
        }

        let detached = self.detach_lineage.pop().unwrap_or(false);
        let base_depth = self.detach_lineage.len();
        let closure: Closure = self
            .family_tree
            .remove(&lineage_id)
            .unwrap_or_default()
            .into_iter()
            .map(|(child, depth)| (child, depth.saturating_sub(base_depth)))
            .collect();

        object.insert(
            TOTAL_CHILDREN_COUNT_KEY.to_string(),
            Json::from(closure.len() as u64),
        );
        let id = ContentHasher::fingerprint_record(&object)?;
        object.insert(ID_KEY.to_string(), Json::String(id.to_hex()));
        if !closure.is_empty() {
            let table: Map<String, Json> = closure
                .iter()
                .map(|(child, depth)| (child.to_hex(), Json::from(*depth as u64)))
                .collect();
            object.insert(CLOSURE_KEY.to_string(), Json::Object(table));
        }

        if detached && self.has_writers() {
            let serialized = serde_json::to_string(&object)?;
            for transport in &self.write_transports {
                transport.save(&id, &serialized)?;
            }
            debug!(id = %id.short_hex(), bytes = serialized.len(), "saved detached record");
        }

        self.closure_table.insert(id, closure);
        self.lineage.pop();
        Ok((id, object))
    }

    fn traverse_value(&mut self, value: &Value, detach: bool) -> SerializationResult<Json> {
        match value {
            Value::Null => Ok(Json::Null),
            Value::Bool(b) => Ok(Json::Bool(*b)),
            Value::Int(i) => Ok(Json::from(*i)),
            Value::Float(f) => Number::from_f64(*f).map(Json::Number).ok_or_else(|| {
                SerializationError::Unserializable(format!("non-finite float {f}"))
            }),
            Value::String(s) => Ok(Json::String(s.clone())),
            Value::List(items) => {
                let mut out = Vec::with_capacity(items.len());
                for item in items {
                    out.push(self.traverse_value(item, detach)?);
                }
                Ok(Json::Array(out))
            }
            // Mapping values are never detached, whatever the field says.
            Value::Map(map) => {
                let mut out = Map::new();
                for (key, item) in map {
                    out.insert(key.clone(), self.traverse_value(item, false)?);
                }
                Ok(Json::Object(out))
            }
            Value::Record(child) => self.traverse_child(child, detach),
        }
    }

    /// A child record is replaced by a reference only when it is detached
    /// and there is somewhere to write it.
    fn traverse_child(&mut self, child: &Base, detach: bool) -> SerializationResult<Json> {
        let detach = detach && self.has_writers();
        self.detach_lineage.push(detach);
        let (id, object) = self.traverse_base(child)?;
        if detach {
            Ok(self.detach_helper(&id))
        } else {
            Ok(Json::Object(object))
        }
    }

    fn traverse_chunks(&mut self, items: &[Value], chunk_size: usize) -> SerializationResult<Json> {
        let chunks = split_into_chunks(items, chunk_size);
        let mut references = Vec::with_capacity(chunks.len());
        for chunk in &chunks {
            self.detach_lineage.push(true);
            let (id, _) = self.traverse_base(chunk)?;
            references.push(self.detach_helper(&id));
        }
        Ok(Json::Array(references))
    }

    /// Register a detached child with every record on the stack and return
    /// its placeholder. Keeps the smallest depth seen per ancestor.
    fn detach_helper(&mut self, id: &ObjectId) -> Json {
        let depth = self.detach_lineage.len();
        for ancestor in &self.lineage {
            let family = self.family_tree.entry(*ancestor).or_default();
            match family.get(id) {
                Some(&known) if known <= depth => {}
                _ => {
                    family.insert(*id, depth);
                }
            }
        }
        Json::Object(wire::reference_placeholder(id))
    }
}

impl std::fmt::Debug for Serializer<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.write_transports.iter().map(|t| t.name()).collect();
        f.debug_struct("Serializer")
            .field("write_transports", &names)
            .field("records", &self.closure_table.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use speckle_transports::MemoryTransport;

    fn leaf(name: &str) -> Base {
        Base::new().with_field("name", name).unwrap()
    }

    #[test]
    fn header_keys_come_first() {
        let root = Base::new().with_field("x", 1).unwrap();
        let (_, json) = Serializer::without_transports().traverse_root(&root).unwrap();
        let keys: Vec<&str> = json.as_object().unwrap().keys().map(String::as_str).collect();
        assert_eq!(keys, ["id", "speckle_type", "totalChildrenCount", "x"]);
    }

    #[test]
    fn inlined_without_transports() {
        let root = Base::new().with_field("@child", leaf("c")).unwrap();
        let (_, json) = Serializer::without_transports().traverse_root(&root).unwrap();
        let child = &json["@child"];
        assert_eq!(child["name"], "c");
        assert_eq!(json["totalChildrenCount"], 0);
        assert!(json.get("__closure").is_none());
    }

    #[test]
    fn nested_detached_depths() {
        let grandchild = leaf("g");
        let child = Base::new().with_field("@inner", grandchild).unwrap();
        let root = Base::new().with_field("@outer", child).unwrap();

        let memory = MemoryTransport::new();
        let mut serializer = Serializer::new(vec![&memory]);
        let (root_id, json) = serializer.traverse_root(&root).unwrap();

        let closure = json["__closure"].as_object().unwrap();
        assert_eq!(closure.len(), 2);
        let depths: Vec<u64> = closure.values().map(|d| d.as_u64().unwrap()).collect();
        assert!(depths.contains(&1));
        assert!(depths.contains(&2));
        assert_eq!(json["totalChildrenCount"], 2);
        assert_eq!(memory.len(), 3);
        assert_eq!(serializer.closure_table()[&root_id].len(), 2);
    }

    #[test]
    fn inline_parent_still_counts_depth() {
        let child = Base::new().with_field("@deep", leaf("d")).unwrap();
        let root = Base::new().with_field("inline", child).unwrap();

        let memory = MemoryTransport::new();
        let (_, json) = Serializer::new(vec![&memory])
            .traverse_root(&root)
            .unwrap();
        let root_closure = json["__closure"].as_object().unwrap();
        assert_eq!(root_closure.values().next().unwrap(), 2);
        let inline_closure = json["inline"]["__closure"].as_object().unwrap();
        assert_eq!(inline_closure.values().next().unwrap(), 1);
        // The root and the detached leaf; the inline child is not saved.
        assert_eq!(memory.len(), 2);
    }

    #[test]
    fn records_inside_detached_mapping_stay_inline() {
        let meta = IndexMap::from([("k".to_string(), Value::from(leaf("m")))]);
        let root = Base::new().with_field("@meta", Value::Map(meta)).unwrap();

        let memory = MemoryTransport::new();
        let (_, json) = Serializer::new(vec![&memory]).traverse_root(&root).unwrap();
        assert_eq!(json["@meta"]["k"]["name"], "m");
        assert!(json.get("__closure").is_none());
        assert_eq!(memory.len(), 1);
    }

    #[test]
    fn records_inside_detached_list_are_detached() {
        let root = Base::new()
            .with_field("@parts", Value::List(vec![Value::from(leaf("a")), Value::from(leaf("b"))]))
            .unwrap();

        let memory = MemoryTransport::new();
        let (_, json) = Serializer::new(vec![&memory]).traverse_root(&root).unwrap();
        let parts = json["@parts"].as_array().unwrap();
        assert!(parts.iter().all(|p| p["speckle_type"] == "reference"));
        assert_eq!(memory.len(), 3);
    }

    #[test]
    fn shared_child_keeps_minimum_depth() {
        let shared = leaf("s");
        let deep = Base::new().with_field("@again", shared.clone()).unwrap();
        let root = Base::new()
            .with_field("@a", deep)
            .unwrap()
            .with_field("@b", shared)
            .unwrap();

        let memory = MemoryTransport::new();
        let mut serializer = Serializer::new(vec![&memory]);
        let (root_id, _) = serializer.traverse_root(&root).unwrap();
        let closure = &serializer.closure_table()[&root_id];
        assert_eq!(closure.len(), 2);
        assert!(closure.values().all(|d| *d == 1));
        assert_eq!(memory.len(), 3);
    }

    #[test]
    fn detached_list_elements_become_references() {
        let root = Base::new()
            .with_field("@items", vec![Value::from(leaf("a")), Value::Int(3)])
            .unwrap();
        let memory = MemoryTransport::new();
        let (_, json) = Serializer::new(vec![&memory]).traverse_root(&root).unwrap();
        let items = json["@items"].as_array().unwrap();
        assert_eq!(items[0]["speckle_type"], "reference");
        assert_eq!(items[1], 3);
    }

    #[test]
    fn private_and_null_fields_are_skipped() {
        let mut root = Base::new();
        root.set_field("_cache", 1).unwrap();
        root.set_field("kept", true).unwrap();
        let (_, json) = Serializer::without_transports().traverse_root(&root).unwrap();
        assert!(json.get("_cache").is_none());
        assert_eq!(json["kept"], true);
    }

    #[test]
    fn non_finite_floats_are_rejected() {
        let root = Base::new().with_field("x", f64::NAN).unwrap();
        let err = Serializer::without_transports()
            .traverse_root(&root)
            .unwrap_err();
        assert!(matches!(err, SerializationError::Unserializable(_)));
    }

    #[test]
    fn state_resets_between_runs() {
        let root = Base::new().with_field("@c", leaf("c")).unwrap();
        let memory = MemoryTransport::new();
        let mut serializer = Serializer::new(vec![&memory]);
        let (first, _) = serializer.traverse_root(&root).unwrap();
        let (second, _) = serializer.traverse_root(&root).unwrap();
        assert_eq!(first, second);
        assert_eq!(serializer.closure_table().len(), 2);
        assert_eq!(memory.saved_count(), 2);
    }
}
