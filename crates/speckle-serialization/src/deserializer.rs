//! Record graph recomposition.
//!
//! [`Deserializer`] turns a serialized record back into a [`Base`],
//! resolving reference placeholders through a read transport, mapping
//! `speckle_type`s through a [`TypeRegistry`] and reassembling chunked
//! sequences.

use serde_json::{Map, Value as Json};
use speckle_objects::wire::{
    self, APPLICATION_ID_KEY, CLOSURE_KEY, ID_KEY, SPECKLE_TYPE_KEY, TOTAL_CHILDREN_COUNT_KEY,
    UNITS_KEY,
};
use speckle_objects::{flatten_chunks, Base, TypeRegistry, Value, BASE_TYPE};
use speckle_transports::Transport;
use speckle_types::ObjectId;
use tracing::{debug, warn};

use crate::error::{SerializationError, SerializationResult};

/// Recomposes serialized records into record graphs.
pub struct Deserializer<'a> {
    read_transport: Option<&'a dyn Transport>,
    registry: &'a TypeRegistry,
}

impl<'a> Deserializer<'a> {
    /// Deserializer resolving types through the global registry.
    pub fn new(read_transport: Option<&'a dyn Transport>) -> Self {
        Self {
            read_transport,
            registry: TypeRegistry::global(),
        }
    }

    /// Resolve types through `registry` instead of the global one.
    pub fn with_registry(mut self, registry: &'a TypeRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn read_transport(&self) -> Option<&'a dyn Transport> {
        self.read_transport
    }

    /// Recompose a record from its JSON.
    ///
    /// If the JSON is a reference placeholder, the referenced record is
    /// fetched from the read transport first.
    pub fn read_json(&self, json: &str) -> SerializationResult<Base> {
        let value: Json = serde_json::from_str(json)?;
        let Json::Object(object) = value else {
            return Err(SerializationError::NotARecord(format!(
                "expected a JSON object, got {}",
                json_kind(&value)
            )));
        };
        match wire::referenced_id(&object) {
            Some(id) => {
                let id = ObjectId::from_hex(id)?;
                self.read_id(&id)
            }
            None => self.recompose(object),
        }
    }

    /// Fetch a record by id from the read transport and recompose it.
    pub fn read_id(&self, id: &ObjectId) -> SerializationResult<Base> {
        let transport = self.require_transport(id)?;
        let json = transport
            .get(id)?
            .ok_or_else(|| SerializationError::ObjectNotFound(id.to_hex()))?;
        let object = parse_object(&json)?;
        self.recompose(object)
    }

    fn require_transport(&self, id: &ObjectId) -> SerializationResult<&'a dyn Transport> {
        self.read_transport.ok_or_else(|| {
            SerializationError::MissingTransport(format!(
                "a read transport is required to resolve {}",
                id.short_hex()
            ))
        })
    }

    /// Recompose one record object.
    pub fn recompose(&self, mut object: Map<String, Json>) -> SerializationResult<Base> {
        let speckle_type = match object.shift_remove(SPECKLE_TYPE_KEY) {
            Some(Json::String(t)) => t,
            _ => BASE_TYPE.to_string(),
        };
        let resolved = self.registry.resolve(&speckle_type);
        if !resolved.exact {
            debug!(speckle_type = %speckle_type, resolved = resolved.descriptor.speckle_type(), "unregistered type");
        }
        let mut base = resolved.instantiate(&speckle_type);

        if let Some(closure) = object.shift_remove(CLOSURE_KEY) {
            if self.read_transport.is_none() {
                return Err(SerializationError::MissingTransport(format!(
                    "record of type {speckle_type} has a closure but no read transport was given"
                )));
            }
            let count = closure.as_object().map_or(0, Map::len);
            base.set_total_children_count(Some(count as u64));
        }
        if let Some(count) = object.shift_remove(TOTAL_CHILDREN_COUNT_KEY) {
            if base.total_children_count().is_none() {
                base.set_total_children_count(count.as_u64());
            }
        }
        if let Some(Json::String(id)) = object.shift_remove(ID_KEY) {
            base.set_id(Some(id));
        }
        if let Some(Json::String(application_id)) = object.shift_remove(APPLICATION_ID_KEY) {
            base.set_application_id(Some(application_id));
        }
        if let Some(Json::String(units)) = object.shift_remove(UNITS_KEY) {
            base.set_units_str(&units)?;
        }

        for (name, value) in object {
            let value = self.handle_value(value)?;
            if value.is_null() {
                continue;
            }
            base.set_field(&name, value)?;
        }
        Ok(base)
    }

    fn handle_value(&self, value: Json) -> SerializationResult<Value> {
        match value {
            Json::Null => Ok(Value::Null),
            Json::Bool(b) => Ok(Value::Bool(b)),
            Json::Number(n) => Ok(match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
            }),
            Json::String(s) => Ok(Value::String(s)),
            Json::Array(items) => {
                let mut out = Vec::with_capacity(items.len());
                for item in items {
                    out.push(self.handle_value(item)?);
                }
                Ok(Value::List(flatten_chunks(out)))
            }
            Json::Object(object) => {
                if let Some(id) = wire::referenced_id(&object) {
                    return self.dereference(id.to_string(), object);
                }
                if matches!(object.get(SPECKLE_TYPE_KEY), Some(Json::String(_))) {
                    return Ok(Value::from(self.recompose(object)?));
                }
                self.handle_map(object)
            }
        }
    }

    fn handle_map(&self, object: Map<String, Json>) -> SerializationResult<Value> {
        let mut map = indexmap::IndexMap::with_capacity(object.len());
        for (key, item) in object {
            map.insert(key, self.handle_value(item)?);
        }
        Ok(Value::Map(map))
    }

    /// Resolve a placeholder. A child missing from the transport is logged
    /// and the placeholder is kept as a plain map.
    fn dereference(&self, id: String, placeholder: Map<String, Json>) -> SerializationResult<Value> {
        let object_id = ObjectId::from_hex(&id)?;
        let transport = self.require_transport(&object_id)?;
        match transport.get(&object_id)? {
            Some(json) => Ok(Value::from(self.recompose(parse_object(&json)?)?)),
            None => {
                warn!(
                    id = %id,
                    transport = transport.name(),
                    "referenced object not found, keeping the reference"
                );
                self.handle_map(placeholder)
            }
        }
    }
}

fn parse_object(json: &str) -> SerializationResult<Map<String, Json>> {
    match serde_json::from_str(json)? {
        Json::Object(object) => Ok(object),
        other => Err(SerializationError::NotARecord(format!(
            "expected a JSON object, got {}",
            json_kind(&other)
        ))),
    }
}

fn json_kind(value: &Json) -> &'static str {
    match value {
        Json::Null => "null",
        Json::Bool(_) => "a boolean",
        Json::Number(_) => "a number",
        Json::String(_) => "a string",
        Json::Array(_) => "an array",
        Json::Object(_) => "an object",
    }
}

impl std::fmt::Debug for Deserializer<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Deserializer")
            .field("read_transport", &self.read_transport.map(|t| t.name()))
            .field("registry", self.registry)
            .finish()
    }
}
