//! Data chunks.
//!
//! Chunks are never user-visible: the serializer splits a chunkable
//! sequence into chunk records and the deserializer concatenates them back.

use crate::base::Base;
use crate::descriptor::{TypeDescriptor, DATA_CHUNK_TYPE};
use crate::value::Value;

const DATA_FIELD: &str = "data";

impl Base {
    /// Create a chunk record holding `data`.
    pub fn data_chunk(data: Vec<Value>) -> Self {
        let mut chunk = Self::from_descriptor(TypeDescriptor::data_chunk());
        chunk.typed.insert(DATA_FIELD.to_string(), Value::List(data));
        chunk
    }

    pub fn is_data_chunk(&self) -> bool {
        self.speckle_type == DATA_CHUNK_TYPE
    }

    /// The chunk's items, if this record is a chunk.
    pub fn chunk_data(&self) -> Option<&[Value]> {
        if !self.is_data_chunk() {
            return None;
        }
        match self.get_field(DATA_FIELD) {
            Some(Value::List(items)) => Some(items),
            _ => Some(&[]),
        }
    }

    /// Consume a chunk record into its items.
    pub fn into_chunk_data(mut self) -> Option<Vec<Value>> {
        if !self.is_data_chunk() {
            return None;
        }
        match self.remove_field(DATA_FIELD) {
            Some(Value::List(items)) => Some(items),
            _ => Some(Vec::new()),
        }
    }
}

/// Split `items` into chunk records of at most `chunk_size` items each.
///
/// An empty sequence yields no chunks. A `chunk_size` of zero is treated
/// as one.
pub fn split_into_chunks(items: &[Value], chunk_size: usize) -> Vec<Base> {
    items
        .chunks(chunk_size.max(1))
        .map(|chunk| Base::data_chunk(chunk.to_vec()))
        .collect()
}

/// If every item is a chunk record, concatenate their data in order.
///
/// Returns the items unchanged when the first item is not a chunk.
pub fn flatten_chunks(items: Vec<Value>) -> Vec<Value> {
    let first_is_chunk = matches!(items.first(), Some(Value::Record(b)) if b.is_data_chunk());
    if !first_is_chunk {
        return items;
    }
    let mut flat = Vec::new();
    for item in items {
        match item {
            Value::Record(b) if b.is_data_chunk() => {
                flat.extend(b.into_chunk_data().unwrap_or_default());
            }
            other => flat.push(other),
        }
    }
    flat
}
