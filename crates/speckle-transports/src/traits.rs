use std::collections::HashMap;

use speckle_types::ObjectId;

use crate::error::{TransportError, TransportResult};

/// Content-addressed persistence backend for serialized records.
///
/// All implementations must satisfy these invariants:
/// - `save` is idempotent: saving an id that is already present is a no-op.
///   The codec never saves two different payloads under one id.
/// - Records are opaque JSON strings; the transport never interprets them,
///   except where an operation is defined in terms of a record's `__closure`.
/// - Errors are surfaced synchronously, never silently ignored.
/// - Writes happen between `begin_write` and `end_write`; a transport may
///   buffer saves until `end_write`, but `get` must see buffered records.
pub trait Transport: Send + Sync {
    /// Human-readable transport name, used in diagnostics.
    fn name(&self) -> &str;

    /// Start a write session and reset the write-side counters.
    fn begin_write(&self) -> TransportResult<()>;

    /// Finish a write session, flushing anything buffered.
    fn end_write(&self) -> TransportResult<()>;

    /// Persist one serialized record under its fingerprint.
    fn save(&self, id: &ObjectId, serialized: &str) -> TransportResult<()>;

    /// Read one serialized record.
    ///
    /// Returns `Ok(None)` if the record does not exist.
    fn get(&self, id: &ObjectId) -> TransportResult<Option<String>>;

    /// Number of `save` calls since the last `begin_write`.
    fn saved_count(&self) -> usize;

    /// Copy one record from another transport into this one.
    fn save_from_transport(&self, id: &ObjectId, source: &dyn Transport) -> TransportResult<()> {
        let serialized = source.get(id)?.ok_or(TransportError::NotFound(*id))?;
        self.save(id, &serialized)
    }

    /// Bulk presence check.
    ///
    /// Default implementation calls `get()` for each id. Backends may
    /// override for better performance (e.g., a single round-trip).
    fn has(&self, ids: &[ObjectId]) -> TransportResult<HashMap<ObjectId, bool>> {
        ids.iter()
            .map(|id| Ok((*id, self.get(id)?.is_some())))
            .collect()
    }

    /// Copy a record and its whole closure into `target`, returning the
    /// record's serialized JSON.
    fn copy_object_and_children(
        &self,
        id: &ObjectId,
        target: &dyn Transport,
    ) -> TransportResult<String> {
        let _ = (id, target);
        Err(TransportError::Unsupported {
            transport: self.name().to_string(),
            operation: "copy_object_and_children",
        })
    }
}

/// Read the `__closure` ids a serialized record declares.
pub fn closure_ids(serialized: &str) -> TransportResult<Vec<ObjectId>> {
    let value: serde_json::Value = serde_json::from_str(serialized)
        .map_err(|e| TransportError::Protocol(format!("invalid record JSON: {e}")))?;
    let Some(closure) = value.get("__closure").and_then(|c| c.as_object()) else {
        return Ok(Vec::new());
    };
    closure
        .keys()
        .map(|key| {
            ObjectId::from_hex(key)
                .map_err(|e| TransportError::Protocol(format!("invalid closure id {key:?}: {e}")))
        })
        .collect()
}

/// Copy a record and its closure between two transports by reading the
/// record's `__closure` table. Used by transports that can enumerate a
/// record's descendants locally.
pub fn copy_closure(
    source: &dyn Transport,
    id: &ObjectId,
    target: &dyn Transport,
) -> TransportResult<String> {
    let root = source.get(id)?.ok_or(TransportError::NotFound(*id))?;
    let children = closure_ids(&root)?;
    let present = target.has(&children)?;

    target.begin_write()?;
    for child in &children {
        if present.get(child).copied().unwrap_or(false) {
            continue;
        }
        target.save_from_transport(child, source)?;
    }
    target.save(id, &root)?;
    target.end_write()?;

    tracing::debug!(
        root = %id.short_hex(),
        children = children.len(),
        from = source.name(),
        to = target.name(),
        "copied object closure"
    );
    Ok(root)
}
