use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::RwLock;
use speckle_types::ObjectId;

use crate::error::TransportResult;
use crate::traits::Transport;

/// In-memory, HashMap-based transport.
///
/// Intended for tests, fingerprinting and embedding. All records are held in
/// memory behind a `RwLock` for safe concurrent access. `save` and `get` are
/// O(1); `copy_object_and_children` is not supported.
pub struct MemoryTransport {
    name: String,
    objects: RwLock<HashMap<ObjectId, String>>,
    saved: AtomicUsize,
}

impl MemoryTransport {
    /// Create a new empty memory transport.
    pub fn new() -> Self {
        Self::with_name("Memory")
    }

    /// Create a new empty memory transport with a custom name.
    pub fn with_name(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            objects: RwLock::new(HashMap::new()),
            saved: AtomicUsize::new(0),
        }
    }

    /// Number of records currently stored.
    pub fn len(&self) -> usize {
        self.objects.read().len()
    }

    /// Returns `true` if the transport is empty.
    pub fn is_empty(&self) -> bool {
        self.objects.read().is_empty()
    }

    /// Remove all records.
    pub fn clear(&self) {
        self.objects.write().clear();
    }

    /// Return a sorted list of all stored ids.
    pub fn ids(&self) -> Vec<ObjectId> {
        let mut ids: Vec<ObjectId> = self.objects.read().keys().copied().collect();
        ids.sort();
        ids
    }

    /// Snapshot of every stored record.
    pub fn objects(&self) -> HashMap<ObjectId, String> {
        self.objects.read().clone()
    }
}

impl Default for MemoryTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for MemoryTransport {
    fn name(&self) -> &str {
        &self.name
    }

    fn begin_write(&self) -> TransportResult<()> {
        self.saved.store(0, Ordering::Relaxed);
        Ok(())
    }

    fn end_write(&self) -> TransportResult<()> {
        Ok(())
    }

    fn save(&self, id: &ObjectId, serialized: &str) -> TransportResult<()> {
        self.saved.fetch_add(1, Ordering::Relaxed);
        // Idempotent: an id always maps to the same content.
        self.objects
            .write()
            .entry(*id)
            .or_insert_with(|| serialized.to_string());
        Ok(())
    }

    fn get(&self, id: &ObjectId) -> TransportResult<Option<String>> {
        Ok(self.objects.read().get(id).cloned())
    }

    fn saved_count(&self) -> usize {
        self.saved.load(Ordering::Relaxed)
    }

    fn has(&self, ids: &[ObjectId]) -> TransportResult<HashMap<ObjectId, bool>> {
        let map = self.objects.read();
        Ok(ids.iter().map(|id| (*id, map.contains_key(id))).collect())
    }
}

impl std::fmt::Debug for MemoryTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryTransport")
            .field("name", &self.name)
            .field("object_count", &self.len())
            .finish()
    }
}
