//! The `speckle_type` registry.
//!
//! Maps a fully qualified `speckle_type` to its [`TypeDescriptor`]. Types are
//! registered once, at definition time, and looked up on every read. Lookups
//! that miss fall back to the nearest registered ancestor by stripping the
//! rightmost `:`-delimited segment, and ultimately to the root `Base` type.
//!
//! A process-wide instance is available through [`TypeRegistry::global`].
//! Independent registries can be created for isolated readers.

use std::collections::HashMap;
use std::sync::{Arc, LazyLock};

use parking_lot::RwLock;
use tracing::debug;

use crate::base::Base;
use crate::descriptor::{TypeBuilder, TypeDescriptor};
use crate::error::{RegistryError, RegistryResult};

static GLOBAL: LazyLock<TypeRegistry> = LazyLock::new(TypeRegistry::new);

/// Outcome of resolving a `speckle_type`.
#[derive(Clone, Debug)]
pub struct Resolved {
    pub descriptor: Arc<TypeDescriptor>,
    /// `true` when the full `speckle_type` was registered.
    pub exact: bool,
}

impl Resolved {
    /// Instantiate an empty record, stamped with the requested
    /// `speckle_type` so unknown subtypes keep their discriminator.
    pub fn instantiate(&self, speckle_type: &str) -> Base {
        Base::stamped(Arc::clone(&self.descriptor), speckle_type.to_string())
    }
}

/// Read-mostly map from `speckle_type` to descriptor.
pub struct TypeRegistry {
    types: RwLock<HashMap<String, Arc<TypeDescriptor>>>,
}

impl TypeRegistry {
    /// Create a registry holding only the built-in types (`Base`, `DataChunk`).
    pub fn new() -> Self {
        let mut types = HashMap::new();
        for desc in [TypeDescriptor::base(), TypeDescriptor::data_chunk()] {
            types.insert(desc.speckle_type().to_string(), desc);
        }
        Self {
            types: RwLock::new(types),
        }
    }

    /// The process-wide registry.
    pub fn global() -> &'static TypeRegistry {
        &GLOBAL
    }

    /// Register a descriptor. Redefinition is an error.
    pub fn register(&self, descriptor: TypeDescriptor) -> RegistryResult<Arc<TypeDescriptor>> {
        let mut types = self.types.write();
        let key = descriptor.speckle_type().to_string();
        if types.contains_key(&key) {
            return Err(RegistryError::AlreadyRegistered(key));
        }
        let descriptor = Arc::new(descriptor);
        debug!(speckle_type = %key, "registered type");
        types.insert(key, Arc::clone(&descriptor));
        Ok(descriptor)
    }

    /// Build and register a type.
    pub fn define(&self, builder: TypeBuilder) -> RegistryResult<Arc<TypeDescriptor>> {
        self.register(builder.build()?)
    }

    /// Exact lookup.
    pub fn get(&self, speckle_type: &str) -> Option<Arc<TypeDescriptor>> {
        self.types.read().get(speckle_type).cloned()
    }

    pub fn contains(&self, speckle_type: &str) -> bool {
        self.types.read().contains_key(speckle_type)
    }

    /// Lookup with ancestor fallback.
    ///
    /// Tries the full `speckle_type`, then strips the rightmost segment and
    /// retries, ending at the root `Base` type when nothing matches.
    pub fn resolve(&self, speckle_type: &str) -> Resolved {
        let types = self.types.read();
        if let Some(descriptor) = types.get(speckle_type) {
            return Resolved {
                descriptor: Arc::clone(descriptor),
                exact: true,
            };
        }
        let mut candidate = speckle_type;
        while let Some((ancestor, _)) = candidate.rsplit_once(':') {
            if let Some(descriptor) = types.get(ancestor) {
                return Resolved {
                    descriptor: Arc::clone(descriptor),
                    exact: false,
                };
            }
            candidate = ancestor;
        }
        Resolved {
            descriptor: TypeDescriptor::base(),
            exact: false,
        }
    }

    /// All registered `speckle_type`s, sorted.
    pub fn registered_types(&self) -> Vec<String> {
        let mut names: Vec<String> = self.types.read().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.types.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.read().is_empty()
    }
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for TypeRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypeRegistry")
            .field("type_count", &self.len())
            .finish()
    }
}
