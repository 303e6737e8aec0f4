use speckle_objects::Base;
use speckle_transports::{MemoryTransport, ServerTransport, SqliteTransport, Transport};
use speckle_types::ObjectId;

use crate::config::SdkConfig;
use crate::error::{SdkError, SdkResult};
use crate::operations;

/// High-level Speckle API bound to a configured cache and server.
pub struct SpeckleClient {
    cache: Option<SqliteTransport>,
    server: Option<ServerTransport>,
}

impl SpeckleClient {
    /// Open the transports described by `config`.
    pub fn from_config(config: &SdkConfig) -> SdkResult<Self> {
        config.validate()?;
        let cache = if config.use_default_cache {
            Some(SqliteTransport::open(&config.local)?)
        } else {
            None
        };
        let server = match &config.server {
            Some(server) => Some(ServerTransport::new(server.clone())?),
            None => None,
        };
        if cache.is_none() && server.is_none() {
            return Err(SdkError::MissingTransport(
                "configuration enables neither the local cache nor a server".into(),
            ));
        }
        Ok(Self { cache, server })
    }

    pub fn cache(&self) -> Option<&SqliteTransport> {
        self.cache.as_ref()
    }

    pub fn server(&self) -> Option<&ServerTransport> {
        self.server.as_ref()
    }

    /// Send `root` to the cache and the server.
    pub fn send(&self, root: &Base) -> SdkResult<ObjectId> {
        let remote: Vec<&dyn Transport> = self
            .server
            .iter()
            .map(|s| s as &dyn Transport)
            .collect();
        operations::send_with_cache(root, &remote, self.cache_transport())
    }

    /// Receive `id`, from the cache if present, else from the server.
    ///
    /// Without a cache, records copied from the server are held in memory
    /// for the duration of the call.
    pub fn receive(&self, id: &ObjectId) -> SdkResult<Base> {
        let remote = self.server.as_ref().map(|s| s as &dyn Transport);
        match self.cache_transport() {
            Some(cache) => operations::receive_into(id, remote, cache),
            None => operations::receive_into(id, remote, &MemoryTransport::new()),
        }
    }

    /// The id `send` would assign to `base`, without writing anything.
    pub fn object_id(&self, base: &Base) -> SdkResult<ObjectId> {
        operations::object_id(base, true)
    }

    fn cache_transport(&self) -> Option<&dyn Transport> {
        self.cache.as_ref().map(|c| c as &dyn Transport)
    }
}

impl std::fmt::Debug for SpeckleClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpeckleClient")
            .field("cache", &self.cache)
            .field("server", &self.server)
            .finish()
    }
}
