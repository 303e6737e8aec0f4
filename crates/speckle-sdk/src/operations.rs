//! Send, receive, serialize and deserialize record graphs.

use speckle_objects::Base;
use speckle_serialization::{Deserializer, Serializer};
use speckle_transports::{MemoryTransport, SqliteTransport, Transport};
use speckle_types::ObjectId;
use tracing::{debug, info};

use crate::error::{SdkError, SdkResult};

/// Serialize `root` into every transport, returning its id.
///
/// With `use_default_cache`, the local SQLite cache is opened and written
/// first. Sending with no transports and no cache is an error and writes
/// nothing.
pub fn send(
    root: &Base,
    transports: &[&dyn Transport],
    use_default_cache: bool,
) -> SdkResult<ObjectId> {
    if transports.is_empty() && !use_default_cache {
        return Err(no_write_transport());
    }
    let cache = if use_default_cache {
        Some(SqliteTransport::open_default()?)
    } else {
        None
    };
    send_with_cache(root, transports, cache.as_ref().map(|c| c as &dyn Transport))
}

/// [`send`] with an explicit cache transport in place of the default one.
pub fn send_with_cache<'a>(
    root: &Base,
    transports: &[&'a dyn Transport],
    cache: Option<&'a dyn Transport>,
) -> SdkResult<ObjectId> {
    let mut writers: Vec<&'a dyn Transport> = Vec::with_capacity(transports.len() + 1);
    writers.extend(cache);
    writers.extend_from_slice(transports);
    if writers.is_empty() {
        return Err(no_write_transport());
    }

    let names: Vec<&str> = writers.iter().map(|t| t.name()).collect();
    let (id, _) = Serializer::new(writers.clone()).write_json(root)?;
    info!(id = %id, transports = ?names, "sent object");
    Ok(id)
}

fn no_write_transport() -> SdkError {
    SdkError::MissingTransport(
        "cannot send with an empty transport list and no default cache".into(),
    )
}

/// Receive the record `id`.
///
/// Looks in `local` first (the default SQLite cache when `None`). On a miss
/// the record and its closure are copied from `remote` into `local` before
/// recomposing.
pub fn receive(
    id: &ObjectId,
    remote: Option<&dyn Transport>,
    local: Option<&dyn Transport>,
) -> SdkResult<Base> {
    match local {
        Some(local) => receive_into(id, remote, local),
        None => {
            let cache = SqliteTransport::open_default()?;
            receive_into(id, remote, &cache)
        }
    }
}

/// [`receive`] with an explicit local transport.
pub fn receive_into(
    id: &ObjectId,
    remote: Option<&dyn Transport>,
    local: &dyn Transport,
) -> SdkResult<Base> {
    let json = match local.get(id)? {
        Some(json) => {
            debug!(id = %id, transport = local.name(), "found object locally");
            json
        }
        None => {
            let remote = remote.ok_or_else(|| {
                SdkError::ObjectNotFound(format!(
                    "{id} is not in {} and no remote transport was given",
                    local.name()
                ))
            })?;
            info!(id = %id, from = remote.name(), to = local.name(), "copying object from remote");
            remote.copy_object_and_children(id, local)?
        }
    };
    Ok(Deserializer::new(Some(local)).read_json(&json)?)
}

/// Serialize `root` to a JSON string, writing detached records to
/// `transports`. With no transports every child is inlined.
pub fn serialize(root: &Base, transports: &[&dyn Transport]) -> SdkResult<String> {
    let (_, json) = Serializer::new(transports.to_vec()).write_json(root)?;
    Ok(json)
}

/// Recompose a record from JSON, resolving references through
/// `read_transport`.
pub fn deserialize(json: &str, read_transport: Option<&dyn Transport>) -> SdkResult<Base> {
    Ok(Deserializer::new(read_transport).read_json(json)?)
}

/// The fingerprint of `base`.
///
/// With `decompose`, the record is serialized against a scratch in-memory
/// transport, so detached parts become references and the id matches what
/// [`send`] returns. Otherwise every child is inlined.
pub fn object_id(base: &Base, decompose: bool) -> SdkResult<ObjectId> {
    let scratch = MemoryTransport::with_name("scratch");
    let mut serializer = if decompose {
        Serializer::new(vec![&scratch])
    } else {
        Serializer::without_transports()
    };
    let (id, _) = serializer.traverse_root(base)?;
    Ok(id)
}
