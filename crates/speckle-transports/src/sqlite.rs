//! Local SQLite cache.
//!
//! One table, `objects(id TEXT PRIMARY KEY, content TEXT) WITHOUT ROWID`, in
//! a WAL-mode database under the per-user application-data directory. Writes
//! are buffered and flushed in a single transaction once the buffer passes
//! the configured size, and at `end_write`.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use directories::BaseDirs;
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use speckle_types::ObjectId;
use tracing::{debug, info};

use crate::config::LocalTransportConfig;
use crate::error::{TransportError, TransportResult};
use crate::traits::{copy_closure, Transport};

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS objects (
    id      TEXT PRIMARY KEY,
    content TEXT
) WITHOUT ROWID;";

struct State {
    conn: Connection,
    pending: Vec<(ObjectId, String)>,
    pending_bytes: usize,
}

/// Transport backed by a local SQLite database.
pub struct SqliteTransport {
    name: String,
    path: PathBuf,
    max_batch_bytes: usize,
    state: Mutex<State>,
    saved: AtomicUsize,
}

impl SqliteTransport {
    /// Open (or create) the database described by `config`.
    pub fn open(config: &LocalTransportConfig) -> TransportResult<Self> {
        let dir = match &config.base_path {
            Some(dir) => dir.clone(),
            None => default_base_path(&config.app_name)?,
        };
        std::fs::create_dir_all(&dir)?;
        let path = dir.join(format!("{}.db", config.scope));
        Self::open_file(&path, config.max_batch_bytes())
    }

    /// Open the default cache: `<app data>/Speckle/Objects.db`.
    pub fn open_default() -> TransportResult<Self> {
        Self::open(&LocalTransportConfig::default())
    }

    /// Open a database at an explicit file path.
    pub fn open_file(path: &Path, max_batch_bytes: usize) -> TransportResult<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA temp_store = MEMORY;",
        )?;
        conn.execute_batch(SCHEMA)?;
        info!(path = %path.display(), "opened sqlite transport");
        Ok(Self {
            name: "SQLite".to_string(),
            path: path.to_path_buf(),
            max_batch_bytes,
            state: Mutex::new(State {
                conn,
                pending: Vec::new(),
                pending_bytes: 0,
            }),
            saved: AtomicUsize::new(0),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of writes buffered but not yet committed.
    pub fn pending_count(&self) -> usize {
        self.state.lock().pending.len()
    }

    /// Commit buffered writes.
    pub fn flush(&self) -> TransportResult<()> {
        let mut state = self.state.lock();
        Self::flush_locked(&mut state)
    }

    /// Every stored record's JSON, in id order.
    pub fn get_all_objects(&self) -> TransportResult<Vec<String>> {
        let mut state = self.state.lock();
        Self::flush_locked(&mut state)?;
        let mut stmt = state
            .conn
            .prepare("SELECT content FROM objects ORDER BY id")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    /// Number of committed records.
    pub fn object_count(&self) -> TransportResult<usize> {
        let state = self.state.lock();
        let count: i64 = state
            .conn
            .query_row("SELECT COUNT(*) FROM objects", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    fn flush_locked(state: &mut State) -> TransportResult<()> {
        if state.pending.is_empty() {
            return Ok(());
        }
        let State { conn, pending, .. } = state;
        let tx = conn.transaction()?;
        {
            let mut stmt =
                tx.prepare_cached("INSERT OR IGNORE INTO objects (id, content) VALUES (?1, ?2)")?;
            for (id, content) in pending.iter() {
                stmt.execute(params![id.to_hex(), content])?;
            }
        }
        tx.commit()?;
        debug!(count = state.pending.len(), bytes = state.pending_bytes, "flushed sqlite batch");
        state.pending.clear();
        state.pending_bytes = 0;
        Ok(())
    }
}

/// Per-user application-data directory for `app_name`.
///
/// `%APPDATA%` on Windows, `~/.config` on macOS, and `$XDG_CONFIG_HOME`
/// (falling back to `~/.config`) elsewhere.
pub fn default_base_path(app_name: &str) -> TransportResult<PathBuf> {
    let dirs = BaseDirs::new()
        .ok_or_else(|| TransportError::Config("cannot resolve the user home directory".into()))?;
    let root = if cfg!(target_os = "macos") {
        dirs.home_dir().join(".config")
    } else {
        dirs.config_dir().to_path_buf()
    };
    Ok(root.join(app_name))
}

impl Transport for SqliteTransport {
    fn name(&self) -> &str {
        &self.name
    }

    fn begin_write(&self) -> TransportResult<()> {
        self.saved.store(0, Ordering::Relaxed);
        Ok(())
    }

    fn end_write(&self) -> TransportResult<()> {
        self.flush()
    }

    fn save(&self, id: &ObjectId, serialized: &str) -> TransportResult<()> {
        self.saved.fetch_add(1, Ordering::Relaxed);
        let mut state = self.state.lock();
        state.pending_bytes += serialized.len();
        state.pending.push((*id, serialized.to_string()));
        if state.pending_bytes >= self.max_batch_bytes {
            Self::flush_locked(&mut state)?;
        }
        Ok(())
    }

    fn get(&self, id: &ObjectId) -> TransportResult<Option<String>> {
        let state = self.state.lock();
        if let Some((_, content)) = state.pending.iter().find(|(pending, _)| pending == id) {
            return Ok(Some(content.clone()));
        }
        let content = state
            .conn
            .query_row(
                "SELECT content FROM objects WHERE id = ?1 LIMIT 1",
                params![id.to_hex()],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(content)
    }

    fn saved_count(&self) -> usize {
        self.saved.load(Ordering::Relaxed)
    }

    fn copy_object_and_children(
        &self,
        id: &ObjectId,
        target: &dyn Transport,
    ) -> TransportResult<String> {
        copy_closure(self, id, target)
    }
}

impl std::fmt::Debug for SqliteTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteTransport")
            .field("path", &self.path)
            .field("max_batch_bytes", &self.max_batch_bytes)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryTransport;

    fn id(byte: u8) -> ObjectId {
        ObjectId::from_digest([byte; 16])
    }

    fn open(dir: &tempfile::TempDir, max_batch_bytes: usize) -> SqliteTransport {
        SqliteTransport::open_file(&dir.path().join("test.db"), max_batch_bytes).unwrap()
    }

    #[test]
    fn open_from_config_uses_scope_file_name() {
        let dir = tempfile::tempdir().unwrap();
        let config = LocalTransportConfig {
            base_path: Some(dir.path().join("nested")),
            scope: "Cache".into(),
            ..Default::default()
        };
        let transport = SqliteTransport::open(&config).unwrap();
        assert_eq!(transport.path(), dir.path().join("nested").join("Cache.db"));
        assert!(transport.path().exists());
    }

    #[test]
    fn buffered_writes_are_visible_before_flush() {
        let dir = tempfile::tempdir().unwrap();
        let transport = open(&dir, usize::MAX);
        transport.begin_write().unwrap();
        transport.save(&id(1), r#"{"id":"one"}"#).unwrap();
        assert_eq!(transport.pending_count(), 1);
        assert_eq!(transport.object_count().unwrap(), 0);
        assert_eq!(
            transport.get(&id(1)).unwrap().as_deref(),
            Some(r#"{"id":"one"}"#)
        );
        transport.end_write().unwrap();
        assert_eq!(transport.pending_count(), 0);
        assert_eq!(transport.object_count().unwrap(), 1);
    }

    #[test]
    fn batch_flushes_when_size_exceeded() {
        let dir = tempfile::tempdir().unwrap();
        let transport = open(&dir, 8);
        transport.save(&id(1), "0123456789").unwrap();
        assert_eq!(transport.pending_count(), 0);
        assert_eq!(transport.object_count().unwrap(), 1);
    }

    #[test]
    fn save_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let transport = open(&dir, 0);
        transport.save(&id(1), "same").unwrap();
        transport.save(&id(1), "same").unwrap();
        assert_eq!(transport.object_count().unwrap(), 1);
        assert_eq!(transport.saved_count(), 2);
    }

    #[test]
    fn records_persist_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let transport = open(&dir, usize::MAX);
            transport.save(&id(4), "persisted").unwrap();
            transport.end_write().unwrap();
        }
        let reopened = open(&dir, usize::MAX);
        assert_eq!(reopened.get(&id(4)).unwrap().as_deref(), Some("persisted"));
        assert!(reopened.get(&id(5)).unwrap().is_none());
    }

    #[test]
    fn has_and_get_all_objects() {
        let dir = tempfile::tempdir().unwrap();
        let transport = open(&dir, usize::MAX);
        transport.save(&id(2), "b").unwrap();
        transport.save(&id(1), "a").unwrap();
        let found = transport.has(&[id(1), id(3)]).unwrap();
        assert!(found[&id(1)]);
        assert!(!found[&id(3)]);
        assert_eq!(transport.get_all_objects().unwrap(), vec!["a", "b"]);
    }

    #[test]
    fn copies_closure_to_another_transport() {
        let dir = tempfile::tempdir().unwrap();
        let transport = open(&dir, usize::MAX);
        let child = id(2);
        let root = format!(r#"{{"id":"{}","__closure":{{"{}":1}}}}"#, id(1), child);
        transport.save(&child, r#"{"id":"child"}"#).unwrap();
        transport.save(&id(1), &root).unwrap();

        let target = MemoryTransport::new();
        let copied = transport.copy_object_and_children(&id(1), &target).unwrap();
        assert_eq!(copied, root);
        assert_eq!(target.len(), 2);
        assert!(target.get(&child).unwrap().is_some());
    }

    #[test]
    fn default_base_path_ends_with_app_name() {
        if let Ok(path) = default_base_path("Speckle") {
            assert!(path.ends_with("Speckle"));
        }
    }
}
