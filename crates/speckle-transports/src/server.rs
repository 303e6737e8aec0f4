//! Remote Speckle server transport.
//!
//! Speaks the server's object API over HTTP:
//!
//! - `POST {url}/objects/{stream}`: multipart upload; each part is a JSON
//!   array of serialized records.
//! - `GET {url}/objects/{stream}/{id}`: the record and its closure, one
//!   `id\tjson` line per record, root first.
//! - `GET {url}/objects/{stream}/{id}/single`: just the record.
//! - `POST {url}/api/diff/{stream}`: form field `objects` holding a JSON list
//!   of ids; answers a JSON map of id to presence.
//!
//! Saves are buffered and uploaded in batches. Transient failures are
//! retried with exponential backoff.

use std::collections::HashMap;
use std::io::{BufRead, BufReader};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use reqwest::blocking::multipart::{Form, Part};
use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use reqwest::StatusCode;
use speckle_types::ObjectId;
use tracing::{debug, info, warn};

use crate::config::ServerTransportConfig;
use crate::error::{TransportError, TransportResult};
use crate::traits::Transport;

/// Statuses worth retrying.
const RETRYABLE: [u16; 7] = [408, 429, 500, 502, 503, 504, 520];

#[derive(Default)]
struct Batch {
    objects: Vec<(ObjectId, String)>,
    bytes: usize,
}

/// Transport backed by a Speckle server stream.
pub struct ServerTransport {
    name: String,
    config: ServerTransportConfig,
    client: Client,
    batch: Mutex<Batch>,
    saved: AtomicUsize,
}

impl ServerTransport {
    pub fn new(config: ServerTransportConfig) -> TransportResult<Self> {
        config.validate()?;

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("text/plain"));
        if let Some(token) = &config.token {
            let mut value = HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|e| TransportError::Config(format!("invalid token: {e}")))?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }
        let client = Client::builder()
            .default_headers(headers)
            .timeout(config.timeout())
            .build()?;

        info!(url = %config.base_url(), stream = %config.stream_id, "created server transport");
        Ok(Self {
            name: "Server".to_string(),
            config,
            client,
            batch: Mutex::new(Batch::default()),
            saved: AtomicUsize::new(0),
        })
    }

    pub fn config(&self) -> &ServerTransportConfig {
        &self.config
    }

    /// Records buffered but not yet uploaded.
    pub fn pending_count(&self) -> usize {
        self.batch.lock().objects.len()
    }

    pub fn stream_id(&self) -> &str {
        &self.config.stream_id
    }

    /// Upload everything buffered.
    pub fn flush(&self) -> TransportResult<()> {
        let batch = std::mem::take(&mut *self.batch.lock());
        if batch.objects.is_empty() {
            return Ok(());
        }

        let mut objects = batch.objects;
        if self.config.check_existing {
            let ids: Vec<ObjectId> = objects.iter().map(|(id, _)| *id).collect();
            let present = self.has(&ids)?;
            objects.retain(|(id, _)| !present.get(id).copied().unwrap_or(false));
            if objects.is_empty() {
                debug!(count = ids.len(), "server already holds every object in batch");
                return Ok(());
            }
        }
        self.upload(&objects)
    }

    fn objects_url(&self) -> String {
        format!("{}/objects/{}", self.config.base_url(), self.config.stream_id)
    }

    fn diff_url(&self) -> String {
        format!("{}/api/diff/{}", self.config.base_url(), self.config.stream_id)
    }

    fn upload(&self, objects: &[(ObjectId, String)]) -> TransportResult<()> {
        let mut body = String::with_capacity(objects.iter().map(|(_, s)| s.len() + 1).sum::<usize>() + 2);
        body.push('[');
        for (i, (_, serialized)) in objects.iter().enumerate() {
            if i > 0 {
                body.push(',');
            }
            body.push_str(serialized);
        }
        body.push(']');

        let url = self.objects_url();
        self.execute("upload", || {
            let part = Part::text(body.clone())
                .file_name("batch-1")
                .mime_str("application/json")?;
            Ok(self.client.post(&url).multipart(Form::new().part("batch-1", part)))
        })?;
        info!(count = objects.len(), bytes = body.len(), "uploaded batch to server");
        Ok(())
    }

    /// Send a request, retrying transient failures with exponential backoff.
    fn execute<F>(&self, operation: &'static str, mut build: F) -> TransportResult<Response>
    where
        F: FnMut() -> TransportResult<RequestBuilder>,
    {
        let mut attempt = 0u32;
        loop {
            let outcome = build()?.send();
            let retryable = match &outcome {
                Ok(response) => RETRYABLE.contains(&response.status().as_u16()),
                Err(err) => err.is_timeout() || err.is_connect(),
            };
            if retryable && attempt < self.config.max_retries {
                let delay = self.backoff(attempt);
                warn!(
                    operation,
                    attempt = attempt + 1,
                    delay_ms = delay.as_millis() as u64,
                    "retrying server request"
                );
                std::thread::sleep(delay);
                attempt += 1;
                continue;
            }
            return check_status(outcome?);
        }
    }

    fn backoff(&self, attempt: u32) -> Duration {
        let factor = 1u64 << attempt.min(16);
        let ms = self.config.initial_backoff_ms.saturating_mul(factor);
        Duration::from_millis(ms.min(self.config.max_backoff_ms))
    }
}

fn check_status(response: Response) -> TransportResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let url = response.url().to_string();
    let body = response.text().unwrap_or_default();
    Err(TransportError::Status {
        status: status.as_u16(),
        url,
        body,
    })
}

impl Transport for ServerTransport {
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
        let full = {
            let mut batch = self.batch.lock();
            if batch.objects.iter().any(|(pending, _)| pending == id) {
                return Ok(());
            }
            batch.bytes += serialized.len();
            batch.objects.push((*id, serialized.to_string()));
            batch.bytes >= self.config.max_batch_bytes()
                || batch.objects.len() >= self.config.max_batch_objects
        };
        if full {
            self.flush()?;
        }
        Ok(())
    }

    fn get(&self, id: &ObjectId) -> TransportResult<Option<String>> {
        if let Some((_, pending)) = self.batch.lock().objects.iter().find(|(p, _)| p == id) {
            return Ok(Some(pending.clone()));
        }
        let url = format!("{}/{}/single", self.objects_url(), id.to_hex());
        match self.execute("get", || Ok(self.client.get(&url))) {
            Ok(response) => Ok(Some(response.text()?)),
            Err(TransportError::Status { status, .. }) if status == StatusCode::NOT_FOUND.as_u16() => {
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }

    fn saved_count(&self) -> usize {
        self.saved.load(Ordering::Relaxed)
    }

    fn has(&self, ids: &[ObjectId]) -> TransportResult<HashMap<ObjectId, bool>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let hexes: Vec<String> = ids.iter().map(ObjectId::to_hex).collect();
        let objects = serde_json::to_string(&hexes)
            .map_err(|e| TransportError::Protocol(format!("cannot encode id list: {e}")))?;
        let url = self.diff_url();
        let response = self.execute("diff", || {
            Ok(self.client.post(&url).form(&[("objects", objects.as_str())]))
        })?;
        let text = response.text()?;
        let answer: HashMap<String, bool> = serde_json::from_str(&text)
            .map_err(|e| TransportError::Protocol(format!("invalid diff response: {e}")))?;
        Ok(ids
            .iter()
            .zip(&hexes)
            .map(|(id, hex)| (*id, answer.get(hex).copied().unwrap_or(false)))
            .collect())
    }

    fn copy_object_and_children(
        &self,
        id: &ObjectId,
        target: &dyn Transport,
    ) -> TransportResult<String> {
        let url = format!("{}/{}", self.objects_url(), id.to_hex());
        let response = self.execute("download", || Ok(self.client.get(&url)))?;

        target.begin_write()?;
        let mut root = None;
        let mut count = 0usize;
        for line in BufReader::new(response).lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let (hash, serialized) = line
                .split_once('\t')
                .ok_or_else(|| TransportError::Protocol("object line without a tab separator".into()))?;
            let object_id = ObjectId::from_hex(hash)
                .map_err(|e| TransportError::Protocol(format!("invalid object id {hash:?}: {e}")))?;
            target.save(&object_id, serialized)?;
            if object_id == *id {
                root = Some(serialized.to_string());
            }
            count += 1;
        }
        target.end_write()?;

        debug!(root = %id.short_hex(), count, target = target.name(), "downloaded object closure");
        root.ok_or(TransportError::NotFound(*id))
    }
}

impl std::fmt::Debug for ServerTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerTransport")
            .field("url", &self.config.base_url())
            .field("stream_id", &self.config.stream_id)
            .finish()
    }
}
