use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{TransportError, TransportResult};

/// Settings for the local SQLite cache.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalTransportConfig {
    /// Directory holding the database. `None` means the per-user
    /// application-data directory for `app_name`.
    pub base_path: Option<PathBuf>,
    pub app_name: String,
    /// Database file stem; the file is `<scope>.db`.
    pub scope: String,
    /// Pending writes are flushed once they exceed this many megabytes.
    pub max_batch_size_mb: f64,
}

impl Default for LocalTransportConfig {
    fn default() -> Self {
        Self {
            base_path: None,
            app_name: "Speckle".to_string(),
            scope: "Objects".to_string(),
            max_batch_size_mb: 10.0,
        }
    }
}

impl LocalTransportConfig {
    pub fn max_batch_bytes(&self) -> usize {
        mb_to_bytes(self.max_batch_size_mb)
    }
}

/// Settings for the remote server transport.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerTransportConfig {
    /// Server root, e.g. `https://app.speckle.systems`.
    pub url: String,
    pub stream_id: String,
    /// Bearer token. Anonymous when absent.
    pub token: Option<String>,
    pub timeout_secs: u64,
    /// Retries for transient failures (timeouts, 408, 429, 5xx gateway errors).
    pub max_retries: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
    pub max_batch_size_mb: f64,
    pub max_batch_objects: usize,
    /// Ask the server which ids it already holds before uploading a batch.
    pub check_existing: bool,
}

impl Default for ServerTransportConfig {
    fn default() -> Self {
        Self {
            url: "https://app.speckle.systems".to_string(),
            stream_id: String::new(),
            token: None,
            timeout_secs: 30,
            max_retries: 3,
            initial_backoff_ms: 200,
            max_backoff_ms: 5_000,
            max_batch_size_mb: 1.0,
            max_batch_objects: 5_000,
            check_existing: true,
        }
    }
}

impl ServerTransportConfig {
    pub fn new(url: impl Into<String>, stream_id: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            stream_id: stream_id.into(),
            ..Self::default()
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn validate(&self) -> TransportResult<()> {
        if self.url.trim().is_empty() {
            return Err(TransportError::Config("server url is empty".into()));
        }
        if !(self.url.starts_with("http://") || self.url.starts_with("https://")) {
            return Err(TransportError::Config(format!(
                "server url must be http(s): {}",
                self.url
            )));
        }
        if self.stream_id.trim().is_empty() {
            return Err(TransportError::Config("stream id is empty".into()));
        }
        if self.max_batch_objects == 0 {
            return Err(TransportError::Config(
                "max_batch_objects must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// Server root without a trailing slash.
    pub fn base_url(&self) -> &str {
        self.url.trim_end_matches('/')
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn max_batch_bytes(&self) -> usize {
        mb_to_bytes(self.max_batch_size_mb)
    }
}

fn mb_to_bytes(mb: f64) -> usize {
    if mb.is_finite() && mb > 0.0 {
        (mb * 1024.0 * 1024.0) as usize
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_defaults() {
        let c = LocalTransportConfig::default();
        assert_eq!(c.app_name, "Speckle");
        assert_eq!(c.scope, "Objects");
        assert_eq!(c.max_batch_bytes(), 10 * 1024 * 1024);
        assert!(c.base_path.is_none());
    }

    #[test]
    fn server_defaults_and_builder() {
        let c = ServerTransportConfig::new("http://localhost:3000/", "abc123").with_token("t0k");
        assert_eq!(c.base_url(), "http://localhost:3000");
        assert_eq!(c.token.as_deref(), Some("t0k"));
        assert_eq!(c.timeout(), Duration::from_secs(30));
        assert_eq!(c.max_batch_bytes(), 1024 * 1024);
        c.validate().unwrap();
    }

    #[test]
    fn validation_rejects_bad_settings() {
        assert!(ServerTransportConfig::new("", "s").validate().is_err());
        assert!(ServerTransportConfig::new("ftp://x", "s").validate().is_err());
        assert!(ServerTransportConfig::new("http://x", " ").validate().is_err());
        let mut c = ServerTransportConfig::new("http://x", "s");
        c.max_batch_objects = 0;
        assert!(c.validate().is_err());
    }

    #[test]
    fn partial_document_uses_defaults() {
        let c: ServerTransportConfig =
            from_json(r#"{"url":"https://example.org","stream_id":"s1","max_retries":5}"#);
        assert_eq!(c.max_retries, 5);
        assert_eq!(c.timeout_secs, 30);
        assert!(c.check_existing);
    }

    fn from_json<T: serde::de::DeserializeOwned>(json: &str) -> T {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn non_positive_batch_size_is_zero_bytes() {
        let c = LocalTransportConfig {
            max_batch_size_mb: -1.0,
            ..Default::default()
        };
        assert_eq!(c.max_batch_bytes(), 0);
    }
}
