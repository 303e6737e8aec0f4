use std::path::Path;

use serde::{Deserialize, Serialize};
use speckle_transports::{LocalTransportConfig, ServerTransportConfig};

use crate::error::{SdkError, SdkResult};

/// Top-level SDK settings, usually read from a TOML file:
///
/// ```toml
/// use_default_cache = true
///
/// [local]
/// app_name = "Speckle"
/// scope = "Objects"
///
/// [server]
/// url = "https://app.speckle.systems"
/// stream_id = "3073b96e86"
/// token = "..."
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SdkConfig {
    /// Also write every send to the local SQLite cache.
    pub use_default_cache: bool,
    pub local: LocalTransportConfig,
    pub server: Option<ServerTransportConfig>,
}

impl Default for SdkConfig {
    fn default() -> Self {
        Self {
            use_default_cache: true,
            local: LocalTransportConfig::default(),
            server: None,
        }
    }
}

impl SdkConfig {
    pub fn from_toml_str(s: &str) -> SdkResult<Self> {
        let config: Self = toml::from_str(s).map_err(|e| SdkError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> SdkResult<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&text)
    }

    pub fn to_toml_string(&self) -> SdkResult<String> {
        toml::to_string(self).map_err(|e| SdkError::Config(e.to_string()))
    }

    pub fn validate(&self) -> SdkResult<()> {
        if let Some(server) = &self.server {
            server.validate()?;
        }
        if self.local.scope.trim().is_empty() {
            return Err(SdkError::Config("local scope is empty".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let c = SdkConfig::default();
        assert!(c.use_default_cache);
        assert!(c.server.is_none());
        assert_eq!(c.local.app_name, "Speckle");
    }

    #[test]
    fn parse_full_document() {
        let c = SdkConfig::from_toml_str(
            r#"
            use_default_cache = false

            [local]
            base_path = "/tmp/speckle"
            scope = "Cache"
            max_batch_size_mb = 2.5

            [server]
            url = "https://example.org"
            stream_id = "abc"
            token = "t"
            max_retries = 7
            "#,
        )
        .unwrap();
        assert!(!c.use_default_cache);
        assert_eq!(c.local.scope, "Cache");
        assert_eq!(c.local.app_name, "Speckle");
        assert_eq!(c.local.max_batch_size_mb, 2.5);
        let server = c.server.unwrap();
        assert_eq!(server.max_retries, 7);
        assert_eq!(server.timeout_secs, 30);
    }

    #[test]
    fn empty_document_is_default() {
        assert_eq!(SdkConfig::from_toml_str("").unwrap(), SdkConfig::default());
    }

    #[test]
    fn invalid_server_is_rejected() {
        let err = SdkConfig::from_toml_str("[server]\nurl = \"https://x\"\n").unwrap_err();
        assert!(matches!(err, SdkError::Transport(_)));
        let err = SdkConfig::from_toml_str("use_default_cache = \"yes\"").unwrap_err();
        assert!(matches!(err, SdkError::Config(_)));
    }

    #[test]
    fn toml_round_trip() {
        let mut c = SdkConfig::default();
        c.local.scope = "Other".into();
        let text = c.to_toml_string().unwrap();
        assert_eq!(SdkConfig::from_toml_str(&text).unwrap(), c);
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("speckle.toml");
        std::fs::write(&path, "use_default_cache = false\n").unwrap();
        assert!(!SdkConfig::load(&path).unwrap().use_default_cache);
        assert!(matches!(
            SdkConfig::load(dir.path().join("missing.toml")),
            Err(SdkError::Io(_))
        ));
    }
}
