//! Server configuration.
//!
//! [`ServerConfig`] is the validated form of the `serve` flags. Every check
//! happens before the listener is bound, so a bad flag fails fast with
//! [`Error::Config`].

use crate::archive::ArchivePolicy;
use crate::chunking::create_segmenter;
use crate::cli::parser::{BackendArgs, RelayArgs, ServeArgs};
use crate::error::{Error, Result};
use crate::generation::HuggingFaceConfig;
use crate::relay::{DEFAULT_CHUNK_DELAY, DEFAULT_PLACEHOLDER, RelayPolicy};
use std::sync::Arc;
use std::time::Duration;

/// Default request body limit (10 MiB).
pub const DEFAULT_BODY_LIMIT: usize = 10 * 1024 * 1024;

/// Relay settings before a segmenter is built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelaySettings {
    /// Segmentation strategy name.
    pub segmenter: String,
    /// Units per chunk.
    pub chunk_size: usize,
    /// Pause after each chunk.
    pub chunk_delay: Duration,
}

impl Default for RelaySettings {
    fn default() -> Self {
        Self {
            segmenter: "fixed".to_string(),
            chunk_size: crate::chunking::DEFAULT_CHUNK_SIZE,
            chunk_delay: DEFAULT_CHUNK_DELAY,
        }
    }
}

impl From<&RelayArgs> for RelaySettings {
    fn from(args: &RelayArgs) -> Self {
        Self {
            segmenter: args.segmenter.clone(),
            chunk_size: args.chunk_size,
            chunk_delay: Duration::from_millis(args.chunk_delay_ms),
        }
    }
}

impl RelaySettings {
    /// Builds the relay policy.
    ///
    /// # Errors
    ///
    /// Returns a chunking error for an unknown strategy or invalid size.
    pub fn policy(&self) -> Result<RelayPolicy> {
        let segmenter = create_segmenter(&self.segmenter, self.chunk_size)?;
        Ok(RelayPolicy::new()
            .with_segmenter(Arc::from(segmenter))
            .with_delay(self.chunk_delay)
            .with_placeholder(DEFAULT_PLACEHOLDER))
    }
}

/// Builds the backend configuration from flags.
///
/// # Errors
///
/// Returns [`Error::Config`] for an empty model or base URL, a zero token
/// cap or a zero timeout.
pub fn backend_config(args: &BackendArgs) -> Result<HuggingFaceConfig> {
    if args.hf_model.trim().is_empty() {
        return Err(config_error("--hf-model must not be empty"));
    }
    if !(args.hf_base_url.starts_with("http://") || args.hf_base_url.starts_with("https://")) {
        return Err(config_error("--hf-base-url must be an http(s) URL"));
    }
    if args.max_new_tokens == 0 {
        return Err(config_error("--max-new-tokens must be > 0"));
    }
    if args.timeout_secs == 0 {
        return Err(config_error("--timeout-secs must be > 0"));
    }

    Ok(HuggingFaceConfig {
        base_url: args.hf_base_url.clone(),
        model: args.hf_model.clone(),
        api_key: args.hf_api_key.clone().filter(|key| !key.is_empty()),
        max_new_tokens: args.max_new_tokens,
        timeout: Duration::from_secs(args.timeout_secs),
        mode: args.generation,
    })
}

/// Validated server settings.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Host to bind.
    pub host: String,
    /// Port to bind.
    pub port: u16,
    /// Generation backend.
    pub backend: HuggingFaceConfig,
    /// Relay pacing.
    pub relay: RelaySettings,
    /// Archive limits.
    pub archive: ArchivePolicy,
    /// Maximum request body size in bytes.
    pub body_limit: usize,
    /// Whether chat history is recorded.
    pub record_history: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
            backend: HuggingFaceConfig::default(),
            relay: RelaySettings::default(),
            archive: ArchivePolicy::unlimited(),
            body_limit: DEFAULT_BODY_LIMIT,
            record_history: true,
        }
    }
}

impl ServerConfig {
    /// Validates `serve` flags.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] or a chunking error describing the first
    /// invalid setting.
    pub fn from_args(args: &ServeArgs) -> Result<Self> {
        let config = Self {
            host: args.host.clone(),
            port: args.port,
            backend: backend_config(&args.backend)?,
            relay: RelaySettings::from(&args.relay),
            archive: ArchivePolicy {
                max_total_bytes: args.max_archive_bytes,
            },
            body_limit: args.body_limit,
            record_history: !args.no_history,
        };
        config.validate()?;
        Ok(config)
    }

    /// Checks settings that flags alone cannot guarantee.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] or a chunking error.
    pub fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            return Err(config_error("--host must not be empty"));
        }
        if self.body_limit == 0 {
            return Err(config_error("--body-limit must be > 0"));
        }
        if self.archive.max_total_bytes == Some(0) {
            return Err(config_error("--max-archive-bytes must be > 0"));
        }
        self.relay.policy()?;
        Ok(())
    }

    /// Returns the `host:port` bind address.
    #[must_use]
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn config_error(message: &str) -> Error {
    Error::Config {
        message: message.to_string(),
    }
}
