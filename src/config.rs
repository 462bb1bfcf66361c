// SPDX-License-Identifier: MPL-2.0

//! Client configuration: the ensemble address list, timeouts, and retry
//! bounds, with a `ClientBuilder` for programmatic construction and YAML
//! load/save for file-based configuration.
//!
//! Modeled directly on `async-opcua-client/src/config.rs`'s
//! `ClientConfig`/`ClientBuilder` pair and `opcua-core/src/config.rs`'s
//! `Config` trait (`validate`, `save`, `load`).

use std::fs::File;
use std::io::{Read as _, Write as _};
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::retry::SessionRetryPolicy;

/// Error returned from loading or saving a [`ClientConfig`].
#[derive(Debug)]
pub enum ConfigError {
    /// The config loaded (or was about to be saved) but failed [`Config::validate`].
    ConfigInvalid(Vec<String>),
    /// Reading or writing the file failed.
    Io(std::io::Error),
    /// The file was not valid YAML, or did not match the expected shape.
    Yaml(serde_yaml::Error),
}

impl From<std::io::Error> for ConfigError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<serde_yaml::Error> for ConfigError {
    fn from(value: serde_yaml::Error) -> Self {
        Self::Yaml(value)
    }
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::ConfigInvalid(errors) => write!(f, "invalid config: {}", errors.join(", ")),
            ConfigError::Io(e) => write!(f, "io error: {e}"),
            ConfigError::Yaml(e) => write!(f, "yaml error: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Shared save/load/validate behavior for configuration structs, mirroring
/// `opcua_core::config::Config`.
pub trait Config: Serialize {
    /// Validate the config, returning every problem found rather than
    /// stopping at the first.
    fn validate(&self) -> Result<(), Vec<String>>;

    /// Serialize to YAML and write to `path`, refusing to write an invalid config.
    fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Err(errors) = self.validate() {
            return Err(ConfigError::ConfigInvalid(errors));
        }
        let text = serde_yaml::to_string(self)?;
        let mut f = File::create(path)?;
        f.write_all(text.as_bytes())?;
        Ok(())
    }

    /// Read and parse YAML config from `path`.
    fn load<A>(path: &Path) -> Result<A, ConfigError>
    where
        for<'de> A: Config + Deserialize<'de>,
    {
        let mut f = File::open(path)?;
        let mut text = String::new();
        f.read_to_string(&mut text)?;
        Ok(serde_yaml::from_str(&text)?)
    }
}

/// Default values for [`ClientConfig`] fields left unset by the caller,
/// pulled out into free functions the way `async-opcua-client::config::defaults` does,
/// so `#[serde(default = "...")]` can reference them directly.
pub mod defaults {
    use std::time::Duration;

    /// Requested session timeout: 10 seconds.
    pub fn session_timeout() -> Duration {
        Duration::from_secs(10)
    }

    /// Per-attempt TCP connect timeout: 5 seconds.
    pub fn connect_timeout() -> Duration {
        Duration::from_secs(5)
    }

    /// Maximum number of reconnect attempts before giving up: unlimited.
    pub fn session_retry_limit() -> i32 {
        crate::retry::DEFAULT_RETRY_LIMIT
    }

    /// Initial reconnect backoff delay: 500ms.
    pub fn session_retry_initial() -> Duration {
        Duration::from_millis(500)
    }

    /// Maximum reconnect backoff delay: 30 seconds.
    pub fn session_retry_max() -> Duration {
        Duration::from_secs(30)
    }

    /// Per-request timeout, applied on top of the session timeout: 30 seconds.
    pub fn request_timeout() -> Duration {
        Duration::from_secs(30)
    }
}

/// Client configuration: the ensemble to connect to, timeouts, and
/// reconnect bounds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Ensemble member addresses, e.g. `"10.0.0.1:2181"`, tried in order on
    /// each (re)connect attempt.
    pub ensemble: Vec<String>,
    /// Requested session timeout, renegotiated by the server on handshake.
    #[serde(default = "defaults::session_timeout")]
    pub session_timeout: Duration,
    /// Per-attempt TCP connect timeout.
    #[serde(default = "defaults::connect_timeout")]
    pub connect_timeout: Duration,
    /// Maximum number of reconnect attempts. -1 retries forever.
    #[serde(default = "defaults::session_retry_limit")]
    pub session_retry_limit: i32,
    /// Initial reconnect backoff delay.
    #[serde(default = "defaults::session_retry_initial")]
    pub session_retry_initial: Duration,
    /// Maximum reconnect backoff delay.
    #[serde(default = "defaults::session_retry_max")]
    pub session_retry_max: Duration,
    /// Per-request timeout.
    #[serde(default = "defaults::request_timeout")]
    pub request_timeout: Duration,
    /// Optional digest-scheme credential to present at handshake/auth time.
    #[serde(default)]
    pub default_auth: Option<(String, Vec<u8>)>,
    /// Human-readable name for this client, used only in log lines.
    #[serde(default)]
    pub client_name: String,
}

impl Config for ClientConfig {
    fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();
        if self.ensemble.is_empty() {
            errors.push("ensemble must contain at least one address".to_owned());
        }
        for addr in &self.ensemble {
            if addr.parse::<std::net::SocketAddr>().is_err() {
                errors.push(format!("ensemble address {addr} is not a valid host:port"));
            }
        }
        if self.session_retry_limit < 0 && self.session_retry_limit != -1 {
            errors.push(format!(
                "session retry limit of {} is invalid - must be -1 (infinite), 0 (never) or a positive value",
                self.session_retry_limit
            ));
        }
        if self.session_timeout.is_zero() {
            errors.push("session_timeout must be non-zero".to_owned());
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

impl ClientConfig {
    /// Build the reconnect backoff policy described by this config.
    pub fn session_retry_policy(&self) -> SessionRetryPolicy {
        SessionRetryPolicy::new(
            self.session_retry_max,
            if self.session_retry_limit < 0 {
                None
            } else {
                Some(self.session_retry_limit as u32)
            },
            self.session_retry_initial,
        )
    }
}

/// Builder for [`ClientConfig`], mirroring `async-opcua-client`'s `ClientBuilder`.
#[derive(Debug, Clone, Default)]
pub struct ClientBuilder {
    config: ClientConfigBuilderState,
}

#[derive(Debug, Clone)]
struct ClientConfigBuilderState {
    ensemble: Vec<String>,
    session_timeout: Duration,
    connect_timeout: Duration,
    session_retry_limit: i32,
    session_retry_initial: Duration,
    session_retry_max: Duration,
    request_timeout: Duration,
    default_auth: Option<(String, Vec<u8>)>,
    client_name: String,
}

impl Default for ClientConfigBuilderState {
    fn default() -> Self {
        Self {
            ensemble: Vec::new(),
            session_timeout: defaults::session_timeout(),
            connect_timeout: defaults::connect_timeout(),
            session_retry_limit: defaults::session_retry_limit(),
            session_retry_initial: defaults::session_retry_initial(),
            session_retry_max: defaults::session_retry_max(),
            request_timeout: defaults::request_timeout(),
            default_auth: None,
            client_name: String::new(),
        }
    }
}

impl ClientBuilder {
    /// Start a new builder with default timeouts and an empty ensemble.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the ensemble member addresses.
    pub fn ensemble(mut self, addrs: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.config.ensemble = addrs.into_iter().map(Into::into).collect();
        self
    }

    /// Set the requested session timeout.
    pub fn session_timeout(mut self, timeout: Duration) -> Self {
        self.config.session_timeout = timeout;
        self
    }

    /// Set the per-attempt TCP connect timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = timeout;
        self
    }

    /// Set the maximum number of reconnect attempts (-1 for unlimited).
    pub fn session_retry_limit(mut self, limit: i32) -> Self {
        self.config.session_retry_limit = limit;
        self
    }

    /// Set the initial and maximum reconnect backoff delays.
    pub fn session_retry_backoff(mut self, initial: Duration, max: Duration) -> Self {
        self.config.session_retry_initial = initial;
        self.config.session_retry_max = max;
        self
    }

    /// Set the per-request timeout.
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.config.request_timeout = timeout;
        self
    }

    /// Set a digest-scheme credential to present immediately after connecting.
    pub fn default_auth(mut self, scheme: impl Into<String>, credential: Vec<u8>) -> Self {
        self.config.default_auth = Some((scheme.into(), credential));
        self
    }

    /// Set the client's log-line display name.
    pub fn client_name(mut self, name: impl Into<String>) -> Self {
        self.config.client_name = name.into();
        self
    }

    /// Finish building, returning an error if the result is invalid.
    pub fn build(self) -> Result<ClientConfig, Vec<String>> {
        let config = ClientConfig {
            ensemble: self.config.ensemble,
            session_timeout: self.config.session_timeout,
            connect_timeout: self.config.connect_timeout,
            session_retry_limit: self.config.session_retry_limit,
            session_retry_initial: self.config.session_retry_initial,
            session_retry_max: self.config.session_retry_max,
            request_timeout: self.config.request_timeout,
            default_auth: self.config.default_auth,
            client_name: self.config.client_name,
        };
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_rejects_empty_ensemble() {
        let err = ClientBuilder::new().build().unwrap_err();
        assert!(err.iter().any(|e| e.contains("ensemble")));
    }

    #[test]
    fn builder_accepts_valid_ensemble() {
        let config = ClientBuilder::new()
            .ensemble(["127.0.0.1:2181", "127.0.0.1:2182"])
            .build()
            .unwrap();
        assert_eq!(config.ensemble.len(), 2);
    }

    #[test]
    fn rejects_malformed_address() {
        let err = ClientBuilder::new()
            .ensemble(["not-an-address"])
            .build()
            .unwrap_err();
        assert!(err.iter().any(|e| e.contains("not-an-address")));
    }

    #[test]
    fn rejects_invalid_retry_limit() {
        let err = ClientBuilder::new()
            .ensemble(["127.0.0.1:2181"])
            .session_retry_limit(-2)
            .build()
            .unwrap_err();
        assert!(err.iter().any(|e| e.contains("retry limit")));
    }
}
