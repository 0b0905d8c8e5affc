//! Connection configuration.
//!
//! A [`ConnectionConfig`] can be built three ways:
//!
//! 1. **Mapping** - a JSON-like key/value map with the keys `host`, `port`,
//!    `username`, `password`, `pubkey`, `privkey`, `passphrase` and `debug`.
//!    Unrecognized keys are ignored, missing optional keys stay unset.
//! 2. **Builder** - [`ConnectionConfig::new`] followed by `with_*` calls.
//! 3. **Environment** - [`ConnectionConfig::from_env`], used by the probe binary.
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `SSH_HOST` | (required) | Server host name or address |
//! | `SSH_PORT` | 22 | Server port |
//! | `SSH_USERNAME` | unset | Login user |
//! | `SSH_PASSWORD` | unset | Password for password authentication |
//! | `SSH_PUBKEY` | unset | Public key file for public key authentication |
//! | `SSH_PRIVKEY` | unset | Private key file for public key authentication |
//! | `SSH_PASSPHRASE` | unset | Passphrase of the private key |
//! | `SSH_DEBUG` | false | Report connection steps at info level |
//! | `SSH_PROBE_DELAY_SECS` | 2 | Delay between probe iterations |

use std::env;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Deserializer, de};

use crate::ssh::error::ConfigError;

/// Default SSH port
pub const DEFAULT_PORT: u16 = 22;

/// Default delay between probe iterations in seconds
pub(crate) const DEFAULT_PROBE_DELAY_SECS: u64 = 2;

pub(crate) const HOST_ENV_VAR: &str = "SSH_HOST";
pub(crate) const PORT_ENV_VAR: &str = "SSH_PORT";
pub(crate) const USERNAME_ENV_VAR: &str = "SSH_USERNAME";
pub(crate) const PASSWORD_ENV_VAR: &str = "SSH_PASSWORD";
pub(crate) const PUBKEY_ENV_VAR: &str = "SSH_PUBKEY";
pub(crate) const PRIVKEY_ENV_VAR: &str = "SSH_PRIVKEY";
pub(crate) const PASSPHRASE_ENV_VAR: &str = "SSH_PASSPHRASE";
pub(crate) const DEBUG_ENV_VAR: &str = "SSH_DEBUG";
pub(crate) const PROBE_DELAY_ENV_VAR: &str = "SSH_PROBE_DELAY_SECS";

/// Immutable description of one SSH endpoint and its credentials.
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct ConnectionConfig {
    host: String,
    #[serde(default = "default_port", deserialize_with = "deserialize_port")]
    port: u16,
    username: Option<String>,
    password: Option<String>,
    #[serde(rename = "pubkey")]
    public_key_path: Option<PathBuf>,
    #[serde(rename = "privkey")]
    private_key_path: Option<PathBuf>,
    passphrase: Option<String>,
    #[serde(default)]
    debug: bool,
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

/// Accepts the port either as a number or as a numeric string (`"22"`).
fn deserialize_port<'de, D>(deserializer: D) -> Result<u16, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum PortValue {
        Number(u16),
        Text(String),
    }

    match PortValue::deserialize(deserializer)? {
        PortValue::Number(port) => Ok(port),
        PortValue::Text(text) => text
            .trim()
            .parse::<u16>()
            .map_err(|e| de::Error::custom(format!("Invalid port number: {}", e))),
    }
}

impl ConnectionConfig {
    /// Create a configuration for `host` on the default port with no credentials.
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: DEFAULT_PORT,
            username: None,
            password: None,
            public_key_path: None,
            private_key_path: None,
            passphrase: None,
            debug: false,
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    /// Set the key pair used for public key authentication.
    ///
    /// When `private_key` is `None` the private key is expected next to the
    /// public key, without its `.pub` extension.
    pub fn with_public_key(
        mut self,
        public_key: impl Into<PathBuf>,
        private_key: Option<PathBuf>,
    ) -> Self {
        self.public_key_path = Some(public_key.into());
        self.private_key_path = private_key;
        self
    }

    pub fn with_passphrase(mut self, passphrase: impl Into<String>) -> Self {
        self.passphrase = Some(passphrase.into());
        self
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Build a configuration from a key/value mapping.
    ///
    /// # Examples
    ///
    /// ```ignore
    /// let config = ConnectionConfig::from_value(serde_json::json!({
    ///     "host": "example.com",
    ///     "username": "deploy",
    ///     "password": "secret",
    /// }))?;
    /// assert_eq!(config.port(), 22);
    /// ```
    pub fn from_value(value: serde_json::Value) -> Result<Self, ConfigError> {
        serde_json::from_value(value).map_err(ConfigError::Invalid)
    }

    /// Build a configuration from `SSH_*` environment variables.
    ///
    /// Empty variables are treated as unset.
    pub fn from_env() -> Result<Self, ConfigError> {
        let host = env_value(HOST_ENV_VAR).ok_or(ConfigError::MissingHost)?;

        let port = match env_value(PORT_ENV_VAR) {
            Some(port) => port
                .trim()
                .parse::<u16>()
                .map_err(|e| ConfigError::InvalidPort(format!("{}: {}", port, e)))?,
            None => DEFAULT_PORT,
        };

        Ok(Self {
            host,
            port,
            username: env_value(USERNAME_ENV_VAR),
            password: env_value(PASSWORD_ENV_VAR),
            public_key_path: env_value(PUBKEY_ENV_VAR).map(PathBuf::from),
            private_key_path: env_value(PRIVKEY_ENV_VAR).map(PathBuf::from),
            passphrase: env_value(PASSPHRASE_ENV_VAR),
            debug: env_value(DEBUG_ENV_VAR)
                .map(|v| v.eq_ignore_ascii_case("true") || v == "1")
                .unwrap_or(false),
        })
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    pub fn password(&self) -> Option<&str> {
        self.password.as_deref()
    }

    pub fn public_key_path(&self) -> Option<&Path> {
        self.public_key_path.as_deref()
    }

    pub fn private_key_path(&self) -> Option<&Path> {
        self.private_key_path.as_deref()
    }

    pub fn passphrase(&self) -> Option<&str> {
        self.passphrase.as_deref()
    }

    pub fn debug(&self) -> bool {
        self.debug
    }

    /// `user@host` label used in logs and connection errors.
    pub fn target(&self) -> String {
        format!("{}@{}", self.username().unwrap_or_default(), self.host)
    }
}

impl fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("public_key_path", &self.public_key_path)
            .field("private_key_path", &self.private_key_path)
            .field("passphrase", &self.passphrase.as_ref().map(|_| "<redacted>"))
            .field("debug", &self.debug)
            .finish()
    }
}

fn env_value(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.is_empty())
}

/// Resolve the probe delay with priority: parameter -> env var -> default
pub fn resolve_probe_delay_secs(delay_param: Option<u64>) -> u64 {
    // Priority 1: Use parameter if provided
    if let Some(delay) = delay_param {
        return delay;
    }

    // Priority 2: Use environment variable if set
    if let Some(env_delay) = env_value(PROBE_DELAY_ENV_VAR)
        && let Ok(delay) = env_delay.parse::<u64>()
    {
        return delay;
    }

    // Priority 3: Default value
    DEFAULT_PROBE_DELAY_SECS
}
