//! Error kinds surfaced by sessions and remote file operations.
//!
//! # Classification
//!
//! 1. [`ConnectionError`]: the transport could not be opened, or every
//!    applicable authentication strategy was rejected. Fatal to the connect
//!    call; the caller may try again with a new attempt.
//! 2. [`TransferError`]: SFTP channel unavailable, a remote or local open
//!    failed, data could not be written, or a mkdir parent is missing.
//! 3. [`ExecError`]: the command channel could not be opened.
//!
//! Nothing in this crate retries automatically. [`ConnectionError::is_retryable`]
//! tells callers which failures are transient: an unreachable host may come
//! back, rejected credentials will not.

use thiserror::Error;

/// Failure to establish an authenticated session.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConnectionError {
    #[error("SSH: Can't connect to {target}: {message}")]
    Unreachable { target: String, message: String },

    #[error("SSH: Can't connect to {target}: authentication failed ({detail})")]
    AuthenticationFailed { target: String, detail: String },
}

impl ConnectionError {
    /// Short stable reason: `"unreachable"` or `"authentication failed"`.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::Unreachable { .. } => "unreachable",
            Self::AuthenticationFailed { .. } => "authentication failed",
        }
    }

    /// The `user@host` the connection was attempted for.
    pub fn target(&self) -> &str {
        match self {
            Self::Unreachable { target, .. } | Self::AuthenticationFailed { target, .. } => target,
        }
    }

    /// Authentication failures are never worth retrying, transport failures may be.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Unreachable { .. })
    }
}

/// Failure of an SFTP transfer or directory operation.
#[derive(Debug, Error)]
pub enum TransferError {
    #[error(transparent)]
    Connection(#[from] ConnectionError),

    #[error("Unable to open SFTP channel: {0}")]
    SftpUnavailable(String),

    #[error("Unable to open remote file: {path}: {message}")]
    RemoteOpen { path: String, message: String },

    #[error("Unable to open local file: {path}: {source}")]
    LocalOpen {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Unable to read local file: {path}: {source}")]
    LocalRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Unable to send data to file: {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Unable to copy {from} to {to}: {source}")]
    Copy {
        from: String,
        to: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Unable to create remote folder {name}. {parent} does not exist.")]
    ParentMissing { name: String, parent: String },

    #[error("Unable to create remote folder {path}: {message}")]
    CreateDir { path: String, message: String },
}

impl TransferError {
    pub fn reason(&self) -> &'static str {
        match self {
            Self::Connection(e) => e.reason(),
            Self::SftpUnavailable(_) => "sftp unavailable",
            Self::RemoteOpen { .. } => "remote open failed",
            Self::LocalOpen { .. } => "local open failed",
            Self::LocalRead { .. } => "local read failed",
            Self::Write { .. } => "write failed",
            Self::Copy { .. } => "copy failed",
            Self::ParentMissing { .. } => "parent missing",
            Self::CreateDir { .. } => "create dir failed",
        }
    }
}

/// Failure to start a remote command.
#[derive(Debug, Error)]
pub enum ExecError {
    #[error(transparent)]
    Connection(#[from] ConnectionError),

    #[error("Failed to execute command {command:?}: {message}")]
    ChannelOpen { command: String, message: String },
}

/// Invalid connection configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("SSH_HOST is not set")]
    MissingHost,

    #[error("Invalid port number: {0}")]
    InvalidPort(String),

    #[error("Invalid connection configuration: {0}")]
    Invalid(#[source] serde_json::Error),
}
