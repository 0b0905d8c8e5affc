//! Transport trait definitions.
//!
//! These traits are the seam between the session logic and the SSH library.
//! The production implementation lives in `client` (russh + russh-sftp);
//! tests swap in an in-memory double. Each method maps to one primitive of
//! the underlying transport:
//!
//! | Primitive | Method |
//! |-----------|--------|
//! | connect(host, port) | [`Connector::connect`] |
//! | auth none | [`Transport::authenticate_none`] |
//! | auth password | [`Transport::authenticate_password`] |
//! | auth public key | [`Transport::authenticate_publickey`] |
//! | open SFTP channel | [`Transport::open_sftp`] |
//! | exec channel | [`Transport::exec`] |
//!
//! Errors at this level are plain messages; the session layer wraps them
//! into typed errors.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncWrite};

use crate::ssh::session::DisconnectNotice;

/// Callback invoked when the server closes the connection.
pub type DisconnectHook = Arc<dyn Fn(DisconnectNotice) + Send + Sync>;

/// A bidirectional byte stream: a remote file handle or an exec channel.
pub trait RemoteIo: AsyncRead + AsyncWrite + Send + Unpin {}

impl<T: AsyncRead + AsyncWrite + Send + Unpin> RemoteIo for T {}

/// Remote file timestamps in seconds since the Unix epoch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RemoteTimes {
    pub modified: Option<u32>,
    pub accessed: Option<u32>,
}

/// Opens transports to SSH servers.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Open an unauthenticated transport to `host:port`.
    ///
    /// `on_disconnect` must be invoked when the server sends a disconnect.
    async fn connect(
        &self,
        host: &str,
        port: u16,
        on_disconnect: DisconnectHook,
    ) -> Result<Box<dyn Transport>, String>;
}

/// An open SSH transport.
///
/// Authentication methods return:
///
/// * `Ok(true)` - Authentication succeeded
/// * `Ok(false)` - Credentials rejected by the server
/// * `Err(message)` - Error during the attempt (bad key file, I/O, ...)
#[async_trait]
pub trait Transport: Send + Sync {
    async fn authenticate_none(&mut self, username: &str) -> Result<bool, String>;

    async fn authenticate_password(
        &mut self,
        username: &str,
        password: &str,
    ) -> Result<bool, String>;

    async fn authenticate_publickey(
        &mut self,
        username: &str,
        public_key: &Path,
        private_key: &Path,
        passphrase: Option<&str>,
    ) -> Result<bool, String>;

    /// Open an SFTP sub-channel.
    async fn open_sftp(&self) -> Result<Box<dyn SftpChannel>, String>;

    /// Open an exec channel running `command` and return its output stream.
    async fn exec(&self, command: &str) -> Result<Box<dyn RemoteIo>, String>;

    /// Whether the handle is still usable. Local state only, nothing is sent.
    fn is_valid(&self) -> bool;

    /// Send an application disconnect.
    async fn close(&mut self) -> Result<(), String>;
}

/// An SFTP sub-channel.
#[async_trait]
pub trait SftpChannel: Send + Sync {
    /// Open `path` read-only.
    async fn open_read(&self, path: &str) -> Result<Box<dyn RemoteIo>, String>;

    /// Open `path` for writing, creating or truncating it.
    async fn create(&self, path: &str) -> Result<Box<dyn RemoteIo>, String>;

    async fn times(&self, path: &str) -> Result<RemoteTimes, String>;

    async fn try_exists(&self, path: &str) -> Result<bool, String>;

    /// Create a single directory. Parents are not created.
    async fn create_dir(&self, path: &str) -> Result<(), String>;

    async fn close(&self) -> Result<(), String>;
}
