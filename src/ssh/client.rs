//! russh implementation of the transport seam.
//!
//! ## Connection Lifecycle
//!
//! 1. **Client Configuration**: keepalive settings, no inactivity timeout.
//!    Callers that need deadlines wrap operations in `tokio::time::timeout`.
//!
//! 2. **Connection Establishment**: TCP connect and SSH handshake via
//!    `russh::client::connect`.
//!
//! 3. **Authentication**: one primitive per method (none, password, public
//!    key). Ordering and fallback belong to the auth chain, not to this module.
//!
//! 4. **Sub-channels**: SFTP via the `sftp` subsystem and `russh-sftp`, exec via
//!    a session channel turned into a byte stream.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use russh::{Disconnect, client, keys};
use russh_sftp::{client::SftpSession, protocol::OpenFlags};
use tracing::{debug, warn};

use crate::ssh::session::DisconnectNotice;
use crate::ssh::transport::{
    Connector, DisconnectHook, RemoteIo, RemoteTimes, SftpChannel, Transport,
};

/// Build russh client configuration.
///
/// Keepalive every 30 seconds with max 3 missed keepalives. No inactivity
/// timeout: a session stays open until it is disconnected.
pub(crate) fn build_client_config() -> Arc<client::Config> {
    Arc::new(client::Config {
        inactivity_timeout: None,
        keepalive_interval: Some(Duration::from_secs(30)),
        keepalive_max: 3,
        ..Default::default()
    })
}

/// Client handler for russh that accepts all host keys.
///
/// Host key verification is out of scope for this crate, similar to
/// `StrictHostKeyChecking=no` in OpenSSH. Server disconnects are forwarded
/// to the session's hook.
pub struct SshClientHandler {
    on_disconnect: DisconnectHook,
}

impl SshClientHandler {
    pub(crate) fn new(on_disconnect: DisconnectHook) -> Self {
        Self { on_disconnect }
    }
}

impl client::Handler for SshClientHandler {
    type Error = russh::Error;

    async fn check_server_key(
        &mut self,
        _server_public_key: &keys::PublicKey,
    ) -> Result<bool, Self::Error> {
        Ok(true)
    }

    async fn disconnected(
        &mut self,
        reason: client::DisconnectReason<Self::Error>,
    ) -> Result<(), Self::Error> {
        match reason {
            client::DisconnectReason::ReceivedDisconnect(info) => {
                (self.on_disconnect)(DisconnectNotice {
                    reason_code: info.reason_code as u32,
                    message: info.message,
                    language_tag: info.lang_tag,
                });
                Ok(())
            }
            client::DisconnectReason::Error(e) => Err(e),
        }
    }
}

/// Opens russh transports.
#[derive(Debug, Default, Clone, Copy)]
pub struct RusshConnector;

#[async_trait]
impl Connector for RusshConnector {
    async fn connect(
        &self,
        host: &str,
        port: u16,
        on_disconnect: DisconnectHook,
    ) -> Result<Box<dyn Transport>, String> {
        let config = build_client_config();
        let handler = SshClientHandler::new(on_disconnect);

        let handle = client::connect(config, (host, port), handler)
            .await
            .map_err(|e| format!("Failed to connect: {}", e))?;

        Ok(Box::new(RusshTransport { handle }))
    }
}

/// An open russh client handle.
pub(crate) struct RusshTransport {
    handle: client::Handle<SshClientHandler>,
}

#[async_trait]
impl Transport for RusshTransport {
    async fn authenticate_none(&mut self, username: &str) -> Result<bool, String> {
        let result = self
            .handle
            .authenticate_none(username)
            .await
            .map_err(|e| format!("None authentication failed: {}", e))?;

        Ok(result.success())
    }

    async fn authenticate_password(
        &mut self,
        username: &str,
        password: &str,
    ) -> Result<bool, String> {
        let result = self
            .handle
            .authenticate_password(username, password)
            .await
            .map_err(|e| format!("Password authentication failed: {}", e))?;

        Ok(result.success())
    }

    async fn authenticate_publickey(
        &mut self,
        username: &str,
        public_key: &Path,
        private_key: &Path,
        passphrase: Option<&str>,
    ) -> Result<bool, String> {
        let key_pair = keys::load_secret_key(private_key, passphrase).map_err(|e| {
            format!("Failed to load private key from {:?}: {}", private_key, e)
        })?;

        let expected = keys::load_public_key(public_key)
            .map_err(|e| format!("Failed to load public key from {:?}: {}", public_key, e))?;
        if expected.key_data() != key_pair.public_key().key_data() {
            return Err(format!(
                "Public key {:?} does not match private key {:?}",
                public_key, private_key
            ));
        }

        // For RSA keys, use the best supported hash algorithm
        let hash_alg = self
            .handle
            .best_supported_rsa_hash()
            .await
            .ok()
            .flatten()
            .flatten();
        debug!("Using RSA hash algorithm for key auth: {:?}", hash_alg);

        let key_with_hash = keys::PrivateKeyWithHashAlg::new(Arc::new(key_pair), hash_alg);

        let result = self
            .handle
            .authenticate_publickey(username, key_with_hash)
            .await
            .map_err(|e| format!("Key authentication failed: {}", e))?;

        Ok(result.success())
    }

    async fn open_sftp(&self) -> Result<Box<dyn SftpChannel>, String> {
        let channel = self
            .handle
            .channel_open_session()
            .await
            .map_err(|e| format!("Failed to open channel: {}", e))?;

        channel
            .request_subsystem(true, "sftp")
            .await
            .map_err(|e| format!("Failed to request sftp subsystem: {}", e))?;

        let session = SftpSession::new(channel.into_stream())
            .await
            .map_err(|e| format!("Failed to start SFTP session: {}", e))?;

        Ok(Box::new(RusshSftp { session }))
    }

    async fn exec(&self, command: &str) -> Result<Box<dyn RemoteIo>, String> {
        let channel = self
            .handle
            .channel_open_session()
            .await
            .map_err(|e| format!("Failed to open channel: {}", e))?;

        channel
            .exec(true, command)
            .await
            .map_err(|e| format!("Failed to execute command: {}", e))?;

        Ok(Box::new(channel.into_stream()))
    }

    fn is_valid(&self) -> bool {
        !self.handle.is_closed()
    }

    async fn close(&mut self) -> Result<(), String> {
        self.handle
            .disconnect(Disconnect::ByApplication, "Session closed by user", "en")
            .await
            .map_err(|e| format!("Failed to disconnect: {}", e))
    }
}

/// SFTP sub-channel backed by `russh-sftp`.
struct RusshSftp {
    session: SftpSession,
}

#[async_trait]
impl SftpChannel for RusshSftp {
    async fn open_read(&self, path: &str) -> Result<Box<dyn RemoteIo>, String> {
        let file = self
            .session
            .open_with_flags(path, OpenFlags::READ)
            .await
            .map_err(|e| e.to_string())?;
        Ok(Box::new(file))
    }

    async fn create(&self, path: &str) -> Result<Box<dyn RemoteIo>, String> {
        let file = self
            .session
            .open_with_flags(
                path,
                OpenFlags::CREATE | OpenFlags::TRUNCATE | OpenFlags::WRITE,
            )
            .await
            .map_err(|e| e.to_string())?;
        Ok(Box::new(file))
    }

    async fn times(&self, path: &str) -> Result<RemoteTimes, String> {
        let metadata = self
            .session
            .metadata(path)
            .await
            .map_err(|e| e.to_string())?;
        Ok(RemoteTimes {
            modified: metadata.mtime,
            accessed: metadata.atime,
        })
    }

    async fn try_exists(&self, path: &str) -> Result<bool, String> {
        self.session
            .try_exists(path)
            .await
            .map_err(|e| e.to_string())
    }

    async fn create_dir(&self, path: &str) -> Result<(), String> {
        self.session
            .create_dir(path)
            .await
            .map_err(|e| e.to_string())
    }

    async fn close(&self) -> Result<(), String> {
        if let Err(e) = self.session.close().await {
            warn!("Failed to close SFTP session: {}", e);
            return Err(e.to_string());
        }
        Ok(())
    }
}
