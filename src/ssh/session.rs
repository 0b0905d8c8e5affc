//! SSH session management.
//!
//! A [`Session`] owns at most one authenticated transport and the
//! authentication chain used to obtain it.
//!
//! # States
//!
//! - **Disconnected**: no transport handle (initial state, after
//!   [`Session::disconnect`], or after a failed connect).
//! - **Connected**: a transport handle is present and still valid.
//!
//! A transport that was closed from the server side stays stored but is no
//! longer valid, so [`Session::is_connected`] reports `false` and the next
//! [`Session::ensure_connected`] opens a fresh one.
//!
//! # Thread Safety
//!
//! State-changing calls take `&mut self`; one caller drives one session
//! sequentially. Share across tasks only behind external locking.

use std::fmt;
use std::sync::{Arc, Mutex as StdMutex};

use tracing::{info, warn};

use crate::ssh::auth::{AuthChain, AuthStrategy};
use crate::ssh::client::RusshConnector;
use crate::ssh::config::ConnectionConfig;
use crate::ssh::error::ConnectionError;
use crate::ssh::report;
use crate::ssh::transport::{Connector, DisconnectHook, Transport};

/// A server-initiated disconnect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisconnectNotice {
    pub reason_code: u32,
    pub message: String,
    pub language_tag: String,
}

fn log_disconnect(notice: DisconnectNotice) {
    warn!(
        "Server disconnected with reason code {} and message: {}",
        notice.reason_code, notice.message
    );
}

/// One SSH connection and its authentication policy.
pub struct Session {
    config: ConnectionConfig,
    connector: Arc<dyn Connector>,
    auth_chain: AuthChain,
    transport: Option<Box<dyn Transport>>,
    on_disconnect: DisconnectHook,
    last_disconnect: Arc<StdMutex<Option<DisconnectNotice>>>,
}

impl Session {
    /// Create a disconnected session using the russh transport and the
    /// standard none -> password -> key authentication order.
    pub fn new(config: ConnectionConfig) -> Self {
        Self {
            config,
            connector: Arc::new(RusshConnector),
            auth_chain: AuthChain::standard(),
            transport: None,
            on_disconnect: Arc::new(log_disconnect),
            last_disconnect: Arc::new(StdMutex::new(None)),
        }
    }

    /// Create a session and connect it.
    pub async fn open(config: ConnectionConfig) -> Result<Self, ConnectionError> {
        let mut session = Self::new(config);
        session.connect().await?;
        Ok(session)
    }

    /// Replace the transport implementation.
    pub fn with_connector(mut self, connector: Arc<dyn Connector>) -> Self {
        self.connector = connector;
        self
    }

    /// Replace the authentication order.
    pub fn with_auth_chain(mut self, auth_chain: AuthChain) -> Self {
        self.auth_chain = auth_chain;
        self
    }

    /// Replace the callback run when the server disconnects.
    ///
    /// The notice is recorded (see [`Session::last_disconnect`]) before the
    /// callback runs. The session never reconnects on its own.
    pub fn on_disconnect(
        mut self,
        callback: impl Fn(DisconnectNotice) + Send + Sync + 'static,
    ) -> Self {
        self.on_disconnect = Arc::new(callback);
        self
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// Open the transport and run the authentication chain.
    ///
    /// A transport failure fails immediately with
    /// [`ConnectionError::Unreachable`]. If no applicable strategy succeeds the
    /// half-open transport is closed and [`ConnectionError::AuthenticationFailed`]
    /// is returned. A previously held transport is closed first.
    pub async fn connect(&mut self) -> Result<(), ConnectionError> {
        self.disconnect().await;

        let debug = self.config.debug();
        let target = self.config.target();
        report!(
            debug,
            "Connecting to {}:{} as {}",
            self.config.host(),
            self.config.port(),
            target
        );

        let mut transport = self
            .connector
            .connect(self.config.host(), self.config.port(), self.disconnect_hook())
            .await
            .map_err(|message| {
                warn!("SSH connection to {} failed: {}", target, message);
                ConnectionError::Unreachable {
                    target: target.clone(),
                    message,
                }
            })?;

        match self
            .auth_chain
            .authenticate(transport.as_mut(), &self.config)
            .await
        {
            Ok(true) => {
                info!("SSH connected to {}:{}", self.config.host(), self.config.port());
                self.transport = Some(transport);
                Ok(())
            }
            result => {
                let detail = match result {
                    Err(e) => e,
                    _ => "no authentication methods succeeded".to_string(),
                };
                warn!("SSH authentication for {} failed: {}", target, detail);
                if let Err(e) = transport.close().await {
                    report!(debug, "Closing rejected transport failed: {}", e);
                }
                Err(ConnectionError::AuthenticationFailed { target, detail })
            }
        }
    }

    /// True iff a transport handle is present and valid. No probe is sent.
    pub fn is_connected(&self) -> bool {
        self.transport.as_ref().is_some_and(|t| t.is_valid())
    }

    /// Connect with the stored configuration unless already connected.
    pub(crate) async fn ensure_connected(&mut self) -> Result<&mut dyn Transport, ConnectionError> {
        if !self.is_connected() {
            self.connect().await?;
        }

        match self.transport.as_deref_mut() {
            Some(transport) => Ok(transport),
            None => Err(ConnectionError::Unreachable {
                target: self.config.target(),
                message: "transport handle missing after connect".to_string(),
            }),
        }
    }

    /// Close the transport, if any. Safe to call when disconnected.
    pub async fn disconnect(&mut self) {
        if let Some(mut transport) = self.transport.take()
            && transport.is_valid()
        {
            if let Err(e) = transport.close().await {
                warn!("SSH disconnect from {} failed: {}", self.config.target(), e);
            }
        }
    }

    /// The most recent server disconnect seen by this session.
    pub fn last_disconnect(&self) -> Option<DisconnectNotice> {
        self.last_disconnect
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn disconnect_hook(&self) -> DisconnectHook {
        let slot = self.last_disconnect.clone();
        let callback = self.on_disconnect.clone();
        Arc::new(move |notice: DisconnectNotice| {
            *slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(notice.clone());
            callback(notice);
        })
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("config", &self.config)
            .field("auth_chain", &self.auth_chain.names())
            .field("connected", &self.is_connected())
            .finish()
    }
}
