//! SSH session and SFTP file operations.
//!
//! This module is organized into the following submodules:
//!
//! - `config`: Connection configuration from mappings, builders or environment
//! - `error`: Typed connection, transfer and exec errors
//! - `transport`: Trait seam over the SSH transport primitives
//! - `client`: russh / russh-sftp implementation of the transport seam
//! - `auth`: Authentication strategies and the fallback chain
//! - `session`: Connection state machine
//! - `stream`: Byte stream over exec channels and remote files
//! - `file_ops`: exists / download / upload / mkdir / exec over a session

/// Log a connection report line, at `info` when the session runs with `debug`
/// enabled and at `debug` otherwise.
macro_rules! report {
    ($debug:expr, $($arg:tt)+) => {
        if $debug {
            tracing::info!($($arg)+)
        } else {
            tracing::debug!($($arg)+)
        }
    };
}
pub(crate) use report;

pub mod auth;
pub(crate) mod client;
pub mod config;
pub mod error;
pub mod file_ops;
pub mod session;
pub mod stream;
#[cfg(test)]
pub(crate) mod testing;
pub mod transport;

pub use config::ConnectionConfig;
pub use error::{ConnectionError, ExecError, TransferError};
pub use file_ops::RemoteFileOps;
pub use session::{DisconnectNotice, Session};
pub use stream::RemoteStream;
pub use transport::DisconnectHook;
