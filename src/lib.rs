//! SSH/SFTP client facade.
//!
//! Establishes an authenticated SSH session through an ordered chain of
//! authentication strategies, then offers SFTP file transfer and remote
//! command execution over that session.

pub mod ssh;

pub use ssh::{
    ConnectionConfig, ConnectionError, DisconnectNotice, ExecError, RemoteFileOps, RemoteStream,
    Session, TransferError,
};
