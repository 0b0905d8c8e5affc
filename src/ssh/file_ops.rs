//! File and command operations over a session.
//!
//! Every operation starts with the session's `ensure_connected` guard, so a
//! disconnected session connects lazily on first use. Each file operation
//! opens one SFTP sub-channel, runs all of its checks and actions on that
//! channel, and closes it before returning, on success and on error alike.
//!
//! Remote paths are passed to the server as given: relative paths resolve
//! against the login user's home directory.
//!
//! ## Error contract
//!
//! | Operation | Failure |
//! |-----------|---------|
//! | `exists` | open failures become `Ok(false)`; connection/channel errors propagate |
//! | `download` | [`TransferError`]; timestamp preservation is best-effort |
//! | `upload` | [`TransferError`], also logged |
//! | `create_remote_folder` | [`TransferError`] (`ParentMissing` when the parent is absent) |
//! | `execute` | [`ExecError`] |

use std::path::Path;
use std::time::{Duration, UNIX_EPOCH};

use tokio::io::{AsyncWriteExt, copy};
use tracing::{debug, error, info, warn};

use crate::ssh::error::{ExecError, TransferError};
use crate::ssh::report;
use crate::ssh::session::Session;
use crate::ssh::stream::RemoteStream;
use crate::ssh::transport::{RemoteIo, RemoteTimes, SftpChannel};

/// SFTP transfers and remote exec over a [`Session`].
#[derive(Debug)]
pub struct RemoteFileOps {
    session: Session,
}

impl RemoteFileOps {
    pub fn new(session: Session) -> Self {
        Self { session }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut Session {
        &mut self.session
    }

    pub fn into_session(self) -> Session {
        self.session
    }

    /// Whether `path` can be opened for reading.
    pub async fn exists(&mut self, path: &str) -> Result<bool, TransferError> {
        let sftp = self.open_sftp().await?;

        let found = match sftp.open_read(path).await {
            Ok(mut file) => {
                let _ = file.shutdown().await;
                true
            }
            Err(e) => {
                debug!("Remote path {} not readable: {}", path, e);
                false
            }
        };

        release(sftp).await;
        Ok(found)
    }

    /// Copy `remote_path` to `local_path`, truncating any existing local file.
    ///
    /// The local file gets the remote modification and access times when the
    /// server reports them. A failed copy leaves the partial local file in
    /// place.
    pub async fn download(
        &mut self,
        remote_path: &str,
        local_path: impl AsRef<Path>,
    ) -> Result<(), TransferError> {
        let local_path = local_path.as_ref();
        let sftp = self.open_sftp().await?;
        let result = download_with(sftp.as_ref(), remote_path, local_path).await;
        release(sftp).await;
        result
    }

    /// Copy `local_path` to `remote_path`, truncating any existing remote file.
    ///
    /// The local file is read fully into memory and sent in one write.
    /// Failures are logged and returned.
    pub async fn upload(
        &mut self,
        local_path: impl AsRef<Path>,
        remote_path: &str,
    ) -> Result<(), TransferError> {
        let local_path = local_path.as_ref();
        let result = match self.open_sftp().await {
            Ok(sftp) => {
                let result = upload_with(sftp.as_ref(), local_path, remote_path).await;
                release(sftp).await;
                result
            }
            Err(e) => Err(e),
        };

        if let Err(e) = &result {
            error!("Upload of {} failed: {}", local_path.display(), e);
        }
        result
    }

    /// Create directory `name` inside `parent_dir`, or inside the home
    /// directory when no parent is given. Intermediate directories are not
    /// created.
    pub async fn create_remote_folder(
        &mut self,
        name: &str,
        parent_dir: Option<&str>,
    ) -> Result<(), TransferError> {
        let sftp = self.open_sftp().await?;
        let result = create_folder_with(sftp.as_ref(), name, parent_dir).await;
        release(sftp).await;
        result
    }

    /// Run `command` and return a stream over its stdout.
    ///
    /// The caller drains and closes the stream. No timeout is applied.
    pub async fn execute(&mut self, command: &str) -> Result<RemoteStream, ExecError> {
        report!(self.session.config().debug(), "Executing {}", command);

        let transport = self.session.ensure_connected().await?;
        let io = transport
            .exec(command)
            .await
            .map_err(|message| ExecError::ChannelOpen {
                command: command.to_string(),
                message,
            })?;

        Ok(RemoteStream::new(io))
    }

    async fn open_sftp(&mut self) -> Result<Box<dyn SftpChannel>, TransferError> {
        let transport = self.session.ensure_connected().await?;
        transport
            .open_sftp()
            .await
            .map_err(TransferError::SftpUnavailable)
    }
}

async fn release(sftp: Box<dyn SftpChannel>) {
    if let Err(e) = sftp.close().await {
        debug!("SFTP channel close failed: {}", e);
    }
}

async fn download_with(
    sftp: &dyn SftpChannel,
    remote_path: &str,
    local_path: &Path,
) -> Result<(), TransferError> {
    let mut remote = sftp
        .open_read(remote_path)
        .await
        .map_err(|message| TransferError::RemoteOpen {
            path: remote_path.to_string(),
            message,
        })?;

    let copied = copy_to_local(&mut remote, remote_path, local_path).await;
    let _ = remote.shutdown().await;
    let bytes = copied?;

    info!(
        "Downloaded {} -> {} ({} bytes)",
        remote_path,
        local_path.display(),
        bytes
    );

    match sftp.times(remote_path).await {
        Ok(times) => {
            if let Err(e) = set_local_times(local_path, times).await {
                warn!(
                    "Could not preserve timestamps on {}: {}",
                    local_path.display(),
                    e
                );
            }
        }
        Err(e) => warn!("Could not read timestamps of {}: {}", remote_path, e),
    }

    Ok(())
}

async fn copy_to_local(
    remote: &mut Box<dyn RemoteIo>,
    remote_path: &str,
    local_path: &Path,
) -> Result<u64, TransferError> {
    let mut local = tokio::fs::File::create(local_path)
        .await
        .map_err(|source| TransferError::LocalOpen {
            path: local_path.display().to_string(),
            source,
        })?;

    let copy_error = |source: std::io::Error| TransferError::Copy {
        from: remote_path.to_string(),
        to: local_path.display().to_string(),
        source,
    };

    let bytes = copy(remote, &mut local).await.map_err(copy_error)?;
    local.flush().await.map_err(copy_error)?;
    Ok(bytes)
}

async fn set_local_times(local_path: &Path, times: RemoteTimes) -> std::io::Result<()> {
    if times == RemoteTimes::default() {
        return Ok(());
    }

    let to_system_time = |secs: u32| UNIX_EPOCH + Duration::from_secs(u64::from(secs));

    let mut file_times = std::fs::FileTimes::new();
    if let Some(modified) = times.modified {
        file_times = file_times.set_modified(to_system_time(modified));
    }
    if let Some(accessed) = times.accessed {
        file_times = file_times.set_accessed(to_system_time(accessed));
    }
    let path = local_path.to_path_buf();
    tokio::task::spawn_blocking(move || {
        std::fs::OpenOptions::new()
            .write(true)
            .open(&path)?
            .set_times(file_times)
    })
    .await
    .map_err(std::io::Error::other)?
}

async fn upload_with(
    sftp: &dyn SftpChannel,
    local_path: &Path,
    remote_path: &str,
) -> Result<(), TransferError> {
    let data = tokio::fs::read(local_path)
        .await
        .map_err(|source| TransferError::LocalRead {
            path: local_path.display().to_string(),
            source,
        })?;

    let mut remote = sftp
        .create(remote_path)
        .await
        .map_err(|message| TransferError::RemoteOpen {
            path: remote_path.to_string(),
            message,
        })?;

    let sent = send_all(&mut remote, &data).await;
    if sent.is_err() {
        let _ = remote.shutdown().await;
    }
    sent.map_err(|source| TransferError::Write {
        path: remote_path.to_string(),
        source,
    })?;

    info!(
        "Uploaded {} -> {} ({} bytes)",
        local_path.display(),
        remote_path,
        data.len()
    );
    Ok(())
}

async fn send_all(remote: &mut Box<dyn RemoteIo>, data: &[u8]) -> std::io::Result<()> {
    remote.write_all(data).await?;
    remote.flush().await?;
    remote.shutdown().await
}

/// Remote path of folder `name` under `parent`.
fn folder_path(name: &str, parent: Option<&str>) -> String {
    match parent {
        Some(parent) => {
            let parent = parent.trim_end_matches('/');
            if parent.is_empty() {
                format!("/{}", name)
            } else {
                format!("{}/{}", parent, name)
            }
        }
        None => name.to_string(),
    }
}

async fn create_folder_with(
    sftp: &dyn SftpChannel,
    name: &str,
    parent_dir: Option<&str>,
) -> Result<(), TransferError> {
    let parent_dir = parent_dir.filter(|p| !p.is_empty());

    if let Some(parent) = parent_dir {
        let present = match sftp.try_exists(parent).await {
            Ok(present) => present,
            Err(e) => {
                debug!("Existence check of {} failed: {}", parent, e);
                false
            }
        };
        if !present {
            return Err(TransferError::ParentMissing {
                name: name.to_string(),
                parent: parent.to_string(),
            });
        }
    }

    let path = folder_path(name, parent_dir);
    sftp.create_dir(&path)
        .await
        .map_err(|message| TransferError::CreateDir {
            path: path.clone(),
            message,
        })?;

    info!("Created remote folder {}", path);
    Ok(())
}
