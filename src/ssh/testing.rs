//! In-memory SSH server double for unit tests.
//!
//! [`MockServer`] implements [`Connector`] and hands out transports whose
//! authentication outcomes are scripted through [`MockServerBuilder`]. Its
//! SFTP channels operate on an in-memory file tree and count open handles so
//! tests can assert that every handle is released.

use std::collections::{HashMap, HashSet};
use std::io::{self, Cursor};
use std::path::Path;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex, MutexGuard};
use std::task::{Context, Poll};

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};

use crate::ssh::session::DisconnectNotice;
use crate::ssh::transport::{
    Connector, DisconnectHook, RemoteIo, RemoteTimes, SftpChannel, Transport,
};

#[derive(Default)]
struct Script {
    accept_none: bool,
    password: Option<String>,
    accept_key: bool,
    none_error: Option<String>,
    unreachable: bool,
    fail_sftp: bool,
    fail_exec: bool,
    fail_writes: bool,
}

#[derive(Default)]
struct ServerState {
    calls: Vec<String>,
    executed: Vec<String>,
    connected_to: Vec<(String, u16)>,
    closes: usize,
    generation: u64,
    hook: Option<DisconnectHook>,
    files: HashMap<String, Vec<u8>>,
    times: HashMap<String, RemoteTimes>,
    dirs: HashSet<String>,
    open_files: usize,
    open_channels: usize,
}

pub(crate) struct MockServerBuilder {
    script: Script,
}

impl MockServerBuilder {
    pub(crate) fn accept_none(mut self) -> Self {
        self.script.accept_none = true;
        self
    }

    pub(crate) fn accept_password(mut self, password: &str) -> Self {
        self.script.password = Some(password.to_string());
        self
    }

    pub(crate) fn accept_key(mut self) -> Self {
        self.script.accept_key = true;
        self
    }

    /// Make the `none` primitive fail with a transport error.
    pub(crate) fn fail_none(mut self, message: &str) -> Self {
        self.script.none_error = Some(message.to_string());
        self
    }

    pub(crate) fn unreachable(mut self) -> Self {
        self.script.unreachable = true;
        self
    }

    pub(crate) fn fail_sftp(mut self) -> Self {
        self.script.fail_sftp = true;
        self
    }

    pub(crate) fn fail_exec(mut self) -> Self {
        self.script.fail_exec = true;
        self
    }

    pub(crate) fn fail_writes(mut self) -> Self {
        self.script.fail_writes = true;
        self
    }

    pub(crate) fn build(self) -> MockServer {
        MockServer {
            script: Arc::new(self.script),
            state: Arc::new(StdMutex::new(ServerState::default())),
        }
    }
}

#[derive(Clone)]
pub(crate) struct MockServer {
    script: Arc<Script>,
    state: Arc<StdMutex<ServerState>>,
}

impl MockServer {
    pub(crate) fn builder() -> MockServerBuilder {
        MockServerBuilder {
            script: Script::default(),
        }
    }

    fn state(&self) -> MutexGuard<'_, ServerState> {
        self.state.lock().unwrap()
    }

    pub(crate) fn connector(&self) -> Arc<dyn Connector> {
        Arc::new(self.clone())
    }

    /// A connected, unauthenticated transport without a disconnect hook.
    pub(crate) fn transport(&self) -> Box<dyn Transport> {
        let generation = self.state().generation;
        Box::new(MockTransport {
            server: self.clone(),
            generation,
            closed: false,
        })
    }

    /// Authentication primitives called so far, e.g. `"password:u"`.
    pub(crate) fn calls(&self) -> Vec<String> {
        self.state().calls.clone()
    }

    pub(crate) fn executed(&self) -> Vec<String> {
        self.state().executed.clone()
    }

    pub(crate) fn connected_to(&self) -> Vec<(String, u16)> {
        self.state().connected_to.clone()
    }

    pub(crate) fn connect_count(&self) -> usize {
        self.state().connected_to.len()
    }

    pub(crate) fn close_count(&self) -> usize {
        self.state().closes
    }

    /// Drop every live transport and notify the last connected session.
    pub(crate) fn server_disconnect(&self, reason_code: u32, message: &str, language_tag: &str) {
        let hook = {
            let mut state = self.state();
            state.generation += 1;
            state.hook.clone()
        };
        if let Some(hook) = hook {
            hook(DisconnectNotice {
                reason_code,
                message: message.to_string(),
                language_tag: language_tag.to_string(),
            });
        }
    }

    pub(crate) fn put_file(&self, path: &str, content: &[u8], times: RemoteTimes) {
        let mut state = self.state();
        state.files.insert(path.to_string(), content.to_vec());
        state.times.insert(path.to_string(), times);
    }

    pub(crate) fn file(&self, path: &str) -> Option<Vec<u8>> {
        self.state().files.get(path).cloned()
    }

    pub(crate) fn add_dir(&self, path: &str) {
        self.state().dirs.insert(path.to_string());
    }

    pub(crate) fn has_dir(&self, path: &str) -> bool {
        self.state().dirs.contains(path)
    }

    pub(crate) fn open_files(&self) -> usize {
        self.state().open_files
    }

    pub(crate) fn open_channels(&self) -> usize {
        self.state().open_channels
    }
}

#[async_trait]
impl Connector for MockServer {
    async fn connect(
        &self,
        host: &str,
        port: u16,
        on_disconnect: DisconnectHook,
    ) -> Result<Box<dyn Transport>, String> {
        {
            let mut state = self.state();
            state.connected_to.push((host.to_string(), port));
            if self.script.unreachable {
                return Err("Failed to connect: Connection refused".to_string());
            }
            state.hook = Some(on_disconnect);
        }
        Ok(self.transport())
    }
}

struct MockTransport {
    server: MockServer,
    generation: u64,
    closed: bool,
}

#[async_trait]
impl Transport for MockTransport {
    async fn authenticate_none(&mut self, username: &str) -> Result<bool, String> {
        self.server.state().calls.push(format!("none:{}", username));
        if let Some(e) = &self.server.script.none_error {
            return Err(e.clone());
        }
        Ok(self.server.script.accept_none)
    }

    async fn authenticate_password(
        &mut self,
        username: &str,
        password: &str,
    ) -> Result<bool, String> {
        self.server
            .state()
            .calls
            .push(format!("password:{}", username));
        Ok(self.server.script.password.as_deref() == Some(password))
    }

    async fn authenticate_publickey(
        &mut self,
        username: &str,
        _public_key: &Path,
        private_key: &Path,
        passphrase: Option<&str>,
    ) -> Result<bool, String> {
        self.server.state().calls.push(format!(
            "publickey:{}:{}:{}",
            username,
            private_key.display(),
            passphrase.unwrap_or_default()
        ));
        Ok(self.server.script.accept_key)
    }

    async fn open_sftp(&self) -> Result<Box<dyn SftpChannel>, String> {
        if self.server.script.fail_sftp {
            return Err("subsystem request failed".to_string());
        }
        self.server.state().open_channels += 1;
        Ok(Box::new(MockSftp {
            server: self.server.clone(),
            closed: AtomicBool::new(false),
        }))
    }

    async fn exec(&self, command: &str) -> Result<Box<dyn RemoteIo>, String> {
        if self.server.script.fail_exec {
            return Err("channel open refused".to_string());
        }
        self.server.state().executed.push(command.to_string());
        let output = command
            .strip_prefix("echo ")
            .map(|text| format!("{}\n", text))
            .unwrap_or_default();
        Ok(Box::new(Cursor::new(output.into_bytes())))
    }

    fn is_valid(&self) -> bool {
        !self.closed && self.server.state().generation == self.generation
    }

    async fn close(&mut self) -> Result<(), String> {
        self.server.state().closes += 1;
        self.closed = true;
        Ok(())
    }
}

fn parent_missing(state: &ServerState, path: &str) -> bool {
    match path.rsplit_once('/') {
        Some((parent, _)) if !parent.is_empty() => !state.dirs.contains(parent),
        _ => false,
    }
}

struct MockSftp {
    server: MockServer,
    closed: AtomicBool,
}

#[async_trait]
impl SftpChannel for MockSftp {
    async fn open_read(&self, path: &str) -> Result<Box<dyn RemoteIo>, String> {
        let content = {
            let state = self.server.state();
            match state.files.get(path) {
                Some(content) => content.clone(),
                None if state.dirs.contains(path) => Vec::new(),
                None => return Err("No such file".to_string()),
            }
        };
        Ok(Box::new(MemFile::open(&self.server, content, None)))
    }

    async fn create(&self, path: &str) -> Result<Box<dyn RemoteIo>, String> {
        {
            let mut state = self.server.state();
            if parent_missing(&state, path) || state.dirs.contains(path) {
                return Err("No such file".to_string());
            }
            state.files.insert(path.to_string(), Vec::new());
        }
        Ok(Box::new(MemFile::open(
            &self.server,
            Vec::new(),
            Some(path.to_string()),
        )))
    }

    async fn times(&self, path: &str) -> Result<RemoteTimes, String> {
        let state = self.server.state();
        if !state.files.contains_key(path) {
            return Err("No such file".to_string());
        }
        Ok(state.times.get(path).copied().unwrap_or_default())
    }

    async fn try_exists(&self, path: &str) -> Result<bool, String> {
        let path = path.trim_end_matches('/');
        let state = self.server.state();
        Ok(state.files.contains_key(path) || state.dirs.contains(path))
    }

    async fn create_dir(&self, path: &str) -> Result<(), String> {
        let mut state = self.server.state();
        if state.files.contains_key(path) || state.dirs.contains(path) {
            return Err("File exists".to_string());
        }
        if parent_missing(&state, path) {
            return Err("No such file".to_string());
        }
        state.dirs.insert(path.to_string());
        Ok(())
    }

    async fn close(&self) -> Result<(), String> {
        if !self.closed.swap(true, Ordering::SeqCst) {
            self.server.state().open_channels -= 1;
        }
        Ok(())
    }
}

/// Remote file handle. Writes land in the server's file tree immediately.
struct MemFile {
    server: MockServer,
    data: Cursor<Vec<u8>>,
    sink: Option<String>,
}

impl MemFile {
    fn open(server: &MockServer, content: Vec<u8>, sink: Option<String>) -> Self {
        server.state().open_files += 1;
        Self {
            server: server.clone(),
            data: Cursor::new(content),
            sink,
        }
    }
}

impl Drop for MemFile {
    fn drop(&mut self) {
        if let Ok(mut state) = self.server.state.lock() {
            state.open_files -= 1;
        }
    }
}

impl AsyncRead for MemFile {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().data).poll_read(cx, buf)
    }
}

impl AsyncWrite for MemFile {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        let Some(path) = &self.sink else {
            return Poll::Ready(Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "opened read-only",
            )));
        };
        if self.server.script.fail_writes {
            return Poll::Ready(Err(io::Error::other("Failure: disk full")));
        }
        self.server
            .state()
            .files
            .entry(path.clone())
            .or_default()
            .extend_from_slice(buf);
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}
