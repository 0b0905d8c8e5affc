//! Byte stream over an exec channel or a remote file handle.

use std::fmt;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, ReadBuf};

use crate::ssh::transport::RemoteIo;

/// A forward-only byte stream owned by the caller.
///
/// Reading yields the remote command's stdout (or the file content). The
/// stream is not rewound or resumed; drain it and [`close`](Self::close) it
/// when done.
pub struct RemoteStream {
    inner: Box<dyn RemoteIo>,
}

impl RemoteStream {
    pub(crate) fn new(inner: Box<dyn RemoteIo>) -> Self {
        Self { inner }
    }

    /// Read until end of stream.
    pub async fn drain(&mut self) -> io::Result<Vec<u8>> {
        let mut output = Vec::with_capacity(4096);
        self.inner.read_to_end(&mut output).await?;
        Ok(output)
    }

    /// Read until end of stream, decoding invalid UTF-8 lossily.
    pub async fn drain_to_string(&mut self) -> io::Result<String> {
        let output = self.drain().await?;
        Ok(String::from_utf8_lossy(&output).into_owned())
    }

    /// Shut down the stream, releasing the remote channel.
    pub async fn close(mut self) -> io::Result<()> {
        self.inner.shutdown().await
    }
}

impl fmt::Debug for RemoteStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteStream").finish_non_exhaustive()
    }
}

impl AsyncRead for RemoteStream {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_read(cx, buf)
    }
}

impl AsyncWrite for RemoteStream {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.inner).poll_write(cx, buf)
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_flush(cx)
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_shutdown(cx)
    }
}
