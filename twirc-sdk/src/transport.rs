//! Byte transport underneath the client.
//!
//! The client only needs three things from a connection: a receive that
//! gives up after a timeout, a line send, and a close. [`TcpTransport`] is
//! the plain-TCP implementation used for Twitch.

use std::io;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::runtime::{Builder, Runtime};

/// A connection the client can drive from `tick`.
pub trait Transport {
    /// Wait up to `timeout` for data and copy it into `buf`.
    ///
    /// `Ok(None)` means the timeout elapsed, `Ok(Some(0))` means the peer
    /// closed the connection.
    fn recv(&mut self, buf: &mut [u8], timeout: Duration) -> io::Result<Option<usize>>;

    /// Send one protocol line. The transport appends `\r\n`.
    fn send(&mut self, line: &str) -> io::Result<()>;

    /// Close the connection. Further calls fail or do nothing.
    fn close(&mut self) -> io::Result<()>;
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn recv(&mut self, buf: &mut [u8], timeout: Duration) -> io::Result<Option<usize>> {
        (**self).recv(buf, timeout)
    }

    fn send(&mut self, line: &str) -> io::Result<()> {
        (**self).send(line)
    }

    fn close(&mut self) -> io::Result<()> {
        (**self).close()
    }
}

/// Plain TCP connection driven by a private current-thread tokio runtime.
///
/// The runtime has no worker threads: all I/O happens inside `recv`/`send`
/// on the caller's thread.
pub struct TcpTransport {
    runtime: Runtime,
    stream: Option<TcpStream>,
}

impl TcpTransport {
    /// Connect to `host:port`, giving up after `timeout`.
    pub fn connect(host: &str, port: u16, timeout: Duration) -> io::Result<Self> {
        let runtime = Builder::new_current_thread().enable_io().enable_time().build()?;
        let addr = format!("{host}:{port}");
        let stream = runtime.block_on(async {
            match tokio::time::timeout(timeout, TcpStream::connect(&addr)).await {
                Ok(stream) => stream,
                Err(_) => Err(io::Error::new(
                    io::ErrorKind::TimedOut,
                    format!("connect timed out after {}ms", timeout.as_millis()),
                )),
            }
        })?;
        stream.set_nodelay(true)?;
        tracing::debug!(%addr, "TCP connected");
        Ok(Self {
            runtime,
            stream: Some(stream),
        })
    }
}

fn open(stream: &mut Option<TcpStream>) -> io::Result<&mut TcpStream> {
    stream
        .as_mut()
        .ok_or_else(|| io::Error::from(io::ErrorKind::NotConnected))
}

impl Transport for TcpTransport {
    fn recv(&mut self, buf: &mut [u8], timeout: Duration) -> io::Result<Option<usize>> {
        let stream = open(&mut self.stream)?;
        // `read` is cancel safe, nothing is lost when the timeout wins.
        self.runtime.block_on(async {
            match tokio::time::timeout(timeout, stream.read(buf)).await {
                Ok(read) => read.map(Some),
                Err(_) => Ok(None),
            }
        })
    }

    fn send(&mut self, line: &str) -> io::Result<()> {
        let wire = format!("{line}\r\n");
        let stream = open(&mut self.stream)?;
        let write = async {
            stream.write_all(wire.as_bytes()).await?;
            stream.flush().await
        };
        self.runtime.block_on(write)
    }

    fn close(&mut self) -> io::Result<()> {
        match self.stream.take() {
            Some(mut stream) => self.runtime.block_on(stream.shutdown()),
            None => Ok(()),
        }
    }
}
