use std::io::{ErrorKind, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;

use tracing::debug;

use crate::error::{Result, TransportError};

/// A connected station channel; implements Read + Write.
///
/// Wraps one TCP connection of a station session. The address of the remote
/// end is kept for diagnostics.
pub struct StationStream {
    inner: TcpStream,
    peer: SocketAddr,
}

impl Read for StationStream {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.inner.read(buf)
    }
}

impl Write for StationStream {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.inner.write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.inner.flush()
    }
}

impl StationStream {
    pub(crate) fn from_tcp(inner: TcpStream, peer: SocketAddr) -> Self {
        Self { inner, peer }
    }

    /// Connect to `host:port` (blocking).
    ///
    /// When `timeout` is set it bounds each connection attempt and is also
    /// applied as the read and write timeout of the returned stream. Every
    /// address `host` resolves to is tried in order.
    pub fn connect(host: &str, port: u16, timeout: Option<Duration>) -> Result<Self> {
        let addr = format!("{host}:{port}");
        let candidates = (host, port)
            .to_socket_addrs()
            .map_err(|source| TransportError::Connect {
                addr: addr.clone(),
                source,
            })?;

        let mut last_err = None;
        for candidate in candidates {
            let attempt = match timeout {
                Some(timeout) => TcpStream::connect_timeout(&candidate, timeout),
                None => TcpStream::connect(candidate),
            };
            match attempt {
                Ok(tcp) => {
                    let stream = Self::from_tcp(tcp, candidate);
                    stream.set_read_timeout(timeout)?;
                    stream.set_write_timeout(timeout)?;
                    stream.set_nodelay(true)?;
                    debug!(peer = %candidate, "connected to station channel");
                    return Ok(stream);
                }
                Err(err) => last_err = Some(err),
            }
        }

        Err(TransportError::Connect {
            addr,
            source: last_err.unwrap_or_else(|| {
                std::io::Error::new(ErrorKind::NotFound, "host resolved to no addresses")
            }),
        })
    }

    /// Set read timeout on the underlying stream. `None` blocks forever.
    pub fn set_read_timeout(&self, timeout: Option<Duration>) -> Result<()> {
        self.inner.set_read_timeout(timeout).map_err(Into::into)
    }

    /// Set write timeout on the underlying stream. `None` blocks forever.
    pub fn set_write_timeout(&self, timeout: Option<Duration>) -> Result<()> {
        self.inner.set_write_timeout(timeout).map_err(Into::into)
    }

    /// Current read timeout.
    pub fn read_timeout(&self) -> Result<Option<Duration>> {
        self.inner.read_timeout().map_err(Into::into)
    }

    /// Disable Nagle's algorithm so short command lines are sent immediately.
    pub fn set_nodelay(&self, nodelay: bool) -> Result<()> {
        self.inner.set_nodelay(nodelay).map_err(Into::into)
    }

    /// Try to clone this stream (creates a new file descriptor).
    pub fn try_clone(&self) -> Result<Self> {
        let cloned = self.inner.try_clone()?;
        Ok(Self::from_tcp(cloned, self.peer))
    }

    /// Remote address of this channel.
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    /// Local address of this channel.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.inner.local_addr().map_err(Into::into)
    }

    /// Shut down both halves of the connection.
    ///
    /// Shutting down an already disconnected stream is not an error.
    pub fn shutdown(&self) -> Result<()> {
        match self.inner.shutdown(Shutdown::Both) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotConnected => Ok(()),
            Err(err) => Err(TransportError::Io(err)),
        }
    }
}

impl std::fmt::Debug for StationStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StationStream")
            .field("peer", &self.peer)
            .finish()
    }
}

/// Returns true if `err` is a socket read/write deadline expiring.
///
/// Unix reports an elapsed socket timeout as `WouldBlock`, Windows as
/// `TimedOut`.
pub fn is_timeout(err: &std::io::Error) -> bool {
    matches!(err.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;

    #[test]
    fn connect_applies_timeouts() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();

        let stream =
            StationStream::connect("127.0.0.1", port, Some(Duration::from_millis(250))).unwrap();
        let _server = listener.accept().unwrap();

        assert_eq!(
            stream.read_timeout().unwrap(),
            Some(Duration::from_millis(250))
        );
        assert_eq!(stream.peer_addr().port(), port);
    }

    #[test]
    fn connect_refused_reports_address() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let err = StationStream::connect("127.0.0.1", port, Some(Duration::from_millis(250)))
            .unwrap_err();
        match err {
            TransportError::Connect { addr, .. } => assert_eq!(addr, format!("127.0.0.1:{port}")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn read_times_out_without_data() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();

        let mut stream =
            StationStream::connect("127.0.0.1", port, Some(Duration::from_millis(20))).unwrap();
        let _server = listener.accept().unwrap();

        let mut buf = [0u8; 4];
        let err = stream.read(&mut buf).unwrap_err();
        assert!(is_timeout(&err));
    }

    #[test]
    fn shutdown_is_idempotent() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();

        let stream = StationStream::connect("127.0.0.1", port, None).unwrap();
        let _server = listener.accept().unwrap();

        stream.shutdown().unwrap();
        stream.shutdown().unwrap();
    }
}
