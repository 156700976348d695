use std::net::{SocketAddr, TcpListener};

use tracing::{debug, info};

use crate::error::{Result, TransportError};
use crate::stream::StationStream;

/// Listening side of one station channel.
///
/// The station protocol serves a single client per port, so the listener is
/// typically accepted from exactly once.
pub struct StationListener {
    listener: TcpListener,
    local: SocketAddr,
    name: &'static str,
}

impl StationListener {
    /// Bind and listen on `host:port`. Port 0 picks an ephemeral port.
    ///
    /// `name` labels the channel in log output.
    pub fn bind(host: &str, port: u16, name: &'static str) -> Result<Self> {
        let addr = format!("{host}:{port}");
        let listener = TcpListener::bind(&addr).map_err(|source| TransportError::Bind {
            addr: addr.clone(),
            source,
        })?;
        let local = listener
            .local_addr()
            .map_err(|source| TransportError::Bind { addr, source })?;

        info!(channel = name, %local, "listening for station client");

        Ok(Self {
            listener,
            local,
            name,
        })
    }

    /// Accept an incoming connection (blocking).
    pub fn accept(&self) -> Result<StationStream> {
        let (stream, peer) = self.listener.accept().map_err(TransportError::Accept)?;
        stream.set_nodelay(true)?;
        debug!(channel = self.name, %peer, "accepted station client");
        Ok(StationStream::from_tcp(stream, peer))
    }

    /// The address this listener is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local
    }

    /// The port this listener is bound to.
    pub fn port(&self) -> u16 {
        self.local.port()
    }

    /// Channel label used in diagnostics.
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl std::fmt::Debug for StationListener {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StationListener")
            .field("name", &self.name)
            .field("local", &self.local)
            .finish()
    }
}
