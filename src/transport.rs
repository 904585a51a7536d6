//! The connection facade and the provided TCP/TLS transport.
//!
//! The engine consumes any [`Connection`]: connect, write one line,
//! stream decoded lines, disconnect. [`TcpConnection`] implements it
//! over plain TCP or TLS with the line codec from [`crate::codec`];
//! tests substitute channel-backed fakes.

use std::io;
use std::sync::Arc;

use futures_util::future::BoxFuture;
use futures_util::stream::{BoxStream, SplitSink};
use futures_util::{FutureExt, SinkExt, StreamExt};
use thiserror::Error;
use tokio::net::TcpStream;
use tokio_rustls::client::TlsStream;
use tokio_rustls::rustls;
use tokio_rustls::TlsConnector;
use tokio_util::codec::Framed;
use tracing::warn;

use crate::codec::IrcCodec;
use crate::config::Config;

/// Maximum outbound payload per line, excluding the CR/LF terminator.
pub const MAX_LINE_LEN: usize = 510;

/// Ceiling for inbound lines (the IRCv3 tag block allowance dominates).
pub const MAX_INBOUND_LINE_LEN: usize = 8191;

/// Errors surfaced by a [`Connection`].
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TransportError {
    /// I/O error during reading or writing.
    #[error("io error: {0}")]
    Io(#[from] io::Error),

    /// Inbound line exceeded the protocol ceiling.
    #[error("message too long: {0} bytes")]
    MessageTooLong(usize),

    /// Host name was not a valid TLS server name.
    #[error("invalid server name: {0}")]
    InvalidServerName(String),

    /// The connection is not open.
    #[error("connection closed")]
    Closed,
}

/// The contract the engine consumes from any transport.
///
/// `incoming` yields one element per received line with the terminator
/// stripped; it may be called once per connect. `send` takes the line
/// without its terminator; the transport appends `\r\n`.
pub trait Connection: Send {
    /// Establish the connection described by `config`.
    fn connect<'a>(&'a mut self, config: &'a Config)
        -> BoxFuture<'a, Result<(), TransportError>>;

    /// Write one line.
    fn send<'a>(&'a mut self, line: &'a str) -> BoxFuture<'a, Result<(), TransportError>>;

    /// The stream of decoded inbound lines.
    fn incoming(&mut self) -> BoxStream<'static, Result<String, TransportError>>;

    /// Close the connection.
    fn disconnect(&mut self) -> BoxFuture<'_, Result<(), TransportError>>;
}

enum WriteHalf {
    Tcp(SplitSink<Framed<TcpStream, IrcCodec>, String>),
    Tls(SplitSink<Framed<TlsStream<TcpStream>, IrcCodec>, String>),
}

/// The provided transport: plain TCP or TLS, framed by [`IrcCodec`].
#[derive(Default)]
pub struct TcpConnection {
    write: Option<WriteHalf>,
    read: Option<BoxStream<'static, Result<String, TransportError>>>,
}

impl TcpConnection {
    pub fn new() -> TcpConnection {
        TcpConnection::default()
    }

    fn enable_keepalive(stream: &TcpStream) -> io::Result<()> {
        use std::time::Duration;

        use socket2::{SockRef, TcpKeepalive};

        let sock = SockRef::from(stream);
        let keepalive = TcpKeepalive::new()
            .with_time(Duration::from_secs(120))
            .with_interval(Duration::from_secs(30));
        sock.set_tcp_keepalive(&keepalive)
    }

    fn tls_config() -> rustls::ClientConfig {
        let root_store =
            rustls::RootCertStore::from_iter(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
        rustls::ClientConfig::builder()
            .with_root_certificates(root_store)
            .with_no_client_auth()
    }
}

impl Connection for TcpConnection {
    fn connect<'a>(
        &'a mut self,
        config: &'a Config,
    ) -> BoxFuture<'a, Result<(), TransportError>> {
        async move {
            let stream = TcpStream::connect((config.host.as_str(), config.port)).await?;
            if let Err(e) = Self::enable_keepalive(&stream) {
                warn!("failed to enable TCP keepalive: {}", e);
            }

            if config.tls {
                let connector = TlsConnector::from(Arc::new(Self::tls_config()));
                let server_name = rustls::pki_types::ServerName::try_from(config.host.clone())
                    .map_err(|_| TransportError::InvalidServerName(config.host.clone()))?;
                let stream = connector.connect(server_name, stream).await?;
                let (write, read) = Framed::new(stream, IrcCodec::new()).split();
                self.write = Some(WriteHalf::Tls(write));
                self.read = Some(read.boxed());
            } else {
                let (write, read) = Framed::new(stream, IrcCodec::new()).split();
                self.write = Some(WriteHalf::Tcp(write));
                self.read = Some(read.boxed());
            }
            Ok(())
        }
        .boxed()
    }

    fn send<'a>(&'a mut self, line: &'a str) -> BoxFuture<'a, Result<(), TransportError>> {
        async move {
            match self.write.as_mut() {
                Some(WriteHalf::Tcp(sink)) => sink.send(line.to_string()).await,
                Some(WriteHalf::Tls(sink)) => sink.send(line.to_string()).await,
                None => Err(TransportError::Closed),
            }
        }
        .boxed()
    }

    fn incoming(&mut self) -> BoxStream<'static, Result<String, TransportError>> {
        self.read
            .take()
            .unwrap_or_else(|| futures_util::stream::empty().boxed())
    }

    fn disconnect(&mut self) -> BoxFuture<'_, Result<(), TransportError>> {
        async move {
            self.read = None;
            match self.write.take() {
                Some(WriteHalf::Tcp(mut sink)) => sink.close().await,
                Some(WriteHalf::Tls(mut sink)) => sink.close().await,
                None => Ok(()),
            }
        }
        .boxed()
    }
}

impl std::fmt::Debug for TcpConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TcpConnection")
            .field("connected", &self.write.is_some())
            .finish()
    }
}
