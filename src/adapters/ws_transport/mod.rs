//! Resilient WebSocket-over-TLS client for the operator-console link.
//!
//! ## Connection model
//!
//! One worker thread owns the loop:
//!
//! 1. Abort whatever connection is left over.
//! 2. TCP connect, TLS handshake with client certificate and a pinned
//!    server certificate, then the WebSocket upgrade.
//! 3. Read until the peer closes or an error occurs.
//! 4. Wait `reconnect_delay` and go back to 1. Forever.
//!
//! ```text
//!   ┌──────────┐ ok  ┌───────────┐ close/reset ┌──────────────┐
//!   │ connect  │────▶│ receiving │────────────▶│ disconnected │──┐
//!   └──────────┘     └───────────┘             └──────────────┘  │
//!        │ err            │ err                                  │
//!        ▼                ▼                                      │
//!   ┌─────────────────────────┐                                  │
//!   │ exception               │───────── reconnect_delay ────────┘
//!   └─────────────────────────┘
//! ```
//!
//! The socket read timeout is kept short once connected, so the receive
//! loop releases the connection lock regularly and [`send_binary`]
//! / [`send_text`] from other threads get a turn.
//!
//! [`send_binary`]: ResilientTransport::send_binary
//! [`send_text`]: ResilientTransport::send_text

pub mod pinning;

use core::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::io;
use std::net::{Shutdown, TcpStream, ToSocketAddrs};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::JoinHandle;
use std::time::Duration;

use log::{debug, info, warn};
use rustls::pki_types::ServerName;
use rustls::{ClientConfig, ClientConnection, StreamOwned};
use serde::Serialize;
use tungstenite::client::IntoClientRequest;
use tungstenite::error::ProtocolError;
use tungstenite::handshake::HandshakeError;
use tungstenite::http::Uri;
use tungstenite::{Message, WebSocket};

use crate::adapters::cert_store::CertificateIdentity;
use crate::app::ports::TransportHandler;
use crate::drivers::task;
use crate::error::TransportError;

use pinning::PinnedServerVerifier;

type TlsStream = StreamOwned<ClientConnection, TcpStream>;
type Socket = WebSocket<TlsStream>;

const DEFAULT_WSS_PORT: u16 = 443;

// ───────────────────────────────────────────────────────────────
// Settings and counters
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransportSettings {
    /// Pause between attempts. Zero retries immediately.
    pub reconnect_delay: Duration,
    /// Socket read timeout while connected.
    pub read_poll: Duration,
    /// Bound on TCP connect plus the TLS and WebSocket handshakes.
    pub handshake_timeout: Duration,
}

impl Default for TransportSettings {
    fn default() -> Self {
        Self {
            reconnect_delay: Duration::from_millis(1000),
            read_poll: Duration::from_millis(100),
            handshake_timeout: Duration::from_millis(10_000),
        }
    }
}

#[derive(Debug, Default)]
struct TransportStats {
    attempts: AtomicU64,
    connects: AtomicU64,
    disconnects: AtomicU64,
    exceptions: AtomicU64,
    messages: AtomicU64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TransportStatsSnapshot {
    pub connected: bool,
    pub attempts: u64,
    pub connects: u64,
    pub disconnects: u64,
    pub exceptions: u64,
    pub messages: u64,
}

// ───────────────────────────────────────────────────────────────
// Target
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
struct Target {
    uri: Uri,
    host: String,
    port: u16,
    server_name: ServerName<'static>,
}

impl Target {
    fn parse(uri: &str) -> Result<Self, TransportError> {
        let uri: Uri = uri.parse().map_err(|_| TransportError::InvalidUri)?;
        if uri.scheme_str() != Some("wss") {
            return Err(TransportError::InvalidUri);
        }
        let host = uri
            .host()
            .ok_or(TransportError::InvalidUri)?
            .trim_start_matches('[')
            .trim_end_matches(']')
            .to_owned();
        let port = uri.port_u16().unwrap_or(DEFAULT_WSS_PORT);
        let server_name =
            ServerName::try_from(host.clone()).map_err(|_| TransportError::InvalidUri)?;
        Ok(Self {
            uri,
            host,
            port,
            server_name,
        })
    }
}

// ───────────────────────────────────────────────────────────────
// ResilientTransport
// ───────────────────────────────────────────────────────────────

pub struct ResilientTransport {
    target: Target,
    tls: Arc<ClientConfig>,
    settings: TransportSettings,
    connection: Mutex<Option<Socket>>,
    connected: AtomicBool,
    stats: TransportStats,
}

impl ResilientTransport {
    /// Validate the target and build the TLS client configuration.
    /// Nothing is dialled until [`run`](Self::run).
    pub fn new(
        uri: &str,
        identity: CertificateIdentity,
        settings: TransportSettings,
    ) -> Result<Self, TransportError> {
        let target = Target::parse(uri)?;
        let (chain, key, pinned) = identity.into_parts();

        let provider = Arc::new(rustls::crypto::ring::default_provider());
        let verifier = Arc::new(PinnedServerVerifier::new(pinned, provider.clone()));
        let tls = ClientConfig::builder_with_provider(provider)
            .with_safe_default_protocol_versions()
            .map_err(|_| TransportError::Tls)?
            .dangerous()
            .with_custom_certificate_verifier(verifier)
            .with_client_auth_cert(chain, key)
            .map_err(|e| {
                warn!("WS: client identity rejected: {e}");
                TransportError::InvalidIdentity
            })?;

        info!("WS: target {}:{}", target.host, target.port);

        Ok(Self {
            target,
            tls: Arc::new(tls),
            settings,
            connection: Mutex::new(None),
            connected: AtomicBool::new(false),
            stats: TransportStats::default(),
        })
    }

    fn lock(&self) -> MutexGuard<'_, Option<Socket>> {
        self.connection.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    pub fn stats(&self) -> TransportStatsSnapshot {
        TransportStatsSnapshot {
            connected: self.is_connected(),
            attempts: self.stats.attempts.load(Ordering::Relaxed),
            connects: self.stats.connects.load(Ordering::Relaxed),
            disconnects: self.stats.disconnects.load(Ordering::Relaxed),
            exceptions: self.stats.exceptions.load(Ordering::Relaxed),
            messages: self.stats.messages.load(Ordering::Relaxed),
        }
    }

    /// Run the connect/receive loop on a named worker thread.
    pub fn spawn<H>(self: Arc<Self>, mut handler: H) -> crate::error::Result<JoinHandle<()>>
    where
        H: TransportHandler + 'static,
    {
        task::spawn_named("ws-link", 256, move || {
            self.run(&mut handler);
        })
    }

    /// Connect, receive, reconnect. Never returns.
    pub fn run(&self, handler: &mut impl TransportHandler) -> ! {
        loop {
            self.abort_connection();
            self.stats.attempts.fetch_add(1, Ordering::Relaxed);

            match self.connect_once() {
                Ok(socket) => {
                    *self.lock() = Some(socket);
                    self.connected.store(true, Ordering::Release);
                    self.stats.connects.fetch_add(1, Ordering::Relaxed);
                    info!("WS: connected to {}", self.target.uri);
                    handler.on_connected();
                    self.receive(handler);
                }
                Err(e) => self.fail(handler, e),
            }

            self.connected.store(false, Ordering::Release);
            if !self.settings.reconnect_delay.is_zero() {
                std::thread::sleep(self.settings.reconnect_delay);
            }
        }
    }

    pub fn send_binary(&self, payload: &[u8]) -> Result<(), TransportError> {
        self.send(Message::binary(payload.to_vec()))
    }

    pub fn send_text(&self, text: &str) -> Result<(), TransportError> {
        self.send(Message::text(text))
    }

    fn send(&self, message: Message) -> Result<(), TransportError> {
        let mut guard = self.lock();
        let socket = guard.as_mut().ok_or(TransportError::NotConnected)?;
        socket.send(message).map_err(|e| {
            warn!("WS: send failed: {e}");
            TransportError::Write
        })
    }

    fn fail(&self, handler: &mut impl TransportHandler, error: TransportError) {
        self.stats.exceptions.fetch_add(1, Ordering::Relaxed);
        warn!("WS: {}", error);
        handler.on_exception(error);
    }

    /// Drop the current connection without a closing handshake.
    fn abort_connection(&self) {
        self.connected.store(false, Ordering::Release);
        if let Some(mut socket) = self.lock().take() {
            let _ = socket.get_mut().sock.shutdown(Shutdown::Both);
            debug!("WS: previous connection aborted");
        }
    }

    fn open_tcp(&self) -> Result<TcpStream, TransportError> {
        let addrs = (self.target.host.as_str(), self.target.port)
            .to_socket_addrs()
            .map_err(|e| {
                warn!("WS: cannot resolve {}: {e}", self.target.host);
                TransportError::Connect
            })?;

        let mut last = None;
        for addr in addrs {
            match TcpStream::connect_timeout(&addr, self.settings.handshake_timeout) {
                Ok(stream) => return Ok(stream),
                Err(e) => last = Some(e),
            }
        }
        if let Some(e) = last {
            debug!("WS: connect failed: {e}");
        }
        Err(TransportError::Connect)
    }

    fn connect_once(&self) -> Result<Socket, TransportError> {
        let tcp = self.open_tcp()?;
        let io_err = |_| TransportError::Connect;
        tcp.set_nodelay(true).map_err(io_err)?;
        tcp.set_read_timeout(Some(self.settings.handshake_timeout))
            .map_err(io_err)?;
        tcp.set_write_timeout(Some(self.settings.handshake_timeout))
            .map_err(io_err)?;

        let session = ClientConnection::new(self.tls.clone(), self.target.server_name.clone())
            .map_err(|_| TransportError::Tls)?;
        let stream = StreamOwned::new(session, tcp);

        let request = (&self.target.uri)
            .into_client_request()
            .map_err(|_| TransportError::InvalidUri)?;
        let (socket, _response) = tungstenite::client::client(request, stream).map_err(|e| {
            match e {
                HandshakeError::Failure(tungstenite::Error::Io(io)) => classify_io(&io),
                HandshakeError::Failure(other) => {
                    debug!("WS: upgrade failed: {other}");
                    TransportError::Handshake
                }
                HandshakeError::Interrupted(_) => TransportError::Handshake,
            }
        })?;

        socket
            .get_ref()
            .sock
            .set_read_timeout(Some(self.settings.read_poll))
            .map_err(io_err)?;
        Ok(socket)
    }

    fn receive(&self, handler: &mut impl TransportHandler) {
        loop {
            let inbound = {
                let mut guard = self.lock();
                let Some(socket) = guard.as_mut() else {
                    return;
                };
                let read = socket.read();
                if matches!(read, Ok(Message::Close(_))) {
                    // Let tungstenite put the close reply on the wire.
                    let _ = socket.flush();
                }
                read
            };

            match inbound {
                Ok(Message::Binary(data)) => self.deliver(&data, handler),
                Ok(Message::Text(text)) => self.deliver(text.as_bytes(), handler),
                Ok(Message::Close(frame)) => {
                    info!("WS: closed by peer ({:?})", frame.map(|f| f.code));
                    self.disconnected(handler);
                    return;
                }
                Ok(_) => {}
                Err(tungstenite::Error::Io(ref e))
                    if matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut) => {}
                Err(
                    tungstenite::Error::ConnectionClosed
                    | tungstenite::Error::AlreadyClosed
                    | tungstenite::Error::Protocol(ProtocolError::ResetWithoutClosingHandshake),
                ) => {
                    info!("WS: connection closed");
                    self.disconnected(handler);
                    return;
                }
                Err(tungstenite::Error::Io(e)) => {
                    self.connected.store(false, Ordering::Release);
                    self.fail(handler, classify_io(&e).read_side());
                    return;
                }
                Err(e) => {
                    debug!("WS: read error: {e}");
                    self.connected.store(false, Ordering::Release);
                    self.fail(handler, TransportError::Read);
                    return;
                }
            }
        }
    }

    fn deliver(&self, payload: &[u8], handler: &mut impl TransportHandler) {
        if payload.is_empty() {
            return;
        }
        self.stats.messages.fetch_add(1, Ordering::Relaxed);
        handler.on_data(payload);
    }

    fn disconnected(&self, handler: &mut impl TransportHandler) {
        self.connected.store(false, Ordering::Release);
        self.stats.disconnects.fetch_add(1, Ordering::Relaxed);
        handler.on_disconnected();
    }
}

/// Map an I/O error from the TLS stream to the failure it stands for.
fn classify_io(e: &io::Error) -> TransportError {
    match e.get_ref().and_then(|inner| inner.downcast_ref::<rustls::Error>()) {
        Some(rustls::Error::InvalidCertificate(_)) => TransportError::CertificateRejected,
        Some(other) => {
            debug!("WS: TLS failure: {other}");
            TransportError::Tls
        }
        None => match e.kind() {
            io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut => TransportError::Handshake,
            _ => {
                debug!("WS: I/O failure: {e}");
                TransportError::Connect
            }
        },
    }
}

impl TransportError {
    /// Connect-time I/O failures seen on a live connection are read
    /// failures; TLS classification is kept.
    fn read_side(self) -> Self {
        match self {
            Self::Connect | Self::Handshake => Self::Read,
            other => other,
        }
    }
}
