//! Unified error types for the DeviceTimer controller.
//!
//! A single `Error` enum that every subsystem converts into, keeping the
//! orchestrator's handling uniform. All variants are `Copy` so they can be
//! passed between worker threads and callbacks without allocation.

use core::fmt;

use embedded_hal::digital::ErrorKind;

// ---------------------------------------------------------------------------
// Top-level controller error
// ---------------------------------------------------------------------------

/// Every fallible operation in the controller funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A GPIO line could not be read or written.
    Gpio(GpioError),
    /// The operator-console link failed.
    Transport(TransportError),
    /// Configuration is invalid or could not be loaded.
    Config(&'static str),
    /// Peripheral or subsystem initialisation failed.
    Init(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Gpio(e) => write!(f, "gpio: {e}"),
            Self::Transport(e) => write!(f, "transport: {e}"),
            Self::Config(msg) => write!(f, "config: {msg}"),
            Self::Init(msg) => write!(f, "init: {msg}"),
        }
    }
}

impl std::error::Error for Error {}

// ---------------------------------------------------------------------------
// GPIO errors
// ---------------------------------------------------------------------------

/// A pin operation failed. Carries the HAL error kind so the cause survives
/// the trip out of the generic driver code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GpioError {
    /// Reading an input line failed.
    Read(ErrorKind),
    /// Driving an output line failed.
    Write(ErrorKind),
}

impl GpioError {
    /// Wrap a HAL read error.
    pub fn read(e: impl embedded_hal::digital::Error) -> Self {
        Self::Read(e.kind())
    }

    /// Wrap a HAL write error.
    pub fn write(e: impl embedded_hal::digital::Error) -> Self {
        Self::Write(e.kind())
    }
}

impl fmt::Display for GpioError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Read(kind) => write!(f, "pin read failed ({kind:?})"),
            Self::Write(kind) => write!(f, "pin write failed ({kind:?})"),
        }
    }
}

impl From<GpioError> for Error {
    fn from(e: GpioError) -> Self {
        Self::Gpio(e)
    }
}

// ---------------------------------------------------------------------------
// Transport errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportError {
    /// Target URI could not be parsed or is not `wss://`.
    InvalidUri,
    /// Client certificate or key could not be loaded.
    InvalidIdentity,
    /// TCP connect failed or timed out.
    Connect,
    /// TLS configuration or session failure.
    Tls,
    /// Server certificate thumbprint did not match the pinned value.
    CertificateRejected,
    /// The WebSocket upgrade failed.
    Handshake,
    /// Reading from the live connection failed.
    Read,
    /// Writing to the live connection failed.
    Write,
    /// Operation requires a live connection but none is present.
    NotConnected,
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidUri => write!(f, "invalid target URI"),
            Self::InvalidIdentity => write!(f, "invalid client certificate or key"),
            Self::Connect => write!(f, "TCP connect failed"),
            Self::Tls => write!(f, "TLS session error"),
            Self::CertificateRejected => write!(f, "server certificate rejected"),
            Self::Handshake => write!(f, "WebSocket handshake failed"),
            Self::Read => write!(f, "read failed"),
            Self::Write => write!(f, "write failed"),
            Self::NotConnected => write!(f, "not connected"),
        }
    }
}

impl From<TransportError> for Error {
    fn from(e: TransportError) -> Self {
        Self::Transport(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Controller-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
