//! # Error Types
//!
//! Error handling for every layer of the client, from the byte transport up to
//! the session state machine.
//!
//! ## Error Categories
//! - **Transport**: connect failures, I/O errors, closed connections, timeouts
//! - **Framing**: malformed frames, unknown packet ids, packets used in the wrong phase
//! - **Security**: public key parsing and encryption failures during login
//! - **Session**: server-side login rejection, illegal phase transitions, cancellation
//! - **Configuration**: invalid or unreadable configuration
//!
//! A session ends with exactly one of these (or with a normal
//! [`SessionEnd`](crate::service::client::SessionEnd)). `Cancelled` is the
//! cooperative shutdown path and is not treated as a fault.
//!
//! ## Example Usage
//! ```rust
//! use mcproto_client::error::{ProtocolError, Result};
//!
//! fn check_threshold(threshold: i32) -> Result<usize> {
//!     usize::try_from(threshold)
//!         .map_err(|_| ProtocolError::MalformedFrame(format!("negative threshold {threshold}")))
//! }
//!
//! assert!(check_threshold(256).is_ok());
//! assert!(check_threshold(-1).is_err());
//! ```

use crate::protocol::state::{Direction, Phase};
use std::io;
use thiserror::Error;

/// Error message constants to reduce allocations in error paths.
pub mod constants {
    /// Framing errors
    pub const ERR_VARINT_TOO_LONG: &str = "VarInt is too long";
    pub const ERR_VARINT_TRUNCATED: &str = "VarInt is truncated";
    pub const ERR_FRAME_TOO_LARGE: &str = "Frame length exceeds maximum";
    pub const ERR_NEGATIVE_LENGTH: &str = "Negative length prefix";
    pub const ERR_TRAILING_BYTES: &str = "Trailing bytes after packet fields";
    pub const ERR_FIELD_TRUNCATED: &str = "Packet field is truncated";
    pub const ERR_STRING_TOO_LONG: &str = "String exceeds maximum length";
    pub const ERR_INVALID_UTF8: &str = "String is not valid UTF-8";

    /// Compression errors
    pub const ERR_BELOW_THRESHOLD: &str = "Compressed frame declares a size below the threshold";
    pub const ERR_SIZE_MISMATCH: &str = "Inflated size does not match the declared size";
    pub const ERR_UNCOMPRESSED_TOO_LARGE: &str = "Declared uncompressed size exceeds maximum";
    pub const ERR_INFLATE_FAILED: &str = "Failed to inflate compressed frame";

    /// Security errors
    pub const ERR_PUBLIC_KEY: &str = "Server public key is not a valid RSA key";
    pub const ERR_RSA_ENCRYPT: &str = "RSA encryption failed";
    pub const ERR_SECRET_LENGTH: &str = "Shared secret must be 16 bytes";

    /// Write-once slots
    pub const SLOT_CIPHER: &str = "cipher";
    pub const SLOT_COMPRESSION: &str = "compression";
}

/// ProtocolError is the primary error type for all client operations
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to connect to {addr}: {source}")]
    ConnectFailure {
        addr: String,
        #[source]
        source: io::Error,
    },

    #[error("Malformed frame: {0}")]
    MalformedFrame(String),

    #[error("Unknown packet 0x{id:02X} ({direction:?}) in {phase:?} phase")]
    UnknownPacket {
        phase: Phase,
        direction: Direction,
        id: i32,
    },

    #[error("Packet {name} does not belong to the {phase:?} registry")]
    WrongPhase { phase: Phase, name: &'static str },

    #[error("Packet {name} travels {direction:?} and cannot be sent from this side")]
    WrongDirection {
        direction: Direction,
        name: &'static str,
    },

    #[error("Crypto failure: {0}")]
    CryptoFailure(String),

    #[error("Login rejected by server: {0}")]
    LoginRejected(String),

    #[error("Session cancelled")]
    Cancelled,

    #[error("Connection closed")]
    ConnectionClosed,

    #[error("The {0} context is already installed")]
    AlreadyConfigured(&'static str),

    #[error("Illegal phase transition from {from:?} to {to:?}")]
    InvalidTransition { from: Phase, to: Phase },

    #[error("Compression failed")]
    CompressionFailure,

    #[error("Timeout occurred")]
    Timeout,

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Custom error: {0}")]
    Custom(String),
}

impl ProtocolError {
    /// True for the cooperative shutdown path.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ProtocolError::Cancelled)
    }

    /// Whether the error leaves the byte stream unusable.
    ///
    /// An unknown packet id is the only recoverable case: the whole frame has
    /// already been consumed, so the stream is still aligned.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, ProtocolError::UnknownPacket { .. })
    }

    pub(crate) fn malformed(msg: &str) -> Self {
        ProtocolError::MalformedFrame(msg.to_string())
    }
}

/// Type alias for Results using ProtocolError
pub type Result<T> = std::result::Result<T, ProtocolError>;
