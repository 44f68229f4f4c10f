// ABOUTME: Error taxonomy for session operations
// ABOUTME: Marks which errors end the session

use crate::billing::BillingError;
use crate::codec::CodecError;
use crate::encoder::EncodingError;
use std::io;
use thiserror::Error;

/// Error type for every session operation.
///
/// `Connect` and `Bind` abort a connection attempt. `Timeout` and `Protocol`
/// are recoverable. `SessionClosed` means the session is gone and the caller
/// has to build a new one.
#[derive(Debug, Error)]
pub enum SmppError {
    /// The carrier gateway could not be reached
    #[error("connect to {addr} failed: {source}")]
    Connect {
        addr: String,
        #[source]
        source: io::Error,
    },

    /// The bind was rejected or never answered
    #[error("bind failed: {0}")]
    Bind(String),

    /// The message text cannot be sent as given
    #[error(transparent)]
    Encoding(#[from] EncodingError),

    /// No response within the allotted time
    #[error("timed out waiting for {0}")]
    Timeout(&'static str),

    /// Operation attempted on, or interrupted by, a torn down session
    #[error("session closed")]
    SessionClosed,

    /// A malformed or unexpected frame
    #[error("protocol error: {0}")]
    Protocol(String),

    /// The billing collaborator failed. Never affects the SMPP outcome.
    #[error("billing unavailable: {0}")]
    BillingUnavailable(#[from] BillingError),

    /// Operation not legal in the current session state
    #[error("invalid session state: {0}")]
    InvalidState(String),

    /// Write failure on the socket
    #[error("transport error: {0}")]
    Io(#[from] io::Error),
}

/// Result type alias for SMPP operations
pub type SmppResult<T> = Result<T, SmppError>;

impl From<CodecError> for SmppError {
    fn from(err: CodecError) -> Self {
        SmppError::Protocol(err.to_string())
    }
}

impl SmppError {
    /// Errors after which the session cannot continue
    pub fn is_fatal(&self) -> bool {
        matches!(self, SmppError::SessionClosed | SmppError::Io(_))
    }
}
