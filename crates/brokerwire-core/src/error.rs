//! Connection error types.

use brokerwire_proto::ProtocolError;
use thiserror::Error;

use crate::connection::ConnectionState;

/// Result alias for connection operations.
pub type Result<T> = std::result::Result<T, ConnectionError>;

/// Errors raised by a connection.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConnectionError {
    /// A frame arrived for a correlation id with no pending request. The frame
    /// is dropped; the connection stays usable.
    #[error("no pending request for correlation id {correlation_id}")]
    UnknownCorrelationId {
        /// Correlation id carried by the frame.
        correlation_id: i32,
    },

    /// The byte stream can no longer be framed. Fatal to the connection.
    #[error("framing failed: {0}")]
    Frame(ProtocolError),

    /// A request could not be encoded.
    #[error("request encoding failed: {0}")]
    Encode(ProtocolError),

    /// No response decoder exists for the request type.
    #[error("unsupported request: {0}")]
    UnsupportedApi(ProtocolError),

    /// Operation is not valid in the current state.
    #[error("cannot {operation} in state {state:?}")]
    InvalidState {
        /// State the connection was in.
        state: ConnectionState,
        /// Operation that was attempted.
        operation: &'static str,
    },
}

impl ConnectionError {
    /// Whether the connection must be torn down after this error.
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::Frame(_))
    }
}
