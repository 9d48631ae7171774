//! Error taxonomy for the connection stack.
//!
//! Configuration failures (endpoint resolution) are fatal and never retried.
//! State errors (`AlreadyConnected`, `Closed`) are reported on the error
//! event stream without changing state. `NotConnected` is the one failure a
//! caller receives synchronously, since the caller needs to know the send did
//! not happen. Transport errors are forwarded verbatim to the error stream
//! and never trigger reconnection by themselves.

use std::time::Duration;

use thiserror::Error;

/// Errors raised by the underlying transport.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Failed to establish a connection to the remote endpoint.
    #[error("failed to establish connection: {0}")]
    Connect(String),

    /// Failed to transmit a payload over an established connection.
    #[error("failed to send: {0}")]
    Send(String),

    /// The transport channel is gone.
    #[error("transport closed")]
    Closed,

    /// An I/O level failure.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Errors raised by a [`ResilientConnection`](crate::ResilientConnection).
#[derive(Debug, Error)]
pub enum ConnectionError {
    /// `send` was called without a live, open transport. Returned
    /// synchronously; nothing reaches the wire.
    #[error("send attempted without a live transport")]
    NotConnected,

    /// `connect` was called while a transport already exists. Reported on
    /// the error event stream; the call is otherwise a no-op.
    #[error("already connected or connecting")]
    AlreadyConnected,

    /// `connect` was called on a connection that has been closed. `Closed`
    /// is terminal.
    #[error("connection has been closed")]
    Closed,

    /// The protocol failed to resolve a target endpoint. Fatal; never
    /// retried by the backoff protocol.
    #[error("endpoint resolution failed: {reason}")]
    Endpoint {
        /// Why the endpoint could not be resolved.
        reason: String,
    },

    /// A connect attempt did not complete within the configured timeout.
    #[error("connect attempt timed out after {0:?}")]
    ConnectTimeout(Duration),

    /// The configured maximum number of reconnection attempts was exceeded,
    /// or the backoff policy forbids reconnection.
    #[error("reconnect attempts exhausted after {attempts} attempts")]
    ReconnectExhausted {
        /// The number of reconnection attempts made since the last
        /// successful open.
        attempts: u32,
    },

    /// An outbound payload could not be encoded.
    #[error("payload encoding failed")]
    Encode(#[from] serde_json::Error),

    /// The underlying transport raised an error.
    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl ConnectionError {
    /// Returns `true` if this error is fatal to the connection rather than a
    /// reportable, non-fatal condition.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ConnectionError::Endpoint { .. } | ConnectionError::ReconnectExhausted { .. }
        )
    }
}
