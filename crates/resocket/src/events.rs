//! Lifecycle events emitted by a connection.

use std::sync::Arc;
use std::time::Instant;

use resocket_core::events::SocketEvent;

use crate::error::ConnectionError;
use crate::transport::Payload;

/// Which side initiated a terminal closure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseSource {
    /// `close` was called on the connection.
    Local,
    /// The remote closed and the reconnect predicate declined to reconnect.
    Remote,
}

/// Events emitted by a [`ResilientConnection`](crate::ResilientConnection).
///
/// Emission order matches transition order: a first-time open emits exactly
/// one `Connected`; an open that concludes a reconnection cycle emits
/// `Connected` then `Reconnected`.
#[derive(Debug, Clone)]
pub enum ConnectionEvent {
    /// The connection was successfully established.
    Connected {
        connection_name: String,
        timestamp: Instant,
    },
    /// The connection dropped unexpectedly. The connection will evaluate the
    /// reconnect predicate and possibly re-establish the transport.
    Disconnected {
        connection_name: String,
        timestamp: Instant,
        code: u16,
    },
    /// A previously dropped connection has been re-established.
    Reconnected {
        connection_name: String,
        timestamp: Instant,
    },
    /// The connection terminated for good: `close` was called, or a close
    /// event was received for which the reconnect predicate returned false.
    Closed {
        connection_name: String,
        timestamp: Instant,
        code: u16,
        source: CloseSource,
    },
    /// A message was received and passed through the unmarshal hook.
    Message {
        connection_name: String,
        timestamp: Instant,
        payload: Payload,
    },
    /// An error was encountered, either from the underlying transport or
    /// from the connection itself.
    Error {
        connection_name: String,
        timestamp: Instant,
        cause: Arc<ConnectionError>,
    },
}

impl SocketEvent for ConnectionEvent {
    fn event_type(&self) -> &'static str {
        match self {
            ConnectionEvent::Connected { .. } => "connected",
            ConnectionEvent::Disconnected { .. } => "disconnected",
            ConnectionEvent::Reconnected { .. } => "reconnected",
            ConnectionEvent::Closed { .. } => "closed",
            ConnectionEvent::Message { .. } => "message",
            ConnectionEvent::Error { .. } => "error",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            ConnectionEvent::Connected { timestamp, .. }
            | ConnectionEvent::Disconnected { timestamp, .. }
            | ConnectionEvent::Reconnected { timestamp, .. }
            | ConnectionEvent::Closed { timestamp, .. }
            | ConnectionEvent::Message { timestamp, .. }
            | ConnectionEvent::Error { timestamp, .. } => *timestamp,
        }
    }

    fn connection_name(&self) -> &str {
        match self {
            ConnectionEvent::Connected {
                connection_name, ..
            }
            | ConnectionEvent::Disconnected {
                connection_name, ..
            }
            | ConnectionEvent::Reconnected {
                connection_name, ..
            }
            | ConnectionEvent::Closed {
                connection_name, ..
            }
            | ConnectionEvent::Message {
                connection_name, ..
            }
            | ConnectionEvent::Error {
                connection_name, ..
            } => connection_name,
        }
    }
}
