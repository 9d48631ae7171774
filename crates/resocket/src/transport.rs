//! Transport and connector capabilities.
//!
//! The connection core treats the underlying socket as a capability, not a
//! concrete type: anything that can deliver messages, report its closure, and
//! accept outbound payloads will do. A [`Connector`] builds a fresh transport
//! for every connect attempt; the old transport is always replaced wholesale
//! on reconnect, never mutated in place.

use std::future::Future;

use crate::error::TransportError;

/// A message payload, either textual or binary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    /// A UTF-8 text frame.
    Text(String),
    /// A binary frame.
    Binary(Vec<u8>),
}

impl Payload {
    /// Returns the text content, if this is a text payload.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Payload::Text(text) => Some(text),
            Payload::Binary(_) => None,
        }
    }
}

impl From<String> for Payload {
    fn from(text: String) -> Self {
        Payload::Text(text)
    }
}

impl From<Vec<u8>> for Payload {
    fn from(bytes: Vec<u8>) -> Self {
        Payload::Binary(bytes)
    }
}

/// An event raised by an established transport.
#[derive(Debug)]
pub enum TransportEvent {
    /// A message arrived from the remote.
    Message(Payload),

    /// The transport raised an error. Errors are forwarded to observers but
    /// do not by themselves tear down the connection.
    Error(TransportError),

    /// The transport closed with the given code.
    Closed {
        /// The close code sent by the remote.
        code: u16,
        /// An optional human-readable reason.
        reason: Option<String>,
    },
}

/// A bidirectional message-oriented socket primitive.
///
/// A transport is exclusively owned by the connection that created it and is
/// considered open from the moment the [`Connector`] returns it.
pub trait Transport: Send + 'static {
    /// Transmits a payload to the remote.
    fn send(&mut self, payload: Payload)
        -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Requests the transport to close with the given code and reason.
    ///
    /// The caller does not wait for the close handshake to complete.
    fn close(
        &mut self,
        code: u16,
        reason: Option<String>,
    ) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Waits for the next event raised by the transport.
    ///
    /// Returns `None` when the transport is exhausted without having
    /// delivered a close event, which the connection treats as an abnormal
    /// closure.
    fn next_event(&mut self) -> impl Future<Output = Option<TransportEvent>> + Send;
}

/// Builds a fresh transport for each connect attempt.
pub trait Connector: Send + Sync + 'static {
    /// The transport type produced by this connector.
    type Transport: Transport;

    /// Establishes a new physical connection to the given endpoint.
    ///
    /// A returned transport is considered open. Errors are treated like an
    /// abnormal closure and drive the reconnect protocol.
    fn connect(
        &self,
        endpoint: &str,
    ) -> impl Future<Output = Result<Self::Transport, TransportError>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_as_text() {
        assert_eq!(
            Payload::Text("hello".to_string()).as_text(),
            Some("hello")
        );
        assert_eq!(Payload::Binary(vec![1, 2, 3]).as_text(), None);
    }

    #[test]
    fn test_payload_conversions() {
        let text: Payload = "hi".to_string().into();
        assert_eq!(text, Payload::Text("hi".to_string()));

        let bin: Payload = vec![0u8, 1].into();
        assert_eq!(bin, Payload::Binary(vec![0, 1]));
    }
}
