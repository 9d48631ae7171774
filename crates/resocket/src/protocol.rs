//! Protocol hooks injected into the connection at construction time.

use serde_json::Value;

use crate::error::ConnectionError;
use crate::transport::Payload;
use crate::NORMAL_CLOSURE;

/// The capability set a protocol specialization provides to the connection.
///
/// The hooks were historically expressed as subclass overrides; here they are
/// an explicit strategy injected at construction. `resolve_endpoint` is the
/// one required member: a connection without an endpoint is a configuration
/// error, caught at compile time rather than on first use.
pub trait Protocol: Send + Sync + 'static {
    /// Returns the URL of the remote endpoint to connect to.
    ///
    /// Called once per connect attempt, so implementations may rotate
    /// between gateways. A returned error is fatal: it is reported on the
    /// error stream and the connection transitions to `Closed` without
    /// entering the backoff protocol.
    fn resolve_endpoint(&self) -> Result<String, ConnectionError>;

    /// Transformations to apply to a message before it is sent to the
    /// remote. Defaults to no transformations.
    ///
    /// The result is always JSON-encoded to the wire exactly once,
    /// regardless of what this hook returns; even a primitive string is
    /// transmitted as an encoded document. Implementations relying on that
    /// canonical outer encoding must not encode a second time here.
    fn marshal(&self, message: Value) -> Value {
        message
    }

    /// Transformations to apply to the body of a message received from the
    /// remote. Defaults to no transformations.
    ///
    /// Note the asymmetry with [`marshal`](Protocol::marshal): inbound
    /// payloads are passed through raw, with no implicit decoding.
    /// Specializations that need symmetry must implement both hooks
    /// consistently.
    fn unmarshal(&self, payload: Payload) -> Payload {
        payload
    }

    /// Whether the connection should attempt to reconnect after an
    /// unexpected close with the given code. The standard behavior is to
    /// always reconnect unless the code is 1000 (Normal Closure).
    fn should_reconnect(&self, code: u16) -> bool {
        code != NORMAL_CLOSURE
    }
}
