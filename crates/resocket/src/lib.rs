//! Resilient, stable-identity socket connection.
//!
//! A [`ResilientConnection`] represents a single logical connection to a
//! remote endpoint across any number of physical transport reconnects. It is
//! designed to provide a stable instance: the connection object survives
//! transport drops, re-establishes the link with backoff-driven delays, and
//! exposes a fixed set of lifecycle events, rather than being a single-use
//! wrapper that must be re-created whenever the link is lost.
//!
//! # Features
//!
//! - **Automatic reconnection**: unexpected drops re-establish the transport
//!   with configurable backoff (exponential, fixed, jittered, custom)
//! - **Lifecycle events**: `Connected`, `Disconnected`, `Reconnected`,
//!   `Closed`, `Message`, and `Error` streams with any number of subscribers
//! - **Pluggable protocol hooks**: endpoint resolution, message marshal /
//!   unmarshal, and the reconnect predicate are injected as a strategy,
//!   not inherited
//! - **Optional heartbeat**: a keep-alive timer armed only while the
//!   connection is open
//!
//! # Examples
//!
//! ```rust,no_run
//! use resocket::{ConnectionConfig, Protocol, ResilientConnection};
//! use resocket_backoff::BackoffPolicy;
//! use std::time::Duration;
//!
//! struct Gateway;
//!
//! impl Protocol for Gateway {
//!     fn resolve_endpoint(&self) -> Result<String, resocket::ConnectionError> {
//!         Ok("wss://gateway.example.com/v1".to_string())
//!     }
//! }
//!
//! # async fn example<C: resocket::Connector>(connector: C) {
//! let config = ConnectionConfig::builder()
//!     .name("gateway")
//!     .backoff(BackoffPolicy::exponential(
//!         Duration::from_millis(100),
//!         Duration::from_secs(5),
//!     ))
//!     .on_connect(|| println!("connected"))
//!     .build();
//!
//! let conn = ResilientConnection::new(connector, Gateway, config);
//! conn.connect();
//! # }
//! ```

mod config;
mod connection;
mod error;
mod events;
mod protocol;
mod state;
mod transport;

pub use config::{ConnectionConfig, ConnectionConfigBuilder, Heartbeat};
pub use connection::ResilientConnection;
pub use error::{ConnectionError, TransportError};
pub use events::{CloseSource, ConnectionEvent};
pub use protocol::Protocol;
pub use state::{ConnectionState, StateHandle};
pub use transport::{Connector, Payload, Transport, TransportEvent};

// Re-export backoff strategies for convenience
pub use resocket_backoff::{
    BackoffPolicy, ExponentialBackoff, ExponentialRandomBackoff, FixedInterval, FnInterval,
    IntervalFunction,
};

/// Close code signifying a graceful, intentional shutdown.
///
/// The default reconnect predicate suppresses automatic reconnection when a
/// close event carries this code.
pub const NORMAL_CLOSURE: u16 = 1000;

/// Close code used when the transport drops without a proper close frame,
/// or when a connect attempt fails or times out.
pub const ABNORMAL_CLOSURE: u16 = 1006;
