//! Configuration for a resilient connection.

use std::sync::Arc;
use std::time::Duration;

use resocket_backoff::BackoffPolicy;
use resocket_core::events::{EventListener, EventListeners, FnListener};
use serde_json::Value;

use crate::error::ConnectionError;
use crate::events::{CloseSource, ConnectionEvent};
use crate::transport::Payload;

/// Default ceiling for an individual connect attempt.
pub(crate) const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_millis(1500);

/// An optional keep-alive timer, armed only while the connection is open.
///
/// Some connections degrade over time when not in active use; a heartbeat
/// keeps the link alive and responsive. On every tick the beat callback is
/// invoked; a `Some` result is sent through the normal marshal and encode
/// pipeline. The timer is dropped the moment the connection leaves `Open`.
#[derive(Clone)]
pub struct Heartbeat {
    pub(crate) interval: Duration,
    pub(crate) beat: Arc<dyn Fn() -> Option<Value> + Send + Sync>,
}

impl Heartbeat {
    /// Creates a heartbeat that invokes `beat` every `interval` while the
    /// connection is open.
    pub fn new<F>(interval: Duration, beat: F) -> Self
    where
        F: Fn() -> Option<Value> + Send + Sync + 'static,
    {
        Self {
            interval,
            beat: Arc::new(beat),
        }
    }
}

impl std::fmt::Debug for Heartbeat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Heartbeat")
            .field("interval", &self.interval)
            .finish()
    }
}

/// Configuration for connection behavior.
#[derive(Clone)]
pub struct ConnectionConfig {
    /// Diagnostic label carried by every event and tracing span.
    pub(crate) name: String,

    /// The backoff policy applied between reconnection attempts.
    pub(crate) backoff: BackoffPolicy,

    /// Maximum number of reconnection attempts since the last successful
    /// open. `None` means unlimited attempts.
    pub(crate) max_attempts: Option<u32>,

    /// Ceiling for how long an individual connect attempt may take.
    pub(crate) connect_timeout: Duration,

    /// Optional keep-alive timer.
    pub(crate) heartbeat: Option<Heartbeat>,

    /// Subscribed lifecycle observers.
    pub(crate) listeners: EventListeners<ConnectionEvent>,
}

impl ConnectionConfig {
    /// Creates a new builder for configuring connection behavior.
    pub fn builder() -> ConnectionConfigBuilder {
        ConnectionConfigBuilder::default()
    }

    /// Returns the diagnostic name of the connection.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the backoff policy.
    pub fn backoff(&self) -> &BackoffPolicy {
        &self.backoff
    }

    /// Returns the maximum number of reconnection attempts.
    pub fn max_attempts(&self) -> Option<u32> {
        self.max_attempts
    }

    /// Returns the connect attempt timeout.
    pub fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        ConnectionConfigBuilder::default().build()
    }
}

impl std::fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("name", &self.name)
            .field("backoff", &self.backoff)
            .field("max_attempts", &self.max_attempts)
            .field("connect_timeout", &self.connect_timeout)
            .field("heartbeat", &self.heartbeat)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

/// Builder for constructing a [`ConnectionConfig`].
pub struct ConnectionConfigBuilder {
    name: String,
    backoff: BackoffPolicy,
    max_attempts: Option<u32>,
    connect_timeout: Duration,
    heartbeat: Option<Heartbeat>,
    listeners: EventListeners<ConnectionEvent>,
}

impl Default for ConnectionConfigBuilder {
    fn default() -> Self {
        Self {
            name: "resocket".to_string(),
            backoff: BackoffPolicy::default(),
            max_attempts: None,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            heartbeat: None,
            listeners: EventListeners::new(),
        }
    }
}

impl ConnectionConfigBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the diagnostic name carried by events and tracing output.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets the backoff policy.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::time::Duration;
    /// use resocket::{BackoffPolicy, ConnectionConfig};
    ///
    /// let config = ConnectionConfig::builder()
    ///     .backoff(BackoffPolicy::exponential(
    ///         Duration::from_millis(100),
    ///         Duration::from_secs(10),
    ///     ))
    ///     .build();
    /// ```
    pub fn backoff(mut self, backoff: BackoffPolicy) -> Self {
        self.backoff = backoff;
        self
    }

    /// Sets the maximum number of reconnection attempts since the last
    /// successful open.
    pub fn max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = Some(max_attempts);
        self
    }

    /// Sets unlimited reconnection attempts. This is the default.
    pub fn unlimited_attempts(mut self) -> Self {
        self.max_attempts = None;
        self
    }

    /// Sets the ceiling for an individual connect attempt. A stalled attempt
    /// is aborted after this long and treated as an abnormal closure.
    pub fn connect_timeout(mut self, connect_timeout: Duration) -> Self {
        self.connect_timeout = connect_timeout;
        self
    }

    /// Installs a keep-alive heartbeat, armed only while the connection is
    /// open.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::time::Duration;
    /// use resocket::{ConnectionConfig, Heartbeat};
    ///
    /// let config = ConnectionConfig::builder()
    ///     .heartbeat(Heartbeat::new(Duration::from_secs(30), || {
    ///         Some(serde_json::json!({ "op": "ping" }))
    ///     }))
    ///     .build();
    /// ```
    pub fn heartbeat(mut self, heartbeat: Heartbeat) -> Self {
        self.heartbeat = Some(heartbeat);
        self
    }

    /// Subscribes a raw event listener observing every lifecycle event.
    pub fn listener<L>(mut self, listener: L) -> Self
    where
        L: EventListener<ConnectionEvent> + 'static,
    {
        self.listeners.add(listener);
        self
    }

    /// Subscribes a closure observing every lifecycle event.
    pub fn on_event<F>(self, f: F) -> Self
    where
        F: Fn(&ConnectionEvent) + Send + Sync + 'static,
    {
        self.listener(FnListener::new(f))
    }

    /// Called when the connection is successfully established. Emitted once
    /// per connection, including across reconnections; deriving protocols
    /// may need to implement a handshake on top of this.
    pub fn on_connect<F>(self, f: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.on_event(move |event| {
            if let ConnectionEvent::Connected { .. } = event {
                f()
            }
        })
    }

    /// Called when the connection was dropped unexpectedly. The connection
    /// will attempt to re-establish the transport.
    pub fn on_disconnect<F>(self, f: F) -> Self
    where
        F: Fn(u16) + Send + Sync + 'static,
    {
        self.on_event(move |event| {
            if let ConnectionEvent::Disconnected { code, .. } = event {
                f(*code)
            }
        })
    }

    /// Called when a previously dropped connection has been re-established.
    /// Emitted independently of the connect hook.
    pub fn on_reconnect<F>(self, f: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.on_event(move |event| {
            if let ConnectionEvent::Reconnected { .. } = event {
                f()
            }
        })
    }

    /// Called when the connection terminated normally: `close` was called,
    /// or a close event arrived for which the reconnect predicate returned
    /// false.
    pub fn on_close<F>(self, f: F) -> Self
    where
        F: Fn(u16, CloseSource) + Send + Sync + 'static,
    {
        self.on_event(move |event| {
            if let ConnectionEvent::Closed { code, source, .. } = event {
                f(*code, *source)
            }
        })
    }

    /// Called for every received message, after the unmarshal hook.
    pub fn on_message<F>(self, f: F) -> Self
    where
        F: Fn(&Payload) + Send + Sync + 'static,
    {
        self.on_event(move |event| {
            if let ConnectionEvent::Message { payload, .. } = event {
                f(payload)
            }
        })
    }

    /// Called whenever an error is encountered, either from the underlying
    /// transport or from the connection itself. A connection that never
    /// subscribes here does not crash but silently loses diagnostics.
    pub fn on_error<F>(self, f: F) -> Self
    where
        F: Fn(&ConnectionError) + Send + Sync + 'static,
    {
        self.on_event(move |event| {
            if let ConnectionEvent::Error { cause, .. } = event {
                f(cause)
            }
        })
    }

    /// Builds the [`ConnectionConfig`].
    pub fn build(self) -> ConnectionConfig {
        ConnectionConfig {
            name: self.name,
            backoff: self.backoff,
            max_attempts: self.max_attempts,
            connect_timeout: self.connect_timeout,
            heartbeat: self.heartbeat,
            listeners: self.listeners,
        }
    }
}

impl ConnectionConfig {
    pub(crate) fn emit(&self, event: ConnectionEvent) {
        self.listeners.emit(&event);
    }
}
