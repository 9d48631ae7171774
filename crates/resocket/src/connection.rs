//! The resilient connection state machine.

use std::sync::{Arc, Mutex};
use std::time::Instant;

use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use crate::config::ConnectionConfig;
use crate::error::{ConnectionError, TransportError};
use crate::events::{CloseSource, ConnectionEvent};
use crate::protocol::Protocol;
use crate::state::{ConnectionState, StateHandle};
use crate::transport::{Connector, Payload, Transport, TransportEvent};
use crate::{ABNORMAL_CLOSURE, NORMAL_CLOSURE};

enum Command {
    Send(String),
    Close { code: u16, reason: Option<String> },
}

struct DriverHandle {
    commands: mpsc::UnboundedSender<Command>,
    #[allow(dead_code)]
    task: JoinHandle<()>,
}

/// A single logical connection to a remote endpoint across any number of
/// physical transport reconnects.
///
/// The instance is stable: it owns at most one transport at a time, replaces
/// it wholesale when the link drops, and re-establishes the connection with
/// attempt-indexed backoff delays. All state transitions execute inside one
/// driver task, so events are observed in transition order and the machine
/// processes one event to completion before accepting the next.
///
/// Lifecycle observers are registered through the
/// [`ConnectionConfig`](crate::ConnectionConfig) builder. A caller that never
/// subscribes to the error stream does not crash but silently loses
/// diagnostics.
pub struct ResilientConnection<C, P> {
    connector: Arc<C>,
    protocol: Arc<P>,
    config: Arc<ConnectionConfig>,
    state: StateHandle,
    driver: Mutex<Option<DriverHandle>>,
}

impl<C, P> ResilientConnection<C, P>
where
    C: Connector,
    P: Protocol,
{
    /// Creates a new connection in the `Idle` state. No transport exists
    /// until [`connect`](Self::connect) is called.
    pub fn new(connector: C, protocol: P, config: ConnectionConfig) -> Self {
        Self {
            connector: Arc::new(connector),
            protocol: Arc::new(protocol),
            config: Arc::new(config),
            state: StateHandle::new(),
            driver: Mutex::new(None),
        }
    }

    /// Attempts to connect to the remote endpoint.
    ///
    /// Valid only from `Idle`. If a transport already exists (the state is
    /// `Connecting`, `Open`, or `ReconnectPending`), this is a no-op that
    /// surfaces [`ConnectionError::AlreadyConnected`] through the error
    /// event stream: connect-while-connected is a reportable, non-fatal
    /// condition, not a panic. A closed connection likewise reports
    /// [`ConnectionError::Closed`].
    ///
    /// Must be called from within a tokio runtime.
    pub fn connect(&self) {
        let mut slot = self.driver.lock().unwrap();
        match self.state.state() {
            ConnectionState::Idle => {}
            ConnectionState::Closed => {
                self.emit_error(ConnectionError::Closed);
                return;
            }
            _ => {
                self.emit_error(ConnectionError::AlreadyConnected);
                return;
            }
        }

        self.state.set_state(ConnectionState::Connecting);
        let (commands, rx) = mpsc::unbounded_channel();
        let driver = Driver {
            connector: Arc::clone(&self.connector),
            protocol: Arc::clone(&self.protocol),
            config: Arc::clone(&self.config),
            state: self.state.clone(),
        };
        let task = tokio::spawn(driver.run(rx));
        *slot = Some(DriverHandle { commands, task });
    }

    /// Sends a payload to the remote.
    ///
    /// Fails synchronously with [`ConnectionError::NotConnected`] unless a
    /// transport exists and is open; nothing reaches the wire on failure.
    /// The payload runs through the protocol's marshal hook and is then
    /// JSON-encoded to the wire exactly once, unconditionally. Failures
    /// during the actual transmission surface on the error event stream,
    /// not as a return value.
    pub fn send<T>(&self, payload: &T) -> Result<(), ConnectionError>
    where
        T: Serialize + ?Sized,
    {
        let slot = self.driver.lock().unwrap();
        let handle = match slot.as_ref() {
            Some(handle) if self.state.is_connected() => handle,
            _ => return Err(ConnectionError::NotConnected),
        };

        let value = serde_json::to_value(payload)?;
        let marshaled = self.protocol.marshal(value);
        let text = serde_json::to_string(&marshaled)?;
        handle
            .commands
            .send(Command::Send(text))
            .map_err(|_| ConnectionError::NotConnected)
    }

    /// Terminates the connection.
    ///
    /// Valid from any non-`Closed` state. Cancels any pending reconnect
    /// timer, requests the transport to close without waiting for the close
    /// handshake, and emits `Closed { code, source: Local }` synchronously.
    /// The transport's own close notification is suppressed for a close the
    /// caller initiated. `Closed` is terminal.
    pub fn close(&self, code: u16, reason: Option<&str>) {
        let mut slot = self.driver.lock().unwrap();
        if self.state.state() == ConnectionState::Closed {
            return;
        }
        self.state.mark_closed();
        if let Some(handle) = slot.take() {
            let _ = handle.commands.send(Command::Close {
                code,
                reason: reason.map(str::to_owned),
            });
        }
        self.config.emit(ConnectionEvent::Closed {
            connection_name: self.config.name.clone(),
            timestamp: Instant::now(),
            code,
            source: CloseSource::Local,
        });
    }

    /// Returns the current lifecycle state.
    pub fn state(&self) -> ConnectionState {
        self.state.state()
    }

    /// True strictly between a successful open and any disconnect or close.
    pub fn is_connected(&self) -> bool {
        self.state.is_connected()
    }

    /// True from the moment a drop triggers backoff scheduling until the
    /// replacement transport opens or the connection is explicitly closed.
    pub fn is_reconnecting(&self) -> bool {
        self.state.is_reconnecting()
    }

    /// Number of reconnection cycles since the last successful open.
    pub fn reconnect_attempts(&self) -> u32 {
        self.state.attempts()
    }

    /// Returns the connection configuration.
    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    fn emit_error(&self, cause: ConnectionError) {
        self.config.emit(ConnectionEvent::Error {
            connection_name: self.config.name.clone(),
            timestamp: Instant::now(),
            cause: Arc::new(cause),
        });
    }
}

enum BackoffOutcome {
    Retry,
    Stop,
}

struct Driver<C, P> {
    connector: Arc<C>,
    protocol: Arc<P>,
    config: Arc<ConnectionConfig>,
    state: StateHandle,
}

impl<C, P> Driver<C, P>
where
    C: Connector,
    P: Protocol,
{
    async fn run(self, mut commands: mpsc::UnboundedReceiver<Command>) {
        'lifecycle: loop {
            if self.state.state() == ConnectionState::Closed {
                break;
            }

            let endpoint = match self.protocol.resolve_endpoint() {
                Ok(endpoint) => endpoint,
                Err(err) => {
                    // Configuration errors are fatal and never retried.
                    error!(connection = %self.config.name, %err, "endpoint resolution failed");
                    self.emit_error(err);
                    self.state.mark_closed();
                    self.emit_closed(ABNORMAL_CLOSURE, CloseSource::Local);
                    break;
                }
            };

            debug!(connection = %self.config.name, %endpoint, "connecting");
            self.state.set_state(ConnectionState::Connecting);

            let connected = tokio::time::timeout(
                self.config.connect_timeout,
                self.connector.connect(&endpoint),
            )
            .await;

            let mut transport = match connected {
                Ok(Ok(transport)) => transport,
                Ok(Err(err)) => {
                    warn!(connection = %self.config.name, %err, "connect attempt failed");
                    self.emit_error(ConnectionError::Transport(err));
                    match self.schedule_reconnect(&mut commands, ABNORMAL_CLOSURE).await {
                        BackoffOutcome::Retry => continue 'lifecycle,
                        BackoffOutcome::Stop => break 'lifecycle,
                    }
                }
                Err(_elapsed) => {
                    warn!(
                        connection = %self.config.name,
                        timeout = ?self.config.connect_timeout,
                        "connect attempt timed out"
                    );
                    self.emit_error(ConnectionError::ConnectTimeout(self.config.connect_timeout));
                    match self.schedule_reconnect(&mut commands, ABNORMAL_CLOSURE).await {
                        BackoffOutcome::Retry => continue 'lifecycle,
                        BackoffOutcome::Stop => break 'lifecycle,
                    }
                }
            };

            if self.state.state() == ConnectionState::Closed {
                // A local close raced the connect attempt.
                let _ = transport.close(NORMAL_CLOSURE, None).await;
                break;
            }

            let was_reconnecting = self.state.mark_open();
            debug!(connection = %self.config.name, "connection open");
            #[cfg(feature = "metrics")]
            metrics::counter!(
                "resocket_connections_opened_total",
                "connection" => self.config.name.clone()
            )
            .increment(1);

            self.emit(ConnectionEvent::Connected {
                connection_name: self.config.name.clone(),
                timestamp: Instant::now(),
            });
            if was_reconnecting {
                self.emit(ConnectionEvent::Reconnected {
                    connection_name: self.config.name.clone(),
                    timestamp: Instant::now(),
                });
            }

            let mut heartbeat = self.config.heartbeat.as_ref().map(|hb| {
                let mut interval = tokio::time::interval_at(
                    tokio::time::Instant::now() + hb.interval,
                    hb.interval,
                );
                interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
                (interval, Arc::clone(&hb.beat))
            });

            // None: locally closed, teardown already reported. Some: the
            // transport closed unexpectedly with this code.
            let close_code: Option<u16> = loop {
                tokio::select! {
                    biased;

                    cmd = commands.recv() => match cmd {
                        Some(Command::Send(text)) => {
                            if let Err(err) = transport.send(Payload::Text(text)).await {
                                self.emit_error(ConnectionError::Transport(err));
                            }
                        }
                        Some(Command::Close { code, reason }) => {
                            let _ = transport.close(code, reason).await;
                            self.state.mark_closed();
                            break None;
                        }
                        None => {
                            // Handle dropped: tear down quietly.
                            let _ = transport.close(NORMAL_CLOSURE, None).await;
                            self.state.mark_closed();
                            break None;
                        }
                    },

                    event = transport.next_event() => match event {
                        Some(TransportEvent::Message(payload)) => {
                            let payload = self.protocol.unmarshal(payload);
                            self.emit(ConnectionEvent::Message {
                                connection_name: self.config.name.clone(),
                                timestamp: Instant::now(),
                                payload,
                            });
                        }
                        Some(TransportEvent::Error(err)) => {
                            // Forwarded verbatim; only an actual close event
                            // drives reconnection.
                            self.emit_error(ConnectionError::Transport(err));
                        }
                        Some(TransportEvent::Closed { code, reason }) => {
                            debug!(
                                connection = %self.config.name,
                                code,
                                reason = reason.as_deref().unwrap_or(""),
                                "transport closed unexpectedly"
                            );
                            break Some(code);
                        }
                        None => break Some(ABNORMAL_CLOSURE),
                    },

                    _ = async { heartbeat.as_mut().unwrap().0.tick().await }, if heartbeat.is_some() => {
                        let beat = Arc::clone(&heartbeat.as_ref().unwrap().1);
                        if let Some(value) = beat() {
                            match serde_json::to_string(&self.protocol.marshal(value)) {
                                Ok(text) => {
                                    if let Err(err) = transport.send(Payload::Text(text)).await {
                                        self.emit_error(ConnectionError::Transport(err));
                                    }
                                }
                                Err(err) => self.emit_error(ConnectionError::Encode(err)),
                            }
                        }
                    }
                }
            };

            match close_code {
                None => break 'lifecycle,
                Some(code) => {
                    // Replaced wholesale on reconnect, never reused.
                    drop(transport);
                    match self.schedule_reconnect(&mut commands, code).await {
                        BackoffOutcome::Retry => continue 'lifecycle,
                        BackoffOutcome::Stop => break 'lifecycle,
                    }
                }
            }
        }
    }

    /// Runs the reconnect protocol after an unexpected closure with `code`.
    ///
    /// Emits `Disconnected`, consults the reconnect predicate, and sleeps
    /// for the backoff delay while watching for an explicit close, which
    /// cancels the pending attempt. A connection that was closed locally in
    /// the meantime stays closed and emits nothing further.
    async fn schedule_reconnect(
        &self,
        commands: &mut mpsc::UnboundedReceiver<Command>,
        code: u16,
    ) -> BackoffOutcome {
        if self.state.state() == ConnectionState::Closed {
            // A local close raced the teardown; it already reported.
            return BackoffOutcome::Stop;
        }

        self.emit(ConnectionEvent::Disconnected {
            connection_name: self.config.name.clone(),
            timestamp: Instant::now(),
            code,
        });

        if !self.protocol.should_reconnect(code) {
            self.state.mark_closed();
            self.emit_closed(code, CloseSource::Remote);
            return BackoffOutcome::Stop;
        }

        // The pre-increment counter value indexes the backoff lookup.
        let attempt = self.state.begin_reconnect();

        if let Some(max) = self.config.max_attempts {
            if attempt + 1 > max {
                warn!(
                    connection = %self.config.name,
                    attempts = attempt + 1,
                    "giving up: reconnect attempts exhausted"
                );
                self.emit_error(ConnectionError::ReconnectExhausted {
                    attempts: attempt + 1,
                });
                self.state.mark_closed();
                self.emit_closed(code, CloseSource::Remote);
                return BackoffOutcome::Stop;
            }
        }

        let Some(delay) = self.config.backoff.delay_for_attempt(attempt as usize) else {
            // A `None` policy turns every unexpected drop into a closure.
            self.state.mark_closed();
            self.emit_closed(code, CloseSource::Remote);
            return BackoffOutcome::Stop;
        };

        #[cfg(feature = "metrics")]
        metrics::counter!(
            "resocket_reconnect_attempts_total",
            "connection" => self.config.name.clone()
        )
        .increment(1);

        debug!(
            connection = %self.config.name,
            attempt,
            ?delay,
            "reconnecting after backoff delay"
        );

        let sleep = tokio::time::sleep(delay);
        tokio::pin!(sleep);
        loop {
            tokio::select! {
                biased;

                cmd = commands.recv() => match cmd {
                    Some(Command::Close { .. }) | None => {
                        // Explicit close cancels the pending reconnect.
                        self.state.mark_closed();
                        return BackoffOutcome::Stop;
                    }
                    Some(Command::Send(_)) => {
                        self.emit_error(ConnectionError::NotConnected);
                    }
                },

                _ = &mut sleep => return BackoffOutcome::Retry,
            }
        }
    }

    fn emit(&self, event: ConnectionEvent) {
        self.config.emit(event);
    }

    fn emit_error(&self, cause: ConnectionError) {
        self.config.emit(ConnectionEvent::Error {
            connection_name: self.config.name.clone(),
            timestamp: Instant::now(),
            cause: Arc::new(cause),
        });
    }

    fn emit_closed(&self, code: u16, source: CloseSource) {
        self.config.emit(ConnectionEvent::Closed {
            connection_name: self.config.name.clone(),
            timestamp: Instant::now(),
            code,
            source,
        });
    }
}
