//! Shared test doubles: a scripted connector handing out in-memory
//! transports the test drives, plus an ordered event recorder.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use resocket::{
    ConnectionError, ConnectionEvent, Connector, Payload, Protocol, Transport, TransportError,
    TransportEvent,
};
use resocket_core::events::EventListener;
use tokio::sync::mpsc;

/// Protocol with a fixed endpoint and default hooks.
pub struct GatewayProtocol;

impl Protocol for GatewayProtocol {
    fn resolve_endpoint(&self) -> Result<String, ConnectionError> {
        Ok("wss://gateway.test/socket".to_string())
    }
}

/// In-memory transport driven by the test through a [`TransportHandle`].
pub struct ChannelTransport {
    events: mpsc::UnboundedReceiver<TransportEvent>,
    sent: mpsc::UnboundedSender<Payload>,
    closed: Arc<Mutex<Option<(u16, Option<String>)>>>,
}

impl Transport for ChannelTransport {
    async fn send(&mut self, payload: Payload) -> Result<(), TransportError> {
        self.sent.send(payload).map_err(|_| TransportError::Closed)
    }

    async fn close(&mut self, code: u16, reason: Option<String>) -> Result<(), TransportError> {
        *self.closed.lock().unwrap() = Some((code, reason));
        Ok(())
    }

    async fn next_event(&mut self) -> Option<TransportEvent> {
        self.events.recv().await
    }
}

/// The far side of a [`ChannelTransport`], held by the test.
pub struct TransportHandle {
    events: mpsc::UnboundedSender<TransportEvent>,
    sent: mpsc::UnboundedReceiver<Payload>,
    closed: Arc<Mutex<Option<(u16, Option<String>)>>>,
}

impl TransportHandle {
    /// Delivers a message from the "remote".
    pub fn push_message(&self, payload: Payload) {
        let _ = self.events.send(TransportEvent::Message(payload));
    }

    /// Raises a transport error without closing the connection.
    pub fn push_error(&self, error: TransportError) {
        let _ = self.events.send(TransportEvent::Error(error));
    }

    /// Simulates the transport closing with the given code.
    pub fn push_close(&self, code: u16) {
        let _ = self.events.send(TransportEvent::Closed { code, reason: None });
    }

    /// Returns the next payload the connection wrote to the wire, if any.
    pub fn try_sent(&mut self) -> Option<Payload> {
        self.sent.try_recv().ok()
    }

    /// Returns all payloads written so far.
    pub fn drain_sent(&mut self) -> Vec<Payload> {
        let mut out = Vec::new();
        while let Ok(payload) = self.sent.try_recv() {
            out.push(payload);
        }
        out
    }

    /// The close the connection requested locally, if any.
    pub fn local_close(&self) -> Option<(u16, Option<String>)> {
        self.closed.lock().unwrap().clone()
    }
}

struct ScriptedInner {
    refusals: Mutex<VecDeque<TransportError>>,
    handles: mpsc::UnboundedSender<TransportHandle>,
    connects: AtomicUsize,
}

/// Connector producing one [`ChannelTransport`] per accepted attempt and
/// publishing the matching [`TransportHandle`] to the test.
#[derive(Clone)]
pub struct ScriptedConnector {
    inner: Arc<ScriptedInner>,
}

/// Stream of transport handles, one per accepted connect attempt.
pub struct HandleStream(mpsc::UnboundedReceiver<TransportHandle>);

impl HandleStream {
    /// Waits for the next accepted connect attempt.
    pub async fn next(&mut self) -> TransportHandle {
        self.0.recv().await.expect("connector dropped")
    }
}

impl ScriptedConnector {
    pub fn new() -> (Self, HandleStream) {
        let (handles, rx) = mpsc::unbounded_channel();
        (
            Self {
                inner: Arc::new(ScriptedInner {
                    refusals: Mutex::new(VecDeque::new()),
                    handles,
                    connects: AtomicUsize::new(0),
                }),
            },
            HandleStream(rx),
        )
    }

    /// Makes the next `n` connect attempts fail with a refused error.
    pub fn refuse_next(&self, n: usize) {
        let mut refusals = self.inner.refusals.lock().unwrap();
        for _ in 0..n {
            refusals.push_back(TransportError::Connect("connection refused".to_string()));
        }
    }

    /// Total connect attempts observed, accepted or refused.
    pub fn connect_count(&self) -> usize {
        self.inner.connects.load(Ordering::SeqCst)
    }
}

impl Connector for ScriptedConnector {
    type Transport = ChannelTransport;

    async fn connect(&self, _endpoint: &str) -> Result<ChannelTransport, TransportError> {
        self.inner.connects.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.inner.refusals.lock().unwrap().pop_front() {
            return Err(err);
        }

        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (sent_tx, sent_rx) = mpsc::unbounded_channel();
        let closed = Arc::new(Mutex::new(None));

        let _ = self.inner.handles.send(TransportHandle {
            events: events_tx,
            sent: sent_rx,
            closed: Arc::clone(&closed),
        });

        Ok(ChannelTransport {
            events: events_rx,
            sent: sent_tx,
            closed,
        })
    }
}

/// Records every lifecycle event as a compact label, in emission order.
#[derive(Clone, Default)]
pub struct EventRecorder {
    events: Arc<Mutex<Vec<String>>>,
}

impl EventRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// All labels recorded so far.
    pub fn snapshot(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    /// Number of recorded labels starting with `prefix`.
    pub fn count(&self, prefix: &str) -> usize {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|label| label.starts_with(prefix))
            .count()
    }
}

impl EventListener<ConnectionEvent> for EventRecorder {
    fn on_event(&self, event: &ConnectionEvent) {
        let label = match event {
            ConnectionEvent::Connected { .. } => "connected".to_string(),
            ConnectionEvent::Reconnected { .. } => "reconnected".to_string(),
            ConnectionEvent::Disconnected { code, .. } => format!("disconnected:{code}"),
            ConnectionEvent::Closed { code, source, .. } => {
                format!("closed:{code}:{source:?}")
            }
            ConnectionEvent::Message { payload, .. } => match payload {
                Payload::Text(text) => format!("message:{text}"),
                Payload::Binary(bytes) => format!("message:<{} bytes>", bytes.len()),
            },
            ConnectionEvent::Error { cause, .. } => format!("error:{cause}"),
        };
        self.events.lock().unwrap().push(label);
    }
}

/// Lets the driver task observe queued work. A tiny sleep both yields and,
/// under a paused clock, nudges virtual time forward.
pub async fn settle() {
    tokio::time::sleep(std::time::Duration::from_millis(1)).await;
}
