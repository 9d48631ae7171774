//! Connection state tracking.

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU8, Ordering};
use std::sync::Arc;

/// Lifecycle state of a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No transport exists and none has been requested.
    Idle,

    /// A transport has been created and its open is pending.
    Connecting,

    /// Connected and healthy.
    Open,

    /// The transport was torn down and the backoff timer is running.
    ReconnectPending,

    /// Terminal. No further automatic transitions occur.
    Closed,
}

/// Shared, lock-free view of a connection's lifecycle state.
///
/// All mutation happens inside the connection's driver task; handles held by
/// callers only observe.
#[derive(Clone)]
pub struct StateHandle {
    state: Arc<AtomicU8>,

    /// True from an unexpected drop until the replacement transport opens.
    reconnecting: Arc<AtomicBool>,

    /// Reconnection cycles since the last successful open.
    attempts: Arc<AtomicU32>,
}

impl StateHandle {
    /// Creates a new handle in the `Idle` state.
    pub fn new() -> Self {
        Self {
            state: Arc::new(AtomicU8::new(Self::encode_state(ConnectionState::Idle))),
            reconnecting: Arc::new(AtomicBool::new(false)),
            attempts: Arc::new(AtomicU32::new(0)),
        }
    }

    /// Returns the current lifecycle state.
    pub fn state(&self) -> ConnectionState {
        Self::decode_state(self.state.load(Ordering::Acquire))
    }

    /// True strictly between a successful open and any disconnect or close.
    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Open
    }

    /// True from the moment a drop schedules backoff until the replacement
    /// transport opens or the connection is explicitly closed.
    pub fn is_reconnecting(&self) -> bool {
        self.reconnecting.load(Ordering::Acquire)
    }

    /// Number of reconnection cycles since the last successful open.
    pub fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::Acquire)
    }

    pub(crate) fn set_state(&self, state: ConnectionState) {
        self.state
            .store(Self::encode_state(state), Ordering::Release);
    }

    /// Marks the connection open, resetting the attempt counter. Returns
    /// whether this open concluded a reconnection cycle.
    pub(crate) fn mark_open(&self) -> bool {
        let was_reconnecting = self.reconnecting.swap(false, Ordering::AcqRel);
        self.attempts.store(0, Ordering::Release);
        self.set_state(ConnectionState::Open);
        was_reconnecting
    }

    /// Enters the reconnect path. Returns the attempt index to use for the
    /// backoff lookup (the pre-increment counter value).
    pub(crate) fn begin_reconnect(&self) -> u32 {
        self.reconnecting.store(true, Ordering::Release);
        self.set_state(ConnectionState::ReconnectPending);
        self.attempts.fetch_add(1, Ordering::AcqRel)
    }

    /// Transitions to the terminal `Closed` state, clearing both flags.
    pub(crate) fn mark_closed(&self) {
        self.reconnecting.store(false, Ordering::Release);
        self.set_state(ConnectionState::Closed);
    }

    fn encode_state(state: ConnectionState) -> u8 {
        match state {
            ConnectionState::Idle => 0,
            ConnectionState::Connecting => 1,
            ConnectionState::Open => 2,
            ConnectionState::ReconnectPending => 3,
            ConnectionState::Closed => 4,
        }
    }

    fn decode_state(encoded: u8) -> ConnectionState {
        match encoded {
            0 => ConnectionState::Idle,
            1 => ConnectionState::Connecting,
            2 => ConnectionState::Open,
            3 => ConnectionState::ReconnectPending,
            _ => ConnectionState::Closed,
        }
    }
}

impl Default for StateHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for StateHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateHandle")
            .field("state", &self.state())
            .field("reconnecting", &self.is_reconnecting())
            .field("attempts", &self.attempts())
            .finish()
    }
}
