//! Core infrastructure for resocket.
//!
//! This crate provides the shared functionality used across the resocket
//! connection stack:
//! - Event system for lifecycle observability
//! - Listener registration and ordered dispatch

pub mod events;

pub use events::{EventListener, EventListeners, FnListener, SocketEvent};
