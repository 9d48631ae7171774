//! Backoff policies for reconnection delays.
//!
//! This crate provides the `IntervalFunction` abstraction and the
//! [`BackoffPolicy`] enum consumed by the connection state machine:
//!
//! - **Fixed interval**: constant delay between attempts
//! - **Exponential backoff**: delay grows by a configurable multiplier,
//!   capped at a maximum interval
//! - **Exponential random backoff**: exponential growth with randomization
//!   to prevent thundering herd
//! - **Custom function-based backoff**
//!
//! All policies are pure: given the same attempt index, a deterministic
//! policy instance always returns the same delay, and jittered policies
//! stay within their documented bounds.
//!
//! # Examples
//!
//! ```rust
//! use resocket_backoff::BackoffPolicy;
//! use std::time::Duration;
//!
//! let policy = BackoffPolicy::exponential(
//!     Duration::from_millis(100),
//!     Duration::from_secs(5),
//! );
//!
//! assert_eq!(policy.delay_for_attempt(0), Some(Duration::from_millis(100)));
//! assert_eq!(policy.delay_for_attempt(1), Some(Duration::from_millis(200)));
//! ```

mod interval;
mod policy;

pub use interval::{
    ExponentialBackoff, ExponentialRandomBackoff, FixedInterval, FnInterval, IntervalFunction,
};
pub use policy::BackoffPolicy;
