//! Reconnection backoff policies.

use std::sync::Arc;
use std::time::Duration;

use crate::interval::{
    ExponentialBackoff, ExponentialRandomBackoff, FixedInterval, IntervalFunction,
};

/// Backoff policy defining the delay between reconnection attempts.
pub enum BackoffPolicy {
    /// No automatic reconnection.
    None,

    /// Fixed delay between reconnection attempts.
    Fixed(FixedInterval),

    /// Exponential backoff between attempts.
    Exponential(ExponentialBackoff),

    /// Exponential backoff with randomization to prevent thundering herd.
    ExponentialRandom(ExponentialRandomBackoff),

    /// Custom backoff function.
    Custom(Arc<dyn IntervalFunction>),
}

impl Clone for BackoffPolicy {
    fn clone(&self) -> Self {
        match self {
            Self::None => Self::None,
            Self::Fixed(f) => Self::Fixed(f.clone()),
            Self::Exponential(e) => Self::Exponential(e.clone()),
            Self::ExponentialRandom(e) => Self::ExponentialRandom(e.clone()),
            Self::Custom(c) => Self::Custom(c.clone()),
        }
    }
}

impl BackoffPolicy {
    /// Creates a policy with no reconnection.
    pub fn none() -> Self {
        BackoffPolicy::None
    }

    /// Creates a fixed delay policy.
    pub fn fixed(delay: Duration) -> Self {
        BackoffPolicy::Fixed(FixedInterval::new(delay))
    }

    /// Creates an exponential backoff policy.
    ///
    /// # Arguments
    /// * `initial_delay` - Starting delay (e.g., 100ms)
    /// * `max_delay` - Maximum delay cap (e.g., 5 seconds)
    pub fn exponential(initial_delay: Duration, max_delay: Duration) -> Self {
        BackoffPolicy::Exponential(
            ExponentialBackoff::new(initial_delay)
                .multiplier(2.0)
                .max_interval(max_delay),
        )
    }

    /// Creates an exponential backoff policy with randomization.
    ///
    /// # Arguments
    /// * `initial_delay` - Starting delay
    /// * `max_delay` - Maximum delay cap
    /// * `randomization_factor` - Randomization factor (0.0 to 1.0)
    pub fn exponential_random(
        initial_delay: Duration,
        max_delay: Duration,
        randomization_factor: f64,
    ) -> Self {
        BackoffPolicy::ExponentialRandom(
            ExponentialRandomBackoff::new(initial_delay, randomization_factor)
                .multiplier(2.0)
                .max_interval(max_delay),
        )
    }

    /// Creates a custom policy from any interval function.
    pub fn custom<F>(f: F) -> Self
    where
        F: IntervalFunction + 'static,
    {
        BackoffPolicy::Custom(Arc::new(f))
    }

    /// Returns the delay for a given attempt number, or `None` if the policy
    /// forbids reconnection.
    pub fn delay_for_attempt(&self, attempt: usize) -> Option<Duration> {
        match self {
            BackoffPolicy::None => None,
            BackoffPolicy::Fixed(interval) => Some(interval.next_interval(attempt)),
            BackoffPolicy::Exponential(backoff) => Some(backoff.next_interval(attempt)),
            BackoffPolicy::ExponentialRandom(backoff) => Some(backoff.next_interval(attempt)),
            BackoffPolicy::Custom(func) => Some(func.next_interval(attempt)),
        }
    }
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        // Default: Exponential backoff from 100ms to 5 seconds
        Self::exponential(Duration::from_millis(100), Duration::from_secs(5))
    }
}

impl std::fmt::Debug for BackoffPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::None => write!(f, "BackoffPolicy::None"),
            Self::Fixed(_) => write!(f, "BackoffPolicy::Fixed"),
            Self::Exponential(_) => write!(f, "BackoffPolicy::Exponential"),
            Self::ExponentialRandom(_) => write!(f, "BackoffPolicy::ExponentialRandom"),
            Self::Custom(_) => write!(f, "BackoffPolicy::Custom"),
        }
    }
}
