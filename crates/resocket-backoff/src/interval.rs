//! Interval functions mapping an attempt index to a delay.

use std::time::Duration;

use rand::Rng;

/// A function that computes the delay before a given attempt.
///
/// Implementations must be side-effect free. Deterministic implementations
/// always return the same delay for the same attempt index; randomized
/// implementations must stay within their documented bounds.
pub trait IntervalFunction: Send + Sync {
    /// Returns the delay to wait before the given attempt (0-indexed).
    fn next_interval(&self, attempt: usize) -> Duration;
}

/// A constant delay between attempts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixedInterval {
    delay: Duration,
}

impl FixedInterval {
    /// Creates a fixed interval with the given delay.
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

impl IntervalFunction for FixedInterval {
    fn next_interval(&self, _attempt: usize) -> Duration {
        self.delay
    }
}

/// Exponentially growing delay: `initial * multiplier^attempt`, saturating
/// at the configured maximum interval.
#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    initial: Duration,
    multiplier: f64,
    max_interval: Option<Duration>,
}

impl ExponentialBackoff {
    /// Creates an exponential backoff starting at `initial` with the default
    /// multiplier of 2.0 and no maximum interval.
    pub fn new(initial: Duration) -> Self {
        Self {
            initial,
            multiplier: 2.0,
            max_interval: None,
        }
    }

    /// Sets the growth multiplier (must be >= 1.0).
    pub fn multiplier(mut self, multiplier: f64) -> Self {
        debug_assert!(multiplier >= 1.0, "backoff multiplier must be >= 1.0");
        self.multiplier = multiplier;
        self
    }

    /// Caps the delay at the given maximum interval.
    pub fn max_interval(mut self, max_interval: Duration) -> Self {
        self.max_interval = Some(max_interval);
        self
    }

    fn raw_nanos(&self, attempt: usize) -> f64 {
        // powi overflows to infinity for large attempts; the saturating cast
        // below turns that into u64::MAX, which the cap then bounds.
        self.initial.as_nanos() as f64 * self.multiplier.powi(attempt.min(i32::MAX as usize) as i32)
    }
}

impl IntervalFunction for ExponentialBackoff {
    fn next_interval(&self, attempt: usize) -> Duration {
        let nanos = self.raw_nanos(attempt);
        let capped = match self.max_interval {
            Some(max) => nanos.min(max.as_nanos() as f64),
            None => nanos,
        };
        Duration::from_nanos(capped as u64)
    }
}

/// Exponential backoff with uniform jitter.
///
/// The delay for attempt `n` is drawn uniformly from
/// `[base * (1 - r), base * (1 + r)]` where `base` is the exponential delay
/// and `r` is the randomization factor, then capped at the maximum interval.
#[derive(Debug, Clone)]
pub struct ExponentialRandomBackoff {
    base: ExponentialBackoff,
    randomization_factor: f64,
}

impl ExponentialRandomBackoff {
    /// Creates a jittered exponential backoff.
    ///
    /// `randomization_factor` must be in `[0.0, 1.0]`.
    pub fn new(initial: Duration, randomization_factor: f64) -> Self {
        debug_assert!(
            (0.0..=1.0).contains(&randomization_factor),
            "randomization factor must be in [0.0, 1.0]"
        );
        Self {
            base: ExponentialBackoff::new(initial),
            randomization_factor,
        }
    }

    /// Sets the growth multiplier (must be >= 1.0).
    pub fn multiplier(mut self, multiplier: f64) -> Self {
        self.base = self.base.multiplier(multiplier);
        self
    }

    /// Caps the delay at the given maximum interval.
    pub fn max_interval(mut self, max_interval: Duration) -> Self {
        self.base = self.base.max_interval(max_interval);
        self
    }
}

impl IntervalFunction for ExponentialRandomBackoff {
    fn next_interval(&self, attempt: usize) -> Duration {
        let base = self.base.raw_nanos(attempt);
        let spread = base * self.randomization_factor;
        let nanos = if spread > 0.0 {
            rand::rng().random_range((base - spread)..=(base + spread))
        } else {
            base
        };
        let capped = match self.base.max_interval {
            Some(max) => nanos.min(max.as_nanos() as f64),
            None => nanos,
        };
        Duration::from_nanos(capped.max(0.0) as u64)
    }
}

/// A custom closure-backed interval function.
pub struct FnInterval<F>
where
    F: Fn(usize) -> Duration + Send + Sync,
{
    f: F,
}

impl<F> FnInterval<F>
where
    F: Fn(usize) -> Duration + Send + Sync,
{
    /// Creates an interval function from a closure.
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F> IntervalFunction for FnInterval<F>
where
    F: Fn(usize) -> Duration + Send + Sync,
{
    fn next_interval(&self, attempt: usize) -> Duration {
        (self.f)(attempt)
    }
}
