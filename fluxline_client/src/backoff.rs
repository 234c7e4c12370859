//! Delay-sequence strategies for re-admitting failed hosts.
//!
//! Strategies are value-immutable: [`Backoff::next`] and [`Backoff::reset`]
//! return new values without mutating the receiver. A host owns exactly one
//! current strategy value and replaces it on penalize and success.

use rand::Rng;
use std::time::Duration;

/// A fixed delay with uniform jitter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConstantBackoff {
    delay: Duration,
    jitter: f64,
}

impl ConstantBackoff {
    /// Creates a constant strategy. `jitter` is clamped to `[0, 1]`.
    pub fn new(delay: Duration, jitter: f64) -> Self {
        Self {
            delay,
            jitter: jitter.clamp(0.0, 1.0),
        }
    }

    /// The delay before the next re-admission attempt, resampled each call.
    pub fn delay(&self) -> Duration {
        let spread = rand::rng().random_range(-self.jitter..=self.jitter);
        Duration::from_secs_f64(self.delay.as_secs_f64() * (1.0 + spread))
    }

    pub const fn next(self) -> Self {
        self
    }

    pub const fn reset(self) -> Self {
        self
    }
}

/// A doubling delay with random de-correlation, saturating at `max`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExponentialBackoff {
    initial: Duration,
    max: Duration,
    random: u32,
    attempt: u32,
}

impl ExponentialBackoff {
    /// Creates an exponential strategy with its counter at zero.
    pub const fn new(initial: Duration, max: Duration, random: u32) -> Self {
        Self {
            initial,
            max,
            random,
            attempt: 0,
        }
    }

    /// `min(max, initial * 2^max(0, attempt - round(U(0, random))))`.
    pub fn delay(&self) -> Duration {
        let sample = if self.random == 0 {
            0
        } else {
            rand::rng().random_range(0.0..=f64::from(self.random)).round() as u32
        };
        let exponent = self.attempt.saturating_sub(sample).min(31);
        self.initial.saturating_mul(1_u32 << exponent).min(self.max)
    }

    pub const fn next(self) -> Self {
        Self {
            initial: self.initial,
            max: self.max,
            random: self.random,
            attempt: self.attempt.saturating_add(1),
        }
    }

    pub const fn reset(self) -> Self {
        Self {
            initial: self.initial,
            max: self.max,
            random: self.random,
            attempt: 0,
        }
    }
}

/// An interchangeable delay-sequence strategy.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Backoff {
    Constant(ConstantBackoff),
    Exponential(ExponentialBackoff),
}

impl Backoff {
    /// A constant strategy.
    pub fn constant(delay: Duration, jitter: f64) -> Self {
        Self::Constant(ConstantBackoff::new(delay, jitter))
    }

    /// An exponential strategy.
    pub const fn exponential(initial: Duration, max: Duration, random: u32) -> Self {
        Self::Exponential(ExponentialBackoff::new(initial, max, random))
    }

    /// The delay before the next re-admission attempt.
    pub fn delay(&self) -> Duration {
        match self {
            Self::Constant(strategy) => strategy.delay(),
            Self::Exponential(strategy) => strategy.delay(),
        }
    }

    /// The strategy after one more failure.
    pub const fn next(self) -> Self {
        match self {
            Self::Constant(strategy) => Self::Constant(strategy.next()),
            Self::Exponential(strategy) => Self::Exponential(strategy.next()),
        }
    }

    /// The strategy restored to its initial state.
    pub const fn reset(self) -> Self {
        match self {
            Self::Constant(strategy) => Self::Constant(strategy.reset()),
            Self::Exponential(strategy) => Self::Exponential(strategy.reset()),
        }
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::exponential(Duration::from_millis(300), Duration::from_secs(10), 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constant_stays_within_jitter_band() {
        let strategy = ConstantBackoff::new(Duration::from_millis(1000), 0.5);
        for _ in 0..100 {
            let delay = strategy.delay();
            assert!(delay >= Duration::from_millis(500), "{delay:?}");
            assert!(delay <= Duration::from_millis(1500), "{delay:?}");
        }
        assert_eq!(strategy.next(), strategy);
    }

    #[test]
    fn constant_without_jitter_is_exact() {
        let strategy = ConstantBackoff::new(Duration::from_millis(250), 0.0);
        assert_eq!(strategy.delay(), Duration::from_millis(250));
    }

    #[test]
    fn exponential_doubles_until_max() {
        let mut strategy = ExponentialBackoff::new(
            Duration::from_millis(100),
            Duration::from_millis(1000),
            0,
        );
        let mut previous = Duration::ZERO;
        let mut observed = Vec::new();
        for _ in 0..6 {
            let delay = strategy.delay();
            assert!(delay >= previous);
            observed.push(delay.as_millis());
            previous = delay;
            strategy = strategy.next();
        }
        assert_eq!(observed, vec![100, 200, 400, 800, 1000, 1000]);
    }

    #[test]
    fn exponential_reset_restores_initial() {
        let strategy = ExponentialBackoff::new(
            Duration::from_millis(100),
            Duration::from_millis(1000),
            0,
        );
        let advanced = strategy.next().next().next();
        assert!(advanced.delay() > strategy.delay());
        assert_eq!(advanced.reset().delay(), Duration::from_millis(100));
    }

    #[test]
    fn value_semantics() {
        let strategy = Backoff::default();
        let advanced = strategy.next();
        assert_eq!(strategy, Backoff::default());
        assert_ne!(advanced, strategy);
        assert_eq!(advanced.reset(), strategy);
    }
}
