//! Back-off configuration and the reconnect policy built on it.

use std::time::Duration;

use rand::Rng;

/// Configuration for exponential back-off timing between reconnect attempts.
///
/// The back-off starts at `initial_delay` and doubles on each consecutive
/// failure, capped at `max_delay`.
///
/// # Default Values
/// - `initial_delay`: 100 milliseconds
/// - `max_delay`: 30 seconds
///
/// # Invariants
/// - `initial_delay` must not exceed `max_delay`
/// - `initial_delay` must be at least 1 millisecond
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BackoffConfig {
    /// Delay used for the first retry after a failure.
    pub initial_delay: Duration,
    /// Maximum back-off delay once retries have increased exponentially.
    pub max_delay: Duration,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(30),
        }
    }
}

impl BackoffConfig {
    /// Clamp delays to sane bounds and ensure `initial_delay <= max_delay`.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::time::Duration;
    ///
    /// use tether::client::BackoffConfig;
    ///
    /// let cfg = BackoffConfig {
    ///     initial_delay: Duration::from_millis(5),
    ///     max_delay: Duration::from_millis(1),
    /// };
    ///
    /// let normalized = cfg.normalized();
    /// assert_eq!(normalized.initial_delay, Duration::from_millis(1));
    /// assert_eq!(normalized.max_delay, Duration::from_millis(5));
    /// ```
    #[must_use]
    pub fn normalized(mut self) -> Self {
        self.initial_delay = self.initial_delay.max(Duration::from_millis(1));
        self.max_delay = self.max_delay.max(Duration::from_millis(1));
        if self.initial_delay > self.max_delay {
            std::mem::swap(&mut self.initial_delay, &mut self.max_delay);
        }
        self
    }

    /// Un-jittered delay before the 1-based `attempt`.
    #[must_use]
    pub fn delay_for(self, attempt: u32) -> Duration {
        let cfg = self.normalized();
        let exponent = attempt.saturating_sub(1).min(31);
        cfg.initial_delay
            .saturating_mul(1_u32 << exponent)
            .min(cfg.max_delay)
    }
}

/// When and how often the client retries after a failed bootstrap or an
/// unexpected socket close.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use tether::client::{BackoffConfig, ReconnectPolicy};
///
/// let policy = ReconnectPolicy::default()
///     .with_backoff(BackoffConfig {
///         initial_delay: Duration::from_millis(50),
///         max_delay: Duration::from_secs(2),
///     })
///     .with_jitter(false)
///     .with_max_attempts(5);
/// assert_eq!(policy.delay_for(3), Duration::from_millis(200));
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReconnectPolicy {
    /// Back-off between attempts; `None` retries immediately.
    pub backoff: Option<BackoffConfig>,
    /// Draw each delay uniformly from `[delay / 2, delay]`.
    pub jitter: bool,
    /// Consecutive attempts allowed before giving up; `None` never gives up.
    pub max_attempts: Option<u32>,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            backoff: Some(BackoffConfig::default()),
            jitter: true,
            max_attempts: None,
        }
    }
}

impl ReconnectPolicy {
    /// Retry at once, forever.
    #[must_use]
    pub fn immediate() -> Self {
        Self {
            backoff: None,
            jitter: false,
            max_attempts: None,
        }
    }

    /// Replace the back-off schedule.
    #[must_use]
    pub fn with_backoff(mut self, backoff: BackoffConfig) -> Self {
        self.backoff = Some(backoff);
        self
    }

    /// Enable or disable jitter.
    #[must_use]
    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    /// Give up after `max_attempts` consecutive failures.
    #[must_use]
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = Some(max_attempts);
        self
    }

    /// Delay before the 1-based `attempt` of the current failure streak.
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let Some(backoff) = self.backoff else {
            return Duration::ZERO;
        };
        let delay = backoff.delay_for(attempt);
        if self.jitter && !delay.is_zero() {
            rand::thread_rng().gen_range(delay / 2..=delay)
        } else {
            delay
        }
    }

    /// Whether `attempt` lies beyond the configured limit.
    #[must_use]
    pub fn is_exhausted(&self, attempt: u32) -> bool {
        self.max_attempts.is_some_and(|max| attempt > max)
    }
}
