//! Core rate limiter implementation.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tokio::time::{self, Instant};
use tracing::{debug, info, instrument, trace};

use super::window::{RateLimitWindow, TimeWindow};
use crate::error::{GuardError, Result};

/// Windows a blocking caller may wait through when no bound is configured.
pub const DEFAULT_MAX_WAIT_WINDOWS: u32 = 10;

/// What a caller experiences when the current window is saturated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Policy {
    /// Suspend until the window rolls over, then try again
    #[default]
    Blocking,
    /// Fail immediately with [`GuardError::RateLimitExceeded`]
    Rejecting,
}

/// Immutable limiter parameters.
#[derive(Debug, Clone)]
pub struct RateLimiterConfig {
    /// Maximum admissions per window
    request_limit: u64,
    /// Window length
    window: Duration,
    /// Behaviour on a saturated window
    policy: Policy,
    /// Upper bound on a blocking wait
    max_wait: Duration,
}

impl RateLimiterConfig {
    /// Create a blocking configuration whose waits are bounded by
    /// [`DEFAULT_MAX_WAIT_WINDOWS`] windows.
    pub fn new(request_limit: u64, window: Duration) -> Self {
        Self {
            request_limit,
            window,
            policy: Policy::default(),
            max_wait: window.saturating_mul(DEFAULT_MAX_WAIT_WINDOWS),
        }
    }

    /// Create a configuration admitting `request_limit` calls per `unit`.
    pub fn per_unit(unit: TimeWindow, request_limit: u64) -> Self {
        Self::new(request_limit, unit.duration())
    }

    /// Set the saturation policy.
    pub fn with_policy(mut self, policy: Policy) -> Self {
        self.policy = policy;
        self
    }

    /// Bound how long a blocking caller may wait for admission.
    pub fn with_max_wait(mut self, max_wait: Duration) -> Self {
        self.max_wait = max_wait;
        self
    }

    pub fn request_limit(&self) -> u64 {
        self.request_limit
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    pub fn policy(&self) -> Policy {
        self.policy
    }

    pub fn max_wait(&self) -> Duration {
        self.max_wait
    }

    /// Reject values that would make the limiter meaningless.
    pub fn validate(&self) -> Result<()> {
        if self.request_limit == 0 {
            return Err(GuardError::Config(
                "request limit must be positive".to_string(),
            ));
        }
        if self.window.is_zero() {
            return Err(GuardError::Config(
                "window duration must be positive".to_string(),
            ));
        }
        if self.max_wait.is_zero() {
            return Err(GuardError::Config(
                "max wait must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Proof that a caller was admitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Permit {
    window_start: Instant,
    sequence: u64,
}

impl Permit {
    /// Start of the window this permit was granted in.
    pub fn window_start(&self) -> Instant {
        self.window_start
    }

    /// 1-based position of this admission within its window.
    pub fn sequence(&self) -> u64 {
        self.sequence
    }
}

/// Outcome of a single non-blocking admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// A slot in the current window was claimed
    Granted(Permit),
    /// The window is saturated; capacity returns after `retry_after`
    Denied { retry_after: Duration },
}

impl Admission {
    pub fn is_granted(&self) -> bool {
        matches!(self, Admission::Granted(_))
    }

    pub fn permit(self) -> Option<Permit> {
        match self {
            Admission::Granted(permit) => Some(permit),
            Admission::Denied { .. } => None,
        }
    }
}

/// A fixed-window admission gate shared by all callers of one endpoint.
///
/// All window state sits behind one lock, so the rollover, the capacity
/// check and the increment are a single step for every caller. The lock is
/// never held across an await point. Share one instance through an `Arc`.
///
/// Slots are never handed back: a permit stands for an attempt, whatever the
/// outcome of the request it guarded.
pub struct RateLimiter {
    config: RateLimiterConfig,
    window: Mutex<RateLimitWindow>,
}

impl RateLimiter {
    /// Create a limiter, failing if the configuration is invalid.
    pub fn new(config: RateLimiterConfig) -> Result<Self> {
        config.validate()?;

        info!(
            limit = config.request_limit,
            window = ?config.window,
            policy = ?config.policy,
            max_wait = ?config.max_wait,
            "Rate limiter initialized"
        );

        Ok(Self {
            window: Mutex::new(RateLimitWindow::new(Instant::now())),
            config,
        })
    }

    /// Create a blocking limiter admitting `request_limit` calls per `unit`.
    pub fn per_unit(unit: TimeWindow, request_limit: u64) -> Result<Self> {
        Self::new(RateLimiterConfig::per_unit(unit, request_limit))
    }

    /// Try to claim a slot in the current window without waiting.
    ///
    /// A denial leaves the window untouched.
    pub fn try_acquire(&self) -> Admission {
        let now = Instant::now();
        let limit = self.config.request_limit;
        let mut window = self.window.lock();

        if window.roll_forward(now, self.config.window) {
            debug!(limit = limit, "Rate limit window rolled over");
        }

        match window.try_admit(limit) {
            Some(sequence) => {
                trace!(sequence = sequence, limit = limit, "Admission granted");
                Admission::Granted(Permit {
                    window_start: window.window_start(),
                    sequence,
                })
            }
            None => {
                let retry_after = window.remaining_time(now, self.config.window);
                trace!(retry_after = ?retry_after, "Admission denied, window saturated");
                Admission::Denied { retry_after }
            }
        }
    }

    /// Acquire a permit according to the configured policy.
    ///
    /// Under [`Policy::Blocking`] this waits for the next window (bounded by
    /// the configured max wait); under [`Policy::Rejecting`] it fails at once
    /// when the window is saturated.
    pub async fn acquire(&self) -> Result<Permit> {
        self.acquire_with_cancel(std::future::pending::<()>()).await
    }

    /// Acquire a permit, abandoning a blocking wait once `cancel` resolves.
    ///
    /// Abandoning a wait never consumes a slot.
    #[instrument(level = "trace", skip(self, cancel))]
    pub async fn acquire_with_cancel<F>(&self, cancel: F) -> Result<Permit>
    where
        F: Future<Output = ()>,
    {
        let mut retry_after = match self.try_acquire() {
            Admission::Granted(permit) => return Ok(permit),
            Admission::Denied { retry_after } => retry_after,
        };

        if self.config.policy == Policy::Rejecting {
            debug!(retry_after = ?retry_after, "Rate limit exceeded");
            return Err(GuardError::RateLimitExceeded { retry_after });
        }

        let started = Instant::now();
        let deadline = started
            .checked_add(self.config.max_wait)
            .unwrap_or_else(|| started + self.config.window);
        tokio::pin!(cancel);

        loop {
            let wake_at = (Instant::now() + retry_after).min(deadline);
            debug!(
                wait = ?wake_at.saturating_duration_since(Instant::now()),
                "Waiting for next window"
            );

            tokio::select! {
                biased;
                _ = &mut cancel => {
                    debug!(waited = ?started.elapsed(), "Admission wait cancelled");
                    return Err(GuardError::Cancelled);
                }
                _ = time::sleep_until(wake_at) => {}
            }

            match self.try_acquire() {
                Admission::Granted(permit) => {
                    debug!(
                        waited = ?started.elapsed(),
                        sequence = permit.sequence,
                        "Admission granted after wait"
                    );
                    return Ok(permit);
                }
                Admission::Denied { retry_after: next } => {
                    if Instant::now() >= deadline {
                        let waited = started.elapsed();
                        debug!(waited = ?waited, "Admission wait timed out");
                        return Err(GuardError::AdmissionTimeout { waited });
                    }
                    retry_after = next;
                }
            }
        }
    }

    /// Admissions granted in the current window.
    pub fn current_count(&self) -> u64 {
        self.current_window().count()
    }

    /// Slots left in the current window.
    pub fn remaining(&self) -> u64 {
        self.config
            .request_limit
            .saturating_sub(self.current_window().count())
    }

    /// Time until the current window rolls over.
    pub fn duration_until_reset(&self) -> Duration {
        let now = Instant::now();
        self.current_window_at(now)
            .remaining_time(now, self.config.window)
    }

    /// Start of the current window.
    pub fn window_start(&self) -> Instant {
        self.current_window().window_start()
    }

    /// Get the limit for this limiter.
    pub fn limit(&self) -> u64 {
        self.config.request_limit
    }

    /// Get the window length for this limiter.
    pub fn window(&self) -> Duration {
        self.config.window
    }

    /// Get the saturation policy for this limiter.
    pub fn policy(&self) -> Policy {
        self.config.policy
    }

    pub fn config(&self) -> &RateLimiterConfig {
        &self.config
    }

    fn current_window(&self) -> RateLimitWindow {
        self.current_window_at(Instant::now())
    }

    /// Copy of the window state after applying any due rollover.
    fn current_window_at(&self, now: Instant) -> RateLimitWindow {
        let mut window = self.window.lock();
        window.roll_forward(now, self.config.window);
        window.clone()
    }
}
