//! Condition-polling wait engine.
//!
//! [`ConditionWaiter`] is the generic poll-until-true-or-timeout primitive
//! every higher-level assertion in this crate is built on. Predicates are
//! fallible: failures whose [`FailureKind`] is in the policy's ignored set
//! are swallowed and treated as "not yet true" (the clock keeps running),
//! anything else aborts the wait immediately. On timeout the last observed
//! failure is attached so callers can surface a meaningful cause.

use crate::result::{DriverError, DriverResult, EsperarError, EsperarResult, FailureKind};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Default timeout for wait operations (5 seconds)
pub const DEFAULT_WAIT_TIMEOUT_MS: u64 = 5_000;

/// Default polling interval (50ms)
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 50;

/// Timeout, poll cadence and ignorable failure kinds for one wait.
///
/// Mutable before the first wait call; waits take it by shared reference,
/// so an in-flight wait always sees one consistent policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaitPolicy {
    /// Timeout in milliseconds, wall-clock from the first evaluation
    pub timeout_ms: u64,
    /// Polling interval in milliseconds
    pub poll_interval_ms: u64,
    /// Failure kinds swallowed during polling
    pub ignored: Vec<FailureKind>,
}

impl Default for WaitPolicy {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_WAIT_TIMEOUT_MS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            ignored: Vec::new(),
        }
    }
}

impl WaitPolicy {
    /// Create a policy with defaults and an empty ignored set
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Policy for element-presence predicates: `NotFound` and `Stale` are
    /// expected during page transitions and are ignored.
    #[must_use]
    pub fn element_defaults() -> Self {
        Self {
            ignored: vec![FailureKind::NotFound, FailureKind::Stale],
            ..Self::default()
        }
    }

    /// Set the timeout in milliseconds
    #[must_use]
    pub fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Set the polling interval in milliseconds
    #[must_use]
    pub fn with_poll_interval(mut self, poll_interval_ms: u64) -> Self {
        self.poll_interval_ms = poll_interval_ms;
        self
    }

    /// Add a failure kind to the ignored set
    #[must_use]
    pub fn ignoring(mut self, kind: FailureKind) -> Self {
        if !self.ignored.contains(&kind) {
            self.ignored.push(kind);
        }
        self
    }

    /// Whether a failure kind is swallowed during polling
    #[must_use]
    pub fn ignores(&self, kind: FailureKind) -> bool {
        self.ignored.contains(&kind)
    }

    /// Timeout as a Duration
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Poll interval as a Duration
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// Outcome of a successful wait
#[derive(Debug, Clone)]
pub struct WaitResult {
    /// Time spent waiting
    pub elapsed: Duration,
    /// Description of what was waited for
    pub waited_for: String,
}

/// Poll-until-true-or-timeout primitive.
///
/// The first evaluation happens immediately; subsequent evaluations sleep
/// the poll interval first. All waits block the calling thread; there is
/// no cancellation other than the timeout.
#[derive(Debug, Clone)]
pub struct ConditionWaiter {
    policy: WaitPolicy,
}

impl ConditionWaiter {
    /// Create a waiter with the given policy
    #[must_use]
    pub fn new(policy: WaitPolicy) -> Self {
        Self { policy }
    }

    /// The policy this waiter applies
    #[must_use]
    pub const fn policy(&self) -> &WaitPolicy {
        &self.policy
    }

    /// Repeatedly evaluate `predicate` until it returns `Ok(true)` or the
    /// timeout elapses.
    ///
    /// # Errors
    ///
    /// [`EsperarError::WaitTimedOut`] with the last observed driver failure
    /// attached if the condition never became true; the predicate's own
    /// error, unwrapped, if it fails with a kind the policy does not ignore.
    pub fn wait_until<F>(&self, condition: &str, mut predicate: F) -> EsperarResult<WaitResult>
    where
        F: FnMut() -> DriverResult<bool>,
    {
        let start = Instant::now();
        let timeout = self.policy.timeout();
        let poll_interval = self.policy.poll_interval();
        let mut last_failure: Option<DriverError> = None;

        loop {
            match predicate() {
                Ok(true) => {
                    return Ok(WaitResult {
                        elapsed: start.elapsed(),
                        waited_for: condition.to_string(),
                    });
                }
                Ok(false) => {}
                Err(failure) if self.policy.ignores(failure.kind()) => {
                    last_failure = Some(failure);
                }
                Err(failure) => return Err(EsperarError::Driver(failure)),
            }

            if start.elapsed() >= timeout {
                return Err(EsperarError::WaitTimedOut {
                    condition: condition.to_string(),
                    timeout_ms: self.policy.timeout_ms,
                    cause: last_failure,
                });
            }
            std::thread::sleep(poll_interval);
        }
    }
}

/// Unconditional sleep, for fixed settle delays.
///
/// Use sparingly; never a substitute for condition waiting.
pub fn wait_a_bit(millis: u64) {
    std::thread::sleep(Duration::from_millis(millis));
}
