// Copyright 2026 Rendition Contributors
// SPDX-License-Identifier: Apache-2.0

//! Retry policy for snapshot acquisition.
//!
//! The policy has two independent phases. [`WaitFallback`] grants a single
//! free downgrade from `networkidle` to `load` on the first timeout.
//! [`RetryBudget`] bounds ordinary retries. [`AttemptPolicy`] combines them
//! and decides what follows each failed attempt.

use crate::renderer::{NavigationError, WaitStrategy};
use std::time::Duration;

/// One-shot wait-strategy downgrade.
#[derive(Debug, Clone)]
pub struct WaitFallback {
    current: WaitStrategy,
    used: bool,
}

impl WaitFallback {
    pub fn new(initial: WaitStrategy) -> Self {
        Self {
            current: initial,
            used: false,
        }
    }

    pub fn current(&self) -> WaitStrategy {
        self.current
    }

    pub fn is_used(&self) -> bool {
        self.used
    }

    /// Downgrade after `error` if this is the first timeout under
    /// `networkidle`. Returns the new strategy when a downgrade happened.
    pub fn on_failure(&mut self, error: &NavigationError) -> Option<WaitStrategy> {
        if self.used || !error.is_timeout() || self.current != WaitStrategy::NetworkIdle {
            return None;
        }
        self.used = true;
        self.current = WaitStrategy::Load;
        Some(self.current)
    }
}

/// Bounded count of additional attempts.
#[derive(Debug, Clone)]
pub struct RetryBudget {
    remaining: u32,
    delay: Duration,
}

impl RetryBudget {
    pub fn new(retries: u32, delay: Duration) -> Self {
        Self {
            remaining: retries,
            delay,
        }
    }

    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    /// Consume one retry slot, returning the delay to wait before it.
    pub fn take(&mut self) -> Option<Duration> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        Some(self.delay)
    }
}

/// What to do after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextStep {
    /// Retry immediately with a relaxed wait strategy; no retry slot consumed.
    Fallback(WaitStrategy),
    /// Retry with the same strategy after `delay`.
    Retry { delay: Duration },
    GiveUp,
}

/// The full retry state machine for one acquisition.
#[derive(Debug, Clone)]
pub struct AttemptPolicy {
    fallback: WaitFallback,
    budget: RetryBudget,
    attempts: u32,
}

impl AttemptPolicy {
    pub fn new(wait: WaitStrategy, retries: u32, delay: Duration) -> Self {
        Self {
            fallback: WaitFallback::new(wait),
            budget: RetryBudget::new(retries, delay),
            attempts: 0,
        }
    }

    /// The wait strategy for the next attempt.
    pub fn wait(&self) -> WaitStrategy {
        self.fallback.current()
    }

    /// Attempts started so far.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Record the start of an attempt.
    pub fn begin_attempt(&mut self) -> u32 {
        self.attempts += 1;
        self.attempts
    }

    /// Decide what follows a failed attempt.
    pub fn after_failure(&mut self, error: &NavigationError) -> NextStep {
        if let Some(wait) = self.fallback.on_failure(error) {
            return NextStep::Fallback(wait);
        }
        match self.budget.take() {
            Some(delay) => NextStep::Retry { delay },
            None => NextStep::GiveUp,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::ResponseDiagnostics;

    fn timeout(wait: WaitStrategy) -> NavigationError {
        NavigationError::Timeout {
            wait,
            timeout_ms: 100,
            response: None,
        }
    }

    #[test]
    fn test_fallback_only_from_networkidle_timeout() {
        let mut fb = WaitFallback::new(WaitStrategy::Load);
        assert_eq!(fb.on_failure(&timeout(WaitStrategy::Load)), None);

        let mut fb = WaitFallback::new(WaitStrategy::NetworkIdle);
        assert_eq!(fb.on_failure(&NavigationError::Failed("boom".into())), None);
        assert!(!fb.is_used());
        assert_eq!(
            fb.on_failure(&timeout(WaitStrategy::NetworkIdle)),
            Some(WaitStrategy::Load)
        );
        assert!(fb.is_used());
        assert_eq!(fb.on_failure(&timeout(WaitStrategy::Load)), None);
    }

    #[test]
    fn test_budget_counts_down() {
        let mut budget = RetryBudget::new(2, Duration::from_millis(10));
        assert_eq!(budget.take(), Some(Duration::from_millis(10)));
        assert_eq!(budget.take(), Some(Duration::from_millis(10)));
        assert_eq!(budget.take(), None);
        assert_eq!(budget.remaining(), 0);
    }

    #[test]
    fn test_fallback_is_free_then_retries_are_consumed() {
        let mut policy = AttemptPolicy::new(WaitStrategy::NetworkIdle, 1, Duration::ZERO);

        policy.begin_attempt();
        assert_eq!(
            policy.after_failure(&timeout(WaitStrategy::NetworkIdle)),
            NextStep::Fallback(WaitStrategy::Load)
        );
        assert_eq!(policy.wait(), WaitStrategy::Load);

        policy.begin_attempt();
        assert_eq!(
            policy.after_failure(&timeout(WaitStrategy::Load)),
            NextStep::Retry {
                delay: Duration::ZERO
            }
        );

        policy.begin_attempt();
        assert_eq!(
            policy.after_failure(&timeout(WaitStrategy::Load)),
            NextStep::GiveUp
        );
        assert_eq!(policy.attempts(), 3);
    }

    #[test]
    fn test_status_failure_consumes_retry() {
        let mut policy = AttemptPolicy::new(WaitStrategy::NetworkIdle, 0, Duration::ZERO);
        let status = NavigationError::Status(ResponseDiagnostics {
            status: 503,
            status_text: "Service Unavailable".into(),
            headers: Vec::new(),
        });
        assert_eq!(policy.after_failure(&status), NextStep::GiveUp);
        assert_eq!(policy.wait(), WaitStrategy::NetworkIdle);
    }
}
