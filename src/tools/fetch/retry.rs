use super::utils::backoff_delay;
use crate::error::TransportError;
use std::time::Duration;

/// What the loop does after a failed remote attempt.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(super) enum NextStep {
    /// Replay the same attempt number with an insecure context.
    InsecureReplay,
    /// Sleep, then move on to the next attempt.
    Backoff(Duration),
    /// No attempts left.
    GiveUp,
}

/// Per-call retry bookkeeping.
#[derive(Debug)]
pub(super) struct AttemptState {
    max_retries: u32,
    backoff_factor: f64,
    allow_insecure_fallback: bool,
    insecure: bool,
    calls: u32,
}

impl AttemptState {
    pub(super) fn new(max_retries: u32, backoff_factor: f64, allow_insecure_fallback: bool) -> Self {
        Self {
            max_retries,
            backoff_factor,
            allow_insecure_fallback,
            insecure: false,
            calls: 0,
        }
    }

    pub(super) fn insecure(&self) -> bool {
        self.insecure
    }

    pub(super) fn calls(&self) -> u32 {
        self.calls
    }

    pub(super) fn record_call(&mut self) {
        self.calls += 1;
    }

    /// Decide the next step after `err` on `attempt` (1-based).
    ///
    /// The insecure flag flips at most once, and only for certificate failures.
    pub(super) fn after_failure(&mut self, attempt: u32, err: &TransportError) -> NextStep {
        if self.allow_insecure_fallback && !self.insecure && err.is_certificate_failure() {
            self.insecure = true;
            return NextStep::InsecureReplay;
        }
        if attempt < self.max_retries {
            NextStep::Backoff(backoff_delay(self.backoff_factor, attempt))
        } else {
            NextStep::GiveUp
        }
    }
}
