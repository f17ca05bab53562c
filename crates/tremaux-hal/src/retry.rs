//! Bounded, backoff-free retry of individual port operations.
//!
//! Transient failures are presumed to be register glitches, so an operation
//! is simply repeated up to [`RetryPolicy::max_attempts`] times.  Every failed
//! attempt is logged as a warning; exhaustion is reported to the caller as
//! [`RetryExhausted`] and never recovered here.

use tracing::warn;
use tremaux_types::{Line, PortFault};

/// Number of attempts granted to a single port operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first.  Values below 1 behave as 1.
    pub max_attempts: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_attempts: 5 }
    }
}

/// Every attempt of an operation failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryExhausted {
    pub attempts: u32,
    /// Fault reported by the last attempt.
    pub fault: PortFault,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32) -> Self {
        Self { max_attempts }
    }

    /// Run `op` against `line` until it succeeds or the attempts run out.
    pub fn run<T>(
        &self,
        line: Line,
        mut op: impl FnMut() -> Result<T, PortFault>,
    ) -> Result<T, RetryExhausted> {
        let attempts = self.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match op() {
                Ok(value) => return Ok(value),
                Err(fault) => {
                    warn!(%line, attempt, attempts, error = %fault, "port operation failed");
                    if attempt >= attempts {
                        return Err(RetryExhausted { attempts, fault });
                    }
                    attempt += 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn succeeds_after_transient_failures() {
        let policy = RetryPolicy::new(5);
        let mut calls = 0;
        let result = policy.run(Line(1), || {
            calls += 1;
            if calls < 3 {
                Err(PortFault::new("glitch"))
            } else {
                Ok(calls)
            }
        });
        assert_eq!(result, Ok(3));
    }

    #[test]
    fn gives_up_after_max_attempts() {
        let policy = RetryPolicy::default();
        let mut calls = 0;
        let result: Result<(), _> = policy.run(Line(1), || {
            calls += 1;
            Err(PortFault::new(format!("fail {calls}")))
        });
        assert_eq!(calls, 5);
        let err = result.unwrap_err();
        assert_eq!(err.attempts, 5);
        assert_eq!(err.fault, PortFault::new("fail 5"));
    }

    #[test]
    fn zero_attempts_still_tries_once() {
        let policy = RetryPolicy::new(0);
        let mut calls = 0;
        let _ = policy.run(Line(1), || -> Result<(), PortFault> {
            calls += 1;
            Err(PortFault::new("nope"))
        });
        assert_eq!(calls, 1);
    }
}
