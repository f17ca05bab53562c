//! [`ProgressGuard`] – stalled-cycle detector.
//!
//! A navigation cycle is *non-decisive* when its corridor traversal stopped
//! on the very first sample: the vehicle turned but never moved.  The guard
//! counts consecutive non-decisive cycles and trips once `threshold` of them
//! happen in a row; any cycle that made progress resets the count.
//!
//! # Example
//!
//! ```rust
//! use tremaux_runtime::progress_guard::ProgressGuard;
//!
//! let mut guard = ProgressGuard::new(3);
//!
//! assert!(!guard.record(false));
//! assert!(!guard.record(false));
//! assert!(guard.record(false)); // third stall in a row
//!
//! // Moving clears the streak.
//! assert!(!guard.record(true));
//! assert_eq!(guard.stalled(), 0);
//! ```

/// Counts consecutive cycles that made no progress.
#[derive(Debug, Clone)]
pub struct ProgressGuard {
    /// Consecutive stalls that trip the guard.
    threshold: u32,
    stalled: u32,
}

impl ProgressGuard {
    /// A `threshold` of 0 is treated as 1.
    pub fn new(threshold: u32) -> Self {
        Self {
            threshold: threshold.max(1),
            stalled: 0,
        }
    }

    /// Record the outcome of one cycle.
    ///
    /// Returns `true` when `threshold` consecutive cycles have now stalled.
    pub fn record(&mut self, progressed: bool) -> bool {
        if progressed {
            self.stalled = 0;
        } else {
            self.stalled = self.stalled.saturating_add(1);
        }
        self.is_exhausted()
    }

    pub fn is_exhausted(&self) -> bool {
        self.stalled >= self.threshold
    }

    pub fn stalled(&self) -> u32 {
        self.stalled
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    pub fn reset(&mut self) {
        self.stalled = 0;
    }
}
