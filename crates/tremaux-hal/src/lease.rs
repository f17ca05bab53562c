//! [`LineLease`] – scoped ownership of a set of port lines.
//!
//! Acquiring a lease requests every line that is not already held.  Lines
//! that were held beforehand belong to someone else: the lease uses them but
//! never releases them.  The lines the lease did acquire are released exactly
//! once, either explicitly through [`LineLease::release`] (which reports
//! failures) or best-effort when the lease is dropped on an early-return or
//! panic path.

use tracing::{debug, warn};
use tremaux_types::{Line, MazeError};

use crate::port::DigitalPort;

/// Exclusive use of a set of lines on a [`DigitalPort`] for the lifetime of
/// the lease.
pub struct LineLease<'a, P: DigitalPort + ?Sized> {
    port: &'a mut P,
    acquired: Vec<Line>,
}

impl<'a, P: DigitalPort + ?Sized> LineLease<'a, P> {
    /// Acquire every line in `lines` that is not already held.
    ///
    /// # Errors
    ///
    /// Returns [`MazeError::HardwareAcquisition`] if ownership cannot be
    /// queried or a line cannot be acquired.  Lines acquired before the
    /// failure are released again.
    pub fn acquire(port: &'a mut P, lines: &[Line]) -> Result<Self, MazeError> {
        let mut lease = Self {
            port,
            acquired: Vec::with_capacity(lines.len()),
        };
        for &line in lines {
            let held = lease
                .port
                .is_held(line)
                .map_err(|fault| MazeError::HardwareAcquisition {
                    line,
                    details: format!("ownership query failed: {fault}"),
                })?;
            if held {
                debug!(%line, "line already held; borrowing without taking ownership");
                continue;
            }
            lease
                .port
                .acquire(line)
                .map_err(|fault| MazeError::HardwareAcquisition {
                    line,
                    details: format!("request failed: {fault}"),
                })?;
            lease.acquired.push(line);
        }
        Ok(lease)
    }

    /// The underlying port, for operating on the leased lines.
    pub fn port(&mut self) -> &mut P {
        &mut *self.port
    }

    /// Lines this lease acquired and will release.
    pub fn acquired(&self) -> &[Line] {
        &self.acquired
    }

    /// Release every line this lease acquired.  Calling it again is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`MazeError::HardwareAcquisition`] for the first line that
    /// could not be released; the remaining lines are still attempted.
    pub fn release(&mut self) -> Result<(), MazeError> {
        let mut first_failure = None;
        for line in std::mem::take(&mut self.acquired) {
            if let Err(fault) = self.port.release(line) {
                warn!(%line, error = %fault, "failed to release line");
                first_failure.get_or_insert(MazeError::HardwareAcquisition {
                    line,
                    details: format!("release failed: {fault}"),
                });
            }
        }
        first_failure.map_or(Ok(()), Err)
    }
}

impl<P: DigitalPort + ?Sized> Drop for LineLease<'_, P> {
    fn drop(&mut self) {
        if self.acquired.is_empty() {
            return;
        }
        if let Err(e) = self.release() {
            warn!(error = %e, "line lease dropped with an unreleasable line");
        }
    }
}
