//! Actuator Gateway: energising motor output pairs through a [`DigitalPort`].
//!
//! The vehicle has four drive outputs (forward and reverse for each wheel).
//! A [`DrivePattern`] selects the pair to energise.  Turns are dead-reckoned:
//! a pattern is held for a fixed number of turn units and then returned to
//! idle.  Whatever happens in between, every line of an energised pattern is
//! written back to the idle level before the gateway returns or unwinds.

use std::thread;
use std::time::Duration;

use tracing::{debug, instrument, warn};
use tremaux_types::{Level, Line, MazeError, PinMode, TurnCommand};

use crate::lease::LineLease;
use crate::port::DigitalPort;
use crate::retry::RetryPolicy;

/// Port lines wired to the motor driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MotorLines {
    pub forward_left: Line,
    pub forward_right: Line,
    pub reverse_left: Line,
    pub reverse_right: Line,
}

impl MotorLines {
    pub fn all(&self) -> [Line; 4] {
        [
            self.forward_left,
            self.forward_right,
            self.reverse_left,
            self.reverse_right,
        ]
    }

    /// The pair of outputs energised by `pattern`.
    pub fn pattern(&self, pattern: DrivePattern) -> [Line; 2] {
        match pattern {
            DrivePattern::Forward => [self.forward_left, self.forward_right],
            DrivePattern::SpinLeft => [self.reverse_left, self.forward_right],
            DrivePattern::SpinRight => [self.forward_left, self.reverse_right],
        }
    }
}

impl Default for MotorLines {
    fn default() -> Self {
        Self {
            forward_left: Line(3),
            forward_right: Line(1),
            reverse_left: Line(2),
            reverse_right: Line(0),
        }
    }
}

/// Which pair of motor outputs to energise.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrivePattern {
    /// Both wheels forward.
    Forward,
    /// Left wheel reverse, right wheel forward: rotate counter-clockwise.
    SpinLeft,
    /// Left wheel forward, right wheel reverse: rotate clockwise.
    SpinRight,
}

/// Drives the motor outputs through a [`DigitalPort`].
#[derive(Debug, Clone)]
pub struct ActuatorGateway {
    lines: MotorLines,
    active_level: Level,
    turn_unit: Duration,
    retry: RetryPolicy,
}

impl ActuatorGateway {
    /// `active_level` energises a motor output; the opposite level is idle.
    /// `turn_unit` is the hold time of a 90° turn.
    pub fn new(
        lines: MotorLines,
        active_level: Level,
        turn_unit: Duration,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            lines,
            active_level,
            turn_unit,
            retry,
        }
    }

    pub fn lines(&self) -> &MotorLines {
        &self.lines
    }

    pub fn idle_level(&self) -> Level {
        self.active_level.inverted()
    }

    pub fn turn_unit(&self) -> Duration {
        self.turn_unit
    }

    /// Put every motor output into output mode at the idle level.
    ///
    /// # Errors
    ///
    /// Acquisition, configuration and write failures, as for [`drive`][Self::drive].
    #[instrument(level = "debug", skip(self, port))]
    pub fn initialize<P: DigitalPort + ?Sized>(&self, port: &mut P) -> Result<(), MazeError> {
        let lines = self.lines.all();
        let mut lease = LineLease::acquire(port, &lines)?;
        configure_outputs(lease.port(), &lines)?;
        let idled = write_all(lease.port(), &lines, self.idle_level(), self.retry);
        let released = lease.release();
        idled?;
        released
    }

    /// Energise `pattern` and keep it energised until the returned
    /// [`Engaged`] handle is disengaged or dropped.
    ///
    /// # Errors
    ///
    /// - [`MazeError::HardwareAcquisition`] if a line cannot be acquired.
    /// - [`MazeError::HardwareConfig`] if a line cannot be made an output.
    /// - [`MazeError::ActuatorWriteExhausted`] if a line cannot be energised;
    ///   the pattern is returned to idle before the error is reported.
    #[instrument(level = "debug", skip(self, port))]
    pub fn engage<'a, P: DigitalPort + ?Sized>(
        &self,
        port: &'a mut P,
        pattern: DrivePattern,
    ) -> Result<Engaged<'a, P>, MazeError> {
        let lines = self.lines.pattern(pattern);
        let mut lease = LineLease::acquire(port, &lines)?;
        configure_outputs(lease.port(), &lines)?;
        let mut engaged = Engaged {
            lease,
            lines,
            idle: self.idle_level(),
            retry: self.retry,
            energised: true,
        };
        for line in lines {
            write_line(engaged.lease.port(), line, self.active_level, self.retry)?;
        }
        debug!(?pattern, "drive pattern engaged");
        Ok(engaged)
    }

    /// Hold `pattern` for `duration`, then return it to idle.
    ///
    /// # Errors
    ///
    /// Any stage failing is fatal for this call; see [`engage`][Self::engage]
    /// and [`Engaged::disengage`].
    #[instrument(level = "debug", skip(self, port))]
    pub fn drive<P: DigitalPort + ?Sized>(
        &self,
        port: &mut P,
        pattern: DrivePattern,
        duration: Duration,
    ) -> Result<(), MazeError> {
        let engaged = self.engage(port, pattern)?;
        thread::sleep(duration);
        engaged.disengage()
    }

    /// Execute the physical part of a turn decision.  `GoStraight` needs no
    /// rotation; a 180° turn spins left for two units.
    ///
    /// # Errors
    ///
    /// See [`drive`][Self::drive].
    pub fn turn<P: DigitalPort + ?Sized>(
        &self,
        port: &mut P,
        turn: TurnCommand,
    ) -> Result<(), MazeError> {
        match turn {
            TurnCommand::GoStraight => Ok(()),
            TurnCommand::TurnLeft => self.drive(port, DrivePattern::SpinLeft, self.turn_unit),
            TurnCommand::TurnRight => self.drive(port, DrivePattern::SpinRight, self.turn_unit),
            TurnCommand::TurnAround => {
                self.drive(port, DrivePattern::SpinLeft, self.turn_unit * 2)
            }
        }
    }
}

/// An energised drive pattern holding its lines.
///
/// [`disengage`][Self::disengage] returns the pattern to idle and releases
/// its lines, reporting failures.  Dropping the handle does the same
/// best-effort.
pub struct Engaged<'a, P: DigitalPort + ?Sized> {
    lease: LineLease<'a, P>,
    lines: [Line; 2],
    idle: Level,
    retry: RetryPolicy,
    energised: bool,
}

impl<P: DigitalPort + ?Sized> Engaged<'_, P> {
    /// The port, for sampling sensors while the pattern stays energised.
    pub fn port(&mut self) -> &mut P {
        self.lease.port()
    }

    /// Return every line of the pattern to idle, then release the lines.
    ///
    /// # Errors
    ///
    /// [`MazeError::ActuatorWriteExhausted`] if a line could not be idled
    /// (reported first), otherwise [`MazeError::HardwareAcquisition`] if a
    /// line could not be released.
    pub fn disengage(mut self) -> Result<(), MazeError> {
        self.energised = false;
        let idled = write_all(self.lease.port(), &self.lines, self.idle, self.retry);
        let released = self.lease.release();
        idled?;
        released
    }
}

impl<P: DigitalPort + ?Sized> Drop for Engaged<'_, P> {
    fn drop(&mut self) {
        if !self.energised {
            return;
        }
        if let Err(e) = write_all(self.lease.port(), &self.lines, self.idle, self.retry) {
            warn!(error = %e, "failed to idle drive pattern while unwinding");
        }
    }
}

fn configure_outputs<P: DigitalPort + ?Sized>(
    port: &mut P,
    lines: &[Line],
) -> Result<(), MazeError> {
    for &line in lines {
        port.set_mode(line, PinMode::Output)
            .map_err(|fault| MazeError::HardwareConfig {
                line,
                details: format!("cannot set output mode: {fault}"),
            })?;
    }
    Ok(())
}

fn write_line<P: DigitalPort + ?Sized>(
    port: &mut P,
    line: Line,
    level: Level,
    retry: RetryPolicy,
) -> Result<(), MazeError> {
    retry
        .run(line, || port.write(line, level))
        .map_err(|exhausted| MazeError::ActuatorWriteExhausted {
            line,
            attempts: exhausted.attempts,
            details: exhausted.fault.to_string(),
        })
}

/// Write `level` to every line, attempting all of them even after a failure.
/// Returns the first failure.
fn write_all<P: DigitalPort + ?Sized>(
    port: &mut P,
    lines: &[Line],
    level: Level,
    retry: RetryPolicy,
) -> Result<(), MazeError> {
    let mut first_failure = None;
    for &line in lines {
        if let Err(e) = write_line(port, line, level, retry) {
            first_failure.get_or_insert(e);
        }
    }
    first_failure.map_or(Ok(()), Err)
}
