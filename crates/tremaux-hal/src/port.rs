//! The `DigitalPort` trait: the injected capability every gateway talks to.
//!
//! A port toggles and samples individual hardware lines.  Ownership of a
//! line (acquire / release) is exclusive; a line must be acquired and put
//! into the right [`PinMode`] before it is read or written.  The rest of the
//! stack only ever talks to the trait, so the Linux sysfs backend and the
//! in-process simulator are interchangeable.

use tremaux_types::{Level, Line, PinMode, PortFault};

/// A digital I/O port exposing individually owned hardware lines.
pub trait DigitalPort: Send {
    /// Whether `line` is currently acquired (by anyone).
    ///
    /// # Errors
    ///
    /// Returns [`PortFault`] if the ownership state cannot be determined.
    fn is_held(&self, line: Line) -> Result<bool, PortFault>;

    /// Take exclusive ownership of `line`.
    ///
    /// # Errors
    ///
    /// Returns [`PortFault`] if the line is busy or does not exist.
    fn acquire(&mut self, line: Line) -> Result<(), PortFault>;

    /// Give up ownership of `line`.
    ///
    /// # Errors
    ///
    /// Returns [`PortFault`] if the line was not held or cannot be released.
    fn release(&mut self, line: Line) -> Result<(), PortFault>;

    /// Configure `line` as an input or an output.
    ///
    /// # Errors
    ///
    /// Returns [`PortFault`] if the direction cannot be applied.
    fn set_mode(&mut self, line: Line, mode: PinMode) -> Result<(), PortFault>;

    /// Drive an output line to `level`.
    ///
    /// # Errors
    ///
    /// Returns [`PortFault`] on a (possibly transient) write failure.
    fn write(&mut self, line: Line, level: Level) -> Result<(), PortFault>;

    /// Sample the current level of `line`.
    ///
    /// # Errors
    ///
    /// Returns [`PortFault`] on a (possibly transient) read failure.
    fn read(&mut self, line: Line) -> Result<Level, PortFault>;
}
