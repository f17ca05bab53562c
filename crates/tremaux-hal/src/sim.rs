//! In-process simulated port for tests and bench runs without hardware.
//!
//! [`SimPort`] keeps the ownership, mode and level of every line in memory
//! and records every write, so tests can assert that each acquired line was
//! released and each energised motor returned to idle.  Reads can be
//! scripted per line, and any operation can be made to fail a given number
//! of times to exercise the retry discipline.
//!
//! # Example
//!
//! ```rust
//! use tremaux_hal::{DigitalPort, sim::SimPort};
//! use tremaux_types::{Level, Line, PinMode};
//!
//! let mut port = SimPort::new().with_level(Line(18), Level::High);
//! port.acquire(Line(18)).unwrap();
//! port.set_mode(Line(18), PinMode::Input).unwrap();
//! assert_eq!(port.read(Line(18)).unwrap(), Level::High);
//! port.release(Line(18)).unwrap();
//! ```

use std::cell::RefCell;
use std::collections::{HashMap, HashSet, VecDeque};

use tremaux_types::{Level, Line, PinMode, PortFault};

use crate::port::DigitalPort;

/// Port operations that can be made to fail with [`SimPort::fail_next`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PortOp {
    IsHeld,
    Acquire,
    Release,
    SetMode,
    Write,
    Read,
}

/// A simulated digital I/O port.  Lines read [`Level::Low`] unless a level
/// or a script says otherwise.
#[derive(Debug, Default)]
pub struct SimPort {
    held: HashSet<Line>,
    modes: HashMap<Line, PinMode>,
    levels: HashMap<Line, Level>,
    scripts: HashMap<Line, VecDeque<Level>>,
    faults: RefCell<HashMap<(PortOp, Line), u32>>,
    writes: Vec<(Line, Level)>,
    reads: HashMap<Line, usize>,
}

impl SimPort {
    /// Create a port with every line free and low.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`set_level`][Self::set_level].
    pub fn with_level(mut self, line: Line, level: Level) -> Self {
        self.set_level(line, level);
        self
    }

    /// Set the level `line` reads once its script (if any) is exhausted.
    pub fn set_level(&mut self, line: Line, level: Level) {
        self.levels.insert(line, level);
    }

    /// Queue levels returned by successive reads of `line`, ahead of its
    /// steady level.
    pub fn script_reads(&mut self, line: Line, levels: impl IntoIterator<Item = Level>) {
        self.scripts.entry(line).or_default().extend(levels);
    }

    /// Make the next `times` calls of `op` on `line` fail.
    pub fn fail_next(&mut self, op: PortOp, line: Line, times: u32) {
        *self.faults.get_mut().entry((op, line)).or_default() += times;
    }

    /// Mark `line` as held by some other owner.
    pub fn hold_externally(&mut self, line: Line) {
        self.held.insert(line);
    }

    /// Lines currently held, in ascending order.
    pub fn held_lines(&self) -> Vec<Line> {
        let mut lines: Vec<Line> = self.held.iter().copied().collect();
        lines.sort();
        lines
    }

    /// Every successful write, in order.
    pub fn writes(&self) -> &[(Line, Level)] {
        &self.writes
    }

    /// Forget the recorded writes.
    pub fn clear_writes(&mut self) {
        self.writes.clear();
    }

    /// Last level driven onto (or configured for) `line`.
    pub fn level(&self, line: Line) -> Option<Level> {
        self.levels.get(&line).copied()
    }

    /// Configured mode of `line`, if any.
    pub fn mode(&self, line: Line) -> Option<PinMode> {
        self.modes.get(&line).copied()
    }

    /// Number of successful reads of `line`.
    pub fn read_count(&self, line: Line) -> usize {
        self.reads.get(&line).copied().unwrap_or(0)
    }

    fn inject(&self, op: PortOp, line: Line) -> Result<(), PortFault> {
        match self.faults.borrow_mut().get_mut(&(op, line)) {
            Some(remaining) if *remaining > 0 => {
                *remaining -= 1;
                Err(PortFault::new(format!("injected {op:?} fault on {line}")))
            }
            _ => Ok(()),
        }
    }

    fn require_held(&self, line: Line) -> Result<(), PortFault> {
        if self.held.contains(&line) {
            Ok(())
        } else {
            Err(PortFault::new(format!("{line} is not held")))
        }
    }
}

impl DigitalPort for SimPort {
    fn is_held(&self, line: Line) -> Result<bool, PortFault> {
        self.inject(PortOp::IsHeld, line)?;
        Ok(self.held.contains(&line))
    }

    fn acquire(&mut self, line: Line) -> Result<(), PortFault> {
        self.inject(PortOp::Acquire, line)?;
        if !self.held.insert(line) {
            return Err(PortFault::new(format!("{line} is busy")));
        }
        Ok(())
    }

    fn release(&mut self, line: Line) -> Result<(), PortFault> {
        self.inject(PortOp::Release, line)?;
        if !self.held.remove(&line) {
            return Err(PortFault::new(format!("{line} is not held")));
        }
        Ok(())
    }

    fn set_mode(&mut self, line: Line, mode: PinMode) -> Result<(), PortFault> {
        self.inject(PortOp::SetMode, line)?;
        self.require_held(line)?;
        self.modes.insert(line, mode);
        Ok(())
    }

    fn write(&mut self, line: Line, level: Level) -> Result<(), PortFault> {
        self.inject(PortOp::Write, line)?;
        self.require_held(line)?;
        if self.modes.get(&line) != Some(&PinMode::Output) {
            return Err(PortFault::new(format!("{line} is not an output")));
        }
        self.levels.insert(line, level);
        self.writes.push((line, level));
        Ok(())
    }

    fn read(&mut self, line: Line) -> Result<Level, PortFault> {
        self.inject(PortOp::Read, line)?;
        self.require_held(line)?;
        *self.reads.entry(line).or_default() += 1;
        if let Some(level) = self.scripts.get_mut(&line).and_then(VecDeque::pop_front) {
            return Ok(level);
        }
        Ok(self.levels.get(&line).copied().unwrap_or(Level::Low))
    }
}
