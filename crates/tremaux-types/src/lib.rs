//! `tremaux-types` – Shared vocabulary
//!
//! Headings, turn commands, sensor readings, line levels, grid cells and the
//! [`MazeError`] taxonomy used by every other crate in the workspace.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Absolute compass heading of the vehicle, ordered by rotation index 0–3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    North = 0,
    East = 1,
    South = 2,
    West = 3,
}

impl Direction {
    /// All headings in clockwise rotation order.
    pub const ALL: [Direction; 4] = [
        Direction::North,
        Direction::East,
        Direction::South,
        Direction::West,
    ];

    /// Rotation index of this heading (North = 0, clockwise).
    pub fn index(self) -> u8 {
        self as u8
    }

    /// Heading for a rotation index, taken modulo 4.
    pub fn from_index(index: u8) -> Self {
        Self::ALL[usize::from(index % 4)]
    }

    /// Heading after executing `turn` from this heading.
    ///
    /// `TurnLeft` is −1 mod 4, `TurnRight` +1, `TurnAround` +2 and
    /// `GoStraight` leaves the heading unchanged.
    pub fn turned(self, turn: TurnCommand) -> Self {
        Self::from_index(self.index() + turn.quarter_turns())
    }

    /// Heading that points toward the given side of the vehicle.
    pub fn toward(self, sensor: Sensor) -> Self {
        self.turned(sensor.turn())
    }

    /// Grid displacement of one step in this heading. North is +y.
    pub fn offset(self) -> (i32, i32) {
        match self {
            Direction::North => (0, 1),
            Direction::East => (1, 0),
            Direction::South => (0, -1),
            Direction::West => (-1, 0),
        }
    }
}

/// Turn decision produced by the navigation engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TurnCommand {
    GoStraight,
    TurnLeft,
    TurnRight,
    TurnAround,
}

impl TurnCommand {
    /// Clockwise quarter turns this command applies to the heading.
    pub fn quarter_turns(self) -> u8 {
        match self {
            TurnCommand::GoStraight => 0,
            TurnCommand::TurnRight => 1,
            TurnCommand::TurnAround => 2,
            TurnCommand::TurnLeft => 3,
        }
    }
}

/// One of the three directional proximity sensors, named by the side of the
/// vehicle it faces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Sensor {
    Left,
    Straight,
    Right,
}

impl Sensor {
    /// The turn that points the vehicle down this sensor's path.
    pub fn turn(self) -> TurnCommand {
        match self {
            Sensor::Left => TurnCommand::TurnLeft,
            Sensor::Straight => TurnCommand::GoStraight,
            Sensor::Right => TurnCommand::TurnRight,
        }
    }
}

impl fmt::Display for Sensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sensor::Left => write!(f, "left"),
            Sensor::Straight => write!(f, "front"),
            Sensor::Right => write!(f, "right"),
        }
    }
}

/// Outcome of sampling a proximity sensor once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SensorReading {
    /// No wall: the path in that direction is navigable.
    Open,
    /// A wall is present.
    Blocked,
    /// The underlying port read failed.
    ///
    /// Treated as a wall wherever it is classified.  `SensorGateway::read`
    /// never returns it: exhausted retries surface as
    /// [`MazeError::SensorReadExhausted`] instead.
    ReadFailure,
}

/// Electrical level of a digital line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Low,
    High,
}

impl Level {
    pub fn from_bool(high: bool) -> Self {
        if high { Level::High } else { Level::Low }
    }

    pub fn is_high(self) -> bool {
        self == Level::High
    }

    /// The opposite level.
    pub fn inverted(self) -> Self {
        match self {
            Level::Low => Level::High,
            Level::High => Level::Low,
        }
    }
}

/// Direction a digital line is configured for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PinMode {
    Input,
    Output,
}

/// A hardware line number as understood by the digital I/O port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Line(pub u32);

impl fmt::Display for Line {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "gpio{}", self.0)
    }
}

/// A maze cell / corridor endpoint in visit-grid coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Cell {
    pub x: i32,
    pub y: i32,
}

impl Cell {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// The adjacent cell one step away in `heading`.
    pub fn step(self, heading: Direction) -> Self {
        let (dx, dy) = heading.offset();
        Self::new(self.x + dx, self.y + dy)
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Position and heading of the vehicle in the visit grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pose {
    pub position: Cell,
    pub heading: Direction,
}

impl Pose {
    /// Pose at the maze entrance: `position`, heading North.
    pub fn entrance(position: Cell) -> Self {
        Self {
            position,
            heading: Direction::North,
        }
    }
}

/// Visit counts fed to the decision engine.
///
/// A sensed wall is represented by [`NeighborCounts::WALL`], not by a real
/// visit count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NeighborCounts {
    pub left: u8,
    pub straight: u8,
    pub right: u8,
    pub current: u8,
}

impl NeighborCounts {
    /// Sentinel count for a direction that must never be taken.
    pub const WALL: u8 = 3;

    pub fn new(left: u8, straight: u8, right: u8, current: u8) -> Self {
        Self {
            left,
            straight,
            right,
            current,
        }
    }

    /// Count recorded for the path behind `sensor`.
    pub fn toward(&self, sensor: Sensor) -> u8 {
        match sensor {
            Sensor::Left => self.left,
            Sensor::Straight => self.straight,
            Sensor::Right => self.right,
        }
    }
}

impl fmt::Display for NeighborCounts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "left={} straight={} right={} current={}",
            self.left, self.straight, self.right, self.current
        )
    }
}

/// Failure reported by a digital I/O port operation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct PortFault(pub String);

impl PortFault {
    pub fn new(details: impl Into<String>) -> Self {
        Self(details.into())
    }
}

/// Fatal errors of a maze-solving run.
///
/// Every variant terminates the run; [`MazeError::exit_code`] gives each
/// category its own process exit code.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MazeError {
    #[error("Hardware acquisition failure on {line}: {details}")]
    HardwareAcquisition { line: Line, details: String },

    #[error("Hardware configuration failure on {line}: {details}")]
    HardwareConfig { line: Line, details: String },

    #[error("Reading the {sensor} sensor failed {attempts} times: {details}")]
    SensorReadExhausted {
        sensor: Sensor,
        attempts: u32,
        details: String,
    },

    #[error("Writing {line} failed {attempts} times: {details}")]
    ActuatorWriteExhausted {
        line: Line,
        attempts: u32,
        details: String,
    },

    #[error("Decision contradiction: no admissible route for {counts}")]
    DecisionContradiction { counts: NeighborCounts },

    #[error("Failed to make progress in {attempts} consecutive cycles")]
    ProgressExhausted { attempts: u32 },

    #[error("Cell {cell} lies outside the {width}x{height} visit grid")]
    GridBounds {
        cell: Cell,
        width: usize,
        height: usize,
    },

    #[error("Initialization failed: {0}")]
    Initialization(Box<MazeError>),

    #[error("Run stopped by operator request")]
    Stopped,
}

impl MazeError {
    /// Process exit code for this failure. Distinct per category, always
    /// negative; `0` is reserved for a run that reached the exit.
    pub fn exit_code(&self) -> i32 {
        match self {
            MazeError::Initialization(_) => -1,
            MazeError::ProgressExhausted { .. } => -2,
            MazeError::HardwareAcquisition { .. } => -3,
            MazeError::HardwareConfig { .. } => -4,
            MazeError::SensorReadExhausted { .. } => -5,
            MazeError::ActuatorWriteExhausted { .. } => -6,
            MazeError::DecisionContradiction { .. } => -7,
            MazeError::GridBounds { .. } => -8,
            MazeError::Stopped => -9,
        }
    }
}
