//! [`ControlLoop`] – the top-level navigation cycle.
//!
//! A run goes through three phases:
//!
//! 1. **Initialise** – every motor output is configured and driven idle.  A
//!    failure here is wrapped in [`MazeError::Initialization`].
//! 2. **Demonstrate** (optional) – a left, a right and a 180° turn, each
//!    followed by a pause.  The tracked heading follows the turns, so
//!    navigation starts facing the opposite way.
//! 3. **Navigate** – alternate corridor traversal and intersection handling
//!    until a corridor runs out of the maze.
//!
//! The loop ends with a [`RunSummary`] on exit, or with the first fatal
//! [`MazeError`].  On error the motors are driven idle again, best-effort.
//!
//! # Stop requests
//!
//! [`ControlLoop::stop_handle`] hands out a shared flag.  Setting it (from a
//! signal handler, say) makes the loop return [`MazeError::Stopped`] at the
//! next cycle boundary, never in the middle of a turn.
//!
//! # Example
//!
//! ```rust
//! use std::time::Duration;
//! use tremaux_hal::sim::SimPort;
//! use tremaux_hal::{ActuatorGateway, MotorLines, RetryPolicy, SensorGateway, SensorLines};
//! use tremaux_kernel::VisitGrid;
//! use tremaux_runtime::{ControlLoop, ControlLoopConfig, Vehicle};
//! use tremaux_types::{Level, Line};
//!
//! // Walls on both sides, nothing ahead: the first corridor is the exit.
//! let port = SimPort::new()
//!     .with_level(Line(11), Level::High)
//!     .with_level(Line(19), Level::High);
//! let vehicle = Vehicle::new(
//!     port,
//!     SensorGateway::new(SensorLines::default(), Level::Low, RetryPolicy::default()),
//!     ActuatorGateway::new(MotorLines::default(), Level::Low, Duration::ZERO, RetryPolicy::default()),
//! );
//! let config = ControlLoopConfig { demo_turns: false, ..ControlLoopConfig::default() };
//! let mut control = ControlLoop::new(vehicle, VisitGrid::default(), config);
//! let summary = control.run().unwrap();
//! assert_eq!(summary.corridors, 1);
//! ```

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use std::thread;
use std::time::Duration;

use serde::Serialize;
use tracing::{error, info, instrument, warn};
use tremaux_hal::DigitalPort;
use tremaux_kernel::VisitGrid;
use tremaux_types::{Cell, MazeError, Pose, TurnCommand};

use crate::corridor::{self, CorridorConfig, CorridorOutcome};
use crate::intersection::{self, IntersectionReport};
use crate::progress_guard::ProgressGuard;
use crate::vehicle::Vehicle;

/// Turns performed by the start-up demonstration.
const DEMO_TURNS: [TurnCommand; 3] = [
    TurnCommand::TurnLeft,
    TurnCommand::TurnRight,
    TurnCommand::TurnAround,
];

// ─────────────────────────────────────────────────────────────────────────────
// Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Configuration bundle for [`ControlLoop`].
#[derive(Debug, Clone)]
pub struct ControlLoopConfig {
    pub corridor: CorridorConfig,
    /// Consecutive non-decisive cycles tolerated before giving up.
    pub max_stalled_cycles: u32,
    /// Run the turn demonstration before navigating.
    pub demo_turns: bool,
    /// Pause after each demonstration turn.
    pub demo_pause: Duration,
}

impl Default for ControlLoopConfig {
    fn default() -> Self {
        Self {
            corridor: CorridorConfig::default(),
            max_stalled_cycles: 5,
            demo_turns: true,
            demo_pause: Duration::from_secs(1),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// RunSummary
// ─────────────────────────────────────────────────────────────────────────────

/// Outcome of a run that reached the exit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub start: Pose,
    pub end: Pose,
    /// Corridors traversed, including the one leading out.
    pub corridors: u32,
    /// Every intersection handled, in order.
    pub intersections: Vec<IntersectionReport>,
    /// Cells crossed at least once.
    pub visited_cells: usize,
}

impl RunSummary {
    /// Positions the vehicle occupied, from the start to the last cell.
    pub fn trace(&self) -> Vec<Cell> {
        std::iter::once(self.start.position)
            .chain(self.intersections.iter().map(|r| r.pose.position))
            .collect()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// ControlLoop
// ─────────────────────────────────────────────────────────────────────────────

/// Owns the vehicle and the navigation state for one run.
pub struct ControlLoop<P: DigitalPort> {
    vehicle: Vehicle<P>,
    pose: Pose,
    grid: VisitGrid,
    config: ControlLoopConfig,
    progress: ProgressGuard,
    stop: Arc<AtomicBool>,
}

impl<P: DigitalPort> ControlLoop<P> {
    /// Start at the grid's entrance, heading North.
    pub fn new(vehicle: Vehicle<P>, grid: VisitGrid, config: ControlLoopConfig) -> Self {
        let pose = Pose::entrance(grid.entrance());
        let progress = ProgressGuard::new(config.max_stalled_cycles);
        Self {
            vehicle,
            pose,
            grid,
            config,
            progress,
            stop: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Override the starting pose.
    pub fn with_start(mut self, pose: Pose) -> Self {
        self.pose = pose;
        self
    }

    /// Shared flag that requests a stop at the next cycle boundary.
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop)
    }

    pub fn pose(&self) -> Pose {
        self.pose
    }

    pub fn grid(&self) -> &VisitGrid {
        &self.grid
    }

    pub fn vehicle(&self) -> &Vehicle<P> {
        &self.vehicle
    }

    pub fn into_vehicle(self) -> Vehicle<P> {
        self.vehicle
    }

    /// Run until the vehicle leaves the maze or a fatal error occurs.
    ///
    /// # Errors
    ///
    /// The first fatal [`MazeError`]; see [`MazeError::exit_code`] for the
    /// process exit status each maps to.
    #[instrument(level = "info", skip(self), fields(start = %self.pose.position))]
    pub fn run(&mut self) -> Result<RunSummary, MazeError> {
        let result = self.navigate();
        if let Err(e) = &result {
            error!(error = %e, pose = ?self.pose, "run aborted");
            if let Err(idle) = self.vehicle.idle_motors() {
                warn!(error = %idle, "could not return motors to idle");
            }
        }
        result
    }

    fn navigate(&mut self) -> Result<RunSummary, MazeError> {
        self.vehicle
            .idle_motors()
            .map_err(|e| MazeError::Initialization(Box::new(e)))?;
        info!("motor outputs initialised");

        if self.config.demo_turns {
            self.demonstrate_turns()?;
        }

        let mut summary = RunSummary {
            start: self.pose,
            end: self.pose,
            corridors: 0,
            intersections: Vec::new(),
            visited_cells: 0,
        };
        loop {
            if self.stop.load(Ordering::SeqCst) {
                info!("stop requested");
                return Err(MazeError::Stopped);
            }

            let corridor = corridor::traverse(&mut self.vehicle, &self.config.corridor)?;
            summary.corridors += 1;
            if corridor.outcome == CorridorOutcome::ReachedExit {
                summary.end = self.pose;
                summary.visited_cells = self.grid.visited_cells();
                info!(
                    corridors = summary.corridors,
                    intersections = summary.intersections.len(),
                    "maze exited"
                );
                return Ok(summary);
            }

            if self.progress.record(corridor.samples > 1) {
                return Err(MazeError::ProgressExhausted {
                    attempts: self.progress.threshold(),
                });
            }

            let report = intersection::handle(&mut self.vehicle, self.pose, &mut self.grid)?;
            self.pose = report.pose;
            summary.intersections.push(report);
        }
    }

    #[instrument(level = "info", skip(self))]
    fn demonstrate_turns(&mut self) -> Result<(), MazeError> {
        for turn in DEMO_TURNS {
            self.vehicle.turn(turn)?;
            self.pose.heading = self.pose.heading.turned(turn);
            thread::sleep(self.config.demo_pause);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use tremaux_hal::sim::{PortOp, SimPort};
    use tremaux_hal::{
        ActuatorGateway, DrivePattern, MotorLines, RetryPolicy, SensorGateway, SensorLines,
    };
    use tremaux_types::{Direction, Level, Line};

    use super::*;

    const LEFT: Line = Line(11);
    const FRONT: Line = Line(18);
    const RIGHT: Line = Line(19);

    fn vehicle(port: SimPort) -> Vehicle<SimPort> {
        Vehicle::new(
            port,
            SensorGateway::new(SensorLines::default(), Level::Low, RetryPolicy::default()),
            ActuatorGateway::new(
                MotorLines::default(),
                Level::Low,
                Duration::ZERO,
                RetryPolicy::default(),
            ),
        )
    }

    fn config() -> ControlLoopConfig {
        ControlLoopConfig {
            corridor: CorridorConfig {
                max_samples: 20,
                sample_interval: Duration::ZERO,
            },
            demo_pause: Duration::ZERO,
            ..ControlLoopConfig::default()
        }
    }

    fn assert_motors_idle(port: &SimPort) {
        for line in MotorLines::default().all() {
            assert_eq!(port.level(line), Some(Level::High), "{line}");
        }
        assert!(port.held_lines().is_empty());
    }

    #[test]
    fn straight_corridor_exits_without_intersections() {
        let port = SimPort::new()
            .with_level(LEFT, Level::High)
            .with_level(RIGHT, Level::High);
        let mut control = ControlLoop::new(vehicle(port), VisitGrid::default(), config());

        let summary = control.run().unwrap();

        assert_eq!(summary.corridors, 1);
        assert!(summary.intersections.is_empty());
        assert_eq!(
            summary.start,
            Pose {
                position: Cell::new(10, 0),
                heading: Direction::South,
            }
        );
        assert_eq!(summary.end, summary.start);
        assert_eq!(summary.trace(), [Cell::new(10, 0)]);
        assert_motors_idle(control.vehicle().port());
    }

    #[test]
    fn demonstration_turns_left_right_and_around() {
        let port = SimPort::new()
            .with_level(LEFT, Level::High)
            .with_level(RIGHT, Level::High);
        let mut control = ControlLoop::new(vehicle(port), VisitGrid::default(), config());
        let summary = control.run().unwrap();
        assert_eq!(summary.start.heading, Direction::South);

        let lines = MotorLines::default();
        let spins: Vec<Line> = control
            .vehicle()
            .port()
            .writes()
            .iter()
            .filter(|(_, level)| *level == Level::Low)
            .map(|(line, _)| *line)
            .collect();
        let mut expected = Vec::new();
        for pattern in [
            DrivePattern::SpinLeft,
            DrivePattern::SpinRight,
            DrivePattern::SpinLeft,
            DrivePattern::Forward,
        ] {
            expected.extend(lines.pattern(pattern));
        }
        assert_eq!(spins, expected);
    }

    #[test]
    fn stalled_cycles_exhaust_progress() {
        // Wall ahead every time, sides always open: the vehicle keeps turning
        // without ever moving along a corridor.
        let port = SimPort::new().with_level(FRONT, Level::High);
        let start = Pose::entrance(Cell::new(10, 10));
        let config = ControlLoopConfig {
            demo_turns: false,
            ..config()
        };
        let mut control =
            ControlLoop::new(vehicle(port), VisitGrid::default(), config).with_start(start);

        let err = control.run().unwrap_err();

        assert_eq!(err, MazeError::ProgressExhausted { attempts: 5 });
        assert_eq!(err.exit_code(), -2);
        assert_eq!(control.pose().position, Cell::new(10, 8));
        assert_eq!(control.pose().heading, Direction::South);
        assert_motors_idle(control.vehicle().port());
    }

    #[test]
    fn stop_request_ends_the_run() {
        let mut control = ControlLoop::new(vehicle(SimPort::new()), VisitGrid::default(), config());
        control.stop_handle().store(true, Ordering::SeqCst);

        let err = control.run().unwrap_err();

        assert_eq!(err, MazeError::Stopped);
        assert_eq!(err.exit_code(), -9);
        assert_motors_idle(control.vehicle().port());
    }

    #[test]
    fn initialisation_failure_is_wrapped() {
        let mut port = SimPort::new();
        port.fail_next(PortOp::Acquire, MotorLines::default().all()[0], 1);
        let mut control = ControlLoop::new(vehicle(port), VisitGrid::default(), config());

        let err = control.run().unwrap_err();

        assert!(matches!(
            &err,
            MazeError::Initialization(inner)
                if matches!(**inner, MazeError::HardwareAcquisition { .. })
        ));
        assert_eq!(err.exit_code(), -1);
    }

    #[test]
    fn sensor_failure_mid_run_is_fatal_and_idles_motors() {
        let mut port = SimPort::new()
            .with_level(LEFT, Level::High)
            .with_level(RIGHT, Level::High);
        port.fail_next(PortOp::Read, FRONT, 5);
        let mut control = ControlLoop::new(vehicle(port), VisitGrid::default(), config());

        let err = control.run().unwrap_err();

        assert!(matches!(err, MazeError::SensorReadExhausted { .. }));
        assert_eq!(
            control.pose(),
            Pose {
                position: Cell::new(10, 0),
                heading: Direction::South,
            }
        );
        assert_motors_idle(control.vehicle().port());
    }

    #[test]
    fn leaving_the_grid_is_fatal() {
        // Open space from the default entrance runs off the bottom edge.
        let port = SimPort::new().with_level(FRONT, Level::High);
        let config = ControlLoopConfig {
            demo_turns: false,
            ..config()
        };
        let mut control = ControlLoop::new(vehicle(port), VisitGrid::default(), config);

        let err = control.run().unwrap_err();

        assert!(matches!(err, MazeError::GridBounds { .. }));
        assert_eq!(err.exit_code(), -8);
        assert_eq!(control.pose().position, Cell::new(9, 0));
        assert_eq!(control.grid().count(Cell::new(9, 0)).unwrap(), 0);
    }
}
