//! Intersection handling: sense, decide, turn, then commit.
//!
//! [`handle`] is transactional with respect to the navigation state.  All
//! sensing, grid lookups and the decision happen first; the physical turn
//! follows; the [`VisitGrid`] marks and the new [`Pose`] are committed only
//! after the turn succeeded.  Any error therefore leaves the caller's pose
//! and grid exactly as they were.
//!
//! Neighbour cells are projected relative to the heading: the cell seen by
//! the left sensor is `position.step(heading.toward(Sensor::Left))`.

use serde::Serialize;
use tracing::{debug, info, instrument};
use tremaux_hal::DigitalPort;
use tremaux_kernel::{VisitGrid, decide};
use tremaux_types::{MazeError, NeighborCounts, Pose, Sensor, SensorReading, TurnCommand};

use crate::vehicle::Vehicle;

/// Marks left on the current cell when leaving it along a fresh or
/// once-crossed route: one for entering, one for leaving.
const PASS_MARKS: u8 = 2;
/// Marks left on a dead end: it must never be chosen again.
const DEAD_END_MARKS: u8 = 3;

/// What happened at one intersection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct IntersectionReport {
    /// Pose on arrival.
    pub from: Pose,
    /// Counts the decision was taken on; walls are [`NeighborCounts::WALL`].
    pub counts: NeighborCounts,
    pub decision: TurnCommand,
    /// Pose after the turn, and after the one-cell advance unless the
    /// decision was [`TurnCommand::TurnAround`].
    pub pose: Pose,
}

/// Handle the intersection the vehicle has just stopped at.
///
/// After a turn towards a side or straight on, the vehicle advances into the
/// consulted neighbour.  [`TurnCommand::TurnAround`] treats the cell as a
/// dead end: the heading reverses and the position stays where it is.
///
/// # Errors
///
/// - sensor failures from [`Vehicle::read`];
/// - [`MazeError::GridBounds`] if an open neighbour lies outside the grid;
/// - [`MazeError::DecisionContradiction`] from [`decide`];
/// - actuator failures from [`Vehicle::turn`].
#[instrument(
    level = "info",
    skip(vehicle, grid),
    fields(cell = %pose.position, heading = ?pose.heading)
)]
pub fn handle<P: DigitalPort>(
    vehicle: &mut Vehicle<P>,
    pose: Pose,
    grid: &mut VisitGrid,
) -> Result<IntersectionReport, MazeError> {
    let from = pose.position;
    let current = grid.count(from)?.saturating_add(1);
    let left = neighbour_count(vehicle, grid, pose, Sensor::Left)?;
    let straight = neighbour_count(vehicle, grid, pose, Sensor::Straight)?;
    let right = neighbour_count(vehicle, grid, pose, Sensor::Right)?;
    let counts = NeighborCounts::new(left, straight, right, current);

    let decision = decide(counts)?;
    let heading = pose.heading.turned(decision);
    let (next, marks) = match decision {
        TurnCommand::TurnAround => (from, DEAD_END_MARKS),
        _ => {
            let next = from.step(heading);
            if !grid.contains(next) {
                return Err(MazeError::GridBounds {
                    cell: next,
                    width: grid.width(),
                    height: grid.height(),
                });
            }
            (next, PASS_MARKS)
        }
    };

    vehicle.turn(decision)?;

    for _ in 0..marks {
        grid.mark(from)?;
    }
    let next_pose = Pose {
        position: next,
        heading,
    };
    info!(%counts, ?decision, to = %next, "intersection handled");
    Ok(IntersectionReport {
        from: pose,
        counts,
        decision,
        pose: next_pose,
    })
}

fn neighbour_count<P: DigitalPort>(
    vehicle: &mut Vehicle<P>,
    grid: &VisitGrid,
    pose: Pose,
    sensor: Sensor,
) -> Result<u8, MazeError> {
    match vehicle.read(sensor)? {
        SensorReading::Open => {
            let cell = pose.position.step(pose.heading.toward(sensor));
            let count = grid.count(cell)?;
            debug!(%sensor, %cell, count, "open neighbour");
            Ok(count)
        }
        SensorReading::Blocked | SensorReading::ReadFailure => Ok(NeighborCounts::WALL),
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tremaux_hal::sim::{PortOp, SimPort};
    use tremaux_hal::{
        ActuatorGateway, DrivePattern, MotorLines, RetryPolicy, SensorGateway, SensorLines,
    };
    use tremaux_types::{Cell, Direction, Level, Line};

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

    fn boxed_in() -> SimPort {
        SimPort::new()
            .with_level(LEFT, Level::High)
            .with_level(FRONT, Level::High)
            .with_level(RIGHT, Level::High)
    }

    #[test]
    fn dead_end_marks_three_times_and_reverses() {
        let mut v = vehicle(boxed_in());
        let mut grid = VisitGrid::new(20, 20);
        let pose = Pose::entrance(Cell::new(10, 10));

        let report = handle(&mut v, pose, &mut grid).unwrap();

        assert_eq!(report.decision, TurnCommand::TurnAround);
        assert_eq!(report.counts, NeighborCounts::new(3, 3, 3, 1));
        assert_eq!(grid.count(Cell::new(10, 10)).unwrap(), 3);
        assert_eq!(
            report.pose,
            Pose {
                position: Cell::new(10, 10),
                heading: Direction::South,
            }
        );
    }

    #[test]
    fn dead_end_at_the_entrance_turns_in_place() {
        let mut v = vehicle(boxed_in());
        let mut grid = VisitGrid::default();
        let entrance = grid.entrance();

        let report = handle(&mut v, Pose::entrance(entrance), &mut grid).unwrap();

        assert_eq!(report.decision, TurnCommand::TurnAround);
        assert_eq!(report.pose.position, entrance);
        assert_eq!(report.pose.heading, Direction::South);
        assert_eq!(grid.count(entrance).unwrap(), 3);
    }

    #[test]
    fn turn_around_spins_left_for_two_units() {
        let mut v = vehicle(boxed_in());
        let mut grid = VisitGrid::new(20, 20);
        handle(&mut v, Pose::entrance(Cell::new(10, 10)), &mut grid).unwrap();

        let spin = MotorLines::default().pattern(DrivePattern::SpinLeft);
        let energised: Vec<Line> = v
            .port()
            .writes()
            .iter()
            .filter(|(_, level)| *level == Level::Low)
            .map(|(line, _)| *line)
            .collect();
        assert_eq!(energised, spin.to_vec());
        assert!(v.port().held_lines().is_empty());
    }

    #[test]
    fn passing_through_marks_twice_and_advances_into_the_chosen_cell() {
        // Only the right side is open.
        let port = SimPort::new()
            .with_level(LEFT, Level::High)
            .with_level(FRONT, Level::High);
        let mut v = vehicle(port);
        let mut grid = VisitGrid::new(20, 20);

        let report = handle(&mut v, Pose::entrance(Cell::new(10, 10)), &mut grid).unwrap();

        assert_eq!(report.decision, TurnCommand::TurnRight);
        assert_eq!(grid.count(Cell::new(10, 10)).unwrap(), 2);
        assert_eq!(grid.count(Cell::new(11, 10)).unwrap(), 0);
        assert_eq!(
            report.pose,
            Pose {
                position: Cell::new(11, 10),
                heading: Direction::East,
            }
        );
    }

    #[test]
    fn neighbours_are_projected_relative_to_heading() {
        // Facing West, the left sensor looks South and the right looks North.
        let mut v = vehicle(SimPort::new().with_level(FRONT, Level::High));
        let mut grid = VisitGrid::new(20, 20);
        grid.mark(Cell::new(5, 4)).unwrap();
        let pose = Pose {
            position: Cell::new(5, 5),
            heading: Direction::West,
        };

        let report = handle(&mut v, pose, &mut grid).unwrap();

        assert_eq!(report.counts, NeighborCounts::new(1, 3, 0, 1));
        assert_eq!(report.decision, TurnCommand::TurnRight);
        assert_eq!(report.pose.position, Cell::new(5, 6));
        assert_eq!(report.pose.heading, Direction::North);
    }

    #[test]
    fn open_space_spirals_left_until_the_start_is_its_left_neighbour() {
        let mut v = vehicle(SimPort::new());
        let mut grid = VisitGrid::new(20, 20);
        let mut pose = Pose::entrance(Cell::new(10, 10));
        let mut trace = vec![pose.position];
        let mut decisions = Vec::new();

        for _ in 0..4 {
            let report = handle(&mut v, pose, &mut grid).unwrap();
            decisions.push(report.decision);
            pose = report.pose;
            trace.push(pose.position);
        }

        assert_eq!(
            decisions,
            [
                TurnCommand::TurnLeft,
                TurnCommand::TurnLeft,
                TurnCommand::TurnLeft,
                TurnCommand::TurnRight,
            ]
        );
        assert_eq!(
            trace,
            [
                Cell::new(10, 10),
                Cell::new(9, 10),
                Cell::new(9, 9),
                Cell::new(10, 9),
                Cell::new(10, 8),
            ]
        );
    }

    #[test]
    fn leaving_the_grid_fails_without_touching_state() {
        let mut v = vehicle(SimPort::new());
        let mut grid = VisitGrid::default();
        let first = handle(&mut v, Pose::entrance(grid.entrance()), &mut grid).unwrap();
        assert_eq!(first.pose.position, Cell::new(9, 0));
        assert_eq!(first.pose.heading, Direction::West);

        let before = grid.clone();
        v.port_mut().clear_writes();
        let err = handle(&mut v, first.pose, &mut grid).unwrap_err();

        assert_eq!(
            err,
            MazeError::GridBounds {
                cell: Cell::new(9, -1),
                width: 20,
                height: 20,
            }
        );
        assert_eq!(grid, before);
        assert!(v.port().writes().is_empty());
    }

    #[test]
    fn exhausted_front_sensor_leaves_state_unchanged() {
        let mut port = SimPort::new();
        port.fail_next(PortOp::Read, FRONT, 5);
        let mut v = vehicle(port);
        let mut grid = VisitGrid::new(20, 20);
        grid.mark(Cell::new(10, 10)).unwrap();
        let before = grid.clone();

        let err = handle(&mut v, Pose::entrance(Cell::new(10, 10)), &mut grid).unwrap_err();

        assert!(matches!(
            err,
            MazeError::SensorReadExhausted {
                sensor: Sensor::Straight,
                attempts: 5,
                ..
            }
        ));
        assert_eq!(err.exit_code(), -5);
        assert_eq!(grid, before);
        assert!(v.port().writes().is_empty());
        assert!(v.port().held_lines().is_empty());
    }

    #[test]
    fn four_failed_reads_still_succeed() {
        let mut port = boxed_in();
        port.fail_next(PortOp::Read, FRONT, 4);
        let mut v = vehicle(port);
        let mut grid = VisitGrid::new(20, 20);

        let report = handle(&mut v, Pose::entrance(Cell::new(10, 10)), &mut grid).unwrap();
        assert_eq!(report.decision, TurnCommand::TurnAround);
    }

    #[test]
    fn failed_turn_leaves_state_unchanged() {
        let mut port = boxed_in();
        let spin = MotorLines::default().pattern(DrivePattern::SpinLeft);
        port.fail_next(PortOp::Acquire, spin[0], 1);
        let mut v = vehicle(port);
        let mut grid = VisitGrid::new(20, 20);
        let before = grid.clone();

        let err = handle(&mut v, Pose::entrance(Cell::new(10, 10)), &mut grid).unwrap_err();

        assert!(matches!(err, MazeError::HardwareAcquisition { .. }));
        assert_eq!(grid, before);
    }

    /// Port whose sensor lines reflect the walls around `pose` in a maze
    /// given as a set of open passages between neighbouring cells.
    struct MazePort {
        inner: SimPort,
        passages: Vec<(Cell, Cell)>,
        pose: Pose,
    }

    impl MazePort {
        fn is_open(&self, a: Cell, b: Cell) -> bool {
            self.passages
                .iter()
                .any(|&(p, q)| (p, q) == (a, b) || (p, q) == (b, a))
        }
    }

    impl DigitalPort for MazePort {
        fn is_held(&self, line: Line) -> Result<bool, tremaux_types::PortFault> {
            self.inner.is_held(line)
        }
        fn acquire(&mut self, line: Line) -> Result<(), tremaux_types::PortFault> {
            self.inner.acquire(line)
        }
        fn release(&mut self, line: Line) -> Result<(), tremaux_types::PortFault> {
            self.inner.release(line)
        }
        fn set_mode(
            &mut self,
            line: Line,
            mode: tremaux_types::PinMode,
        ) -> Result<(), tremaux_types::PortFault> {
            self.inner.set_mode(line, mode)
        }
        fn write(&mut self, line: Line, level: Level) -> Result<(), tremaux_types::PortFault> {
            self.inner.write(line, level)
        }
        fn read(&mut self, line: Line) -> Result<Level, tremaux_types::PortFault> {
            self.inner.read(line)?;
            let sensor = match line {
                LEFT => Sensor::Left,
                FRONT => Sensor::Straight,
                RIGHT => Sensor::Right,
                _ => return Ok(Level::Low),
            };
            let here = self.pose.position;
            let there = here.step(self.pose.heading.toward(sensor));
            Ok(Level::from_bool(!self.is_open(here, there)))
        }
    }

    #[test]
    fn follows_fresh_passages_to_the_exit() {
        //   (1,2) exit
        //     │
        //   (1,1) ─ (2,1) ─ (3,1)
        //             │
        //           (2,0)
        let exit = Cell::new(1, 2);
        let port = MazePort {
            inner: SimPort::new(),
            passages: vec![
                (Cell::new(2, 0), Cell::new(2, 1)),
                (Cell::new(2, 1), Cell::new(1, 1)),
                (Cell::new(2, 1), Cell::new(3, 1)),
                (Cell::new(1, 1), exit),
            ],
            pose: Pose::entrance(Cell::new(2, 0)),
        };
        let mut v = Vehicle::new(
            port,
            SensorGateway::new(SensorLines::default(), Level::Low, RetryPolicy::default()),
            ActuatorGateway::new(
                MotorLines::default(),
                Level::Low,
                Duration::ZERO,
                RetryPolicy::default(),
            ),
        );
        let mut grid = VisitGrid::new(5, 5);
        let mut pose = Pose::entrance(Cell::new(2, 0));
        let mut decisions = Vec::new();

        while pose.position != exit {
            assert!(decisions.len() < 20, "no exit after {decisions:?}");
            v.port_mut().pose = pose;
            let report = handle(&mut v, pose, &mut grid).unwrap();
            decisions.push(report.decision);
            pose = report.pose;
        }

        assert_eq!(
            decisions,
            [
                TurnCommand::GoStraight,
                TurnCommand::TurnLeft,
                TurnCommand::TurnRight,
            ]
        );
        assert_eq!(grid.count(Cell::new(2, 0)).unwrap(), 2);
        assert_eq!(grid.count(Cell::new(2, 1)).unwrap(), 2);
        assert_eq!(grid.count(Cell::new(1, 1)).unwrap(), 2);
        assert_eq!(grid.count(Cell::new(3, 1)).unwrap(), 0);
        assert_eq!(pose.heading, Direction::North);
        assert!(v.port().inner.held_lines().is_empty());
    }

    #[test]
    fn returning_to_an_exhausted_dead_end_is_a_contradiction() {
        let mut v = vehicle(boxed_in());
        let mut grid = VisitGrid::new(20, 20);
        let cell = Cell::new(10, 10);
        for _ in 0..3 {
            grid.mark(cell).unwrap();
        }
        let before = grid.clone();

        let err = handle(&mut v, Pose::entrance(cell), &mut grid).unwrap_err();

        assert!(matches!(err, MazeError::DecisionContradiction { .. }));
        assert_eq!(err.exit_code(), -7);
        assert_eq!(grid, before);
    }
}
