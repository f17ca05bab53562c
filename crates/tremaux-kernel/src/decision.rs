//! Navigation Decision Engine: the Tremaux tie-break rule.
//!
//! [`decide`] is a pure function of the four [`NeighborCounts`].  A sensed
//! wall arrives as [`NeighborCounts::WALL`]; real counts are compared as if
//! they saturated at 2, so a wall and a twice-crossed path are equally
//! unattractive.
//!
//! Precedence, first match wins:
//!
//! 1. an unvisited path: left, then right, then straight;
//! 2. the current cell was crossed at least twice: a path crossed once,
//!    preferring right, then straight, then left;
//! 3. otherwise the cell is treated as a dead end: turn around.
//!
//! A neighbourhood where every count (current included) is at least 2 cannot
//! arise from a consistent marking history and is rejected as
//! [`MazeError::DecisionContradiction`].

use tracing::{debug, error};
use tremaux_types::{MazeError, NeighborCounts, TurnCommand};

/// Saturation point of a visit count for decision purposes.
const SATURATED: u8 = 2;

/// Choose the next move from the visit counts around the current cell.
///
/// # Errors
///
/// Returns [`MazeError::DecisionContradiction`] for an unreachable
/// neighbourhood.
///
/// # Example
///
/// ```
/// use tremaux_kernel::decision::decide;
/// use tremaux_types::{NeighborCounts, TurnCommand};
///
/// let wall = NeighborCounts::WALL;
/// assert_eq!(decide(NeighborCounts::new(1, 0, 0, 1)).unwrap(), TurnCommand::TurnRight);
/// assert_eq!(decide(NeighborCounts::new(wall, wall, wall, 1)).unwrap(), TurnCommand::TurnAround);
/// assert!(decide(NeighborCounts::new(wall, wall, wall, wall)).is_err());
/// ```
pub fn decide(counts: NeighborCounts) -> Result<TurnCommand, MazeError> {
    let left = counts.left.min(SATURATED);
    let straight = counts.straight.min(SATURATED);
    let right = counts.right.min(SATURATED);
    let current = counts.current.min(SATURATED);

    if left == SATURATED && straight == SATURATED && right == SATURATED && current == SATURATED {
        error!(%counts, "every route around the current cell is exhausted");
        return Err(MazeError::DecisionContradiction { counts });
    }

    let turn = if left == 0 {
        TurnCommand::TurnLeft
    } else if right == 0 {
        TurnCommand::TurnRight
    } else if straight == 0 {
        TurnCommand::GoStraight
    } else if current == SATURATED {
        if right == 1 {
            TurnCommand::TurnRight
        } else if straight == 1 {
            TurnCommand::GoStraight
        } else if left == 1 {
            TurnCommand::TurnLeft
        } else {
            error!(%counts, "no once-crossed route from a twice-crossed cell");
            return Err(MazeError::DecisionContradiction { counts });
        }
    } else {
        TurnCommand::TurnAround
    };

    debug!(%counts, ?turn, "tremaux decision");
    Ok(turn)
}
