//! Corridor traversal: drive forward until something worth deciding on.
//!
//! The forward pattern stays energised while the three sensors are sampled
//! in the order left, front, right.  The traversal stops when
//!
//! - the front reads blocked (a wall ahead), or
//! - a side that was seen blocked earlier in this corridor reads open on two
//!   consecutive samples (a new opening), or
//! - `max_samples` samples passed without either, which is taken as having
//!   left the maze.
//!
//! A side that is already open when the corridor starts does not count: the
//! vehicle is usually still inside the intersection it just left.

use std::thread;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info, instrument};
use tremaux_hal::{DigitalPort, DrivePattern, Engaged, SensorGateway};
use tremaux_types::{MazeError, Sensor, SensorReading};

use crate::vehicle::Vehicle;

/// Consecutive samples a new side opening must persist for.
const OPENING_CONFIRMATIONS: u8 = 2;

#[derive(Debug, Clone)]
pub struct CorridorConfig {
    /// Samples after which the vehicle is considered out of the maze.
    pub max_samples: u32,
    /// Pause between samples.
    pub sample_interval: Duration,
}

impl Default for CorridorConfig {
    fn default() -> Self {
        Self {
            max_samples: 10_000,
            sample_interval: Duration::ZERO,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CorridorOutcome {
    ReachedIntersection,
    ReachedExit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CorridorReport {
    pub outcome: CorridorOutcome,
    /// Samples taken, including the one that stopped the traversal.
    pub samples: u32,
}

/// Drive forward until an intersection or the exit.
///
/// The forward pattern is idled and its lines released before returning,
/// on success and on error alike.
///
/// # Errors
///
/// Any sensor or actuator failure; the traversal stops at the first one.
#[instrument(level = "info", skip(vehicle, config), fields(max_samples = config.max_samples))]
pub fn traverse<P: DigitalPort>(
    vehicle: &mut Vehicle<P>,
    config: &CorridorConfig,
) -> Result<CorridorReport, MazeError> {
    let Vehicle {
        port,
        sensors,
        actuator,
    } = vehicle;
    let mut engaged = actuator.engage(port, DrivePattern::Forward)?;
    let sampled = sample(&mut engaged, sensors, config);
    let stopped = engaged.disengage();
    let report = sampled?;
    stopped?;
    info!(outcome = ?report.outcome, samples = report.samples, "corridor finished");
    Ok(report)
}

fn sample<P: DigitalPort>(
    engaged: &mut Engaged<'_, P>,
    sensors: &SensorGateway,
    config: &CorridorConfig,
) -> Result<CorridorReport, MazeError> {
    let mut openings = OpeningTracker::default();
    for samples in 1..=config.max_samples {
        let left = sensors.read(engaged.port(), Sensor::Left)?;
        let front = sensors.read(engaged.port(), Sensor::Straight)?;
        if front != SensorReading::Open {
            debug!(samples, "wall ahead");
            return Ok(CorridorReport {
                outcome: CorridorOutcome::ReachedIntersection,
                samples,
            });
        }
        let right = sensors.read(engaged.port(), Sensor::Right)?;
        if openings.observe(left, right) {
            debug!(samples, "side opening confirmed");
            return Ok(CorridorReport {
                outcome: CorridorOutcome::ReachedIntersection,
                samples,
            });
        }
        if !config.sample_interval.is_zero() {
            thread::sleep(config.sample_interval);
        }
    }
    Ok(CorridorReport {
        outcome: CorridorOutcome::ReachedExit,
        samples: config.max_samples,
    })
}

/// Tracks side openings that appear after the side was seen blocked.
#[derive(Debug, Default)]
struct OpeningTracker {
    left_walled: bool,
    right_walled: bool,
    streak: u8,
}

impl OpeningTracker {
    /// Feed one sample; true once a new opening has been confirmed.
    fn observe(&mut self, left: SensorReading, right: SensorReading) -> bool {
        let fresh = (self.left_walled && left == SensorReading::Open)
            || (self.right_walled && right == SensorReading::Open);
        self.left_walled |= left != SensorReading::Open;
        self.right_walled |= right != SensorReading::Open;
        self.streak = if fresh { self.streak + 1 } else { 0 };
        self.streak >= OPENING_CONFIRMATIONS
    }
}
