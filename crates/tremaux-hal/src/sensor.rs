//! Sensor Gateway: bounded-retry reads of the three proximity sensors.
//!
//! Each [`SensorGateway::read`] leases the sensor's line, configures it as an
//! input, samples it with the configured [`RetryPolicy`] and releases it
//! again.  Which raw level means "no wall" depends on the wiring and is set
//! by the gateway's `open_level`.

use tracing::{instrument, trace};
use tremaux_types::{Level, Line, MazeError, PinMode, Sensor, SensorReading};

use crate::lease::LineLease;
use crate::port::DigitalPort;
use crate::retry::RetryPolicy;

/// Port lines wired to the proximity sensors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SensorLines {
    pub left: Line,
    pub straight: Line,
    pub right: Line,
}

impl SensorLines {
    /// Line for `sensor`.
    pub fn line(&self, sensor: Sensor) -> Line {
        match sensor {
            Sensor::Left => self.left,
            Sensor::Straight => self.straight,
            Sensor::Right => self.right,
        }
    }
}

impl Default for SensorLines {
    fn default() -> Self {
        Self {
            left: Line(11),
            straight: Line(18),
            right: Line(19),
        }
    }
}

/// Reads the proximity sensors through a [`DigitalPort`].
#[derive(Debug, Clone)]
pub struct SensorGateway {
    lines: SensorLines,
    open_level: Level,
    retry: RetryPolicy,
}

impl SensorGateway {
    /// `open_level` is the raw level a sensor reports when no wall is in
    /// front of it.
    pub fn new(lines: SensorLines, open_level: Level, retry: RetryPolicy) -> Self {
        Self {
            lines,
            open_level,
            retry,
        }
    }

    pub fn lines(&self) -> &SensorLines {
        &self.lines
    }

    /// Read `sensor`, retrying failed samples.
    ///
    /// Returns [`SensorReading::Open`] or [`SensorReading::Blocked`].
    ///
    /// # Errors
    ///
    /// - [`MazeError::HardwareAcquisition`] if the line cannot be acquired or
    ///   released.
    /// - [`MazeError::HardwareConfig`] if the line cannot be made an input.
    /// - [`MazeError::SensorReadExhausted`] if every sample failed.
    #[instrument(level = "debug", skip(self, port))]
    pub fn read<P: DigitalPort + ?Sized>(
        &self,
        port: &mut P,
        sensor: Sensor,
    ) -> Result<SensorReading, MazeError> {
        let line = self.lines.line(sensor);
        let mut lease = LineLease::acquire(port, &[line])?;
        lease
            .port()
            .set_mode(line, PinMode::Input)
            .map_err(|fault| MazeError::HardwareConfig {
                line,
                details: format!("cannot set input mode: {fault}"),
            })?;
        let sampled = self.retry.run(line, || lease.port().read(line));
        let released = lease.release();
        let level = sampled.map_err(|exhausted| MazeError::SensorReadExhausted {
            sensor,
            attempts: exhausted.attempts,
            details: exhausted.fault.to_string(),
        })?;
        released?;
        let reading = self.classify(level);
        trace!(%sensor, ?level, ?reading, "sensor sampled");
        Ok(reading)
    }

    /// Interpret a raw level according to the sensor polarity.
    pub fn classify(&self, level: Level) -> SensorReading {
        if level == self.open_level {
            SensorReading::Open
        } else {
            SensorReading::Blocked
        }
    }
}
