//! [`Vehicle`] – the port together with the gateways that drive it.

use tremaux_hal::{ActuatorGateway, DigitalPort, SensorGateway};
use tremaux_types::{MazeError, Sensor, SensorReading, TurnCommand};

/// Owns the [`DigitalPort`] and the sensor and actuator gateways.
pub struct Vehicle<P: DigitalPort> {
    pub(crate) port: P,
    pub(crate) sensors: SensorGateway,
    pub(crate) actuator: ActuatorGateway,
}

impl<P: DigitalPort> Vehicle<P> {
    pub fn new(port: P, sensors: SensorGateway, actuator: ActuatorGateway) -> Self {
        Self {
            port,
            sensors,
            actuator,
        }
    }

    pub fn port(&self) -> &P {
        &self.port
    }

    pub fn port_mut(&mut self) -> &mut P {
        &mut self.port
    }

    pub fn into_port(self) -> P {
        self.port
    }

    pub fn sensors(&self) -> &SensorGateway {
        &self.sensors
    }

    pub fn actuator(&self) -> &ActuatorGateway {
        &self.actuator
    }

    /// Read one proximity sensor with the gateway's retry discipline.
    ///
    /// # Errors
    ///
    /// See [`SensorGateway::read`].
    pub fn read(&mut self, sensor: Sensor) -> Result<SensorReading, MazeError> {
        self.sensors.read(&mut self.port, sensor)
    }

    /// Execute the physical part of a turn decision.
    ///
    /// # Errors
    ///
    /// See [`ActuatorGateway::turn`].
    pub fn turn(&mut self, turn: TurnCommand) -> Result<(), MazeError> {
        self.actuator.turn(&mut self.port, turn)
    }

    /// Return every motor output to idle.
    ///
    /// # Errors
    ///
    /// See [`ActuatorGateway::initialize`].
    pub fn idle_motors(&mut self) -> Result<(), MazeError> {
        self.actuator.initialize(&mut self.port)
    }
}
