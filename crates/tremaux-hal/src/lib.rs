//! `tremaux-hal` – Hardware Abstraction Layer
//!
//! Everything that touches a hardware line goes through this crate.
//!
//! # Modules
//!
//! - [`port`] – [`DigitalPort`]: the injected digital I/O capability
//!   (ownership, direction, level).
//! - [`lease`] – [`LineLease`]: scoped line ownership with guaranteed
//!   release on every exit path.
//! - [`retry`] – [`RetryPolicy`]: bounded, backoff-free retry of transient
//!   port failures.
//! - [`sensor`] – [`SensorGateway`]: reads the three proximity sensors.
//! - [`actuator`] – [`ActuatorGateway`]: energises motor output pairs and
//!   performs dead-reckoned turns.
//! - [`sim`] – [`SimPort`][sim::SimPort]: in-process port for tests and
//!   bench runs.
//! - [`sysfs`] – [`SysfsPort`][sysfs::SysfsPort]: Linux `/sys/class/gpio`
//!   backend.

pub mod actuator;
pub mod lease;
pub mod port;
pub mod retry;
pub mod sensor;
pub mod sim;
pub mod sysfs;

pub use actuator::{ActuatorGateway, DrivePattern, Engaged, MotorLines};
pub use lease::LineLease;
pub use port::DigitalPort;
pub use retry::{RetryExhausted, RetryPolicy};
pub use sensor::{SensorGateway, SensorLines};
